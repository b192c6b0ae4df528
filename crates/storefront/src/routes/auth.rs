//! Auth route handlers.
//!
//! Only the identity handoff lives here; credential verification is the
//! hosted backend's job. Signing in flips the session provider, which in
//! turn drives both containers' reload and the one-shot cart/favorites
//! reconciliation.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use keyiflibox_core::Email;

use crate::error::{AppError, Result};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

/// Session identity data.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub signed_in: bool,
    pub email: Option<String>,
}

impl SessionView {
    fn from_state(state: &AppState) -> Self {
        let current = state.session().current();
        Self {
            signed_in: current.is_some(),
            email: current.map(|user| user.email.into_inner()),
        }
    }
}

/// Establish the session identity from a validated email.
#[instrument(skip(state, form))]
pub async fn login(
    State(state): State<AppState>,
    Json(form): Json<LoginRequest>,
) -> Result<Json<SessionView>> {
    let email = Email::parse(&form.email).map_err(|e| AppError::BadRequest(e.to_string()))?;
    state.session().sign_in(CurrentUser::from_email(email));
    Ok(Json(SessionView::from_state(&state)))
}

/// Return to the anonymous state.
#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>) -> Json<SessionView> {
    state.session().sign_out();
    Json(SessionView::from_state(&state))
}

/// Current identity.
#[instrument(skip(state))]
pub async fn me(State(state): State<AppState>) -> Json<SessionView> {
    Json(SessionView::from_state(&state))
}
