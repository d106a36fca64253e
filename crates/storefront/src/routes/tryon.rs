//! Virtual try-on endpoint.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Serialize;
use tracing::instrument;
use vesture_backend::repo;
use vesture_backend::repo::tryon_results::NewTryOnResult;

use crate::error::add_breadcrumb;
use crate::middleware::OptionalAuth;
use crate::models::CurrentUser;
use crate::state::AppState;
use crate::tryon::{TryOnError, TryOnJob, TryOnRequest};

#[derive(Debug, Serialize)]
pub struct TryOnResponse {
    pub success: bool,
    /// Result image as a base64 data URL.
    pub image: String,
}

/// Render a garment onto the shopper's photo.
///
/// Signed-in shoppers get the result saved to their try-on history.
#[instrument(skip_all)]
pub async fn virtual_tryon(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    body: Result<Json<TryOnRequest>, JsonRejection>,
) -> Result<Json<TryOnResponse>, TryOnError> {
    let Json(request) = body.map_err(|e| TryOnError::InvalidRequest(e.body_text()))?;
    let job = request.resolve()?;

    add_breadcrumb(
        "tryon",
        "Try-on started",
        Some(&[
            ("category", job.category.as_str()),
            ("provider", job.provider.as_str()),
        ]),
    );

    let data_url = state.tryon().run(&job).await?.to_data_url();

    if let Some(user) = &user {
        record_result(&state, user, &job, &data_url).await;
    }

    Ok(Json(TryOnResponse {
        success: true,
        image: data_url,
    }))
}

/// Save the result to history; failures are logged, not surfaced.
async fn record_result(state: &AppState, user: &CurrentUser, job: &TryOnJob, result_image: &str) {
    let record = NewTryOnResult {
        user_id: user.id,
        product_id: job.product_id,
        category: job.category,
        provider: job.provider,
        result_image,
    };

    if let Err(e) = repo::tryon_results::record(state.backend(), &record, &user.access_token).await
    {
        tracing::warn!(user_id = %user.id, error = %e, "Failed to save try-on result");
    }
}
