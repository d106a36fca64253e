//! Banner route handlers.

use axum::{Json, extract::State};
use tracing::instrument;
use vesture_core::Banner;
use vesture_core::content::active_banners;

use crate::error::Result;
use crate::state::AppState;

/// Active home page banners in display order.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Banner>>> {
    let banners = state.catalog().active_banners().await?;
    Ok(Json(active_banners(banners.as_ref().clone())))
}
