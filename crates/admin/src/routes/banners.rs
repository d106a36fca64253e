//! Home page banner route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;
use vesture_backend::repo;
use vesture_backend::repo::banners::{BannerPatch, NewBanner};
use vesture_core::{Banner, BannerId};

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

fn is_web_url(raw: &str) -> bool {
    url::Url::parse(raw).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// Relative links (`/products?category=dresses`) are allowed.
fn is_link(raw: &str) -> bool {
    (raw.starts_with('/') && !raw.starts_with("//")) || is_web_url(raw)
}

fn check_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".to_string()));
    }
    Ok(())
}

fn check_image_url(image_url: &str) -> Result<()> {
    if !is_web_url(image_url) {
        return Err(AppError::BadRequest(
            "image_url must be an http(s) URL".to_string(),
        ));
    }
    Ok(())
}

fn check_link(link_url: Option<&str>) -> Result<()> {
    match link_url {
        Some(link) if !is_link(link) => Err(AppError::BadRequest(
            "link_url must be a site path or an http(s) URL".to_string(),
        )),
        _ => Ok(()),
    }
}

fn validate_new(banner: &NewBanner) -> Result<()> {
    check_title(&banner.title)?;
    check_image_url(&banner.image_url)?;
    check_link(banner.link_url.as_deref())
}

fn validate_patch(patch: &BannerPatch) -> Result<()> {
    if let Some(title) = &patch.title {
        check_title(title)?;
    }
    if let Some(image_url) = &patch.image_url {
        check_image_url(image_url)?;
    }
    check_link(patch.link_url.as_ref().and_then(Option::as_deref))
}

/// Every banner, in display order.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Banner>>> {
    let banners = repo::banners::list_all(state.backend()).await?;
    Ok(Json(banners))
}

/// Create a banner.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(banner): Json<NewBanner>,
) -> Result<(StatusCode, Json<Banner>)> {
    validate_new(&banner)?;
    let created = repo::banners::create(state.backend(), &banner).await?;
    tracing::info!(banner_id = %created.id, "Banner created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// Apply a partial update.
#[instrument(skip(state, admin, patch), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<BannerId>,
    Json(patch): Json<BannerPatch>,
) -> Result<Json<Banner>> {
    if patch == BannerPatch::default() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }
    validate_patch(&patch)?;

    let updated = repo::banners::update(state.backend(), id, &patch)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("banner {id}")))?;
    tracing::info!(banner_id = %id, "Banner updated");
    Ok(Json(updated))
}

/// Delete a banner.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<BannerId>,
) -> Result<StatusCode> {
    repo::banners::delete(state.backend(), id).await?;
    tracing::info!(banner_id = %id, "Banner deleted");
    Ok(StatusCode::NO_CONTENT)
}
