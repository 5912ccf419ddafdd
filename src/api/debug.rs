use actix_web::{web, HttpResponse};
use serde_json::{json, Map, Value};

use super::{require_no_body, AppState};
use crate::error::AppError;

// ==================== Debug Endpoints ====================

/// Table names and row counts
pub async fn db_summary(
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    require_no_body(&body)?;

    let counts = state.store.table_counts()?;
    let tables: Vec<&str> = counts.iter().map(|(name, _)| name.as_str()).collect();
    let by_table: Map<String, Value> = counts
        .iter()
        .map(|(name, count)| (name.clone(), json!(count)))
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "tables": tables,
        "counts": by_table,
    })))
}

pub async fn reset(
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    require_no_body(&body)?;

    state.store.reset()?;
    log::warn!("Store reset through debug endpoint");

    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

/// The newest user, art and gallery, projected without nested collections
pub async fn serialize_latest(
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    require_no_body(&body)?;

    let user = state
        .store
        .latest_user()?
        .map(|u| state.projector.user(&u, &[]));
    let art = state.store.latest_art()?.map(|a| state.projector.art(&a));
    let gallery = state
        .store
        .latest_gallery()?
        .map(|g| state.projector.gallery(&g, &[]));

    Ok(HttpResponse::Ok().json(json!({
        "user": user,
        "art": art,
        "gallery": gallery,
    })))
}

pub(crate) fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/debug/db", web::get().to(db_summary))
        .route("/debug/reset", web::post().to(reset))
        .route("/debug/serialize", web::get().to(serialize_latest));
}
