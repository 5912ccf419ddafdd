use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;

use super::{found, parse_id, parse_json, require_no_body, AppState};
use crate::auth::AuthSubject;
use crate::error::AppError;
use crate::guard::{check_ownership, resolve_caller, Ownership};
use crate::models::{Art, ResourceKind};
use crate::pagination::{next_link, Page, Paged};
use crate::validate::ArtUpdate;

// ==================== Arts ====================

/// Create an empty art owned by the caller
pub async fn create_art(
    subject: AuthSubject,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    require_no_body(&body)?;

    let owner = resolve_caller(&state.store, subject.as_str())?;
    let art = state.store.create_art(owner.id, Utc::now())?;
    log::info!("User {} created art {}", owner.id, art.id);

    Ok(HttpResponse::Created().json(state.projector.art(&art)))
}

pub async fn list_arts(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    require_no_body(&body)?;
    let page = Page::from_query(req.query_string())?;

    let total = state.store.count_arts()?;
    let arts = state.store.list_arts(page.limit, page.offset)?;

    let collection = format!("/{}", ResourceKind::Art.collection());
    let paged = Paged {
        items: arts.iter().map(|a| state.projector.art(a)).collect(),
        next: next_link(state.projector.base_url(), &collection, page, total),
    };

    Ok(HttpResponse::Ok().json(paged))
}

pub async fn get_art(
    subject: AuthSubject,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    require_no_body(&body)?;
    let art_id = parse_id(&path, ResourceKind::Art)?;

    let Ownership { resource: art, .. } =
        check_ownership::<Art>(&state.store, art_id, subject.as_str())?;

    Ok(HttpResponse::Ok().json(state.projector.art(&art)))
}

pub async fn patch_art(
    subject: AuthSubject,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let body = parse_json(&body)?;
    let art_id = parse_id(&path, ResourceKind::Art)?;

    let Ownership { resource: art, .. } =
        check_ownership::<Art>(&state.store, art_id, subject.as_str())?;

    let update = ArtUpdate::partial(&body)?;
    save_art(&state, art, update)
}

pub async fn put_art(
    subject: AuthSubject,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let body = parse_json(&body)?;
    let art_id = parse_id(&path, ResourceKind::Art)?;

    let Ownership { resource: art, .. } =
        check_ownership::<Art>(&state.store, art_id, subject.as_str())?;

    let update = ArtUpdate::full(&body)?;
    save_art(&state, art, update)
}

/// Resolve the update's previous-art link, then write and project the art
fn save_art(state: &AppState, mut art: Art, update: ArtUpdate) -> Result<HttpResponse, AppError> {
    if let Some(previous) = update.linked_art() {
        if !state.store.art_exists(previous)? {
            return Err(AppError::NotFound(ResourceKind::Art));
        }
    }

    update.apply(&mut art, Utc::now());
    found(state.store.update_art(&art), ResourceKind::Art)?;
    log::debug!("Updated art {}", art.id);

    Ok(HttpResponse::Ok().json(state.projector.art(&art)))
}

pub async fn delete_art(
    subject: AuthSubject,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    require_no_body(&body)?;
    let art_id = parse_id(&path, ResourceKind::Art)?;

    let Ownership { resource: art, owner } =
        check_ownership::<Art>(&state.store, art_id, subject.as_str())?;

    found(state.store.delete_art(art.id), ResourceKind::Art)?;
    log::info!("User {} deleted art {}", owner.id, art.id);

    Ok(HttpResponse::NoContent().finish())
}
