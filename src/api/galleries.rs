use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;

use super::{found, parse_id, parse_json, require_no_body, AppState};
use crate::auth::AuthSubject;
use crate::error::AppError;
use crate::guard::{check_ownership, resolve_caller, Ownership};
use crate::models::{Art, Gallery, ResourceKind};
use crate::pagination::{next_link, Page, Paged};
use crate::validate::GalleryUpdate;

// ==================== Galleries ====================

/// Create an empty gallery owned by the caller
pub async fn create_gallery(
    subject: AuthSubject,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    require_no_body(&body)?;

    let owner = resolve_caller(&state.store, subject.as_str())?;
    let gallery = state.store.create_gallery(owner.id, Utc::now())?;
    log::info!("User {} created gallery {}", owner.id, gallery.id);

    Ok(HttpResponse::Created().json(state.projector.gallery(&gallery, &[])))
}

pub async fn list_galleries(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    require_no_body(&body)?;
    let page = Page::from_query(req.query_string())?;

    let total = state.store.count_galleries()?;
    let galleries = state.store.list_galleries(page.limit, page.offset)?;

    let mut items = Vec::with_capacity(galleries.len());
    for gallery in &galleries {
        items.push(state.projector.gallery_expanded(&state.store, gallery)?);
    }

    let collection = format!("/{}", ResourceKind::Gallery.collection());
    Ok(HttpResponse::Ok().json(Paged {
        items,
        next: next_link(state.projector.base_url(), &collection, page, total),
    }))
}

pub async fn get_gallery(
    subject: AuthSubject,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    require_no_body(&body)?;
    let gallery_id = parse_id(&path, ResourceKind::Gallery)?;

    let Ownership { resource: gallery, .. } =
        check_ownership::<Gallery>(&state.store, gallery_id, subject.as_str())?;

    Ok(HttpResponse::Ok().json(state.projector.gallery_expanded(&state.store, &gallery)?))
}

pub async fn patch_gallery(
    subject: AuthSubject,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let body = parse_json(&body)?;
    let gallery_id = parse_id(&path, ResourceKind::Gallery)?;

    let Ownership { resource: gallery, .. } =
        check_ownership::<Gallery>(&state.store, gallery_id, subject.as_str())?;

    let update = GalleryUpdate::partial(&body)?;
    save_gallery(&state, gallery, update)
}

pub async fn put_gallery(
    subject: AuthSubject,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let body = parse_json(&body)?;
    let gallery_id = parse_id(&path, ResourceKind::Gallery)?;

    let Ownership { resource: gallery, .. } =
        check_ownership::<Gallery>(&state.store, gallery_id, subject.as_str())?;

    let update = GalleryUpdate::full(&body)?;
    save_gallery(&state, gallery, update)
}

fn save_gallery(
    state: &AppState,
    mut gallery: Gallery,
    update: GalleryUpdate,
) -> Result<HttpResponse, AppError> {
    update.apply(&mut gallery);
    found(state.store.update_gallery(&gallery), ResourceKind::Gallery)?;
    log::debug!("Updated gallery {}", gallery.id);

    Ok(HttpResponse::Ok().json(state.projector.gallery_expanded(&state.store, &gallery)?))
}

pub async fn delete_gallery(
    subject: AuthSubject,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    require_no_body(&body)?;
    let gallery_id = parse_id(&path, ResourceKind::Gallery)?;

    let Ownership { resource: gallery, owner } =
        check_ownership::<Gallery>(&state.store, gallery_id, subject.as_str())?;

    found(state.store.delete_gallery(gallery.id), ResourceKind::Gallery)?;
    log::info!("User {} deleted gallery {}", owner.id, gallery.id);

    Ok(HttpResponse::NoContent().finish())
}

// ==================== Gallery Membership ====================

pub async fn list_gallery_arts(
    subject: AuthSubject,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    require_no_body(&body)?;
    let gallery_id = parse_id(&path, ResourceKind::Gallery)?;

    let Ownership { resource: gallery, .. } =
        check_ownership::<Gallery>(&state.store, gallery_id, subject.as_str())?;

    let arts = state.store.list_gallery_arts(gallery.id)?;
    let items: Vec<_> = arts.iter().map(|a| state.projector.art(a)).collect();

    Ok(HttpResponse::Ok().json(items))
}

/// Parse both ids and check that the caller owns the gallery and the art
fn owned_pair(
    state: &AppState,
    subject: &AuthSubject,
    path: (String, String),
) -> Result<(Gallery, Art), AppError> {
    let gallery_id = parse_id(&path.0, ResourceKind::Gallery)?;
    let art_id = parse_id(&path.1, ResourceKind::Art)?;

    let Ownership { resource: gallery, .. } =
        check_ownership::<Gallery>(&state.store, gallery_id, subject.as_str())?;
    let Ownership { resource: art, .. } =
        check_ownership::<Art>(&state.store, art_id, subject.as_str())?;

    Ok((gallery, art))
}

pub async fn add_gallery_art(
    subject: AuthSubject,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    require_no_body(&body)?;
    let (gallery, art) = owned_pair(&state, &subject, path.into_inner())?;

    if !state.store.add_gallery_art(gallery.id, art.id)? {
        return Err(AppError::ArtAlreadyInGallery);
    }
    log::info!("Added art {} to gallery {}", art.id, gallery.id);

    Ok(HttpResponse::Ok().json(state.projector.gallery_expanded(&state.store, &gallery)?))
}

pub async fn remove_gallery_art(
    subject: AuthSubject,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    require_no_body(&body)?;
    let (gallery, art) = owned_pair(&state, &subject, path.into_inner())?;

    if !state.store.remove_gallery_art(gallery.id, art.id)? {
        return Err(AppError::ArtNotInGallery);
    }
    log::info!("Removed art {} from gallery {}", art.id, gallery.id);

    Ok(HttpResponse::Ok().json(state.projector.gallery_expanded(&state.store, &gallery)?))
}
