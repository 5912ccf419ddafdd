use actix_web::{web, HttpResponse, Responder};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::ResourceKind;
use crate::negotiation::JsonContract;
use crate::projector::Projector;
use crate::store::{Store, StoreError, StoreResult};

pub mod arts;
pub mod debug;
pub mod galleries;
pub mod users;

pub struct AppState {
    pub store: Arc<Store>,
    pub projector: Projector,
}

impl AppState {
    pub fn new(store: Arc<Store>, api_base_url: &str) -> Self {
        AppState {
            store,
            projector: Projector::new(api_base_url),
        }
    }
}

// ==================== Request Helpers ====================

/// Reject any request payload on routes that take none
pub(crate) fn require_no_body(body: &web::Bytes) -> Result<(), AppError> {
    if body.is_empty() {
        Ok(())
    } else {
        Err(AppError::BodyNotAllowed)
    }
}

/// Parse a JSON payload. An empty payload reads as an empty object.
pub(crate) fn parse_json(body: &web::Bytes) -> Result<Value, AppError> {
    if body.is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(body).map_err(|e| {
        log::debug!("Malformed JSON body: {}", e);
        AppError::BadRequest
    })
}

/// Parse a payload that must be a non-empty JSON object
pub(crate) fn require_json_object(body: &web::Bytes) -> Result<Map<String, Value>, AppError> {
    match parse_json(body)? {
        Value::Object(map) if !map.is_empty() => Ok(map),
        _ => Err(AppError::BadRequest),
    }
}

/// Path ids that are not integers name nothing, so they are not found
pub(crate) fn parse_id(raw: &str, kind: ResourceKind) -> Result<i64, AppError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::NotFound(kind))
}

/// Map a missing row onto the resource's 404
pub(crate) fn found<T>(result: StoreResult<T>, kind: ResourceKind) -> Result<T, AppError> {
    match result {
        Ok(v) => Ok(v),
        Err(StoreError::NotFound(_)) => Err(AppError::NotFound(kind)),
        Err(e) => Err(e.into()),
    }
}

// ==================== Health Check ====================

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "ok": true }))
}

// ==================== Routes ====================

/// Register every route behind the JSON content contract. Debug routes are
/// only mounted when `debug_routes` is set.
pub fn configure_app(cfg: &mut web::ServiceConfig, debug_routes: bool) {
    cfg.service(
        web::scope("")
            .wrap(JsonContract)
            .configure(|scope| {
                register_routes(scope);
                if debug_routes {
                    debug::register_routes(scope);
                }
            }),
    );
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    configure_app(cfg, false)
}

fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check
        .route("/health", web::get().to(health))

        // Users
        .route("/users", web::post().to(users::create_user))
        .route("/users", web::get().to(users::list_users))
        .route("/users", web::patch().to(users::stamp_today_time))
        .route("/users/{user_id}", web::get().to(users::get_user))
        .route("/users/{user_id}", web::delete().to(users::delete_user))
        .route("/users/{user_id}/users/{friend_id}", web::patch().to(users::add_friend))
        .route("/users/{user_id}/users/{friend_id}", web::delete().to(users::remove_friend))

        // Arts
        .route("/arts", web::post().to(arts::create_art))
        .route("/arts", web::get().to(arts::list_arts))
        .route("/arts/{art_id}", web::get().to(arts::get_art))
        .route("/arts/{art_id}", web::patch().to(arts::patch_art))
        .route("/arts/{art_id}", web::put().to(arts::put_art))
        .route("/arts/{art_id}", web::delete().to(arts::delete_art))

        // Galleries
        .route("/galleries", web::post().to(galleries::create_gallery))
        .route("/galleries", web::get().to(galleries::list_galleries))
        .route("/galleries/{gallery_id}", web::get().to(galleries::get_gallery))
        .route("/galleries/{gallery_id}", web::patch().to(galleries::patch_gallery))
        .route("/galleries/{gallery_id}", web::put().to(galleries::put_gallery))
        .route("/galleries/{gallery_id}", web::delete().to(galleries::delete_gallery))
        .route("/galleries/{gallery_id}/arts", web::get().to(galleries::list_gallery_arts))
        .route("/galleries/{gallery_id}/arts/{art_id}", web::patch().to(galleries::add_gallery_art))
        .route("/galleries/{gallery_id}/arts/{art_id}", web::delete().to(galleries::remove_gallery_art));
}
