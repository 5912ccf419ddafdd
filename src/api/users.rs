use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde_json::{Map, Value};

use super::{found, parse_id, require_json_object, require_no_body, AppState};
use crate::auth::AuthSubject;
use crate::error::AppError;
use crate::guard::check_self_access;
use crate::models::{NewUser, ResourceKind, User};

/// Marker value that distinguishes the scheduler from a manual call
pub const AUTOMATIC_REQUEST_METHOD: &str = "automatically";

// ==================== Users ====================

/// Create the caller's user, or return it unchanged if it already exists
pub async fn create_user(
    subject: AuthSubject,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let body = require_json_object(&body)?;

    let userinfo = match body.get("userinfo") {
        Some(Value::Object(info)) => info,
        _ => return Err(AppError::BadRequest),
    };

    match userinfo.get("sub") {
        None | Some(Value::Null) => {}
        Some(Value::String(sub)) if sub.is_empty() || sub == subject.as_str() => {}
        Some(_) => return Err(AppError::NotTheUser),
    }

    let profile = NewUser {
        name: string_field(userinfo, "name"),
        email: string_field(userinfo, "email"),
        picture: string_field(userinfo, "picture"),
    };

    let (user, created) =
        state
            .store
            .create_user_if_absent(subject.as_str(), &profile, Utc::now())?;
    let response = state.projector.user_expanded(&state.store, &user)?;

    if created {
        log::info!("Created user {} for subject {}", user.id, user.auth_sub);
        Ok(HttpResponse::Created().json(response))
    } else {
        log::debug!("User {} already exists for subject {}", user.id, user.auth_sub);
        Ok(HttpResponse::Ok().json(response))
    }
}

fn string_field(info: &Map<String, Value>, key: &str) -> Option<String> {
    info.get(key).and_then(Value::as_str).map(str::to_string)
}

pub async fn list_users(
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    require_no_body(&body)?;

    let users = state.store.list_users()?;
    let mut items = Vec::with_capacity(users.len());
    for user in &users {
        items.push(state.projector.user_expanded(&state.store, user)?);
    }

    Ok(HttpResponse::Ok().json(items))
}

pub async fn get_user(
    subject: AuthSubject,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    require_no_body(&body)?;
    let user_id = parse_id(&path, ResourceKind::User)?;

    let user = check_self_access(&state.store, user_id, subject.as_str())?;
    Ok(HttpResponse::Ok().json(state.projector.user_expanded(&state.store, &user)?))
}

pub async fn delete_user(
    subject: AuthSubject,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    require_no_body(&body)?;
    let user_id = parse_id(&path, ResourceKind::User)?;

    let user = check_self_access(&state.store, user_id, subject.as_str())?;
    found(state.store.delete_user(user.id), ResourceKind::User)?;
    log::info!("Deleted user {}", user.id);

    Ok(HttpResponse::NoContent().finish())
}

/// Stamp `today_time` on every user. Only the scheduler may call this.
pub async fn stamp_today_time(
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let body = require_json_object(&body)?;

    if body.get("request_method").and_then(Value::as_str) != Some(AUTOMATIC_REQUEST_METHOD) {
        return Err(AppError::AutoOnly);
    }

    let now = Utc::now();
    let stamped = state.store.stamp_today_time(now)?;
    log::info!("Stamped today_time on {} users", stamped);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "ok": true,
        "Today_Time": now,
    })))
}

// ==================== Friends ====================

/// Resolve both path ids and the self-access check shared by the friend
/// routes. The pair is rejected before any lookup when it names one user.
fn friend_pair(
    state: &AppState,
    subject: &AuthSubject,
    path: (String, String),
) -> Result<(User, i64), AppError> {
    let user_id = parse_id(&path.0, ResourceKind::User)?;
    let friend_id = parse_id(&path.1, ResourceKind::User)?;

    if user_id == friend_id {
        return Err(AppError::FriendSelf);
    }

    let user = check_self_access(&state.store, user_id, subject.as_str())?;
    Ok((user, friend_id))
}

pub async fn add_friend(
    subject: AuthSubject,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    require_no_body(&body)?;
    let (user, friend_id) = friend_pair(&state, &subject, path.into_inner())?;

    found(state.store.get_user(friend_id), ResourceKind::User)?;

    if !state.store.add_friend(user.id, friend_id)? {
        return Err(AppError::FriendAlready);
    }
    log::info!("User {} added friend {}", user.id, friend_id);

    Ok(HttpResponse::Ok().json(state.projector.user_expanded(&state.store, &user)?))
}

pub async fn remove_friend(
    subject: AuthSubject,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    require_no_body(&body)?;
    let (user, friend_id) = friend_pair(&state, &subject, path.into_inner())?;

    if !state.store.remove_friend(user.id, friend_id)? {
        return Err(AppError::FriendNotFound);
    }
    log::info!("User {} removed friend {}", user.id, friend_id);

    Ok(HttpResponse::Ok().json(state.projector.user_expanded(&state.store, &user)?))
}
