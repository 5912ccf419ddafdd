use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::guard::{Forbidden, GuardError};
use crate::models::ResourceKind;
use crate::store::StoreError;
use crate::validate::ValidationError;

/// Every way a request can fail. Each variant is terminal for the request.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authorization header is missing")]
    MissingCredential,

    #[error("Invalid header. Use a Bearer token of the form sub:<subject>")]
    MalformedCredential,

    #[error("NotAcceptable")]
    NotAcceptable,

    #[error("UnsupportedMediaType")]
    UnsupportedMediaType,

    #[error("The request should not have any content json")]
    BodyNotAllowed,

    #[error("BadRequest")]
    BadRequest,

    #[error("Should not be triggered manually")]
    AutoOnly,

    #[error("Invalid {0} body")]
    InvalidBody(ResourceKind),

    #[error("Invalid field in request body")]
    InvalidField,

    #[error("No {0} with this {0}_id exists")]
    NotFound(ResourceKind),

    #[error("You are not the user")]
    NotTheUser,

    #[error("{} does not belong to the user", .0.label())]
    NotOwner(ResourceKind),

    #[error("A user cannot friend themselves")]
    FriendSelf,

    #[error("Friend already exists")]
    FriendAlready,

    #[error("Friend does not exist")]
    FriendNotFound,

    #[error("Art already exists in gallery")]
    ArtAlreadyInGallery,

    #[error("Art is not in the gallery")]
    ArtNotInGallery,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingCredential | AppError::MalformedCredential => StatusCode::UNAUTHORIZED,
            AppError::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            AppError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::BodyNotAllowed
            | AppError::BadRequest
            | AppError::AutoOnly
            | AppError::InvalidBody(_)
            | AppError::InvalidField => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NotTheUser
            | AppError::NotOwner(_)
            | AppError::FriendSelf
            | AppError::FriendAlready
            | AppError::FriendNotFound
            | AppError::ArtAlreadyInGallery
            | AppError::ArtNotInGallery => StatusCode::FORBIDDEN,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::MissingCredential => json!({
                "code": "no auth header",
                "description": self.to_string(),
            }),
            AppError::MalformedCredential => json!({
                "code": "invalid_header",
                "description": self.to_string(),
            }),
            AppError::Store(e) => {
                log::error!("Request failed: {}", e);
                json!({ "Error": "InternalServerError" })
            }
            _ => json!({ "Error": self.to_string() }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<GuardError> for AppError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::NotFound(kind) => AppError::NotFound(kind),
            GuardError::Forbidden(Forbidden::UnknownCaller) => AppError::NotTheUser,
            GuardError::Forbidden(Forbidden::NotOwner(ResourceKind::User)) => AppError::NotTheUser,
            GuardError::Forbidden(Forbidden::NotOwner(kind)) => AppError::NotOwner(kind),
            GuardError::Store(e) => AppError::Store(e),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::UnknownField { .. } => AppError::InvalidField,
            other => AppError::InvalidBody(other.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::MessageBody;

    fn body_json(err: AppError) -> serde_json::Value {
        let resp = err.error_response();
        let bytes = resp.into_body().try_into_bytes().unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::MissingCredential.status_code(), 401);
        assert_eq!(AppError::NotAcceptable.status_code(), 406);
        assert_eq!(AppError::UnsupportedMediaType.status_code(), 415);
        assert_eq!(AppError::InvalidField.status_code(), 400);
        assert_eq!(AppError::NotFound(ResourceKind::Art).status_code(), 404);
        assert_eq!(AppError::FriendAlready.status_code(), 403);
        assert_eq!(AppError::ArtAlreadyInGallery.status_code(), 403);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            AppError::NotFound(ResourceKind::Gallery).to_string(),
            "No gallery with this gallery_id exists"
        );
        assert_eq!(
            AppError::NotOwner(ResourceKind::Art).to_string(),
            "Art does not belong to the user"
        );
        assert_eq!(AppError::InvalidBody(ResourceKind::Art).to_string(), "Invalid art body");
    }

    #[test]
    fn test_credential_body_shape() {
        let body = body_json(AppError::MissingCredential);
        assert_eq!(body["code"], "no auth header");
        assert_eq!(body["description"], "Authorization header is missing");

        let body = body_json(AppError::MalformedCredential);
        assert_eq!(body["code"], "invalid_header");
    }

    #[test]
    fn test_store_errors_hide_detail() {
        let err = AppError::from(StoreError::NotFound("secret table".to_string()));
        assert_eq!(err.status_code(), 500);
        let body = body_json(err);
        assert_eq!(body, json!({ "Error": "InternalServerError" }));
    }

    #[test]
    fn test_guard_error_mapping() {
        let err = AppError::from(GuardError::Forbidden(Forbidden::UnknownCaller));
        assert!(matches!(err, AppError::NotTheUser));

        let err = AppError::from(GuardError::Forbidden(Forbidden::NotOwner(ResourceKind::Gallery)));
        assert!(matches!(err, AppError::NotOwner(ResourceKind::Gallery)));

        let err = AppError::from(GuardError::NotFound(ResourceKind::User));
        assert!(matches!(err, AppError::NotFound(ResourceKind::User)));
    }
}
