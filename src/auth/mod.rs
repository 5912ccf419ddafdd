use actix_web::{dev::Payload, http::header::AUTHORIZATION, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};

use crate::error::AppError;

/// Scheme the Authorization header must use
pub const BEARER_SCHEME: &str = "Bearer";

/// Prefix the token must carry before the opaque subject
pub const SUBJECT_PREFIX: &str = "sub:";

/// Caller identity extracted from `Authorization: Bearer sub:<subject>`.
///
/// The subject is not looked up here. An unknown subject is a valid
/// identity; it only fails later when a user row is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSubject(pub String);

impl AuthSubject {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Parse a raw Authorization header value into the caller subject
pub fn extract_subject(header: Option<&str>) -> Result<AuthSubject, AppError> {
    let header = header.ok_or(AppError::MissingCredential)?;

    let mut parts = header.split(' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default();

    if scheme != BEARER_SCHEME || token.is_empty() {
        return Err(AppError::MalformedCredential);
    }

    let subject = token
        .strip_prefix(SUBJECT_PREFIX)
        .ok_or(AppError::MalformedCredential)?;

    if subject.is_empty() {
        return Err(AppError::MalformedCredential);
    }

    Ok(AuthSubject(subject.to_string()))
}

impl FromRequest for AuthSubject {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let header = match req.headers().get(AUTHORIZATION) {
            None => None,
            Some(value) => match value.to_str() {
                Ok(s) => Some(s),
                Err(_) => return ready(Err(AppError::MalformedCredential)),
            },
        };

        let result = extract_subject(header);
        if let Err(ref e) = result {
            log::debug!("Rejected credential on {}: {}", req.path(), e);
        }
        ready(result)
    }
}
