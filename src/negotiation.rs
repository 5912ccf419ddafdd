use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, ACCEPT, CONTENT_LENGTH, CONTENT_TYPE},
    Error, ResponseError,
};
use futures_util::future::{ok, Ready};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::error::AppError;

const JSON_MEDIA_TYPE: &str = "application/json";
const ANY_MEDIA_TYPE: &str = "*/*";

/// Check the JSON content contract on raw request headers.
///
/// The response must be acceptable as JSON (406 otherwise), then a request
/// that declares a body must declare it as JSON (415 otherwise).
pub fn check_headers(headers: &HeaderMap) -> Result<(), AppError> {
    let mut accepts = headers
        .get_all(ACCEPT)
        .map(|v| v.to_str().unwrap_or_default())
        .peekable();

    if accepts.peek().is_some()
        && !accepts.any(|v| v.contains(ANY_MEDIA_TYPE) || v.contains(JSON_MEDIA_TYPE))
    {
        return Err(AppError::NotAcceptable);
    }

    let declared_len = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0);

    if declared_len > 0 {
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !content_type.contains(JSON_MEDIA_TYPE) {
            return Err(AppError::UnsupportedMediaType);
        }
    }

    Ok(())
}

/// Middleware enforcing [`check_headers`] ahead of every route
#[derive(Clone, Copy, Default)]
pub struct JsonContract;

impl<S, B> Transform<S, ServiceRequest> for JsonContract
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = JsonContractMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(JsonContractMiddleware { service })
    }
}

pub struct JsonContractMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for JsonContractMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Err(err) = check_headers(req.headers()) {
            log::debug!("{} {} rejected: {}", req.method(), req.path(), err);
            let res = req.into_response(err.error_response()).map_into_right_body();
            return Box::pin(async move { Ok(res) });
        }

        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_left_body())
        })
    }
}
