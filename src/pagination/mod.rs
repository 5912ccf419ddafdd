use actix_web::web;
use serde::Serialize;
use std::collections::HashMap;

use crate::error::AppError;

pub const DEFAULT_LIMIT: i64 = 5;
pub const DEFAULT_OFFSET: i64 = 0;

/// A validated `limit`/`offset` window over a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Page {
            limit: DEFAULT_LIMIT,
            offset: DEFAULT_OFFSET,
        }
    }
}

impl Page {
    /// Parse `limit` and `offset` from a raw query string. Absent or empty
    /// values take the defaults; anything else must be an integer with
    /// `limit > 0` and `offset >= 0`.
    pub fn from_query(query: &str) -> Result<Self, AppError> {
        let params = web::Query::<HashMap<String, String>>::from_query(query)
            .map_err(|_| AppError::BadRequest)?
            .into_inner();

        let limit = parse_param(params.get("limit"), DEFAULT_LIMIT)?;
        let offset = parse_param(params.get("offset"), DEFAULT_OFFSET)?;

        if limit <= 0 || offset < 0 {
            return Err(AppError::BadRequest);
        }

        Ok(Page { limit, offset })
    }

    pub fn next_offset(&self) -> i64 {
        self.offset.saturating_add(self.limit)
    }
}

fn parse_param(raw: Option<&String>, default: i64) -> Result<i64, AppError> {
    match raw.map(|s| s.trim()) {
        None | Some("") => Ok(default),
        Some(s) => s.parse::<i64>().map_err(|_| AppError::BadRequest),
    }
}

/// Link to the page after `page`, or `None` once the collection is exhausted
pub fn next_link(base_url: &str, path: &str, page: Page, total: i64) -> Option<String> {
    let next = page.next_offset();
    if next >= total {
        return None;
    }
    Some(format!(
        "{}{}?limit={}&offset={}",
        base_url, path, page.limit, next
    ))
}

/// Wire shape of a paged list response
#[derive(Debug, Serialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}
