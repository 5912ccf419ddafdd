use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default timer length for a freshly created user
pub const DEFAULT_TIME_LENGTH: i64 = 10;

/// Default pixel budget for a freshly created user
pub const DEFAULT_PIXEL_AMOUNT: i64 = 10;

/// User is keyed by the opaque identity subject the caller presents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub auth_sub: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub picture: Option<String>,
    pub is_custom_time: bool,
    pub custom_time_alarm: Option<String>,
    pub today_time: Option<DateTime<Utc>>,
    pub time_length: i64,
    pub pixel_amount: i64,
}

/// Profile fields accepted when a user is first created
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub picture: Option<String>,
}

/// Art is a single artwork record. Content is filled in after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Art {
    pub id: i64,
    pub user_id: i64,
    pub image: Option<String>,
    pub title: Option<String>,
    pub comments: Vec<serde_json::Value>,
    pub modified_date: Option<DateTime<Utc>>,
    pub is_public: bool,
    /// Earlier version this art supersedes. Not checked for cycles or dangling ids.
    pub previous_art_id: Option<i64>,
}

/// Gallery is a curated collection of arts owned by one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gallery {
    pub id: i64,
    pub user_id: i64,
    pub name: Option<String>,
    pub profile: Option<String>,
    pub comments: Vec<serde_json::Value>,
    pub creation_date: Option<DateTime<Utc>>,
    pub is_public: bool,
}

/// The resource kinds that carry their own id space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    User,
    Art,
    Gallery,
}

impl ResourceKind {
    /// Collection path segment, also used to build self links
    pub fn collection(self) -> &'static str {
        match self {
            ResourceKind::User => "users",
            ResourceKind::Art => "arts",
            ResourceKind::Gallery => "galleries",
        }
    }

    /// Capitalized name used at the start of error messages
    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::User => "User",
            ResourceKind::Art => "Art",
            ResourceKind::Gallery => "Gallery",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::User => write!(f, "user"),
            ResourceKind::Art => write!(f, "art"),
            ResourceKind::Gallery => write!(f, "gallery"),
        }
    }
}

/// Decode a stored comments column. Anything that is not a JSON array
/// degrades to an empty list.
pub fn parse_comments(raw: Option<&str>) -> Vec<serde_json::Value> {
    raw.and_then(|s| serde_json::from_str::<Vec<serde_json::Value>>(s).ok())
        .unwrap_or_default()
}
