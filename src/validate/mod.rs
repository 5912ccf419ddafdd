//! Typed update requests for arts and galleries.
//!
//! A request body is turned into a list of tagged fields. Keys outside the
//! resource's field set reject the whole body, and so does an empty body.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{Art, Gallery, ResourceKind};

pub const ART_TITLE: &str = "A_Title";
pub const ART_IMAGE: &str = "A_Image";
pub const ART_COMMENTS: &str = "A_Comments";
pub const ART_IS_PUBLIC: &str = "A_Is_Public";
pub const ART_PREVIOUS: &str = "A_Previous";
pub const ART_ID: &str = "A_ID";

pub const GALLERY_NAME: &str = "G_Name";
pub const GALLERY_PROFILE: &str = "G_Profile";
pub const GALLERY_COMMENTS: &str = "G_Comments";
pub const GALLERY_IS_PUBLIC: &str = "G_Is_Public";

/// Updatable art keys, in the order they are checked
pub const ART_FIELDS: [&str; 5] = [ART_TITLE, ART_IMAGE, ART_COMMENTS, ART_IS_PUBLIC, ART_PREVIOUS];

/// Keys a full art replacement must carry
pub const ART_REQUIRED: [&str; 3] = [ART_TITLE, ART_COMMENTS, ART_IS_PUBLIC];

/// Updatable gallery keys, all of which a full replacement must carry
pub const GALLERY_FIELDS: [&str; 4] =
    [GALLERY_NAME, GALLERY_PROFILE, GALLERY_COMMENTS, GALLERY_IS_PUBLIC];

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("{0} update must be a JSON object")]
    NotAnObject(ResourceKind),

    #[error("{kind} update has unrecognized field {field}")]
    UnknownField { kind: ResourceKind, field: String },

    #[error("{kind} field {field} has the wrong type")]
    WrongType {
        kind: ResourceKind,
        field: &'static str,
    },

    #[error("{kind} replacement is missing field {field}")]
    MissingField {
        kind: ResourceKind,
        field: &'static str,
    },

    #[error("{0} update has no fields")]
    Empty(ResourceKind),
}

impl ValidationError {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ValidationError::NotAnObject(kind) | ValidationError::Empty(kind) => *kind,
            ValidationError::UnknownField { kind, .. }
            | ValidationError::WrongType { kind, .. }
            | ValidationError::MissingField { kind, .. } => *kind,
        }
    }
}

/// Target of an art's previous-version reference
#[derive(Debug, Clone, PartialEq)]
pub enum PreviousLink {
    /// `{}` removes the reference
    Clear,
    /// `{"A_ID": n}` points at art `n`, which must exist
    Link(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArtField {
    Title(Option<String>),
    Image(Option<String>),
    Comments(Vec<Value>),
    IsPublic(bool),
    Previous(PreviousLink),
}

#[derive(Debug, Clone, PartialEq)]
pub enum GalleryField {
    Name(Option<String>),
    Profile(Option<String>),
    Comments(Vec<Value>),
    IsPublic(bool),
}

/// A validated art mutation
#[derive(Debug, Clone, PartialEq)]
pub struct ArtUpdate {
    fields: Vec<ArtField>,
}

impl ArtUpdate {
    /// PATCH body: any non-empty subset of the art fields
    pub fn partial(body: &Value) -> Result<Self, ValidationError> {
        let map = as_object(body, ResourceKind::Art)?;
        check_allowed(map, &ART_FIELDS, ResourceKind::Art)?;
        if map.is_empty() {
            return Err(ValidationError::Empty(ResourceKind::Art));
        }
        Self::parse_fields(map)
    }

    /// PUT body: title, comments and public flag are required. Image and
    /// previous reference keep their stored values when absent.
    pub fn full(body: &Value) -> Result<Self, ValidationError> {
        let map = as_object(body, ResourceKind::Art)?;
        check_allowed(map, &ART_FIELDS, ResourceKind::Art)?;
        check_required(map, &ART_REQUIRED, ResourceKind::Art)?;
        Self::parse_fields(map)
    }

    fn parse_fields(map: &Map<String, Value>) -> Result<Self, ValidationError> {
        let kind = ResourceKind::Art;
        let mut fields = Vec::with_capacity(map.len());

        for key in ART_FIELDS {
            let Some(value) = map.get(key) else {
                continue;
            };
            let field = match key {
                ART_TITLE => ArtField::Title(string_or_null(value, kind, ART_TITLE)?),
                ART_IMAGE => ArtField::Image(string_or_null(value, kind, ART_IMAGE)?),
                ART_COMMENTS => ArtField::Comments(sequence(value, kind, ART_COMMENTS)?),
                ART_IS_PUBLIC => ArtField::IsPublic(boolean(value, kind, ART_IS_PUBLIC)?),
                _ => ArtField::Previous(previous_link(value)?),
            };
            fields.push(field);
        }

        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[ArtField] {
        &self.fields
    }

    /// Art id the update wants to link to, if any
    pub fn linked_art(&self) -> Option<i64> {
        self.fields.iter().find_map(|f| match f {
            ArtField::Previous(PreviousLink::Link(id)) => Some(*id),
            _ => None,
        })
    }

    /// Write the fields onto `art` and stamp its modification time
    pub fn apply(self, art: &mut Art, now: DateTime<Utc>) {
        for field in self.fields {
            match field {
                ArtField::Title(v) => art.title = v,
                ArtField::Image(v) => art.image = v,
                ArtField::Comments(v) => art.comments = v,
                ArtField::IsPublic(v) => art.is_public = v,
                ArtField::Previous(PreviousLink::Clear) => art.previous_art_id = None,
                ArtField::Previous(PreviousLink::Link(id)) => art.previous_art_id = Some(id),
            }
        }
        art.modified_date = Some(now);
    }
}

/// A validated gallery mutation
#[derive(Debug, Clone, PartialEq)]
pub struct GalleryUpdate {
    fields: Vec<GalleryField>,
}

impl GalleryUpdate {
    pub fn partial(body: &Value) -> Result<Self, ValidationError> {
        let map = as_object(body, ResourceKind::Gallery)?;
        check_allowed(map, &GALLERY_FIELDS, ResourceKind::Gallery)?;
        if map.is_empty() {
            return Err(ValidationError::Empty(ResourceKind::Gallery));
        }
        Self::parse_fields(map)
    }

    pub fn full(body: &Value) -> Result<Self, ValidationError> {
        let map = as_object(body, ResourceKind::Gallery)?;
        check_allowed(map, &GALLERY_FIELDS, ResourceKind::Gallery)?;
        check_required(map, &GALLERY_FIELDS, ResourceKind::Gallery)?;
        Self::parse_fields(map)
    }

    fn parse_fields(map: &Map<String, Value>) -> Result<Self, ValidationError> {
        let kind = ResourceKind::Gallery;
        let mut fields = Vec::with_capacity(map.len());

        for key in GALLERY_FIELDS {
            let Some(value) = map.get(key) else {
                continue;
            };
            let field = match key {
                GALLERY_NAME => GalleryField::Name(string_or_null(value, kind, GALLERY_NAME)?),
                GALLERY_PROFILE => {
                    GalleryField::Profile(string_or_null(value, kind, GALLERY_PROFILE)?)
                }
                GALLERY_COMMENTS => {
                    GalleryField::Comments(sequence(value, kind, GALLERY_COMMENTS)?)
                }
                _ => GalleryField::IsPublic(boolean(value, kind, GALLERY_IS_PUBLIC)?),
            };
            fields.push(field);
        }

        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[GalleryField] {
        &self.fields
    }

    /// Write the fields onto `gallery`. The creation date is left alone.
    pub fn apply(self, gallery: &mut Gallery) {
        for field in self.fields {
            match field {
                GalleryField::Name(v) => gallery.name = v,
                GalleryField::Profile(v) => gallery.profile = v,
                GalleryField::Comments(v) => gallery.comments = v,
                GalleryField::IsPublic(v) => gallery.is_public = v,
            }
        }
    }
}

fn as_object(body: &Value, kind: ResourceKind) -> Result<&Map<String, Value>, ValidationError> {
    body.as_object().ok_or(ValidationError::NotAnObject(kind))
}

fn check_allowed(
    map: &Map<String, Value>,
    allowed: &[&str],
    kind: ResourceKind,
) -> Result<(), ValidationError> {
    match map.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(field) => Err(ValidationError::UnknownField {
            kind,
            field: field.clone(),
        }),
        None => Ok(()),
    }
}

fn check_required(
    map: &Map<String, Value>,
    required: &[&'static str],
    kind: ResourceKind,
) -> Result<(), ValidationError> {
    match required.iter().find(|f| !map.contains_key(**f)) {
        Some(field) => Err(ValidationError::MissingField {
            kind,
            field: *field,
        }),
        None => Ok(()),
    }
}

fn string_or_null(
    value: &Value,
    kind: ResourceKind,
    field: &'static str,
) -> Result<Option<String>, ValidationError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        _ => Err(ValidationError::WrongType { kind, field }),
    }
}

fn sequence(
    value: &Value,
    kind: ResourceKind,
    field: &'static str,
) -> Result<Vec<Value>, ValidationError> {
    value
        .as_array()
        .cloned()
        .ok_or(ValidationError::WrongType { kind, field })
}

fn boolean(value: &Value, kind: ResourceKind, field: &'static str) -> Result<bool, ValidationError> {
    value
        .as_bool()
        .ok_or(ValidationError::WrongType { kind, field })
}

fn previous_link(value: &Value) -> Result<PreviousLink, ValidationError> {
    let wrong = || ValidationError::WrongType {
        kind: ResourceKind::Art,
        field: ART_PREVIOUS,
    };
    let map = value.as_object().ok_or_else(wrong)?;
    if map.is_empty() {
        return Ok(PreviousLink::Clear);
    }
    map.get(ART_ID)
        .and_then(Value::as_i64)
        .map(PreviousLink::Link)
        .ok_or_else(wrong)
}
