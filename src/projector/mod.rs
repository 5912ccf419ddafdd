//! Wire shapes for users, arts and galleries.
//!
//! Every field is renamed to its resource-prefixed wire name, and every
//! entity carries a `self` link built from the public base URL.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Art, Gallery, ResourceKind, User};
use crate::store::{Store, StoreResult};

#[derive(Debug, Serialize)]
pub struct FriendRef {
    #[serde(rename = "U_ID")]
    pub id: i64,
    #[serde(rename = "U_Name")]
    pub name: Option<String>,
    #[serde(rename = "self")]
    pub self_link: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    #[serde(rename = "U_ID")]
    pub id: i64,
    #[serde(rename = "U_Auth_Sub")]
    pub auth_sub: String,
    #[serde(rename = "U_Name")]
    pub name: Option<String>,
    #[serde(rename = "U_Email")]
    pub email: Option<String>,
    #[serde(rename = "U_Profile")]
    pub picture: Option<String>,
    #[serde(rename = "Is_Custom_Time")]
    pub is_custom_time: bool,
    #[serde(rename = "Custom_Time_Alarm")]
    pub custom_time_alarm: Option<String>,
    #[serde(rename = "Today_Time")]
    pub today_time: Option<DateTime<Utc>>,
    #[serde(rename = "Time_Length")]
    pub time_length: i64,
    #[serde(rename = "Pixel_Amount")]
    pub pixel_amount: i64,
    #[serde(rename = "U_Friends")]
    pub friends: Vec<FriendRef>,
    #[serde(rename = "self")]
    pub self_link: String,
}

/// One-hop reference to an earlier art. Serializes as `{}` when unset.
#[derive(Debug, Default, Serialize)]
pub struct PreviousRef {
    #[serde(rename = "A_ID", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "self", skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ArtResponse {
    #[serde(rename = "A_ID")]
    pub id: i64,
    #[serde(rename = "A_Image")]
    pub image: Option<String>,
    #[serde(rename = "A_Title")]
    pub title: Option<String>,
    #[serde(rename = "A_Comments")]
    pub comments: Vec<serde_json::Value>,
    #[serde(rename = "A_Modified_Date")]
    pub modified_date: Option<DateTime<Utc>>,
    #[serde(rename = "A_Is_Public")]
    pub is_public: bool,
    #[serde(rename = "A_Previous")]
    pub previous: PreviousRef,
    #[serde(rename = "self")]
    pub self_link: String,
}

#[derive(Debug, Serialize)]
pub struct GalleryResponse {
    #[serde(rename = "G_ID")]
    pub id: i64,
    #[serde(rename = "G_Name")]
    pub name: Option<String>,
    #[serde(rename = "G_Profile")]
    pub profile: Option<String>,
    #[serde(rename = "G_Comments")]
    pub comments: Vec<serde_json::Value>,
    #[serde(rename = "G_Creation_Date")]
    pub creation_date: Option<DateTime<Utc>>,
    #[serde(rename = "G_Is_Public")]
    pub is_public: bool,
    #[serde(rename = "G_Arts")]
    pub arts: Vec<ArtResponse>,
    #[serde(rename = "self")]
    pub self_link: String,
}

/// Builds responses and links against one public base URL
#[derive(Debug, Clone)]
pub struct Projector {
    base_url: String,
}

impl Projector {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Projector { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn self_link(&self, kind: ResourceKind, id: i64) -> String {
        format!("{}/{}/{}", self.base_url, kind.collection(), id)
    }

    pub fn user(&self, user: &User, friends: &[User]) -> UserResponse {
        UserResponse {
            id: user.id,
            auth_sub: user.auth_sub.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            picture: user.picture.clone(),
            is_custom_time: user.is_custom_time,
            custom_time_alarm: user.custom_time_alarm.clone(),
            today_time: user.today_time,
            time_length: user.time_length,
            pixel_amount: user.pixel_amount,
            friends: friends
                .iter()
                .map(|f| FriendRef {
                    id: f.id,
                    name: f.name.clone(),
                    self_link: self.self_link(ResourceKind::User, f.id),
                })
                .collect(),
            self_link: self.self_link(ResourceKind::User, user.id),
        }
    }

    /// The previous reference is projected from the stored id alone, so a
    /// dangling or cyclic link still renders and never recurses.
    pub fn art(&self, art: &Art) -> ArtResponse {
        let previous = match art.previous_art_id {
            Some(prev) => PreviousRef {
                id: Some(prev),
                self_link: Some(self.self_link(ResourceKind::Art, prev)),
            },
            None => PreviousRef::default(),
        };

        ArtResponse {
            id: art.id,
            image: art.image.clone(),
            title: art.title.clone(),
            comments: art.comments.clone(),
            modified_date: art.modified_date,
            is_public: art.is_public,
            previous,
            self_link: self.self_link(ResourceKind::Art, art.id),
        }
    }

    pub fn gallery(&self, gallery: &Gallery, arts: &[Art]) -> GalleryResponse {
        GalleryResponse {
            id: gallery.id,
            name: gallery.name.clone(),
            profile: gallery.profile.clone(),
            comments: gallery.comments.clone(),
            creation_date: gallery.creation_date,
            is_public: gallery.is_public,
            arts: arts.iter().map(|a| self.art(a)).collect(),
            self_link: self.self_link(ResourceKind::Gallery, gallery.id),
        }
    }

    /// Project a user with its friend list loaded from the store
    pub fn user_expanded(&self, store: &Store, user: &User) -> StoreResult<UserResponse> {
        let friends = store.list_friends(user.id)?;
        Ok(self.user(user, &friends))
    }

    /// Project a gallery with its member arts loaded from the store
    pub fn gallery_expanded(&self, store: &Store, gallery: &Gallery) -> StoreResult<GalleryResponse> {
        let arts = store.list_gallery_arts(gallery.id)?;
        Ok(self.gallery(gallery, &arts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn projector() -> Projector {
        Projector::new("http://localhost:3000/")
    }

    fn art(id: i64, previous: Option<i64>) -> Art {
        Art {
            id,
            user_id: 1,
            image: None,
            title: Some("Sunset".to_string()),
            comments: vec![json!("wow"), json!(2)],
            modified_date: None,
            is_public: false,
            previous_art_id: previous,
        }
    }

    #[test]
    fn test_self_link() {
        assert_eq!(
            projector().self_link(ResourceKind::Gallery, 4),
            "http://localhost:3000/galleries/4"
        );
    }

    #[test]
    fn test_art_without_previous() {
        let value = serde_json::to_value(projector().art(&art(1, None))).unwrap();
        assert_eq!(value["A_ID"], 1);
        assert_eq!(value["A_Title"], "Sunset");
        assert_eq!(value["A_Image"], serde_json::Value::Null);
        assert_eq!(value["A_Comments"], json!(["wow", 2]));
        assert_eq!(value["A_Is_Public"], false);
        assert_eq!(value["A_Previous"], json!({}));
        assert_eq!(value["self"], "http://localhost:3000/arts/1");
    }

    #[test]
    fn test_art_previous_is_one_hop() {
        let value = serde_json::to_value(projector().art(&art(3, Some(3)))).unwrap();
        assert_eq!(
            value["A_Previous"],
            json!({"A_ID": 3, "self": "http://localhost:3000/arts/3"})
        );
    }

    #[test]
    fn test_user_with_friends() {
        let user = User {
            id: 1,
            auth_sub: "user1".to_string(),
            name: Some("Ann".to_string()),
            email: None,
            picture: Some("pic.png".to_string()),
            is_custom_time: false,
            custom_time_alarm: None,
            today_time: None,
            time_length: 10,
            pixel_amount: 10,
        };
        let friend = User {
            id: 2,
            auth_sub: "user2".to_string(),
            name: None,
            ..user.clone()
        };

        let value = serde_json::to_value(projector().user(&user, &[friend])).unwrap();
        assert_eq!(value["U_ID"], 1);
        assert_eq!(value["U_Auth_Sub"], "user1");
        assert_eq!(value["U_Profile"], "pic.png");
        assert_eq!(value["Time_Length"], 10);
        assert_eq!(value["Pixel_Amount"], 10);
        assert_eq!(
            value["U_Friends"],
            json!([{"U_ID": 2, "U_Name": null, "self": "http://localhost:3000/users/2"}])
        );
        assert_eq!(value["self"], "http://localhost:3000/users/1");
    }

    #[test]
    fn test_gallery_embeds_arts() {
        let gallery = Gallery {
            id: 5,
            user_id: 1,
            name: None,
            profile: None,
            comments: Vec::new(),
            creation_date: None,
            is_public: true,
        };
        let value =
            serde_json::to_value(projector().gallery(&gallery, &[art(1, None), art(2, Some(1))]))
                .unwrap();
        assert_eq!(value["G_ID"], 5);
        assert_eq!(value["G_Is_Public"], true);
        assert_eq!(value["G_Comments"], json!([]));
        assert_eq!(value["G_Arts"][0]["A_ID"], 1);
        assert_eq!(value["G_Arts"][1]["A_Previous"]["A_ID"], 1);
        assert_eq!(value["self"], "http://localhost:3000/galleries/5");
    }
}
