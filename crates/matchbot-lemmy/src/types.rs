use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub i64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommunityId(pub i64);

impl fmt::Display for CommunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Account the bot logs in with.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of `POST /post`.
#[derive(Debug, Clone, Serialize)]
pub struct NewPost {
    pub name: String,
    pub community_id: CommunityId,
    pub body: String,
    pub nsfw: bool,
}

/// Body of `PUT /post`. Fields left as `None` are not sent and keep their
/// current value on the platform.
#[derive(Debug, Clone, Serialize)]
pub struct PostEdit {
    pub post_id: PostId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nsfw: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_id: Option<i32>,
}

impl PostEdit {
    pub fn body(post_id: PostId, body: String) -> Self {
        Self {
            post_id,
            name: None,
            url: None,
            body: Some(body),
            nsfw: None,
            language_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeatureType {
    Community,
    Local,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct FeaturePost {
    pub post_id: PostId,
    pub featured: bool,
    pub feature_type: FeatureType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortType {
    Active,
    Hot,
    #[default]
    New,
    Old,
    NewComments,
}

impl SortType {
    pub fn as_str(self) -> &'static str {
        match self {
            SortType::Active => "Active",
            SortType::Hot => "Hot",
            SortType::New => "New",
            SortType::Old => "Old",
            SortType::NewComments => "NewComments",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub name: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    pub community_id: CommunityId,
    pub creator_id: i64,
    #[serde(default)]
    pub nsfw: bool,
    #[serde(default)]
    pub featured_community: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Person {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostView {
    pub post: Post,
    pub creator: Person,
}

/// The parts of a listed post the bot makes decisions on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostSummary {
    pub id: PostId,
    pub title: String,
    pub author_username: String,
    pub featured: bool,
}

impl From<PostView> for PostSummary {
    fn from(view: PostView) -> Self {
        Self {
            id: view.post.id,
            title: view.post.name,
            author_username: view.creator.name,
            featured: view.post.featured_community,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonCounts {
    #[serde(default)]
    pub post_count: i64,
    #[serde(default)]
    pub comment_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonView {
    pub person: Person,
    pub counts: PersonCounts,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonDetails {
    pub person_view: PersonView,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(default)]
    pub jwt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostResponse {
    pub post_view: PostView,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GetPostsResponse {
    pub posts: Vec<PostView>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_edit_omits_unset_fields() {
        let edit = PostEdit::body(PostId(7), "new body".into());
        let json = serde_json::to_value(&edit).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "post_id": 7, "body": "new body" })
        );
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials {
            username: "matchbot".into(),
            password: "hunter2".into(),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("matchbot"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn summary_from_view() {
        let view: PostView = serde_json::from_value(serde_json::json!({
            "post": {
                "id": 3,
                "name": "Weekly Discussion Thread - Oct 12, 2026",
                "community_id": 11742,
                "creator_id": 9,
                "featured_community": true
            },
            "creator": { "id": 9, "name": "matchbot" }
        }))
        .unwrap();
        let summary = PostSummary::from(view);
        assert_eq!(summary.id, PostId(3));
        assert_eq!(summary.author_username, "matchbot");
        assert!(summary.featured);
    }
}
