use async_trait::async_trait;
use matchbot_lemmy::{
    CommunityId, LemmyClient, LemmyResult, NewPost, Post, PostEdit, PostId, PostSummary, SortType,
};
use tracing::debug;

const LOG_TARGET: &str = "matchbot::publisher";

/// How many recent posts are inspected when looking for old discussions.
pub const RECENT_POSTS_LIMIT: u32 = 25;

/// Content operations the bot performs on the platform.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Account the bot posts as.
    fn username(&self) -> &str;

    async fn publish(&self, post: &NewPost) -> LemmyResult<PostId>;

    async fn edit(&self, edit: &PostEdit) -> LemmyResult<Post>;

    async fn set_pinned(&self, post_id: PostId, pinned: bool) -> LemmyResult<Post>;

    /// Newest posts first.
    async fn list_recent(&self, community_id: CommunityId, limit: u32)
    -> LemmyResult<Vec<PostSummary>>;
}

/// [`Platform`] over a Lemmy instance. Every operation logs in on its own
/// and drops the session afterwards; no token outlives a single call.
pub struct LemmyPublisher {
    client: LemmyClient,
}

impl LemmyPublisher {
    pub fn new(client: LemmyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Platform for LemmyPublisher {
    fn username(&self) -> &str {
        self.client.username()
    }

    async fn publish(&self, post: &NewPost) -> LemmyResult<PostId> {
        let session = self.client.login().await?;
        let view = session.publish_post(post).await?;
        debug!(target: LOG_TARGET, post_id = %view.post.id, "Published");
        Ok(view.post.id)
    }

    async fn edit(&self, edit: &PostEdit) -> LemmyResult<Post> {
        let session = self.client.login().await?;
        Ok(session.edit_post(edit).await?.post)
    }

    async fn set_pinned(&self, post_id: PostId, pinned: bool) -> LemmyResult<Post> {
        let session = self.client.login().await?;
        Ok(session.feature_post(post_id, pinned).await?.post)
    }

    async fn list_recent(
        &self,
        community_id: CommunityId,
        limit: u32,
    ) -> LemmyResult<Vec<PostSummary>> {
        let session = self.client.login().await?;
        let posts = session
            .list_posts(community_id, SortType::New, limit)
            .await?;
        Ok(posts.into_iter().map(PostSummary::from).collect())
    }
}

/// Append the bot's footer to a post body.
pub fn with_signature(body: &str, signature: &str) -> String {
    if signature.is_empty() {
        body.to_owned()
    } else {
        format!("{body}\n\n{signature}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_a_trailing_paragraph() {
        assert_eq!(
            with_signature("What's on your mind?", "~posted~ ~by~ ~matchbot~"),
            "What's on your mind?\n\n~posted~ ~by~ ~matchbot~"
        );
        assert_eq!(with_signature("body", ""), "body");
    }
}
