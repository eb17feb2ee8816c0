//! Weekly discussion thread rotation.

use matchbot_football::format_date;
use matchbot_lemmy::{CommunityId, LemmyError, NewPost, PostId, PostSummary};
use matchbot_util_error::FmtCompact as _;
use snafu::{ResultExt as _, Snafu};
use time::{Date, OffsetDateTime, Time, UtcOffset};
use tracing::{debug, info, warn};

use crate::ledger::{Ledger, discussion_key};
use crate::publisher::{Platform, RECENT_POSTS_LIMIT, with_signature};

const LOG_TARGET: &str = "matchbot::discussion";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DiscussionError {
    #[snafu(display("Could not publish weekly discussion: {source}"))]
    Publish { source: LemmyError },
    #[snafu(display("Could not pin weekly discussion {post_id}: {source}"))]
    Pin { post_id: PostId, source: LemmyError },
}

pub type DiscussionResult<T> = std::result::Result<T, DiscussionError>;

#[derive(Debug, Clone)]
pub struct DiscussionSettings {
    pub community_id: CommunityId,
    /// Also identifies the bot's older discussion posts.
    pub title_prefix: String,
    pub body: String,
    pub signature: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOutcome {
    AlreadyPosted,
    Posted(PostId),
}

/// Monday (UTC) of the week containing `now`.
pub fn week_start(now: OffsetDateTime) -> Date {
    let today = now.to_offset(UtcOffset::UTC).date();
    today - time::Duration::days(i64::from(today.weekday().number_days_from_monday()))
}

pub fn discussion_title(prefix: &str, monday: Date) -> String {
    format!(
        "{prefix} - {}",
        format_date(monday.with_time(Time::MIDNIGHT).assume_utc())
    )
}

/// Post and pin this week's discussion thread unless the ledger already has
/// it, unpinning the bot's previous ones that are still pinned first.
///
/// Unpinning is best-effort; only publishing and pinning the new post can
/// fail the rotation. The ledger is updated after both succeed.
pub async fn rotate_discussion(
    platform: &dyn Platform,
    ledger: &mut Ledger,
    settings: &DiscussionSettings,
    now: OffsetDateTime,
) -> DiscussionResult<RotationOutcome> {
    let monday = week_start(now);
    let key = discussion_key(monday);
    if ledger.contains(&key) {
        debug!(target: LOG_TARGET, %key, "Weekly discussion already posted");
        return Ok(RotationOutcome::AlreadyPosted);
    }

    let previous: Vec<PostSummary> = match platform
        .list_recent(settings.community_id, RECENT_POSTS_LIMIT)
        .await
    {
        Ok(posts) => posts
            .into_iter()
            .filter(|post| {
                post.featured
                    && post.author_username == platform.username()
                    && post.title.starts_with(&settings.title_prefix)
            })
            .collect(),
        Err(err) => {
            warn!(target: LOG_TARGET, err = %err.fmt_compact(), "Could not list recent posts, old discussions stay pinned");
            vec![]
        }
    };

    let unpins = previous.iter().map(|post| async move {
        if let Err(err) = platform.set_pinned(post.id, false).await {
            warn!(target: LOG_TARGET, post_id = %post.id, err = %err.fmt_compact(), "Could not unpin old discussion");
        } else {
            debug!(target: LOG_TARGET, post_id = %post.id, "Unpinned old discussion");
        }
    });
    futures::future::join_all(unpins).await;

    let title = discussion_title(&settings.title_prefix, monday);
    let post_id = platform
        .publish(&NewPost {
            name: title.clone(),
            community_id: settings.community_id,
            body: with_signature(&settings.body, &settings.signature),
            nsfw: false,
        })
        .await
        .context(PublishSnafu)?;

    platform
        .set_pinned(post_id, true)
        .await
        .context(PinSnafu { post_id })?;

    info!(target: LOG_TARGET, %post_id, %title, "Weekly discussion posted");

    if let Err(err) = ledger.record(key).await {
        warn!(target: LOG_TARGET, %post_id, err = %err.fmt_compact(), "Discussion posted but could not be recorded; it may be posted again");
    }

    Ok(RotationOutcome::Posted(post_id))
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;

    #[test]
    fn week_starts_on_monday() {
        // 2026-10-19 is a Monday.
        assert_eq!(week_start(datetime!(2026-10-19 00:00 UTC)), date!(2026 - 10 - 19));
        assert_eq!(week_start(datetime!(2026-10-21 13:37 UTC)), date!(2026 - 10 - 19));
        assert_eq!(week_start(datetime!(2026-10-25 23:59 UTC)), date!(2026 - 10 - 19));
        assert_eq!(week_start(datetime!(2026-10-26 00:00 UTC)), date!(2026 - 10 - 26));
    }

    #[test]
    fn week_start_uses_utc() {
        // Still Sunday in UTC.
        assert_eq!(
            week_start(datetime!(2026-10-26 01:00 +02:00)),
            date!(2026 - 10 - 19)
        );
    }

    #[test]
    fn title_shows_monday() {
        assert_eq!(
            discussion_title("Weekly Discussion Thread", date!(2026 - 10 - 19)),
            "Weekly Discussion Thread - Oct 19, 2026"
        );
    }
}
