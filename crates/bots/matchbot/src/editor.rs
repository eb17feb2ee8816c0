//! `matchbot edit`: fix up a post body by hand.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use matchbot_lemmy::{LemmyClient, LemmyError, PostEdit, PostId};
use snafu::{ResultExt as _, Snafu};
use tracing::info;

const LOG_TARGET: &str = "matchbot::editor";

#[derive(Debug, Snafu)]
pub enum EditorError {
    #[snafu(display("Platform error: {source}"))]
    Platform { source: LemmyError },
    #[snafu(display("Could not create temporary directory: {source}"))]
    TempDir { source: io::Error },
    #[snafu(display("Could not access {}: {source}", path.display()))]
    File { path: PathBuf, source: io::Error },
    #[snafu(display("Could not start editor `{program}`: {source}"))]
    Spawn { program: String, source: io::Error },
    #[snafu(display("Editor exited with {status}"))]
    EditorFailed { status: ExitStatus },
}

pub type EditorResult<T> = std::result::Result<T, EditorError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Unchanged,
    Updated,
}

/// Open `text` in `editor` and return what the user saved.
///
/// `editor` may carry arguments (`code --wait`); the file path is appended.
pub async fn edit_text(text: &str, editor: &str) -> EditorResult<String> {
    let dir = tempfile::tempdir().context(TempDirSnafu)?;
    let path = dir.path().join("post.md");
    tokio::fs::write(&path, text)
        .await
        .context(FileSnafu { path: &path })?;

    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or("vim");
    let status = tokio::process::Command::new(program)
        .args(parts)
        .arg(&path)
        .status()
        .await
        .context(SpawnSnafu { program })?;
    if !status.success() {
        return EditorFailedSnafu { status }.fail();
    }

    tokio::fs::read_to_string(&path)
        .await
        .context(FileSnafu { path: &path })
}

/// Fetch `post_id`, let the operator edit its body and submit the result if
/// it changed.
pub async fn edit_post_body(
    client: &LemmyClient,
    post_id: PostId,
    editor: &str,
) -> EditorResult<EditOutcome> {
    let original = {
        let session = client.login().await.context(PlatformSnafu)?;
        let view = session.get_post(post_id).await.context(PlatformSnafu)?;
        view.post.body.unwrap_or_default()
    };

    let edited = edit_text(&original, editor).await?;
    if edited == original {
        return Ok(EditOutcome::Unchanged);
    }

    // The editor may have been open for a long time; log in again.
    let session = client.login().await.context(PlatformSnafu)?;
    session
        .edit_post(&PostEdit::body(post_id, edited))
        .await
        .context(PlatformSnafu)?;
    info!(target: LOG_TARGET, %post_id, "Post body updated");
    Ok(EditOutcome::Updated)
}
