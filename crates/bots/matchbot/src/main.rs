use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use matchbot::database::RedbLedgerStore;
use matchbot::editor::{EditOutcome, EditorError, edit_post_body};
use matchbot::enrichment::EnrichmentQueue;
use matchbot::fixture_cache::FixtureCache;
use matchbot::ledger::{FileLedgerStore, Ledger, LedgerError, LedgerStore};
use matchbot::lock::{CycleLock, LockError};
use matchbot::publisher::LemmyPublisher;
use matchbot::{Bot, BotConfig, LOG_TARGET};
use matchbot_football::{FootballClient, FootballError};
use matchbot_lemmy::{CommunityId, Credentials, LemmyClient, LemmyError, PostId};
use snafu::{ResultExt as _, Snafu};
use time::OffsetDateTime;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Snafu)]
pub enum BotError {
    #[snafu(display("Logging initialization failed"))]
    Logging,
    #[snafu(display("Lemmy API root, username and password are required"))]
    MissingLemmyCredentials,
    #[snafu(display("RapidAPI key is required"))]
    MissingApiKey,
    #[snafu(display("Platform error: {source}"))]
    Lemmy { source: LemmyError },
    #[snafu(display("Sports data error: {source}"))]
    Football { source: FootballError },
    #[snafu(display("Ledger error: {source}"))]
    Ledger { source: LedgerError },
    #[snafu(display("Lock error: {source}"))]
    Lock { source: LockError },
    #[snafu(display("Editing failed: {source}"))]
    Editor { source: EditorError },
    #[snafu(display("Could not create data dir {}: {source}", path.display()))]
    DataDir { path: PathBuf, source: io::Error },
}

pub type BotResult<T> = std::result::Result<T, BotError>;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LedgerBackend {
    /// Newline separated `posted.txt`
    File,
    /// `matchbot.redb` database
    Redb,
}

/// Matchbot - posts match threads and weekly discussions to a Lemmy community
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Opts {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Lemmy API root, e.g. https://lemmy.world/api/v3
    #[arg(long, env = "LEMMY_API_ROOT")]
    pub lemmy_api_root: Option<String>,

    #[arg(long, env = "LEMMY_USERNAME")]
    pub lemmy_username: Option<String>,

    #[arg(long, env = "LEMMY_PASSWORD", hide_env_values = true)]
    pub lemmy_password: Option<String>,

    /// API-Football key (RapidAPI)
    #[arg(long, env = "RAPID_API_KEY", hide_env_values = true)]
    pub rapid_api_key: Option<String>,

    /// Where the ledger, caches and lock file live
    #[arg(long, env = "MATCHBOT_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Community to post into
    #[arg(long, env = "MATCHBOT_COMMUNITY_ID", default_value = "11742")]
    pub community_id: i64,

    /// Team to follow (API-Football id)
    #[arg(long, env = "MATCHBOT_TEAM_ID", default_value = "40")]
    pub team_id: u64,

    #[arg(long, env = "MATCHBOT_LEDGER", value_enum, default_value = "file")]
    pub ledger: LedgerBackend,

    /// Start polling for lineups this many minutes before kickoff
    #[arg(long, env = "MATCHBOT_LINEUP_LEAD_MINUTES", default_value = "55")]
    pub lineup_lead_minutes: u32,

    /// Footer appended to every post
    #[arg(long, env = "MATCHBOT_SIGNATURE", default_value = "~posted~ ~by~ ~matchbot~")]
    pub signature: String,
}

impl Opts {
    fn lemmy_client(&self) -> BotResult<LemmyClient> {
        let (Some(api_root), Some(username), Some(password)) = (
            self.lemmy_api_root.as_deref(),
            self.lemmy_username.clone(),
            self.lemmy_password.clone(),
        ) else {
            return MissingLemmyCredentialsSnafu.fail();
        };
        LemmyClient::new(api_root, Credentials { username, password }).context(LemmySnafu)
    }

    fn football_client(&self) -> BotResult<FootballClient> {
        let api_key = self
            .rapid_api_key
            .as_deref()
            .ok_or(BotError::MissingApiKey)?;
        FootballClient::new(api_key).context(FootballSnafu)
    }

    fn bot_config(&self) -> BotConfig {
        BotConfig {
            team_id: self.team_id,
            community_id: CommunityId(self.community_id),
            lineup_lead: time::Duration::minutes(i64::from(self.lineup_lead_minutes)),
            signature: self.signature.clone(),
            ..BotConfig::default()
        }
    }
}

#[derive(Debug, Parser)]
pub enum Command {
    /// Open a post body in an editor and submit the changes
    Edit {
        post_id: i64,

        #[arg(long, env = "EDITOR", default_value = "vim")]
        editor: String,
    },
    /// Development commands
    Dev {
        #[command(subcommand)]
        dev_command: DevCommand,
    },
}

#[derive(Debug, Parser)]
pub enum DevCommand {
    /// Print the upcoming fixtures and their thread titles
    Fixtures,
    /// Log in and print the bot account
    Whoami,
}

#[snafu::report]
#[tokio::main(flavor = "current_thread")]
async fn main() -> BotResult<()> {
    init_logging()?;

    let opts = Opts::parse();

    match &opts.command {
        Some(Command::Edit { post_id, editor }) => {
            let client = opts.lemmy_client()?;
            match edit_post_body(&client, PostId(*post_id), editor)
                .await
                .context(EditorSnafu)?
            {
                EditOutcome::Unchanged => println!("No changes, post {post_id} left as is"),
                EditOutcome::Updated => println!("Post {post_id} updated"),
            }
            Ok(())
        }
        Some(Command::Dev { dev_command }) => handle_dev_command(&opts, dev_command).await,
        None => run_bot(&opts).await,
    }
}

async fn run_bot(opts: &Opts) -> BotResult<()> {
    let config = opts.bot_config();
    info!(
        target: LOG_TARGET,
        team_id = config.team_id,
        community_id = %config.community_id,
        data_dir = %opts.data_dir.display(),
        ledger = ?opts.ledger,
        "Bot configuration"
    );

    let source = opts.football_client()?;
    let platform = LemmyPublisher::new(opts.lemmy_client()?);

    tokio::fs::create_dir_all(&opts.data_dir)
        .await
        .context(DataDirSnafu {
            path: &opts.data_dir,
        })?;

    let now = OffsetDateTime::now_utc();
    let lock_path = opts.data_dir.join("matchbot.lock");
    let Some(_lock) = CycleLock::try_acquire(lock_path, now.unix_timestamp()).context(LockSnafu)?
    else {
        info!(target: LOG_TARGET, "Another cycle is still running, nothing to do");
        return Ok(());
    };

    let store: Box<dyn LedgerStore> = match opts.ledger {
        LedgerBackend::File => Box::new(FileLedgerStore::new(opts.data_dir.join("posted.txt"))),
        LedgerBackend::Redb => Box::new(
            RedbLedgerStore::open(opts.data_dir.join("matchbot.redb"))
                .await
                .context(LedgerSnafu)?,
        ),
    };
    let mut ledger = Ledger::load(store).await.context(LedgerSnafu)?;
    let mut queue = EnrichmentQueue::load(opts.data_dir.join("pending_enrichments.json")).await;

    let bot = Bot::new(config, Arc::new(source), Arc::new(platform))
        .with_fixture_cache(FixtureCache::new(
            opts.data_dir.join("fixtures_from_today.json"),
        ));

    bot.run_one_cycle(&mut ledger, &mut queue, now).await;
    Ok(())
}

async fn handle_dev_command(opts: &Opts, dev_command: &DevCommand) -> BotResult<()> {
    match dev_command {
        DevCommand::Fixtures => {
            let client = opts.football_client()?;
            let fixtures = client
                .upcoming_fixtures(opts.team_id, BotConfig::default().fixture_count)
                .await
                .context(FootballSnafu)?;

            println!("{} upcoming fixtures:", fixtures.len());
            println!();
            for fixture in fixtures {
                println!("Fixture {}:", fixture.id());
                println!("  Kickoff: {}", fixture.kickoff());
                println!("  Status: {}", fixture.fixture.status.long);
                println!("  Title: {}", fixture.format_title());
                println!();
            }
            Ok(())
        }
        DevCommand::Whoami => {
            let client = opts.lemmy_client()?;
            let session = client.login().await.context(LemmySnafu)?;
            let details = session
                .get_person(session.username())
                .await
                .context(LemmySnafu)?;
            let person = &details.person_view.person;

            println!("Logged in as {} (id {})", person.name, person.id);
            if let Some(display_name) = person.display_name.as_deref() {
                println!("  Display name: {display_name}");
            }
            println!("  Posts: {}", details.person_view.counts.post_count);
            println!("  Comments: {}", details.person_view.counts.comment_count);
            Ok(())
        }
    }
}

pub fn init_logging() -> BotResult<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .try_init()
        .map_err(|_| BotError::Logging)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn lineup_lead_must_not_be_negative() {
        assert!(Opts::try_parse_from(["matchbot", "--lineup-lead-minutes=-5"]).is_err());

        let opts = Opts::try_parse_from(["matchbot", "--lineup-lead-minutes", "30"]).unwrap();
        assert_eq!(opts.bot_config().lineup_lead, time::Duration::minutes(30));
    }
}
