//! Client for the API-Football v3 service (as hosted on RapidAPI), plus the
//! markdown rendering used by match threads.

mod error;
mod format;
mod types;

use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use snafu::ResultExt as _;
use tracing::debug;

pub use crate::error::*;
pub use crate::format::{format_date, format_form};
pub use crate::types::*;

const LOG_TARGET: &str = "matchbot::football";

pub const DEFAULT_BASE_URL: &str = "https://api-football-v1.p.rapidapi.com/v3";
const RAPIDAPI_HOST: &str = "api-football-v1.p.rapidapi.com";

/// Every endpoint wraps its payload the same way. `errors` is `[]` on
/// success and an object keyed by parameter on failure.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    errors: serde_json::Value,
    #[serde(default = "Vec::new")]
    response: Vec<T>,
}

fn has_errors(errors: &serde_json::Value) -> bool {
    match errors {
        serde_json::Value::Null => false,
        serde_json::Value::Array(items) => !items.is_empty(),
        serde_json::Value::Object(map) => !map.is_empty(),
        serde_json::Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

pub struct FootballClient {
    http: reqwest::Client,
    api_key: String,
    base_url: Url,
}

impl FootballClient {
    pub fn new(api_key: &str) -> FootballResult<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> FootballResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("matchbot/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .context(ClientBuildSnafu)?;
        let base_url = Url::parse(base_url).context(InvalidBaseUrlSnafu { base_url })?;

        Ok(Self {
            http,
            api_key: api_key.to_owned(),
            base_url,
        })
    }

    async fn get<T>(&self, endpoint: &'static str, query: &[(&str, String)]) -> FootballResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}/{endpoint}", self.base_url.as_str().trim_end_matches('/'));
        debug!(target: LOG_TARGET, %endpoint, ?query, "Querying sports data");

        let resp = self
            .http
            .get(url)
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", RAPIDAPI_HOST)
            .query(query)
            .send()
            .await
            .context(RequestSnafu { endpoint })?;

        let status = resp.status();
        if !status.is_success() {
            return StatusSnafu {
                endpoint,
                status: status.as_u16(),
            }
            .fail();
        }

        let bytes = resp.bytes().await.context(RequestSnafu { endpoint })?;
        let envelope: Envelope<T> =
            serde_json::from_slice(&bytes).context(DecodeSnafu { endpoint })?;

        if has_errors(&envelope.errors) {
            return ApiSnafu {
                endpoint,
                message: envelope.errors.to_string(),
            }
            .fail();
        }

        Ok(envelope.response)
    }

    /// The next `count` fixtures of a team, soonest first.
    pub async fn upcoming_fixtures(&self, team_id: u64, count: u32) -> FootballResult<Vec<Fixture>> {
        self.get(
            "fixtures",
            &[("team", team_id.to_string()), ("next", count.to_string())],
        )
        .await
    }

    /// The last `count` fixtures of a team, most recent first.
    pub async fn recent_fixtures(&self, team_id: u64, count: u32) -> FootballResult<Vec<Fixture>> {
        self.get(
            "fixtures",
            &[("team", team_id.to_string()), ("last", count.to_string())],
        )
        .await
    }

    pub async fn lineups(&self, fixture_id: u64) -> FootballResult<LineupStatus> {
        let lineups: Vec<TeamLineup> = self
            .get("fixtures/lineups", &[("fixture", fixture_id.to_string())])
            .await?;
        Ok(LineupStatus::from_lineups(lineups))
    }
}
