//! Minimal typed client for the Lemmy v3 HTTP API.
//!
//! Only the calls the bot needs are implemented. Authentication is explicit:
//! [`LemmyClient::login`] returns a [`Session`] carrying a fresh token, and
//! every content operation lives on the session. The client itself never
//! caches a token, so a caller that wants a new credential per operation just
//! logs in again.

mod error;
mod types;

use std::fmt;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use snafu::ResultExt as _;
use tracing::debug;
use url::Url;

pub use crate::error::*;
pub use crate::types::*;

const LOG_TARGET: &str = "matchbot::lemmy";

pub struct LemmyClient {
    http: reqwest::Client,
    api_root: Url,
    credentials: Credentials,
}

impl LemmyClient {
    /// `api_root` is the versioned API base, e.g. `https://lemmy.world/api/v3`.
    pub fn new(api_root: &str, credentials: Credentials) -> LemmyResult<Self> {
        let api_root = Url::parse(api_root).context(InvalidApiRootSnafu { api_root })?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("matchbot/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            http,
            api_root,
            credentials,
        })
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.api_root.as_str().trim_end_matches('/'))
    }

    /// Authenticate and return a session scoped to the caller.
    pub async fn login(&self) -> LemmyResult<Session<'_>> {
        const ENDPOINT: &str = "user/login";

        #[derive(Serialize)]
        struct Login<'a> {
            username_or_email: &'a str,
            password: &'a str,
        }

        debug!(target: LOG_TARGET, username = %self.credentials.username, "Logging in");
        let resp = self
            .http
            .post(self.endpoint(ENDPOINT))
            .json(&Login {
                username_or_email: &self.credentials.username,
                password: &self.credentials.password,
            })
            .send()
            .await
            .context(RequestSnafu { endpoint: ENDPOINT })?;

        let login: LoginResponse = read_json(ENDPOINT, resp).await?;
        let jwt = login.jwt.ok_or(LemmyError::MissingJwt)?;

        Ok(Session {
            client: self,
            jwt: Jwt(jwt),
        })
    }
}

struct Jwt(String);

impl fmt::Debug for Jwt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Jwt(<redacted>)")
    }
}

/// Payload wrapper adding the `auth` field some endpoints still insist on,
/// even with the bearer header present.
#[derive(Serialize)]
struct Authed<'a, T> {
    #[serde(flatten)]
    inner: &'a T,
    auth: &'a str,
}

/// An authenticated session. Dropping it discards the token.
#[derive(Debug)]
pub struct Session<'c> {
    client: &'c LemmyClient,
    jwt: Jwt,
}

impl fmt::Debug for LemmyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LemmyClient")
            .field("api_root", &self.api_root.as_str())
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl Session<'_> {
    pub fn username(&self) -> &str {
        self.client.username()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .http
            .request(method, self.client.endpoint(path))
            .bearer_auth(&self.jwt.0)
    }

    async fn send_json<T, R>(&self, method: Method, endpoint: &'static str, body: &T) -> LemmyResult<R>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let resp = self
            .request(method, endpoint)
            .json(&Authed {
                inner: body,
                auth: &self.jwt.0,
            })
            .send()
            .await
            .context(RequestSnafu { endpoint })?;
        read_json(endpoint, resp).await
    }

    async fn get_json<R>(&self, endpoint: &'static str, query: &[(&str, String)]) -> LemmyResult<R>
    where
        R: DeserializeOwned,
    {
        let resp = self
            .request(Method::GET, endpoint)
            .query(query)
            .query(&[("auth", &self.jwt.0)])
            .send()
            .await
            .context(RequestSnafu { endpoint })?;
        read_json(endpoint, resp).await
    }

    pub async fn publish_post(&self, post: &NewPost) -> LemmyResult<PostView> {
        debug!(target: LOG_TARGET, name = %post.name, community_id = %post.community_id, "Publishing post");
        let resp: PostResponse = self.send_json(Method::POST, "post", post).await?;
        Ok(resp.post_view)
    }

    pub async fn edit_post(&self, edit: &PostEdit) -> LemmyResult<PostView> {
        debug!(target: LOG_TARGET, post_id = %edit.post_id, "Editing post");
        let resp: PostResponse = self.send_json(Method::PUT, "post", edit).await?;
        Ok(resp.post_view)
    }

    /// Pin (`featured = true`) or unpin a post within its community.
    pub async fn feature_post(&self, post_id: PostId, featured: bool) -> LemmyResult<PostView> {
        debug!(target: LOG_TARGET, %post_id, featured, "Changing post pin state");
        let resp: PostResponse = self
            .send_json(
                Method::POST,
                "post/feature",
                &FeaturePost {
                    post_id,
                    featured,
                    feature_type: FeatureType::Community,
                },
            )
            .await?;
        Ok(resp.post_view)
    }

    pub async fn list_posts(
        &self,
        community_id: CommunityId,
        sort: SortType,
        limit: u32,
    ) -> LemmyResult<Vec<PostView>> {
        let resp: GetPostsResponse = self
            .get_json(
                "post/list",
                &[
                    ("community_id", community_id.to_string()),
                    ("sort", sort.as_str().to_owned()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(resp.posts)
    }

    pub async fn get_post(&self, post_id: PostId) -> LemmyResult<PostView> {
        let resp: PostResponse = self
            .get_json("post", &[("id", post_id.to_string())])
            .await?;
        Ok(resp.post_view)
    }

    pub async fn get_person(&self, username: &str) -> LemmyResult<PersonDetails> {
        self.get_json("user", &[("username", username.to_owned())])
            .await
    }
}

async fn read_json<T>(endpoint: &'static str, resp: Response) -> LemmyResult<T>
where
    T: DeserializeOwned,
{
    let status = resp.status();
    let text = resp.text().await.context(RequestSnafu { endpoint })?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|e| e.error)
            .unwrap_or(text);
        return ApiSnafu {
            endpoint,
            status: status.as_u16(),
            message,
        }
        .fail();
    }

    serde_json::from_str(&text).context(DecodeSnafu { endpoint })
}
