use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LemmyError {
    #[snafu(display("Invalid API root {api_root}: {source}"))]
    InvalidApiRoot {
        api_root: String,
        source: url::ParseError,
    },
    #[snafu(display("HTTP client initialization failed: {source}"))]
    ClientBuild { source: reqwest::Error },
    #[snafu(display("Request to {endpoint} failed: {source}"))]
    Request {
        endpoint: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("{endpoint} returned {status}: {message}"))]
    Api {
        endpoint: &'static str,
        status: u16,
        message: String,
    },
    #[snafu(display("Could not decode {endpoint} response: {source}"))]
    Decode {
        endpoint: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("Login succeeded but no token was issued"))]
    MissingJwt,
}

pub type LemmyResult<T> = std::result::Result<T, LemmyError>;
