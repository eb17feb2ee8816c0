use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FootballError {
    #[snafu(display("Invalid base URL {base_url}: {source}"))]
    InvalidBaseUrl {
        base_url: String,
        source: url::ParseError,
    },
    #[snafu(display("HTTP client initialization failed: {source}"))]
    ClientBuild { source: reqwest::Error },
    #[snafu(display("Request to {endpoint} failed: {source}"))]
    Request {
        endpoint: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("{endpoint} returned HTTP {status}"))]
    Status { endpoint: &'static str, status: u16 },
    #[snafu(display("Could not decode {endpoint} response: {source}"))]
    Decode {
        endpoint: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("{endpoint} reported errors: {message}"))]
    Api {
        endpoint: &'static str,
        message: String,
    },
}

pub type FootballResult<T> = std::result::Result<T, FootballError>;
