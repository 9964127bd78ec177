use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ExchangeError {
    #[snafu(display("webhook URL '{raw}' is invalid"))]
    InvalidWebhookUrl {
        stage: &'static str,
        raw: String,
        source: url::ParseError,
    },
    #[snafu(display("webhook request failed on `{stage}`: {source}"))]
    SendRequest {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("failed to read webhook response body on `{stage}`: {source}"))]
    ReadResponseBody {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("webhook returned status {status}: {body}"))]
    UnexpectedStatus {
        stage: &'static str,
        status: u16,
        body: String,
    },
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
