//! Gateway error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Socket or HTTP I/O failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Request exceeded its deadline.
    #[error("request timed out")]
    Timeout,

    /// WebSocket protocol failure.
    #[error("websocket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Inbound frame or response body failed to decode.
    #[error("decode error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The venue answered with a non-success envelope code.
    #[error("venue error {code}: {msg}")]
    Envelope { code: i64, msg: String },

    /// Stream login was rejected.
    #[error("login rejected, code {code}: {msg}")]
    Auth { code: i64, msg: String },

    /// Stream login acknowledgement never arrived.
    #[error("login timed out")]
    LoginTimeout,

    /// A success envelope arrived without the expected data item.
    #[error("empty response data for {0}")]
    EmptyData(&'static str),

    /// The stream's queues are gone (client or session dropped).
    #[error("stream channel closed")]
    ChannelClosed,
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}
