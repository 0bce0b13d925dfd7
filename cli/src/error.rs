//! Errors surfaced by the terminal client.

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("invalid room code: {0}")]
    InvalidRoomCode(#[from] frames::RoomCodeError),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("health check failed: HTTP {0}")]
    Unhealthy(u16),
    #[error("websocket error: {0}")]
    Ws(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("frame codec failed: {0}")]
    Codec(#[from] frames::CodecError),
    #[error("canvas payload rejected: {0}")]
    Canvas(#[from] canvas::store::StoreError),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown command `{0}`; try `help`")]
    UnknownCommand(String),
    #[error("bad arguments for `{command}`: {usage}")]
    Usage { command: &'static str, usage: &'static str },
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Ws(Box::new(error))
    }
}
