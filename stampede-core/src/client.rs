use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// HTTP-ish method of a target operation. The engine never interprets it;
/// it only travels to the client implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

#[derive(Debug, Clone)]
pub struct TargetRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<String>,
}

impl TargetRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TargetResponse {
    pub status: u16,
    pub body: String,
    pub elapsed: Duration,
}

impl TargetResponse {
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    #[error("transport failure: {0}")]
    Network(String),

    #[error("deadline exceeded after {0:?}")]
    Timeout(Duration),
}

pub type ClientFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<TargetResponse, ClientError>> + Send + 'a>>;

/// The pluggable collaborator that actually issues requests. The engine
/// drives it, times it, and records its outcomes; it never parses payloads
/// on its own.
pub trait TargetClient: Send + Sync + 'static {
    fn execute(&self, request: TargetRequest) -> ClientFuture<'_>;
}
