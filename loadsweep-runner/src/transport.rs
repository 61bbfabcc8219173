use async_trait::async_trait;
use loadsweep_client::ResponsesClient;
use loadsweep_common::{RequestTemplate, Result};

/// One-shot request capability the pacing engine drives.
///
/// Implementations return `Ok(status)` for a well-formed 2xx response and an
/// error for every other outcome (timeout, connection failure, non-2xx
/// status, malformed body). They must not panic: the issuer turns the
/// returned `Result` into exactly one recorded sample per call.
#[async_trait]
pub trait RequestSender: Send + Sync {
    async fn send(&self, payload: &RequestTemplate) -> Result<u16>;
}

#[async_trait]
impl RequestSender for ResponsesClient {
    async fn send(&self, payload: &RequestTemplate) -> Result<u16> {
        self.create_response(payload).await
    }
}
