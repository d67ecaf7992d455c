//! Chat-completion seam for the classification fallback.

use async_trait::async_trait;

use crate::error::Result;

/// Black-box chat completion: prompt in, text out.
///
/// The engine never interprets the transport — implementations wrap a
/// concrete provider. Entirely optional: every rule path functions without
/// one, and the engine validates anything that comes back before trusting it.
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[async_trait]
impl<T: ChatCompleter + ?Sized> ChatCompleter for std::sync::Arc<T> {
    async fn complete(&self, prompt: &str) -> Result<String> {
        (**self).complete(prompt).await
    }
}
