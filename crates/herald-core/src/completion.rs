use async_trait::async_trait;

use crate::Result;

/// Outcome of one completion call.
///
/// `cost` is reported by gateways that meter billing; local inference
/// backends leave it unset.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompletionResult {
    pub body: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost: Option<f64>,
}

/// Completion client interface used by command dispatch.
///
/// One stateless request per call; model selection and safety settings are
/// fixed at construction so application logic never carries provider
/// configuration.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    fn model(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<CompletionResult>;
}
