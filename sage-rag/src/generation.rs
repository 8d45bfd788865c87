//! Generation provider trait for producing answers from a grounded prompt.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A single-turn generation request: system instruction plus user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Persona, instructions and retrieved context.
    pub system_instruction: String,
    /// The user's question, sent as the final input turn.
    pub user_message: String,
    /// Sampling temperature.
    pub temperature: f32,
}

/// A provider that produces natural-language text from a [`GenerationRequest`].
///
/// # Example
///
/// ```rust,ignore
/// use sage_rag::{GenerationProvider, GenerationRequest};
///
/// let text = provider.generate(&request).await?;
/// ```
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate text for the request.
    ///
    /// Fails with [`RagError::GenerationError`](crate::RagError::GenerationError)
    /// on transport, authentication or quota failures.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// A short name for logs and diagnostics, usually the model name.
    fn name(&self) -> &str;
}
