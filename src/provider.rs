//! Completion collaborator seam.
//!
//! The controller only knows this trait; the production implementation
//! wraps the async transport client behind a blocking runtime, and tests
//! substitute scripted providers.

use std::fmt;

use openai_api::{ChatMessage, ChatRequest, OpenAiClient, OpenAiConfig};

/// One outbound completion call: replayed history plus the new user turn,
/// sampling parameters, and session attribution.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionCall {
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub top_p: f64,
    pub caching: bool,
    pub chat_id: Option<String>,
}

/// Error surfaced by a completion provider. Carries the collaborator's own
/// message unmodified; the core neither wraps nor retries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionError {
    message: String,
}

impl CompletionError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CompletionError {}

impl From<String> for CompletionError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Provider interface for streaming one completion.
pub trait CompletionProvider {
    /// Stream a completion, invoking `on_fragment` for every text fragment
    /// in arrival order, and return the concatenated full response. The
    /// fragment sequence is finite and not restartable; implementations
    /// block until the next fragment or end of stream.
    fn stream_completion(
        &self,
        call: CompletionCall,
        on_fragment: &mut dyn FnMut(&str),
    ) -> Result<String, CompletionError>;
}

/// Production provider: owns a current-thread tokio runtime and drives the
/// async transport client to completion on the calling thread.
pub struct BlockingOpenAiProvider {
    client: OpenAiClient,
    runtime: tokio::runtime::Runtime,
    model: String,
}

impl BlockingOpenAiProvider {
    pub fn new(config: OpenAiConfig, model: impl Into<String>) -> Result<Self, CompletionError> {
        let client =
            OpenAiClient::new(config).map_err(|error| CompletionError::new(error.to_string()))?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| CompletionError::new(format!("failed to start runtime: {error}")))?;

        Ok(Self {
            client,
            runtime,
            model: model.into(),
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl CompletionProvider for BlockingOpenAiProvider {
    fn stream_completion(
        &self,
        call: CompletionCall,
        on_fragment: &mut dyn FnMut(&str),
    ) -> Result<String, CompletionError> {
        let mut request = ChatRequest::new(self.model.clone(), call.messages)
            .with_temperature(call.temperature)
            .with_top_p(call.top_p);
        if let Some(chat_id) = call.chat_id {
            request = request.with_user(chat_id);
        }

        self.runtime
            .block_on(
                self.client
                    .stream_with_handler(&request, call.caching, |fragment| on_fragment(fragment)),
            )
            .map_err(|error| CompletionError::new(error.to_string()))
    }
}
