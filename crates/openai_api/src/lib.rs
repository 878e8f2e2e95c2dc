mod cache;
mod client;
mod config;
mod error;
mod events;
mod headers;
mod payload;
mod retry;
mod sse;
mod url;

pub use cache::{cache_key, lookup_cached_completion, store_cached_completion};
pub use client::OpenAiClient;
pub use config::OpenAiConfig;
pub use error::{parse_error_message, OpenAiApiError};
pub use events::ChatStreamEvent;
pub use headers::build_headers;
pub use payload::{ChatMessage, ChatRequest, MessageRole};
pub use retry::{is_retryable_http_error, retry_delay_ms, MAX_RETRIES};
pub use sse::SseStreamParser;
pub use url::{normalize_chat_url, DEFAULT_OPENAI_BASE_URL};
