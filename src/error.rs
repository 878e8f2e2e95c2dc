use chat_store::{ChatMode, ChatStoreError};
use thiserror::Error;

use crate::config::ConfigError;
use crate::provider::CompletionError;

/// Everything that can terminate one invocation. All variants are fatal;
/// nothing here is retried.
#[derive(Debug, Error)]
pub enum AishError {
    #[error(
        "chat '{chat_id}' was started as a {stored} assistant and cannot be resumed with --{requested}"
    )]
    ModeConflict {
        chat_id: String,
        stored: ChatMode,
        requested: ChatMode,
    },

    #[error("chat '{chat_id}' exists but contains no turns")]
    CorruptChat { chat_id: String },

    #[error("a prompt is required; pass PROMPT or use --editor")]
    MissingPrompt,

    #[error("$EDITOR is not set; export EDITOR to compose prompts in an editor")]
    EditorUnset,

    #[error("editor exited with {status}")]
    EditorFailed { status: String },

    #[error("editor buffer was empty; no prompt to send")]
    EmptyEditorPrompt,

    #[error(transparent)]
    Store(#[from] ChatStoreError),

    #[error("completion request failed: {0}")]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AishError {
    /// 2 for user-correctable usage errors, 1 for runtime failures.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ModeConflict { .. }
            | Self::MissingPrompt
            | Self::EditorUnset
            | Self::EditorFailed { .. }
            | Self::EmptyEditorPrompt => 2,
            _ => 1,
        }
    }
}
