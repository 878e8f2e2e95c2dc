use serde_json::Value;

/// Stream event emitted by the parser after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatStreamEvent {
    /// One incremental piece of assistant output.
    ContentDelta { delta: String },
    /// The service marked the choice finished (`stop`, `length`, ...).
    Finished { reason: String },
    /// In-stream error record emitted by the service.
    Error {
        code: Option<String>,
        message: Option<String>,
    },
}

pub(crate) fn map_event(value: Value) -> Option<ChatStreamEvent> {
    if let Some(error) = value.get("error") {
        let code = error
            .get("code")
            .and_then(|value| value.as_str())
            .map(ToString::to_string);
        let message = error
            .get("message")
            .and_then(|value| value.as_str())
            .map(ToString::to_string);
        return Some(ChatStreamEvent::Error { code, message });
    }

    let choice = value.get("choices")?.as_array()?.first()?;

    if let Some(delta) = choice
        .get("delta")
        .and_then(|delta| delta.get("content"))
        .and_then(|content| content.as_str())
    {
        if !delta.is_empty() {
            return Some(ChatStreamEvent::ContentDelta {
                delta: delta.to_owned(),
            });
        }
    }

    if let Some(reason) = choice.get("finish_reason").and_then(|value| value.as_str()) {
        return Some(ChatStreamEvent::Finished {
            reason: reason.to_owned(),
        });
    }

    None
}
