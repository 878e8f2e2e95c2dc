//! Prompt framing per chat mode.
//!
//! The trailing `Command:` / `Code:` cues steer the model toward bare
//! output. They are presentation only; the stored chat header is the single
//! source of truth for a session's mode.

use chat_store::ChatMode;

/// Frame the first prompt of a session (or a single-shot prompt).
#[must_use]
pub fn initial(raw: &str, mode: ChatMode) -> String {
    match mode {
        ChatMode::Plain => raw.to_string(),
        ChatMode::Shell => format!(
            "Act as a natural language to `sh` command translator on {os}. \
             Answer with the command only, without any description, \
             explanation, or markdown fences.\n{raw}\n###\nCommand:",
            os = std::env::consts::OS,
        ),
        ChatMode::Code => format!(
            "Answer with code only, without any description, explanation, \
             or markdown fences.\n{raw}\n###\nCode:"
        ),
    }
}

/// Frame a follow-up turn; the output constraints stay, the preamble does
/// not repeat.
#[must_use]
pub fn continuation(raw: &str, mode: ChatMode) -> String {
    match mode {
        ChatMode::Plain => raw.to_string(),
        ChatMode::Shell => format!("{raw}\n###\nCommand:"),
        ChatMode::Code => format!("{raw}\n###\nCode:"),
    }
}

/// Frame one raw prompt given the session position.
#[must_use]
pub fn frame(raw: &str, mode: ChatMode, first_turn: bool) -> String {
    if first_turn {
        initial(raw, mode)
    } else {
        continuation(raw, mode)
    }
}
