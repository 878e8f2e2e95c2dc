/// Default base URL for chat completion requests.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Normalize a base URL to a chat-completions endpoint.
///
/// Normalization rules:
/// 1) keep `/chat/completions` unchanged
/// 2) append `/chat/completions` when path ends in a version segment
/// 3) append `/v1/chat/completions` otherwise
pub fn normalize_chat_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_OPENAI_BASE_URL
    } else {
        input.trim()
    };

    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        return trimmed.to_string();
    }
    if ends_with_version_segment(trimmed) {
        return format!("{trimmed}/chat/completions");
    }
    format!("{trimmed}/v1/chat/completions")
}

fn ends_with_version_segment(url: &str) -> bool {
    match url.rsplit('/').next() {
        Some(segment) => {
            segment.len() >= 2
                && segment.starts_with('v')
                && segment[1..].chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}
