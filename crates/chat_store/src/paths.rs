use std::path::{Path, PathBuf};

pub const CHATS_DIR: &str = "chats";

#[must_use]
pub fn chats_root(base: &Path) -> PathBuf {
    base.join(CHATS_DIR)
}

/// Map a chat id to a filename-safe form. Path separators and other
/// characters that are unsafe in filenames collapse to '-'; the true id is
/// kept in the header record.
#[must_use]
pub fn sanitize_chat_id(chat_id: &str) -> String {
    chat_id
        .chars()
        .map(|c| match c {
            ':' | '/' | '\\' | ' ' | '.' => '-',
            _ => c,
        })
        .collect()
}

#[must_use]
pub fn chat_file_name(chat_id: &str) -> String {
    format!("{}.jsonl", sanitize_chat_id(chat_id))
}
