use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRecordType {
    #[default]
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRecordType {
    #[default]
    Turn,
}

/// Output mode a chat was created with. Fixed for the lifetime of the chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    Plain,
    Shell,
    Code,
}

impl ChatMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Shell => "shell",
            Self::Code => "code",
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatHeader {
    #[serde(rename = "type", default)]
    pub record_type: ChatRecordType,
    pub version: u32,
    pub chat_id: String,
    pub mode: ChatMode,
    pub created_at: String,
}

impl ChatHeader {
    #[must_use]
    pub fn v1(chat_id: impl Into<String>, mode: ChatMode, created_at: impl Into<String>) -> Self {
        Self {
            record_type: ChatRecordType::Chat,
            version: 1,
            chat_id: chat_id.into(),
            mode,
            created_at: created_at.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatTurn {
    #[serde(rename = "type", default)]
    pub record_type: TurnRecordType,
    pub role: Role,
    pub text: String,
    pub ts: String,
}

impl ChatTurn {
    #[must_use]
    pub fn new(role: Role, text: impl Into<String>, ts: impl Into<String>) -> Self {
        Self {
            record_type: TurnRecordType::Turn,
            role,
            text: text.into(),
            ts: ts.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum JsonLine {
    Chat(ChatHeader),
    Turn(ChatTurn),
}
