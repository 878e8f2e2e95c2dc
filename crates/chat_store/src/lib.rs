mod error;
mod paths;
mod schema;
mod store;

pub use error::ChatStoreError;
pub use paths::{chat_file_name, chats_root, sanitize_chat_id};
pub use schema::{ChatHeader, ChatMode, ChatRecordType, ChatTurn, Role, TurnRecordType};
pub use store::{ChatLog, ChatStore, ChatTranscript};
