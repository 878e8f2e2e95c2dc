use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::ChatStoreError;
use crate::paths::chat_file_name;
use crate::schema::{ChatHeader, ChatMode, ChatTurn, JsonLine, Role};

/// Directory-level handle over all stored chats.
///
/// One JSONL file per chat id: the first line is the chat header, every
/// following line is one turn. Single-process, single-writer; no locking.
#[derive(Debug, Clone)]
pub struct ChatStore {
    root: PathBuf,
}

/// Fully loaded chat: header plus all turns, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTranscript {
    pub header: ChatHeader,
    pub turns: Vec<ChatTurn>,
}

impl ChatTranscript {
    #[must_use]
    pub fn mode(&self) -> ChatMode {
        self.header.mode
    }
}

/// Append handle for one chat file.
#[derive(Debug)]
pub struct ChatLog {
    path: PathBuf,
    file: File,
    header: ChatHeader,
    turn_count: usize,
}

impl ChatStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn chat_path(&self, chat_id: &str) -> PathBuf {
        self.root.join(chat_file_name(chat_id))
    }

    /// True iff at least one record has been persisted under this id.
    #[must_use]
    pub fn exists(&self, chat_id: &str) -> bool {
        self.chat_path(chat_id).is_file()
    }

    /// Load the full transcript for an existing chat, oldest turn first.
    pub fn transcript(&self, chat_id: &str) -> Result<ChatTranscript, ChatStoreError> {
        if chat_id.is_empty() {
            return Err(ChatStoreError::EmptyChatId);
        }
        if !self.exists(chat_id) {
            return Err(ChatStoreError::NotFound {
                chat_id: chat_id.to_string(),
            });
        }

        load_transcript(&self.chat_path(chat_id))
    }

    /// Open a chat for appending, creating it with a header on first use.
    ///
    /// Creation is implicit: there is no separate create call. For an
    /// existing chat the stored mode must match `mode`; callers are expected
    /// to resolve the effective mode from the transcript first.
    pub fn open_or_create(
        &self,
        chat_id: &str,
        mode: ChatMode,
    ) -> Result<ChatLog, ChatStoreError> {
        if chat_id.is_empty() {
            return Err(ChatStoreError::EmptyChatId);
        }

        let path = self.chat_path(chat_id);
        if !self.exists(chat_id) {
            return create_chat_file(&self.root, &path, chat_id, mode);
        }

        let transcript = load_transcript(&path)?;
        if transcript.header.mode != mode {
            return Err(ChatStoreError::HeaderModeMismatch {
                path,
                stored: transcript.header.mode,
                requested: mode,
            });
        }

        let file = open_for_append(&path)?;
        Ok(ChatLog {
            path,
            file,
            header: transcript.header,
            turn_count: transcript.turns.len(),
        })
    }

    /// Ids of every stored chat, sorted. Files that cannot be read or parsed
    /// as chat files are skipped.
    pub fn list_chat_ids(&self) -> Result<Vec<String>, ChatStoreError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.root)
            .map_err(|source| ChatStoreError::io("listing chat root", &self.root, source))?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|source| ChatStoreError::io("listing chat root", &self.root, source))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("jsonl") {
                continue;
            }
            if let Some(header) = read_header(&path) {
                ids.push(header.chat_id);
            }
        }

        ids.sort();
        Ok(ids)
    }
}

impl ChatLog {
    /// Append one turn after the current last turn, stamped with the current
    /// UTC time.
    pub fn append(&mut self, role: Role, text: &str) -> Result<(), ChatStoreError> {
        let turn = ChatTurn::new(role, text, now_rfc3339()?);
        let line = serde_json::to_string(&turn)
            .map_err(|source| ChatStoreError::json_serialize(&self.path, source))?;

        writeln!(self.file, "{line}")
            .map_err(|source| ChatStoreError::io("appending turn", &self.path, source))?;
        self.file
            .flush()
            .map_err(|source| ChatStoreError::io("flushing turn", &self.path, source))?;

        self.turn_count += 1;
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn header(&self) -> &ChatHeader {
        &self.header
    }

    #[must_use]
    pub fn turn_count(&self) -> usize {
        self.turn_count
    }
}

fn create_chat_file(
    root: &Path,
    path: &Path,
    chat_id: &str,
    mode: ChatMode,
) -> Result<ChatLog, ChatStoreError> {
    std::fs::create_dir_all(root)
        .map_err(|source| ChatStoreError::io("creating chat root", root, source))?;

    let header = ChatHeader::v1(chat_id, mode, now_rfc3339()?);
    let line = serde_json::to_string(&header)
        .map_err(|source| ChatStoreError::json_serialize(path, source))?;

    let mut file = OpenOptions::new()
        .create_new(true)
        .append(true)
        .open(path)
        .map_err(|source| ChatStoreError::io("creating chat file", path, source))?;
    writeln!(file, "{line}")
        .map_err(|source| ChatStoreError::io("writing chat header", path, source))?;
    file.flush()
        .map_err(|source| ChatStoreError::io("flushing chat header", path, source))?;

    Ok(ChatLog {
        path: path.to_path_buf(),
        file,
        header,
        turn_count: 0,
    })
}

fn load_transcript(path: &Path) -> Result<ChatTranscript, ChatStoreError> {
    let read_file = File::open(path)
        .map_err(|source| ChatStoreError::io("opening chat file", path, source))?;
    let reader = BufReader::new(read_file);

    let mut header: Option<ChatHeader> = None;
    let mut turns = Vec::new();

    for (line_index, line_result) in reader.lines().enumerate() {
        let line_number = line_index + 1;
        let line =
            line_result.map_err(|source| ChatStoreError::io_line(path, line_number, source))?;
        let parsed = parse_json_line(path, line_number, &line)?;

        if line_number == 1 {
            match parsed {
                JsonLine::Chat(parsed_header) => {
                    validate_header_line(path, line_number, &parsed_header)?;
                    header = Some(parsed_header);
                }
                JsonLine::Turn(_) => {
                    return Err(ChatStoreError::InvalidHeaderRecord {
                        path: path.to_path_buf(),
                        line: line_number,
                    });
                }
            }

            continue;
        }

        match parsed {
            JsonLine::Chat(_) => {
                return Err(ChatStoreError::InvalidTurnRecord {
                    path: path.to_path_buf(),
                    line: line_number,
                });
            }
            JsonLine::Turn(turn) => {
                validate_turn_line(path, line_number, &turn)?;
                turns.push(turn);
            }
        }
    }

    let header = header.ok_or_else(|| ChatStoreError::MissingHeader {
        path: path.to_path_buf(),
    })?;

    Ok(ChatTranscript { header, turns })
}

fn open_for_append(path: &Path) -> Result<File, ChatStoreError> {
    OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|source| ChatStoreError::io("opening chat file for append", path, source))
}

fn read_header(path: &Path) -> Option<ChatHeader> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let mut first_line = String::new();
    reader.read_line(&mut first_line).ok()?;

    match serde_json::from_str::<JsonLine>(first_line.trim_end()).ok()? {
        JsonLine::Chat(header) if header.version == 1 => Some(header),
        _ => None,
    }
}

pub(crate) fn parse_json_line(
    path: &Path,
    line_number: usize,
    line: &str,
) -> Result<JsonLine, ChatStoreError> {
    serde_json::from_str::<JsonLine>(line)
        .map_err(|source| ChatStoreError::json_line(path, line_number, source))
}

pub(crate) fn validate_header_line(
    path: &Path,
    line_number: usize,
    header: &ChatHeader,
) -> Result<(), ChatStoreError> {
    if header.version != 1 {
        return Err(ChatStoreError::UnsupportedVersion {
            path: path.to_path_buf(),
            line: line_number,
            found: header.version,
        });
    }

    validate_rfc3339(path, line_number, "created_at", &header.created_at)
}

pub(crate) fn validate_turn_line(
    path: &Path,
    line_number: usize,
    turn: &ChatTurn,
) -> Result<(), ChatStoreError> {
    validate_rfc3339(path, line_number, "ts", &turn.ts)
}

pub(crate) fn validate_rfc3339(
    path: &Path,
    line_number: usize,
    field: &'static str,
    value: &str,
) -> Result<(), ChatStoreError> {
    if OffsetDateTime::parse(value, &Rfc3339).is_err() {
        return Err(ChatStoreError::InvalidTimestamp {
            path: path.to_path_buf(),
            line: line_number,
            field,
            value: value.to_string(),
        });
    }

    Ok(())
}

fn now_rfc3339() -> Result<String, ChatStoreError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(ChatStoreError::ClockFormat)
}
