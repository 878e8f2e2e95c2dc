//! `$EDITOR` prompt entry.

use std::process::Command;

use tempfile::NamedTempFile;

use crate::error::AishError;

/// Open `$EDITOR` on a temporary file and return its trimmed contents as
/// the prompt. Unset editor, a non-zero editor exit, or an empty buffer are
/// usage errors.
pub fn edited_prompt() -> Result<String, AishError> {
    let editor = match std::env::var("EDITOR") {
        Ok(editor) if !editor.trim().is_empty() => editor,
        _ => return Err(AishError::EditorUnset),
    };

    let temp_file = NamedTempFile::new()?;
    let status = Command::new(&editor).arg(temp_file.path()).status()?;
    if !status.success() {
        return Err(AishError::EditorFailed {
            status: status.to_string(),
        });
    }

    let content = std::fs::read_to_string(temp_file.path())?;
    if content.trim().is_empty() {
        return Err(AishError::EmptyEditorPrompt);
    }

    Ok(content.trim_end().to_string())
}
