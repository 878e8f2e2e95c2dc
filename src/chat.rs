//! Session controller: the per-invocation state machine.
//!
//! One invocation either runs a single-shot completion or drives a chat
//! session loop: resolve the session and its fixed mode, acquire a prompt,
//! stream the response while echoing fragments, persist the turn pair, then
//! wait for the next user choice. The controller talks to its collaborators
//! only through the seams below, so tests can script every side effect.

use std::io::{self, Write};

use chat_store::{ChatLog, ChatMode, ChatStore, ChatTranscript, Role};
use openai_api::ChatMessage;

use crate::cli::mode_from_flags;
use crate::error::AishError;
use crate::prompts;
use crate::provider::{CompletionCall, CompletionProvider};

pub const RULE: &str = "──────────────────────────────────────────────";

const PROMPT_LABEL: &str = "Prompt";
const ENTER_PROMPT_LABEL: &str = "Enter your prompt";
const REVISE_OR_EXECUTE_LABEL: &str = "Revise or [E]xecute";
const EXECUTE_CONFIRM_LABEL: &str = "Execute shell command? [y/N]";

/// Sampling and caching parameters shared by every turn of an invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOptions {
    pub temperature: f64,
    pub top_p: f64,
    pub caching: bool,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 1.0,
            caching: true,
        }
    }
}

/// Host command execution seam. The exit status is the collaborator's
/// concern; the controller fires and forgets.
pub trait CommandRunner {
    fn run(&mut self, command_text: &str) -> io::Result<()>;
}

/// Interactive input seam. `Ok(None)` means end of input.
pub trait PromptSource {
    fn read_line(&mut self, label: &str) -> io::Result<Option<String>>;
}

pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&mut self, command_text: &str) -> io::Result<()> {
        crate::exec::run_shell(command_text).map(|_| ())
    }
}

/// Reads prompts from stdin, labeling them on stderr so streamed output on
/// stdout stays clean.
pub struct StdinPromptSource;

impl PromptSource for StdinPromptSource {
    fn read_line(&mut self, label: &str) -> io::Result<Option<String>> {
        eprint!("{label}: ");
        io::stderr().flush()?;

        let mut line = String::new();
        let read = io::stdin().read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

pub struct SessionController<'a> {
    store: &'a ChatStore,
    provider: &'a dyn CompletionProvider,
    runner: &'a mut dyn CommandRunner,
    prompts: &'a mut dyn PromptSource,
    output: &'a mut dyn Write,
    options: ChatOptions,
}

impl<'a> SessionController<'a> {
    pub fn new(
        store: &'a ChatStore,
        provider: &'a dyn CompletionProvider,
        runner: &'a mut dyn CommandRunner,
        prompts: &'a mut dyn PromptSource,
        output: &'a mut dyn Write,
        options: ChatOptions,
    ) -> Self {
        Self {
            store,
            provider,
            runner,
            prompts,
            output,
            options,
        }
    }

    /// Drive a chat session under `chat_id` until the user quits or input
    /// ends.
    pub fn run_chat(
        &mut self,
        chat_id: &str,
        prompt: Option<&str>,
        shell: bool,
        code: bool,
    ) -> Result<(), AishError> {
        let transcript = if self.store.exists(chat_id) {
            Some(self.store.transcript(chat_id)?)
        } else {
            None
        };

        let mode = match &transcript {
            Some(transcript) => {
                if transcript.turns.is_empty() {
                    return Err(AishError::CorruptChat {
                        chat_id: chat_id.to_string(),
                    });
                }
                check_resume_mode(chat_id, transcript.mode(), shell, code)?;
                transcript.mode()
            }
            None => mode_from_flags(shell, code),
        };
        let resumed = transcript.is_some();
        tracing::debug!(chat_id, resumed, %mode, "chat session resolved");

        let mut conversation: Vec<ChatMessage> = match &transcript {
            Some(transcript) => {
                self.print_history(transcript)?;
                turns_to_messages(transcript)
            }
            None => Vec::new(),
        };

        let raw = match prompt.map(str::trim).filter(|text| !text.is_empty()) {
            Some(text) => {
                writeln!(self.output, "{text}")?;
                text.to_string()
            }
            None => match self.read_or_end(ENTER_PROMPT_LABEL)? {
                Some(text) => text,
                None => return Ok(()),
            },
        };

        let mut framed = prompts::frame(&raw, mode, !resumed);
        let mut log: Option<ChatLog> = None;

        loop {
            conversation.push(ChatMessage::user(framed.clone()));
            let full = self.stream_turn(CompletionCall {
                messages: conversation.clone(),
                temperature: self.options.temperature,
                top_p: self.options.top_p,
                caching: self.options.caching,
                chat_id: Some(chat_id.to_string()),
            })?;

            // The turn pair is persisted only after the stream fully drained.
            if log.is_none() {
                log = Some(self.store.open_or_create(chat_id, mode)?);
            }
            if let Some(log) = log.as_mut() {
                log.append(Role::User, &framed)?;
                log.append(Role::Assistant, &full)?;
            }
            conversation.push(ChatMessage::assistant(full.clone()));

            let label = if mode == ChatMode::Shell {
                REVISE_OR_EXECUTE_LABEL
            } else {
                PROMPT_LABEL
            };
            let Some(choice) = self.read_or_end(label)? else {
                return Ok(());
            };

            let next_raw = if mode == ChatMode::Shell && is_execute(&choice) {
                writeln!(self.output)?;
                self.runner.run(&full)?;
                writeln!(self.output, "{RULE}")?;
                match self.read_or_end(ENTER_PROMPT_LABEL)? {
                    Some(text) => text,
                    None => return Ok(()),
                }
            } else {
                choice
            };

            framed = prompts::continuation(&next_raw, mode);
        }
    }

    /// One completion without session state; shell mode gets a confirmation
    /// gate before optional execution.
    pub fn run_single_shot(&mut self, prompt: &str, mode: ChatMode) -> Result<(), AishError> {
        let framed = prompts::initial(prompt, mode);
        let full = self.stream_turn(CompletionCall {
            messages: vec![ChatMessage::user(framed)],
            temperature: self.options.temperature,
            top_p: self.options.top_p,
            caching: self.options.caching,
            chat_id: None,
        })?;

        if mode == ChatMode::Shell {
            let Some(answer) = self.prompts.read_line(EXECUTE_CONFIRM_LABEL)? else {
                return Ok(());
            };
            if is_affirmative(&answer) {
                writeln!(self.output)?;
                self.runner.run(&full)?;
            }
        }

        Ok(())
    }

    /// Stream one completion, echoing every fragment in arrival order, and
    /// return the drained full text.
    fn stream_turn(&mut self, call: CompletionCall) -> Result<String, AishError> {
        tracing::debug!(messages = call.messages.len(), "requesting completion");

        let provider = self.provider;
        let output = &mut *self.output;
        let mut write_error: Option<io::Error> = None;
        let full = provider.stream_completion(call, &mut |fragment| {
            if write_error.is_some() {
                return;
            }
            let written = output
                .write_all(fragment.as_bytes())
                .and_then(|()| output.flush());
            if let Err(error) = written {
                write_error = Some(error);
            }
        })?;

        if let Some(error) = write_error {
            return Err(error.into());
        }
        writeln!(self.output)?;
        Ok(full)
    }

    fn read_or_end(&mut self, label: &str) -> Result<Option<String>, AishError> {
        let Some(line) = self.prompts.read_line(label)? else {
            return Ok(None);
        };
        if is_quit(&line) {
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn print_history(&mut self, transcript: &ChatTranscript) -> Result<(), AishError> {
        writeln!(self.output, "{RULE}")?;
        for turn in &transcript.turns {
            writeln!(self.output, "{}: {}", turn.role.as_str(), turn.text)?;
        }
        writeln!(self.output, "{RULE}")?;
        writeln!(self.output)?;
        Ok(())
    }
}

fn turns_to_messages(transcript: &ChatTranscript) -> Vec<ChatMessage> {
    transcript
        .turns
        .iter()
        .map(|turn| match turn.role {
            Role::User => ChatMessage::user(turn.text.clone()),
            Role::Assistant => ChatMessage::assistant(turn.text.clone()),
        })
        .collect()
}

fn check_resume_mode(
    chat_id: &str,
    stored: ChatMode,
    shell: bool,
    code: bool,
) -> Result<(), AishError> {
    if stored == ChatMode::Shell && code {
        return Err(AishError::ModeConflict {
            chat_id: chat_id.to_string(),
            stored,
            requested: ChatMode::Code,
        });
    }
    if stored == ChatMode::Code && shell {
        return Err(AishError::ModeConflict {
            chat_id: chat_id.to_string(),
            stored,
            requested: ChatMode::Shell,
        });
    }

    Ok(())
}

fn is_execute(input: &str) -> bool {
    matches!(input.trim(), "e" | "execute")
}

fn is_quit(input: &str) -> bool {
    let trimmed = input.trim();
    trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit")
}

fn is_affirmative(input: &str) -> bool {
    let trimmed = input.trim();
    trimmed.eq_ignore_ascii_case("y") || trimmed.eq_ignore_ascii_case("yes")
}
