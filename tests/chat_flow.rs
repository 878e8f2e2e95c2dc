use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;

use aish::chat::{ChatOptions, CommandRunner, PromptSource, SessionController};
use aish::error::AishError;
use aish::prompts;
use aish::provider::{CompletionCall, CompletionError, CompletionProvider};
use chat_store::{ChatMode, ChatStore, Role};
use tempfile::TempDir;

/// Provider that replays scripted fragment sequences, one per call.
#[derive(Default)]
struct ScriptedProvider {
    scripts: RefCell<VecDeque<Vec<String>>>,
    calls: RefCell<Vec<CompletionCall>>,
    fail_with: Option<String>,
}

impl ScriptedProvider {
    fn with_scripts(scripts: &[&[&str]]) -> Self {
        Self {
            scripts: RefCell::new(
                scripts
                    .iter()
                    .map(|fragments| fragments.iter().map(ToString::to_string).collect())
                    .collect(),
            ),
            ..Self::default()
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    fn calls(&self) -> Vec<CompletionCall> {
        self.calls.borrow().clone()
    }
}

impl CompletionProvider for ScriptedProvider {
    fn stream_completion(
        &self,
        call: CompletionCall,
        on_fragment: &mut dyn FnMut(&str),
    ) -> Result<String, CompletionError> {
        self.calls.borrow_mut().push(call);

        if let Some(message) = &self.fail_with {
            return Err(CompletionError::new(message.clone()));
        }

        let fragments = self
            .scripts
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| CompletionError::new("no scripted completion left"))?;

        let mut full = String::new();
        for fragment in &fragments {
            on_fragment(fragment);
            full.push_str(fragment);
        }
        Ok(full)
    }
}

#[derive(Default)]
struct RecordingRunner {
    commands: Vec<String>,
}

impl CommandRunner for RecordingRunner {
    fn run(&mut self, command_text: &str) -> io::Result<()> {
        self.commands.push(command_text.to_string());
        Ok(())
    }
}

/// Prompt source that pops scripted lines and records every label shown.
#[derive(Default)]
struct ScriptedPrompts {
    lines: VecDeque<String>,
    labels: Vec<String>,
}

impl ScriptedPrompts {
    fn with_lines(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(ToString::to_string).collect(),
            labels: Vec::new(),
        }
    }
}

impl PromptSource for ScriptedPrompts {
    fn read_line(&mut self, label: &str) -> io::Result<Option<String>> {
        self.labels.push(label.to_string());
        Ok(self.lines.pop_front())
    }
}

struct Fixture {
    _dir: TempDir,
    store: ChatStore,
    provider: ScriptedProvider,
    runner: RecordingRunner,
    prompts: ScriptedPrompts,
    output: Vec<u8>,
}

impl Fixture {
    fn new(provider: ScriptedProvider, prompts: ScriptedPrompts) -> Self {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let store = ChatStore::new(dir.path());
        Self {
            _dir: dir,
            store,
            provider,
            runner: RecordingRunner::default(),
            prompts,
            output: Vec::new(),
        }
    }

    fn run_chat(
        &mut self,
        chat_id: &str,
        prompt: Option<&str>,
        shell: bool,
        code: bool,
    ) -> Result<(), AishError> {
        let mut controller = SessionController::new(
            &self.store,
            &self.provider,
            &mut self.runner,
            &mut self.prompts,
            &mut self.output,
            ChatOptions::default(),
        );
        controller.run_chat(chat_id, prompt, shell, code)
    }

    fn run_single_shot(&mut self, prompt: &str, mode: ChatMode) -> Result<(), AishError> {
        let mut controller = SessionController::new(
            &self.store,
            &self.provider,
            &mut self.runner,
            &mut self.prompts,
            &mut self.output,
            ChatOptions::default(),
        );
        controller.run_single_shot(prompt, mode)
    }

    fn displayed(&self) -> String {
        String::from_utf8_lossy(&self.output).to_string()
    }
}

fn seed_chat(store: &ChatStore, chat_id: &str, mode: ChatMode, turns: &[(Role, &str)]) {
    let mut log = store
        .open_or_create(chat_id, mode)
        .expect("seed chat should be created");
    for (role, text) in turns {
        log.append(*role, text).expect("seed turn should append");
    }
}

#[test]
fn fresh_shell_chat_stores_mode_and_one_turn_pair() {
    let mut fixture = Fixture::new(
        ScriptedProvider::with_scripts(&[&["ls", " -la"]]),
        ScriptedPrompts::default(),
    );

    fixture
        .run_chat("abc", Some("list files"), true, false)
        .expect("chat should end cleanly at end of input");

    let transcript = fixture
        .store
        .transcript("abc")
        .expect("transcript should load");
    assert_eq!(transcript.mode(), ChatMode::Shell);
    assert_eq!(transcript.turns.len(), 2);
    assert_eq!(transcript.turns[0].role, Role::User);
    assert_eq!(
        transcript.turns[0].text,
        prompts::initial("list files", ChatMode::Shell)
    );
    assert_eq!(transcript.turns[1].role, Role::Assistant);
    assert_eq!(transcript.turns[1].text, "ls -la");

    let calls = fixture.provider.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].chat_id.as_deref(), Some("abc"));
    assert!(fixture.displayed().contains("list files"));
    assert!(fixture.displayed().contains("ls -la"));
}

#[test]
fn resume_with_conflicting_flag_fails_before_any_completion_call() {
    let mut fixture = Fixture::new(ScriptedProvider::default(), ScriptedPrompts::default());
    seed_chat(
        &fixture.store,
        "abc",
        ChatMode::Shell,
        &[(Role::User, "list files"), (Role::Assistant, "ls")],
    );

    let error = fixture
        .run_chat("abc", Some("more"), false, true)
        .expect_err("code flag against shell chat must fail");

    assert!(matches!(error, AishError::ModeConflict { .. }));
    assert!(error.to_string().contains("abc"));
    assert!(error.to_string().contains("shell"));
    assert_eq!(fixture.provider.call_count(), 0);
}

#[test]
fn resume_code_chat_with_shell_flag_conflicts_symmetrically() {
    let mut fixture = Fixture::new(ScriptedProvider::default(), ScriptedPrompts::default());
    seed_chat(
        &fixture.store,
        "snippets",
        ChatMode::Code,
        &[(Role::User, "fizzbuzz"), (Role::Assistant, "fn main() {}")],
    );

    let error = fixture
        .run_chat("snippets", Some("more"), true, false)
        .expect_err("shell flag against code chat must fail");

    assert!(matches!(
        error,
        AishError::ModeConflict {
            stored: ChatMode::Code,
            requested: ChatMode::Shell,
            ..
        }
    ));
    assert_eq!(fixture.provider.call_count(), 0);
}

#[test]
fn header_only_chat_file_is_reported_as_corrupt() {
    let mut fixture = Fixture::new(ScriptedProvider::default(), ScriptedPrompts::default());
    seed_chat(&fixture.store, "hollow", ChatMode::Plain, &[]);

    let error = fixture
        .run_chat("hollow", Some("hello"), false, false)
        .expect_err("existing chat without turns must fail");

    assert!(matches!(error, AishError::CorruptChat { .. }));
    assert_eq!(fixture.provider.call_count(), 0);
}

#[test]
fn plain_continuation_appends_exactly_one_turn_pair_in_order() {
    let mut fixture = Fixture::new(
        ScriptedProvider::with_scripts(&[&["world"]]),
        ScriptedPrompts::default(),
    );
    seed_chat(
        &fixture.store,
        "x",
        ChatMode::Plain,
        &[(Role::User, "hello")],
    );

    fixture
        .run_chat("x", Some("continue"), false, false)
        .expect("chat should end cleanly at end of input");

    let transcript = fixture.store.transcript("x").expect("transcript should load");
    assert_eq!(transcript.turns.len(), 3);
    assert_eq!(transcript.turns[1].role, Role::User);
    assert_eq!(transcript.turns[1].text, "continue");
    assert_eq!(transcript.turns[2].role, Role::Assistant);
    assert_eq!(transcript.turns[2].text, "world");

    // The request replays stored history oldest-first before the new turn.
    let calls = fixture.provider.calls();
    assert_eq!(calls.len(), 1);
    let contents: Vec<&str> = calls[0]
        .messages
        .iter()
        .map(|message| message.content.as_str())
        .collect();
    assert_eq!(contents, vec!["hello", "continue"]);
}

#[test]
fn displayed_output_matches_persisted_fragment_concatenation() {
    let mut fixture = Fixture::new(
        ScriptedProvider::with_scripts(&[&["Hel", "lo", " wor", "ld"]]),
        ScriptedPrompts::default(),
    );

    fixture
        .run_chat("stream", Some("greet me"), false, false)
        .expect("chat should end cleanly at end of input");

    let transcript = fixture
        .store
        .transcript("stream")
        .expect("transcript should load");
    assert_eq!(transcript.turns[1].text, "Hello world");
    assert!(fixture.displayed().contains("Hello world"));
}

#[test]
fn shell_execute_runs_command_once_then_requests_fresh_prompt() {
    let mut fixture = Fixture::new(
        ScriptedProvider::with_scripts(&[&["rm -rf /tmp/foo"], &["du -sh /tmp"]]),
        ScriptedPrompts::with_lines(&["e", "show size"]),
    );

    fixture
        .run_chat("cleanup", Some("remove tmp foo"), true, false)
        .expect("chat should end cleanly at end of input");

    assert_eq!(fixture.runner.commands, vec!["rm -rf /tmp/foo".to_string()]);
    assert_eq!(
        fixture.prompts.labels,
        vec![
            "Revise or [E]xecute".to_string(),
            "Enter your prompt".to_string(),
            "Revise or [E]xecute".to_string(),
        ]
    );

    // The post-execute prompt is a fresh turn, re-framed for shell mode.
    let calls = fixture.provider.calls();
    assert_eq!(calls.len(), 2);
    let last = calls[1]
        .messages
        .last()
        .expect("second call should carry the new turn");
    assert_eq!(
        last.content,
        prompts::continuation("show size", ChatMode::Shell)
    );
}

#[test]
fn shell_revision_becomes_the_next_turn_without_execution() {
    let mut fixture = Fixture::new(
        ScriptedProvider::with_scripts(&[&["ls"], &["ls -S"]]),
        ScriptedPrompts::with_lines(&["sort by size"]),
    );

    fixture
        .run_chat("listing", Some("list files"), true, false)
        .expect("chat should end cleanly at end of input");

    assert!(fixture.runner.commands.is_empty());

    let calls = fixture.provider.calls();
    assert_eq!(calls.len(), 2);
    let last = calls[1]
        .messages
        .last()
        .expect("second call should carry the revision");
    assert_eq!(
        last.content,
        prompts::continuation("sort by size", ChatMode::Shell)
    );
}

#[test]
fn quit_input_ends_the_session_after_persisting_the_turn() {
    let mut fixture = Fixture::new(
        ScriptedProvider::with_scripts(&[&["hi"]]),
        ScriptedPrompts::with_lines(&["quit"]),
    );

    fixture
        .run_chat("brief", Some("hello"), false, false)
        .expect("quit should end the session cleanly");

    assert_eq!(fixture.provider.call_count(), 1);
    let transcript = fixture
        .store
        .transcript("brief")
        .expect("transcript should load");
    assert_eq!(transcript.turns.len(), 2);
}

#[test]
fn quit_at_the_initial_prompt_makes_no_calls_and_stores_nothing() {
    let mut fixture = Fixture::new(
        ScriptedProvider::default(),
        ScriptedPrompts::with_lines(&["quit"]),
    );

    fixture
        .run_chat("untouched", None, false, false)
        .expect("quit should end the session cleanly");

    assert_eq!(fixture.provider.call_count(), 0);
    assert!(!fixture.store.exists("untouched"));
    assert_eq!(fixture.prompts.labels, vec!["Enter your prompt".to_string()]);
}

#[test]
fn empty_prompt_argument_blocks_for_interactive_input() {
    let mut fixture = Fixture::new(
        ScriptedProvider::with_scripts(&[&["answer"]]),
        ScriptedPrompts::with_lines(&["a typed question"]),
    );

    fixture
        .run_chat("typed", Some("   "), false, false)
        .expect("chat should end cleanly at end of input");

    assert_eq!(fixture.prompts.labels[0], "Enter your prompt");
    let transcript = fixture
        .store
        .transcript("typed")
        .expect("transcript should load");
    assert_eq!(transcript.turns[0].text, "a typed question");
}

#[test]
fn resumed_history_is_displayed_before_the_new_turn() {
    let mut fixture = Fixture::new(
        ScriptedProvider::with_scripts(&[&["again"]]),
        ScriptedPrompts::default(),
    );
    seed_chat(
        &fixture.store,
        "replayed",
        ChatMode::Plain,
        &[(Role::User, "first question"), (Role::Assistant, "first answer")],
    );

    fixture
        .run_chat("replayed", Some("continue"), false, false)
        .expect("chat should end cleanly at end of input");

    let displayed = fixture.displayed();
    assert!(displayed.contains("user: first question"));
    assert!(displayed.contains("assistant: first answer"));
}

#[test]
fn provider_failure_leaves_no_partial_transcript() {
    let mut fixture = Fixture::new(
        ScriptedProvider::failing("HTTP 401 Unauthorized"),
        ScriptedPrompts::default(),
    );

    let error = fixture
        .run_chat("doomed", Some("hello"), false, false)
        .expect_err("provider failure must be fatal");

    assert!(matches!(error, AishError::Completion(_)));
    assert!(error.to_string().contains("HTTP 401"));
    assert!(!fixture.store.exists("doomed"));
}

#[test]
fn single_shot_shell_declined_never_executes() {
    let mut fixture = Fixture::new(
        ScriptedProvider::with_scripts(&[&["rm -rf /tmp/foo"]]),
        ScriptedPrompts::with_lines(&["n"]),
    );

    fixture
        .run_single_shot("remove tmp foo", ChatMode::Shell)
        .expect("single shot should complete");

    assert!(fixture.runner.commands.is_empty());
    assert_eq!(
        fixture.prompts.labels,
        vec!["Execute shell command? [y/N]".to_string()]
    );
}

#[test]
fn single_shot_shell_accepted_executes_exactly_once() {
    let mut fixture = Fixture::new(
        ScriptedProvider::with_scripts(&[&["echo hi"]]),
        ScriptedPrompts::with_lines(&["y"]),
    );

    fixture
        .run_single_shot("say hi", ChatMode::Shell)
        .expect("single shot should complete");

    assert_eq!(fixture.runner.commands, vec!["echo hi".to_string()]);
}

#[test]
fn single_shot_plain_streams_without_any_prompting() {
    let mut fixture = Fixture::new(
        ScriptedProvider::with_scripts(&[&["plain answer"]]),
        ScriptedPrompts::with_lines(&["should not be read"]),
    );

    fixture
        .run_single_shot("a question", ChatMode::Plain)
        .expect("single shot should complete");

    assert!(fixture.prompts.labels.is_empty());
    assert!(fixture.runner.commands.is_empty());
    assert!(fixture.displayed().contains("plain answer"));
}

#[test]
fn stored_mode_survives_many_cycles_and_later_conflicts_still_name_the_chat() {
    let mut fixture = Fixture::new(
        ScriptedProvider::with_scripts(&[&["ls"], &["pwd"], &["whoami"]]),
        ScriptedPrompts::with_lines(&["next", "another"]),
    );

    fixture
        .run_chat("abc", Some("list files"), true, false)
        .expect("chat should end cleanly at end of input");

    let transcript = fixture.store.transcript("abc").expect("transcript should load");
    assert_eq!(transcript.mode(), ChatMode::Shell);
    assert_eq!(transcript.turns.len(), 6);

    let error = fixture
        .run_chat("abc", Some("more"), false, true)
        .expect_err("later code flag must still conflict");
    assert!(error.to_string().contains("abc"));
}
