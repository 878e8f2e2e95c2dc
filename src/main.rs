use std::io;

use chat_store::ChatStore;
use clap::Parser;
use openai_api::OpenAiConfig;
use tracing_subscriber::EnvFilter;

use aish::chat::{ChatOptions, SessionController, ShellRunner, StdinPromptSource};
use aish::cli::Cli;
use aish::config::Config;
use aish::editor;
use aish::error::AishError;
use aish::provider::BlockingOpenAiProvider;

fn main() {
    let cli = Cli::parse();
    init_tracing();

    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(error.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), AishError> {
    let config = Config::load()?;
    let store = ChatStore::new(&config.chats_dir);

    if cli.list_chats {
        for chat_id in store.list_chat_ids()? {
            println!("{chat_id}");
        }
        return Ok(());
    }

    let prompt = if cli.editor {
        Some(editor::edited_prompt()?)
    } else {
        cli.prompt.clone()
    };

    let have_prompt = prompt.as_deref().is_some_and(|text| !text.trim().is_empty());
    if !have_prompt && cli.chat.is_none() {
        return Err(AishError::MissingPrompt);
    }

    let mut api = OpenAiConfig::new(config.api_key()?)
        .with_base_url(&config.base_url)
        .with_cache_dir(&config.cache_dir);
    if let Some(timeout) = config.request_timeout {
        api = api.with_timeout(timeout);
    }
    let provider = BlockingOpenAiProvider::new(api, &config.model)?;

    let options = ChatOptions {
        temperature: cli.temperature,
        top_p: cli.top_probability,
        caching: cli.caching(),
    };
    let mut runner = ShellRunner;
    let mut prompt_source = StdinPromptSource;
    let mut stdout = io::stdout();
    let mut controller = SessionController::new(
        &store,
        &provider,
        &mut runner,
        &mut prompt_source,
        &mut stdout,
        options,
    );

    match cli.chat.as_deref() {
        Some(chat_id) => controller.run_chat(chat_id, prompt.as_deref(), cli.shell, cli.code),
        None => controller.run_single_shot(prompt.as_deref().unwrap_or(""), cli.requested_mode()),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();
}
