use chat_store::ChatMode;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "aish")]
#[command(about = "Chat with an AI assistant from your terminal")]
#[command(
    long_about = "aish forwards prompts to an OpenAI-compatible completion service and \
streams the reply to stdout. With --shell the reply is treated as a shell \
command you can execute or revise; with --code the reply is code only. \
--chat <id> keeps a conversation going across invocations: the mode a chat \
was started with is fixed for its lifetime.\n\n\
Environment Variables:\n\
  OPENAI_API_KEY    API key (required unless set in config.toml)\n\
  OPENAI_BASE_URL   Custom API base URL\n\
  AISH_MODEL        Model override"
)]
pub struct Cli {
    /// The prompt to generate a completion for.
    pub prompt: Option<String>,

    /// Randomness of generated output.
    #[arg(long, default_value_t = 1.0, value_parser = parse_temperature)]
    pub temperature: f64,

    /// Limits the highest-probability tokens considered at each step.
    #[arg(long, default_value_t = 1.0, value_parser = parse_top_probability)]
    pub top_probability: f64,

    /// Follow a conversation under this chat id.
    #[arg(long, value_name = "ID")]
    pub chat: Option<String>,

    /// List stored chat ids and exit.
    #[arg(long)]
    pub list_chats: bool,

    /// Generate shell commands and offer to execute them.
    #[arg(short = 's', long, conflicts_with = "code")]
    pub shell: bool,

    /// Provide code as output.
    #[arg(long)]
    pub code: bool,

    /// Compose the prompt in $EDITOR.
    #[arg(long)]
    pub editor: bool,

    /// Disable completion caching.
    #[arg(long)]
    pub no_cache: bool,
}

impl Cli {
    #[must_use]
    pub fn caching(&self) -> bool {
        !self.no_cache
    }

    #[must_use]
    pub fn requested_mode(&self) -> ChatMode {
        mode_from_flags(self.shell, self.code)
    }
}

#[must_use]
pub fn mode_from_flags(shell: bool, code: bool) -> ChatMode {
    if shell {
        ChatMode::Shell
    } else if code {
        ChatMode::Code
    } else {
        ChatMode::Plain
    }
}

fn parse_temperature(value: &str) -> Result<f64, String> {
    parse_ranged(value, 0.0, 1.0)
}

fn parse_top_probability(value: &str) -> Result<f64, String> {
    parse_ranged(value, 0.1, 1.0)
}

fn parse_ranged(value: &str, min: f64, max: f64) -> Result<f64, String> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if (min..=max).contains(&parsed) {
        Ok(parsed)
    } else {
        Err(format!("{parsed} is not within [{min}, {max}]"))
    }
}
