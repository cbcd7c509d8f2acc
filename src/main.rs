use anyhow::Result;
use clap::{Parser, Subcommand};
use sage::app::App;
use sage::client::HttpChatBackend;
use sage::config::{Config, ConfigOverrides};
use sage::events::Screen;
use sage::{headless, logging};
use std::io;

#[derive(Parser)]
#[command(name = "sage")]
#[command(version)]
#[command(about = "The Modern Sage: modern psychology meets ancient spirituality", long_about = None)]
struct Cli {
    /// Chat endpoint URL
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long = "timeout", global = true, value_name = "SECS")]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Skip the landing page and open a conversation
    Chat,
    /// Ask a single question and print the answer
    Ask {
        /// The question to ask
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Print the final transcript as JSON instead of streaming text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load(&ConfigOverrides {
        api_url: cli.api_url,
        request_timeout_secs: cli.timeout,
    })?;

    match cli.command {
        None => run_tui(config, Screen::Landing),
        Some(Commands::Chat) => run_tui(config, Screen::Conversation),
        Some(Commands::Ask { question, json }) => {
            logging::init_stderr()?;
            let backend = HttpChatBackend::new(&config)?;
            let mut stdout = io::stdout().lock();
            headless::ask(backend, &question.join(" "), json, &mut stdout).await
        }
    }
}

fn run_tui(config: Config, start: Screen) -> Result<()> {
    let _guard = logging::init_file(&config.log_dir())?;
    App::new(config, start)?.run()
}
