use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use jestcalc::calculator::copy_to_clipboard;
use jestcalc::config::Config;
use jestcalc::joke::{GeminiJokes, JokeRequest, JokeTasks, tell};
use jestcalc::speech::Speaker;
use jestcalc::{Calculation, Session};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// A calculator that tells a joke about every calculation.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Expression to evaluate once; starts an interactive session when omitted.
    expression: Option<String>,

    /// Path to the config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not fetch jokes.
    #[arg(long)]
    no_joke: bool,

    /// Do not read messages aloud.
    #[arg(long)]
    no_speech: bool,

    /// Print calculations as JSON.
    #[arg(long)]
    json: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

/// The collaborators that run after each calculation.
struct Teller {
    jokes: Option<GeminiJokes>,
    speaker: Speaker,
    json: bool,
    /// How long to wait for outstanding jokes on exit.
    drain_timeout: Duration,
}

impl Teller {
    fn new(cli: &Cli, config: &Config) -> Self {
        let jokes = if cli.no_joke || !config.joke.enabled {
            None
        } else {
            match config.joke.resolve_api_key() {
                Some(key) => GeminiJokes::new(&config.joke, &key)
                    .inspect_err(|e| tracing::warn!("Jokes disabled: {}", e))
                    .ok(),
                None => {
                    tracing::warn!("Jokes disabled: no API key (set GEMINI_API_KEY)");
                    None
                }
            }
        };

        let speaker = if cli.no_speech {
            Speaker::silent()
        } else {
            Speaker::new(&config.speech)
        };

        tracing::debug!(
            jokes = jokes.is_some(),
            speech = speaker.is_enabled(),
            "Collaborators ready"
        );

        Self {
            jokes,
            speaker,
            json: cli.json,
            drain_timeout: Duration::from_secs(config.joke.timeout_secs + 1),
        }
    }

    /// Show `text` in place of a joke and read it aloud.
    fn show(&self, text: &str) {
        if self.json {
            println!("{}", serde_json::json!({ "joke": text }));
        } else {
            println!("  {}", text);
        }
        self.speaker.speak(text);
    }

    async fn tell_about(&self, request: &JokeRequest) {
        if let Some(jokes) = &self.jokes {
            let joke = tell(jokes, request).await;
            self.show(&joke);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "jestcalc=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_calculation(calculation: &Calculation, json: bool) -> Result<()> {
    if json {
        let line = serde_json::to_string(calculation).context("Failed to encode calculation")?;
        println!("{}", line);
    } else if !calculation.expression.is_empty() {
        println!("{} = {}", calculation.expression, calculation.display_result);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;
    let teller = Arc::new(Teller::new(&cli, &config));
    let mut session = Session::new(config.display.thousands_separators);

    if let Some(expression) = &cli.expression {
        session.paste(expression);
        let calculation = session.calculate();
        print_calculation(&calculation, teller.json)?;
        match (&calculation.message, &calculation.joke_request) {
            (Some(message), _) => teller.show(message),
            (None, Some(request)) => teller.tell_about(request).await,
            (None, None) => {}
        }
        return Ok(());
    }

    run_interactive(&mut session, teller).await
}

/// Read lines from stdin until EOF or `:q`.
///
/// Lines are appended to the pending expression. A line ending in `=`, or an
/// empty line, triggers the calculation. One-character lines count as key
/// presses, so an operator typed after an operator replaces it.
///
/// Jokes are fetched in the background; when several are in flight they are
/// printed in whatever order they arrive. Outstanding jokes are awaited before
/// returning.
async fn run_interactive(session: &mut Session, teller: Arc<Teller>) -> Result<()> {
    let mut jokes = JokeTasks::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprintln!("Type an expression and end it with '=' (or press Enter on an empty line).");
    eprintln!("Commands: :b backspace, :c clear, :show, :copy, :q quit");

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        match line.trim() {
            ":q" | ":quit" => break,
            ":c" | ":clear" => session.clear(),
            ":b" | ":back" => {
                session.backspace();
                println!("{}", session.pending());
            }
            ":show" => println!("{}", session.pending()),
            ":copy" => match session.last() {
                Some(calculation) => {
                    if let Err(e) = copy_to_clipboard(calculation.text_for_clipboard()) {
                        tracing::warn!("{:#}", e);
                    }
                }
                None => println!("Nothing to copy yet."),
            },
            input => {
                let (input, submit) = match input.strip_suffix('=') {
                    Some(rest) => (rest, true),
                    None => (input, input.is_empty()),
                };
                // A single character is a key press; anything longer was pasted.
                if input.chars().count() == 1 {
                    session.append(input);
                } else {
                    session.paste(input);
                }
                if !submit {
                    continue;
                }

                let calculation = session.calculate();
                print_calculation(&calculation, teller.json)?;

                if let Some(message) = &calculation.message {
                    teller.show(message);
                } else if let Some(request) = calculation.joke_request {
                    let teller = Arc::clone(&teller);
                    jokes.spawn(async move { teller.tell_about(&request).await });
                }
            }
        }
        jokes.reap();
    }

    if !jokes.is_empty() {
        tracing::debug!(pending = jokes.len(), "Waiting for jokes");
        jokes.drain(teller.drain_timeout).await;
    }

    Ok(())
}
