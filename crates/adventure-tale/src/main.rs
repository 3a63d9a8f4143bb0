//! A terminal frontend for `adventure-tale`.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::process::ExitCode;
use std::time::Duration;

use adventure_tale::core::api::{
    self, StoryChoiceRequest, StorySegmentResponse, StoryStartRequest,
};
use adventure_tale::core::{StoryError, StorySegment};
use adventure_tale::{Session, SessionBuilder};
use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt, AsyncReadExt};

const BAR_CHAR: &str = "▎";
const NEW_STORY_CHOICE: &str = "Start a new story?";

#[derive(Parser)]
#[command(version, about = "Interactive stories for children")]
struct Cli {
    /// Seconds to wait for the storyteller before giving up on a step.
    #[arg(long, global = true, default_value_t = 60)]
    timeout: u64,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Play a story in the terminal.
    Play {
        /// What the story should be about.
        #[arg(long)]
        theme: Option<String>,
    },
    /// Start a story and print the first segment as JSON.
    Start {
        /// What the story should be about.
        #[arg(long)]
        theme: String,
    },
    /// Read a continue request as JSON from stdin and print the next
    /// segment as JSON.
    Continue,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut session = SessionBuilder::from_env()
        .with_timeout(Duration::from_secs(cli.timeout))
        .build();

    match cli.command.unwrap_or(Command::Play { theme: None }) {
        Command::Play { theme } => {
            play(&mut session, theme).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Start { theme } => {
            let req = StoryStartRequest { theme };
            print_response(api::start(session.teller(), req).await)
        }
        Command::Continue => {
            let mut body = String::new();
            io::stdin()
                .read_to_string(&mut body)
                .await
                .context("failed to read the request from stdin")?;
            let req: StoryChoiceRequest = serde_json::from_str(&body)
                .context("stdin is not a valid continue request")?;
            print_response(api::continue_story(session.teller(), req).await)
        }
    }
}

fn print_response(
    resp: Result<StorySegmentResponse, api::ApiError>,
) -> Result<ExitCode> {
    match resp {
        Ok(resp) => {
            println!("{}", serde_json::to_string_pretty(&resp)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            println!("{}", serde_json::to_string(&err)?);
            Ok(if err.is_client_error() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

async fn play(session: &mut Session, theme: Option<String>) -> Result<()> {
    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")?
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    let theme = match theme {
        Some(theme) => theme,
        None => {
            print!("What should the story be about? ");
            std::io::stdout().flush()?;
            let Some(line) = read_line().await else {
                return Ok(());
            };
            line.trim().to_owned()
        }
    };

    let mut next_choice: Option<String> = None;
    loop {
        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(progress_style.clone());
        progress_bar.set_message("📖 The storyteller is thinking...");
        progress_bar.enable_steady_tick(Duration::from_millis(100));

        let segment = match next_choice.take() {
            Some(choice) if choice != NEW_STORY_CHOICE => {
                session.choose(&choice).await
            }
            _ => session.start(&theme).await,
        };

        // Finish the progress bar before printing anything else.
        progress_bar.finish_and_clear();

        let segment = match segment {
            Ok(segment) => segment.clone(),
            Err(err @ StoryError::InvalidRequest(_)) => {
                println!("{}", format!("{err}").bright_red());
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        print_segment(&segment);

        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = read_line().await else {
            break;
        };
        let choice = pick_choice(&segment, line.trim());
        debug!("picked choice: {choice:?}");
        next_choice = Some(choice);
    }

    Ok(())
}

fn print_segment(segment: &StorySegment) {
    let bar = BAR_CHAR.bright_cyan();
    println!();
    for line in segment.story_text.lines() {
        println!("{bar}{}", line.bright_white());
    }
    println!("{}🖼  {}", BAR_CHAR.bright_magenta(), segment.image_prompt.dimmed());
    println!();
    for (idx, choice) in segment.choices.iter().enumerate() {
        println!("  {} {choice}", format!("[{}]", idx + 1).bright_yellow());
    }
}

/// A number picks one of the offered choices, an empty line picks the first
/// one, anything else is taken as the child's own idea.
fn pick_choice(segment: &StorySegment, line: &str) -> String {
    if line.is_empty() {
        return segment.choices.first().cloned().unwrap_or_default();
    }
    line.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|idx| segment.choices.get(idx))
        .cloned()
        .unwrap_or_else(|| line.to_owned())
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
