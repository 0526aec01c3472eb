//! Command line front end of the ready-made agent.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::pin::pin;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use loopgraph::core::{
    Agent, DEFAULT_MAX_MODEL_CALLS, Error, GraphShape, Message, ToolStatus,
};
use loopgraph::{Settings, agent_builder};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

const BAR_CHAR: &str = "▎";

/// Ask a model, which may call an `add` tool, and print its answer.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Call the model once, without any tool.
    #[arg(long)]
    direct: bool,

    /// Model to use, overrides `OPENAI_MODEL`.
    #[arg(long)]
    model: Option<String>,

    /// Base URL of the completion service, overrides `OPENAI_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    /// Maximum number of model calls in one run, 0 for no limit.
    #[arg(long, default_value_t = DEFAULT_MAX_MODEL_CALLS)]
    max_model_calls: usize,

    /// Run the tool calls of one model message concurrently.
    #[arg(long)]
    concurrent_tools: bool,

    /// Print the final conversation as JSON instead.
    #[arg(long)]
    json: bool,

    /// The prompt. Prompts are read from stdin line by line if omitted.
    prompt: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(model) = cli.model.clone() {
        settings = settings.with_model(model);
    }
    if let Some(base_url) = cli.base_url.clone() {
        settings = settings.with_base_url(base_url);
    }
    debug!("settings: {settings:?}");

    let shape = if cli.direct {
        GraphShape::Direct
    } else {
        GraphShape::ToolLoop
    };
    let max_model_calls = Some(cli.max_model_calls).filter(|max| *max > 0);

    let (message_tx, mut message_rx) = mpsc::unbounded_channel();
    let mut builder = agent_builder(&settings, shape)
        .with_max_model_calls(max_model_calls)
        .with_concurrent_tools(cli.concurrent_tools);
    if !cli.json {
        builder = builder.on_message(move |msg| {
            message_tx.send(msg.clone()).ok();
        });
    }
    let agent = builder.build();

    if let Some(prompt) = &cli.prompt {
        let result = run_once(&agent, &mut message_rx, prompt, cli.json).await;
        return match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("{}", err.bright_red());
                ExitCode::FAILURE
            }
        };
    }

    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        if !cli.json {
            print!("> ");
            std::io::stdout().flush().ok();
        }
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                error!("error reading input: {err}");
                return ExitCode::FAILURE;
            }
        };
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        // Failed runs don't end the session, the next prompt starts over.
        if let Err(err) =
            run_once(&agent, &mut message_rx, prompt, cli.json).await
        {
            eprintln!("{}", err.bright_red());
        }
    }
    ExitCode::SUCCESS
}

async fn run_once(
    agent: &Agent,
    message_rx: &mut mpsc::UnboundedReceiver<Message>,
    prompt: &str,
    json: bool,
) -> Result<(), Error> {
    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    let mut run = pin!(agent.run(vec![Message::user(prompt)]));
    let mut progress_bar: Option<ProgressBar> = None;

    let result = loop {
        if !json {
            // Create a new progress bar if it has been finished.
            progress_bar
                .get_or_insert_with(|| {
                    let progress_bar = ProgressBar::new_spinner();
                    progress_bar.set_style(progress_style.clone());
                    progress_bar.set_message("🤔 Thinking...");
                    progress_bar
                })
                .inc(1);
        }

        select! {
            result = &mut run => break result,
            Some(msg) = message_rx.recv() => {
                // Finish the progress bar before printing anything else.
                if let Some(progress_bar) = progress_bar.take() {
                    progress_bar.finish_and_clear();
                }
                print_message(&msg);
            }
            _ = sleep(Duration::from_millis(100)) => {}
        }
    };

    if let Some(progress_bar) = progress_bar.take() {
        progress_bar.finish_and_clear();
    }
    while let Ok(msg) = message_rx.try_recv() {
        print_message(&msg);
    }

    let messages = result?;
    if json {
        match serde_json::to_string_pretty(&messages) {
            Ok(dump) => println!("{dump}"),
            Err(err) => error!("failed to serialize the conversation: {err}"),
        }
    }
    Ok(())
}

fn print_message(msg: &Message) {
    match msg {
        Message::Assistant(msg) => {
            if !msg.content().is_empty() {
                println!(
                    "{}🤖 {}",
                    BAR_CHAR.bright_cyan(),
                    msg.content().bright_white()
                );
            }
            for call in msg.tool_calls() {
                println!(
                    "{}🔧 {} {}",
                    BAR_CHAR.bright_yellow(),
                    call.name().bright_white().bold(),
                    call.arguments().dimmed()
                );
            }
        }
        Message::Tool(result) => {
            let bar = BAR_CHAR.bright_yellow();
            match result.status {
                ToolStatus::Success => println!("{bar}  ↳ {}", result.content),
                ToolStatus::Error => {
                    println!("{bar}  ↳ {}", result.content.bright_red())
                }
            }
        }
        Message::System(_) | Message::User(_) => {}
    }
}
