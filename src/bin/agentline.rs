use agentline::api::{AgentClient, StreamParser};
use agentline::config::Config;
use agentline::render::TurnRenderer;
use agentline::turn::{EventMapper, ReducerEffect, TurnEvent, TurnReducer};
use agentline::types::ApiMessage;
use anyhow::{Context, Result};
use crossterm::style::Stylize;
use futures::StreamExt;
use std::io::Write;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal::unix::{signal, Signal, SignalKind};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("cannot load configuration")?;
    config.validate()?;

    let preset = config
        .preset()
        .context("no usable system prompt preset")?;
    let client = AgentClient::new(&config);

    print_banner(&config, &preset.name, &preset.allowed_tools);

    let mut history: Vec<ApiMessage> = Vec::new();
    let mut interrupts = Interrupts::new().context("cannot install interrupt handler")?;
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("\n{}", "you > ".bold());
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = interrupts.recv() => break,
        };
        let Some(line) = line else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }

        history.push(ApiMessage::user(input));
        match run_turn(
            &client,
            &preset.prompt,
            &preset.allowed_tools,
            &history,
            &mut interrupts,
        )
        .await
        {
            Ok(TurnOutcome::Completed(assistant_text)) => {
                if !assistant_text.trim().is_empty() {
                    history.push(ApiMessage::assistant(assistant_text));
                }
            }
            Ok(TurnOutcome::Interrupted) => {}
            Err(error) => {
                eprintln!("\n{} {error:#}", "error:".red());
            }
        }
    }

    println!("{}", "bye".dim());
    Ok(())
}

/// Long-lived SIGINT listener shared by the prompt loop and the turn driver.
///
/// Registering a signal handler replaces the default terminate-on-SIGINT
/// behavior for the rest of the process, so a single listener is installed
/// once and every await point selects against it. Ctrl-C during a turn
/// interrupts the turn; Ctrl-C at the prompt exits the loop.
struct Interrupts(Signal);

impl Interrupts {
    fn new() -> std::io::Result<Self> {
        Ok(Self(signal(SignalKind::interrupt())?))
    }

    async fn recv(&mut self) {
        self.0.recv().await;
    }
}

enum TurnOutcome {
    Completed(String),
    Interrupted,
}

/// Run one conversational turn: stream events, fold them into display
/// blocks, and render them live. Ctrl-C interrupts the turn without
/// leaving the session.
async fn run_turn(
    client: &AgentClient,
    system_prompt: &str,
    allowed_tools: &[String],
    history: &[ApiMessage],
    interrupts: &mut Interrupts,
) -> Result<TurnOutcome> {
    let started = Instant::now();
    let mut stream = client
        .create_stream(system_prompt, allowed_tools, history)
        .await?;

    let mut parser = StreamParser::new();
    let mut mapper = EventMapper::new();
    let mut reducer = TurnReducer::new();
    let mut renderer = TurnRenderer::new();
    let mut assistant_text = String::new();

    loop {
        let chunk_result = tokio::select! {
            chunk = stream.next() => chunk,
            _ = interrupts.recv() => {
                reducer.reset();
                renderer.finish(true, started.elapsed().as_secs())?;
                return Ok(TurnOutcome::Interrupted);
            }
        };

        let Some(chunk_result) = chunk_result else {
            break;
        };
        let chunk = chunk_result?;
        for event in parser.process(&chunk)? {
            let Some(turn_event) = mapper.map(&event) else {
                continue;
            };
            let effect = reducer.apply(turn_event);
            if let ReducerEffect::AppendText { text } = &effect {
                assistant_text.push_str(text);
            }
            renderer.handle(&effect)?;
        }
    }

    // Streams may end without an explicit end-of-turn event.
    reducer.apply(TurnEvent::TurnEnd);
    renderer.finish(false, started.elapsed().as_secs())?;
    Ok(TurnOutcome::Completed(assistant_text))
}

fn print_banner(config: &Config, preset_name: &str, allowed_tools: &[String]) {
    println!("{}", "agentline".cyan().bold());
    println!("  model:    {}", config.model);
    println!("  endpoint: {}", config.base_url);
    println!("  preset:   {preset_name}");
    println!("  tools:    {}", allowed_tools.join(", "));
    println!("{}", "type 'exit' or 'quit' to leave".dim());
}
