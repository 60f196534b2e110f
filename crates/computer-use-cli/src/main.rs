use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use computer_use::agent::{Agent, AgentEvent, RunOutcome};
use computer_use::config::Settings;
use computer_use::grounding::GroundingResolver;
use computer_use::providers::factory::get_provider;
use computer_use::sandbox::local::LocalSandbox;
use computer_use::sandbox::Sandbox;
use computer_use::tools::{ComputerSystem, ToolDispatcher};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Maximum number of perceive/decide/act cycles, 0 for no limit
    #[arg(long)]
    max_iterations: Option<u32>,

    /// X display to drive, e.g. :0
    #[arg(long)]
    display: Option<String>,

    /// What the agent should accomplish
    objective: String,
}

fn print_event(event: &AgentEvent) {
    match event {
        AgentEvent::Thought { text, .. } => {
            println!("{} {}", style("THOUGHT:").green().bold(), text)
        }
        AgentEvent::Action { call, .. } => println!(
            "{} {} {}",
            style("ACTION:").red().bold(),
            call.name,
            style(&call.parameters).dim()
        ),
        AgentEvent::Observation { text, .. } => {
            println!("{} {}", style("OBSERVATION:").yellow().bold(), text)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("computer_use=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .as_deref()
        .map(|path| PathBuf::from(shellexpand::tilde(path).into_owned()));
    let mut settings = Settings::load(config_path.as_deref()).context("Failed to load settings")?;
    if let Some(max_iterations) = cli.max_iterations {
        settings.agent.max_iterations = (max_iterations > 0).then_some(max_iterations);
    }
    if let Some(display) = cli.display {
        settings.sandbox.display = display;
    }

    let vision = get_provider(settings.vision.provider_config()?)
        .context("Failed to set up the vision model")?;
    let action = get_provider(settings.action.provider_config()?)
        .context("Failed to set up the action model")?;
    let grounding = get_provider(settings.grounding.model_settings().provider_config()?)
        .context("Failed to set up the grounding model")?;

    let sandbox: Arc<dyn Sandbox> = Arc::new(LocalSandbox::new(settings.sandbox.display.clone()));
    let computer = ComputerSystem::new(
        sandbox.clone(),
        GroundingResolver::new(grounding, settings.grounding.space),
    );
    let dispatcher = ToolDispatcher::new(vec![Box::new(computer)])?;

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("Stopping after the current step...");
        handler_token.cancel();
    })
    .context("Failed to install the Ctrl-C handler")?;

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            print_event(&event);
        }
    });

    let mut agent = Agent::new(vision, action, sandbox, dispatcher)
        .with_settings(settings.agent)
        .with_cancellation(cancel)
        .with_events(events_tx);

    println!("The agent will use the following actions:");
    for tool in agent.tools() {
        println!("- {}", tool.signature());
    }
    println!("\n{} {}", style("OBJECTIVE:").cyan().bold(), cli.objective);

    let result = agent.run(&cli.objective).await;
    drop(agent);
    printer.await.ok();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            return Err(e).context("The agent stopped with an error");
        }
    };

    let summary = match report.outcome {
        RunOutcome::Stopped => style("Objective complete.").green(),
        RunOutcome::NoAction => style("The model requested no further action.").yellow(),
        RunOutcome::IterationLimit => style("Iteration limit reached.").yellow(),
        RunOutcome::Cancelled => style("Cancelled.").red(),
    };
    println!(
        "\n{} ({} iterations, {} messages)",
        summary,
        report.iterations,
        report.conversation.len()
    );
    Ok(())
}
