mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::RagloopConfig;
use ragloop_agent::{
    AgentRunner, ChatBackend, OpenAiCompatibleBackend, ProviderName, ProviderRegistry, StreamEvent,
};
use ragloop_builtins::{register_builtins, KnowledgeServices};
use ragloop_core::ToolCall;
use ragloop_knowledge::InMemoryKnowledgeStore;
use ragloop_tools::catalog::{available_tool_definitions, TODO_WRITE};
use ragloop_tools::{ToolContext, ToolFilter, ToolRegistry};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ragloop", about = "ragloop: tool-calling retrieval agent runtime")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "ragloop.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect tools
    Tools {
        #[command(subcommand)]
        action: ToolsAction,
    },
    /// Inspect the provider table
    Providers {
        #[command(subcommand)]
        action: ProvidersAction,
    },
    /// Run the plan tool on a JSON arguments file and print its output
    Plan {
        /// File holding the todo_write arguments
        file: PathBuf,
    },
    /// Ask a question and run the agent loop until it answers
    Chat {
        /// The question
        question: String,
        /// Stream the answer as it is generated (overrides config)
        #[arg(long)]
        stream: bool,
        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ToolsAction {
    /// List registered tools and the catalog
    List,
}

#[derive(Subcommand)]
enum ProvidersAction {
    /// List known providers
    List,
    /// Show which provider a base URL resolves to
    Detect {
        /// Base URL to classify
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = RagloopConfig::load(&cli.config).await?;

    match cli.command {
        Commands::Tools { action } => match action {
            ToolsAction::List => {
                let registry = build_registry(&config).await?;
                let advertised = config.agent.advertise_filter();
                let executable = config.agent.execute_filter();

                println!("Registered tools:");
                for descriptor in registry.list_descriptors() {
                    let mut flags = Vec::new();
                    if advertised.allows(&descriptor.name) {
                        flags.push("advertised");
                    }
                    if executable.allows(&descriptor.name) {
                        flags.push("executable");
                    }
                    println!("  {} [{}]", descriptor.name, flags.join(", "));
                }
                println!("\nTotal: {} tool(s)", registry.tool_count());

                let defaults = ToolFilter::default_allowed();
                println!("\nCatalog:");
                for tool in available_tool_definitions() {
                    let marker = if defaults.allows(&tool.name) { "*" } else { " " };
                    println!("  {marker} {:<24} {}: {}", tool.name, tool.label, tool.description);
                }
                println!("\n* allowed by default");
            }
        },
        Commands::Providers { action } => {
            let providers = ProviderRegistry::builtin()?;
            match action {
                ProvidersAction::List => {
                    for p in providers.list() {
                        let capabilities: Vec<String> =
                            p.capabilities.iter().map(ToString::to_string).collect();
                        println!(
                            "{:<12} {:<20} [{}]{}",
                            p.name.as_str(),
                            p.display_name,
                            capabilities.join(", "),
                            if p.requires_auth { "" } else { " (no key needed)" }
                        );
                    }
                }
                ProvidersAction::Detect { url } => {
                    let name = providers.detect(&url);
                    println!("{name}");
                    if name == ProviderName::Generic {
                        println!("No vendor pattern matched; requests use the URL as given.");
                    }
                }
            }
        }
        Commands::Plan { file } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read '{}'", file.display()))?;
            let mut registry = ToolRegistry::new();
            ragloop_builtins::register_planning_tools(&mut registry)?;
            let call = ToolCall::new(ToolCall::generate_id(), TODO_WRITE, text);
            let result = registry
                .dispatch(&ToolContext::new(), &call, &ToolFilter::all())
                .await;
            println!("{}", result.to_model_content());
            if !result.success {
                anyhow::bail!("plan tool failed: {}", result.error_message());
            }
        }
        Commands::Chat {
            question,
            stream,
            json,
        } => {
            let model = config.require_model()?;
            let providers = ProviderRegistry::builtin()?;
            let backend: Arc<dyn ChatBackend> =
                Arc::new(OpenAiCompatibleBackend::new(model, &providers)?);
            let registry = Arc::new(build_registry(&config).await?);

            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling");
                    on_signal.cancel();
                }
            });

            let mut runner = AgentRunner::new(backend, registry, config.agent.clone())
                .with_options(model.chat_options());

            let mut printer = None;
            if stream || model.stream {
                let (tx, rx) = mpsc::channel(256);
                runner = runner.with_streaming((!json).then_some(tx));
                if !json {
                    printer = Some(tokio::spawn(print_stream(rx)));
                }
            }

            let outcome = runner.run(&[], &question, &cancel).await;
            drop(runner);
            if let Some(printer) = printer {
                let _ = printer.await;
            }
            let outcome = outcome?;

            info!(
                turns = outcome.turns,
                tool_calls = outcome.executions.len(),
                "Chat finished"
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else if !(stream || model.stream) {
                println!("{}", outcome.answer);
            }
        }
    }

    Ok(())
}

async fn build_registry(config: &RagloopConfig) -> anyhow::Result<ToolRegistry> {
    let store = match &config.knowledge.fixture {
        Some(path) => InMemoryKnowledgeStore::load_fixture(path).await?,
        None => InMemoryKnowledgeStore::new(),
    };
    let services = KnowledgeServices::from_store(Arc::new(store));
    let mut registry = ToolRegistry::new();
    register_builtins(&mut registry, &services, config.agent.knowledge_base_ids.clone())?;
    info!(count = registry.tool_count(), "Built-in tools registered");
    Ok(registry)
}

async fn print_stream(mut rx: mpsc::Receiver<StreamEvent>) {
    let mut stdout = std::io::stdout();
    while let Some(event) = rx.recv().await {
        match event {
            StreamEvent::TextDelta { text } => {
                let _ = write!(stdout, "{text}");
                let _ = stdout.flush();
            }
            StreamEvent::ToolCallStart { name, .. } if !name.is_empty() => {
                let _ = writeln!(stdout, "\n[calling {name}]");
            }
            StreamEvent::Done { finish_reason } => {
                if finish_reason.as_deref() != Some("tool_calls") {
                    let _ = writeln!(stdout);
                }
            }
            StreamEvent::Error { message } => {
                let _ = writeln!(stdout, "\n[stream error: {message}]");
            }
            _ => {}
        }
    }
}
