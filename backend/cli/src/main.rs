mod config;
mod input;
mod shutdown;
mod terminal_output;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing::{error, info, warn};

use clara_agent::{AgentRunner, DispatchLimits, ModelConfig, Session, Turn};
use clara_commands::Control;
use clara_config::ClaraConfig;
use clara_core::{ChatSurface, ClaraError, LlmProvider};
use clara_logging::{init_logger, LoggerOptions};
use clara_plugins::{builtin_plugins, PluginContext, PluginRegistry};
use clara_providers::{OllamaProvider, ProviderRegistry};

use config::Overrides;
use terminal_output::ConsoleSurface;

const ASSISTANT: &str = "Clara";

#[derive(Parser)]
#[command(name = "clara")]
#[command(about = "Clara: chat with a local LLM that can call plugins")]
#[command(version)]
struct Cli {
    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Model name, e.g. llama3
    #[arg(long, global = true)]
    model: Option<String>,

    /// Primary plugin directory
    #[arg(long, global = true)]
    plugins_dir: Option<PathBuf>,

    /// Ollama base URL
    #[arg(long, global = true)]
    ollama_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Start an interactive chat (default)
    Chat,
    /// Load every plugin and list them
    Plugins,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = %format!("{e:#}"), "Clara stopped");
        terminal_output::note_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli).await?;

    init_logger(&LoggerOptions {
        dir: PathBuf::from(&config.logging.dir),
        file_name: config.logging.file_name.clone(),
        level: config.logging.level.clone(),
        console: config.logging.console,
        rotation: config.logging.rotation.clone(),
    })?;
    info!(model = %config.model.name, provider = %config.model.provider, "Starting Clara");

    let provider = build_provider(&config)?;
    let surface = Arc::new(ConsoleSurface::new());
    let registry = load_plugins(&config, provider.clone(), surface.clone()).await?;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Plugins => {
            print_plugins(&registry);
            Ok(())
        }
        Commands::Chat => chat(&config, provider, registry, surface).await,
    }
}

async fn load_config(cli: &Cli) -> Result<ClaraConfig> {
    let path = config::config_path(cli.config.as_deref());
    let mut config = clara_config::load_and_prepare(&path)
        .await
        .with_context(|| format!("loading config from {}", path.display()))?;

    let flags = Overrides {
        model: cli.model.clone(),
        plugins_dir: cli.plugins_dir.clone(),
        ollama_url: cli.ollama_url.clone(),
    };
    Overrides::from_env().then(flags).apply(&mut config);
    clara_config::check(&config).map_err(|e| ClaraError::ConfigError(format!("{e:#}")))?;
    Ok(config)
}

fn build_provider(config: &ClaraConfig) -> Result<Arc<dyn LlmProvider>> {
    let mut providers = ProviderRegistry::new();
    providers.register(
        "ollama",
        Arc::new(
            OllamaProvider::new()
                .with_base_url(&config.model.base_url)
                .with_timeout(Duration::from_secs(config.model.request_timeout_secs)),
        ),
    );

    let provider = providers
        .get(&config.model.provider)
        .ok_or_else(|| ClaraError::UnknownProvider(config.model.provider.clone()))?;
    info!(provider = %config.model.provider, "Provider ready");
    Ok(provider)
}

/// Builtins plus every manifest in the plugin directories. Any failure is fatal.
async fn load_plugins(
    config: &ClaraConfig,
    provider: Arc<dyn LlmProvider>,
    surface: Arc<dyn ChatSurface>,
) -> Result<PluginRegistry> {
    let ctx = PluginContext::new(&config.model.name)
        .with_provider(provider)
        .with_surface(surface)
        .with_settings(config.plugins.settings.clone());
    let dirs = config::plugin_dirs(config);

    let mut registry =
        PluginRegistry::new().with_call_timeout(Duration::from_secs(config.plugins.call_timeout_secs));
    let count = registry
        .load_from_dirs(builtin_plugins(), &dirs, &config.plugins.manifest_suffix, &ctx)
        .await
        .map_err(|e| ClaraError::Startup(format!("loading plugins: {e}")))?;

    info!(count, "[Plugins] Registry ready");
    Ok(registry)
}

fn print_plugins(registry: &PluginRegistry) {
    let rows: Vec<Vec<String>> = registry
        .descriptors()
        .into_iter()
        .map(|(id, description)| vec![id, description])
        .collect();
    println!("\nLoaded plugins ({})\n", rows.len());
    print!("{}", terminal_output::render_table(&["ID", "DESCRIPTION"], &rows));
}

async fn chat(
    config: &ClaraConfig,
    provider: Arc<dyn LlmProvider>,
    registry: PluginRegistry,
    console: Arc<ConsoleSurface>,
) -> Result<()> {
    let runner = AgentRunner::new(provider, Arc::new(registry))
        .with_model(ModelConfig {
            model_name: config.model.name.clone(),
            temperature: config.model.temperature,
        })
        .with_limits(DispatchLimits {
            max_chained_calls: config.dispatch.max_chained_calls,
            max_identical_calls: config.dispatch.max_identical_calls,
        });
    let mut session = Session::new(runner).with_prime_on_reset(config.session.prime_on_reset);

    let surface: &dyn ChatSurface = console.as_ref();
    surface.clear();

    let mut stop = shutdown::spawn_listener(shutdown::ctrl_c());
    tokio::select! {
        primed = session.reset() => {
            primed.map_err(|e| ClaraError::Startup(format!("sending the system prompt: {e}")))?;
        }
        _ = shutdown::requested(&mut stop) => {
            surface.add_message(ASSISTANT, "Exiting...");
            return Ok(());
        }
    }

    let idle = match config.session.idle_timeout_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };
    let mut input = input::spawn_input_reader(BufReader::new(tokio::io::stdin()), console.clone());

    loop {
        surface.enable_input();

        let line = tokio::select! {
            line = input.recv() => line,
            _ = idle_timer(idle) => {
                info!("Idle timeout reached");
                println!();
                surface.add_message(ASSISTANT, "Idle timeout reached. Exiting...");
                break;
            }
            _ = shutdown::requested(&mut stop) => {
                println!();
                surface.add_message(ASSISTANT, "Exiting...");
                break;
            }
        };
        let Some(line) = line else {
            info!("Input closed");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        surface.disable_input();
        let turn = tokio::select! {
            turn = session.handle_input(&line) => turn,
            _ = shutdown::requested(&mut stop) => {
                println!();
                surface.add_message(ASSISTANT, "Exiting...");
                break;
            }
        };
        match turn {
            Ok(Turn::Reply(answer)) => surface.add_message(ASSISTANT, &answer),
            Ok(Turn::Command(response)) => match response.control {
                Control::Continue => surface.add_message(ASSISTANT, &response.text),
                Control::Restarted => {
                    surface.clear();
                    surface.add_message(ASSISTANT, &response.text);
                }
                Control::Exit => {
                    surface.clear();
                    surface.add_message(ASSISTANT, &response.text);
                    break;
                }
            },
            Err(e) => {
                warn!(error = %e, "Turn failed");
                surface.add_message("Error", &e.to_string());
            }
        }
    }

    info!(conversation = %session.conversation().id(), "Session ended");
    Ok(())
}

async fn idle_timer(idle: Option<Duration>) {
    match idle {
        Some(after) => tokio::time::sleep(after).await,
        None => std::future::pending().await,
    }
}
