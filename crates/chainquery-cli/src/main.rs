use anyhow::{Context, Result};
use chainquery_ai::IntentResolver;
use chainquery_api::{init_tracing, Server};
use chainquery_core::{ChainQueryConfig, ConfigManager, ResolutionResult, Turn};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

#[derive(Parser)]
#[command(name = "chainquery")]
#[command(about = "ChainQuery - turn plain-language requests into transfer-indexing queries", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (pretty, json)
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Config file to use instead of the default search path
    #[arg(short, long, global = true, env = "CHAINQUERY_CONFIG")]
    config: Option<PathBuf>,

    /// Never call the language model
    #[arg(long, global = true)]
    rule_only: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a single message, optionally with prior conversation
    Resolve {
        /// The user's message
        message: String,

        /// JSON file holding an array of {"role", "content"} turns
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// Interactive conversation on stdin
    Chat,

    /// Run the HTTP API server
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write a config file populated with defaults
    Init {
        #[arg(long, default_value = ".chainquery.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Config(ConfigCommands::Init { path, force }) = &cli.command {
        return init_config(path, *force);
    }

    let mut config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    if cli.rule_only {
        config.intent.use_model = false;
    }

    match cli.command {
        Commands::Resolve { message, history } => {
            let turns = match history {
                Some(path) => read_history(&path)?,
                None => Vec::new(),
            };
            let resolver = IntentResolver::from_config(&config);
            let result = resolver.resolve(&message, &turns).await;
            print_result(cli.output, &result)
        }
        Commands::Chat => {
            let resolver = IntentResolver::from_config(&config);
            chat(&resolver, cli.output).await
        }
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let manager = ConfigManager::from_config(config).context("Invalid configuration")?;
            let server = Server::from_config(Arc::new(manager))
                .context("Failed to initialize server")?;
            server.run().await?;
            Ok(())
        }
        Commands::Config(_) => Ok(()),
    }
}

fn load_config(path: Option<&Path>) -> Result<ChainQueryConfig> {
    let manager = match path {
        Some(path) => ConfigManager::from_path(path),
        None => ConfigManager::load(),
    }
    .context("Failed to load configuration")?;
    Ok(manager.config().clone())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    ConfigManager::create_default_config(path).context("Failed to write config file")?;
    println!("{} {}", "Wrote".green().bold(), path.display());
    Ok(())
}

fn read_history(path: &Path) -> Result<Vec<Turn>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("History file {} is not a JSON array of turns", path.display()))
}

/// The CLI owns the history here, the way a frontend would.
async fn chat(resolver: &IntentResolver, format: OutputFormat) -> Result<()> {
    let mut turns: Vec<Turn> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if matches!(format, OutputFormat::Pretty) {
        println!(
            "{}",
            "Describe the transfer data you want indexed. Type 'exit' to quit.".dimmed()
        );
    }

    loop {
        if matches!(format, OutputFormat::Pretty) {
            print!("{} ", ">".cyan().bold());
            std::io::stdout().flush()?;
        }

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if matches!(message, "exit" | "quit") {
            break;
        }

        let result = resolver.resolve(message, &turns).await;
        print_result(format, &result)?;

        // Replies quote example requests, so only user turns are kept
        if result.is_query_ready {
            debug!(turns = turns.len(), "query ready, starting a new conversation");
            turns.clear();
        } else {
            turns.push(Turn::user(message));
        }
    }

    Ok(())
}

fn print_result(format: OutputFormat, result: &ResolutionResult) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(result)?);
        }
        OutputFormat::Pretty => print_pretty(result),
    }
    Ok(())
}

fn print_pretty(result: &ResolutionResult) {
    println!("{}", result.message);

    let confidence = format!("{:.2}", result.confidence);
    if let Some(query) = &result.suggested_query {
        println!("  {}: {}", "query".cyan().bold(), query.green());
        println!("  {}: {}", "confidence".cyan().bold(), confidence.yellow());
        return;
    }

    let missing = result
        .missing()
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    println!("  {}: {}", "missing".cyan().bold(), missing.red());
    println!("  {}: {}", "confidence".cyan().bold(), confidence.yellow());

    if let Some(suggestions) = &result.suggestions {
        for suggestion in suggestions {
            println!("  {} {}", "-".dimmed(), suggestion.dimmed());
        }
    }
}
