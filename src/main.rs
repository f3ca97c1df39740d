use std::io::Write as _;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use analysis_refinery::config::Config;
use analysis_refinery::elements::{ElementStore, SqliteElementStore};
use analysis_refinery::error::{AppError, IterationError, LineageError};
use analysis_refinery::lineage::Version;
use analysis_refinery::refinement::Method;
use analysis_refinery::session::AnalysisSession;

/// Iterative document analysis refinement from the terminal
#[derive(Parser)]
#[command(name = "analysis-refinery", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive refinement session from an analysis prompt
    Run {
        /// The analysis prompt that seeds the session
        #[arg(long)]
        prompt: String,
        /// Analysis method: extraction or reasoning
        #[arg(long, default_value = "extraction")]
        method: String,
    },
    /// Inspect and manage saved elements
    Elements {
        #[command(subcommand)]
        command: ElementsCommand,
    },
}

#[derive(Subcommand)]
enum ElementsCommand {
    /// List saved elements, newest first
    List,
    /// Show one element in full
    Show {
        /// Element identifier
        element_id: String,
    },
    /// Delete a saved element
    Delete {
        /// Element identifier
        element_id: String,
    },
    /// Aggregate statistics over saved elements
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    match cli.command {
        Command::Run { prompt, method } => {
            let method = method
                .parse::<Method>()
                .map_err(|e| anyhow::anyhow!(e))?;
            run_session(&config, &prompt, method).await
        }
        Command::Elements { command } => run_elements(&config, command).await,
    }
}

async fn run_session(config: &Config, prompt: &str, method: Method) -> anyhow::Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = %config.backend.base_url,
        "Starting refinement session"
    );

    let mut session = AnalysisSession::new(config).await?;
    session.set_method(method);

    println!("Running initial analysis...");
    let version = session.begin(prompt).await?;
    let name = session.element_name().await.unwrap_or_default();
    println!("\n=== {} - Version {} ===", name, version.number);
    println!("{}\n", version.output);
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print!("> ");
    std::io::stdout().flush().ok();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if !line.is_empty() && !handle_line(&mut session, &line).await {
            break;
        }
        print!("> ");
        std::io::stdout().flush().ok();
    }

    println!("Session ended.");
    Ok(())
}

/// Process one interactive line; returns false when the session should end.
async fn handle_line(session: &mut AnalysisSession, line: &str) -> bool {
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((head, tail)) => (head, tail.trim()),
        None => (line, ""),
    };

    match command {
        ":quit" | ":exit" => return false,
        ":help" => print_help(),
        ":lock" => {
            let target = if rest.is_empty() {
                None
            } else {
                match rest.parse::<u32>() {
                    Ok(number) => Some(number),
                    Err(_) => {
                        println!("Usage: :lock [version]");
                        return true;
                    }
                }
            };
            match session.lock_version(target).await {
                Ok(version) => println!("Version {} locked.", version.number),
                Err(e) => report(e),
            }
        }
        ":select" => match rest.parse::<u32>() {
            Ok(number) => {
                session.select_version(number).await;
                println!("Version {} selected for save.", number);
            }
            Err(_) => println!("Usage: :select <version>"),
        },
        ":view" => match rest.parse::<u32>() {
            Ok(number) => match session.view_version(number).await {
                Ok(version) => print_version(&version),
                Err(e) => report(e),
            },
            Err(_) => println!("Usage: :view <version>"),
        },
        ":name" => {
            if rest.is_empty() {
                println!("Usage: :name <element name>");
            } else {
                session.rename(rest).await;
                println!("Element renamed to \"{}\".", rest);
            }
        }
        ":method" => match rest.parse::<Method>() {
            Ok(method) => {
                session.set_method(method);
                println!("Method switched to {}.", method);
            }
            Err(e) => println!("{}", e),
        },
        ":versions" => {
            for version in session.versions().await {
                let mut flags = Vec::new();
                if version.locked {
                    flags.push("locked");
                }
                if version.saved {
                    flags.push("saved");
                }
                println!(
                    "Version {} ({} chars){}",
                    version.number,
                    version.output.len(),
                    if flags.is_empty() {
                        String::new()
                    } else {
                        format!(" [{}]", flags.join(", "))
                    }
                );
            }
        }
        ":save" => {
            let name = if rest.is_empty() { None } else { Some(rest) };
            match session.save(name).await {
                Ok(ack) => println!("Element {} ({}).", ack.action, ack.element_id),
                Err(e) => report(e),
            }
        }
        _ => match session.refine(line).await {
            Ok(version) => print_version(&version),
            Err(e) => report(e),
        },
    }

    true
}

fn print_version(version: &Version) {
    println!("\n=== Version {} ===", version.number);
    println!("{}\n", version.output);
}

fn print_help() {
    println!("Type a refinement instruction, or one of:");
    println!("  :lock [n]       lock a version (current by default)");
    println!("  :select <n>     choose the version a save targets");
    println!("  :view <n>       show an earlier version");
    println!("  :name <text>    rename the element");
    println!("  :method <m>     switch between extraction and reasoning");
    println!("  :versions       list all versions");
    println!("  :save [name]    persist the resolved version");
    println!("  :quit           end the session");
}

/// Print an operation failure as a user-legible message.
fn report(error: AppError) {
    match error {
        AppError::Lineage(LineageError::AlreadyLocked { version }) => {
            println!("Version {} is already locked.", version);
        }
        AppError::Iteration(IterationError::Busy) => {
            println!("A refinement is still in flight; wait for it to finish.");
        }
        AppError::Iteration(IterationError::EmptyInstruction) => {
            println!("Please enter an instruction.");
        }
        other => println!("Error: {}", other),
    }
}

async fn run_elements(config: &Config, command: ElementsCommand) -> anyhow::Result<()> {
    let store = SqliteElementStore::new(&config.database).await?;

    match command {
        ElementsCommand::List => {
            let elements = store.list_elements().await?;
            if elements.is_empty() {
                println!("No saved elements.");
            }
            for element in elements {
                println!(
                    "{}  {}  (v{}, {} messages, saved {})",
                    element.element_id,
                    element.element_name,
                    element.saved_version,
                    element.chat_count,
                    element.saved_at.format("%Y-%m-%d %H:%M"),
                );
                println!("    {}", element.output_preview);
            }
        }
        ElementsCommand::Show { element_id } => match store.get_element(&element_id).await? {
            Some(element) => println!("{}", serde_json::to_string_pretty(&element)?),
            None => println!("Element not found: {}", element_id),
        },
        ElementsCommand::Delete { element_id } => {
            if store.delete_element(&element_id).await? {
                println!("Element deleted: {}", element_id);
            } else {
                println!("Element not found: {}", element_id);
            }
        }
        ElementsCommand::Stats => {
            let stats = store.stats().await?;
            println!("Elements:      {}", stats.total_elements);
            println!("Versions:      {}", stats.total_versions);
            println!("Chat messages: {}", stats.total_chat_messages);
            match stats.latest_save {
                Some(latest) => println!("Latest save:   {}", latest.to_rfc3339()),
                None => println!("Latest save:   -"),
            }
        }
    }

    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        analysis_refinery::config::LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        analysis_refinery::config::LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
