//! docqa CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use docqa::{
    commands::{
        cmd_ask, cmd_evaluate, cmd_generate_questions, cmd_ingest, cmd_init, cmd_search,
        cmd_status, print_answer, print_evaluation_summary, print_ingest_outcome,
        print_question_stats, print_search_results, print_status, AskOptions, EvaluateOptions,
        QuestionOptions,
    },
    config::Config,
    error::{Error, Result},
    pipeline::Pipeline,
    progress::LogWriterFactory,
    server::run_server,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docqa")]
#[command(version, about = "Grounded question answering over your documents", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and create the data directory
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Rebuild the index from the documents in the data directory
    Ingest,

    /// Show the fragments nearest to a query
    Search {
        /// The search query
        query: String,

        /// Number of fragments to retrieve
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Answer a question from the indexed documents
    Ask {
        /// The question
        question: String,

        /// Number of fragments to retrieve
        #[arg(short, long)]
        k: Option<usize>,

        /// Include retrieved fragments in the output
        #[arg(long)]
        debug: bool,
    },

    /// Start the HTTP server
    Serve {
        /// Address to bind (overrides [server].bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Generate evaluation questions from the index
    Questions {
        /// Seed for fragment sampling
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Output file (overrides [questions].output)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run generated questions through the pipeline and write a report
    Evaluate {
        /// Questions file (defaults to [questions].output)
        #[arg(long)]
        questions: Option<PathBuf>,

        /// Directory for results and report
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Show system status
    Status,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory::default()))
        .with(filter)
        .init();

    match cli.command {
        Commands::Init { force } => return handle_init(cli.config, force, cli.json),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "docqa", &mut std::io::stdout());
            return Ok(());
        }
        _ => {}
    }

    let mut config = load_config(cli.config.as_deref())?;

    if let Commands::Status = cli.command {
        let status = cmd_status(&config)?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&status)?);
        } else {
            print_status(&status);
        }
        return Ok(());
    }

    if let Commands::Serve { bind: Some(bind) } = &cli.command {
        config.server.bind = bind.clone();
    }

    let pipeline = Pipeline::from_config(config)?;

    match cli.command {
        Commands::Ingest => {
            let outcome = cmd_ingest(&pipeline).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_ingest_outcome(&outcome);
            }
            if !outcome.is_success() {
                std::process::exit(1);
            }
        }

        Commands::Search { query, k } => {
            let result = cmd_search(&pipeline, &query, k).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_search_results(&result);
            }
        }

        Commands::Ask { question, k, debug } => {
            let response = cmd_ask(&pipeline, &question, AskOptions { k, debug }).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_answer(&response);
            }
        }

        Commands::Serve { .. } => {
            if pipeline.config.llm_api_key().is_none() {
                warn!(
                    "{} is not set; language model requests may be rejected",
                    pipeline.config.llm.api_key_env
                );
            }
            // Load the persisted index up front so the first request is fast
            if let Err(e) = pipeline.retriever.resident().await {
                warn!("Could not load index at startup: {}", e);
            }
            run_server(Arc::new(pipeline)).await?;
        }

        Commands::Questions { seed, output } => {
            let mut options = QuestionOptions::from_pipeline(&pipeline);
            options.seed = seed;
            if let Some(output) = output {
                options.output = output;
            }
            let stats = cmd_generate_questions(&pipeline, options).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_question_stats(&stats);
            }
        }

        Commands::Evaluate {
            questions,
            output_dir,
        } => {
            let mut options = EvaluateOptions::from_pipeline(&pipeline);
            if let Some(questions) = questions {
                options.questions = questions;
            }
            if let Some(output_dir) = output_dir {
                options.output_dir = output_dir;
            }
            let summary = cmd_evaluate(&pipeline, options).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_evaluation_summary(&summary);
            }
        }

        Commands::Init { .. } | Commands::Completions { .. } | Commands::Status => unreachable!(),
    }

    Ok(())
}

fn handle_init(config: Option<PathBuf>, force: bool, json: bool) -> Result<()> {
    // A .toml path names the config file itself; anything else is the base dir
    let base_dir = match config {
        Some(path) if path.extension().is_some_and(|e| e == "toml") => path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(Config::default_base_dir),
        Some(path) => path,
        None => Config::default_base_dir(),
    };

    let config = match cmd_init(Some(base_dir), force) {
        Ok(config) => config,
        Err(Error::AlreadyInitialized(path)) => {
            eprintln!(
                "Config file already exists at: {}\nUse --force to overwrite.",
                path
            );
            std::process::exit(1);
        }
        Err(e) => return Err(e),
    };

    if json {
        println!(
            "{}",
            serde_json::json!({
                "status": "ok",
                "config": config.paths.config_file,
                "data_dir": config.data_dir(),
            })
        );
        return Ok(());
    }

    println!("✓ docqa initialized successfully");
    println!("  Config: {}", config.paths.config_file.display());
    println!("  Documents: {}", config.data_dir().display());
    println!("\nNext steps:");
    println!("  1. Copy PDF or text documents into the documents directory");
    println!("  2. Export {} with your API key", config.llm.api_key_env);
    println!("  3. Build the index: docqa ingest");
    println!("  4. Ask: docqa ask \"your question\"");

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::load_from(None),
    }
}
