use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use airlens::airtable::SchemaFetcher;
use airlens::config::Settings;
use airlens::schema::normalize;
use airlens::service::AnalysisService;

#[derive(Parser)]
#[command(name = "airlens")]
#[command(about = "Analyze an Airtable base schema and generate a recreation guide")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a base schema and write a markdown guide
    Analyze {
        /// Base id (overrides config and AIRTABLE_BASE_ID)
        #[arg(long)]
        base: Option<String>,

        /// Output directory for the report
        #[arg(long)]
        output: Option<PathBuf>,

        /// Path to a config file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the table creation order for a base
    Order {
        /// Base id (overrides config and AIRTABLE_BASE_ID)
        #[arg(long)]
        base: Option<String>,

        /// Path to a config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Analyze {
            base,
            output,
            config,
        } => {
            let mut settings = load_settings(config)?;
            if let Some(dir) = output {
                settings.report.output_dir = dir;
            }

            let service = AnalysisService::new(settings);
            let outcome = service.analyze(base.as_deref()).await?;

            println!("Report written to {}", outcome.report_path.display());
            Ok(())
        }
        Command::Order { base, config } => {
            let settings = load_settings(config)?;
            let token = settings.airtable.resolved_access_token()?;
            let base_id = settings.airtable.resolved_base_id(base.as_deref())?;

            let fetcher = SchemaFetcher::from_settings(&settings.airtable, &token)?;
            let raw = fetcher.fetch_base_schema(&base_id).await?;
            let schema = normalize(&raw)?;

            for (i, id) in schema.creation_order.iter().enumerate() {
                let name = schema.table(id).map(|t| t.name.as_str()).unwrap_or(id);
                if schema.circular_tables.contains(id) {
                    println!("{}. {} (circular)", i + 1, name);
                } else {
                    println!("{}. {}", i + 1, name);
                }
            }
            Ok(())
        }
    }
}

fn load_settings(config: Option<PathBuf>) -> Result<Settings, Box<dyn std::error::Error>> {
    let settings = match config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load()?,
    };
    Ok(settings)
}
