use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use denial_analyzer::config::Config;
use denial_analyzer::logging;
use denial_analyzer::pipeline::processing::root_cause;
use denial_analyzer::pipeline::Pipeline;
use denial_analyzer::report::{self, View};
use denial_analyzer::types::FileFormat;

#[derive(Parser)]
#[command(name = "denial_analyzer")]
#[command(about = "Medical billing denial analysis")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to a TOML config file (defaults to ./denial_analyzer.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a CSV or spreadsheet billing export
    Analyze {
        /// Billing export to analyze
        file: PathBuf,
        /// Input format; inferred from the file extension when omitted
        #[arg(long, value_enum)]
        format: Option<FileFormat>,
        /// Analysis view to print
        #[arg(long, value_enum, default_value_t = View::All)]
        view: View,
        /// Rows shown per ranked table (overrides config)
        #[arg(long)]
        top: Option<usize>,
        /// Print the full report as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the general denial-prevention recommendations
    Recommendations,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment variables
    dotenv::dotenv().ok();

    let config = Config::load(cli.config.as_deref())?;

    // Initialize logging
    logging::init_logging(&config.logging);

    match cli.command {
        Commands::Analyze {
            file,
            format,
            view,
            top,
            json,
        } => {
            info!("🔄 Analyzing {}", file.display());
            let pipeline = Pipeline::new(&config);

            let report = match pipeline.run_file(&file, format) {
                Ok(report) => report,
                Err(e) => {
                    error!("Analysis failed: {}", e);
                    eprintln!("⚠️  {}", e);
                    std::process::exit(1);
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let top_n = top.unwrap_or(config.report.top_n);
                println!("📊 Medical Billing Denial Analysis: {}", file.display());
                println!("{}", report::render(&report, view, top_n));
            }
        }
        Commands::Recommendations => {
            print!(
                "{}",
                report::render_recommendations(&root_cause::recommend_strategies())
            );
        }
    }

    Ok(())
}
