//! Offline demand forecasting pipeline.
//!
//! # Convert the M5 wide sales table to the long layout
//! demand-pipeline melt --input data/m5/sales_train_validation.csv
//!
//! # Build the processed training table from data/raw
//! demand-pipeline preprocess
//!
//! # Fit and evaluate the model
//! demand-pipeline train
//!
//! # Forecast every series and write reports/forecast.csv
//! demand-pipeline predict --horizon 28

use clap::{Parser, Subcommand};
use demand_forecast::melt::{m5_start_date, melt_file};
use demand_forecast::{
    preprocess, read_observations, train, write_forecasts, FitOptions, ForecastOrchestrator,
    LinearDemandModel, PipelineConfig,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "demand-pipeline")]
#[command(about = "Recursive multi-step demand forecasting pipeline")]
#[command(version)]
struct Cli {
    /// JSON pipeline configuration; defaults apply to absent fields
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a wide d_1..d_N sales table into the long demand table
    Melt {
        /// Wide sales CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Long table output (default: config long_path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Aggregate, gap-fill and featurize raw demand
    Preprocess {
        /// Directory holding the raw CSV
        #[arg(long)]
        raw_dir: Option<PathBuf>,

        /// Processed table output
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fit the model on the processed table and report holdout MAE
    Train {
        /// Days held out at the end of the table
        #[arg(long)]
        test_days: Option<u32>,

        /// Ridge penalty of the linear fit
        #[arg(long, default_value_t = 1.0)]
        ridge: f64,
    },

    /// Forecast every series and write the forecast artifact
    Predict {
        /// Days to forecast past the last observation
        #[arg(long, allow_negative_numbers = true)]
        horizon: Option<i64>,

        /// Forecast artifact output
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Forecast series one at a time
        #[arg(long)]
        sequential: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Commands::Melt { input, output } => {
            let output = output.unwrap_or(config.long_path);
            let rows = melt_file(&input, &output, m5_start_date())?;
            println!("Saved: {} ({} rows)", output.display(), rows);
        }
        Commands::Preprocess { raw_dir, output } => {
            let raw_dir = raw_dir.unwrap_or(config.raw_dir);
            let output = output.unwrap_or(config.processed_path);
            let summary = preprocess(&raw_dir, &output, &config.schema)?;
            println!(
                "Saved: {} ({} rows, {} series)",
                output.display(),
                summary.processed_rows,
                summary.series
            );
        }
        Commands::Train { test_days, ridge } => {
            let test_days = test_days.unwrap_or(config.test_days);
            let summary = train(
                &config.processed_path,
                &config.model_path,
                &config.schema,
                test_days,
                FitOptions { ridge_lambda: ridge },
            )?;
            match summary.mae {
                Some(mae) => println!("MAE: {:.4}", mae),
                None => println!("MAE: n/a (empty holdout)"),
            }
            println!("Saved: {}", config.model_path.display());
        }
        Commands::Predict {
            horizon,
            output,
            sequential,
        } => {
            if let Some(horizon) = horizon {
                config.horizon = horizon;
            }
            let forecast_config = config.forecast_config()?;
            let output = output.unwrap_or(config.forecast_path);

            if !config.processed_path.exists() {
                return Err("Run preprocess first: demand-pipeline preprocess".into());
            }
            if !config.model_path.exists() {
                return Err("Train model first: demand-pipeline train".into());
            }

            let model = LinearDemandModel::load(&config.model_path)?;
            model.check_schema(&forecast_config.schema)?;
            let observations = read_observations(&config.processed_path)?;

            let batch = ForecastOrchestrator::new(&model, forecast_config)
                .with_parallelism(!sequential)
                .run(&observations)?;
            write_forecasts(&output, &batch.rows)?;

            for failure in &batch.failures {
                eprintln!("Skipped {}: {}", failure.key, failure.error);
            }
            println!(
                "Saved: {} ({} rows, {}/{} series)",
                output.display(),
                batch.rows.len(),
                batch.series_count - batch.failures.len(),
                batch.series_count
            );
        }
    }

    Ok(())
}
