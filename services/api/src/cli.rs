use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use geoscore::analysis::{
    format_ranked_line, run_analysis, validate_countries, Aggregator, RiskTolerance, StayDuration,
};
use geoscore::config::AppConfig;
use geoscore::error::AppError;
use geoscore::providers::HttpProviders;
use geoscore::telemetry;

use crate::server;

#[derive(Parser, Debug)]
#[command(
    name = "Geoscore",
    about = "Score and rank countries for relocation suitability from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run a one-shot analysis against the live providers and print the ranking
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct AnalyzeArgs {
    /// ISO3 country codes, comma separated (e.g. FRA,JPN,PRT)
    #[arg(long, value_delimiter = ',', required = true)]
    countries: Vec<String>,
    /// Risk tolerance: low, moderate, or high
    #[arg(long, default_value = "moderate", value_parser = parse_tolerance)]
    risk_tolerance: RiskTolerance,
    /// Stay duration: short-term or long-term
    #[arg(long, default_value = "long-term", value_parser = parse_duration)]
    duration: StayDuration,
    /// Include the weight/metric breakdown per country
    #[arg(long)]
    debug: bool,
}

fn parse_tolerance(raw: &str) -> Result<RiskTolerance, String> {
    RiskTolerance::parse(raw)
        .ok_or_else(|| format!("'{raw}' is not one of low, moderate, high"))
}

fn parse_duration(raw: &str) -> Result<StayDuration, String> {
    StayDuration::parse(raw)
        .ok_or_else(|| format!("'{raw}' is not one of short-term, long-term"))
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Analyze(args) => run_analyze(args).await,
    }
}

async fn run_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let countries = validate_countries(args.countries)?;
    let providers = Arc::new(HttpProviders::new(config.providers.clone())?);
    let aggregator = Aggregator::new(providers, &config.cache);

    let response = run_analysis(
        &aggregator,
        &countries,
        args.risk_tolerance,
        args.duration,
        args.debug,
    )
    .await;

    println!(
        "Ranking for {} ({}, {})",
        countries.join(", "),
        args.risk_tolerance,
        args.duration
    );
    for result in &response.results {
        println!("{}", format_ranked_line(result));
        if args.debug {
            if let Some(breakdown) = &result.report.debug {
                for (metric, weight) in &breakdown.weights_used {
                    println!("      {metric}: weight {weight:.4}");
                }
            }
        }
    }

    if !response.metadata.missing_metrics.is_empty() {
        println!(
            "\nMissing data: {}",
            response.metadata.missing_metrics.join(", ")
        );
    }

    Ok(())
}
