use clap::Parser;
use colored::Colorize;
use haltoscopus::config::Config;
use haltoscopus::sources::{hal::HalClient, scopus::ScopusClient};
use haltoscopus::Consolidator;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "haltoscopus")]
#[command(version = "0.1.0")]
#[command(about = "Consolidate a Scopus extraction with publications found in HAL", long_about = None)]
struct Args {
    /// Institute whose publications are being consolidated
    institute: String,

    /// 4-digit corpus year
    corpus_year: String,

    /// Working folder holding the per-year subfolders (overrides the
    /// institute mapping from the config file)
    #[arg(long)]
    working_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Scopus API key (defaults to the SCOPUS_API_KEY environment variable)
    #[arg(long)]
    api_key: Option<String>,

    /// Per-request timeout for the Scopus lookup, in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("haltoscopus=debug")
            .init();
    }

    let mut config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "{} Failed to load config {}: {}",
                    "Error:".red().bold(),
                    path.display(),
                    e
                );
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };
    if let Some(timeout) = args.timeout {
        config.lookup_timeout_secs = Some(timeout);
    }

    let working_dir = match args
        .working_dir
        .clone()
        .or_else(|| config.working_folder(&args.institute).cloned())
    {
        Some(dir) => dir,
        None => {
            eprintln!(
                "{} No working folder known for institute '{}'; pass --working-dir or add it to the config file",
                "Error:".red().bold(),
                args.institute
            );
            return ExitCode::FAILURE;
        }
    };

    // The pipeline does not create a baseline from nothing; check before
    // invoking it
    let baseline = haltoscopus::baseline_path(&config, &working_dir, &args.corpus_year);
    if !baseline.exists() {
        eprintln!(
            "{} Scopus baseline not found: {}",
            "Error:".red().bold(),
            baseline.display()
        );
        return ExitCode::FAILURE;
    }

    let api_key = match args
        .api_key
        .clone()
        .or_else(|| std::env::var("SCOPUS_API_KEY").ok())
    {
        Some(key) => key,
        None => {
            eprintln!(
                "{} No Scopus API key; pass --api-key or set SCOPUS_API_KEY",
                "Error:".red().bold()
            );
            return ExitCode::FAILURE;
        }
    };

    println!(
        "Consolidating Scopus extraction for {} / {}...",
        args.institute.cyan(),
        args.corpus_year.cyan()
    );

    let consolidator = Consolidator::new(
        Box::new(HalClient::new()),
        Box::new(ScopusClient::new(api_key)),
        config,
    );

    let outcome = match consolidator
        .consolidate_scopus(&args.institute, &working_dir, &args.corpus_year, args.verbose)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    println!();
    println!("{}", outcome.message);
    println!();

    if !outcome.authenticated {
        eprintln!(
            "{}",
            "Scopus rejected the credentials; rerun once they are fixed. \
             The HAL extraction and missing-DOI list were kept."
                .red()
        );
        return ExitCode::FAILURE;
    }

    if outcome.updated {
        println!("{}", "Scopus extraction updated.".green());
    } else {
        println!("{}", "Scopus extraction already complete.".green());
    }
    ExitCode::SUCCESS
}
