//! quizmark CLI: author, score, submit and report on tests.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "quizmark", version, about = "Quiz and survey scoring engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create starter config and example test
    Init,

    /// Check test definitions for authoring errors
    Validate {
        /// Path to a test .toml file or directory
        #[arg(long)]
        test: PathBuf,
    },

    /// Score an answer sheet without saving it
    Score {
        /// Test definition (.toml)
        #[arg(long)]
        test: PathBuf,

        /// Answer sheet (.json or .toml)
        #[arg(long)]
        answers: PathBuf,

        /// Scoring mode: weighted, uniform, both
        #[arg(long, default_value = "both")]
        mode: String,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Score an answer sheet and save the completed result
    Submit {
        /// Test definition (.toml)
        #[arg(long)]
        test: PathBuf,

        /// Answer sheet (.json or .toml)
        #[arg(long)]
        answers: PathBuf,

        /// Store name from the config (default: default_store)
        #[arg(long)]
        store: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Grade a directory of answer sheets and save every result
    Grade {
        /// Test definition (.toml)
        #[arg(long)]
        test: PathBuf,

        /// Directory of answer sheets
        #[arg(long)]
        answers_dir: PathBuf,

        /// Max concurrent saves (default: from config)
        #[arg(long)]
        parallelism: Option<usize>,

        /// Store name from the config (default: default_store)
        #[arg(long)]
        store: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Build an aggregate report over stored results (admin only)
    Report {
        /// Test definition (.toml)
        #[arg(long)]
        test: PathBuf,

        /// Directory of stored results
        #[arg(long)]
        results: PathBuf,

        /// Student roster (.toml or .json) for per-group statistics
        #[arg(long)]
        roster: Option<PathBuf>,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,

        /// Also save the report as JSON to this path
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Compare two saved reports for per-question drift
    Compare {
        /// Baseline report JSON
        #[arg(long)]
        baseline: PathBuf,

        /// Current report JSON
        #[arg(long)]
        current: PathBuf,

        /// Correct-rate change that counts as drift
        #[arg(long, default_value = "0.05")]
        threshold: f64,

        /// Exit code 1 if any question declined
        #[arg(long)]
        fail_on_decline: bool,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("quizmark=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { test } => commands::validate::execute(test),
        Commands::Score {
            test,
            answers,
            mode,
            format,
        } => commands::score::execute(test, answers, mode, format),
        Commands::Submit {
            test,
            answers,
            store,
            config,
        } => commands::submit::execute(test, answers, store, config).await,
        Commands::Grade {
            test,
            answers_dir,
            parallelism,
            store,
            config,
        } => commands::grade::execute(test, answers_dir, parallelism, store, config).await,
        Commands::Report {
            test,
            results,
            roster,
            format,
            output,
            config,
        } => commands::report::execute(test, results, roster, format, output, config).await,
        Commands::Compare {
            baseline,
            current,
            threshold,
            fail_on_decline,
            format,
        } => commands::compare::execute(baseline, current, threshold, fail_on_decline, format),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
