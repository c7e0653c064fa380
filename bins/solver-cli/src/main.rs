mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "solver-cli")]
#[command(about = "Code-Solver Agent CLI - generate, score, and inspect solution runs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a solution for a problem and score it against test cases
    Solve {
        /// The coding problem description
        #[arg(short, long)]
        problem: String,

        /// Test cases as a JSON array: [[[args...], expected], ...]
        #[arg(short, long)]
        test_cases: String,

        /// Enable the self-reflection retry loop
        #[arg(long, default_value = "false")]
        reflection: bool,

        /// Max retries for reflection
        #[arg(long, default_value = "1")]
        retries: u32,

        /// Per-case execution timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// List stored runs, most recent first
    Runs {
        /// Maximum number of runs to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Print one stored run record
    Show {
        /// Run identifier
        run_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            problem,
            test_cases,
            reflection,
            retries,
            timeout_secs,
        } => {
            commands::solve(&problem, &test_cases, reflection, retries, timeout_secs).await?;
        }
        Commands::Runs { limit } => {
            commands::runs(limit)?;
        }
        Commands::Show { run_id } => {
            commands::show(&run_id)?;
        }
    }

    Ok(())
}
