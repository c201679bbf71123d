mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "arbiter-cli")]
#[command(about = "Arbiter CLI - Run and grade programs against a Judge0 server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered languages
    Languages {
        /// Report registered languages the judge does not offer
        #[arg(long, default_value = "false")]
        verify: bool,
    },

    /// Run a program once and print what it produced
    Run {
        /// Language name, alias or numeric judge id
        #[arg(short, long)]
        language: String,

        /// Source file
        #[arg(short, long)]
        file: PathBuf,

        /// File fed to the program on stdin
        #[arg(long)]
        stdin_file: Option<PathBuf>,
    },

    /// Run a program against one expected output
    Test {
        #[arg(short, long)]
        language: String,

        #[arg(short, long)]
        file: PathBuf,

        #[arg(long)]
        stdin_file: Option<PathBuf>,

        /// File holding the expected stdout
        #[arg(short, long)]
        expected_file: PathBuf,
    },

    /// Grade a program against a JSON test suite
    Evaluate {
        #[arg(short, long)]
        language: String,

        #[arg(short, long)]
        file: PathBuf,

        /// JSON array of test cases
        #[arg(short, long)]
        tests: PathBuf,

        /// Keep running tests after a compilation error
        #[arg(long, default_value = "false")]
        keep_going: bool,

        /// Use the weighted legacy scoring
        #[arg(long, default_value = "false")]
        legacy: bool,

        /// In legacy mode, also pass tests whose stdout matches
        #[arg(long, default_value = "false")]
        trust_output: bool,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Languages { verify } => {
            commands::list_languages(verify).await?;
        }
        Commands::Run {
            language,
            file,
            stdin_file,
        } => {
            commands::run(&language, &file, stdin_file.as_deref()).await?;
        }
        Commands::Test {
            language,
            file,
            stdin_file,
            expected_file,
        } => {
            commands::test(&language, &file, stdin_file.as_deref(), &expected_file).await?;
        }
        Commands::Evaluate {
            language,
            file,
            tests,
            keep_going,
            legacy,
            trust_output,
        } => {
            commands::evaluate(&language, &file, &tests, !keep_going, legacy, trust_output).await?;
        }
    }

    Ok(())
}
