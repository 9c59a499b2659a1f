//! hoop CLI
//!
//! Detections JSON → game analysis JSON (possession, teams, shots, passes)

#[cfg(feature = "cli")]
use anyhow::Result;
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand, ValueEnum};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "hoop")]
#[command(about = "Infer basketball game state from per-frame detections", long_about = None)]
#[command(version = hoop_core::VERSION)]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis over a detections file
    Analyze {
        /// Input detections JSON
        #[arg(long)]
        input: PathBuf,

        /// Directory of decoded frames (png/jpg) for jersey color sampling
        #[arg(long)]
        frames: Option<PathBuf>,

        /// Pipeline config (YAML or JSON); defaults to the HOOP_PROFILE preset
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output analysis JSON (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print the output JSON
        #[arg(long, default_value = "false")]
        pretty: bool,
    },

    /// Validate a config and print the effective settings as YAML
    CheckConfig {
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the JSON schema of the input or output document
    Schema {
        #[arg(value_enum, default_value = "output")]
        document: Document,
    },
}

#[cfg(feature = "cli")]
#[derive(Clone, Copy, ValueEnum)]
enum Document {
    Input,
    Output,
}

#[cfg(feature = "cli")]
fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "hoop_core=debug,hoop_cli=debug"
    } else {
        "hoop_core=info,hoop_cli=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Analyze {
            input,
            frames,
            config,
            output,
            pretty,
        } => {
            eprintln!("Analyzing {}", input.display());
            let config = hoop_cli::load_config(config.as_deref())?;
            let analysis = hoop_cli::analyze(&input, frames.as_deref(), config)?;
            hoop_cli::write_json(&analysis, output.as_deref(), pretty)?;

            for line in hoop_cli::summary_lines(&analysis) {
                eprintln!("   {line}");
            }
            if let Some(path) = output {
                eprintln!("Analysis saved to: {}", path.display());
            }
        }

        Commands::CheckConfig { config } => {
            let config = hoop_cli::load_config(config.as_deref())?;
            print!("{}", config.to_yaml()?);
        }

        Commands::Schema { document } => {
            let kind = match document {
                Document::Input => hoop_cli::SchemaKind::Input,
                Document::Output => hoop_cli::SchemaKind::Output,
            };
            println!("{}", hoop_cli::schema_json(kind)?);
        }
    }

    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("hoop CLI is not available. Enable the 'cli' feature to use it.");
    std::process::exit(1);
}
