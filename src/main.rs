// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use transcript_generator::{run, GenerationConfig, MissingVariablePolicy, OutputType};

/// Merge personnel data with accolade writeups into per-person transcripts
#[derive(Parser)]
#[command(name = "transcript-generator")]
#[command(about = "Generate accolade transcripts as CSV or per-person DOCX", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Without a subcommand the interactive form opens
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate inputs and write transcripts
    Generate(GenerateArgs),

    /// Open the interactive form
    Ui,
}

#[derive(Args)]
struct GenerateArgs {
    /// JSON run configuration; flags below override its fields
    #[arg(short, long, env = "TRANSCRIPT_CONFIG")]
    config: Option<PathBuf>,

    /// Data CSV (name, accolade_*, variables)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Writeups CSV (accolade, writeup)
    #[arg(short, long)]
    writeups: Option<PathBuf>,

    /// Output type: csv or docx
    #[arg(short = 't', long = "output-type")]
    output_type: Option<OutputType>,

    /// Output directory
    #[arg(short, long = "output-dir")]
    output_dir: Option<PathBuf>,

    /// DOCX template (required for docx output)
    #[arg(long)]
    template: Option<PathBuf>,

    /// Undefined ${var} in a writeup: fail or literal
    #[arg(long = "on-missing")]
    on_missing: Option<MissingVariablePolicy>,

    /// Text placed between writeups
    #[arg(long)]
    separator: Option<String>,

    /// Suffix for output file names (default: current timestamp)
    #[arg(long)]
    stamp: Option<String>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

impl GenerateArgs {
    /// Config file first, then flags on top
    fn into_config(self) -> Result<GenerationConfig> {
        let mut config = match (&self.config, &self.data, &self.writeups) {
            (Some(path), _, _) => GenerationConfig::from_file(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?,
            (None, Some(data), Some(writeups)) => GenerationConfig::new(data, writeups),
            _ => bail!("--data and --writeups are required unless --config is given"),
        };

        if let Some(data) = self.data {
            config.data_path = data;
        }
        if let Some(writeups) = self.writeups {
            config.writeups_path = writeups;
        }
        if let Some(template) = self.template {
            config.template_path = Some(template);
            if self.output_type.is_none() {
                config.output_type = OutputType::Docx;
            }
        }
        if let Some(output_type) = self.output_type {
            config.output_type = output_type;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = Some(dir);
        }
        if let Some(policy) = self.on_missing {
            config.missing_variable = policy;
        }
        if let Some(separator) = self.separator {
            config.separator = separator;
        }
        if let Some(stamp) = self.stamp {
            config.file_stamp = Some(stamp);
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Generate(args)) => {
            init_logging(cli.verbose);
            run_generate(args)
        }
        Some(Commands::Ui) | None => run_ui_mode(),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    let json = args.json;
    let config = args.into_config()?;

    let summary = run(&config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for warning in &summary.warnings {
            println!("⚠️  {}", warning);
        }
        println!("✓ {}", summary.summary());
        for file in &summary.files {
            println!("  {}", file.display());
        }
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode() -> Result<()> {
    let mut app = ui::App::new(std::env::current_dir()?);
    ui::run_ui(&mut app)?;
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode() -> Result<()> {
    eprintln!("❌ Interactive mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or run: transcript-generator generate --data <csv> --writeups <csv>");
    std::process::exit(1);
}
