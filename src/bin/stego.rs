//! # Stego Binary Entry Point
//!
//! Command-line front end for hiding text in PNG images and reading it back.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin stego -- embed --input cover.png --output stego.png --key hunter2 --message "hi"
//! cargo run --bin stego -- extract --input stego.png --key hunter2
//! cargo run --bin stego -- capacity --input cover.png
//! cargo run --bin stego -- compare --original cover.png --stego stego.png --json metrics.json
//! cargo run --bin stego -- --config config/stego.toml batch \
//!   --input-dir ./covers --output-dir ./out --key hunter2 --message "hi" --report report.json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Builder;
use log::{info, LevelFilter};
use std::io::Write;
use std::path::PathBuf;

use png_stego::batch::{jobs_from_dir, BatchRunner};
use png_stego::common::config::StegoConfig;
use png_stego::processing::{carrier, framer, quality, Codec};

/// Command-line arguments for the stego binary
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (TOML format)
    ///
    /// Example: config/stego.toml
    #[arg(short, long)]
    config: Option<String>,

    /// Overrides the log level from the configuration file
    #[arg(long)]
    log_level: Option<LevelFilter>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Hide a message in a PNG image
    Embed {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(short, long)]
        key: String,
        /// Message text
        #[arg(short, long, conflicts_with = "message_file", required_unless_present = "message_file")]
        message: Option<String>,
        /// Read the message from a UTF-8 file instead
        #[arg(long)]
        message_file: Option<PathBuf>,
    },
    /// Recover a hidden message
    Extract {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        key: String,
    },
    /// Show how much text an image can hold
    Capacity {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Compare a cover image with its stego copy (MSE, PSNR, SSIM)
    Compare {
        #[arg(long)]
        original: PathBuf,
        #[arg(long)]
        stego: PathBuf,
        /// Write the report as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Hide the same message in every PNG of a directory
    Batch {
        #[arg(long)]
        input_dir: PathBuf,
        #[arg(long)]
        output_dir: PathBuf,
        #[arg(short, long)]
        key: String,
        #[arg(short, long)]
        message: String,
        /// Write the batch report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

/// Initialize the logging system with timestamp, level, and message formatting.
///
/// Format: `[HH:MM:SS] [LEVEL] message`
fn init_logger(level: LevelFilter) {
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(level)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => StegoConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => StegoConfig::default(),
    };

    let level = match args.log_level {
        Some(level) => level,
        None => config
            .logging
            .level
            .parse()
            .with_context(|| format!("Invalid log level '{}'", config.logging.level))?,
    };
    init_logger(level);

    let codec = Codec::new(config.codec.options());

    match args.command {
        Command::Embed {
            input,
            output,
            key,
            message,
            message_file,
        } => {
            let message = match (message, message_file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read message from {}", path.display()))?,
                (None, None) => unreachable!("clap requires --message or --message-file"),
            };

            let cover = carrier::load_png_file(&input)
                .with_context(|| format!("Failed to load carrier {}", input.display()))?;
            let stego = codec.embed(&cover, &key, &message)?;
            carrier::save_png_file(&stego, &output)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            info!("🔒 Hidden {} bytes in {}", message.len(), output.display());
        }
        Command::Extract { input, key } => {
            let stego = carrier::load_png_file(&input)
                .with_context(|| format!("Failed to load {}", input.display()))?;
            let message = codec.extract(&stego, &key)?;
            println!("{}", message);
        }
        Command::Capacity { input } => {
            let image = carrier::load_png_file(&input)
                .with_context(|| format!("Failed to load {}", input.display()))?;
            let bits = codec.capacity(&image)?;
            println!("positions:         {}", bits);
            println!("max message bytes: {}", framer::max_message_len(bits));
        }
        Command::Compare {
            original,
            stego,
            json,
        } => {
            let original = carrier::load_png_file(&original)
                .with_context(|| format!("Failed to load {}", original.display()))?;
            let stego = carrier::load_png_file(&stego)
                .with_context(|| format!("Failed to load {}", stego.display()))?;
            let report = quality::evaluate(&original, &stego)?;

            println!("MSE:  {:.6}", report.mse);
            match report.psnr_db {
                Some(psnr) => println!("PSNR: {:.2} dB", psnr),
                None => println!("PSNR: inf (images are identical)"),
            }
            println!("SSIM: {:.6}", report.ssim);

            if let Some(path) = json {
                report.export_to_json(&path)?;
                println!("Metrics exported to: {}", path.display());
            }
        }
        Command::Batch {
            input_dir,
            output_dir,
            key,
            message,
            report,
        } => {
            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("Failed to create {}", output_dir.display()))?;
            let jobs = jobs_from_dir(&input_dir, &output_dir)?;

            let runner = BatchRunner::new(codec, &config.batch);
            let batch_report = runner.run(jobs, &key, &message).await?;

            let stats = batch_report.aggregate();
            println!(
                "{} succeeded, {} failed",
                stats.successful_jobs, stats.failed_jobs
            );

            if let Some(path) = report {
                batch_report.export_to_json(&path)?;
                println!("Report exported to: {}", path.display());
            }
        }
    }

    Ok(())
}
