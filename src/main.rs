use std::path::PathBuf;
use std::{env, process};

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use scoremidi::musicxml::{read_document, sanitize_doctype, total_length, EventReader};
use scoremidi::{batch, ConvertOptions};

/// Convert MusicXML lead sheets to two-track MIDI files (melody and chords).
///
/// Logging is controlled with RUST_LOG; see docs for the env_logger crate.
/// If RUST_LOG is not set, the log level defaults to Info (Debug with --verbose).
#[derive(Parser)]
#[command(version, about, long_about = None, verbatim_doc_comment)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one MusicXML (.xml, .musicxml, .mxl) file to MIDI
    Convert {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        options: OptionArgs,
    },
    /// Convert every .xml/.musicxml/.mxl file of a directory and print a JSON report
    Batch {
        input_dir: PathBuf,
        output_dir: PathBuf,
        #[command(flatten)]
        options: OptionArgs,
    },
    /// Print the total length of a score in quarter notes
    Length { input: PathBuf },
}

#[derive(Args)]
struct OptionArgs {
    /// YAML file with conversion options
    #[arg(long)]
    config: Option<PathBuf>,
    /// YAML chord-quality table replacing the built-in one
    #[arg(long)]
    chord_table: Option<PathBuf>,
    /// Tempo used to convert notated time to seconds
    #[arg(long)]
    bpm: Option<f64>,
    /// Keep leading silence instead of starting at the first note
    #[arg(long)]
    keep_silence: bool,
    /// Transpose the result to C major / A minor
    #[arg(long)]
    transpose: bool,
    /// Directory for the temporary sanitized copies
    #[arg(long)]
    temp_dir: Option<PathBuf>,
    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl OptionArgs {
    fn resolve(&self) -> anyhow::Result<ConvertOptions> {
        let mut options = match &self.config {
            Some(path) => ConvertOptions::from_file(path)?,
            None => ConvertOptions::default(),
        };
        if let Some(bpm) = self.bpm {
            options.bpm = bpm;
        }
        if self.keep_silence {
            options.remove_silence = false;
        }
        if self.transpose {
            options.transpose = true;
        }
        if self.chord_table.is_some() {
            options.chord_table = self.chord_table.clone();
        }
        if self.temp_dir.is_some() {
            options.temp_dir = self.temp_dir.clone();
        }
        options.validate()?;
        Ok(options)
    }
}

fn init_logging(verbose: bool) {
    let mut log_builder = env_logger::builder();
    if env::var("RUST_LOG").is_err() {
        log_builder.filter_level(if verbose { LevelFilter::Debug } else { LevelFilter::Info });
    }
    log_builder.init();
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert { input, output, options } => {
            init_logging(options.verbose);
            let options = options.resolve()?;
            let tracks = scoremidi::convert_file(&input, &output, &options)?;
            log::info!(
                "wrote {} ({} melody notes, {} harmony notes)",
                output.display(),
                tracks.melody.len(),
                tracks.harmony.len()
            );
            Ok(())
        }
        Commands::Batch {
            input_dir,
            output_dir,
            options,
        } => {
            init_logging(options.verbose);
            let options = options.resolve()?;
            let report = batch::convert_dir(&input_dir, &output_dir, &options)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Length { input } => {
            init_logging(false);
            let xml = sanitize_doctype(&read_document(&input)?);
            println!("{}", total_length(EventReader::from_text(&xml))?);
            Ok(())
        }
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
