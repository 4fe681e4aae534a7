//! CLI tool to decode a fixed-length data file with a layout (.fixed) file.

use clap::Parser;
use fixedlength_rs::{RecordReader, parse_layout};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Dump the records of a fixed-length file, one line per record.
///
/// Each line reads `line N [record] name=value ...`; the record name is
/// shown for multi-layout files only.
#[derive(Parser)]
#[command(name = "fixed-dump")]
struct Cli {
    /// Layout definition file (.fixed)
    layout: String,

    /// Input data file (fixed-length records, or /dev/stdin)
    input: String,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Show paths and record counts on stderr, debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn open_output(path: Option<&str>) -> io::Result<Box<dyn Write>> {
    match path {
        Some(out_path) => {
            if let Some(parent) = Path::new(out_path).parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)?;
            }
            Ok(Box::new(BufWriter::new(File::create(out_path)?)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let layout_text = match fs::read_to_string(&cli.layout) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading layout file '{}': {e}", cli.layout);
            process::exit(1);
        }
    };

    let config = match parse_layout(&layout_text) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Error in layout file '{}': {e}", cli.layout);
            process::exit(1);
        }
    };

    let input = match File::open(&cli.input) {
        Ok(file) => BufReader::new(file),
        Err(e) => {
            eprintln!("Error reading input file '{}': {e}", cli.input);
            process::exit(1);
        }
    };

    if cli.verbose {
        eprintln!("Layout:  {}", cli.layout);
        eprintln!("Input:   {}", cli.input);
        eprintln!("Output:  {}", cli.output.as_deref().unwrap_or("(stdout)"));
        eprintln!("Length:  {} bytes, {}", config.length(), config.charset());
    }

    let mut out = match open_output(cli.output.as_deref()) {
        Ok(out) => out,
        Err(e) => {
            eprintln!("Error opening output: {e}");
            process::exit(1);
        }
    };

    let mut reader = RecordReader::new(input, config);
    let mut count = 0u64;
    loop {
        match reader.read_record() {
            Ok(Some(record)) => {
                count += 1;
                if let Err(e) = writeln!(out, "{record}") {
                    eprintln!("Error writing output: {e}");
                    process::exit(1);
                }
            }
            Ok(None) => break,
            Err(e) => {
                let _ = out.flush();
                eprintln!("Error decoding '{}': {e}", cli.input);
                process::exit(1);
            }
        }
    }

    if let Err(e) = out.flush() {
        eprintln!("Error writing output: {e}");
        process::exit(1);
    }
    if cli.verbose {
        eprintln!("Records: {count}");
    }
}
