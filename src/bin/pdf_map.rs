//! Generate a field map, plus an example script, config and filled form,
//! from a PDF form.
//!
//! Usage:
//!   pdf-map f1040.pdf
//!   pdf-map f1040.pdf -o maps/ -n f1040 --no-example

use clap::Parser;
use pdf_formfill::{generate_map, FormDocument, MapOptions, PdfFormDocument};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "pdf-map", version, about = "Map the fields of a PDF form.")]
struct Args {
    /// The PDF file containing a form.
    source: PathBuf,

    /// Directory to write the map and examples to.
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Name prefix for the written files (default: source file stem).
    #[arg(short, long)]
    name: Option<String>,

    /// Only write the map.
    #[arg(long)]
    no_example: bool,

    /// Log progress.
    #[arg(short, long)]
    verbose: bool,
}

fn run(args: &Args) -> pdf_formfill::Result<()> {
    let mut options = MapOptions::new()
        .with_dir(&args.output)
        .with_example(!args.no_example);
    if let Some(name) = &args.name {
        options = options.with_name(name.as_str());
    }

    let mut doc = PdfFormDocument::open(&args.source)?;
    let artifacts = generate_map(&mut doc, &args.source, &options)?;
    println!("{} fields", artifacts.fields);
    for path in artifacts.paths() {
        println!("{}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        },
    }
}
