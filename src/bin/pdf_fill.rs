//! Fill a PDF form.
//!
//! Usage:
//!   pdf-fill f1040.pdf -f config.yaml -m f1040-map.yaml -s f1040.yaml -o out/f1040.pdf
//!   pdf-fill f1040.pdf -f config.yaml -m f1040-map.yaml -s f1040.yaml --pages 0..2 --flatten

use clap::Parser;
use pdf_formfill::{Form, FormOptions, PdfFormDocument, SaveOptions};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "pdf-fill", version, about = "Fill a PDF form.")]
struct Args {
    /// The PDF file to fill.
    source: PathBuf,

    /// The config file.
    #[arg(short = 'f', long)]
    config: PathBuf,

    /// The map file.
    #[arg(short, long)]
    map: PathBuf,

    /// The form filler script.
    #[arg(short, long)]
    script: PathBuf,

    /// The output file.
    #[arg(short, long, default_value = "output.pdf")]
    output: PathBuf,

    /// Flatten form fields into page content.
    #[arg(long)]
    flatten: bool,

    /// Keep only pages BEGIN..END (zero-based, end exclusive).
    #[arg(long, value_name = "BEGIN..END", value_parser = parse_pages)]
    pages: Option<(i64, i64)>,

    /// Locale for number formatting.
    #[arg(long, default_value = pdf_formfill::helpers::DEFAULT_LOCALE)]
    locale: String,

    /// Log each filled field.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_pages(text: &str) -> Result<(i64, i64), String> {
    let (begin, end) = text
        .split_once("..")
        .ok_or_else(|| format!("expected BEGIN..END, got '{}'", text))?;
    let begin = begin.trim().parse().map_err(|e| format!("begin: {}", e))?;
    let end = end.trim().parse().map_err(|e| format!("end: {}", e))?;
    Ok((begin, end))
}

fn run(args: &Args) -> pdf_formfill::Result<()> {
    let options = FormOptions::new().with_locale(args.locale.as_str());
    let mut form = Form::with_options(args.config.as_path(), options)?;
    form.load(&args.source, args.map.as_path())?;
    form.fill(args.script.as_path())?;

    let mut save = SaveOptions::new().with_flatten(args.flatten);
    if let Some((begin, end)) = args.pages {
        save = save.with_pages(begin, end);
    }
    form.save::<PdfFormDocument>(&args.output, &save)?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&args) {
        Ok(()) => {
            println!("Done");
            ExitCode::SUCCESS
        },
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        },
    }
}
