use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use tei_tokenizer::config::{find_default_config, load_config, AppConfig};
use tei_tokenizer::pipeline::{Pipeline, RunOptions};
use tei_tokenizer::progress::ConsoleProgress;
use tei_tokenizer::tokenize::Tokenizer;

const CONFIG_FILENAME: &str = "tei-tokenizer.toml";

#[derive(Parser, Debug)]
#[command(name = "tei-tokenizer")]
#[command(about = "Tokenize TEI XML editions into position-annotated reference files", long_about = None)]
struct Args {
    /// Directory with source xml files (top level only)
    source: PathBuf,

    /// Exclude all <note> tags from the source files
    #[arg(short = 'n', long)]
    no_notes: bool,

    /// Insert separator whitespace around <note> and <lb/> before tokenization
    #[arg(short = 'f', long)]
    fix_whitespace: bool,

    /// Use stemming on plaintext (not implemented)
    #[arg(short = 's', long)]
    use_stemming: bool,

    /// Write reference text files
    #[arg(short = 'r', long)]
    write_reference: bool,

    /// Write preprocessed xml into a file
    #[arg(short = 'm', long)]
    write_modified: bool,

    /// Write plaintext files
    #[arg(short = 'p', long)]
    write_plaintext: bool,

    /// Write tokenized xml files (not implemented)
    #[arg(short = 'x', long)]
    write_xml: bool,

    /// Where to write preprocessed xml files. Implies -m
    #[arg(long, value_name = "DIR")]
    mod_dir: Option<PathBuf>,

    /// Where to write reference files. Implies -r
    #[arg(long, value_name = "DIR")]
    ref_dir: Option<PathBuf>,

    /// Where to write plaintext files. Implies -p
    #[arg(long, value_name = "DIR")]
    plain_dir: Option<PathBuf>,

    /// Where to write tokenized xml files. Implies -x
    #[arg(long, value_name = "DIR")]
    xml_dir: Option<PathBuf>,

    /// Where to write stemmed plaintext files. Implies -s
    #[arg(long, value_name = "DIR")]
    stemm_dir: Option<PathBuf>,

    /// Config file path (default: search for tei-tokenizer.toml upwards)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short = 'q', long)]
    quiet: bool,
}

/// A product is on when its boolean is set or a directory override is
/// supplied; the directory resolves override > config > built-in default.
fn resolve_dir(
    enabled: bool,
    override_dir: Option<PathBuf>,
    config_dir: Option<PathBuf>,
    default: &str,
) -> Option<PathBuf> {
    if !enabled && override_dir.is_none() {
        return None;
    }
    Some(
        override_dir
            .or(config_dir)
            .unwrap_or_else(|| PathBuf::from(default)),
    )
}

fn run() -> anyhow::Result<bool> {
    let args = Args::parse();
    let progress = ConsoleProgress::new(!args.quiet);

    let cfg = match args.config.as_ref() {
        Some(p) => load_config(p)?,
        None => {
            let cwd = std::env::current_dir().context("current dir")?;
            match find_default_config(&cwd, CONFIG_FILENAME, 8) {
                Some(p) => load_config(&p)?,
                None => AppConfig::default(),
            }
        }
    };

    let mut tokenizer = Tokenizer::german();
    tokenizer.add_abbreviations(&cfg.tokenizer.abbreviations);

    let opts = RunOptions {
        source_dir: args.source,
        remove_notes: args.no_notes,
        fix_whitespace: args.fix_whitespace,
        edited_dir: resolve_dir(
            args.write_modified,
            args.mod_dir,
            cfg.output.edited_dir,
            "edited",
        ),
        plain_dir: resolve_dir(
            args.write_plaintext,
            args.plain_dir,
            cfg.output.plain_dir,
            "plaintext",
        ),
        reference_dir: resolve_dir(
            args.write_reference,
            args.ref_dir,
            cfg.output.reference_dir,
            "reference",
        ),
        xml_dir: resolve_dir(args.write_xml, args.xml_dir, cfg.output.xml_dir, "results"),
        stemmed_dir: resolve_dir(
            args.use_stemming,
            args.stemm_dir,
            cfg.output.stemmed_dir,
            "stemmed",
        ),
    };

    let pipeline = Pipeline::new(opts, tokenizer, progress);
    let summary = pipeline.run()?;
    eprintln!(
        "done: {} processed, {} failed",
        summary.processed, summary.failed
    );
    Ok(summary.failed == 0)
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
