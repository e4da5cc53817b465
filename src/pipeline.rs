use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};

use crate::error::PipelineError;
use crate::output::{write_edited, write_plain_text, write_reference};
use crate::progress::ConsoleProgress;
use crate::tei::edit::{fix_whitespace, remove_notes};
use crate::tei::extract::extract_paragraphs;
use crate::tei::xml::load_file;
use crate::tokenize::Tokenizer;

/// Which products to emit and where. A product is enabled iff its
/// directory is set; resolving booleans and overrides to directories is
/// the CLI's job.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub source_dir: PathBuf,
    pub remove_notes: bool,
    pub fix_whitespace: bool,
    pub edited_dir: Option<PathBuf>,
    pub plain_dir: Option<PathBuf>,
    pub reference_dir: Option<PathBuf>,
    pub xml_dir: Option<PathBuf>,
    pub stemmed_dir: Option<PathBuf>,
}

impl RunOptions {
    fn wants_tokens(&self) -> bool {
        self.reference_dir.is_some() || self.xml_dir.is_some()
    }

    fn output_dirs(&self) -> impl Iterator<Item = &PathBuf> {
        [
            self.edited_dir.as_ref(),
            self.plain_dir.as_ref(),
            self.reference_dir.as_ref(),
            self.xml_dir.as_ref(),
            self.stemmed_dir.as_ref(),
        ]
        .into_iter()
        .flatten()
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub processed: usize,
    pub failed: usize,
}

pub struct Pipeline {
    opts: RunOptions,
    tokenizer: Tokenizer,
    progress: ConsoleProgress,
}

impl Pipeline {
    pub fn new(opts: RunOptions, tokenizer: Tokenizer, progress: ConsoleProgress) -> Self {
        Self {
            opts,
            tokenizer,
            progress,
        }
    }

    /// Process every top-level file in the source directory. A failing
    /// document is reported and skipped; the run continues.
    pub fn run(&self) -> anyhow::Result<RunSummary> {
        for dir in self.opts.output_dirs() {
            fs::create_dir_all(dir)
                .with_context(|| format!("create output dir: {}", dir.display()))?;
        }

        let files = list_source_files(&self.opts.source_dir)?;
        let mut summary = RunSummary::default();
        for (i, path) in files.iter().enumerate() {
            self.progress.progress("processing", i + 1, files.len());
            match self.process_file(path) {
                Ok(()) => summary.processed += 1,
                Err(err) => {
                    summary.failed += 1;
                    self.progress
                        .warn(format!("{}: {:#}", path.display(), err));
                }
            }
        }
        Ok(summary)
    }

    /// One document through the stage machine: load, mutate, emit. Any
    /// stage failure aborts the remaining stages for this document.
    fn process_file(&self, path: &Path) -> anyhow::Result<()> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("non-utf8 file name: {}", path.display()))?;

        let mut doc = load_file(path)?;

        if self.opts.remove_notes {
            remove_notes(&mut doc).context("remove notes")?;
        }
        if self.opts.fix_whitespace {
            fix_whitespace(&mut doc).context("fix whitespace")?;
        }

        if let Some(dir) = self.opts.edited_dir.as_ref() {
            write_edited(&doc, &dir.join(file_name)).context("write edited xml")?;
        }

        let paragraphs = if self.opts.wants_tokens() {
            Some(extract_paragraphs(&doc, &self.tokenizer).context("extract paragraphs")?)
        } else {
            None
        };

        if let Some(dir) = self.opts.plain_dir.as_ref() {
            write_plain_text(&doc, &dir.join(format!("{file_name}.txt")))
                .context("write plaintext")?;
        }

        if self.opts.stemmed_dir.is_some() {
            return Err(PipelineError::Unimplemented("stemmed plaintext output").into());
        }

        if let (Some(dir), Some(ps)) = (self.opts.reference_dir.as_ref(), paragraphs.as_ref()) {
            write_reference(ps, &dir.join(format!("{file_name}.txt")))
                .context("write reference")?;
        }

        if self.opts.xml_dir.is_some() {
            return Err(PipelineError::Unimplemented("tokenized xml output").into());
        }

        Ok(())
    }
}

/// Top-level files only, name order. Subdirectories are not descended.
fn list_source_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("read source dir: {}", dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    Ok(files)
}
