use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Optional TOML config. Everything defaults; CLI flags win over config
/// values, config values win over the built-in directory names.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub tokenizer: TokenizerSection,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct OutputSection {
    /// Where to write edited (note-stripped / whitespace-fixed) XML.
    #[serde(default)]
    pub edited_dir: Option<PathBuf>,
    /// Where to write flattened plaintext files.
    #[serde(default)]
    pub plain_dir: Option<PathBuf>,
    /// Where to write token reference files.
    #[serde(default)]
    pub reference_dir: Option<PathBuf>,
    /// Where to write tokenized xml files (product not implemented).
    #[serde(default)]
    pub xml_dir: Option<PathBuf>,
    /// Where to write stemmed plaintext files (product not implemented).
    #[serde(default)]
    pub stemmed_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct TokenizerSection {
    /// Extra sentence-splitter abbreviations, e.g. ["Kgl.", "Ew."].
    #[serde(default)]
    pub abbreviations: Vec<String>,
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read config: {}", path.display()))?;
    let cfg: AppConfig = toml::from_str(&text).context("parse config toml")?;
    Ok(cfg)
}

/// Search for the default config filename upwards from `start`.
pub fn find_default_config(start: &Path, filename: &str, max_depth: usize) -> Option<PathBuf> {
    let mut dir = Some(start.to_path_buf());
    for _ in 0..max_depth {
        let d = dir?;
        let cand = d.join(filename);
        if cand.is_file() {
            return Some(cand);
        }
        dir = d.parent().map(|p| p.to_path_buf());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{load_config, AppConfig};

    #[test]
    fn empty_config_is_all_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("parse");
        assert!(cfg.output.reference_dir.is_none());
        assert!(cfg.tokenizer.abbreviations.is_empty());
    }

    #[test]
    fn sections_parse_independently() {
        let cfg: AppConfig = toml::from_str(
            r#"
[output]
reference_dir = "reference"
plain_dir = "plaintext"

[tokenizer]
abbreviations = ["Kgl.", "Ew."]
"#,
        )
        .expect("parse");
        assert_eq!(
            cfg.output.reference_dir.as_deref(),
            Some(std::path::Path::new("reference"))
        );
        assert_eq!(cfg.tokenizer.abbreviations, ["Kgl.", "Ew."]);
    }

    #[test]
    fn load_config_reports_the_path_on_failure() {
        let err = load_config(std::path::Path::new("/nonexistent/tei.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/tei.toml"));
    }
}
