use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Word-like runs: words with internal dots/apostrophes/hyphens and an
/// optional trailing abbreviation dot, numbers with grouping separators,
/// any other non-space character on its own.
static WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\p{L}+(?:[.'’\-]\p{L}+)*\.?|\p{N}+(?:[.,]\p{N}+)*|\S").expect("word"));

/// Sentence-final punctuation, optional closing quotes, then whitespace.
static BOUNDARY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[.!?]+[”“’‘"')»«]*\s+"#).expect("boundary"));

/// Characters that may open a sentence after a boundary.
const OPENERS: &str = "\"'„“‚‘«»(";

/// Tokens dropped from the reference output: anything that is, after
/// trimming, pure punctuation from this set.
const SKIP_TOKENS: &[&str] = &[
    ",", ".", ";", "!", "?", "-", "\"", "'", "``", "''", ":", "(", ")", "–", "„", "“", "”", "‚",
    "‘", "’",
];

/// German abbreviations that keep their trailing dot and never end a
/// sentence. Stored lowercased, without the final dot.
const GERMAN_ABBREVIATIONS: &[&str] = &[
    "abb", "abs", "bd", "bspw", "bzgl", "bzw", "ca", "d.h", "dr", "etc", "evtl", "geb", "gest",
    "ggf", "hrsg", "inkl", "jh", "jhd", "kap", "nr", "o.ä", "prof", "s.o", "s.u", "sog", "st",
    "u.a", "u.ä", "usw", "vgl", "z.b", "zit",
];

/// Sentence and word tokenizer for German running text. Built once and
/// shared across all documents of a run; construction compiles nothing
/// beyond the process-wide lazy regexes.
pub struct Tokenizer {
    abbreviations: HashSet<String>,
}

impl Tokenizer {
    pub fn german() -> Self {
        Self {
            abbreviations: GERMAN_ABBREVIATIONS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Extend the abbreviation list, e.g. from a config file. Entries are
    /// normalized to lowercase without a trailing dot.
    pub fn add_abbreviations<I, S>(&mut self, extra: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for a in extra {
            let a = a.as_ref().trim().trim_end_matches('.').to_lowercase();
            if !a.is_empty() {
                self.abbreviations.insert(a);
            }
        }
    }

    /// Split a paragraph into sentences. A candidate boundary is rejected
    /// when the preceding word is an abbreviation, a single-letter initial,
    /// or a bare number (German ordinals), or when the following character
    /// does not look like a sentence opener.
    pub fn split_sentences<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut out = Vec::new();
        let mut start = 0usize;
        for m in BOUNDARY_RE.find_iter(text) {
            if !self.is_sentence_boundary(text, m.start(), m.end()) {
                continue;
            }
            let sent = text[start..m.end()].trim();
            if !sent.is_empty() {
                out.push(sent);
            }
            start = m.end();
        }
        let rest = text[start..].trim();
        if !rest.is_empty() {
            out.push(rest);
        }
        out
    }

    fn is_sentence_boundary(&self, text: &str, punct_start: usize, after: usize) -> bool {
        let next_ok = text[after..]
            .chars()
            .next()
            .map_or(true, |c| c.is_uppercase() || c.is_numeric() || OPENERS.contains(c));
        if !next_ok {
            return false;
        }

        let word: String = text[..punct_start]
            .chars()
            .rev()
            .take_while(|c| c.is_alphanumeric() || *c == '.')
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        let word = word.trim_matches('.');
        if word.is_empty() {
            return true;
        }
        if word.chars().all(char::is_numeric) {
            return false;
        }
        if word.chars().count() == 1 {
            return false;
        }
        !self.abbreviations.contains(word.to_lowercase().as_str())
    }

    /// Split a sentence into word and punctuation tokens. A trailing dot
    /// stays attached only on abbreviations and single-letter initials;
    /// everywhere else it becomes its own token.
    pub fn word_tokenize(&self, sentence: &str) -> Vec<String> {
        let mut out = Vec::new();
        for m in WORD_RE.find_iter(sentence) {
            let tok = m.as_str();
            if let Some(stripped) = tok.strip_suffix('.') {
                if !stripped.is_empty() && !self.keeps_trailing_dot(stripped) {
                    out.push(stripped.to_string());
                    out.push(".".to_string());
                    continue;
                }
            }
            out.push(tok.to_string());
        }
        out
    }

    fn keeps_trailing_dot(&self, stem: &str) -> bool {
        stem.chars().count() == 1 || self.abbreviations.contains(stem.to_lowercase().as_str())
    }

    /// Full paragraph tokenization: sentences, then words, flattened into
    /// one sequence (sentence boundaries are not preserved), then the
    /// punctuation/whitespace post-filter.
    pub fn tokenize_paragraph(&self, paragraph: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        for sent in self.split_sentences(paragraph) {
            tokens.extend(self.word_tokenize(sent));
        }
        tokens
            .into_iter()
            .filter_map(|t| {
                let t = t.trim();
                if t.is_empty() || SKIP_TOKENS.contains(&t) {
                    None
                } else {
                    Some(t.to_string())
                }
            })
            .collect()
    }
}
