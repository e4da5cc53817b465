use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::tei::extract::plain_text;
use crate::tei::xml::{serialize_document, Document};

/// Render the reference records: per paragraph, space-separated
/// `token(index)` pairs with 0-based indices, terminated by a blank line.
/// The blank line follows the last paragraph too.
pub fn render_reference(paragraphs: &[Vec<String>]) -> String {
    let mut out = String::new();
    for tokens in paragraphs {
        for (idx, tok) in tokens.iter().enumerate() {
            if idx != 0 {
                out.push(' ');
            }
            out.push_str(tok);
            out.push('(');
            out.push_str(&idx.to_string());
            out.push(')');
        }
        out.push_str("\n\n");
    }
    out
}

pub fn write_reference(paragraphs: &[Vec<String>], path: &Path) -> anyhow::Result<()> {
    write_atomic(path, render_reference(paragraphs).as_bytes())
}

/// Write the flattened text of the <text> container, markup stripped,
/// with no token-level processing.
pub fn write_plain_text(doc: &Document, path: &Path) -> anyhow::Result<()> {
    let text = plain_text(doc)?;
    write_atomic(path, text.as_bytes())
}

/// Write the (possibly mutated) tree back out as XML.
pub fn write_edited(doc: &Document, path: &Path) -> anyhow::Result<()> {
    let bytes = serialize_document(doc)?;
    write_atomic(path, &bytes)
}

/// Whole-file write via a temporary sibling, renamed into place, so an
/// aborted run never leaves a truncated product behind.
fn write_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("output");
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    fs::write(&tmp, bytes).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{render_reference, write_plain_text, write_reference};
    use crate::tei::xml::parse_document;

    fn toks(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn reference_record_format() {
        let ps = vec![toks(&["Der", "Hund", "läuft"])];
        assert_eq!(render_reference(&ps), "Der(0) Hund(1) läuft(2)\n\n");
    }

    #[test]
    fn every_paragraph_is_blank_line_terminated() {
        let ps = vec![toks(&["Eins"]), toks(&["Zwei", "Drei"])];
        assert_eq!(render_reference(&ps), "Eins(0)\n\nZwei(0) Drei(1)\n\n");
    }

    #[test]
    fn empty_paragraph_renders_as_blank_record() {
        let ps = vec![toks(&[])];
        assert_eq!(render_reference(&ps), "\n\n");
    }

    #[test]
    fn reference_file_lands_without_temp_leftovers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("doc.xml.txt");
        write_reference(&[toks(&["a", "b"])], &path).expect("write");

        assert_eq!(std::fs::read_to_string(&path).expect("read"), "a(0) b(1)\n\n");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read_dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn plain_text_write_requires_text_container() {
        let dir = tempfile::tempdir().expect("tempdir");
        let doc = parse_document(b"<TEI><teiHeader/></TEI>").expect("parse");
        let path = dir.path().join("doc.txt");
        assert!(write_plain_text(&doc, &path).is_err());
        assert!(!path.exists());
    }
}
