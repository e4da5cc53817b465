use crate::error::PipelineError;
use crate::tei::xml::{Document, NodeId};
use crate::tokenize::Tokenizer;

const TEXT_TAG: &str = "text";
const PARAGRAPH_TAG: &str = "p";

/// The root-level <text> container. Its absence makes the document
/// unusable for every downstream product.
pub fn find_text_container(doc: &Document) -> Result<NodeId, PipelineError> {
    doc.find_child(doc.root(), TEXT_TAG).ok_or_else(|| {
        PipelineError::MalformedInput("document has no <text> container".to_string())
    })
}

/// Flattened plain text of the whole <text> container.
pub fn plain_text(doc: &Document) -> Result<String, PipelineError> {
    let text = find_text_container(doc)?;
    Ok(doc.flatten(text))
}

/// One token list per <p> inside the <text> container, document order.
pub fn extract_paragraphs(
    doc: &Document,
    tokenizer: &Tokenizer,
) -> Result<Vec<Vec<String>>, PipelineError> {
    let text = find_text_container(doc)?;
    Ok(doc
        .descendants_with_tag(text, PARAGRAPH_TAG)
        .into_iter()
        .map(|p| tokenizer.tokenize_paragraph(&doc.flatten(p)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{extract_paragraphs, find_text_container, plain_text};
    use crate::tei::xml::parse_document;
    use crate::tokenize::Tokenizer;

    #[test]
    fn paragraphs_come_out_in_document_order() {
        let doc = parse_document(
            b"<TEI><text><div><p>Erster Satz.</p></div><p>Zweiter Satz.</p></text></TEI>",
        )
        .expect("parse");
        let tokenizer = Tokenizer::german();
        let ps = extract_paragraphs(&doc, &tokenizer).expect("extract");
        assert_eq!(
            ps,
            vec![vec!["Erster", "Satz"], vec!["Zweiter", "Satz"]]
        );
    }

    #[test]
    fn missing_text_container_is_malformed_everywhere() {
        let doc = parse_document(b"<TEI><teiHeader/></TEI>").expect("parse");
        let tokenizer = Tokenizer::german();
        assert!(find_text_container(&doc).is_err());
        assert!(plain_text(&doc).is_err());
        assert!(extract_paragraphs(&doc, &tokenizer).is_err());
    }

    #[test]
    fn plain_text_strips_markup_only() {
        let doc = parse_document(
            b"<TEI><text><p>Der <hi>Hund</hi> bellt.</p></text></TEI>",
        )
        .expect("parse");
        assert_eq!(plain_text(&doc).expect("plain"), "Der Hund bellt.");
    }
}
