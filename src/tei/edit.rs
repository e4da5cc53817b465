use crate::error::PipelineError;
use crate::tei::extract::find_text_container;
use crate::tei::xml::Document;

const NOTE_TAG: &str = "note";
const LINE_BREAK_TAG: &str = "lb";

/// Remove every <note> element from the tree. A removed note's trailing
/// text is merged into the previous sibling's tail, or into the parent's
/// leading text when the note is the first child, so no running text is
/// lost. An absent tail appends nothing. A note without a parent is a
/// structural violation.
pub fn remove_notes(doc: &mut Document) -> Result<(), PipelineError> {
    let notes = doc.descendants_with_tag(doc.root(), NOTE_TAG);
    for note in notes {
        let parent = doc.node(note).parent.ok_or_else(|| {
            PipelineError::OrphanNode("<note> has no parent".to_string())
        })?;
        let tail = doc.node(note).tail.clone();
        if let Some(tail) = tail {
            match doc.previous_sibling(note) {
                Some(prev) => append_to(&mut doc.node_mut(prev).tail, &tail),
                None => append_to(&mut doc.node_mut(parent).text, &tail),
            }
        }
        doc.detach(note)?;
    }
    Ok(())
}

/// Appending to an empty slot initializes it.
fn append_to(slot: &mut Option<String>, tail: &str) {
    match slot {
        Some(existing) => existing.push_str(tail),
        None => *slot = Some(tail.to_string()),
    }
}

/// Insert separator whitespace so flattening cannot glue words together:
/// every <note> inside the text container gets a leading space prepended to
/// its text, every <lb/> gets one prepended to its tail.
pub fn fix_whitespace(doc: &mut Document) -> Result<(), PipelineError> {
    let text = find_text_container(doc)?;
    for id in doc.descendants(text) {
        if doc.node(id).tag == NOTE_TAG {
            prepend_space(&mut doc.node_mut(id).text);
        } else if doc.node(id).tag == LINE_BREAK_TAG {
            prepend_space(&mut doc.node_mut(id).tail);
        }
    }
    Ok(())
}

fn prepend_space(slot: &mut Option<String>) {
    match slot {
        Some(existing) => existing.insert(0, ' '),
        None => *slot = Some(" ".to_string()),
    }
}
