pub mod edit;
pub mod extract;
pub mod xml;

pub use xml::{load_file, parse_document, serialize_document, Document, Node, NodeId};
