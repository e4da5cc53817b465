use thiserror::Error;

/// Fatal per-document failures, kept distinguishable so the driver can
/// report which class aborted a document.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The document cannot be processed as TEI: parse failure or the
    /// root-level <text> container is absent.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A requested output product exists on the CLI but has no
    /// implementation yet.
    #[error("not implemented: {0}")]
    Unimplemented(&'static str),

    /// Tree invariant broken during mutation, e.g. a <note> scheduled for
    /// removal that has no parent.
    #[error("structural invariant violated: {0}")]
    OrphanNode(String),
}
