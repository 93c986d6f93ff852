//! Error taxonomy for registry configuration, parsing, and rendering.

use thiserror::Error;

use crate::registry::Phase;

/// Errors surfaced by registry operations, parsing, and rendering.
///
/// Configuration errors (`Ordering`, `NotFound`, `Duplicate`, `Pattern`) are
/// returned by the registration calls that caused them and leave the parser
/// untouched. `DepthExceeded` aborts the parse that raised it; no partial
/// tree is returned. `UnknownNodeType` is fatal only to the render call that
/// encountered it; the tree itself remains valid and can be rendered again
/// under a different renderer configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// A rule was registered relative to a rule that does not exist.
    #[error("cannot position rule relative to `{reference}`: no such {phase} rule")]
    Ordering { phase: Phase, reference: String },

    /// A rule was removed (or looked up) by a name that is not registered.
    #[error("no {phase} rule named `{name}`")]
    NotFound { phase: Phase, name: String },

    /// A rule was registered under a name that is already taken in its phase.
    #[error("{phase} rule `{name}` is already registered")]
    Duplicate { phase: Phase, name: String },

    /// A rule's trigger pattern failed to compile.
    #[error("invalid trigger pattern for rule `{name}`")]
    Pattern {
        name: String,
        #[source]
        source: Box<regex::Error>,
    },

    /// Nesting went past the configured maximum while parsing containers.
    #[error("nesting depth exceeded the configured maximum of {limit}")]
    DepthExceeded { limit: usize },

    /// The renderer has no function registered for a node type.
    #[error("no renderer registered for node type `{kind}`")]
    UnknownNodeType { kind: String },
}
