use thiserror::Error;

/// Failures while unpacking the document container.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    /// Archive structure is invalid, truncated or missing a required part
    #[error("malformed container: {0}")]
    Malformed(String),
    /// Recognizable container that is not a wordprocessing package
    #[error("unsupported container: {0}")]
    Unsupported(String),
}

/// Failures while reading an XML part into nodes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Part is not well-formed XML
    #[error("malformed XML at byte {position}: {message}")]
    Malformed { message: String, position: usize },
    /// Well-formed XML whose structural elements nest illegally
    #[error("<{element}> cannot appear inside <{parent}> (byte {position})")]
    StructuralMismatch {
        element: String,
        parent: String,
        position: usize,
    },
}

/// What kind of definition a dangling reference pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Style,
    Numbering,
    Relationship,
    Note,
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReferenceKind::Style => "style",
            ReferenceKind::Numbering => "numbering",
            ReferenceKind::Relationship => "relationship",
            ReferenceKind::Note => "note",
        };
        f.write_str(name)
    }
}

/// Failures while flattening style and numbering references.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("style inheritance cycle through '{0}'")]
    CyclicStyle(String),
    /// Recorded as a diagnostic only; the node degrades to unformatted output.
    #[error("missing {kind} definition '{id}'")]
    MissingReference { kind: ReferenceKind, id: String },
}

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Container,
    Parse,
    Resolve,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Container => "container",
            Stage::Parse => "parse",
            Stage::Resolve => "resolve",
        };
        f.write_str(name)
    }
}

/// Flat error kind for callers that only branch on the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedContainer,
    UnsupportedContainer,
    MalformedXml,
    StructuralMismatch,
    CyclicStyle,
    MissingReference,
}

/// The single error returned by [`crate::convert`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("container stage: {0}")]
    Container(#[from] ContainerError),
    #[error("parse stage ({part}): {source}")]
    Parse {
        part: String,
        #[source]
        source: ParseError,
    },
    #[error("resolve stage: {0}")]
    Resolve(#[from] ResolveError),
}

impl ConversionError {
    pub fn parse(part: impl Into<String>, source: ParseError) -> Self {
        ConversionError::Parse {
            part: part.into(),
            source,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            ConversionError::Container(_) => Stage::Container,
            ConversionError::Parse { .. } => Stage::Parse,
            ConversionError::Resolve(_) => Stage::Resolve,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ConversionError::Container(ContainerError::Malformed(_)) => {
                ErrorKind::MalformedContainer
            }
            ConversionError::Container(ContainerError::Unsupported(_)) => {
                ErrorKind::UnsupportedContainer
            }
            ConversionError::Parse {
                source: ParseError::Malformed { .. },
                ..
            } => ErrorKind::MalformedXml,
            ConversionError::Parse {
                source: ParseError::StructuralMismatch { .. },
                ..
            } => ErrorKind::StructuralMismatch,
            ConversionError::Resolve(ResolveError::CyclicStyle(_)) => ErrorKind::CyclicStyle,
            ConversionError::Resolve(ResolveError::MissingReference { .. }) => {
                ErrorKind::MissingReference
            }
        }
    }

    /// Identifier involved in the failure (style id, element name), if any.
    pub fn offending_id(&self) -> Option<&str> {
        match self {
            ConversionError::Parse {
                source: ParseError::StructuralMismatch { element, .. },
                ..
            } => Some(element),
            ConversionError::Resolve(ResolveError::CyclicStyle(id)) => Some(id),
            ConversionError::Resolve(ResolveError::MissingReference { id, .. }) => Some(id),
            _ => None,
        }
    }
}
