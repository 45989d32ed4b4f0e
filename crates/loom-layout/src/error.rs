use std::fmt;

/// Error raised by a mapping strategy or a pack observer.
///
/// Carries only a message; [`pack`](crate::pack) attaches the field name and
/// record index when it turns this into a [`LayoutError`].
#[derive(Debug, Clone, PartialEq)]
pub struct MappingError {
    pub message: String,
}

impl MappingError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { message: msg.into() }
    }
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for MappingError {}

/// A schema or packing failure.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// A field declares a component count outside `1..=4`.
    InvalidComponents { field: String, components: u8 },
    /// Two fields share a name.
    DuplicateField(String),
    /// A mapping returned an error for a record.
    Mapping { field: String, record: usize, message: String },
    /// A pack observer rejected a record.
    Rejected { record: usize, message: String },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::InvalidComponents { field, components } => write!(
                f,
                "field `{field}` declares {components} components (expected 1..=4)"
            ),
            LayoutError::DuplicateField(name) => write!(f, "field `{name}` is declared twice"),
            LayoutError::Mapping { field, record, message } => {
                write!(f, "mapping for `{field}` failed on record {record}: {message}")
            }
            LayoutError::Rejected { record, message } => {
                write!(f, "record {record} rejected: {message}")
            }
        }
    }
}

impl std::error::Error for LayoutError {}
