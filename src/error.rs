use serde::{Deserialize, Serialize};

/// A struct that represents an error with a context and possibly the propagated source error.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ContextError {
    pub context: String,
    pub source_error: Option<String>,
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source_error {
            Some(source_error) => write!(
                formatter,
                "{}: {}",
                self.context,
                minimize_first_letter(source_error.to_string()),
            ),
            None => write!(formatter, "{}", self.context),
        }
    }
}

impl std::error::Error for ContextError {}

impl ContextError {
    /// Create a new `ContextError` with the given context.
    pub fn with_context<S: Into<String>>(context: S) -> ContextError {
        ContextError {
            context: context.into(),
            source_error: None,
        }
    }

    /// Create a new `ContextError` with the given context and source error.
    pub fn with_error<S: Into<String>>(context: S, error: &dyn std::error::Error) -> ContextError {
        ContextError {
            context: context.into(),
            source_error: Some(error.to_string()),
        }
    }
}

/// Failures local to the rendering of a single form. They never abort the batch: the
/// assembler stamps them onto the page of the form which produced them.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("Predio no encontrado: {property_code}")]
    PropertyNotFound { property_code: String },
    #[error("{form} requires a property code")]
    MissingPropertyCode { form: &'static str },
    #[error("the record has no {block} data")]
    MissingData { block: &'static str },
    #[error("{0}")]
    Drawing(#[from] ContextError),
}

/// Failures of a whole generation. The in-progress document is discarded before they reach the caller.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Anything which prevented the batch from producing a document, with the original cause attached.
    #[error("failed to generate the document: {0}")]
    DocumentGenerationError(#[source] ContextError),
    #[error("failed to write the document to {path:?}: {source}")]
    Output {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<ContextError> for GenerationError {
    fn from(error: ContextError) -> Self {
        GenerationError::DocumentGenerationError(error)
    }
}

/// Minimizes the first letter of a string, it is used for standardizing the error message.
pub(crate) fn minimize_first_letter(string: String) -> String {
    let mut characters = string.chars();
    match characters.next() {
        None => String::new(),
        Some(character) => character.to_lowercase().chain(characters).collect(),
    }
}
