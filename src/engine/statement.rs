//! SQL statement submitted by a single tool invocation.

use serde_json::{Map, Value};

/// SQL text plus the tool arguments it was rendered from, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    text: String,
    parameters: Option<Map<String, Value>>,
}

impl SqlStatement {
    /// Creates a statement from raw SQL text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: None,
        }
    }

    /// Attaches the arguments a templated statement was rendered from.
    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Returns the SQL text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the template arguments, if this statement was rendered.
    pub fn parameters(&self) -> Option<&Map<String, Value>> {
        self.parameters.as_ref()
    }
}
