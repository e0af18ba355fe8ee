//! SQL rendering for the convenience tools.
//!
//! Tool arguments are validated into typed fragments and rendered into
//! deterministic SQL templates. Input that cannot be rendered safely is
//! rejected with an [`ArgumentError`] before anything reaches the warehouse.

mod fragment;
mod templates;

pub use fragment::{check_text, Identifier, SqlBuilder, SqlFragment, SqlValue, TypeName};
pub use templates::{
    create_schema, create_table, describe_table, insert_data, list_catalogs, list_schemas,
    list_tables, ColumnDefinition,
};

use thiserror::Error;

/// Invalid tool arguments.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("missing required argument '{field}'")]
    Missing { field: String },

    #[error("argument '{field}' must not be empty")]
    Empty { field: String },

    #[error("argument '{field}' must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("argument '{field}' contains forbidden character {character:?}")]
    ForbiddenCharacter { field: String, character: char },

    #[error("argument '{field}' is not a valid column type: {value}")]
    InvalidTypeName { field: String, value: String },

    #[error("argument '{field}' {reason}")]
    Invalid { field: String, reason: String },
}
