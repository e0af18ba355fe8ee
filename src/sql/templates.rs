//! SQL templates for the catalog, schema and table tools.

use serde::{Deserialize, Serialize};

use super::fragment::{Identifier, SqlBuilder, SqlFragment, SqlValue, TypeName};
use super::ArgumentError;

/// A column in a `create_table` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

fn information_schema(catalog: Identifier, view: &'static str) -> SqlFragment {
    SqlFragment::QualifiedName(vec![
        catalog,
        Identifier::system("information_schema"),
        Identifier::system(view),
    ])
}

/// `SHOW CATALOGS`
pub fn list_catalogs() -> String {
    SqlBuilder::new().keyword("SHOW CATALOGS").build()
}

/// Schema names in a catalog, from its information schema.
pub fn list_schemas(catalog: &str) -> Result<String, ArgumentError> {
    let catalog = Identifier::new("catalog", catalog)?;

    Ok(SqlBuilder::new()
        .keyword("SELECT schema_name FROM")
        .push(information_schema(catalog, "schemata"))
        .keyword("ORDER BY schema_name")
        .build())
}

/// Table names in a schema, from the catalog's information schema.
pub fn list_tables(catalog: &str, schema: &str) -> Result<String, ArgumentError> {
    let catalog = Identifier::new("catalog", catalog)?;
    let schema = Identifier::new("schema", schema)?;

    Ok(SqlBuilder::new()
        .keyword("SELECT table_name FROM")
        .push(information_schema(catalog, "tables"))
        .keyword("WHERE table_schema =")
        .value(SqlValue::string("schema", schema.as_str())?)
        .keyword("ORDER BY table_name")
        .build())
}

/// `DESCRIBE TABLE catalog.schema.table`
pub fn describe_table(catalog: &str, schema: &str, table: &str) -> Result<String, ArgumentError> {
    let name = vec![
        Identifier::new("catalog", catalog)?,
        Identifier::new("schema", schema)?,
        Identifier::new("table", table)?,
    ];

    Ok(SqlBuilder::new()
        .keyword("DESCRIBE TABLE")
        .qualified(name)
        .build())
}

/// `CREATE SCHEMA catalog.schema`
pub fn create_schema(catalog: &str, schema: &str) -> Result<String, ArgumentError> {
    let name = vec![
        Identifier::new("catalog", catalog)?,
        Identifier::new("schema", schema)?,
    ];

    Ok(SqlBuilder::new()
        .keyword("CREATE SCHEMA")
        .qualified(name)
        .build())
}

/// `CREATE TABLE catalog.schema.table (col TYPE, ...)`
pub fn create_table(
    catalog: &str,
    schema: &str,
    table: &str,
    columns: &[ColumnDefinition],
) -> Result<String, ArgumentError> {
    let name = vec![
        Identifier::new("catalog", catalog)?,
        Identifier::new("schema", schema)?,
        Identifier::new("table", table)?,
    ];

    if columns.is_empty() {
        return Err(ArgumentError::Empty {
            field: "columns".to_string(),
        });
    }

    let definitions = columns
        .iter()
        .enumerate()
        .map(|(i, column)| -> Result<SqlFragment, ArgumentError> {
            Ok(SqlFragment::Sequence(vec![
                SqlFragment::Identifier(Identifier::new(
                    &format!("columns[{i}].name"),
                    &column.name,
                )?),
                SqlFragment::TypeName(TypeName::new(
                    &format!("columns[{i}].type"),
                    &column.data_type,
                )?),
            ]))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SqlBuilder::new()
        .keyword("CREATE TABLE")
        .qualified(name)
        .push(SqlFragment::Tuple(definitions))
        .build())
}

/// `INSERT INTO table VALUES (...), (...)`
///
/// `table_full_name` is a dotted name with one to three parts.
pub fn insert_data(
    table_full_name: &str,
    rows: &[Vec<serde_json::Value>],
) -> Result<String, ArgumentError> {
    let parts: Vec<&str> = table_full_name.split('.').collect();
    if parts.len() > 3 {
        return Err(ArgumentError::Invalid {
            field: "table_full_name".to_string(),
            reason: "must be of the form catalog.schema.table".to_string(),
        });
    }
    let name = parts
        .into_iter()
        .map(|part| Identifier::new("table_full_name", part))
        .collect::<Result<Vec<_>, _>>()?;

    let Some(first) = rows.first() else {
        return Err(ArgumentError::Empty {
            field: "values".to_string(),
        });
    };
    let width = first.len();
    if width == 0 {
        return Err(ArgumentError::Empty {
            field: "values[0]".to_string(),
        });
    }

    let tuples = rows
        .iter()
        .enumerate()
        .map(|(i, row)| -> Result<SqlFragment, ArgumentError> {
            if row.len() != width {
                return Err(ArgumentError::Invalid {
                    field: format!("values[{i}]"),
                    reason: format!("has {} values, expected {}", row.len(), width),
                });
            }
            let values = row
                .iter()
                .enumerate()
                .map(|(j, cell)| {
                    SqlValue::from_json(&format!("values[{i}][{j}]"), cell).map(SqlFragment::Value)
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(SqlFragment::Tuple(values))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SqlBuilder::new()
        .keyword("INSERT INTO")
        .qualified(name)
        .keyword("VALUES")
        .push(SqlFragment::List(tuples))
        .build())
}
