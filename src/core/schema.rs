//! Purpose: Declare the ordered columns of a record type and the converter for each.
//! Exports: `Schema`, `SchemaBuilder`, `ColumnSpec`.
//! Role: Validated, immutable description consumed by the line decoder.
//! Invariants: `order` and `converters` name exactly the same columns, each once.
//! Invariants: Validation happens once at construction; decoding never re-checks it.

use crate::core::error::{Error, ErrorKind};
use crate::core::value::Converter;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct ColumnSpec {
    pub name: String,
    pub converter: Converter,
}

#[derive(Clone, Debug)]
pub struct Schema {
    name: String,
    columns: Vec<ColumnSpec>,
    names: Arc<[String]>,
}

impl Schema {
    /// Builds a schema from a column order and a name -> converter mapping.
    pub fn new(
        name: impl Into<String>,
        order: Vec<String>,
        mut converters: HashMap<String, Converter>,
    ) -> Result<Self, Error> {
        let name = name.into();
        if order.len() != converters.len() {
            return Err(config_error(
                &name,
                format!(
                    "column order has {} names but {} converters are declared",
                    order.len(),
                    converters.len()
                ),
            ));
        }

        let mut columns = Vec::with_capacity(order.len());
        for column in order {
            let converter = converters.remove(&column).ok_or_else(|| {
                config_error(
                    &name,
                    format!("column '{column}' is listed twice or has no converter"),
                )
            })?;
            columns.push(ColumnSpec {
                name: column,
                converter,
            });
        }
        Ok(Self::from_resolved(name, columns))
    }

    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    fn from_resolved(name: String, columns: Vec<ColumnSpec>) -> Self {
        let names = columns
            .iter()
            .map(|column| column.name.clone())
            .collect::<Vec<_>>()
            .into();
        Self {
            name,
            columns,
            names,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.names.iter().position(|name| name == column)
    }

    /// Column names shared with every record this schema decodes.
    pub(crate) fn names(&self) -> &Arc<[String]> {
        &self.names
    }
}

pub struct SchemaBuilder {
    name: String,
    columns: Vec<ColumnSpec>,
}

impl SchemaBuilder {
    pub fn column(mut self, name: impl Into<String>, converter: Converter) -> Self {
        self.columns.push(ColumnSpec {
            name: name.into(),
            converter,
        });
        self
    }

    pub fn build(self) -> Result<Schema, Error> {
        if self.columns.is_empty() {
            return Err(config_error(&self.name, "schema declares no columns"));
        }
        let mut seen = HashSet::with_capacity(self.columns.len());
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(config_error(
                    &self.name,
                    format!("column '{}' is declared twice", column.name),
                ));
            }
        }
        Ok(Schema::from_resolved(self.name, self.columns))
    }
}

fn config_error(schema: &str, detail: impl AsRef<str>) -> Error {
    Error::new(ErrorKind::Config)
        .with_message(format!("invalid schema '{schema}': {}", detail.as_ref()))
        .with_hint("Declare every ordered column exactly once with one converter.")
}
