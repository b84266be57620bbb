//! Purpose: Turn one raw tab-separated line into a `Record` using a `Schema`.
//! Exports: `decode_line`.
//! Role: Line Decoder; stateless, so the same line always yields the same record.
//! Invariants: Fields are positional; no quoting or escaping is interpreted.
//! Invariants: The first failing column aborts the line; partial records are dropped.
//! Notes: Callers skip blank lines before decoding; extra trailing fields are ignored.

use crate::core::error::{Error, ErrorKind};
use crate::core::record::Record;
use crate::core::schema::Schema;
use crate::core::value::{ConversionError, FIELD_DELIMITER};

pub fn decode_line(schema: &Schema, line: &str) -> Result<Record, Error> {
    let mut fields = line.split(FIELD_DELIMITER);
    let mut values = Vec::with_capacity(schema.len());

    for (index, column) in schema.columns().iter().enumerate() {
        let converted = match fields.next() {
            Some(raw) => column.converter.convert(raw),
            None => Err(ConversionError::MissingField { index }),
        };
        match converted {
            Ok(value) => values.push(value),
            Err(cause) => {
                return Err(Error::new(ErrorKind::Decode)
                    .with_message(format!("failed to decode column '{}': {cause}", column.name))
                    .with_column(column.name.clone())
                    .with_source(cause));
            }
        }
    }

    Ok(Record::new(schema.names().clone(), values))
}
