//! Purpose: Define the public Rust API boundary for tsvstream.
//! Exports: Stream, schema, record, value and error types needed by the CLI and callers.
//! Role: Public, additive-only surface; hides the internal `core` module layout.
//! Invariants: This module is the only public path to decoding and reading primitives.
//! Invariants: Internal modules remain private and are not directly exposed.

mod stream;

pub use crate::core::decode::decode_line;
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::record::Record;
pub use crate::core::schema::{ColumnSpec, Schema, SchemaBuilder};
pub use crate::core::source::{LineSource, RawLine, SourceControl};
pub use crate::core::value::{
    ConversionError, ConvertFn, Converter, FIELD_DELIMITER, LIST_SEPARATOR, MISSING_TOKEN, Value,
};
pub use stream::{DEFAULT_CAPACITY, RecordStream, SourceState, StreamConfig, StreamOptions};
