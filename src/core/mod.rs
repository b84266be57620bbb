// Decoding and reading primitives: values, schemas, records, the line decoder and the line source.
pub mod decode;
pub mod error;
pub mod record;
pub mod schema;
pub mod source;
pub mod value;
