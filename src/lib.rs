//! Purpose: Library crate behind the `tsvstream` CLI: schema-driven TSV decoding as a bounded async stream.
//! Exports: `api` (stream, schema, record, errors), `catalog` (IMDb record types and typed rows).
//! Role: Core ingestion engine; the binary is a thin driver over `api`.
//! Invariants: Internal modules stay private; `api` is the only public path to them.
//! Invariants: Each stream owns its reader, buffer and state; nothing is process-global.
pub mod api;
pub mod catalog;
mod core;
