//! Query/mutation layer over the SQLite schema. Everything here speaks in
//! client-facing records and enforces existence checks before writing.

pub mod mutation;
pub mod query;
