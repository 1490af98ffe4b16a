//! File formats at the edge of the engine: region documents in, NDJSON out.

pub mod frame;
pub mod profile;
