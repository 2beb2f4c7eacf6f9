//! Apply side connectors.

pub mod jdbc;
