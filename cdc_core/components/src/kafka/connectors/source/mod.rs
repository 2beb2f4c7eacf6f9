//! Debezium capture connectors, one per source engine.

pub mod mssql;
pub mod mysql;
pub mod oracle;
pub mod postgres;
