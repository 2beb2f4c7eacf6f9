use crate::error::UnsupportedEngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of relational engines the control plane can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Mysql,
    Postgres,
    Mssql,
    Oracle,
}

impl EngineKind {
    pub const ALL: [EngineKind; 4] = [
        EngineKind::Mysql,
        EngineKind::Postgres,
        EngineKind::Mssql,
        EngineKind::Oracle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Mysql => "mysql",
            EngineKind::Postgres => "postgres",
            EngineKind::Mssql => "mssql",
            EngineKind::Oracle => "oracle",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            EngineKind::Mysql => 3306,
            EngineKind::Postgres => 5432,
            EngineKind::Mssql => 1433,
            EngineKind::Oracle => 1521,
        }
    }

    /// SQL Server has no logical decoding; change tables must be switched on
    /// explicitly before a capture connector can read anything.
    pub fn needs_explicit_cdc(&self) -> bool {
        matches!(self, EngineKind::Mssql)
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = UnsupportedEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(EngineKind::Mysql),
            "postgres" | "postgresql" => Ok(EngineKind::Postgres),
            "mssql" | "sqlserver" => Ok(EngineKind::Mssql),
            "oracle" => Ok(EngineKind::Oracle),
            other => Err(UnsupportedEngineError::new(other)),
        }
    }
}
