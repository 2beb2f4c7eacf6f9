use async_trait::async_trait;
use common::types::{ConnectionConfig, EngineKind};
use parking_lot::Mutex;
use shared_clients::{
    BoxedDbClient, DbClientError, DbClientFactory, DbEngineClient, QueryCache, Row, SqlParam,
};
use std::sync::Arc;

struct Response {
    fragment: String,
    outcome: Result<Vec<Row>, String>,
}

#[derive(Default)]
struct Script {
    responses: Vec<Response>,
    statements: Vec<String>,
    refuse_connections: bool,
    connects: usize,
}

/// Canned database shared by every client it hands out.
///
/// A statement is answered by the first registered fragment it contains
/// (case-insensitive); anything unmatched returns no rows. Every statement the
/// clients run is recorded, including `BEGIN`, `COMMIT` and `ROLLBACK`.
#[derive(Clone, Default)]
pub struct ScriptedDb {
    script: Arc<Mutex<Script>>,
}

impl ScriptedDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, fragment: &str, rows: Vec<Row>) -> Self {
        self.script.lock().responses.push(Response {
            fragment: fragment.to_ascii_lowercase(),
            outcome: Ok(rows),
        });
        self
    }

    pub fn fail_on(self, fragment: &str, message: &str) -> Self {
        self.script.lock().responses.push(Response {
            fragment: fragment.to_ascii_lowercase(),
            outcome: Err(message.to_string()),
        });
        self
    }

    pub fn refuse_connections(self) -> Self {
        self.script.lock().refuse_connections = true;
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.script.lock().statements.clone()
    }

    /// Number of recorded statements containing `fragment`.
    pub fn count_matching(&self, fragment: &str) -> usize {
        let fragment = fragment.to_ascii_lowercase();
        self.script
            .lock()
            .statements
            .iter()
            .filter(|s| s.to_ascii_lowercase().contains(&fragment))
            .count()
    }

    pub fn connects(&self) -> usize {
        self.script.lock().connects
    }

    pub fn client(&self, engine: EngineKind) -> ScriptedDbClient {
        ScriptedDbClient {
            engine,
            db: self.clone(),
            connected: false,
            cache: QueryCache::default(),
        }
    }

    fn answer(&self, sql: &str) -> Result<Vec<Row>, DbClientError> {
        let mut script = self.script.lock();
        script.statements.push(sql.to_string());
        let lowered = sql.to_ascii_lowercase();
        match script
            .responses
            .iter()
            .find(|r| lowered.contains(&r.fragment))
        {
            Some(Response { outcome: Ok(rows), .. }) => Ok(rows.clone()),
            Some(Response { outcome: Err(msg), .. }) => Err(DbClientError::statement(msg.clone())),
            None => Ok(Vec::new()),
        }
    }
}

pub struct ScriptedDbClient {
    engine: EngineKind,
    db: ScriptedDb,
    connected: bool,
    cache: QueryCache,
}

#[async_trait]
impl DbEngineClient for ScriptedDbClient {
    fn engine(&self) -> EngineKind {
        self.engine
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self) -> Result<(), DbClientError> {
        let mut script = self.db.script.lock();
        if script.refuse_connections {
            return Err(DbClientError::connection("connection refused by script"));
        }
        script.connects += 1;
        self.connected = true;
        Ok(())
    }

    async fn execute_raw(
        &mut self,
        sql: &str,
        _params: &[SqlParam],
    ) -> Result<Vec<Row>, DbClientError> {
        self.db.answer(sql)
    }

    async fn begin_transaction(&mut self) -> Result<(), DbClientError> {
        self.db.answer("BEGIN").map(|_| ())
    }

    async fn commit(&mut self) -> Result<(), DbClientError> {
        self.db.answer("COMMIT").map(|_| ())
    }

    async fn rollback(&mut self) -> Result<(), DbClientError> {
        self.db.answer("ROLLBACK").map(|_| ())
    }

    async fn disconnect(&mut self) {
        self.connected = false;
    }

    fn cache_mut(&mut self) -> &mut QueryCache {
        &mut self.cache
    }
}

/// Factory handing out clients backed by one [`ScriptedDb`], whatever the
/// connection points at.
#[derive(Clone, Default)]
pub struct ScriptedClientFactory {
    pub db: ScriptedDb,
}

impl ScriptedClientFactory {
    pub fn new(db: ScriptedDb) -> Self {
        Self { db }
    }
}

impl DbClientFactory for ScriptedClientFactory {
    fn client(&self, config: &ConnectionConfig) -> BoxedDbClient {
        Box::new(self.db.client(config.engine))
    }
}

/// Build a row from `(column, value)` pairs.
pub fn row<const N: usize>(pairs: [(&str, serde_json::Value); N]) -> Row {
    Row::from_pairs(pairs)
}
