use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use redis::{Connection, RedisError};
use tracing::{debug, info};

use docsim_core::config::StoreSettings;
use docsim_core::{Error, Result, VectorStore};

const SCAN_BATCH: usize = 500;

/// Redis hash-backed store. One connection, opened once and passed to the indexer and query engine.
pub struct RedisStore {
    conn: Mutex<Connection>,
    url: String,
}

fn store_err(e: RedisError) -> Error { Error::store(e.to_string()) }

/// `host:port` becomes `redis://host:port/`; URLs with a scheme pass through.
pub fn connection_url(address: &str) -> String {
    let address = address.trim();
    if address.contains("://") { address.to_string() } else { format!("redis://{}/", address) }
}

/// Escape glob metacharacters so the prefix matches literally in `SCAN MATCH`.
pub fn prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') { pattern.push('\\'); }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}

impl RedisStore {
    pub fn connect(address: &str, connect_timeout: Duration, io_timeout: Duration) -> Result<Self> {
        let url = connection_url(address);
        let client = redis::Client::open(url.as_str()).map_err(store_err)?;
        let conn = client.get_connection_with_timeout(connect_timeout).map_err(store_err)?;
        let io_timeout = (!io_timeout.is_zero()).then_some(io_timeout);
        conn.set_read_timeout(io_timeout).map_err(store_err)?;
        conn.set_write_timeout(io_timeout).map_err(store_err)?;
        info!(%url, "connected to vector store");
        Ok(Self { conn: Mutex::new(conn), url })
    }

    pub fn from_settings(settings: &StoreSettings) -> Result<Self> {
        Self::connect(&settings.address, settings.connect_timeout(), settings.io_timeout())
    }

    pub fn url(&self) -> &str { &self.url }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::store("redis connection lock poisoned"))
    }
}

impl VectorStore for RedisStore {
    fn set_fields(&self, key: &str, fields: &[(&str, &str)]) -> Result<()> {
        if fields.is_empty() { return Ok(()); }
        // One HSET carrying every field, so the record lands atomically.
        let mut cmd = redis::cmd("HSET");
        cmd.arg(key);
        for (field, value) in fields { cmd.arg(*field).arg(*value); }
        let mut conn = self.conn()?;
        cmd.query::<()>(&mut *conn).map_err(store_err)
    }

    fn get_field(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut conn = self.conn()?;
        redis::cmd("HGET").arg(key).arg(field).query(&mut *conn).map_err(store_err)
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let pattern = prefix_pattern(prefix);
        let mut conn = self.conn()?;
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query(&mut *conn)
                .map_err(store_err)?;
            keys.extend(batch);
            if next == 0 { break; }
            cursor = next;
        }
        // SCAN may report a key more than once across iterations.
        keys.sort();
        keys.dedup();
        debug!(%pattern, count = keys.len(), "scanned keys");
        Ok(keys)
    }
}
