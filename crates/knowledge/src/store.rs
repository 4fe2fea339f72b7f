//! Structured record store.
//!
//! The answering pipeline only reads records. `SqliteRecordStore` keeps one
//! table per record kind; `MemoryRecordStore` is an in-process store for
//! tests and embedding into other services.

use crate::record::{Record, RecordKind};
use assistant_core::{AppError, AppResult};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Mutex;

/// Read access to the structured records.
pub trait RecordStore: Send + Sync {
    /// All records of one kind, ordered by id.
    fn list_all(&self, kind: RecordKind) -> AppResult<Vec<Record>>;

    /// Cheap token that changes whenever the store's contents change.
    ///
    /// Must not enumerate records. `None` means the store cannot tell, and
    /// the persisted index is trusted until an explicit rebuild.
    fn revision(&self) -> AppResult<Option<String>> {
        Ok(None)
    }
}

/// List records of every kind in `RecordKind::ALL` order.
pub fn list_every_kind(store: &dyn RecordStore) -> AppResult<Vec<Record>> {
    let mut records = Vec::new();
    for kind in RecordKind::ALL {
        let batch = store.list_all(kind)?;
        tracing::debug!("Listed {} {} records", batch.len(), kind);
        records.extend(batch);
    }
    Ok(records)
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS apartments (
        id INTEGER PRIMARY KEY,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        title TEXT,
        address TEXT,
        available_from TEXT,
        price REAL,
        size REAL,
        rooms REAL,
        image_url TEXT,
        details_link TEXT
    );

    CREATE TABLE IF NOT EXISTS places (
        id INTEGER PRIMARY KEY,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        name TEXT,
        category TEXT,
        address TEXT,
        description TEXT,
        price_range TEXT,
        rating REAL
    );

    CREATE TABLE IF NOT EXISTS whatsapp_groups (
        id INTEGER PRIMARY KEY,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        name TEXT,
        category TEXT,
        description TEXT,
        invite_link TEXT UNIQUE
    );

    CREATE TABLE IF NOT EXISTS insurances (
        id INTEGER PRIMARY KEY,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        company_name TEXT,
        category TEXT,
        description TEXT,
        company_url TEXT
    );

    CREATE TABLE IF NOT EXISTS general_info (
        id INTEGER PRIMARY KEY,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        title TEXT,
        category TEXT,
        description TEXT
    );

    CREATE TABLE IF NOT EXISTS banks (
        id INTEGER PRIMARY KEY,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        name TEXT,
        description TEXT,
        website_url TEXT,
        free_student_plan_available INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS telecom_providers (
        id INTEGER PRIMARY KEY,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        name TEXT,
        description TEXT,
        website_url TEXT
    );

    CREATE TABLE IF NOT EXISTS useful_apps (
        id INTEGER PRIMARY KEY,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        name TEXT,
        category TEXT,
        description TEXT,
        app_store_url TEXT,
        play_store_url TEXT
    );
"#;

/// Columns stored as INTEGER 0/1 that decode to booleans.
const BOOL_COLUMNS: &[&str] = &["free_student_plan_available"];

/// SQLite-backed record store with one table per record kind.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Open (or create) the database at `db_path` and ensure every table exists.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Knowledge(format!("Failed to create database directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Knowledge(format!("Failed to open record store: {}", e)))?;
        Self::init(conn, db_path)
    }

    /// In-memory database, mostly for tests.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Knowledge(format!("Failed to open record store: {}", e)))?;
        Self::init(conn, Path::new(":memory:"))
    }

    fn init(conn: Connection, db_path: &Path) -> AppResult<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

        tracing::debug!("Initialized record store at {:?}", db_path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Knowledge("Record store connection poisoned".to_string()))
    }

    /// Insert or replace a record in its kind's table.
    pub fn insert(&self, record: &Record) -> AppResult<()> {
        let conn = self.lock()?;
        insert_row(&conn, record)
    }

    /// Insert several records in one transaction.
    pub fn insert_all(&self, records: &[Record]) -> AppResult<()> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Knowledge(format!("Failed to begin transaction: {}", e)))?;

        for record in records {
            insert_row(&tx, record)?;
        }

        tx.commit()
            .map_err(|e| AppError::Knowledge(format!("Failed to commit records: {}", e)))
    }
}

fn insert_row(conn: &Connection, record: &Record) -> AppResult<()> {
    let table = record.kind().table_name();
    let Value::Object(mut fields) = serde_json::to_value(record)? else {
        return Err(AppError::Knowledge(format!(
            "Record for {} did not serialize to an object",
            table
        )));
    };
    fields.remove("kind");

    let columns: Vec<&str> = fields.keys().map(String::as_str).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders.join(", ")
    );
    let values: Vec<SqlValue> = fields.values().map(json_to_sql).collect();

    conn.execute(&sql, params_from_iter(values.iter()))
        .map_err(|e| AppError::Knowledge(format!("Failed to insert into {}: {}", table, e)))?;

    Ok(())
}

impl RecordStore for SqliteRecordStore {
    fn list_all(&self, kind: RecordKind) -> AppResult<Vec<Record>> {
        let table = kind.table_name();
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(&format!("SELECT * FROM {} ORDER BY id", table))
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let rows = stmt
            .query_map([], |row| {
                let mut fields = Map::new();
                fields.insert("kind".to_string(), Value::String(table.to_string()));
                for (i, name) in names.iter().enumerate() {
                    let value = sql_to_json(row.get_ref(i)?, name);
                    if !value.is_null() {
                        fields.insert(name.clone(), value);
                    }
                }
                Ok(Value::Object(fields))
            })
            .map_err(|e| AppError::Knowledge(format!("Failed to query {}: {}", table, e)))?;

        let mut records = Vec::new();
        for row in rows {
            let value =
                row.map_err(|e| AppError::Knowledge(format!("Failed to read {} row: {}", table, e)))?;
            records.push(Record::from_value(value)?);
        }

        Ok(records)
    }

    fn revision(&self) -> AppResult<Option<String>> {
        let conn = self.lock()?;
        let mut hasher = Sha256::new();

        for kind in RecordKind::ALL {
            let table = kind.table_name();
            let (count, max_updated, id_sum): (i64, String, i64) = conn
                .query_row(
                    &format!(
                        "SELECT COUNT(*), COALESCE(MAX(updated_at), ''), COALESCE(SUM(id), 0) FROM {}",
                        table
                    ),
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .map_err(|e| AppError::Knowledge(format!("Failed to summarize {}: {}", table, e)))?;

            hasher.update(format!("{}:{}:{}:{};", table, count, max_updated, id_sum));
        }

        Ok(Some(format!("{:x}", hasher.finalize())))
    }
}

fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn sql_to_json(value: ValueRef<'_>, column: &str) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) if BOOL_COLUMNS.contains(&column) => Value::Bool(i != 0),
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(_) => Value::Null,
    }
}

/// In-process record store.
#[derive(Default)]
pub struct MemoryRecordStore {
    inner: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    records: Vec<Record>,
    generation: u64,
}

impl MemoryRecordStore {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            inner: Mutex::new(MemoryState {
                records,
                generation: 0,
            }),
        }
    }

    /// Replace the record with the same kind and id, or append it.
    pub fn insert(&self, record: Record) -> AppResult<()> {
        let mut state = self
            .inner
            .lock()
            .map_err(|_| AppError::Knowledge("Record store lock poisoned".to_string()))?;

        let key = (record.kind(), record.id());
        match state
            .records
            .iter_mut()
            .find(|r| (r.kind(), r.id()) == key)
        {
            Some(existing) => *existing = record,
            None => state.records.push(record),
        }
        state.generation += 1;
        Ok(())
    }
}

impl RecordStore for MemoryRecordStore {
    fn list_all(&self, kind: RecordKind) -> AppResult<Vec<Record>> {
        let state = self
            .inner
            .lock()
            .map_err(|_| AppError::Knowledge("Record store lock poisoned".to_string()))?;

        let mut records: Vec<Record> = state
            .records
            .iter()
            .filter(|r| r.kind() == kind)
            .cloned()
            .collect();
        records.sort_by_key(Record::id);
        Ok(records)
    }

    fn revision(&self) -> AppResult<Option<String>> {
        let state = self
            .inner
            .lock()
            .map_err(|_| AppError::Knowledge("Record store lock poisoned".to_string()))?;
        Ok(Some(format!("memory-{}", state.generation)))
    }
}
