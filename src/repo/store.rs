use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, ErrorCode};
use serde_json::{Map, Value};
use thiserror::Error;

/// A row as a map of column name to value
pub type Record = Map<String, Value>;

/// Row selection for `RecordStore::read`
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    ById(i64),
    /// Column equals value (`Null` matches `IS NULL`)
    Eq(String, Value),
}

/// Failures reported by a record store
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("No {table} record found with id={id}")]
    NotFound { table: String, id: i64 },
    #[error("Constraint violation: {0}")]
    Constraint(String),
    #[error("Invalid table or column name '{0}'")]
    InvalidIdentifier(String),
    #[error("Failed to decode record: {0}")]
    Decode(String),
    #[error("Record store unavailable: {0}")]
    Unavailable(String),
    #[error("Database error: {0}")]
    Sqlite(#[source] rusqlite::Error),
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(ffi_err, msg) if ffi_err.code == ErrorCode::ConstraintViolation => {
                PersistenceError::Constraint(msg.clone().unwrap_or_else(|| err.to_string()))
            }
            _ => PersistenceError::Sqlite(err),
        }
    }
}

/// Generic table-oriented record store.
///
/// Everything above this trait (repositories, the stage mutator) talks in
/// records and table names only, so the backing store can be swapped.
pub trait RecordStore {
    fn read(&self, table: &str, filter: &Filter) -> Result<Vec<Record>, PersistenceError>;

    /// Insert a record and return it as stored, id included
    fn insert(&self, table: &str, record: Record) -> Result<Record, PersistenceError>;

    /// Overwrite only the given columns of one row and return the updated row
    fn update(&self, table: &str, id: i64, partial: Record) -> Result<Record, PersistenceError>;

    fn delete(&self, table: &str, id: i64) -> Result<(), PersistenceError>;

    /// Run `work` so that either all of its writes land or none do.
    /// Stores without transactions run it directly.
    fn atomically(
        &self,
        work: &mut dyn FnMut(&dyn RecordStore) -> Result<(), PersistenceError>,
    ) -> Result<(), PersistenceError>;
}

/// Read a single row by id, mapping an empty result to `NotFound`
pub fn read_one(store: &dyn RecordStore, table: &str, id: i64) -> Result<Record, PersistenceError> {
    store
        .read(table, &Filter::ById(id))?
        .into_iter()
        .next()
        .ok_or_else(|| PersistenceError::NotFound { table: table.to_string(), id })
}

/// SQLite-backed record store
pub struct SqliteStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn conn(&self) -> &'c Connection {
        self.conn
    }

    fn query(&self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<Record>, PersistenceError> {
        log::trace!("{}", sql);
        let mut stmt = self.conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Record::new();
            for (i, name) in names.iter().enumerate() {
                record.insert(name.clone(), from_sql(row.get_ref(i)?, name)?);
            }
            records.push(record);
        }
        Ok(records)
    }
}

impl RecordStore for SqliteStore<'_> {
    fn read(&self, table: &str, filter: &Filter) -> Result<Vec<Record>, PersistenceError> {
        let table = check_ident(table)?;
        match filter {
            Filter::All => self.query(&format!("SELECT * FROM {} ORDER BY id", table), vec![]),
            Filter::ById(id) => self.query(
                &format!("SELECT * FROM {} WHERE id = ?1", table),
                vec![SqlValue::Integer(*id)],
            ),
            Filter::Eq(column, Value::Null) => {
                let column = check_ident(column)?;
                self.query(&format!("SELECT * FROM {} WHERE {} IS NULL ORDER BY id", table, column), vec![])
            }
            Filter::Eq(column, value) => {
                let column = check_ident(column)?;
                self.query(
                    &format!("SELECT * FROM {} WHERE {} = ?1 ORDER BY id", table, column),
                    vec![to_sql(value)],
                )
            }
        }
    }

    fn insert(&self, table: &str, mut record: Record) -> Result<Record, PersistenceError> {
        let table = check_ident(table)?;
        if matches!(record.get("id"), Some(Value::Null)) {
            record.remove("id");
        }

        let mut columns = Vec::with_capacity(record.len());
        let mut placeholders = Vec::with_capacity(record.len());
        let mut params = Vec::with_capacity(record.len());
        for (i, (column, value)) in record.iter().enumerate() {
            columns.push(check_ident(column)?);
            placeholders.push(format!("?{}", i + 1));
            params.push(to_sql(value));
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        );
        self.conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?;

        let id = self.conn.last_insert_rowid();
        read_one(self, table, id)
    }

    fn update(&self, table: &str, id: i64, mut partial: Record) -> Result<Record, PersistenceError> {
        let table = check_ident(table)?;
        partial.remove("id");
        if partial.is_empty() {
            return read_one(self, table, id);
        }

        let mut sets = Vec::with_capacity(partial.len());
        let mut params = Vec::with_capacity(partial.len() + 1);
        for (i, (column, value)) in partial.iter().enumerate() {
            sets.push(format!("{} = ?{}", check_ident(column)?, i + 1));
            params.push(to_sql(value));
        }
        let sql = format!("UPDATE {} SET {} WHERE id = ?{}", table, sets.join(", "), params.len() + 1);
        params.push(SqlValue::Integer(id));

        let updated = self.conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?;
        if updated == 0 {
            return Err(PersistenceError::NotFound { table: table.to_string(), id });
        }
        read_one(self, table, id)
    }

    fn delete(&self, table: &str, id: i64) -> Result<(), PersistenceError> {
        let table = check_ident(table)?;
        let deleted = self.conn.execute(&format!("DELETE FROM {} WHERE id = ?1", table), [id])?;
        if deleted == 0 {
            return Err(PersistenceError::NotFound { table: table.to_string(), id });
        }
        Ok(())
    }

    fn atomically(
        &self,
        work: &mut dyn FnMut(&dyn RecordStore) -> Result<(), PersistenceError>,
    ) -> Result<(), PersistenceError> {
        // Dropping the transaction without commit rolls it back
        let tx = self.conn.unchecked_transaction()?;
        work(self)?;
        tx.commit()?;
        Ok(())
    }
}

/// Table and column names are interpolated into SQL, so only plain
/// lowercase identifiers are accepted.
fn check_ident(name: &str) -> Result<&str, PersistenceError> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(name)
    } else {
        Err(PersistenceError::InvalidIdentifier(name.to_string()))
    }
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(*b as i64),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(0.0)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_sql(value: ValueRef<'_>, column: &str) -> Result<Value, PersistenceError> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(i) => Ok(Value::from(i)),
        ValueRef::Real(f) => Ok(serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|s| Value::String(s.to_string()))
            .map_err(|e| PersistenceError::Decode(format!("column '{}' is not valid UTF-8: {}", column, e))),
        ValueRef::Blob(_) => Err(PersistenceError::Decode(format!("column '{}' holds a blob", column))),
    }
}
