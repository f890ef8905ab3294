use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{AttributeSchema, Entity};

/// Record predicate. Field names must be declared by the queried schema;
/// `"id"` matches the record identity.
#[derive(Debug, Clone)]
pub enum Filter<'a> {
    All,
    Eq(&'a str, Value),
    In(&'a str, Vec<Value>),
}

impl Filter<'_> {
    pub fn id(id: &str) -> Filter<'static> {
        Filter::Eq("id", Value::String(id.to_string()))
    }

    pub fn ids<I, S>(ids: I) -> Filter<'static>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::In("id", ids.into_iter().map(|s| Value::String(s.into())).collect())
    }

    /// SQL condition and its parameters, appended after `entity_type = ?1`.
    fn to_sql(&self, schema: &AttributeSchema) -> Result<(String, Vec<SqlValue>)> {
        match self {
            Filter::All => Ok((String::new(), Vec::new())),
            Filter::Eq(field, value) => {
                let (column, mut params) = column(schema, field)?;
                if value.is_null() {
                    return Ok((format!(" AND {} IS NULL", column), params));
                }
                params.push(to_sql_value(value));
                Ok((format!(" AND {} = ?", column), params))
            }
            Filter::In(_, values) if values.is_empty() => Ok((" AND 0".to_string(), Vec::new())),
            Filter::In(field, values) => {
                let (column, mut params) = column(schema, field)?;
                let placeholders = vec!["?"; values.len()].join(", ");
                params.extend(values.iter().map(to_sql_value));
                Ok((format!(" AND {} IN ({})", column, placeholders), params))
            }
        }
    }
}

fn column(schema: &AttributeSchema, field: &str) -> Result<(String, Vec<SqlValue>)> {
    if field == "id" {
        return Ok(("id".to_string(), Vec::new()));
    }
    if schema.field(field).is_none() {
        return Err(Error::InvalidInput(format!(
            "{} has no field '{}'",
            schema.entity_type, field
        )));
    }
    Ok((
        "json_extract(data, ?)".to_string(),
        vec![SqlValue::Text(format!("$.{}", field))],
    ))
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file and create tables
    pub fn new(database_path: &str) -> Result<Self> {
        let conn = Connection::open(database_path)?;
        Self::init(conn)
    }

    /// Private in-memory database, used by tests and tooling
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS records (
                entity_type TEXT NOT NULL,
                id TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (entity_type, id)
            )",
            [],
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` as one unit of work: commit if it returns `Ok`, roll back otherwise.
    ///
    /// The connection lock is held for the whole transaction, so concurrent
    /// callers are linearized.
    pub fn transact<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Tx<'_>) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        let tx = Tx {
            tx: conn.transaction()?,
        };

        match f(&tx) {
            Ok(value) => {
                tx.tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                warn!("Transaction rolled back: {}", e);
                if let Err(rollback) = tx.tx.rollback() {
                    warn!("Rollback failed: {}", rollback);
                }
                Err(e)
            }
        }
    }
}

/// An open transaction on the record store.
pub struct Tx<'c> {
    tx: Transaction<'c>,
}

impl Tx<'_> {
    /// All records of `schema` matching `filter`, in insertion order.
    pub fn find(&self, schema: &'static AttributeSchema, filter: &Filter) -> Result<Vec<Entity>> {
        let (condition, mut params) = filter.to_sql(schema)?;
        params.insert(0, SqlValue::Text(schema.entity_type.to_string()));

        let mut stmt = self.tx.prepare(&format!(
            "SELECT id, data FROM records WHERE entity_type = ?{} ORDER BY rowid",
            condition
        ))?;
        let rows = stmt
            .query_map(params_from_iter(params), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.iter()
            .map(|(id, data)| Entity::from_record(schema, id, &serde_json::from_str::<Value>(data)?))
            .collect()
    }

    /// First matching record, if any.
    pub fn find_one(&self, schema: &'static AttributeSchema, filter: &Filter) -> Result<Option<Entity>> {
        Ok(self.find(schema, filter)?.into_iter().next())
    }

    /// Record by id; `NotFound` when missing.
    pub fn get(&self, schema: &'static AttributeSchema, id: &str) -> Result<Entity> {
        let data: Option<String> = self
            .tx
            .query_row(
                "SELECT data FROM records WHERE entity_type = ?1 AND id = ?2",
                params![schema.entity_type, id],
                |row| row.get(0),
            )
            .optional()?;

        match data {
            Some(data) => Entity::from_record(schema, id, &serde_json::from_str::<Value>(&data)?),
            None => Err(Error::not_found(schema.entity_type, id)),
        }
    }

    pub fn exists(&self, schema: &'static AttributeSchema, id: &str) -> Result<bool> {
        Ok(self.count(schema, &Filter::id(id))? > 0)
    }

    /// Insert a new record; fails if the id is already taken.
    pub fn insert(&self, entity: &Entity) -> Result<()> {
        self.tx.execute(
            "INSERT INTO records (entity_type, id, data) VALUES (?1, ?2, ?3)",
            params![entity.entity_type(), entity.id(), entity.to_record().to_string()],
        )?;
        debug!("Inserted {} {}", entity.entity_type(), entity.id());
        Ok(())
    }

    /// Insert or overwrite a record.
    pub fn save(&self, entity: &Entity) -> Result<()> {
        self.tx.execute(
            "INSERT INTO records (entity_type, id, data) VALUES (?1, ?2, ?3)
             ON CONFLICT (entity_type, id) DO UPDATE SET data = excluded.data",
            params![entity.entity_type(), entity.id(), entity.to_record().to_string()],
        )?;
        Ok(())
    }

    /// Delete matching records, returning how many were removed.
    pub fn delete(&self, schema: &'static AttributeSchema, filter: &Filter) -> Result<usize> {
        let (condition, mut params) = filter.to_sql(schema)?;
        params.insert(0, SqlValue::Text(schema.entity_type.to_string()));

        let removed = self.tx.execute(
            &format!("DELETE FROM records WHERE entity_type = ?{}", condition),
            params_from_iter(params),
        )?;
        Ok(removed)
    }

    /// Set `field` to `value` on every matching record.
    pub fn bulk_set(
        &self,
        schema: &'static AttributeSchema,
        filter: &Filter,
        field: &str,
        value: &Value,
    ) -> Result<usize> {
        if schema.field(field).is_none() {
            return Err(Error::InvalidInput(format!(
                "{} has no field '{}'",
                schema.entity_type, field
            )));
        }
        let (condition, filter_params) = filter.to_sql(schema)?;

        let mut params = vec![
            SqlValue::Text(format!("$.{}", field)),
            SqlValue::Text(value.to_string()),
            SqlValue::Text(schema.entity_type.to_string()),
        ];
        params.extend(filter_params);

        let updated = self.tx.execute(
            &format!(
                "UPDATE records SET data = json_set(data, ?, json(?)) WHERE entity_type = ?{}",
                condition
            ),
            params_from_iter(params),
        )?;
        Ok(updated)
    }

    pub fn count(&self, schema: &'static AttributeSchema, filter: &Filter) -> Result<usize> {
        let (condition, mut params) = filter.to_sql(schema)?;
        params.insert(0, SqlValue::Text(schema.entity_type.to_string()));

        let count: i64 = self.tx.query_row(
            &format!("SELECT COUNT(*) FROM records WHERE entity_type = ?{}", condition),
            params_from_iter(params),
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
