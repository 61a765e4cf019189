//! SQLite implementation of [`MetastoreClient`].
//!
//! [`SqliteMetastore`] keeps databases and function entities in a SQLite
//! file with WAL mode, one transaction per write, and automatic schema
//! migrations. The property bag is stored as a JSON TEXT column.

use std::sync::{Mutex, MutexGuard};

use indexmap::IndexMap;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::StorageError;
use crate::traits::MetastoreClient;
use crate::types::{signature_column, signature_from_column, FunctionKey, ResourceType, StoredFunction};

const FUNCTION_COLUMNS: &str = "db_name, fn_name, signature, class_name, resource_uri, \
     resource_type, owner, create_time, properties_json";

/// SQLite-backed implementation of [`MetastoreClient`].
///
/// The connection is serialized behind a mutex; several processes may
/// open the same file.
pub struct SqliteMetastore {
    conn: Mutex<Connection>,
}

impl SqliteMetastore {
    /// Opens (or creates) a metastore at `path`.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = crate::schema::open_database(path)?;
        Ok(SqliteMetastore {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an in-memory metastore (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteMetastore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Unreachable("sqlite connection lock poisoned".into()))
    }

    fn database_exists_in(conn: &Connection, name: &str) -> Result<bool, StorageError> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM databases WHERE name = ?1)",
            params![name],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn require_database(conn: &Connection, name: &str) -> Result<(), StorageError> {
        if !Self::database_exists_in(conn, name)? {
            return Err(StorageError::DatabaseNotFound(name.to_string()));
        }
        Ok(())
    }

    /// Raw column values of one function row.
    #[allow(clippy::type_complexity)]
    fn read_row(
        row: &Row<'_>,
    ) -> rusqlite::Result<(String, String, String, String, String, String, String, i64, String)> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
            row.get(8)?,
        ))
    }

    fn query_functions(
        conn: &Connection,
        sql: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<StoredFunction>, StorageError> {
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt.query_map(args, Self::read_row)?;
        let mut result = Vec::new();
        for row in rows {
            let (database, name, signature, class_name, resource_uri, resource_type, owner, create_time, properties_json) =
                row?;
            let resource_type: ResourceType =
                resource_type
                    .parse()
                    .map_err(|reason| StorageError::Decode {
                        key: format!("{database}.{name}"),
                        reason,
                    })?;
            let properties: IndexMap<String, String> = serde_json::from_str(&properties_json)?;
            result.push(StoredFunction {
                database,
                name,
                signature: signature_from_column(&signature),
                class_name,
                resource_uri,
                resource_type,
                owner,
                create_time,
                properties,
            });
        }
        Ok(result)
    }
}

impl MetastoreClient for SqliteMetastore {
    fn create_database(&self, name: &str, owner: &str, if_not_exists: bool) -> Result<bool, StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        if Self::database_exists_in(&tx, name)? {
            if if_not_exists {
                return Ok(false);
            }
            return Err(StorageError::DatabaseAlreadyExists(name.to_string()));
        }
        tx.execute(
            "INSERT INTO databases (name, owner, create_time) VALUES (?1, ?2, strftime('%s', 'now'))",
            params![name, owner],
        )?;
        tx.commit()?;
        Ok(true)
    }

    fn drop_database(&self, name: &str, cascade: bool) -> Result<(), StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        Self::require_database(&tx, name)?;
        let functions: i64 = tx.query_row(
            "SELECT COUNT(*) FROM functions WHERE db_name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        if functions > 0 && !cascade {
            return Err(StorageError::DatabaseNotEmpty {
                database: name.to_string(),
                functions: functions as usize,
            });
        }
        // Functions go with the database via ON DELETE CASCADE.
        tx.execute("DELETE FROM databases WHERE name = ?1", params![name])?;
        tx.commit()?;
        Ok(())
    }

    fn list_databases(&self) -> Result<Vec<String>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached("SELECT name FROM databases ORDER BY name")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    fn database_exists(&self, name: &str) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        Self::database_exists_in(&conn, name)
    }

    fn list_functions(&self, database: &str) -> Result<Vec<StoredFunction>, StorageError> {
        let conn = self.conn()?;
        Self::require_database(&conn, database)?;
        Self::query_functions(
            &conn,
            &format!("SELECT {FUNCTION_COLUMNS} FROM functions WHERE db_name = ?1 ORDER BY fn_name, signature"),
            params![database],
        )
    }

    fn get_functions_by_name(&self, database: &str, name: &str) -> Result<Vec<StoredFunction>, StorageError> {
        let conn = self.conn()?;
        Self::require_database(&conn, database)?;
        Self::query_functions(
            &conn,
            &format!(
                "SELECT {FUNCTION_COLUMNS} FROM functions WHERE db_name = ?1 AND fn_name = ?2 ORDER BY signature"
            ),
            params![database, name],
        )
    }

    fn create_functions(&self, batch: &[StoredFunction]) -> Result<(), StorageError> {
        self.replace_functions(&[], batch)
    }

    fn drop_functions(&self, keys: &[FunctionKey]) -> Result<(), StorageError> {
        self.replace_functions(keys, &[])
    }

    fn replace_functions(&self, drop: &[FunctionKey], create: &[StoredFunction]) -> Result<(), StorageError> {
        let mut conn = self.conn()?;
        // Returning early drops `tx`, which rolls the whole batch back.
        let tx = conn.transaction()?;
        for key in drop {
            let deleted = tx.execute(
                "DELETE FROM functions WHERE db_name = ?1 AND fn_name = ?2 AND signature = ?3",
                params![key.database, key.name, key.signature_column()],
            )?;
            if deleted == 0 {
                return Err(StorageError::FunctionNotFound(key.to_string()));
            }
        }
        for f in create {
            Self::require_database(&tx, &f.database)?;
            let signature = signature_column(f.signature.as_deref());
            let exists: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM functions WHERE db_name = ?1 AND fn_name = ?2 AND signature = ?3",
                    params![f.database, f.name, signature],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_some() {
                return Err(StorageError::AlreadyExists(f.key().to_string()));
            }
            let properties_json = serde_json::to_string(&f.properties)?;
            tx.execute(
                &format!("INSERT INTO functions ({FUNCTION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
                params![
                    f.database,
                    f.name,
                    signature,
                    f.class_name,
                    f.resource_uri,
                    f.resource_type.to_string(),
                    f.owner,
                    f.create_time,
                    properties_json,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::props;

    fn entity(name: &str, signature: Option<&str>) -> StoredFunction {
        let mut properties = IndexMap::new();
        properties.insert(props::KIND.to_string(), props::KIND_NATIVE_SCALAR.to_string());
        properties.insert(props::RETURN_TYPE.to_string(), "int".to_string());
        StoredFunction {
            database: "db".into(),
            name: name.into(),
            signature: signature.map(str::to_string),
            class_name: "Identity".into(),
            resource_uri: "/lib/libTestUdfs.so".into(),
            resource_type: ResourceType::Library,
            owner: "test".into(),
            create_time: 1_700_000_000,
            properties,
        }
    }

    fn store() -> SqliteMetastore {
        let store = SqliteMetastore::in_memory().unwrap();
        store.create_database("db", "test", false).unwrap();
        store
    }

    #[test]
    fn functions_roundtrip_with_properties_in_order() {
        let store = store();
        let f = entity("identity", Some("int"));
        store.create_functions(&[f.clone()]).unwrap();
        let loaded = store.list_functions("db").unwrap();
        assert_eq!(loaded, vec![f]);
        let keys: Vec<&String> = loaded[0].properties.keys().collect();
        assert_eq!(keys, vec![props::KIND, props::RETURN_TYPE]);
    }

    #[test]
    fn zero_argument_and_missing_signature_are_distinct() {
        let store = store();
        store
            .create_functions(&[entity("f", Some("")), entity("f", None)])
            .unwrap();
        let loaded = store.get_functions_by_name("db", "f").unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.iter().any(|f| f.signature.is_none()));
        assert!(loaded.iter().any(|f| f.signature.as_deref() == Some("")));
    }

    #[test]
    fn duplicate_in_batch_rolls_back() {
        let store = store();
        let err = store
            .create_functions(&[entity("a", Some("int")), entity("a", Some("int"))])
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
        assert!(store.list_functions("db").unwrap().is_empty());
    }

    #[test]
    fn missing_key_fails_drop_batch() {
        let store = store();
        store.create_functions(&[entity("a", Some("int"))]).unwrap();
        let err = store
            .drop_functions(&[
                FunctionKey::new("db", "a", Some("int")),
                FunctionKey::new("db", "b", Some("int")),
            ])
            .unwrap_err();
        assert!(matches!(err, StorageError::FunctionNotFound(_)));
        assert_eq!(store.list_functions("db").unwrap().len(), 1);
    }

    #[test]
    fn cascade_drop_removes_functions() {
        let store = store();
        store.create_functions(&[entity("a", Some("int"))]).unwrap();
        assert!(matches!(
            store.drop_database("db", false),
            Err(StorageError::DatabaseNotEmpty { .. })
        ));
        store.drop_database("db", true).unwrap();
        store.create_database("db", "test", false).unwrap();
        assert!(store.list_functions("db").unwrap().is_empty());
    }

    #[test]
    fn unknown_database_is_reported() {
        let store = store();
        assert!(matches!(
            store.list_functions("other"),
            Err(StorageError::DatabaseNotFound(_))
        ));
        assert!(!store.create_database("db", "test", true).unwrap());
    }
}
