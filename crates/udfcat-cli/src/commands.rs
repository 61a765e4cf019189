//! Statement execution for the metastore tool.
//!
//! Every statement works on raw [`StoredFunction`] entities, the way an
//! external metastore client sees them: one entity per function name, a
//! class and a JAR, no signature and no engine properties.

use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;
use thiserror::Error;

use udfcat_core::{CatalogError, DatabaseName, FunctionName, NamePattern};
use udfcat_storage::{MetastoreClient, ResourceType, StorageError, StoredFunction};

/// Owner recorded on databases and functions created by this tool.
pub const TOOL_OWNER: &str = "hive";

/// Failure of one statement.
#[derive(Debug, Error)]
pub enum CliError {
    /// The statement was rejected: bad name, missing or duplicate object.
    #[error("{0}")]
    Statement(String),

    /// The store could not be read or written.
    #[error("metastore error: {0}")]
    Store(StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code: 1 for a rejected statement, 2 for an I/O or
    /// store failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Statement(_) => 1,
            CliError::Store(_) | CliError::Io(_) => 2,
        }
    }
}

impl From<StorageError> for CliError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DatabaseNotFound(db) => {
                CliError::Statement(format!("Database '{db}' does not exist."))
            }
            StorageError::DatabaseAlreadyExists(db) => {
                CliError::Statement(format!("Database '{db}' already exists."))
            }
            StorageError::DatabaseNotEmpty { database, functions } => CliError::Statement(format!(
                "Database '{database}' is not empty ({functions} functions). Use --cascade."
            )),
            StorageError::AlreadyExists(key) => {
                CliError::Statement(format!("Function '{key}' already exists."))
            }
            StorageError::FunctionNotFound(key) => {
                CliError::Statement(format!("Function '{key}' does not exist."))
            }
            other => CliError::Store(other),
        }
    }
}

impl From<CatalogError> for CliError {
    fn from(err: CatalogError) -> Self {
        CliError::Statement(err.to_string())
    }
}

/// One statement, already parsed from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    CreateDatabase {
        name: String,
        if_not_exists: bool,
    },
    DropDatabase {
        name: String,
        cascade: bool,
        if_exists: bool,
    },
    CreateFunction {
        database: String,
        name: String,
        class: String,
        jar: String,
    },
    DropFunction {
        database: String,
        name: String,
        if_exists: bool,
    },
    DescribeFunction {
        database: String,
        name: String,
        json: bool,
    },
    ShowFunctions {
        database: String,
        like: Option<String>,
    },
}

/// Executes `statement` against `store`, writing results to `out`.
pub fn execute(store: &dyn MetastoreClient, statement: &Statement, out: &mut dyn Write) -> Result<(), CliError> {
    match statement {
        Statement::CreateDatabase { name, if_not_exists } => {
            let db = DatabaseName::new(name)?;
            if !store.create_database(db.as_str(), TOOL_OWNER, *if_not_exists)? {
                writeln!(out, "Database '{db}' already exists, skipped.")?;
            }
        }
        Statement::DropDatabase {
            name,
            cascade,
            if_exists,
        } => {
            let db = DatabaseName::new(name)?;
            match store.drop_database(db.as_str(), *cascade) {
                Ok(()) => {}
                Err(StorageError::DatabaseNotFound(_)) if *if_exists => {}
                Err(e) => return Err(e.into()),
            }
        }
        Statement::CreateFunction {
            database,
            name,
            class,
            jar,
        } => {
            let entity = external_entity(database, name, class, jar)?;
            if !store
                .get_functions_by_name(&entity.database, &entity.name)?
                .is_empty()
            {
                return Err(CliError::Statement(format!(
                    "Function '{}.{}' already exists.",
                    entity.database, entity.name
                )));
            }
            store.create_functions(&[entity])?;
        }
        Statement::DropFunction {
            database,
            name,
            if_exists,
        } => {
            let (db, fn_name) = qualified(database, name)?;
            let keys: Vec<_> = store
                .get_functions_by_name(db.as_str(), fn_name.as_str())?
                .iter()
                .map(StoredFunction::key)
                .collect();
            if keys.is_empty() {
                if *if_exists {
                    return Ok(());
                }
                return Err(CliError::Statement(format!(
                    "Function '{db}.{fn_name}' does not exist."
                )));
            }
            store.drop_functions(&keys)?;
        }
        Statement::DescribeFunction {
            database,
            name,
            json,
        } => {
            let (db, fn_name) = qualified(database, name)?;
            let entities = store.get_functions_by_name(db.as_str(), fn_name.as_str())?;
            if *json {
                let text = serde_json::to_string_pretty(&entities)
                    .map_err(|e| CliError::Store(StorageError::Serialization(e)))?;
                writeln!(out, "{text}")?;
            } else if entities.is_empty() {
                writeln!(out, "Function '{db}.{fn_name}' does not exist.")?;
            } else {
                for entity in &entities {
                    describe(entity, out)?;
                }
            }
        }
        Statement::ShowFunctions { database, like } => {
            let db = DatabaseName::new(database)?;
            let pattern = match like {
                Some(like) => NamePattern::new(like)?,
                None => NamePattern::any(),
            };
            let mut names: Vec<String> = store
                .list_functions(db.as_str())?
                .into_iter()
                .filter(|f| pattern.matches(&f.name))
                .map(|f| f.name)
                .collect();
            names.dedup();
            for name in names {
                writeln!(out, "{db}.{name}")?;
            }
        }
    }
    Ok(())
}

fn qualified(database: &str, name: &str) -> Result<(DatabaseName, FunctionName), CliError> {
    Ok((DatabaseName::new(database)?, FunctionName::new(name)?))
}

/// Builds the entity an external metastore client writes for
/// `CREATE FUNCTION db.name AS 'class' USING JAR 'jar'`.
pub fn external_entity(database: &str, name: &str, class: &str, jar: &str) -> Result<StoredFunction, CliError> {
    let (db, fn_name) = qualified(database, name)?;
    if class.trim().is_empty() {
        return Err(CliError::Statement("class name is empty".into()));
    }
    if jar.trim().is_empty() {
        return Err(CliError::Statement("JAR path is empty".into()));
    }
    let create_time = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default();

    Ok(StoredFunction {
        database: db.as_str().to_string(),
        name: fn_name.as_str().to_string(),
        signature: None,
        class_name: class.trim().to_string(),
        resource_uri: jar.trim().to_string(),
        resource_type: ResourceType::Jar,
        owner: TOOL_OWNER.to_string(),
        create_time,
        properties: IndexMap::new(),
    })
}

fn describe(entity: &StoredFunction, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "Function: {}.{}", entity.database, entity.name)?;
    if let Some(signature) = &entity.signature {
        writeln!(out, "Signature: ({signature})")?;
    }
    writeln!(out, "Class: {}", entity.class_name)?;
    writeln!(out, "Resource: {} {}", entity.resource_type, entity.resource_uri)?;
    writeln!(out, "Owner: {}", entity.owner)?;
    for (key, value) in &entity.properties {
        writeln!(out, "Property: {key}={value}")?;
    }
    Ok(())
}
