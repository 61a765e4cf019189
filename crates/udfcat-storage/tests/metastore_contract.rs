//! Both metastore backends must behave identically.

use indexmap::IndexMap;
use udfcat_storage::{
    FunctionKey, InMemoryMetastore, MetastoreClient, ResourceType, SqliteMetastore, StorageError,
    StoredFunction,
};

fn entity(db: &str, name: &str, signature: Option<&str>) -> StoredFunction {
    StoredFunction {
        database: db.into(),
        name: name.into(),
        signature: signature.map(str::to_string),
        class_name: "org.apache.impala.TestUdf".into(),
        resource_uri: "/test-warehouse/udfs.jar".into(),
        resource_type: ResourceType::Jar,
        owner: "hive".into(),
        create_time: 42,
        properties: IndexMap::new(),
    }
}

fn exercise(store: &dyn MetastoreClient) {
    assert!(store.create_database("b_db", "hive", false).unwrap());
    assert!(store.create_database("a_db", "hive", false).unwrap());
    assert!(!store.create_database("a_db", "hive", true).unwrap());
    assert!(matches!(
        store.create_database("a_db", "hive", false),
        Err(StorageError::DatabaseAlreadyExists(_))
    ));
    assert_eq!(store.list_databases().unwrap(), vec!["a_db", "b_db"]);

    store
        .create_functions(&[
            entity("a_db", "zeta", Some("int")),
            entity("a_db", "alpha", Some("string")),
            entity("a_db", "alpha", Some("int")),
            entity("a_db", "external", None),
        ])
        .unwrap();

    let names: Vec<(String, Option<String>)> = store
        .list_functions("a_db")
        .unwrap()
        .into_iter()
        .map(|f| (f.name, f.signature))
        .collect();
    assert_eq!(
        names,
        vec![
            ("alpha".to_string(), Some("int".to_string())),
            ("alpha".to_string(), Some("string".to_string())),
            ("external".to_string(), None),
            ("zeta".to_string(), Some("int".to_string())),
        ]
    );
    assert_eq!(store.get_functions_by_name("a_db", "alpha").unwrap().len(), 2);
    assert!(store.get_functions_by_name("a_db", "missing").unwrap().is_empty());

    assert!(matches!(
        store.create_functions(&[entity("missing_db", "f", None)]),
        Err(StorageError::DatabaseNotFound(_))
    ));

    store
        .drop_functions(&[
            FunctionKey::new("a_db", "alpha", Some("int")),
            FunctionKey::new("a_db", "external", None),
        ])
        .unwrap();
    assert_eq!(store.list_functions("a_db").unwrap().len(), 2);

    // A class-level entity is swapped for per-overload entities in one write.
    store.create_functions(&[entity("a_db", "klass", None)]).unwrap();
    assert!(matches!(
        store.replace_functions(
            &[FunctionKey::new("a_db", "klass", None)],
            &[entity("a_db", "zeta", Some("int"))],
        ),
        Err(StorageError::AlreadyExists(_))
    ));
    assert_eq!(store.get_functions_by_name("a_db", "klass").unwrap().len(), 1);
    store
        .replace_functions(
            &[FunctionKey::new("a_db", "klass", None)],
            &[entity("a_db", "klass", Some("boolean"))],
        )
        .unwrap();
    let klass = store.get_functions_by_name("a_db", "klass").unwrap();
    assert_eq!(klass.len(), 1);
    assert_eq!(klass[0].signature.as_deref(), Some("boolean"));
    store
        .drop_functions(&[FunctionKey::new("a_db", "klass", Some("boolean"))])
        .unwrap();

    assert!(matches!(
        store.drop_database("a_db", false),
        Err(StorageError::DatabaseNotEmpty { functions: 2, .. })
    ));
    store.drop_database("a_db", true).unwrap();
    store.drop_database("b_db", false).unwrap();
    assert!(store.list_databases().unwrap().is_empty());
    assert!(matches!(
        store.drop_database("b_db", false),
        Err(StorageError::DatabaseNotFound(_))
    ));
}

#[test]
fn in_memory_backend_contract() {
    exercise(&InMemoryMetastore::new());
}

#[test]
fn sqlite_backend_contract() {
    exercise(&SqliteMetastore::in_memory().unwrap());
}

#[test]
fn sqlite_file_is_shared_between_handles() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metastore.db");
    let path = path.to_str().unwrap();

    let engine = SqliteMetastore::new(path).unwrap();
    let tool = SqliteMetastore::new(path).unwrap();
    engine.create_database("udf_test", "udfcat", false).unwrap();
    tool.create_functions(&[entity("udf_test", "identity", None)]).unwrap();

    let seen = engine.list_functions("udf_test").unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].create_time, 42);

    drop(engine);
    let reopened = SqliteMetastore::new(path).unwrap();
    assert_eq!(reopened.list_functions("udf_test").unwrap().len(), 1);
}
