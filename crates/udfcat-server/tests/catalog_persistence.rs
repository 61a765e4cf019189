//! End-to-end tests for the catalog HTTP API.
//!
//! Tests exercise the full stack: HTTP request -> axum router -> handler ->
//! CatalogService -> registry/resolver/metastore -> HTTP response.
//!
//! Each test builds an AppState over its own metastore: an
//! InMemoryMetastore when the test needs to inject failures, a temp SQLite
//! file when it needs a restart (a second AppState over the same file) or
//! an external writer (a second SqliteMetastore handle).

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use indexmap::IndexMap;
use serde_json::json;
use tower::ServiceExt;

use udfcat_resolve::jvm::mapping::UDF_BASE_CLASS;
use udfcat_resolve::{ClassDescriptor, MethodDescriptor, SymbolManifest, SymbolResolver};
use udfcat_server::router::build_router;
use udfcat_server::state::AppState;
use udfcat_storage::{
    FunctionKey, InMemoryMetastore, MetastoreClient, ResourceType, SqliteMetastore, StoredFunction,
};

const LIB: &str = "/test-warehouse/libTestUdfs.so";
const UDA_LIB: &str = "/test-warehouse/libudasample.so";
const JAR: &str = "/test-warehouse/impala-hive-udfs.jar";
const DB: &str = "udf_test";

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn evaluate(params: &[&str], ret: &str) -> MethodDescriptor {
    MethodDescriptor {
        name: "evaluate".into(),
        params: params.iter().map(|p| p.to_string()).collect(),
        return_type: ret.into(),
        varargs: false,
    }
}

fn udf_class(class_name: &str, methods: Vec<MethodDescriptor>) -> ClassDescriptor {
    ClassDescriptor {
        class_name: class_name.into(),
        superclasses: vec![UDF_BASE_CLASS.into()],
        methods,
    }
}

/// Libraries and classes visible to the resolver in every test.
fn resolver() -> SymbolResolver {
    let mut scalars: Vec<String> = (0..12).map(|i| format!("ScalarFn{i}")).collect();
    scalars.push("_Z8IdentityPN10impala_udf15FunctionContextERKNS_6IntValE".into());
    let aggregates: Vec<String> = (0..4)
        .flat_map(|i| ["Init", "Update", "Merge"].map(|phase| format!("Agg{i}{phase}")))
        .collect();

    let mut varargs = evaluate(&["int"], "int");
    varargs.varargs = true;
    let test_udf = udf_class(
        "org.apache.impala.TestUdf",
        vec![
            evaluate(&["int"], "int"),
            evaluate(&["java.lang.String"], "java.lang.String"),
            evaluate(&["boolean"], "boolean"),
            evaluate(&["java.util.List"], "int"),
            evaluate(&["int"], "void"),
            evaluate(&["java.util.Map"], "java.util.Map"),
            evaluate(&["char"], "char"),
            varargs,
        ],
    );

    SymbolResolver::from_manifest(
        SymbolManifest::new()
            .with_library(LIB, scalars)
            .with_library(UDA_LIB, aggregates)
            .with_class(JAR, test_udf)
            .with_class(
                JAR,
                udf_class(
                    "org.apache.impala.BadUdf",
                    vec![evaluate(&["java.util.List"], "java.util.List")],
                ),
            )
            .with_class(
                JAR,
                udf_class(
                    "org.apache.impala.ExternalUdf",
                    vec![
                        evaluate(&["int"], "int"),
                        evaluate(&["java.lang.String"], "java.lang.String"),
                    ],
                ),
            ),
    )
}

async fn app_over(store: Arc<dyn MetastoreClient>) -> Router {
    let state = AppState::with_store(store, resolver(), Duration::from_secs(5))
        .await
        .expect("failed to create AppState");
    build_router(state)
}

/// Sends a request with an optional JSON body and returns (status, json).
async fn request_json(
    app: &Router,
    method: Method,
    path: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(path);
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(json!(null));
    (status, json)
}

async fn post_json(app: &Router, path: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    request_json(app, Method::POST, path, Some(body)).await
}

async fn get_json(app: &Router, path: &str) -> (StatusCode, serde_json::Value) {
    request_json(app, Method::GET, path, None).await
}

fn error_code(body: &serde_json::Value) -> &str {
    body["error"]["code"].as_str().unwrap_or("")
}

async fn create_db(app: &Router) {
    let (status, body) = post_json(app, "/databases", json!({ "name": DB })).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}

async fn create_scalar(app: &Router, i: usize) {
    let (status, body) = post_json(
        app,
        &format!("/databases/{DB}/functions"),
        json!({
            "name": format!("fn_{i}"),
            "location": LIB,
            "symbol": format!("ScalarFn{i}"),
            "args": "int",
            "returns": "int",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}

async fn create_aggregate(app: &Router, i: usize) {
    let (status, body) = post_json(
        app,
        &format!("/databases/{DB}/aggregate-functions"),
        json!({
            "name": format!("agg_{i}"),
            "location": UDA_LIB,
            "args": "int",
            "returns": "bigint",
            "update_fn": format!("Agg{i}Update"),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}

async fn create_java_class(app: &Router, name: &str, class_name: &str) -> (StatusCode, serde_json::Value) {
    post_json(
        app,
        &format!("/databases/{DB}/functions"),
        json!({ "name": name, "location": JAR, "symbol": class_name }),
    )
    .await
}

async fn show(app: &Router, kind: &str) -> Vec<serde_json::Value> {
    let (status, body) = get_json(app, &format!("/databases/{DB}/{kind}")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["rows"].as_array().cloned().unwrap_or_default()
}

async fn scalar_count(app: &Router) -> usize {
    show(app, "functions").await.len()
}

async fn aggregate_count(app: &Router) -> usize {
    show(app, "aggregate-functions").await.len()
}

async fn invalidate(app: &Router) -> serde_json::Value {
    let (status, body) = post_json(app, "/invalidate-metadata", json!({})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body
}

/// A function entity as the external metastore tool writes it.
fn external_entity(name: &str, class_name: &str) -> StoredFunction {
    StoredFunction {
        database: DB.into(),
        name: name.into(),
        signature: None,
        class_name: class_name.into(),
        resource_uri: JAR.into(),
        resource_type: ResourceType::Jar,
        owner: "hive".into(),
        create_time: 1_700_000_000,
        properties: IndexMap::new(),
    }
}

// ---------------------------------------------------------------------------
// Persistence across invalidation and restart
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_counts_survive_invalidate_and_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metastore.db");
    let path = path.to_str().unwrap();

    let app = app_over(Arc::new(SqliteMetastore::new(path).unwrap())).await;
    create_db(&app).await;
    for i in 0..12 {
        create_scalar(&app, i).await;
    }
    for i in 0..4 {
        create_aggregate(&app, i).await;
    }
    assert_eq!(scalar_count(&app).await, 12);
    assert_eq!(aggregate_count(&app).await, 4);

    let report = invalidate(&app).await;
    assert_eq!(report["functions"], 16);
    assert_eq!(scalar_count(&app).await, 12);
    assert_eq!(aggregate_count(&app).await, 4);

    drop(app);
    let restarted = app_over(Arc::new(SqliteMetastore::new(path).unwrap())).await;
    assert_eq!(scalar_count(&restarted).await, 12);
    assert_eq!(aggregate_count(&restarted).await, 4);
}

#[tokio::test]
async fn test_dropped_aggregate_stays_dropped_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metastore.db");
    let path = path.to_str().unwrap();

    let app = app_over(Arc::new(SqliteMetastore::new(path).unwrap())).await;
    create_db(&app).await;
    for i in 0..4 {
        create_aggregate(&app, i).await;
    }
    let (status, body) = post_json(
        &app,
        &format!("/databases/{DB}/functions/drop"),
        json!({ "name": "agg_2", "args": "int" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["dropped"], json!(["agg_2(INT)"]));
    assert_eq!(aggregate_count(&app).await, 3);

    drop(app);
    let restarted = app_over(Arc::new(SqliteMetastore::new(path).unwrap())).await;
    assert_eq!(aggregate_count(&restarted).await, 3);
}

#[tokio::test]
async fn test_show_result_set_shape() {
    let app = app_over(Arc::new(InMemoryMetastore::new())).await;
    create_db(&app).await;
    let (status, body) = post_json(
        &app,
        &format!("/databases/{DB}/functions"),
        json!({ "name": "identity", "location": LIB, "symbol": "Identity", "args": "int", "returns": "int" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = get_json(&app, &format!("/databases/{DB}/functions?like=ident*")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["columns"],
        json!(["return type", "signature", "binary type", "is persistent"])
    );
    assert_eq!(body["rows"], json!([["INT", "identity(INT)", "NATIVE", "true"]]));

    let (_, body) = get_json(&app, &format!("/databases/{DB}/functions?like=other*")).await;
    assert_eq!(body["rows"], json!([]));
}

// ---------------------------------------------------------------------------
// Symbol resolution failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_missing_symbol_has_no_side_effects() {
    let store = Arc::new(InMemoryMetastore::new());
    let app = app_over(store.clone()).await;
    create_db(&app).await;
    create_scalar(&app, 0).await;

    let (status, body) = post_json(
        &app,
        &format!("/databases/{DB}/functions"),
        json!({ "name": "missing", "location": LIB, "symbol": "NoSuchFn", "args": "int", "returns": "int" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), "SymbolNotFoundError");
    assert_eq!(body["success"], false);

    assert_eq!(scalar_count(&app).await, 1);
    assert!(store.get_functions_by_name(DB, "missing").unwrap().is_empty());
}

#[tokio::test]
async fn test_class_without_compatible_overloads_is_rejected() {
    let store = Arc::new(InMemoryMetastore::new());
    let app = app_over(store.clone()).await;
    create_db(&app).await;

    let (status, body) = create_java_class(&app, "badudf", "org.apache.impala.BadUdf").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), "NoCompatibleSignaturesError");
    assert!(store.list_functions(DB).unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Java compatibility filtering and drop syntax
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_java_class_registers_only_compatible_overloads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metastore.db");
    let path = path.to_str().unwrap();

    let app = app_over(Arc::new(SqliteMetastore::new(path).unwrap())).await;
    create_db(&app).await;
    let (status, body) = create_java_class(&app, "testudf", "org.apache.impala.TestUdf").await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["functions"].as_array().unwrap().len(), 3);

    let rows = show(&app, "functions").await;
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r[2] == "JAVA" && r[3] == "true"));

    invalidate(&app).await;
    assert_eq!(scalar_count(&app).await, 3);

    drop(app);
    let restarted = app_over(Arc::new(SqliteMetastore::new(path).unwrap())).await;
    assert_eq!(scalar_count(&restarted).await, 3);
}

#[tokio::test]
async fn test_bare_name_drop_of_overloaded_function_is_ambiguous() {
    let app = app_over(Arc::new(InMemoryMetastore::new())).await;
    create_db(&app).await;
    create_java_class(&app, "testudf", "org.apache.impala.TestUdf").await;

    let drop_path = format!("/databases/{DB}/functions/drop");
    let (status, body) = post_json(&app, &drop_path, json!({ "name": "testudf" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), "AmbiguousDropSyntaxError");
    assert_eq!(body["error"]["details"]["overloads"].as_array().unwrap().len(), 3);
    assert_eq!(scalar_count(&app).await, 3);

    let (status, body) =
        post_json(&app, &drop_path, json!({ "name": "testudf", "args": "int" })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(scalar_count(&app).await, 2);

    invalidate(&app).await;
    assert_eq!(scalar_count(&app).await, 2);
}

#[tokio::test]
async fn test_drop_missing_function() {
    let app = app_over(Arc::new(InMemoryMetastore::new())).await;
    create_db(&app).await;
    let drop_path = format!("/databases/{DB}/functions/drop");

    let (status, body) = post_json(&app, &drop_path, json!({ "name": "nope", "args": "int" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "FunctionNotFoundError");

    let (status, _) = post_json(
        &app,
        &drop_path,
        json!({ "name": "nope", "args": "int", "if_exists": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post_json(&app, &drop_path, json!({ "name": "nope", "if_exists": true })).await;
    assert_eq!(status, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Uniqueness and idempotence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_native_and_java_with_same_identity_conflict() {
    let app = app_over(Arc::new(InMemoryMetastore::new())).await;
    create_db(&app).await;
    let path = format!("/databases/{DB}/functions");

    // Native first, then Java with the same (db, name, signature).
    create_scalar(&app, 0).await;
    let (status, body) = post_json(
        &app,
        &path,
        json!({ "name": "fn_0", "location": JAR, "symbol": "org.apache.impala.TestUdf", "args": "int", "returns": "int" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "FunctionAlreadyExistsError");

    // Java first, then native.
    let (status, _) = post_json(
        &app,
        &path,
        json!({ "name": "dup", "location": JAR, "symbol": "org.apache.impala.TestUdf", "args": "int", "returns": "int" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = post_json(
        &app,
        &path,
        json!({ "name": "dup", "location": LIB, "symbol": "ScalarFn1", "args": "int", "returns": "int" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "FunctionAlreadyExistsError");

    // A class-derived function owns its name.
    let (status, body) = create_java_class(&app, "fn_0", "org.apache.impala.TestUdf").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "FunctionAlreadyExistsError");
}

#[tokio::test]
async fn test_if_not_exists_is_idempotent() {
    let store = Arc::new(InMemoryMetastore::new());
    let app = app_over(store.clone()).await;
    create_db(&app).await;
    let body = json!({
        "name": "fn_0",
        "location": LIB,
        "symbol": "ScalarFn0",
        "args": "int",
        "returns": "int",
        "if_not_exists": true,
    });
    let path = format!("/databases/{DB}/functions");

    let (status, first) = post_json(&app, &path, body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["created"], true);

    let (status, second) = post_json(&app, &path, body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["created"], false);

    assert_eq!(store.list_functions(DB).unwrap().len(), 1);
    assert_eq!(scalar_count(&app).await, 1);
}

// ---------------------------------------------------------------------------
// External writer
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_external_functions_follow_invalidation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metastore.db");
    let path = path.to_str().unwrap();

    let app = app_over(Arc::new(SqliteMetastore::new(path).unwrap())).await;
    create_db(&app).await;

    let tool = SqliteMetastore::new(path).unwrap();
    tool.create_functions(&[external_entity("external", "org.apache.impala.ExternalUdf")])
        .unwrap();
    assert_eq!(scalar_count(&app).await, 0);

    let report = invalidate(&app).await;
    assert_eq!(report["changed_databases"], json!([DB]));
    assert_eq!(scalar_count(&app).await, 2);

    let (status, body) = post_json(
        &app,
        &format!("/databases/{DB}/functions/resolve"),
        json!({ "name": "external", "args": ["string"] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["signature"], "external(STRING)");
    assert_eq!(body["implementation"]["class_name"], "org.apache.impala.ExternalUdf");

    tool.drop_functions(&[FunctionKey::new(DB, "external", None)])
        .unwrap();
    invalidate(&app).await;
    assert_eq!(scalar_count(&app).await, 0);
}

#[tokio::test]
async fn test_external_class_without_overloads_blocks_its_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metastore.db");
    let path = path.to_str().unwrap();

    let app = app_over(Arc::new(SqliteMetastore::new(path).unwrap())).await;
    create_db(&app).await;
    let tool = SqliteMetastore::new(path).unwrap();
    tool.create_functions(&[external_entity("badudf", "org.apache.impala.BadUdf")])
        .unwrap();

    let report = invalidate(&app).await;
    assert_eq!(report["filtered"], 1);
    assert_eq!(scalar_count(&app).await, 0);

    let (status, body) = create_java_class(&app, "badudf", "org.apache.impala.TestUdf").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "FunctionAlreadyExistsError");

    let (status, body) = post_json(
        &app,
        &format!("/databases/{DB}/functions/drop"),
        json!({ "name": "badudf" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["durable_entities_removed"], 1);
    assert!(tool.get_functions_by_name(DB, "badudf").unwrap().is_empty());

    let (status, body) = create_java_class(&app, "badudf", "org.apache.impala.TestUdf").await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}

#[tokio::test]
async fn test_signed_drop_of_unloaded_external_function() {
    let store = Arc::new(InMemoryMetastore::new());
    let app = app_over(store.clone()).await;
    create_db(&app).await;
    let mut entity = external_entity("bad_signed", "org.apache.impala.BadUdf");
    entity.signature = Some("int".into());
    store.create_functions(&[entity]).unwrap();

    invalidate(&app).await;
    assert_eq!(scalar_count(&app).await, 0);

    let (status, body) = post_json(
        &app,
        &format!("/databases/{DB}/functions/drop"),
        json!({ "name": "bad_signed", "args": "string" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "FunctionNotFoundError");
    assert_eq!(store.get_functions_by_name(DB, "bad_signed").unwrap().len(), 1);

    let (status, body) = post_json(
        &app,
        &format!("/databases/{DB}/functions/drop"),
        json!({ "name": "bad_signed", "args": "int" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["durable_entities_removed"], 1);
    assert!(store.get_functions_by_name(DB, "bad_signed").unwrap().is_empty());
}

#[tokio::test]
async fn test_dropping_one_overload_of_external_class_keeps_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metastore.db");
    let path = path.to_str().unwrap();

    let app = app_over(Arc::new(SqliteMetastore::new(path).unwrap())).await;
    create_db(&app).await;
    let tool = SqliteMetastore::new(path).unwrap();
    tool.create_functions(&[external_entity("external", "org.apache.impala.ExternalUdf")])
        .unwrap();
    invalidate(&app).await;
    assert_eq!(scalar_count(&app).await, 2);

    let (status, body) = post_json(
        &app,
        &format!("/databases/{DB}/functions/drop"),
        json!({ "name": "external", "args": "int" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(scalar_count(&app).await, 1);

    let stored = tool.get_functions_by_name(DB, "external").unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].signature.as_deref(), Some("string"));

    invalidate(&app).await;
    let rows = show(&app, "functions").await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][1], "external(STRING)");
}

// ---------------------------------------------------------------------------
// Session-local functions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_session_local_functions_do_not_survive_invalidation() {
    let store = Arc::new(InMemoryMetastore::new());
    let app = app_over(store.clone()).await;
    create_db(&app).await;

    let (status, body) = post_json(
        &app,
        &format!("/databases/{DB}/functions"),
        json!({ "name": "local_udf", "location": JAR, "symbol": "org.apache.impala.TestUdf", "args": "int", "returns": "int" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let rows = show(&app, "functions").await;
    assert_eq!(rows, vec![json!(["INT", "local_udf(INT)", "JAVA", "false"])]);
    assert!(store.list_functions(DB).unwrap().is_empty());

    invalidate(&app).await;
    assert_eq!(scalar_count(&app).await, 0);
}

// ---------------------------------------------------------------------------
// Store failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_persistence_failure_leaves_no_record() {
    let store = Arc::new(InMemoryMetastore::new());
    let app = app_over(store.clone()).await;
    create_db(&app).await;

    store.set_unreachable(true);
    let (status, body) = post_json(
        &app,
        &format!("/databases/{DB}/functions"),
        json!({ "name": "fn_0", "location": LIB, "symbol": "ScalarFn0", "args": "int", "returns": "int" }),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(&body), "PersistenceError");
    store.set_unreachable(false);

    assert_eq!(scalar_count(&app).await, 0);
    assert!(store.list_functions(DB).unwrap().is_empty());

    // The name is free again.
    create_scalar(&app, 0).await;
    assert_eq!(scalar_count(&app).await, 1);
}

#[tokio::test]
async fn test_slow_store_times_out() {
    let store = Arc::new(InMemoryMetastore::new());
    let state = AppState::with_store(store.clone(), resolver(), Duration::from_millis(50))
        .await
        .unwrap();
    let app = build_router(state);
    create_db(&app).await;

    store.set_delay(Duration::from_millis(300));
    let (status, body) = post_json(
        &app,
        &format!("/databases/{DB}/functions"),
        json!({ "name": "fn_0", "location": LIB, "symbol": "ScalarFn0", "args": "int", "returns": "int" }),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(&body), "PersistenceError");
    store.set_delay(Duration::ZERO);
    assert_eq!(scalar_count(&app).await, 0);

    // The write lands after the request gave up and is undone.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(store.list_functions(DB).unwrap().is_empty());

    create_scalar(&app, 0).await;
    assert_eq!(scalar_count(&app).await, 1);
    invalidate(&app).await;
    assert_eq!(scalar_count(&app).await, 1);
}

#[tokio::test]
async fn test_reload_bounds_each_store_call() {
    let store = Arc::new(InMemoryMetastore::new());
    let state = AppState::with_store(store.clone(), resolver(), Duration::from_millis(200))
        .await
        .unwrap();
    let app = build_router(state);
    create_db(&app).await;
    create_scalar(&app, 0).await;
    for i in 0..4 {
        let (status, body) = post_json(&app, "/databases", json!({ "name": format!("other_{i}") })).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    // Six reads at 60 ms each outlast one timeout but none exceeds it.
    store.set_delay(Duration::from_millis(60));
    let report = invalidate(&app).await;
    store.set_delay(Duration::ZERO);
    assert_eq!(report["databases"], 5);
    assert_eq!(scalar_count(&app).await, 1);
}

#[tokio::test]
async fn test_failed_rebuild_leaves_catalog_unloaded() {
    let store = Arc::new(InMemoryMetastore::new());
    let app = app_over(store.clone()).await;
    create_db(&app).await;
    create_scalar(&app, 0).await;

    store.set_unreachable(true);
    let (status, body) = post_json(&app, "/invalidate-metadata", json!({})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(&body), "PersistenceError");

    let (status, body) = get_json(&app, "/catalog/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "rebuilding");
    assert_eq!(body["functions"], 0);
    assert!(body["last_error"].is_string());

    let (status, body) = get_json(&app, &format!("/databases/{DB}/functions")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(&body), "CatalogNotLoadedError");

    store.set_unreachable(false);
    invalidate(&app).await;
    assert_eq!(scalar_count(&app).await, 1);
    let (_, body) = get_json(&app, "/catalog/status").await;
    assert_eq!(body["state"], "loaded");
}

// ---------------------------------------------------------------------------
// Overload resolution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_resolve_prefers_exact_match() {
    let app = app_over(Arc::new(InMemoryMetastore::new())).await;
    create_db(&app).await;
    create_java_class(&app, "testudf", "org.apache.impala.TestUdf").await;
    let path = format!("/databases/{DB}/functions/resolve");

    let (status, body) = post_json(&app, &path, json!({ "name": "testudf", "args": ["int"] })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["signature"], "testudf(INT)");
    assert_eq!(body["return_type"], "INT");

    // TINYINT widens to INT.
    let (status, body) = post_json(&app, &path, json!({ "name": "testudf", "args": ["tinyint"] })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["signature"], "testudf(INT)");

    let (status, body) = post_json(&app, &path, json!({ "name": "testudf", "args": ["double"] })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), "NoMatchingOverloadError");
}

// ---------------------------------------------------------------------------
// Databases
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_database_lifecycle() {
    let app = app_over(Arc::new(InMemoryMetastore::new())).await;
    create_db(&app).await;

    let (status, body) = post_json(&app, "/databases", json!({ "name": DB })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "DatabaseAlreadyExistsError");

    create_scalar(&app, 0).await;
    let (status, body) = request_json(&app, Method::DELETE, &format!("/databases/{DB}"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "DatabaseNotEmptyError");

    let (status, body) = request_json(
        &app,
        Method::DELETE,
        &format!("/databases/{DB}?cascade=true"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["functions_removed"], 1);

    let (status, body) = get_json(&app, &format!("/databases/{DB}/functions")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "DatabaseNotFoundError");

    let (status, _) = request_json(
        &app,
        Method::DELETE,
        &format!("/databases/{DB}?if_exists=true"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
