//! Conversion between [`FunctionRecord`]s and metastore entities.
//!
//! Writing: [`to_stored`] encodes a persistent record as one entity, with
//! the kind-specific fields in `udfcat.*` properties.
//!
//! Loading: [`load_database`] turns a database's entities back into
//! records. Native entities are decoded directly. Java entities are grouped
//! by (name, class, archive); each class is inspected once and only its
//! currently compatible overloads are materialized. Entities without a
//! signature (written by the external metastore tool) expand to every
//! compatible overload.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use tracing::warn;
use udfcat_core::{
    AggregatePhases, ColumnType, DatabaseName, FunctionIdentity, FunctionKind, FunctionName,
    FunctionRecord, FunctionSignature,
};
use udfcat_resolve::SymbolResolver;

use crate::error::StorageError;
use crate::types::{props, ResourceType, StoredFunction};

// ---------------------------------------------------------------------------
// Record -> entity
// ---------------------------------------------------------------------------

/// Encodes a record as a metastore entity.
pub fn to_stored(record: &FunctionRecord, owner: &str, create_time: i64) -> StoredFunction {
    let signature = record.signature();
    let mut properties = IndexMap::new();
    let mut put = |key: &str, value: &str| {
        properties.insert(key.to_string(), value.to_string());
    };

    let (class_name, resource_uri, resource_type) = match &record.kind {
        FunctionKind::NativeScalar {
            library,
            symbol,
            prepare_fn,
            close_fn,
        } => {
            put(props::KIND, props::KIND_NATIVE_SCALAR);
            put(props::RETURN_TYPE, &signature.return_type().canonical());
            put(props::SYMBOL, symbol);
            if let Some(f) = prepare_fn {
                put(props::PREPARE_FN, f);
            }
            if let Some(f) = close_fn {
                put(props::CLOSE_FN, f);
            }
            (symbol.clone(), library.clone(), ResourceType::Library)
        }
        FunctionKind::JavaScalar {
            archive, class_name, ..
        } => {
            put(props::KIND, props::KIND_JAVA_SCALAR);
            put(props::RETURN_TYPE, &signature.return_type().canonical());
            (class_name.clone(), archive.clone(), ResourceType::Jar)
        }
        FunctionKind::NativeAggregate {
            library,
            phases,
            intermediate_type,
        } => {
            put(props::KIND, props::KIND_NATIVE_AGGREGATE);
            put(props::RETURN_TYPE, &signature.return_type().canonical());
            if let Some(t) = intermediate_type {
                put(props::INTERMEDIATE_TYPE, &t.canonical());
            }
            put(props::INIT_FN, &phases.init);
            put(props::UPDATE_FN, &phases.update);
            put(props::MERGE_FN, &phases.merge);
            if let Some(f) = &phases.serialize {
                put(props::SERIALIZE_FN, f);
            }
            if let Some(f) = &phases.finalize {
                put(props::FINALIZE_FN, f);
            }
            (phases.update.clone(), library.clone(), ResourceType::Library)
        }
    };
    put(props::PERSISTENT, if record.persistent { "true" } else { "false" });

    StoredFunction {
        database: record.database().to_string(),
        name: record.name().to_string(),
        signature: Some(signature.canonical_args()),
        class_name,
        resource_uri,
        resource_type,
        owner: owner.to_string(),
        create_time,
        properties,
    }
}

// ---------------------------------------------------------------------------
// Entity -> records
// ---------------------------------------------------------------------------

/// Records materialized from one database's entities.
#[derive(Debug, Default)]
pub struct DatabaseLoad {
    pub records: Vec<FunctionRecord>,
    /// Entities that could not be decoded.
    pub skipped: usize,
    /// Java entities dropped because their class no longer offers a
    /// compatible overload for them.
    pub filtered: usize,
}

fn decode_error(entity: &StoredFunction, reason: impl Into<String>) -> StorageError {
    StorageError::Decode {
        key: entity.key().to_string(),
        reason: reason.into(),
    }
}

fn required<'a>(entity: &'a StoredFunction, key: &str) -> Result<&'a str, StorageError> {
    entity
        .property(key)
        .ok_or_else(|| decode_error(entity, format!("missing property {key}")))
}

fn parse_type(entity: &StoredFunction, text: &str) -> Result<ColumnType, StorageError> {
    text.parse()
        .map_err(|e: udfcat_core::CatalogError| decode_error(entity, e.to_string()))
}

fn identity(entity: &StoredFunction, signature: FunctionSignature) -> Result<FunctionIdentity, StorageError> {
    let database = DatabaseName::new(&entity.database).map_err(|e| decode_error(entity, e.to_string()))?;
    let name = FunctionName::new(&entity.name).map_err(|e| decode_error(entity, e.to_string()))?;
    Ok(FunctionIdentity::new(database, name, signature))
}

fn stored_signature(entity: &StoredFunction) -> Result<FunctionSignature, StorageError> {
    let args = entity
        .signature
        .as_deref()
        .ok_or_else(|| decode_error(entity, "missing signature"))?;
    let ret = parse_type(entity, required(entity, props::RETURN_TYPE)?)?;
    FunctionSignature::parse(args, ret).map_err(|e| decode_error(entity, e.to_string()))
}

/// Decodes a native entity without consulting the library.
pub fn decode_native(entity: &StoredFunction) -> Result<FunctionRecord, StorageError> {
    let signature = stored_signature(entity)?;
    let library = entity.resource_uri.clone();
    let optional = |key: &str| entity.property(key).map(str::to_string);

    let kind = match entity.property(props::KIND) {
        Some(props::KIND_NATIVE_SCALAR) => FunctionKind::NativeScalar {
            library,
            symbol: required(entity, props::SYMBOL)?.to_string(),
            prepare_fn: optional(props::PREPARE_FN),
            close_fn: optional(props::CLOSE_FN),
        },
        Some(props::KIND_NATIVE_AGGREGATE) => FunctionKind::NativeAggregate {
            library,
            phases: AggregatePhases {
                init: required(entity, props::INIT_FN)?.to_string(),
                update: required(entity, props::UPDATE_FN)?.to_string(),
                merge: required(entity, props::MERGE_FN)?.to_string(),
                serialize: optional(props::SERIALIZE_FN),
                finalize: optional(props::FINALIZE_FN),
            },
            intermediate_type: entity
                .property(props::INTERMEDIATE_TYPE)
                .map(|t| parse_type(entity, t))
                .transpose()?,
        },
        other => {
            return Err(decode_error(
                entity,
                format!("not a native function entity (kind {other:?})"),
            ))
        }
    };
    let mut record = FunctionRecord::new(identity(entity, signature)?, kind);
    if entity.property(props::PERSISTENT) == Some("false") {
        record.persistent = false;
    }
    Ok(record)
}

fn is_java(entity: &StoredFunction) -> bool {
    match entity.property(props::KIND) {
        Some(kind) => kind == props::KIND_JAVA_SCALAR,
        None => entity.resource_type == ResourceType::Jar,
    }
}

/// Materializes the records of one database from its entities.
pub fn load_database(entities: &[StoredFunction], resolver: &SymbolResolver) -> DatabaseLoad {
    let mut load = DatabaseLoad::default();
    let mut java_groups: BTreeMap<(String, String, String), Vec<&StoredFunction>> = BTreeMap::new();

    for entity in entities {
        if is_java(entity) {
            java_groups
                .entry((
                    entity.name.to_ascii_lowercase(),
                    entity.class_name.clone(),
                    entity.resource_uri.clone(),
                ))
                .or_default()
                .push(entity);
            continue;
        }
        match decode_native(entity) {
            Ok(record) => load.records.push(record),
            Err(e) => {
                warn!(error = %e, "skipping undecodable function entity");
                load.skipped += 1;
            }
        }
    }

    for ((_, class_name, archive), group) in java_groups {
        load_java_group(&class_name, &archive, &group, resolver, &mut load);
    }
    load
}

fn load_java_group(
    class_name: &str,
    archive: &str,
    group: &[&StoredFunction],
    resolver: &SymbolResolver,
    load: &mut DatabaseLoad,
) {
    let compatible = match resolver.java_class(archive, class_name) {
        Ok(class) => class.overloads,
        Err(e) => {
            warn!(class = class_name, archive, error = %e, "java class has no loadable overloads");
            load.filtered += group.len();
            return;
        }
    };

    // Signatures to materialize, in class declaration order.
    let mut selected: Vec<FunctionSignature> = Vec::new();
    let mut first: Option<&StoredFunction> = None;
    for entity in group {
        match &entity.signature {
            None => {
                for sig in &compatible {
                    if !selected.contains(sig) {
                        selected.push(sig.clone());
                    }
                }
                first.get_or_insert(*entity);
            }
            Some(_) => match stored_signature(entity) {
                Ok(sig) => {
                    let current = compatible
                        .iter()
                        .find(|c| **c == sig && c.return_type() == sig.return_type());
                    match current {
                        Some(c) if !selected.contains(c) => {
                            selected.push(c.clone());
                            first.get_or_insert(*entity);
                        }
                        Some(_) => {}
                        None => load.filtered += 1,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "skipping undecodable java function entity");
                    load.skipped += 1;
                }
            },
        }
    }

    let Some(template) = first else {
        return;
    };
    let kind = FunctionKind::JavaScalar {
        archive: archive.to_string(),
        class_name: class_name.to_string(),
        overloads: selected.clone(),
        class_derived: true,
    };
    for sig in selected {
        match identity(template, sig) {
            Ok(id) => load.records.push(FunctionRecord::new(id, kind.clone())),
            Err(e) => {
                warn!(error = %e, "skipping java function with invalid name");
                load.skipped += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use udfcat_resolve::jvm::mapping::UDF_BASE_CLASS;
    use udfcat_resolve::{ClassDescriptor, MethodDescriptor, SymbolManifest};

    const JAR: &str = "/jars/udfs.jar";

    fn evaluate(params: &[&str], ret: &str) -> MethodDescriptor {
        MethodDescriptor {
            name: "evaluate".into(),
            params: params.iter().map(|p| p.to_string()).collect(),
            return_type: ret.into(),
            varargs: false,
        }
    }

    fn resolver(methods: Vec<MethodDescriptor>) -> SymbolResolver {
        SymbolResolver::from_manifest(SymbolManifest::new().with_class(
            JAR,
            ClassDescriptor {
                class_name: "com.example.TestUdf".into(),
                superclasses: vec![UDF_BASE_CLASS.into()],
                methods,
            },
        ))
    }

    fn external(name: &str) -> StoredFunction {
        StoredFunction {
            database: "db".into(),
            name: name.into(),
            signature: None,
            class_name: "com.example.TestUdf".into(),
            resource_uri: JAR.into(),
            resource_type: ResourceType::Jar,
            owner: "hive".into(),
            create_time: 0,
            properties: IndexMap::new(),
        }
    }

    fn record(kind: FunctionKind, args: &str, ret: ColumnType) -> FunctionRecord {
        FunctionRecord::new(
            FunctionIdentity::new(
                DatabaseName::new("db").unwrap(),
                FunctionName::new("f").unwrap(),
                FunctionSignature::parse(args, ret).unwrap(),
            ),
            kind,
        )
    }

    #[test]
    fn native_aggregate_roundtrip() {
        let rec = record(
            FunctionKind::NativeAggregate {
                library: "/lib/libudasample.so".into(),
                phases: AggregatePhases {
                    init: "CountInit".into(),
                    update: "CountUpdate".into(),
                    merge: "CountMerge".into(),
                    serialize: None,
                    finalize: Some("CountFinalize".into()),
                },
                intermediate_type: Some(ColumnType::String),
            },
            "int",
            ColumnType::BigInt,
        );
        let stored = to_stored(&rec, "udfcat", 10);
        assert_eq!(stored.signature.as_deref(), Some("int"));
        assert_eq!(stored.resource_type, ResourceType::Library);
        assert_eq!(decode_native(&stored).unwrap(), rec);
    }

    #[test]
    fn native_scalar_roundtrip_preserves_decimal_and_varargs() {
        let rec = record(
            FunctionKind::NativeScalar {
                library: "/lib/libTestUdfs.so".into(),
                symbol: "VarSum".into(),
                prepare_fn: Some("Prepare".into()),
                close_fn: None,
            },
            "decimal(9,2), int...",
            ColumnType::Decimal { precision: 18, scale: 2 },
        );
        assert_eq!(decode_native(&to_stored(&rec, "udfcat", 0)).unwrap(), rec);
    }

    #[test]
    fn external_entity_expands_to_compatible_overloads() {
        let resolver = resolver(vec![
            evaluate(&["int"], "int"),
            evaluate(&["java.util.List"], "int"),
            evaluate(&["java.lang.String"], "java.lang.String"),
        ]);
        let load = load_database(&[external("TestUdf")], &resolver);
        assert_eq!(load.records.len(), 2);
        assert!(load.records.iter().all(|r| r.persistent && r.kind.is_class_derived()));
        assert_eq!(load.records[0].name().as_str(), "testudf");
    }

    #[test]
    fn stale_java_signatures_are_filtered() {
        let resolver = resolver(vec![evaluate(&["int"], "int")]);
        let kind = FunctionKind::JavaScalar {
            archive: JAR.into(),
            class_name: "com.example.TestUdf".into(),
            overloads: vec![],
            class_derived: true,
        };
        let entities = vec![
            to_stored(&record(kind.clone(), "int", ColumnType::Int), "udfcat", 0),
            to_stored(&record(kind, "string", ColumnType::String), "udfcat", 0),
        ];
        let load = load_database(&entities, &resolver);
        assert_eq!(load.records.len(), 1);
        assert_eq!(load.filtered, 1);
    }

    #[test]
    fn class_without_compatible_overloads_loads_nothing() {
        let resolver = resolver(vec![evaluate(&["java.util.List"], "java.util.List")]);
        let load = load_database(&[external("badudf")], &resolver);
        assert!(load.records.is_empty());
        assert_eq!(load.filtered, 1);
        assert_eq!(load.skipped, 0);
    }

    #[test]
    fn undecodable_native_entity_is_skipped() {
        let mut broken = external("broken");
        broken.resource_type = ResourceType::Library;
        broken.properties.insert(props::KIND.into(), props::KIND_NATIVE_SCALAR.into());
        let load = load_database(&[broken], &resolver(vec![]));
        assert_eq!(load.skipped, 1);
        assert!(load.records.is_empty());
    }
}
