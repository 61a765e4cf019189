//! Deterministic content fingerprints of a database's function entities.
//!
//! The reload coordinator compares fingerprints across loads to report
//! which databases another writer changed in between. Fingerprints are
//! derived state and are never stored.
//!
//! Determinism: entities are hashed in key order, every field is
//! length-prefixed, and properties are hashed in their stored order.

use crate::types::StoredFunction;

fn update_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

/// Hashes one entity's full content.
pub fn hash_entity(entity: &StoredFunction) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    write_entity(&mut hasher, entity);
    hasher.finalize()
}

fn write_entity(hasher: &mut blake3::Hasher, entity: &StoredFunction) {
    update_str(hasher, &entity.database);
    update_str(hasher, &entity.name);
    match &entity.signature {
        Some(sig) => {
            hasher.update(&[1]);
            update_str(hasher, sig);
        }
        None => {
            hasher.update(&[0]);
        }
    }
    update_str(hasher, &entity.class_name);
    update_str(hasher, &entity.resource_uri);
    update_str(hasher, &entity.resource_type.to_string());
    update_str(hasher, &entity.owner);
    hasher.update(&entity.create_time.to_le_bytes());
    hasher.update(&(entity.properties.len() as u64).to_le_bytes());
    for (key, value) in &entity.properties {
        update_str(hasher, key);
        update_str(hasher, value);
    }
}

/// Fingerprint of a set of entities, independent of input order.
pub fn fingerprint(entities: &[StoredFunction]) -> blake3::Hash {
    let mut sorted: Vec<&StoredFunction> = entities.iter().collect();
    sorted.sort_by_key(|e| e.key());
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(sorted.len() as u64).to_le_bytes());
    for entity in sorted {
        write_entity(&mut hasher, entity);
    }
    hasher.finalize()
}
