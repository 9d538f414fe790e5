//! Type Registry Module
//!
//! Maps concrete Rust types to the string tags written into snapshots. A value
//! can only be persisted if its type was registered first.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::{CacheEntry, Value};
use crate::error::{CacheError, Result};

type EncodeFn = fn(&(dyn Any + Send + Sync)) -> serde_json::Result<Option<serde_json::Value>>;
type DecodeFn = fn(serde_json::Value) -> serde_json::Result<(Value, &'static str)>;

fn encode_as<T: Serialize + 'static>(
    value: &(dyn Any + Send + Sync),
) -> serde_json::Result<Option<serde_json::Value>> {
    value
        .downcast_ref::<T>()
        .map(serde_json::to_value)
        .transpose()
}

fn decode_as<T: DeserializeOwned + Any + Send + Sync>(
    data: serde_json::Value,
) -> serde_json::Result<(Value, &'static str)> {
    let value: T = serde_json::from_value(data)?;
    Ok((Arc::new(value), std::any::type_name::<T>()))
}

#[derive(Clone)]
struct Registration {
    tag: String,
    encode: EncodeFn,
    decode: DecodeFn,
}

// == Type Registry ==
/// Registered snapshot types, keyed both ways.
#[derive(Clone)]
pub struct TypeRegistry {
    by_type: HashMap<TypeId, Registration>,
    by_tag: HashMap<String, (TypeId, DecodeFn)>,
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<&String> = self.by_tag.keys().collect();
        tags.sort();
        f.debug_struct("TypeRegistry").field("tags", &tags).finish()
    }
}

impl TypeRegistry {
    /// Creates a registry with no types.
    pub fn empty() -> Self {
        Self {
            by_type: HashMap::new(),
            by_tag: HashMap::new(),
        }
    }

    /// Creates a registry with the common scalar, byte and JSON types.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.insert::<String>("string");
        registry.insert::<bool>("bool");
        registry.insert::<i32>("i32");
        registry.insert::<i64>("i64");
        registry.insert::<u64>("u64");
        registry.insert::<f64>("f64");
        registry.insert::<Vec<u8>>("bytes");
        registry.insert::<serde_json::Value>("json");
        // Literals are written as strings and come back as `String`
        registry.by_type.insert(
            TypeId::of::<&'static str>(),
            Registration {
                tag: "string".to_string(),
                encode: encode_as::<&'static str>,
                decode: decode_as::<String>,
            },
        );
        registry
    }

    fn insert<T>(&mut self, tag: &str)
    where
        T: Serialize + DeserializeOwned + Any + Send + Sync,
    {
        self.by_type.insert(
            TypeId::of::<T>(),
            Registration {
                tag: tag.to_string(),
                encode: encode_as::<T>,
                decode: decode_as::<T>,
            },
        );
        self.by_tag
            .insert(tag.to_string(), (TypeId::of::<T>(), decode_as::<T>));
    }

    // == Register ==
    /// Registers `T` under `tag`.
    ///
    /// Registering the same type under the same tag again is a no-op. A tag
    /// already bound to a different type, or a type already bound to a
    /// different tag, is rejected.
    pub fn register<T>(&mut self, tag: impl Into<String>) -> Result<()>
    where
        T: Serialize + DeserializeOwned + Any + Send + Sync,
    {
        let tag = tag.into();
        let type_id = TypeId::of::<T>();

        if let Some((bound, _)) = self.by_tag.get(&tag) {
            if *bound != type_id {
                return Err(CacheError::DuplicateTypeTag(tag));
            }
        }
        if let Some(existing) = self.by_type.get(&type_id) {
            if existing.tag != tag {
                return Err(CacheError::DuplicateTypeTag(format!(
                    "{} is already registered as {}",
                    std::any::type_name::<T>(),
                    existing.tag
                )));
            }
        }

        self.insert::<T>(&tag);
        Ok(())
    }

    /// Returns whether `T` can be persisted.
    pub fn is_registered<T: Any>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<T>())
    }

    // == Encode ==
    /// Encodes an entry's value, returning its tag and JSON form.
    ///
    /// The JSON form must decode back under the same tag; values that JSON
    /// cannot represent (NaN or infinite floats) are rejected here rather than
    /// producing a snapshot that fails to load.
    pub fn encode(&self, entry: &CacheEntry) -> Result<(String, serde_json::Value)> {
        let value: &(dyn Any + Send + Sync) = &*entry.value;
        let registration = self.by_type.get(&value.type_id()).ok_or_else(|| {
            CacheError::Serialization(format!(
                "type {} is not registered for snapshots",
                entry.type_name
            ))
        })?;

        let data = (registration.encode)(value)
            .map_err(|e| CacheError::Serialization(format!("{}: {}", entry.type_name, e)))?
            .ok_or_else(|| {
                CacheError::Serialization(format!("type mismatch encoding {}", entry.type_name))
            })?;

        (registration.decode)(data.clone()).map_err(|e| {
            CacheError::Serialization(format!(
                "{} does not survive encoding: {}",
                entry.type_name, e
            ))
        })?;

        Ok((registration.tag.clone(), data))
    }

    // == Decode ==
    /// Decodes a tagged JSON value back into a stored value.
    pub fn decode(&self, tag: &str, data: serde_json::Value) -> Result<(Value, &'static str)> {
        let (_, decode) = self.by_tag.get(tag).ok_or_else(|| {
            CacheError::Deserialization(format!("unknown type tag `{}`", tag))
        })?;

        decode(data).map_err(|e| CacheError::Deserialization(format!("`{}`: {}", tag, e)))
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
