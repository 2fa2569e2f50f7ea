//! Two-pass `$ref` resolution over `components.schemas`.
//!
//! Pass one stores every concrete component definition and records its
//! reference path. Pass two maps alias components (bare `$ref` entries)
//! onto the ids captured in pass one, so aliases resolve regardless of
//! declaration order. Alias chains are not followed transitively; an alias
//! pointing at another alias is reported as unresolved.

use anyhow::Result;
use serde_json::Value;
use sqlx::{Sqlite, Transaction};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::schema_store::SchemaStore;

pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Maps `#/components/schemas/<Name>` paths to stored schema row ids for
/// one ingestion.
#[derive(Debug, Default)]
pub struct RefIndex {
    by_path: HashMap<String, i64>,
}

impl RefIndex {
    pub fn get(&self, ref_path: &str) -> Option<i64> {
        self.by_path.get(ref_path).copied()
    }

    /// Indexes the document's `components.schemas` section, storing every
    /// concrete definition through `store`.
    pub async fn build(
        tx: &mut Transaction<'_, Sqlite>,
        store: &mut SchemaStore,
        document: &Value,
    ) -> Result<Self> {
        let mut index = Self::default();

        let components = match document.get("components") {
            Some(Value::Object(map)) => map,
            Some(_) => {
                eprintln!(
                    "Warning: 'components' is not a mapping; skipping component definitions"
                );
                return Ok(index);
            }
            None => return Ok(index),
        };
        let schemas = match components.get("schemas") {
            Some(Value::Object(map)) => map,
            Some(_) => {
                eprintln!("Warning: 'components.schemas' is not a mapping; skipping component definitions");
                return Ok(index);
            }
            None => return Ok(index),
        };

        // Definitions pass: everything that is not a bare $ref alias.
        for (name, definition) in schemas {
            let Some(definition_obj) = definition.as_object() else {
                eprintln!(
                    "Warning: component schema '{}' is not a mapping; skipping",
                    name
                );
                continue;
            };
            if definition_obj.contains_key("$ref") {
                continue;
            }

            let ref_path = format!("{}{}", SCHEMA_REF_PREFIX, name);
            let Some(schema_id) = store
                .store_or_reuse(tx, definition, Some((name, &ref_path)))
                .await?
            else {
                continue;
            };

            match index.by_path.entry(ref_path) {
                Entry::Vacant(entry) => {
                    entry.insert(schema_id);
                }
                Entry::Occupied(entry) => {
                    eprintln!(
                        "Warning: duplicate component ref path '{}'; first definition wins",
                        entry.key()
                    );
                }
            }
        }

        // Alias pass: bare $ref entries resolve one hop against the ids
        // captured above.
        for (name, definition) in schemas {
            let Some(definition_obj) = definition.as_object() else {
                continue;
            };
            let ref_path = format!("{}{}", SCHEMA_REF_PREFIX, name);
            if index.by_path.contains_key(&ref_path) {
                continue;
            }

            match definition_obj.get("$ref").and_then(Value::as_str) {
                Some(target) => match index.by_path.get(target).copied() {
                    Some(schema_id) => {
                        index.by_path.insert(ref_path, schema_id);
                    }
                    None => {
                        eprintln!(
                            "Warning: component schema '{}' references '{}', which no stored definition resolves; leaving it unresolved",
                            name, target
                        );
                    }
                },
                None => {
                    eprintln!(
                        "Warning: component schema '{}' was not stored in the definitions pass; leaving it unresolved",
                        name
                    );
                }
            }
        }

        Ok(index)
    }

    /// Resolves an operation's optional `schema` field to a stored schema id.
    ///
    /// A `$ref` object is looked up in the index (warning and `None` when the
    /// target is unknown); any other object is stored as an inline schema.
    /// Non-object or absent schemas contribute no reference.
    pub async fn resolve_or_store(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        store: &mut SchemaStore,
        schema: Option<&Value>,
        context: &str,
    ) -> Result<Option<i64>> {
        let Some(schema_value) = schema else {
            return Ok(None);
        };
        let Some(schema_obj) = schema_value.as_object() else {
            return Ok(None);
        };

        if let Some(target) = schema_obj.get("$ref") {
            let resolved = target.as_str().and_then(|path| self.get(path));
            if resolved.is_none() {
                eprintln!("Warning: schema $ref {} not found for {}", target, context);
            }
            return Ok(resolved);
        }

        store.store_or_reuse(tx, schema_value, None).await
    }
}
