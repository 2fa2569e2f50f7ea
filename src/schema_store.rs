//! Content-addressed schema storage.
//!
//! Every JSON-Schema fragment encountered during an ingestion is reduced to
//! a canonical serialized form and stored at most once per contract. A named
//! component whose content matches an already-stored anonymous fragment
//! "claims" that row, attaching its name and reference path in place.

use anyhow::Result;
use serde_json::Value;
use sqlx::error::ErrorKind;
use sqlx::{Sqlite, Transaction};
use std::collections::HashMap;

/// Serializes a schema fragment with recursively sorted object keys.
///
/// The result is both the de-duplication key and the persisted payload, so
/// it must not depend on the map ordering of the parsed document.
pub fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by_key(|(key, _)| key.as_str());
            let mut out = String::from("{");
            for (i, (key, child)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                out.push_str(&canonical_json(child));
            }
            out.push('}');
            out
        }
        Value::Array(items) => {
            let mut out = String::from("[");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&canonical_json(item));
            }
            out.push(']');
            out
        }
        scalar => scalar.to_string(),
    }
}

/// De-duplicating store for one contract's schema rows.
///
/// The content cache lives only as long as the ingestion that owns it;
/// concurrent ingestions each build their own.
pub struct SchemaStore {
    contract_id: i64,
    by_content: HashMap<String, i64>,
}

impl SchemaStore {
    pub fn new(contract_id: i64) -> Self {
        Self {
            contract_id,
            by_content: HashMap::new(),
        }
    }

    /// Stores `fragment` if its canonical form is new, otherwise returns the
    /// existing row's id. `component` carries the (name, ref path) pair when
    /// the fragment is a named component definition.
    ///
    /// Returns `Ok(None)` only when a row can neither be inserted nor
    /// recovered, which is reported as a warning and treated by callers as
    /// "no schema reference".
    pub async fn store_or_reuse(
        &mut self,
        tx: &mut Transaction<'_, Sqlite>,
        fragment: &Value,
        component: Option<(&str, &str)>,
    ) -> Result<Option<i64>> {
        let content = canonical_json(fragment);

        if let Some(&schema_id) = self.by_content.get(&content) {
            if let Some((name, ref_path)) = component {
                try_claim(tx, schema_id, name, ref_path).await?;
            }
            return Ok(Some(schema_id));
        }

        let insert = sqlx::query(
            "INSERT INTO api_data_schemas (contract_id, schema_name, ref_path, schema_json) VALUES (?, ?, ?, ?)",
        )
        .bind(self.contract_id)
        .bind(component.map(|(name, _)| name))
        .bind(component.map(|(_, ref_path)| ref_path))
        .bind(&content)
        .execute(&mut **tx)
        .await;

        match insert {
            Ok(result) => {
                let schema_id = result.last_insert_rowid();
                self.by_content.insert(content, schema_id);
                Ok(Some(schema_id))
            }
            Err(sqlx::Error::Database(db_err)) if db_err.kind() == ErrorKind::UniqueViolation => {
                // The content is already persisted even though the cache
                // missed it. Recover that row's id and claim it if named.
                let existing: Option<i64> = sqlx::query_scalar(
                    "SELECT id FROM api_data_schemas WHERE contract_id = ? AND schema_json = ?",
                )
                .bind(self.contract_id)
                .bind(&content)
                .fetch_optional(&mut **tx)
                .await?;

                match existing {
                    Some(schema_id) => {
                        self.by_content.insert(content, schema_id);
                        if let Some((name, ref_path)) = component {
                            try_claim(tx, schema_id, name, ref_path).await?;
                        }
                        Ok(Some(schema_id))
                    }
                    None => {
                        // The violation came from the ref-path constraint,
                        // not the content constraint.
                        eprintln!(
                            "Warning: schema insert conflicted but no row matches its content; dropping schema reference"
                        );
                        Ok(None)
                    }
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Attaches `name`/`ref_path` to an anonymous schema row. A row that already
/// carries a ref path is left untouched; a collision with another row's ref
/// path is reported and skipped, keeping the stored row's identity.
async fn try_claim(
    tx: &mut Transaction<'_, Sqlite>,
    schema_id: i64,
    name: &str,
    ref_path: &str,
) -> Result<()> {
    let existing: Option<Option<String>> =
        sqlx::query_scalar("SELECT ref_path FROM api_data_schemas WHERE id = ?")
            .bind(schema_id)
            .fetch_optional(&mut **tx)
            .await?;

    if let Some(None) = existing {
        let update =
            sqlx::query("UPDATE api_data_schemas SET schema_name = ?, ref_path = ? WHERE id = ?")
                .bind(name)
                .bind(ref_path)
                .bind(schema_id)
                .execute(&mut **tx)
                .await;

        match update {
            Ok(_) => {}
            Err(sqlx::Error::Database(db_err)) if db_err.kind() == ErrorKind::UniqueViolation => {
                eprintln!(
                    "Warning: could not claim schema {} as '{}' ({}): ref path already owned by another schema",
                    schema_id, name, ref_path
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
