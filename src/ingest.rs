//! Ingestion pipeline orchestration.
//!
//! Coordinates the full flow for one spec file: load → path tree →
//! contract insert → component resolution → paths projection, all inside
//! a single transaction. Structural problems in individual entries are
//! reported as warnings and skipped; the rest of the document still lands.

use anyhow::{bail, Result};
use chrono::Utc;
use serde_json::Value;
use sqlx::{Sqlite, Transaction};
use std::path::Path;

use crate::config::Config;
use crate::db;
use crate::loader::{self, SpecFormat};
use crate::migrate;
use crate::resolver::RefIndex;
use crate::schema_store::SchemaStore;
use crate::tree::{is_http_verb, PathTree};

/// What one ingestion wrote, keyed by the new contract's id.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub contract_id: i64,
    pub title: String,
    #[allow(dead_code)]
    pub component_id: String,
    pub endpoints: u64,
    pub schemas: u64,
    pub parameters: u64,
    pub request_bodies: u64,
    pub responses: u64,
}

#[derive(Default)]
struct ProjectionCounts {
    endpoints: u64,
    parameters: u64,
    request_bodies: u64,
    responses: u64,
}

/// Ingests one OpenAPI document as a new contract.
///
/// Everything after the file is parsed happens in one transaction: an error
/// part-way leaves no partial contract behind.
pub async fn ingest_file(
    config: &Config,
    path: &Path,
    title: Option<&str>,
    format: Option<SpecFormat>,
) -> Result<IngestReport> {
    let format = loader::effective_format(config, path, format)?;
    let spec = loader::load_spec(path, format)?;

    // Building the tree validates the paths section before any row is
    // written.
    let tree = PathTree::build(&spec.document)?;
    let tree_string = tree.render();

    let info = spec.document.get("info");
    let contract_title = match title {
        Some(t) => t.to_string(),
        None => text_or_fallback(info.and_then(|i| i.get("title")), "Untitled Contract"),
    };
    let openapi_version = text_or_fallback(spec.document.get("openapi"), "Unknown");
    let api_version = text_or_fallback(info.and_then(|i| i.get("version")), "Unknown");

    let pool = db::connect(config).await?;
    migrate::ensure_schema(&pool).await?;

    let mut tx = pool.begin().await?;

    let ingested_at = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let inserted = sqlx::query(
        "INSERT INTO api_contracts (component_id, openapi_version, title, version, tree, raw_spec, ingested_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&spec.component_id)
    .bind(&openapi_version)
    .bind(&contract_title)
    .bind(&api_version)
    .bind(&tree_string)
    .bind(&spec.raw)
    .bind(&ingested_at)
    .execute(&mut *tx)
    .await?;

    let contract_id = inserted.last_insert_rowid();
    if contract_id == 0 {
        drop(tx);
        pool.close().await;
        bail!("Failed to retrieve contract id after insert");
    }

    let mut store = SchemaStore::new(contract_id);
    let refs = RefIndex::build(&mut tx, &mut store, &spec.document).await?;
    let counts = project_paths(&mut tx, &mut store, &refs, contract_id, &spec.document).await?;

    let schemas: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM api_data_schemas WHERE contract_id = ?")
            .bind(contract_id)
            .fetch_one(&mut *tx)
            .await?;

    tx.commit().await?;
    pool.close().await;

    Ok(IngestReport {
        contract_id,
        title: contract_title,
        component_id: spec.component_id,
        endpoints: counts.endpoints,
        schemas: schemas as u64,
        parameters: counts.parameters,
        request_bodies: counts.request_bodies,
        responses: counts.responses,
    })
}

/// CLI entry point: ingest and print a summary plus the confirmation line.
pub async fn run_ingest(
    config: &Config,
    path: &Path,
    title: Option<&str>,
    format: Option<SpecFormat>,
) -> Result<()> {
    let report = ingest_file(config, path, title, format).await?;

    println!("ingest {}", path.display());
    println!("  contract id: {}", report.contract_id);
    println!("  endpoints: {}", report.endpoints);
    println!("  schemas: {}", report.schemas);
    println!("  parameters: {}", report.parameters);
    println!("  request bodies: {}", report.request_bodies);
    println!("  responses: {}", report.responses);
    println!(
        "Successfully saved OpenAPI spec '{}' from '{}' to {} with contract ID {}.",
        report.title,
        path.display(),
        config.db.path.display(),
        report.contract_id
    );

    Ok(())
}

/// Walks `paths` × HTTP verbs and inserts endpoint, parameter, request body
/// and response rows. Schema fields resolve through `refs` or are stored
/// inline through `store`.
async fn project_paths(
    tx: &mut Transaction<'_, Sqlite>,
    store: &mut SchemaStore,
    refs: &RefIndex,
    contract_id: i64,
    document: &Value,
) -> Result<ProjectionCounts> {
    let mut counts = ProjectionCounts::default();

    let Some(paths) = document.get("paths").and_then(Value::as_object) else {
        return Ok(counts);
    };

    for (path_url, path_item) in paths {
        let Some(path_item_obj) = path_item.as_object() else {
            eprintln!(
                "Warning: path item for '{}' is not a mapping; skipping",
                path_url
            );
            continue;
        };

        for (verb_key, operation) in path_item_obj {
            if !is_http_verb(verb_key) {
                continue;
            }
            let Some(operation_obj) = operation.as_object() else {
                continue;
            };
            let verb = verb_key.to_uppercase();

            let inserted = sqlx::query(
                "INSERT INTO api_endpoints (contract_id, path, http_verb, operation_id, summary, description) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(contract_id)
            .bind(path_url)
            .bind(&verb)
            .bind(operation_obj.get("operationId").and_then(Value::as_str))
            .bind(operation_obj.get("summary").and_then(Value::as_str))
            .bind(operation_obj.get("description").and_then(Value::as_str))
            .execute(&mut **tx)
            .await?;
            let endpoint_id = inserted.last_insert_rowid();
            counts.endpoints += 1;

            // Operation-level parameters first, then path-item-level ones.
            // Both lists contribute rows; duplicates are kept as declared.
            let mut param_entries: Vec<&Value> = Vec::new();
            for (owner, params) in [
                (verb.as_str(), operation_obj.get("parameters")),
                ("path item", path_item_obj.get("parameters")),
            ] {
                match params {
                    Some(Value::Array(items)) => param_entries.extend(items),
                    Some(_) => eprintln!(
                        "Warning: {} parameters for {} are not a list; skipping",
                        owner, path_url
                    ),
                    None => {}
                }
            }

            for param in param_entries {
                let Some(param_obj) = param.as_object() else {
                    eprintln!(
                        "Warning: malformed parameter entry for {} {}; skipping",
                        path_url, verb
                    );
                    continue;
                };

                // The schema is stored even when the parameter row itself is
                // rejected below for lacking a name or location.
                let context = format!("parameter at {} {}", path_url, verb);
                let schema_id = refs
                    .resolve_or_store(tx, store, param_obj.get("schema"), &context)
                    .await?;

                let name = param_obj.get("name").and_then(Value::as_str).unwrap_or("");
                let location = param_obj.get("in").and_then(Value::as_str).unwrap_or("");
                if name.is_empty() || location.is_empty() {
                    eprintln!(
                        "Warning: parameter without name or location for {} {}; skipping",
                        path_url, verb
                    );
                    continue;
                }

                sqlx::query(
                    "INSERT INTO api_parameters (endpoint_id, name, in_location, description, required, schema_id) VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(endpoint_id)
                .bind(name)
                .bind(location)
                .bind(param_obj.get("description").and_then(Value::as_str))
                .bind(
                    param_obj
                        .get("required")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                )
                .bind(schema_id)
                .execute(&mut **tx)
                .await?;
                counts.parameters += 1;
            }

            if let Some(request_body) = operation_obj.get("requestBody") {
                match request_body.as_object() {
                    Some(rb_obj) => match rb_obj.get("content") {
                        Some(Value::Object(content)) => {
                            let description = rb_obj.get("description").and_then(Value::as_str);
                            let required = rb_obj
                                .get("required")
                                .and_then(Value::as_bool)
                                .unwrap_or(false);
                            for (content_type, media) in content {
                                let Some(media_obj) = media.as_object() else {
                                    eprintln!(
                                        "Warning: malformed request body media entry '{}' for {} {}; skipping",
                                        content_type, path_url, verb
                                    );
                                    continue;
                                };
                                let context = format!("request body at {} {}", path_url, verb);
                                let schema_id = refs
                                    .resolve_or_store(tx, store, media_obj.get("schema"), &context)
                                    .await?;

                                sqlx::query(
                                    "INSERT INTO api_request_bodies (endpoint_id, description, required, content_type, schema_id) VALUES (?, ?, ?, ?, ?)",
                                )
                                .bind(endpoint_id)
                                .bind(description)
                                .bind(required)
                                .bind(content_type)
                                .bind(schema_id)
                                .execute(&mut **tx)
                                .await?;
                                counts.request_bodies += 1;
                            }
                        }
                        Some(_) => eprintln!(
                            "Warning: request body content for {} {} is not a mapping; skipping",
                            path_url, verb
                        ),
                        None => {}
                    },
                    None => eprintln!(
                        "Warning: request body for {} {} is not a mapping; skipping",
                        path_url, verb
                    ),
                }
            }

            match operation_obj.get("responses") {
                Some(Value::Object(responses)) => {
                    for (status_code, response) in responses {
                        let Some(response_obj) = response.as_object() else {
                            eprintln!(
                                "Warning: malformed response entry '{}' for {} {}; skipping",
                                status_code, path_url, verb
                            );
                            continue;
                        };
                        let description = response_obj.get("description").and_then(Value::as_str);

                        match response_obj.get("content") {
                            Some(Value::Object(content)) => {
                                // An empty content mapping yields no rows at
                                // all for this status code.
                                for (content_type, media) in content {
                                    let Some(media_obj) = media.as_object() else {
                                        eprintln!(
                                            "Warning: malformed response media entry '{}' for {} {} status {}; skipping",
                                            content_type, path_url, verb, status_code
                                        );
                                        continue;
                                    };
                                    let context = format!(
                                        "response at {} {} status {}",
                                        path_url, verb, status_code
                                    );
                                    let schema_id = refs
                                        .resolve_or_store(
                                            tx,
                                            store,
                                            media_obj.get("schema"),
                                            &context,
                                        )
                                        .await?;

                                    sqlx::query(
                                        "INSERT INTO api_responses (endpoint_id, status_code, description, content_type, schema_id) VALUES (?, ?, ?, ?, ?)",
                                    )
                                    .bind(endpoint_id)
                                    .bind(status_code)
                                    .bind(description)
                                    .bind(content_type)
                                    .bind(schema_id)
                                    .execute(&mut **tx)
                                    .await?;
                                    counts.responses += 1;
                                }
                            }
                            _ => {
                                // No declared content: one row with null
                                // content type and schema.
                                sqlx::query(
                                    "INSERT INTO api_responses (endpoint_id, status_code, description, content_type, schema_id) VALUES (?, ?, ?, NULL, NULL)",
                                )
                                .bind(endpoint_id)
                                .bind(status_code)
                                .bind(description)
                                .execute(&mut **tx)
                                .await?;
                                counts.responses += 1;
                            }
                        }
                    }
                }
                Some(_) => eprintln!(
                    "Warning: responses for {} {} are not a mapping; skipping",
                    path_url, verb
                ),
                None => {}
            }
        }
    }

    Ok(counts)
}

/// Renders a document scalar as text, falling back when it is absent or
/// null. Non-string scalars keep their JSON rendering.
fn text_or_fallback(value: Option<&Value>, fallback: &str) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => fallback.to_string(),
        Some(other) => other.to_string(),
    }
}
