//! Contract inspection commands.
//!
//! `contracts` lists what has been ingested; `show` prints one contract's
//! metadata, path tree, endpoints and schemas.

use anyhow::{bail, Result};
use sqlx::Row;

use crate::config::Config;
use crate::db;
use crate::migrate;

struct ContractListing {
    id: i64,
    component_id: Option<String>,
    title: Option<String>,
    version: Option<String>,
    endpoint_count: i64,
    schema_count: i64,
    ingested_at: String,
}

/// Run the contracts command: list every ingested contract with row counts.
pub async fn run_list(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::ensure_schema(&pool).await?;

    let rows = sqlx::query(
        r#"
        SELECT
            c.id,
            c.component_id,
            c.title,
            c.version,
            c.ingested_at,
            COUNT(DISTINCT e.id) AS endpoint_count,
            COUNT(DISTINCT s.id) AS schema_count
        FROM api_contracts c
        LEFT JOIN api_endpoints e ON e.contract_id = c.id
        LEFT JOIN api_data_schemas s ON s.contract_id = c.id
        GROUP BY c.id
        ORDER BY c.id ASC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let listings: Vec<ContractListing> = rows
        .iter()
        .map(|row| ContractListing {
            id: row.get("id"),
            component_id: row.get("component_id"),
            title: row.get("title"),
            version: row.get("version"),
            endpoint_count: row.get("endpoint_count"),
            schema_count: row.get("schema_count"),
            ingested_at: row.get("ingested_at"),
        })
        .collect();

    pool.close().await;

    if listings.is_empty() {
        println!("No contracts ingested yet.");
        return Ok(());
    }

    println!(
        "  {:<4} {:<26} {:<28} {:<10} {:>9} {:>8}   {}",
        "ID", "COMPONENT", "TITLE", "VERSION", "ENDPOINTS", "SCHEMAS", "INGESTED"
    );
    println!("  {}", "-".repeat(112));
    for listing in &listings {
        println!(
            "  {:<4} {:<26} {:<28} {:<10} {:>9} {:>8}   {}",
            listing.id,
            listing.component_id.as_deref().unwrap_or("(none)"),
            listing.title.as_deref().unwrap_or("(untitled)"),
            listing.version.as_deref().unwrap_or("Unknown"),
            listing.endpoint_count,
            listing.schema_count,
            listing.ingested_at
        );
    }

    Ok(())
}

/// Run the show command: print one contract in full.
pub async fn run_show(config: &Config, id: i64) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::ensure_schema(&pool).await?;

    let contract = sqlx::query(
        "SELECT component_id, openapi_version, title, version, tree, ingested_at FROM api_contracts WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?;

    let contract = match contract {
        Some(row) => row,
        None => {
            pool.close().await;
            bail!("contract not found: {}", id);
        }
    };

    let component_id: Option<String> = contract.get("component_id");
    let openapi_version: Option<String> = contract.get("openapi_version");
    let title: Option<String> = contract.get("title");
    let version: Option<String> = contract.get("version");
    let tree: Option<String> = contract.get("tree");
    let ingested_at: String = contract.get("ingested_at");

    let endpoint_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM api_endpoints WHERE contract_id = ?")
            .bind(id)
            .fetch_one(&pool)
            .await?;
    let schema_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM api_data_schemas WHERE contract_id = ?")
            .bind(id)
            .fetch_one(&pool)
            .await?;
    let parameter_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM api_parameters p JOIN api_endpoints e ON p.endpoint_id = e.id WHERE e.contract_id = ?",
    )
    .bind(id)
    .fetch_one(&pool)
    .await?;
    let request_body_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM api_request_bodies b JOIN api_endpoints e ON b.endpoint_id = e.id WHERE e.contract_id = ?",
    )
    .bind(id)
    .fetch_one(&pool)
    .await?;
    let response_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM api_responses r JOIN api_endpoints e ON r.endpoint_id = e.id WHERE e.contract_id = ?",
    )
    .bind(id)
    .fetch_one(&pool)
    .await?;

    println!("--- Contract {} ---", id);
    println!("component:       {}", component_id.as_deref().unwrap_or("(none)"));
    println!("title:           {}", title.as_deref().unwrap_or("(untitled)"));
    println!("openapi version: {}", openapi_version.as_deref().unwrap_or("Unknown"));
    println!("api version:     {}", version.as_deref().unwrap_or("Unknown"));
    println!("ingested at:     {}", ingested_at);
    println!();

    println!("--- Rows ---");
    println!("endpoints:       {}", endpoint_count);
    println!("parameters:      {}", parameter_count);
    println!("request bodies:  {}", request_body_count);
    println!("responses:       {}", response_count);
    println!("schemas:         {}", schema_count);
    println!();

    if let Some(tree) = tree {
        println!("--- Paths ---");
        println!("{}", tree);
        println!();
    }

    let endpoint_rows = sqlx::query(
        "SELECT http_verb, path, operation_id FROM api_endpoints WHERE contract_id = ? ORDER BY path ASC, http_verb ASC",
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    println!("--- Endpoints ({}) ---", endpoint_rows.len());
    for row in &endpoint_rows {
        let verb: String = row.get("http_verb");
        let path: String = row.get("path");
        let operation_id: Option<String> = row.get("operation_id");
        match operation_id {
            Some(op) => println!("  {:<7} {}  ({})", verb, path, op),
            None => println!("  {:<7} {}", verb, path),
        }
    }
    println!();

    let schema_rows = sqlx::query(
        "SELECT id, schema_name, ref_path FROM api_data_schemas WHERE contract_id = ? ORDER BY id ASC",
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    println!("--- Schemas ({}) ---", schema_rows.len());
    for row in &schema_rows {
        let schema_id: i64 = row.get("id");
        let name: Option<String> = row.get("schema_name");
        let ref_path: Option<String> = row.get("ref_path");
        match ref_path {
            Some(ref_path) => println!(
                "  {:<5} {:<24} {}",
                schema_id,
                name.as_deref().unwrap_or("(anonymous)"),
                ref_path
            ),
            None => println!(
                "  {:<5} {}",
                schema_id,
                name.as_deref().unwrap_or("(anonymous)")
            ),
        }
    }

    pool.close().await;
    Ok(())
}
