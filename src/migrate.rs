use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Creates the contract tables and indexes if they don't exist.
///
/// Safe to call on every ingestion; `oasdb init` also runs it standalone.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    // Create contracts table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS api_contracts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            component_id TEXT,
            openapi_version TEXT,
            title TEXT,
            version TEXT,
            tree TEXT,
            raw_spec TEXT NOT NULL,
            ingested_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create data schemas table.
    // SQLite enforces UNIQUE on nullable columns only for non-NULL values,
    // so anonymous rows (ref_path NULL) can coexist while named refs stay unique.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS api_data_schemas (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            contract_id INTEGER NOT NULL,
            schema_name TEXT,
            ref_path TEXT,
            schema_json TEXT NOT NULL,
            FOREIGN KEY (contract_id) REFERENCES api_contracts (id),
            UNIQUE (contract_id, schema_json),
            UNIQUE (contract_id, ref_path)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create endpoints table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS api_endpoints (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            contract_id INTEGER NOT NULL,
            path TEXT NOT NULL,
            http_verb TEXT NOT NULL,
            operation_id TEXT,
            summary TEXT,
            description TEXT,
            FOREIGN KEY (contract_id) REFERENCES api_contracts (id),
            UNIQUE (contract_id, path, http_verb)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create parameters table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS api_parameters (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            endpoint_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            in_location TEXT NOT NULL,
            description TEXT,
            required BOOLEAN,
            schema_id INTEGER,
            FOREIGN KEY (endpoint_id) REFERENCES api_endpoints (id),
            FOREIGN KEY (schema_id) REFERENCES api_data_schemas (id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create request bodies table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS api_request_bodies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            endpoint_id INTEGER NOT NULL,
            description TEXT,
            required BOOLEAN,
            content_type TEXT NOT NULL,
            schema_id INTEGER,
            FOREIGN KEY (endpoint_id) REFERENCES api_endpoints (id),
            FOREIGN KEY (schema_id) REFERENCES api_data_schemas (id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create responses table; content_type is NULL for bodiless responses
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS api_responses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            endpoint_id INTEGER NOT NULL,
            status_code TEXT NOT NULL,
            description TEXT,
            content_type TEXT,
            schema_id INTEGER,
            FOREIGN KEY (endpoint_id) REFERENCES api_endpoints (id),
            FOREIGN KEY (schema_id) REFERENCES api_data_schemas (id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_api_data_schemas_contract_id ON api_data_schemas(contract_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_api_endpoints_contract_id ON api_endpoints(contract_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_api_parameters_endpoint_id ON api_parameters(endpoint_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_api_request_bodies_endpoint_id ON api_request_bodies(endpoint_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_api_responses_endpoint_id ON api_responses(endpoint_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    ensure_schema(&pool).await?;
    pool.close().await;
    Ok(())
}
