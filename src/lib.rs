//! # oasdb
//!
//! Ingest OpenAPI specifications into a normalized, queryable SQLite
//! database.
//!
//! Each ingested document becomes one *contract*: a row carrying the raw
//! spec text and a rendered path tree, with endpoints, parameters, request
//! bodies and responses projected into relational tables. Schema fragments
//! are de-duplicated by canonical content per contract, and
//! `#/components/schemas/*` references resolve to the de-duplicated rows.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌───────────────────┐   ┌─────────────┐
//! │  Loader   │──▶│ Tree / Resolver /  │──▶│   SQLite     │
//! │ YAML/JSON │   │ Projector + Store │   │  6 tables    │
//! └───────────┘   └───────────────────┘   └──────┬──────┘
//!                                                │
//!                                          ┌─────┴─────┐
//!                                          │    CLI     │
//!                                          │  (oasdb)   │
//!                                          └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! oasdb init                        # create database
//! oasdb ingest ./petstore.yaml      # ingest a spec
//! oasdb tree ./petstore.yaml        # preview the path tree
//! oasdb contracts                   # list ingested contracts
//! oasdb show 1                      # inspect one contract
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`loader`] | Spec file reading and YAML/JSON parsing |
//! | [`tree`] | Path-tree building and rendering |
//! | [`schema_store`] | Content-addressed schema de-duplication |
//! | [`resolver`] | Two-pass `$ref` resolution |
//! | [`ingest`] | Ingestion orchestration and paths projection |
//! | [`contracts`] | Contract listing and inspection |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema setup |

pub mod config;
pub mod contracts;
pub mod db;
pub mod ingest;
pub mod loader;
pub mod migrate;
pub mod resolver;
pub mod schema_store;
pub mod tree;
