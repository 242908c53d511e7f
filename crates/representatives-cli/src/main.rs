//! Representatives database CLI.
//!
//! Provides the `representatives` binary with subcommands for operating a
//! representatives database: applying migrations, loading and unloading
//! fixture files, and looking entities up by fingerprint.
//!
//! Configuration:
//! - `--db` / `REPRESENTATIVES_DB`: SQLite database file path
//!   (default: "representatives.db")
//! - `RUST_LOG`: log filter (default: "info"); logs go to stderr, command
//!   output goes to stdout as JSON
//!
//! Exit codes: 0 = success, 1 = input error, 2 = integrity error,
//! 3 = I/O or database error.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use representatives_core::{CoreError, EntityKind, Fingerprint};
use representatives_storage::{
    load_fixture, schema, unload_fixture, EntityStore, SqliteStore, StorageError,
};

/// Political representatives database tools.
#[derive(Parser)]
#[command(name = "representatives", about = "Political representatives database tools")]
struct Cli {
    /// Path to the database file.
    #[arg(
        long,
        global = true,
        env = "REPRESENTATIVES_DB",
        default_value = "representatives.db"
    )]
    db: String,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Create the database if needed and apply pending migrations.
    Migrate,

    /// Load a JSON fixture file.
    LoadFixture {
        /// Fixture file to load.
        file: PathBuf,
    },

    /// Delete every entity of a kind, cascading along relations.
    UnloadFixture {
        /// Entity kind, e.g. `representative` or `mandate`.
        #[arg(short, long)]
        kind: EntityKind,
    },

    /// Print the entity holding a fingerprint.
    Fingerprint {
        /// Hashable entity kind: representative, group, constituency, mandate.
        #[arg(short, long)]
        kind: EntityKind,

        /// 40-character hex fingerprint.
        fingerprint: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Migrate => run_migrate(&cli.db),
        Commands::LoadFixture { file } => run_load_fixture(&cli.db, &file),
        Commands::UnloadFixture { kind } => run_unload_fixture(&cli.db, kind),
        Commands::Fingerprint { kind, fingerprint } => {
            run_fingerprint(&cli.db, kind, &fingerprint)
        }
    };
    process::exit(exit_code);
}

/// Maps a storage failure to the process exit code.
fn exit_code(err: &StorageError) -> i32 {
    match err {
        StorageError::FingerprintCollision { .. }
        | StorageError::IntegrityError { .. }
        | StorageError::Core(CoreError::MissingDependency { .. }) => 2,
        StorageError::Sqlite(_) | StorageError::Migration(_) => 3,
        StorageError::Serialization(_)
        | StorageError::Core(_)
        | StorageError::NotFound { .. }
        | StorageError::Fixture { .. } => 1,
    }
}

fn open_store(db_path: &str) -> Result<SqliteStore, i32> {
    let store = SqliteStore::new(db_path).map_err(|e| {
        eprintln!("Error: failed to open database '{}': {}", db_path, e);
        exit_code(&e)
    })?;
    tracing::debug!(db = %db_path, "opened database");
    Ok(store)
}

fn print_json(value: &serde_json::Value) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize result: {}\"}}", e));
    println!("{}", json);
}

/// Execute the migrate subcommand.
fn run_migrate(db_path: &str) -> i32 {
    let store = match open_store(db_path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    match store.schema_version() {
        Ok(version) => {
            print_json(&json!({
                "db": db_path,
                "schema_version": version,
                "latest_version": schema::latest_version(),
            }));
            0
        }
        Err(e) => {
            eprintln!("Error: failed to read schema version: {}", e);
            exit_code(&e)
        }
    }
}

/// Execute the load-fixture subcommand.
fn run_load_fixture(db_path: &str, file: &Path) -> i32 {
    let reader = match File::open(file) {
        Ok(f) => BufReader::new(f),
        Err(e) => {
            eprintln!("Error: failed to open fixture '{}': {}", file.display(), e);
            return 3;
        }
    };
    let mut store = match open_store(db_path) {
        Ok(s) => s,
        Err(code) => return code,
    };

    match load_fixture(&mut store, reader) {
        Ok(report) => {
            print_json(&json!({
                "file": file.display().to_string(),
                "total": report.total(),
                "created": report.created,
                "merged": report.merged,
            }));
            0
        }
        Err(e) => {
            eprintln!("Error: failed to load fixture '{}': {}", file.display(), e);
            exit_code(&e)
        }
    }
}

/// Execute the unload-fixture subcommand.
fn run_unload_fixture(db_path: &str, kind: EntityKind) -> i32 {
    let mut store = match open_store(db_path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    match unload_fixture(&mut store, kind) {
        Ok(removed) => {
            print_json(&json!({ "kind": kind, "removed": removed }));
            0
        }
        Err(e) => {
            eprintln!("Error: failed to unload {}: {}", kind, e);
            exit_code(&e)
        }
    }
}

/// Execute the fingerprint subcommand.
fn run_fingerprint(db_path: &str, kind: EntityKind, fingerprint: &str) -> i32 {
    let fingerprint = match Fingerprint::parse(fingerprint) {
        Ok(fp) => fp,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if !kind.is_hashable() {
        eprintln!("Error: {} entities have no stored fingerprint", kind);
        return 1;
    }
    let store = match open_store(db_path) {
        Ok(s) => s,
        Err(code) => return code,
    };

    match lookup(&store, kind, &fingerprint) {
        Ok(Some(entity)) => {
            print_json(&entity);
            0
        }
        Ok(None) => {
            eprintln!("Error: no {} with fingerprint {}", kind, fingerprint);
            1
        }
        Err(e) => {
            eprintln!("Error: lookup failed: {}", e);
            exit_code(&e)
        }
    }
}

/// Finds the hashable entity of `kind` holding `fingerprint`, as JSON.
fn lookup(
    store: &impl EntityStore,
    kind: EntityKind,
    fingerprint: &Fingerprint,
) -> Result<Option<serde_json::Value>, StorageError> {
    let value = match kind {
        EntityKind::Representative => store
            .find_representative(fingerprint)?
            .map(serde_json::to_value),
        EntityKind::Group => store.find_group(fingerprint)?.map(serde_json::to_value),
        EntityKind::Constituency => store
            .find_constituency(fingerprint)?
            .map(serde_json::to_value),
        EntityKind::Mandate => store.find_mandate(fingerprint)?.map(serde_json::to_value),
        _ => None,
    };
    Ok(value.transpose()?)
}
