//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! Every command that resolves pages runs exactly one rendering session: one
//! `PageResolver` over the store, dropped when the command returns.

use quire_core::{
    PageResolver, QuireError, ReadStats, RedbRevisionStore, ResolverConfig, StandardNormalizer,
    StorageKey, TemplateParameters, TitleNormalizer,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

// =============================================================================
// IMPORT FILES
// =============================================================================

/// Largest import file accepted (100 MB).
const MAX_IMPORT_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Read an import file, refusing anything but a regular file under the size limit.
fn read_import_file(path: &Path) -> Result<Vec<u8>, QuireError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        QuireError::Storage(format!("Cannot open import file '{}': {}", path.display(), e))
    })?;

    if !metadata.is_file() {
        return Err(QuireError::Storage(format!(
            "Import file '{}' is not a regular file",
            path.display()
        )));
    }
    if metadata.len() > MAX_IMPORT_FILE_SIZE {
        return Err(QuireError::Serialization(format!(
            "Import file is {} bytes, limit is {}",
            metadata.len(),
            MAX_IMPORT_FILE_SIZE
        )));
    }

    std::fs::read(path).map_err(|e| QuireError::Storage(format!("Read import file: {}", e)))
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new, empty page store.
pub fn cmd_init(db_path: &Path, force: bool) -> Result<(), QuireError> {
    if db_path.exists() {
        if !force {
            return Err(QuireError::Storage(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(db_path)
            .map_err(|e| QuireError::Storage(format!("Remove old database: {}", e)))?;
    }

    let _store = RedbRevisionStore::open(db_path)?;
    println!("Initialized new page store at {:?}", db_path);
    Ok(())
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// One page in an import file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImport {
    /// Namespace as written; empty for the main namespace.
    #[serde(default)]
    pub namespace: String,
    /// Page title as written.
    pub title: String,
    /// Current page text.
    pub text: String,
    /// Whether the page is a redirect.
    #[serde(default)]
    pub redirect: bool,
}

/// Parse and store the pages of an import file in one transaction.
///
/// Titles are normalized with the configured rules before storing, so the
/// store only ever holds canonical keys. Returns the number of pages written.
pub fn import_pages(
    db_path: &Path,
    config: &ResolverConfig,
    file: &Path,
) -> Result<usize, QuireError> {
    let contents = read_import_file(file)?;
    let imports: Vec<PageImport> = serde_json::from_slice(&contents)
        .map_err(|e| QuireError::Serialization(format!("Parse import file: {}", e)))?;

    let normalizer = StandardNormalizer::from_config(config);
    let pages = imports
        .into_iter()
        .map(|page| {
            let key = normalizer.normalize(&page.namespace, &page.title)?;
            Ok((key, page.text, page.redirect))
        })
        .collect::<Result<Vec<_>, QuireError>>()?;

    let mut store = RedbRevisionStore::open(db_path)?;
    store.put_pages(&pages)?;
    Ok(pages.len())
}

/// Import pages from a JSON file.
pub fn cmd_import(
    db_path: &Path,
    config: &ResolverConfig,
    json_mode: bool,
    file: &Path,
) -> Result<(), QuireError> {
    tracing::info!("Importing pages from {:?}", file);

    let imported = import_pages(db_path, config, file)?;

    if json_mode {
        print_json(&serde_json::json!({
            "database": db_path.to_string_lossy(),
            "imported": imported
        }));
        return Ok(());
    }

    println!("Imported {} pages into {:?}", imported, db_path);
    Ok(())
}

// =============================================================================
// GET COMMAND
// =============================================================================

/// What one `get` resolution produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GetReport {
    /// Canonical full name, if the reference was valid.
    pub key: Option<String>,
    /// Resolved text.
    pub text: Option<String>,
    /// Outcome kind (`found`, `redirected`, `not_found`, ...).
    pub outcome: &'static str,
    /// Read totals of the session.
    pub stats: ReadStats,
    /// Storage keys read by the session.
    pub involved_keys: BTreeSet<StorageKey>,
}

/// Resolve one page in a fresh session over the store at `db_path`.
pub fn resolve_page(
    db_path: &Path,
    config: &ResolverConfig,
    namespace: &str,
    title: &str,
    follow_redirect: bool,
) -> Result<GetReport, QuireError> {
    let store = RedbRevisionStore::open_existing(db_path)?;
    let mut resolver = PageResolver::new(config, Some(&store))?;

    let key = StandardNormalizer::from_config(config)
        .normalize(namespace, title)
        .ok()
        .map(|key| key.full_name());
    let resolution =
        resolver.resolve(namespace, title, &TemplateParameters::new(), follow_redirect);
    let outcome = resolution.kind();
    let text = resolution.into_text();
    let (stats, involved_keys) = resolver.into_accumulator().into_parts();

    Ok(GetReport {
        key,
        text,
        outcome,
        stats,
        involved_keys,
    })
}

/// Resolve a page and print its content.
pub fn cmd_get(
    db_path: &Path,
    config: &ResolverConfig,
    json_mode: bool,
    namespace: &str,
    title: &str,
    follow_redirect: bool,
) -> Result<(), QuireError> {
    let report = resolve_page(db_path, config, namespace, title, follow_redirect)?;

    if json_mode {
        let output = serde_json::to_value(&report)
            .map_err(|e| QuireError::Serialization(e.to_string()))?;
        print_json(&output);
        return Ok(());
    }

    match &report.text {
        Some(text) => println!("{}", text),
        None => {
            return Err(QuireError::Storage(format!(
                "Page '{}' not resolved ({})",
                report.key.as_deref().unwrap_or(title),
                report.outcome
            )));
        }
    }
    tracing::info!(
        fetches = report.stats.fetches,
        bytes_read = report.stats.bytes_read,
        "resolved {}",
        report.key.as_deref().unwrap_or(title)
    );
    Ok(())
}

// =============================================================================
// TRANSCLUDE COMMAND
// =============================================================================

/// Resolve a template reference in a fresh session.
pub fn transclude_page(
    db_path: &Path,
    config: &ResolverConfig,
    namespace: &str,
    name: &str,
) -> Result<Option<String>, QuireError> {
    let store = RedbRevisionStore::open_existing(db_path)?;
    let mut resolver = PageResolver::new(config, Some(&store))?;
    resolver.transclude(namespace, name, &TemplateParameters::new())
}

/// Resolve a template reference and print the result.
pub fn cmd_transclude(
    db_path: &Path,
    config: &ResolverConfig,
    json_mode: bool,
    namespace: &str,
    name: &str,
) -> Result<(), QuireError> {
    let text = transclude_page(db_path, config, namespace, name)?;

    if json_mode {
        print_json(&serde_json::json!({
            "name": name,
            "namespace": namespace,
            "text": text
        }));
        return Ok(());
    }

    match text {
        Some(text) => println!("{}", text),
        None => println!("(no content for '{}')", name),
    }
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show store status.
pub fn cmd_status(db_path: &Path, json_mode: bool) -> Result<(), QuireError> {
    let store = RedbRevisionStore::open_existing(db_path)?;
    let page_count = store.page_count()?;

    if json_mode {
        print_json(&serde_json::json!({
            "database": db_path.to_string_lossy(),
            "page_count": page_count
        }));
        return Ok(());
    }

    println!("Quire Store Status");
    println!("==================");
    println!("Database: {:?}", db_path);
    println!();
    println!("Pages:    {}", page_count);

    Ok(())
}

// =============================================================================
// COMPACT COMMAND
// =============================================================================

/// Compact an existing store in place. Returns the number of pages kept.
pub fn compact_store(db_path: &Path) -> Result<u64, QuireError> {
    let mut store = RedbRevisionStore::open_existing(db_path)?;
    store.compact()?;
    store.page_count()
}

/// Compact the store file after large imports.
pub fn cmd_compact(db_path: &Path, json_mode: bool) -> Result<(), QuireError> {
    let page_count = compact_store(db_path)?;

    if json_mode {
        print_json(&serde_json::json!({
            "database": db_path.to_string_lossy(),
            "compacted": true,
            "page_count": page_count
        }));
        return Ok(());
    }

    println!("Compacted {:?} ({} pages)", db_path, page_count);
    Ok(())
}
