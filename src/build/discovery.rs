//! Source discovery for the build system.
//!
//! Finds the per-element source modules (whose listing order defines element
//! ordinals) and the native source files handed to the compiler.

use crate::config::DiscoveryOrder;
use glob::glob;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extension of element source modules.
pub const ELEMENT_EXTENSION: &str = "c";

/// Extensions of native sources passed to the compiler.
pub const NATIVE_EXTENSIONS: &[&str] = &["c", "S"];

/// Upper-case element names that collide with generated symbols.
///
/// `EMPTY` is the `TYPE_EMPTY` sentinel, `TYPE_LENGTH` mirrors the
/// `type_length` count and the rest are shader constants.
pub const RESERVED_ELEMENT_NAMES: &[&str] = &["EMPTY", "TYPE_LENGTH", "ATLAS_HEIGHT", "ATLAS_SLOT_OFFSET"];

/// Error during source discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Element directory does not exist
    #[error("Element directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),
    /// Element directory has no subdirectory holding element modules
    #[error("No element subtree found in {}", .0.display())]
    NoElementSubtree(PathBuf),
    /// Element file name is not usable as a C identifier
    #[error("Element name '{name}' from {} is not a valid identifier", .path.display())]
    InvalidName { name: String, path: PathBuf },
    /// Element name collides with a generated symbol
    #[error("Element name '{name}' from {} is reserved", .path.display())]
    ReservedName { name: String, path: PathBuf },
    /// Two element names map to the same generated symbols
    #[error(
        "Elements '{first}' and '{second}' both generate TYPE_{symbol} ({})",
        .path.display()
    )]
    DuplicateName { first: String, second: String, symbol: String, path: PathBuf },
    /// Invalid glob pattern
    #[error("Invalid glob pattern '{0}': {1}")]
    InvalidPattern(String, glob::PatternError),
    /// IO error during enumeration
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One discovered element module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSource {
    /// Element name (file stem of the module)
    pub name: String,
    /// Path of the module source
    pub path: PathBuf,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> DiscoveryError + '_ {
    move |source| DiscoveryError::Io { path: path.to_path_buf(), source }
}

/// List directory entries in the order the filesystem yields them.
fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error(dir))? {
        entries.push(entry.map_err(io_error(dir))?.path());
    }
    Ok(entries)
}

/// Find the directory holding the element modules.
///
/// This is the first subdirectory of `elements_dir` in listing order; the
/// elements directory itself also holds the generated header.
pub fn find_element_subtree(elements_dir: &Path) -> Result<PathBuf, DiscoveryError> {
    if !elements_dir.is_dir() {
        return Err(DiscoveryError::MissingDirectory(elements_dir.to_path_buf()));
    }

    list_dir(elements_dir)?
        .into_iter()
        .find(|p| p.is_dir())
        .ok_or_else(|| DiscoveryError::NoElementSubtree(elements_dir.to_path_buf()))
}

/// Check whether a name can be spliced into generated C and GLSL identifiers.
pub fn is_valid_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Check whether a name is free of collisions with generated symbols.
pub fn is_reserved_element_name(name: &str) -> bool {
    let upper = name.to_uppercase();
    RESERVED_ELEMENT_NAMES.contains(&upper.as_str())
}

/// Reject reserved names and names that differ only in case.
fn check_element_names(elements: &[ElementSource]) -> Result<(), DiscoveryError> {
    let mut seen: HashMap<String, &ElementSource> = HashMap::new();
    for element in elements {
        if is_reserved_element_name(&element.name) {
            return Err(DiscoveryError::ReservedName {
                name: element.name.clone(),
                path: element.path.clone(),
            });
        }
        let symbol = element.name.to_uppercase();
        if let Some(first) = seen.get(&symbol) {
            return Err(DiscoveryError::DuplicateName {
                first: first.name.clone(),
                second: element.name.clone(),
                symbol,
                path: element.path.clone(),
            });
        }
        seen.insert(symbol, element);
    }
    Ok(())
}

/// Discover element modules.
///
/// With [`DiscoveryOrder::Listing`] the returned order is exactly the
/// directory enumeration order, which is what assigns ordinals downstream.
pub fn discover_elements(
    elements_dir: &Path,
    order: DiscoveryOrder,
) -> Result<Vec<ElementSource>, DiscoveryError> {
    let subtree = find_element_subtree(elements_dir)?;
    log::debug!("element subtree: {}", subtree.display());

    let mut elements = Vec::new();
    for path in list_dir(&subtree)? {
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(ELEMENT_EXTENSION) {
            continue;
        }
        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();
        if !is_valid_element_name(&name) {
            return Err(DiscoveryError::InvalidName { name, path });
        }
        elements.push(ElementSource { name, path });
    }

    if order == DiscoveryOrder::Name {
        elements.sort_by(|a, b| a.name.cmp(&b.name));
    }
    check_element_names(&elements)?;

    for (index, element) in elements.iter().enumerate() {
        log::debug!("discovered element #{}: {}", index + 1, element.name);
    }

    Ok(elements)
}

/// Discover native sources (`.c` and `.S`) anywhere under `src_dir`.
pub fn discover_native_sources(src_dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    if !src_dir.is_dir() {
        return Err(DiscoveryError::MissingDirectory(src_dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for ext in NATIVE_EXTENSIONS {
        let pattern = format!("**/*.{}", ext);
        let full_pattern = src_dir.join(&pattern);
        let paths = glob(&full_pattern.to_string_lossy())
            .map_err(|e| DiscoveryError::InvalidPattern(pattern.clone(), e))?;

        for entry in paths {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => {
                    let path = e.path().to_path_buf();
                    return Err(DiscoveryError::Io { path, source: e.into_error() });
                }
            }
        }
    }

    files.sort();
    Ok(files)
}
