//! Element manifest: the ordered element list shared by every generator.
//!
//! Ordinals are handed out here and nowhere else. Header, shader and atlas
//! all read them from the manifest, so they cannot disagree.

use crate::build::discovery::ElementSource;
use crate::build::extract::{extract_data_layout, ExtractionError};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Ordinal of the reserved "empty" element type.
pub const EMPTY_ORDINAL: u32 = 0;

/// Error assembling the element manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Element module could not be read
    #[error("Failed to read element '{element}' from {}: {source}", .path.display())]
    Io {
        element: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Data layout extraction failed
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// A single element type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDefinition {
    /// Element name as discovered (file stem)
    pub name: String,
    /// Shared ordinal; `1..=N` in discovery order
    pub ordinal: u32,
    /// Module the element was read from, if any
    pub source: Option<PathBuf>,
    /// Verbatim `struct data { ... }` declaration, if the element has one
    pub data_layout: Option<String>,
}

impl ElementDefinition {
    /// Upper-case token used for enum values and shader constants.
    pub fn upper(&self) -> String {
        self.name.to_uppercase()
    }

    /// Lower-case token used for per-element symbol names.
    pub fn lower(&self) -> String {
        self.name.to_lowercase()
    }

    /// Zero-based position in discovery order.
    pub fn index(&self) -> usize {
        (self.ordinal - 1) as usize
    }
}

/// Ordered, immutable list of elements for one build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementManifest {
    elements: Vec<ElementDefinition>,
}

impl ElementManifest {
    /// Read every discovered module and extract its data layout.
    pub fn load(sources: &[ElementSource]) -> Result<Self, ManifestError> {
        let mut elements = Vec::with_capacity(sources.len());
        for source in sources {
            let text = fs::read_to_string(&source.path).map_err(|e| ManifestError::Io {
                element: source.name.clone(),
                path: source.path.clone(),
                source: e,
            })?;
            let data_layout = extract_data_layout(&source.name, &text)?;
            elements.push(ElementDefinition {
                name: source.name.clone(),
                ordinal: next_ordinal(&elements),
                source: Some(source.path.clone()),
                data_layout,
            });
        }
        Ok(Self { elements })
    }

    /// Build a manifest from in-memory `(name, module text)` pairs.
    pub fn from_texts<I, S, T>(modules: I) -> Result<Self, ExtractionError>
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: AsRef<str>,
    {
        let mut elements = Vec::new();
        for (name, text) in modules {
            let name = name.into();
            let data_layout = extract_data_layout(&name, text.as_ref())?;
            let ordinal = next_ordinal(&elements);
            elements.push(ElementDefinition { name, ordinal, source: None, data_layout });
        }
        Ok(Self { elements })
    }

    /// Build a manifest of layout-free elements from names alone.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut elements = Vec::new();
        for name in names {
            let ordinal = next_ordinal(&elements);
            elements.push(ElementDefinition {
                name: name.into(),
                ordinal,
                source: None,
                data_layout: None,
            });
        }
        Self { elements }
    }

    /// Elements in ordinal order.
    pub fn elements(&self) -> &[ElementDefinition] {
        &self.elements
    }

    /// Iterate elements in ordinal order.
    pub fn iter(&self) -> std::slice::Iter<'_, ElementDefinition> {
        self.elements.iter()
    }

    /// Elements that declared a data layout, in ordinal order.
    pub fn with_data_layout(&self) -> impl Iterator<Item = &ElementDefinition> {
        self.elements.iter().filter(|e| e.data_layout.is_some())
    }

    /// Look up an element by name.
    pub fn get(&self, name: &str) -> Option<&ElementDefinition> {
        self.elements.iter().find(|e| e.name == name)
    }

    /// Number of real elements (excluding the empty sentinel).
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether no elements were discovered.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Value of the terminal count sentinel (`N + 1`).
    pub fn type_count(&self) -> u32 {
        self.elements.len() as u32 + 1
    }
}

impl<'a> IntoIterator for &'a ElementManifest {
    type Item = &'a ElementDefinition;
    type IntoIter = std::slice::Iter<'a, ElementDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

fn next_ordinal(elements: &[ElementDefinition]) -> u32 {
    EMPTY_ORDINAL + elements.len() as u32 + 1
}
