//! Template catalog
//!
//! The catalog is the JSON document produced by the template import
//! tooling: `{ metadata, templates, variables }`. It is read-only input.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::key::Language;
use crate::library::{LocalizedText, VariableLibrary};

/// Catalog loading errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Duplicate template id detected: {0}")]
    DuplicateTemplateId(String),

    #[error("template with empty id at index {0}")]
    EmptyTemplateId(usize),

    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One email template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub title: LocalizedText,

    #[serde(default)]
    pub description: LocalizedText,

    #[serde(default)]
    pub subject: LocalizedText,

    #[serde(default)]
    pub body: LocalizedText,

    /// Declared variables, in field order
    #[serde(default)]
    pub variables: Vec<String>,
}

impl Template {
    pub fn subject(&self, lang: Language) -> &str {
        self.subject.get_or_other(lang).unwrap_or_default()
    }

    pub fn body(&self, lang: Language) -> &str {
        self.body.get_or_other(lang).unwrap_or_default()
    }

    pub fn title(&self, lang: Language) -> &str {
        self.title.get_or_other(lang).unwrap_or(self.id.as_str())
    }
}

/// Catalog header written by the import tooling
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMetadata {
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub total_templates: usize,

    #[serde(default)]
    pub languages: Vec<Language>,

    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(default)]
    pub category_labels: BTreeMap<String, LocalizedText>,

    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Templates plus the shared variable library
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateCatalog {
    #[serde(default)]
    pub metadata: Option<CatalogMetadata>,

    #[serde(default)]
    pub templates: Vec<Template>,

    #[serde(default)]
    pub variables: VariableLibrary,
}

impl TemplateCatalog {
    /// Parse and validate a catalog document
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: TemplateCatalog = serde_json::from_str(json)?;
        catalog.validate()?;
        debug!(
            templates = catalog.templates.len(),
            variables = catalog.variables.len(),
            "from_json: catalog parsed"
        );
        Ok(catalog)
    }

    /// Read a catalog from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_json(&json)?;
        info!(path = %path.display(), templates = catalog.templates.len(), "Loaded template catalog");
        Ok(catalog)
    }

    /// Fail fast on empty or duplicate template ids
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for (index, template) in self.templates.iter().enumerate() {
            if template.id.trim().is_empty() {
                return Err(CatalogError::EmptyTemplateId(index));
            }
            if !seen.insert(template.id.as_str()) {
                return Err(CatalogError::DuplicateTemplateId(template.id.clone()));
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }
}
