//! varkit - placeholder variable keys and template reference data
//!
//! Templates carry `<<name>>` tokens whose names may be shared between
//! languages (`client_name`) or stored per language (`client_name_FR`).
//! This crate owns the rules that decide when two names mean the same
//! variable, and how a value is looked up from a variable map.
//!
//! # Modules
//!
//! - [`key`] - canonical variable names and language suffixes
//! - [`resolve`] - value lookup with the deterministic fallback order
//! - [`map`] - the variable map and its lenient wire adapter
//! - [`library`] - variable descriptions, examples and formats
//! - [`catalog`] - template records and the catalog loader
//! - [`assign`] - expanding one edit into every key that stores it
//!
//! # Example
//!
//! ```
//! use varkit::{Language, VariableMap, resolve_variable_value};
//!
//! let mut vars = VariableMap::new();
//! vars.insert("name".to_string(), "X".to_string());
//! vars.insert("name_FR".to_string(), "Y".to_string());
//!
//! assert_eq!(resolve_variable_value(&vars, "name_FR", Language::Fr), "Y");
//! assert_eq!(resolve_variable_value(&vars, "name_EN", Language::Fr), "X");
//! ```

pub mod assign;
pub mod catalog;
pub mod key;
pub mod library;
pub mod map;
pub mod resolve;

pub use assign::{apply_assignments, assign_existing_twins, expand_assignment};
pub use catalog::{CatalogError, CatalogMetadata, Template, TemplateCatalog};
pub use key::{Language, UnknownLanguage, keys_match, language_suffix, normalize_var_key, strip_language_suffix};
pub use library::{LocalizedText, VariableFormat, VariableInfo, VariableLibrary, infer_format};
pub use map::{VariableMap, lenient};
pub use resolve::resolve_variable_value;
