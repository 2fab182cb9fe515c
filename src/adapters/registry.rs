//! Form registry backed by a directory tree.
//!
//! Each registered form lives in its own subdirectory:
//!
//! ```text
//! forms/
//!   App.GeneralAgenda/
//!     form.toml            # identifier, namespace, container options
//!     schema.xsd           # optional
//!     transformation.xslt  # optional
//! ```
//!
//! The registry is scanned once at construction and answers lookups from
//! memory.

use crate::domain::eform::{EFormAttributes, FormFingerprint, XsltParams};
use crate::domain::level::{ContainerKind, Packaging};
use crate::infra::error::{SigningError, SigningResult};
use crate::services::eform::FormRegistry;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const DESCRIPTOR: &str = "form.toml";
const SCHEMA: &str = "schema.xsd";
const TRANSFORMATION: &str = "transformation.xslt";

/// Contents of `form.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
struct FormDescriptor {
    identifier: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    container_xmlns: Option<String>,
    #[serde(default)]
    container: Option<ContainerKind>,
    #[serde(default)]
    packaging: Option<Packaging>,
    #[serde(default)]
    xsd_identifier: Option<String>,
    #[serde(default)]
    embed_used_schemas: bool,
    #[serde(default)]
    xslt: Option<XsltParams>,
}

/// Registry of forms loaded from a directory.
#[derive(Debug, Clone, Default)]
pub struct DirectoryFormRegistry {
    root: PathBuf,
    forms: Vec<EFormAttributes>,
    /// Identifier or namespace to index into `forms`.
    index: HashMap<String, usize>,
}

impl DirectoryFormRegistry {
    /// Scan `root` for form directories.
    ///
    /// Subdirectories without a `form.toml` are skipped.
    ///
    /// # Errors
    /// `Configuration` when `root` is unreadable or a descriptor is invalid.
    pub fn load(root: impl Into<PathBuf>) -> SigningResult<Self> {
        let root = root.into();
        let entries = fs::read_dir(&root).map_err(|e| {
            SigningError::Configuration(format!(
                "Cannot read form registry {}: {e}",
                root.display()
            ))
        })?;

        let mut registry = Self {
            root,
            ..Self::default()
        };
        let mut dirs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.join(DESCRIPTOR).is_file())
            .collect();
        dirs.sort();

        for dir in dirs {
            let (namespace, attributes) = Self::load_form(&dir)?;
            registry.insert(namespace, attributes);
        }
        log::info!(
            "Loaded {} eForm(s) from {}",
            registry.forms.len(),
            registry.root.display()
        );
        Ok(registry)
    }

    fn load_form(dir: &Path) -> SigningResult<(Option<String>, EFormAttributes)> {
        let descriptor_path = dir.join(DESCRIPTOR);
        let text = fs::read_to_string(&descriptor_path)?;
        let descriptor: FormDescriptor = toml::from_str(&text).map_err(|e| {
            SigningError::Configuration(format!(
                "Invalid form descriptor {}: {e}",
                descriptor_path.display()
            ))
        })?;

        let attributes = EFormAttributes {
            identifier: descriptor.identifier,
            schema: read_optional(&dir.join(SCHEMA))?,
            transformation: read_optional(&dir.join(TRANSFORMATION))?,
            container_xmlns: descriptor.container_xmlns,
            container: descriptor.container,
            packaging: descriptor.packaging,
            xsd_identifier: descriptor.xsd_identifier,
            xslt_params: descriptor.xslt.filter(|params| !params.is_empty()),
            embed_used_schemas: descriptor.embed_used_schemas,
        };
        log::debug!("Registered eForm {} from {}", attributes.identifier, dir.display());
        Ok((descriptor.namespace, attributes))
    }

    fn insert(&mut self, namespace: Option<String>, attributes: EFormAttributes) {
        let position = self.forms.len();
        for key in std::iter::once(attributes.identifier.clone()).chain(namespace) {
            if let Some(previous) = self.index.insert(key.clone(), position) {
                log::warn!(
                    "eForm key {key} of {} shadows {}",
                    attributes.identifier,
                    self.forms[previous].identifier
                );
            }
        }
        self.forms.push(attributes);
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.forms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

fn read_optional(path: &Path) -> SigningResult<Option<String>> {
    if path.is_file() {
        Ok(Some(fs::read_to_string(path)?))
    } else {
        Ok(None)
    }
}

impl FormRegistry for DirectoryFormRegistry {
    fn lookup(&self, fingerprint: &FormFingerprint) -> SigningResult<Option<EFormAttributes>> {
        Ok(fingerprint
            .keys()
            .find_map(|key| self.index.get(key))
            .map(|&position| self.forms[position].clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::eform::DestinationType;
    use tempfile::TempDir;

    fn write_form(root: &Path, name: &str, descriptor: &str, with_files: bool) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(DESCRIPTOR), descriptor).unwrap();
        if with_files {
            fs::write(dir.join(SCHEMA), "<xs:schema/>").unwrap();
            fs::write(dir.join(TRANSFORMATION), "<xsl:stylesheet/>").unwrap();
        }
    }

    #[test]
    fn test_lookup_by_identifier_and_namespace() {
        let temp = TempDir::new().unwrap();
        write_form(
            temp.path(),
            "agenda",
            r#"
identifier = "http://data.gov.sk/doc/eform/App.GeneralAgenda/1.9"
namespace = "http://schemas.gov.sk/form/App.GeneralAgenda/1.9"
container = "ASiC_E"
packaging = "ENVELOPING"
embed_used_schemas = true

[xslt]
destinationType = "HTML"
language = "sk"
"#,
            true,
        );

        let registry = DirectoryFormRegistry::load(temp.path()).unwrap();
        assert_eq!(registry.len(), 1);

        let by_namespace = registry
            .lookup(&FormFingerprint {
                namespace: Some("http://schemas.gov.sk/form/App.GeneralAgenda/1.9".into()),
                identifier: None,
            })
            .unwrap()
            .unwrap();
        assert_eq!(by_namespace.container, Some(ContainerKind::AsicE));
        assert_eq!(by_namespace.packaging, Some(Packaging::Enveloping));
        assert_eq!(by_namespace.schema.as_deref(), Some("<xs:schema/>"));
        assert_eq!(
            by_namespace.xslt_params.unwrap().destination_type,
            Some(DestinationType::Html)
        );

        let by_identifier = registry
            .lookup(&FormFingerprint {
                namespace: None,
                identifier: Some("http://data.gov.sk/doc/eform/App.GeneralAgenda/1.9".into()),
            })
            .unwrap();
        assert!(by_identifier.is_some());
    }

    #[test]
    fn test_unknown_form_and_missing_files() {
        let temp = TempDir::new().unwrap();
        write_form(temp.path(), "bare", r#"identifier = "urn:bare""#, false);
        fs::create_dir_all(temp.path().join("not-a-form")).unwrap();

        let registry = DirectoryFormRegistry::load(temp.path()).unwrap();
        assert_eq!(registry.len(), 1);
        let bare = registry
            .lookup(&FormFingerprint {
                namespace: None,
                identifier: Some("urn:bare".into()),
            })
            .unwrap()
            .unwrap();
        assert!(bare.schema.is_none());
        assert!(bare.xslt_params.is_none());

        let missing = registry
            .lookup(&FormFingerprint {
                namespace: Some("urn:other".into()),
                identifier: None,
            })
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_invalid_descriptor_is_configuration_error() {
        let temp = TempDir::new().unwrap();
        write_form(temp.path(), "broken", "identifier = [", false);
        let err = DirectoryFormRegistry::load(temp.path()).unwrap_err();
        assert!(matches!(err, SigningError::Configuration(_)));
    }

    #[test]
    fn test_missing_root_is_configuration_error() {
        let err = DirectoryFormRegistry::load("/nonexistent/forms").unwrap_err();
        assert!(matches!(err, SigningError::Configuration(_)));
    }
}
