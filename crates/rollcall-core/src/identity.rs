//! Identity table: the static list of people who can be marked present.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("failed to read identity file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid identity TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("identity with empty name")]
    EmptyName,
    #[error("duplicate identity name: {0}")]
    DuplicateName(String),
}

/// A known person: display details plus the reference images used to
/// build their face descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub reference_images: Vec<PathBuf>,
}

#[derive(Deserialize)]
struct IdentityFile {
    #[serde(default, rename = "identity")]
    identities: Vec<Identity>,
}

/// Ordered, validated set of identities with unique names.
///
/// Table order is the matcher's tie-break order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct IdentityTable {
    identities: Vec<Identity>,
}

impl IdentityTable {
    pub fn new(identities: Vec<Identity>) -> Result<Self, IdentityError> {
        let mut seen = HashSet::new();
        for identity in &identities {
            if identity.name.trim().is_empty() {
                return Err(IdentityError::EmptyName);
            }
            if !seen.insert(identity.name.as_str()) {
                return Err(IdentityError::DuplicateName(identity.name.clone()));
            }
        }
        Ok(Self { identities })
    }

    /// Parse a table of `[[identity]]` entries.
    pub fn from_toml(src: &str) -> Result<Self, IdentityError> {
        let file: IdentityFile = toml::from_str(src)?;
        Self::new(file.identities)
    }

    pub fn load(path: &Path) -> Result<Self, IdentityError> {
        let src = std::fs::read_to_string(path).map_err(|source| IdentityError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&src)
    }

    /// Resolve relative reference image paths against `base_dir`.
    pub fn with_image_dir(mut self, base_dir: &Path) -> Self {
        for identity in &mut self.identities {
            for image in &mut identity.reference_images {
                if image.is_relative() {
                    *image = base_dir.join(&*image);
                }
            }
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Identity> {
        self.identities.iter().find(|i| i.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Identity> {
        self.identities.iter()
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

impl<'a> IntoIterator for &'a IdentityTable {
    type Item = &'a Identity;
    type IntoIter = std::slice::Iter<'a, Identity>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
