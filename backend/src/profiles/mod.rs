//! Profile store - named conversion settings kept on disk
//!
//! A profile remembers how one bank's export should be read and mapped. The
//! store is a single JSON object of profile name to profile, and always
//! contains the built-in [`DEFAULT_PROFILE_NAME`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::encoding::DEFAULT_ENCODING;
use crate::error::{ProfileError, ProfileResult};
use crate::models::{ColumnMapping, ConversionOptions, Delimiter, TargetSchema};

/// Name of the built-in profile.
pub const DEFAULT_PROFILE_NAME: &str = "default profile";

/// Saved settings for one kind of export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub column_format: TargetSchema,
    pub chosen_columns: ColumnMapping,
    pub chosen_encoding: String,
    pub chosen_delimiter: Delimiter,
    pub start_at_row: usize,
    /// Use the first line as header and first data row.
    pub extra_row: bool,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            column_format: TargetSchema::Legacy,
            chosen_columns: ColumnMapping::identity(TargetSchema::Legacy),
            chosen_encoding: DEFAULT_ENCODING.to_string(),
            chosen_delimiter: Delimiter::Auto,
            start_at_row: 1,
            extra_row: false,
        }
    }
}

impl Profile {
    /// Capture the current conversion settings.
    pub fn capture(options: &ConversionOptions, schema: TargetSchema, mapping: &ColumnMapping) -> Self {
        Self {
            column_format: schema,
            chosen_columns: mapping.clone(),
            chosen_encoding: options.encoding.clone(),
            chosen_delimiter: options.delimiter,
            start_at_row: options.start_row,
            extra_row: options.duplicate_first_row,
        }
    }

    /// Parse options for this profile. Sign inversion and worksheet are
    /// per-file choices and start from their defaults.
    pub fn options(&self) -> ConversionOptions {
        ConversionOptions {
            delimiter: self.chosen_delimiter,
            encoding: self.chosen_encoding.clone(),
            start_row: self.start_at_row,
            duplicate_first_row: self.extra_row,
            ..Default::default()
        }
    }
}

/// Profiles keyed by lower-cased name, backed by one JSON file.
pub struct ProfileStore {
    path: PathBuf,
    profiles: BTreeMap<String, Profile>,
}

impl ProfileStore {
    /// Load the store at `path`. A missing file yields only the default profile.
    pub fn open(path: impl AsRef<Path>) -> ProfileResult<Self> {
        let path = PathBuf::from(path.as_ref());

        let stored: BTreeMap<String, Profile> = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            BTreeMap::new()
        };

        let mut profiles: BTreeMap<String, Profile> = stored
            .into_iter()
            .map(|(name, profile)| (normalize_name(&name), profile))
            .collect();
        profiles
            .entry(DEFAULT_PROFILE_NAME.to_string())
            .or_default();

        Ok(Self { path, profiles })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Profile names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    pub fn get(&self, name: &str) -> ProfileResult<&Profile> {
        self.profiles
            .get(&normalize_name(name))
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))
    }

    /// The named profile, or the default one if there is no such profile.
    pub fn resolve(&self, name: &str) -> Profile {
        self.profiles
            .get(&normalize_name(name))
            .or_else(|| self.profiles.get(DEFAULT_PROFILE_NAME))
            .cloned()
            .unwrap_or_default()
    }

    /// Insert or replace a profile. Call [`ProfileStore::save`] to persist.
    pub fn upsert(&mut self, name: &str, profile: Profile) {
        self.profiles.insert(normalize_name(name), profile);
    }

    pub fn remove(&mut self, name: &str) -> ProfileResult<Profile> {
        let key = normalize_name(name);
        if key == DEFAULT_PROFILE_NAME {
            return Err(ProfileError::Protected(key));
        }

        self.profiles
            .remove(&key)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))
    }

    /// Write the store as pretty JSON, creating parent directories.
    pub fn save(&self) -> ProfileResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(&self.profiles)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
