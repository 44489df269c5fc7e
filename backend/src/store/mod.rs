//! Profile store - keep profiles on disk and match them to input headers.
//!
//! One JSON file per profile under `.crmload/profiles` (or
//! `$CRMLOAD_PROFILE_DIR`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{StoreError, StoreResult};
use crate::models::{normalize_key, Profile};

/// Directory where profiles are stored (relative to current dir)
pub const DEFAULT_PROFILE_DIR: &str = ".crmload/profiles";

/// Environment variable overriding [`DEFAULT_PROFILE_DIR`].
pub const PROFILE_DIR_ENV: &str = "CRMLOAD_PROFILE_DIR";

/// Profiles must cover more than this share of their source headers to match.
const MIN_COMPATIBILITY: f64 = 0.5;

/// A stored profile with usage metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredProfile {
    pub id: String,
    pub name: String,
    pub profile: Profile,
    /// Input columns the profile reads
    pub source_headers: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
    #[serde(default)]
    pub use_count: u32,
}

/// On-disk profile store
pub struct ProfileStore {
    dir: PathBuf,
    profiles: HashMap<String, StoredProfile>,
}

impl ProfileStore {
    /// Open the store at `$CRMLOAD_PROFILE_DIR` or the default directory.
    pub fn open() -> Self {
        let dir = std::env::var(PROFILE_DIR_ENV)
            .ok()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PROFILE_DIR.to_string());
        Self::with_dir(dir)
    }

    /// Open a store in a specific directory, loading what is already there.
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        let mut store = Self {
            dir: dir.as_ref().to_path_buf(),
            profiles: HashMap::new(),
        };
        store.load_all();
        store
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Unreadable files are skipped.
    fn load_all(&mut self) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(_) => return,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "json") {
                if let Ok(content) = fs::read_to_string(&path) {
                    if let Ok(stored) = serde_json::from_str::<StoredProfile>(&content) {
                        self.profiles.insert(stored.id.clone(), stored);
                    }
                }
            }
        }
    }

    /// All profiles, sorted by name.
    pub fn list(&self) -> Vec<&StoredProfile> {
        let mut all: Vec<_> = self.profiles.values().collect();
        all.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()).then_with(|| a.id.cmp(&b.id)));
        all
    }

    pub fn get(&self, id: &str) -> Option<&StoredProfile> {
        self.profiles.get(id)
    }

    /// Profiles whose source headers mostly appear in `headers`, best first.
    ///
    /// Equal scores are ordered by most recent use.
    pub fn find_compatible(&self, headers: &[String]) -> Vec<(&StoredProfile, f64)> {
        let mut compatible: Vec<_> = self
            .profiles
            .values()
            .filter_map(|p| {
                let score = compatibility(&p.source_headers, headers);
                (score > MIN_COMPATIBILITY).then_some((p, score))
            })
            .collect();

        compatible.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.0.last_used.cmp(&a.0.last_used))
                .then_with(|| a.0.id.cmp(&b.0.id))
        });

        compatible
    }

    /// Store a profile; returns its new id.
    pub fn save(&mut self, profile: Profile, name: &str) -> StoreResult<String> {
        fs::create_dir_all(&self.dir)?;

        let id = generate_id(name);
        let stored = StoredProfile {
            id: id.clone(),
            name: name.to_string(),
            source_headers: profile.source_fields(),
            profile,
            created_at: Utc::now(),
            last_used: None,
            use_count: 0,
        };

        self.write(&stored)?;
        self.profiles.insert(id.clone(), stored);
        Ok(id)
    }

    /// Import a profile JSON file, validating it first.
    pub fn import(&mut self, path: &Path, name: Option<&str>) -> StoreResult<String> {
        let content = fs::read_to_string(path)?;
        let profile = Profile::from_json(&content)?;

        let profile_name = match name {
            Some(n) => n.to_string(),
            None if !profile.name.trim().is_empty() => profile.name.clone(),
            None => path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("imported")
                .to_string(),
        };

        self.save(profile, &profile_name)
    }

    /// Record one use of a profile.
    pub fn mark_used(&mut self, id: &str) -> StoreResult<()> {
        let stored = self
            .profiles
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        stored.last_used = Some(Utc::now());
        stored.use_count += 1;

        let stored = stored.clone();
        self.write(&stored)
    }

    pub fn delete(&mut self, id: &str) -> StoreResult<()> {
        if self.profiles.remove(id).is_none() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        fs::remove_file(self.path_for(id))?;
        Ok(())
    }

    fn write(&self, stored: &StoredProfile) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(stored)?;
        fs::write(self.path_for(&stored.id), content)?;
        Ok(())
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::open()
    }
}

/// Share of `stored` headers present in `input`, case-insensitive.
pub fn compatibility(stored: &[String], input: &[String]) -> f64 {
    if stored.is_empty() {
        return 0.0;
    }

    let input: Vec<String> = input.iter().map(|c| normalize_key(c)).collect();
    let matched = stored
        .iter()
        .filter(|col| input.contains(&normalize_key(col)))
        .count();

    matched as f64 / stored.len() as f64
}

/// Slug of `name` plus a short random suffix.
fn generate_id(name: &str) -> String {
    let slug = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let slug = if slug.is_empty() { "profile".to_string() } else { slug };
    format!("{}-{}", slug, &suffix[..8])
}
