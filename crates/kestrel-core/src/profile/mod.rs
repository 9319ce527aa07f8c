//! Persistent browser profiles.
//!
//! A profile is a portable directory:
//!
//! ```text
//! <profile>/
//!   user_data/         opaque browser state
//!   metadata.json      id, name, timestamps, tags, overrides, lock pid
//!   preferences.json   browser preferences
//!   .lock              {pid, timestamp} advisory lock
//! ```
//!
//! The lock is advisory and pid-based: it is honored while the owning
//! process is alive and pruned once it is not. The liveness check is
//! cheap and not atomic, which is acceptable because profiles are not
//! concurrent write paths.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::ProfileError;

/// Lifecycle state of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProfileState {
    /// Usable.
    #[default]
    Ready,
    /// Locked by a live process.
    Locked,
    /// Marked for deletion.
    Retired,
}

/// Profile metadata, persisted as `metadata.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileMetadata {
    /// Stable id.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last acquisition time.
    pub last_used: Option<DateTime<Utc>>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// User agent override carried with the profile.
    pub user_agent: Option<String>,
    /// Proxy override carried with the profile.
    pub proxy: Option<String>,
    /// Lifecycle state.
    #[serde(default)]
    pub state: ProfileState,
    /// Pid of the lock owner, mirrored from `.lock`.
    pub lock_pid: Option<u32>,
}

/// Content of the `.lock` file.
#[derive(Debug, Serialize, Deserialize)]
struct LockFile {
    pid: u32,
    timestamp: DateTime<Utc>,
}

const METADATA_FILE: &str = "metadata.json";
const PREFERENCES_FILE: &str = "preferences.json";
const LOCK_FILE: &str = ".lock";
const USER_DATA_DIR: &str = "user_data";

/// Whether a pid belongs to a live process.
fn process_alive(pid: u32) -> bool {
    #[cfg(target_os = "linux")]
    {
        Path::new(&format!("/proc/{pid}")).exists()
    }
    #[cfg(not(target_os = "linux"))]
    {
        // Without a cheap probe, assume alive; stale locks then only
        // clear via explicit cleanup.
        let _ = pid;
        true
    }
}

/// Guard for an acquired profile lock; releases on drop.
#[derive(Debug)]
pub struct ProfileLock {
    lock_path: PathBuf,
    released: bool,
}

impl ProfileLock {
    /// Release the lock now.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = fs::remove_file(&self.lock_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.lock_path.display(), error = %e, "Failed to remove lock file");
            }
        }
    }
}

impl Drop for ProfileLock {
    fn drop(&mut self) {
        self.release_inner();
    }
}

/// One profile directory.
#[derive(Debug, Clone)]
pub struct Profile {
    path: PathBuf,
    metadata: ProfileMetadata,
}

impl Profile {
    /// Load an existing profile from `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ProfileError> {
        let path = path.into();
        if !path.is_dir() {
            return Err(ProfileError::Missing(path.display().to_string()));
        }
        let raw = fs::read_to_string(path.join(METADATA_FILE))
            .map_err(|_| ProfileError::Missing(path.display().to_string()))?;
        let metadata: ProfileMetadata = serde_json::from_str(&raw)?;
        Ok(Self { path, metadata })
    }

    /// The profile's stable id.
    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    /// The profile's name.
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// The profile directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The browser state directory to pass as `--user-data-dir`.
    pub fn user_data_dir(&self) -> PathBuf {
        self.path.join(USER_DATA_DIR)
    }

    /// The metadata snapshot.
    pub fn metadata(&self) -> &ProfileMetadata {
        &self.metadata
    }

    /// Whether a live process holds the lock.
    pub fn is_locked(&self) -> bool {
        self.lock_owner().is_some()
    }

    /// The live pid holding the lock, if any.
    pub fn lock_owner(&self) -> Option<u32> {
        let raw = fs::read_to_string(self.path.join(LOCK_FILE)).ok()?;
        let lock: LockFile = serde_json::from_str(&raw).ok()?;
        process_alive(lock.pid).then_some(lock.pid)
    }

    /// Acquire the advisory lock and touch `last_used`.
    ///
    /// # Errors
    ///
    /// Returns `Locked` when another live process owns the lock. A lock
    /// left behind by a dead process is pruned and taken over.
    #[instrument(level = "debug", skip(self), fields(profile = %self.metadata.id))]
    pub fn acquire(&mut self) -> Result<ProfileLock, ProfileError> {
        let lock_path = self.path.join(LOCK_FILE);

        if let Some(pid) = self.lock_owner() {
            if pid != std::process::id() {
                return Err(ProfileError::Locked { pid });
            }
        } else if lock_path.exists() {
            debug!(path = %lock_path.display(), "Pruning stale profile lock");
            let _ = fs::remove_file(&lock_path);
        }

        let lock = LockFile {
            pid: std::process::id(),
            timestamp: Utc::now(),
        };
        fs::write(&lock_path, serde_json::to_string(&lock)?)?;

        self.metadata.lock_pid = Some(lock.pid);
        self.metadata.state = ProfileState::Locked;
        self.metadata.last_used = Some(Utc::now());
        self.save_metadata()?;

        info!(profile = %self.metadata.id, "Profile lock acquired");
        Ok(ProfileLock {
            lock_path,
            released: false,
        })
    }

    /// Read `preferences.json`; an absent file is an empty object.
    pub fn preferences(&self) -> Result<serde_json::Value, ProfileError> {
        match fs::read_to_string(self.path.join(PREFERENCES_FILE)) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(serde_json::Value::Object(serde_json::Map::new()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace `preferences.json`.
    pub fn set_preferences(&self, preferences: &serde_json::Value) -> Result<(), ProfileError> {
        fs::write(
            self.path.join(PREFERENCES_FILE),
            serde_json::to_string_pretty(preferences)?,
        )?;
        Ok(())
    }

    fn save_metadata(&self) -> Result<(), ProfileError> {
        fs::write(
            self.path.join(METADATA_FILE),
            serde_json::to_string_pretty(&self.metadata)?,
        )?;
        Ok(())
    }
}

/// Manages a directory of profiles.
#[derive(Debug)]
pub struct ProfileManager {
    root: PathBuf,
}

impl ProfileManager {
    /// A manager rooted at `root`, created on demand.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ProfileError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a new profile named `name`.
    #[instrument(level = "debug", skip(self))]
    pub fn create(&self, name: &str) -> Result<Profile, ProfileError> {
        let id = format!(
            "{}-{}",
            sanitize_name(name),
            &Uuid::new_v4().to_string()[..8]
        );
        let path = self.root.join(&id);
        fs::create_dir_all(path.join(USER_DATA_DIR))?;

        let metadata = ProfileMetadata {
            id: id.clone(),
            name: name.to_string(),
            created_at: Utc::now(),
            last_used: None,
            tags: Vec::new(),
            user_agent: None,
            proxy: None,
            state: ProfileState::Ready,
            lock_pid: None,
        };
        let profile = Profile { path, metadata };
        profile.save_metadata()?;
        profile.set_preferences(&serde_json::Value::Object(serde_json::Map::new()))?;

        info!(id = %id, "Profile created");
        Ok(profile)
    }

    /// Load a profile by id.
    pub fn get(&self, id: &str) -> Result<Profile, ProfileError> {
        Profile::open(self.root.join(id))
    }

    /// Find a profile by name.
    pub fn get_by_name(&self, name: &str) -> Result<Option<Profile>, ProfileError> {
        Ok(self
            .list()?
            .into_iter()
            .find(|profile| profile.name() == name))
    }

    /// All loadable profiles under the root.
    pub fn list(&self) -> Result<Vec<Profile>, ProfileError> {
        let mut profiles = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.path().is_dir() {
                match Profile::open(entry.path()) {
                    Ok(profile) => profiles.push(profile),
                    Err(e) => {
                        debug!(path = %entry.path().display(), error = %e, "Skipping non-profile directory");
                    }
                }
            }
        }
        profiles.sort_by(|a, b| a.metadata.created_at.cmp(&b.metadata.created_at));
        Ok(profiles)
    }

    /// Profiles not currently locked by a live process.
    pub fn list_available(&self) -> Result<Vec<Profile>, ProfileError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|profile| !profile.is_locked())
            .collect())
    }

    /// Delete a profile directory.
    ///
    /// # Errors
    ///
    /// Returns `Locked` when a live process owns the profile.
    pub fn delete(&self, id: &str) -> Result<(), ProfileError> {
        let profile = self.get(id)?;
        if let Some(pid) = profile.lock_owner() {
            return Err(ProfileError::Locked { pid });
        }
        fs::remove_dir_all(profile.path())?;
        info!(id, "Profile deleted");
        Ok(())
    }

    /// Copy a profile under a new name.
    pub fn duplicate(&self, id: &str, new_name: &str) -> Result<Profile, ProfileError> {
        let source = self.get(id)?;
        let target = self.create(new_name)?;
        copy_dir_recursive(&source.user_data_dir(), &target.user_data_dir())?;
        fs::copy(
            source.path().join(PREFERENCES_FILE),
            target.path().join(PREFERENCES_FILE),
        )?;
        Ok(target)
    }

    /// Remove lock files owned by dead processes; returns how many were
    /// pruned.
    pub fn cleanup_stale_locks(&self) -> Result<usize, ProfileError> {
        let mut pruned = 0;
        for profile in self.list()? {
            let lock_path = profile.path().join(LOCK_FILE);
            if lock_path.exists() && profile.lock_owner().is_none() {
                if fs::remove_file(&lock_path).is_ok() {
                    debug!(id = %profile.id(), "Pruned stale lock");
                    pruned += 1;
                }
            }
        }
        Ok(pruned)
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
