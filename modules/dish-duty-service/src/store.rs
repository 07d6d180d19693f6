//! JSON-file record store for registered users and the daily wash log.
//!
//! The in-memory ledger is a cache of the snapshot file. Every mutation is
//! checked, applied and written under one write lock, so concurrent callers
//! can never both pass the same uniqueness check.

use crate::clock::Clock;
use crate::error::StoreError;
use chrono::{NaiveDate, Utc};
use dish_duty_types::*;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct Store {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    ledger: RwLock<Ledger>,
}

impl Store {
    /// Load the snapshot at `path`, or start empty if it is absent or corrupt.
    ///
    /// The resulting state is written back before returning, so an
    /// unwritable location fails here instead of on the first mutation.
    pub fn open(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let ledger = match load_snapshot(&path)? {
            SnapshotLoad::Absent => {
                log::info!("No snapshot at {}, starting empty", path.display());
                Ledger::default()
            }
            SnapshotLoad::Corrupt(reason) => {
                log::warn!(
                    "Snapshot at {} is corrupt ({}), starting empty",
                    path.display(),
                    reason
                );
                preserve_corrupt(&path);
                Ledger::default()
            }
            SnapshotLoad::Valid(stored) => {
                let (ledger, report) = Ledger::from_stored(stored);
                report.log(&path);
                if report.dropped_rows() {
                    preserve_pre_migration(&path)?;
                }
                ledger
            }
        };

        write_atomic(&path, &ledger.snapshot)?;
        log::info!(
            "Opened store at {} ({} users, {} history entries)",
            path.display(),
            ledger.snapshot.users.len(),
            ledger.snapshot.history.len()
        );

        Ok(Self {
            path,
            clock,
            ledger: RwLock::new(ledger),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if the user was newly added, `false` if the id was already known.
    /// Re-registration never changes the stored name.
    pub fn register(&self, id: UserId, name: &str) -> Result<bool, StoreError> {
        let mut ledger = self.ledger.write();
        if ledger.user_index.contains_key(&id) {
            return Ok(false);
        }

        ledger.push_user(User {
            id,
            name: name.to_string(),
        });
        if let Err(e) = write_atomic(&self.path, &ledger.snapshot) {
            ledger.pop_user();
            log::error!("Failed to persist registration of user {}: {}", id, e);
            return Err(e);
        }

        log::info!("Registered user {} ({})", id, name);
        Ok(true)
    }

    /// Record that `id` washed the dishes today.
    pub fn log_action(&self, id: UserId) -> Result<LogResult, StoreError> {
        let today = self.clock.today();
        let mut ledger = self.ledger.write();

        if !ledger.user_index.contains_key(&id) {
            return Ok(LogResult::UnknownUser);
        }
        if ledger.logged.contains(&(today, id)) {
            return Ok(LogResult::AlreadyRecordedToday);
        }

        ledger.push_entry(HistoryEntry {
            date: today,
            user_id: id,
        });
        if let Err(e) = write_atomic(&self.path, &ledger.snapshot) {
            ledger.pop_entry();
            log::error!("Failed to persist history entry for user {}: {}", id, e);
            return Err(e);
        }

        log::info!("Recorded wash by user {} on {}", id, today);
        Ok(LogResult::Recorded)
    }

    /// The last `limit` entries, oldest first, resolved to display names.
    pub fn recent_history(&self, limit: usize) -> Vec<HistoryLine> {
        let ledger = self.ledger.read();
        let history = &ledger.snapshot.history;
        let start = history.len().saturating_sub(limit);

        history[start..]
            .iter()
            .map(|entry| HistoryLine {
                date: entry.date,
                name: ledger.display_name(entry.user_id),
            })
            .collect()
    }

    /// Registered users in registration order.
    pub fn users(&self) -> Vec<User> {
        self.ledger.read().snapshot.users.clone()
    }

    pub fn stats(&self) -> StoreStats {
        let today = self.clock.today();
        let ledger = self.ledger.read();
        StoreStats {
            total_users: ledger.snapshot.users.len(),
            total_entries: ledger.snapshot.history.len(),
            entries_today: ledger
                .snapshot
                .history
                .iter()
                .filter(|e| e.date == today)
                .count(),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.ledger.read().snapshot.clone()
    }
}

// =====================================================
// In-memory ledger
// =====================================================

/// Snapshot plus lookup indexes. The indexes always mirror `snapshot`.
#[derive(Default)]
struct Ledger {
    snapshot: Snapshot,
    user_index: HashMap<UserId, usize>,
    logged: HashSet<(NaiveDate, UserId)>,
}

impl Ledger {
    /// Build from what was on disk, migrating name-keyed rows and dropping duplicates.
    fn from_stored(stored: StoredSnapshot) -> (Self, LoadReport) {
        let mut ledger = Ledger::default();
        let mut report = LoadReport::default();

        for user in stored.users {
            if ledger.user_index.contains_key(&user.id) {
                report.duplicate_users += 1;
                continue;
            }
            ledger.push_user(user);
        }

        for row in stored.history {
            let entry = match row {
                StoredEntry::Keyed { date, user_id } => HistoryEntry { date, user_id },
                StoredEntry::Legacy { date, user } => match ledger.user_id_by_name(&user) {
                    Some(user_id) => {
                        report.migrated += 1;
                        HistoryEntry { date, user_id }
                    }
                    None => {
                        report.unresolved.push(user);
                        continue;
                    }
                },
            };
            if ledger.logged.contains(&(entry.date, entry.user_id)) {
                report.duplicate_entries += 1;
                continue;
            }
            ledger.push_entry(entry);
        }

        (ledger, report)
    }

    fn push_user(&mut self, user: User) {
        self.user_index.insert(user.id, self.snapshot.users.len());
        self.snapshot.users.push(user);
    }

    fn pop_user(&mut self) {
        if let Some(user) = self.snapshot.users.pop() {
            self.user_index.remove(&user.id);
        }
    }

    fn push_entry(&mut self, entry: HistoryEntry) {
        self.logged.insert((entry.date, entry.user_id));
        self.snapshot.history.push(entry);
    }

    fn pop_entry(&mut self) {
        if let Some(entry) = self.snapshot.history.pop() {
            self.logged.remove(&(entry.date, entry.user_id));
        }
    }

    fn user_id_by_name(&self, name: &str) -> Option<UserId> {
        self.snapshot
            .users
            .iter()
            .find(|u| u.name == name)
            .map(|u| u.id)
    }

    fn display_name(&self, id: UserId) -> String {
        self.user_index
            .get(&id)
            .and_then(|&idx| self.snapshot.users.get(idx))
            .map(|u| u.name.clone())
            .unwrap_or_else(|| format!("unknown user #{}", id))
    }
}

#[derive(Default)]
struct LoadReport {
    migrated: usize,
    unresolved: Vec<String>,
    duplicate_users: usize,
    duplicate_entries: usize,
}

impl LoadReport {
    /// Whether the normalized snapshot lost rows that were on disk.
    fn dropped_rows(&self) -> bool {
        !self.unresolved.is_empty() || self.duplicate_users > 0 || self.duplicate_entries > 0
    }

    fn log(&self, path: &Path) {
        if self.migrated > 0 {
            log::info!(
                "Migrated {} name-keyed history entries in {} to user ids",
                self.migrated,
                path.display()
            );
        }
        if !self.unresolved.is_empty() {
            log::warn!(
                "Dropped {} history entries in {} naming unregistered users: {:?}",
                self.unresolved.len(),
                path.display(),
                self.unresolved
            );
        }
        if self.duplicate_users > 0 || self.duplicate_entries > 0 {
            log::warn!(
                "Dropped {} duplicate users and {} duplicate history entries in {}",
                self.duplicate_users,
                self.duplicate_entries,
                path.display()
            );
        }
    }
}

// =====================================================
// Snapshot file
// =====================================================

/// On-disk shape, lenient enough to read snapshots written before history was id-keyed.
#[derive(Deserialize)]
struct StoredSnapshot {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    history: Vec<StoredEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Keyed { date: NaiveDate, user_id: UserId },
    Legacy { date: NaiveDate, user: String },
}

enum SnapshotLoad {
    Absent,
    Corrupt(String),
    Valid(StoredSnapshot),
}

fn load_snapshot(path: &Path) -> Result<SnapshotLoad, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SnapshotLoad::Absent),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    match serde_json::from_slice::<StoredSnapshot>(&bytes) {
        Ok(stored) => Ok(SnapshotLoad::Valid(stored)),
        Err(e) => Ok(SnapshotLoad::Corrupt(e.to_string())),
    }
}

/// Move a corrupt snapshot aside so it survives the fresh write.
fn preserve_corrupt(path: &Path) {
    let backup = sibling(path, &format!("corrupt-{}", backup_stamp()));
    match fs::rename(path, &backup) {
        Ok(()) => log::warn!("Preserved corrupt snapshot as {}", backup.display()),
        Err(e) => log::warn!(
            "Could not preserve corrupt snapshot {}: {}; it will be overwritten",
            path.display(),
            e
        ),
    }
}

/// Copy the snapshot aside before normalization drops rows from it.
/// Failing to keep the copy is fatal.
fn preserve_pre_migration(path: &Path) -> Result<(), StoreError> {
    let backup = sibling(path, &format!("pre-migration-{}", backup_stamp()));
    fs::copy(path, &backup).map_err(|e| StoreError::io(&backup, e))?;
    log::warn!("Kept the snapshot as it was before migration in {}", backup.display());
    Ok(())
}

fn backup_stamp() -> String {
    Utc::now().format("%Y%m%dT%H%M%SZ").to_string()
}

/// Write to `<file>.tmp` and rename over the target, so an interrupted
/// write never leaves a truncated snapshot behind.
fn write_atomic(path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let temp_path = sibling(path, "tmp");
    let result = write_file(&temp_path, snapshot)
        .and_then(|()| fs::rename(&temp_path, path).map_err(|e| StoreError::io(path, e)));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_file(path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    // Encode up front so write failures stay I/O errors
    let bytes = serde_json::to_vec_pretty(snapshot)?;
    let mut file = File::create(path).map_err(|e| StoreError::io(path, e))?;
    write_bytes(&mut file, &bytes, path)?;
    file.sync_all().map_err(|e| StoreError::io(path, e))
}

fn write_bytes(writer: &mut impl Write, bytes: &[u8], path: &Path) -> Result<(), StoreError> {
    writer
        .write_all(bytes)
        .and_then(|()| writer.flush())
        .map_err(|e| StoreError::io(path, e))
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot".to_string());
    path.with_file_name(format!("{}.{}", name, suffix))
}
