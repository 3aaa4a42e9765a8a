//! Timestamped backups of tracked data files.
//!
//! Before a tracked file is overwritten its previous content is copied into
//! `<backups_root>/<stamp>/<relative path>`. Stamps are fixed-width UTC
//! timestamps with microsecond precision, so sorting directory names sorts
//! snapshots chronologically. Only the newest `retention` snapshots are kept.

use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDateTime, SubsecRound, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::lock::normalize_path;

/// Snapshots kept when no retention is configured.
pub const DEFAULT_RETENTION: usize = 30;
/// Directory under the data root that holds snapshots.
pub const BACKUPS_DIR_NAME: &str = "backups";

const STAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.6f";
const STAMP_PARSE_FORMAT: &str = "%Y%m%dT%H%M%S%.f";

/// Format a snapshot stamp.
pub fn format_stamp(at: DateTime<Utc>) -> String {
    at.format(STAMP_FORMAT).to_string()
}

/// Parse a snapshot directory name back into its timestamp.
pub fn parse_stamp(name: &str) -> Option<DateTime<Utc>> {
    if name.len() != 22 {
        return None;
    }
    NaiveDateTime::parse_from_str(name, STAMP_PARSE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// One snapshot directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    /// Directory name (the stamp).
    pub name: String,
    pub path: PathBuf,
    pub created_at: Option<DateTime<Utc>>,
    /// Files in the snapshot, relative to the snapshot directory.
    pub files: Vec<String>,
}

/// Outcome of restoring a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreReport {
    /// Every file in the snapshot was restored.
    pub ok: bool,
    pub files_restored: usize,
    pub message: String,
    /// Files that could not be restored, with the reason.
    #[serde(default)]
    pub failures: Vec<String>,
}

impl RestoreReport {
    pub(crate) fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            files_restored: 0,
            message: message.into(),
            failures: Vec::new(),
        }
    }
}

/// Creates, prunes and enumerates snapshots for one data root.
#[derive(Debug)]
pub struct BackupManager {
    data_root: PathBuf,
    backups_root: PathBuf,
    retention: usize,
    last_stamp: Mutex<Option<DateTime<Utc>>>,
}

impl BackupManager {
    /// Manage backups for `data_root`, stored under `data_root/backups`.
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        let data_root = normalize_path(&data_root.into());
        let backups_root = data_root.join(BACKUPS_DIR_NAME);
        Self {
            data_root,
            backups_root,
            retention: DEFAULT_RETENTION,
            last_stamp: Mutex::new(None),
        }
    }

    /// Keep at most `retention` snapshots (at least one).
    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention.max(1);
        self
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    pub fn backups_root(&self) -> &Path {
        &self.backups_root
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Path of `path` relative to the data root, if it is a tracked file.
    ///
    /// Files inside the backups root are never tracked.
    pub fn tracked_relative(&self, path: &Path) -> Option<PathBuf> {
        let path = normalize_path(path);
        if path.starts_with(&self.backups_root) {
            return None;
        }
        path.strip_prefix(&self.data_root)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }

    /// A stamp strictly later than every stamp issued before and not yet
    /// used by a snapshot directory.
    fn next_stamp(&self) -> String {
        let mut last = self.last_stamp.lock();
        let now = Utc::now().trunc_subsecs(6);
        let mut candidate = match *last {
            Some(prev) if now <= prev => prev + Duration::microseconds(1),
            _ => now,
        };
        while self.backups_root.join(format_stamp(candidate)).exists() {
            candidate += Duration::microseconds(1);
        }
        *last = Some(candidate);
        format_stamp(candidate)
    }

    /// Copy `path` into a new snapshot, then prune old snapshots.
    ///
    /// Returns the snapshot directory, or `None` when there was nothing to
    /// back up: the file is missing, lies outside the data root, or lies
    /// inside the backups root.
    pub fn backup_if_exists(&self, path: &Path) -> StoreResult<Option<PathBuf>> {
        let Some(relative) = self.tracked_relative(path) else {
            return Ok(None);
        };
        if !path.is_file() {
            return Ok(None);
        }

        let snapshot = self.backups_root.join(self.next_stamp());
        self.fill_snapshot(&snapshot, &[(path.to_path_buf(), relative.clone())])?;
        tracing::debug!(
            file = %relative.display(),
            snapshot = %snapshot.display(),
            "backed up file before overwrite"
        );

        self.prune_old_snapshots()?;
        Ok(Some(snapshot))
    }

    /// Copy every existing tracked file of `paths` into one new snapshot.
    pub fn snapshot_all(&self, paths: &[PathBuf]) -> StoreResult<Option<SnapshotInfo>> {
        let tracked: Vec<(PathBuf, PathBuf)> = paths
            .iter()
            .filter(|p| p.is_file())
            .filter_map(|p| self.tracked_relative(p).map(|rel| (p.clone(), rel)))
            .collect();
        if tracked.is_empty() {
            return Ok(None);
        }

        let name = self.next_stamp();
        let snapshot = self.backups_root.join(&name);
        self.fill_snapshot(&snapshot, &tracked)?;
        tracing::info!(snapshot = %name, files = tracked.len(), "created full snapshot");

        self.prune_old_snapshots()?;
        self.describe(&name, snapshot).map(Some)
    }

    /// Copy `(source, relative)` pairs into a new snapshot directory.
    ///
    /// On failure the snapshot directory is removed again, so a failed backup
    /// never shows up as a snapshot or counts towards retention.
    fn fill_snapshot(&self, snapshot: &Path, files: &[(PathBuf, PathBuf)]) -> StoreResult<()> {
        let copied = files.iter().try_for_each(|(source, relative)| {
            let dest = snapshot.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
            fs::copy(source, &dest)
                .map(|_| ())
                .map_err(|e| StoreError::io(source, e))
        });
        if copied.is_err() && snapshot.exists() {
            if let Err(e) = fs::remove_dir_all(snapshot) {
                tracing::warn!(
                    snapshot = %snapshot.display(),
                    "failed to remove partial snapshot: {e}"
                );
            }
        }
        copied
    }

    /// Copy a broken file to `<path>.bak-<stamp>` beside it.
    pub fn quarantine(&self, path: &Path) -> StoreResult<PathBuf> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let dest = path.with_file_name(format!("{file_name}.bak-{}", self.next_stamp()));
        fs::copy(path, &dest).map_err(|e| StoreError::io(path, e))?;
        tracing::warn!(
            path = %path.display(),
            quarantine = %dest.display(),
            "quarantined unreadable document"
        );
        Ok(dest)
    }

    /// Snapshot directory names, oldest first.
    fn snapshot_names(&self) -> StoreResult<Vec<String>> {
        if !self.backups_root.exists() {
            return Ok(Vec::new());
        }
        let entries =
            fs::read_dir(&self.backups_root).map_err(|e| StoreError::io(&self.backups_root, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.backups_root, e))?;
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            let name = entry.file_name().to_string_lossy().to_string();
            if is_dir && parse_stamp(&name).is_some() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete the oldest snapshots until at most `retention` remain.
    ///
    /// Returns how many were removed.
    pub fn prune_old_snapshots(&self) -> StoreResult<usize> {
        let names = self.snapshot_names()?;
        let excess = names.len().saturating_sub(self.retention);
        for name in names.iter().take(excess) {
            let dir = self.backups_root.join(name);
            fs::remove_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
            tracing::debug!(snapshot = %name, "pruned old snapshot");
        }
        Ok(excess)
    }

    /// All snapshots, oldest first.
    pub fn list_snapshots(&self) -> StoreResult<Vec<SnapshotInfo>> {
        self.snapshot_names()?
            .into_iter()
            .map(|name| {
                let path = self.backups_root.join(&name);
                self.describe(&name, path)
            })
            .collect()
    }

    /// Resolve a snapshot name to its directory.
    ///
    /// Names that are not a single plain path component are rejected, so a
    /// restore can never read from outside the backups root.
    pub fn snapshot_dir(&self, name: &str) -> StoreResult<PathBuf> {
        let mut components = Path::new(name).components();
        let single = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        let dir = self.backups_root.join(name);
        if !single || !dir.is_dir() {
            return Err(StoreError::SnapshotNotFound(name.to_string()));
        }
        Ok(dir)
    }

    /// Read every file of a snapshot into memory as `(relative path, bytes)`.
    pub fn read_snapshot(&self, name: &str) -> StoreResult<Vec<(PathBuf, Vec<u8>)>> {
        let dir = self.snapshot_dir(name)?;
        let mut files = Vec::new();
        for relative in collect_files(&dir)? {
            let source = dir.join(&relative);
            let bytes = fs::read(&source).map_err(|e| StoreError::io(&source, e))?;
            files.push((relative, bytes));
        }
        Ok(files)
    }

    fn describe(&self, name: &str, path: PathBuf) -> StoreResult<SnapshotInfo> {
        let files = collect_files(&path)?
            .into_iter()
            .map(|rel| {
                rel.components()
                    .map(|c| c.as_os_str().to_string_lossy().to_string())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .collect();
        Ok(SnapshotInfo {
            name: name.to_string(),
            created_at: parse_stamp(name),
            path,
            files,
        })
    }
}

/// Regular files under `dir`, relative to it, sorted.
fn collect_files(dir: &Path) -> StoreResult<Vec<PathBuf>> {
    let mut out = Vec::new();
    let mut pending = vec![PathBuf::new()];
    while let Some(relative) = pending.pop() {
        let current = dir.join(&relative);
        let entries = fs::read_dir(&current).map_err(|e| StoreError::io(&current, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&current, e))?;
            let file_type = entry.file_type().map_err(|e| StoreError::io(entry.path(), e))?;
            let child = relative.join(entry.file_name());
            if file_type.is_dir() {
                pending.push(child);
            } else if file_type.is_file() {
                out.push(child);
            }
        }
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(dir: &Path) -> BackupManager {
        BackupManager::new(dir.join("data"))
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn stamps_are_fixed_width_and_parse_back() {
        let at = DateTime::parse_from_rfc3339("2026-03-04T05:06:07.000008Z")
            .unwrap()
            .with_timezone(&Utc);
        let stamp = format_stamp(at);
        assert_eq!(stamp, "20260304T050607.000008");
        assert_eq!(parse_stamp(&stamp), Some(at));
        assert_eq!(parse_stamp("not-a-stamp"), None);
    }

    #[test]
    fn stamps_strictly_increase() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager(dir.path());
        let stamps: Vec<String> = (0..100).map(|_| m.next_stamp()).collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn missing_file_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager(dir.path());
        let out = m.backup_if_exists(&m.data_root().join("profiles.json")).unwrap();
        assert!(out.is_none());
        assert!(m.list_snapshots().unwrap().is_empty());
    }

    #[test]
    fn files_outside_root_or_inside_backups_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager(dir.path());
        let outside = dir.path().join("elsewhere.json");
        write(&outside, "{}");
        assert!(m.backup_if_exists(&outside).unwrap().is_none());

        let inside_backups = m.backups_root().join("stray.json");
        write(&inside_backups, "{}");
        assert!(m.backup_if_exists(&inside_backups).unwrap().is_none());
    }

    #[test]
    fn backup_copies_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager(dir.path());
        let file = m.data_root().join("profiles.json");
        write(&file, "[1]");

        let snapshot = m.backup_if_exists(&file).unwrap().unwrap();
        assert_eq!(fs::read_to_string(snapshot.join("profiles.json")).unwrap(), "[1]");

        let list = m.list_snapshots().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].files, vec!["profiles.json".to_string()]);
        assert!(list[0].created_at.is_some());
    }

    #[test]
    fn prune_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager(dir.path()).with_retention(3);
        let file = m.data_root().join("sessions.json");
        let mut created = Vec::new();
        for i in 0..6 {
            write(&file, &format!("[{i}]"));
            let snap = m.backup_if_exists(&file).unwrap().unwrap();
            created.push(snap.file_name().unwrap().to_string_lossy().to_string());
        }
        let names: Vec<String> = m.list_snapshots().unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, created[3..].to_vec());
    }

    #[test]
    fn snapshot_all_collects_every_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager(dir.path());
        let a = m.data_root().join("profiles.json");
        let b = m.data_root().join("plans.json");
        let missing = m.data_root().join("sessions.json");
        write(&a, "[]");
        write(&b, "[]");

        let info = m.snapshot_all(&[a, b, missing]).unwrap().unwrap();
        assert_eq!(info.files, vec!["plans.json".to_string(), "profiles.json".to_string()]);
    }

    #[test]
    fn failed_copy_leaves_no_snapshot_behind() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager(dir.path()).with_retention(1);
        let kept = m.data_root().join("profiles.json");
        write(&kept, "[1]");
        let first = m.backup_if_exists(&kept).unwrap().unwrap();

        let snapshot = m.backups_root().join(m.next_stamp());
        let present = m.data_root().join("plans.json");
        write(&present, "[]");
        let vanished = m.data_root().join("sessions.json");
        let result = m.fill_snapshot(
            &snapshot,
            &[
                (present, PathBuf::from("plans.json")),
                (vanished, PathBuf::from("sessions.json")),
            ],
        );
        assert!(result.is_err());
        assert!(!snapshot.exists());

        // the real snapshot is still the only one, so pruning keeps it
        assert_eq!(m.prune_old_snapshots().unwrap(), 0);
        let names: Vec<String> = m.list_snapshots().unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec![first.file_name().unwrap().to_string_lossy().to_string()]);
    }

    #[test]
    fn quarantine_writes_beside_original() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager(dir.path());
        let file = m.data_root().join("plans.json");
        write(&file, "{broken");
        let q = m.quarantine(&file).unwrap();
        assert_eq!(q.parent(), file.parent());
        assert!(q
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("plans.json.bak-"));
        assert_eq!(fs::read_to_string(q).unwrap(), "{broken");
    }

    #[test]
    fn snapshot_names_cannot_escape() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager(dir.path());
        fs::create_dir_all(m.backups_root()).unwrap();
        assert!(matches!(
            m.snapshot_dir("../"),
            Err(StoreError::SnapshotNotFound(_))
        ));
        assert!(matches!(
            m.snapshot_dir("20260101T000000.000000"),
            Err(StoreError::SnapshotNotFound(_))
        ));
    }

    #[test]
    fn unrelated_directories_are_not_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager(dir.path());
        fs::create_dir_all(m.backups_root().join("manual-copy")).unwrap();
        assert!(m.list_snapshots().unwrap().is_empty());
        assert_eq!(m.prune_old_snapshots().unwrap(), 0);
        assert!(m.backups_root().join("manual-copy").exists());
    }
}
