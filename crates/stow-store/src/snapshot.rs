//! Snapshot records and snapshot selection.
//!
//! A [`Snapshot`] names one point-in-time backup and carries the ID of its
//! root tree. [`select_snapshots`] resolves user-supplied IDs, ID prefixes,
//! and host/tag/path filters into concrete snapshots.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stow_types::{BlobHandle, ObjectId, SnapshotId};
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Keyword selecting the newest snapshot that matches the filters.
pub const LATEST: &str = "latest";

/// Errors from snapshot selection.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SnapshotError {
    /// No snapshot matches the given ID, prefix, or `latest`.
    #[error("no matching snapshot for {0:?}")]
    NotFound(String),

    /// An ID prefix matches more than one snapshot.
    #[error("prefix {prefix:?} is ambiguous: matches {count} snapshots")]
    Ambiguous { prefix: String, count: usize },
}

/// A point-in-time backup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: DateTime<Utc>,
    pub hostname: String,
    pub paths: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Root directory of the backup.
    pub tree: ObjectId,
}

impl Snapshot {
    pub fn new(tree: ObjectId, hostname: impl Into<String>, paths: Vec<String>) -> Self {
        Self {
            time: Utc::now(),
            hostname: hostname.into(),
            paths,
            tags: Vec::new(),
            tree,
        }
    }

    /// Builder-style helper to attach tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Builder-style helper to set the snapshot time.
    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }

    /// Handle of the root tree blob.
    pub fn root_handle(&self) -> BlobHandle {
        BlobHandle::tree(self.tree)
    }

    /// Serialized record, as persisted.
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub fn decode(data: &[u8]) -> StoreResult<Self> {
        serde_json::from_slice(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Content address of the serialized record.
    pub fn id(&self) -> StoreResult<SnapshotId> {
        Ok(SnapshotId::from_bytes(&self.encode()?))
    }

    pub fn has_tags(&self, tags: &[String]) -> bool {
        tags.iter().all(|t| self.tags.contains(t))
    }

    pub fn has_paths(&self, paths: &[String]) -> bool {
        paths.iter().all(|p| self.paths.contains(p))
    }
}

/// Criteria for [`select_snapshots`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SnapshotFilter {
    /// Full IDs, unique ID prefixes, or [`LATEST`].
    pub ids: Vec<String>,
    /// Accept snapshots taken on any of these hosts.
    pub hosts: Vec<String>,
    /// Tag groups. Each entry is a comma-separated list that must all be
    /// present; a snapshot matches if any group matches.
    pub tags: Vec<String>,
    /// Every listed path must be part of the snapshot.
    pub paths: Vec<String>,
}

impl SnapshotFilter {
    /// Filter that selects the given IDs and nothing else.
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Whether `snapshot` passes the host, tag, and path filters.
    pub fn matches(&self, snapshot: &Snapshot) -> bool {
        if !self.hosts.is_empty() && !self.hosts.contains(&snapshot.hostname) {
            return false;
        }
        if !self.tags.is_empty() {
            let any_group = self.tags.iter().any(|group| {
                let group: Vec<String> = group
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect();
                snapshot.has_tags(&group)
            });
            if !any_group {
                return false;
            }
        }
        snapshot.has_paths(&self.paths)
    }
}

/// Resolve `filter` against the known snapshots.
///
/// Explicit IDs are matched by full hex or unique prefix and bypass the
/// host/tag/path filters; `latest` picks the newest snapshot that passes
/// them. Without IDs every snapshot passing the filters is returned. The
/// result is sorted by time and free of duplicates.
pub fn select_snapshots(
    all: &[(SnapshotId, Snapshot)],
    filter: &SnapshotFilter,
) -> Result<Vec<(SnapshotId, Snapshot)>, SnapshotError> {
    let mut picked: BTreeSet<usize> = BTreeSet::new();

    if filter.ids.is_empty() {
        picked.extend(
            all.iter()
                .enumerate()
                .filter(|(_, (_, sn))| filter.matches(sn))
                .map(|(i, _)| i),
        );
    }

    for wanted in &filter.ids {
        if wanted == LATEST {
            let latest = all
                .iter()
                .enumerate()
                .filter(|(_, (_, sn))| filter.matches(sn))
                .max_by(|(_, (ia, a)), (_, (ib, b))| a.time.cmp(&b.time).then(ia.cmp(ib)))
                .map(|(i, _)| i)
                .ok_or_else(|| SnapshotError::NotFound(LATEST.into()))?;
            picked.insert(latest);
            continue;
        }

        let matches: Vec<usize> = all
            .iter()
            .enumerate()
            .filter(|(_, (id, _))| id.has_hex_prefix(wanted))
            .map(|(i, _)| i)
            .collect();
        match matches.as_slice() {
            [] => return Err(SnapshotError::NotFound(wanted.clone())),
            [single] => {
                picked.insert(*single);
            }
            many => {
                return Err(SnapshotError::Ambiguous {
                    prefix: wanted.clone(),
                    count: many.len(),
                })
            }
        }
    }

    let mut selected: Vec<(SnapshotId, Snapshot)> =
        picked.into_iter().map(|i| all[i].clone()).collect();
    selected.sort_by(|(ia, a), (ib, b)| a.time.cmp(&b.time).then(ia.cmp(ib)));
    selected.dedup_by(|a, b| a.0 == b.0);

    debug!(
        known = all.len(),
        selected = selected.len(),
        "resolved snapshot selection"
    );
    Ok(selected)
}
