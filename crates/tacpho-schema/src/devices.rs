//! Logical device groups and the host paths that back them.
//!
//! A `DeviceGroupMap` is static configuration: every group the launcher knows
//! about, with all candidate device files. A `ResolvedDeviceMap` is the
//! snapshot of what actually exists on the host, produced by a scan and never
//! reused across runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Group name to candidate device-file paths, ordered by group name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceGroupMap(BTreeMap<String, Vec<PathBuf>>);

impl DeviceGroupMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The groups of a stock Raspberry Pi running the Micro-Manager image.
    pub fn raspberry_pi() -> Self {
        let mut map = Self::new();
        map.insert("gpio", ["/dev/gpiomem"]);
        map.insert("video", ["/dev/video0", "/dev/video1"]);
        map
    }

    pub fn insert<I, P>(&mut self, group: impl Into<String>, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.0
            .insert(group.into(), paths.into_iter().map(Into::into).collect());
    }

    pub fn get(&self, group: &str) -> Option<&[PathBuf]> {
        self.0.get(group).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The subset of a `DeviceGroupMap` present on the host at scan time.
///
/// Every group held here has at least one path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedDeviceMap(BTreeMap<String, Vec<PathBuf>>);

impl ResolvedDeviceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the surviving paths of a group. Empty path lists are dropped.
    pub fn insert(&mut self, group: impl Into<String>, paths: Vec<PathBuf>) {
        if !paths.is_empty() {
            self.0.insert(group.into(), paths);
        }
    }

    pub fn get(&self, group: &str) -> Option<&[PathBuf]> {
        self.0.get(group).map(Vec::as_slice)
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// All device paths, in group order then candidate order.
    pub fn devices(&self) -> impl Iterator<Item = &Path> {
        self.0.values().flatten().map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
