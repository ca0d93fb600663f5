//! # Infobase records
//!
//! Registrations and cache folders are joined by infobase ID into
//! [`BaseInfo`] records, which the commands filter, sort and print.

use crate::cache::{CacheDir, CacheDirs};
use crate::registry::{Registration, Registrations};

use clap::ValueEnum;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Everything known about one infobase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseInfo {
    id: String,
    name: String,
    common: bool,
    connect: String,
    folder: String,
    roaming_path: Option<PathBuf>,
    roaming_size: u64,
    local_path: Option<PathBuf>,
    local_size: u64,
    size: u64,
}

impl BaseInfo {
    /// Build a record from whatever sources know about `id`.
    pub fn new(
        id: &str,
        registration: Option<&Registration>,
        roaming: Option<&CacheDir>,
        local: Option<&CacheDir>,
    ) -> Self {
        let mut info = BaseInfo {
            id: id.to_string(),
            ..Default::default()
        };
        if let Some(reg) = registration {
            info.name = reg.name.clone();
            info.common = reg.common;
            info.connect = reg.connect.clone();
            info.folder = reg.folder.clone();
        }
        if let Some(dir) = roaming {
            info.roaming_path = Some(dir.path.clone());
            info.roaming_size = dir.size;
        }
        if let Some(dir) = local {
            info.local_path = Some(dir.path.clone());
            info.local_size = dir.size;
        }
        info.size = info.roaming_size + info.local_size;
        info
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn common(&self) -> bool {
        self.common
    }

    pub fn connect(&self) -> &str {
        &self.connect
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub fn roaming_path(&self) -> Option<&Path> {
        self.roaming_path.as_deref()
    }

    pub fn roaming_size(&self) -> u64 {
        self.roaming_size
    }

    pub fn local_path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }

    pub fn local_size(&self) -> u64 {
        self.local_size
    }

    /// Combined size of both caches.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Registered in one of the launcher lists.
    pub fn is_registered(&self) -> bool {
        !self.name.is_empty()
    }

    /// Has at least one cache folder on disk.
    pub fn has_cache(&self) -> bool {
        self.roaming_path.is_some() || self.local_path.is_some()
    }

    /// Order two records by a single field.
    pub fn cmp_by(&self, other: &Self, field: Field) -> Ordering {
        match field {
            Field::Id => self.id.cmp(&other.id),
            Field::Name => self.name.cmp(&other.name),
            Field::Connect => self.connect.cmp(&other.connect),
            Field::Folder => self.folder.cmp(&other.folder),
            Field::Common => self.common.cmp(&other.common),
            Field::RoamingPath => self.roaming_path.cmp(&other.roaming_path),
            Field::RoamingSize => self.roaming_size.cmp(&other.roaming_size),
            Field::LocalPath => self.local_path.cmp(&other.local_path),
            Field::LocalSize => self.local_size.cmp(&other.local_size),
            Field::Size => self.size.cmp(&other.size),
        }
    }
}

/// Columns a record can be printed or sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum Field {
    Id,
    Name,
    Connect,
    Folder,
    Common,
    RoamingPath,
    RoamingSize,
    LocalPath,
    LocalSize,
    Size,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::Id,
        Field::Name,
        Field::Connect,
        Field::Folder,
        Field::Common,
        Field::RoamingPath,
        Field::RoamingSize,
        Field::LocalPath,
        Field::LocalSize,
        Field::Size,
    ];

    /// Column title used in the header row.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Name => "name",
            Field::Connect => "connect",
            Field::Folder => "folder",
            Field::Common => "common",
            Field::RoamingPath => "roaming_path",
            Field::RoamingSize => "roaming_size",
            Field::LocalPath => "local_path",
            Field::LocalSize => "local_size",
            Field::Size => "size",
        }
    }
}

/// Join registrations and both cache scans into one record per ID, ordered by ID.
pub fn merge(registrations: &Registrations, roaming: &CacheDirs, local: &CacheDirs) -> Vec<BaseInfo> {
    let ids: BTreeSet<&String> = registrations
        .keys()
        .chain(roaming.keys())
        .chain(local.keys())
        .collect();

    ids.into_iter()
        .map(|id| BaseInfo::new(id, registrations.get(id), roaming.get(id), local.get(id)))
        .collect()
}

/// Stable sort by several fields, most significant first.
pub fn sort_by_fields(bases: &mut [BaseInfo], fields: &[Field]) {
    bases.sort_by(|a, b| {
        fields
            .iter()
            .map(|&field| a.cmp_by(b, field))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}
