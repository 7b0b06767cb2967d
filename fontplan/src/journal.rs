//! What was built last time, and from what.
//!
//! The journal holds one record per file-producing node: the state of the
//! files it wrote, the value it produced, and the signature of everything it
//! requested while running. A record whose files and dependencies are
//! unchanged lets the node be skipped on the next run.

use std::{
    collections::HashMap,
    fs, io,
    hash::Hash,
    path::{Path, PathBuf},
};

use filetime::FileTime;
use log::{debug, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::Error;

/// The state of a file, compared by modification time and size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileState {
    pub path: PathBuf,
    #[serde(with = "file_time_serde")]
    pub mtime: FileTime,
    pub size: u64,
}

impl FileState {
    pub fn of(path: &Path) -> Result<FileState, io::Error> {
        let metadata = path.metadata()?;
        Ok(FileState {
            path: path.to_path_buf(),
            mtime: FileTime::from_system_time(metadata.modified()?),
            size: metadata.len(),
        })
    }
}

/// A value in memory, compared by hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryState {
    /// blake3, hex encoded
    pub hash: String,
    pub size: u64,
}

impl MemoryState {
    pub fn of(thing: &impl Serialize) -> Result<MemoryState, Error> {
        let bytes = bincode::serialize(thing)?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(&bytes);
        Ok(MemoryState {
            hash: hasher.finalize().to_hex().to_string(),
            size: hasher.count(),
        })
    }
}

/// Identifies one result of a node; if the signature is unchanged so is the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signature {
    Files(Vec<FileState>),
    Memory(MemoryState),
}

impl Signature {
    /// The current state of `paths`, or `None` if any is missing.
    pub fn of_files(paths: &[PathBuf]) -> Option<Signature> {
        paths
            .iter()
            .map(|path| FileState::of(path).ok())
            .collect::<Option<Vec<_>>>()
            .map(Signature::Files)
    }

    /// The state of files a rule just wrote; every one must exist.
    pub fn of_outputs(paths: &[PathBuf]) -> Result<Signature, Error> {
        paths
            .iter()
            .map(|path| FileState::of(path).map_err(Error::io(path)))
            .collect::<Result<Vec<_>, _>>()
            .map(Signature::Files)
    }

    pub fn of_value(value: &impl Serialize) -> Result<Signature, Error> {
        MemoryState::of(value).map(Signature::Memory)
    }
}

/// Something a node requested while it ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency<K> {
    pub key: K,
    /// Ordering-only dependencies must be built first but their changes don't matter
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ordering_only: bool,
    pub signature: Signature,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<K, V> {
    pub key: K,
    pub signature: Signature,
    /// Volatile nodes run every time
    #[serde(default)]
    pub volatile: bool,
    pub value: V,
    /// Dependencies in the groups they were requested in
    pub depends: Vec<Vec<Dependency<K>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Journal<K: Eq + Hash, V> {
    records: HashMap<K, Record<K, V>>,
}

impl<K: Eq + Hash, V> Default for Journal<K, V> {
    fn default() -> Self {
        Journal {
            records: HashMap::new(),
        }
    }
}

impl<K, V> Journal<K, V>
where
    K: Clone + Eq + Hash + ToString + Serialize + DeserializeOwned,
    V: Clone + Serialize + DeserializeOwned,
{
    pub fn new() -> Journal<K, V> {
        Default::default()
    }

    /// Read the journal at `path`.
    ///
    /// A missing or unreadable journal is an empty one; everything gets built.
    pub fn load(path: &Path) -> Journal<K, V> {
        if !path.is_file() {
            debug!("No journal at {path:?}");
            return Journal::new();
        }
        let records: Vec<Record<K, V>> = match fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|yml| serde_yaml::from_str(&yml).map_err(|e| e.to_string()))
        {
            Ok(records) => records,
            Err(e) => {
                warn!("Ignoring unreadable journal {path:?}: {e}");
                return Journal::new();
            }
        };
        Journal {
            records: records
                .into_iter()
                .map(|record| (record.key.clone(), record))
                .collect(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let mut records: Vec<_> = self.records.values().collect();
        records.sort_by_cached_key(|record| record.key.to_string());
        let yml = serde_yaml::to_string(&records)?;
        fs::write(path, yml).map_err(|source| Error::FileIo {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn get(&self, key: &K) -> Option<&Record<K, V>> {
        self.records.get(key)
    }

    pub fn insert(&mut self, record: Record<K, V>) {
        self.records.insert(record.key.clone(), record);
    }

    pub fn remove(&mut self, key: &K) -> Option<Record<K, V>> {
        self.records.remove(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keep only the records whose key satisfies `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.records.retain(|key, _| keep(key));
    }

    /// Records in `newer` replace ours, everything else is kept.
    pub fn merge(&mut self, newer: Journal<K, V>) {
        self.records.extend(newer.records);
    }
}

mod file_time_serde {
    use filetime::FileTime;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize, Serialize)]
    struct Helper(i64, u32);

    pub(super) fn serialize<S>(item: &FileTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Helper(item.unix_seconds(), item.nanoseconds()).serialize(serializer)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<FileTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Helper(seconds, nanos) = Helper::deserialize(deserializer)?;
        Ok(FileTime::from_unix_time(seconds, nanos))
    }
}
