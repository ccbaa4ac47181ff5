use crate::merge::Aggregate;
use crate::output::{OutputError, OutputResult};
use crate::request::EntityId;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes finalized aggregates as `{dir}/{entity}.json`
///
/// Documents are written to a temporary file first and renamed into place, so
/// a reader never sees a half-written aggregate.
#[derive(Debug, Clone)]
pub struct AggregateWriter {
    dir: PathBuf,
}

impl AggregateWriter {
    /// Creates the output directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> OutputResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| OutputError::Write {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, entity: &EntityId) -> PathBuf {
        self.dir.join(format!("{}.json", entity))
    }

    /// Serializes `aggregate` and atomically replaces its document
    pub fn write(&self, aggregate: &Aggregate) -> OutputResult<PathBuf> {
        let path = self.path_for(&aggregate.entity_id);
        let tmp = self.dir.join(format!(".{}.json.tmp", aggregate.entity_id));

        let mut json = serde_json::to_string_pretty(aggregate)?;
        json.push('\n');

        fs::write(&tmp, json).map_err(|source| OutputError::Write {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| OutputError::Write {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(entity = %aggregate.entity_id, path = %path.display(), "Wrote aggregate");
        Ok(path)
    }

    /// Reads back a previously written aggregate
    pub fn read(&self, entity: &EntityId) -> OutputResult<Option<Aggregate>> {
        let path = self.path_for(entity);
        match fs::read_to_string(&path) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(OutputError::Io(e)),
        }
    }
}
