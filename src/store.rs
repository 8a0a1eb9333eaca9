use std::fs::OpenOptions;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::domain::Job;
use crate::error::KiraError;

/// Output file for a job, relative to the store root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistTarget {
    /// `{mode}.{ext}`, appended to by every job of the mode.
    Aggregate(Utf8PathBuf),
    /// `{id}-{mode}.{ext}`, overwritten by each job.
    PerId(Utf8PathBuf),
}

impl PersistTarget {
    pub fn for_job(job: &Job) -> Result<Self, KiraError> {
        let spec = job.spec()?;
        if spec.aggregate {
            return Ok(PersistTarget::Aggregate(Utf8PathBuf::from(format!(
                "{}.{}",
                job.mode, spec.extension
            ))));
        }
        job.id.require_file_safe()?;
        Ok(PersistTarget::PerId(Utf8PathBuf::from(format!(
            "{}-{}.{}",
            job.id, job.mode, spec.extension
        ))))
    }

    pub fn file_name(&self) -> &Utf8Path {
        match self {
            PersistTarget::Aggregate(path) | PersistTarget::PerId(path) => path,
        }
    }
}

/// Writes fetched records under a root directory (the working directory
/// in normal use). The root is never created.
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new() -> Result<Self, KiraError> {
        let cwd = std::env::current_dir().map_err(|err| KiraError::Filesystem(err.to_string()))?;
        let root = Utf8PathBuf::from_path_buf(cwd)
            .map_err(|_| KiraError::Filesystem("non-utf8 working directory".to_string()))?;
        Ok(Self { root })
    }

    pub fn new_with_root(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn path_for(&self, target: &PersistTarget) -> Utf8PathBuf {
        self.root.join(target.file_name())
    }

    pub fn persist(&self, target: &PersistTarget, text: &str) -> Result<Utf8PathBuf, KiraError> {
        let path = self.path_for(target);
        match target {
            PersistTarget::Aggregate(_) => Self::append(&path, text)?,
            PersistTarget::PerId(_) => Self::write_atomic(&path, text)?,
        }
        tracing::info!(path = %path, bytes = text.len(), "record saved");
        Ok(path)
    }

    pub fn append(path: &Utf8Path, text: &str) -> Result<(), KiraError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_std_path())
            .map_err(|err| KiraError::Filesystem(format!("open {path}: {err}")))?;
        file.write_all(text.as_bytes())
            .map_err(|err| KiraError::Filesystem(format!("append {path}: {err}")))
    }

    pub fn write_atomic(path: &Utf8Path, text: &str) -> Result<(), KiraError> {
        let parent = path
            .parent()
            .ok_or_else(|| KiraError::Filesystem("invalid destination path".to_string()))?;
        let mut temp = Builder::new()
            .prefix(".kira-ef")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        temp.write_all(text.as_bytes())
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        Ok(())
    }
}
