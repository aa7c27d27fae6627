use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::FileRecord;
use crate::error::DiceError;
use crate::fs_util;

#[derive(Debug, Clone)]
pub struct Store {
    mirror_root: Utf8PathBuf,
    dice_root: Utf8PathBuf,
}

impl Store {
    pub fn new(mirror_root: Utf8PathBuf, dice_root: Utf8PathBuf) -> Self {
        Self {
            mirror_root,
            dice_root,
        }
    }

    pub fn mirror_program_root(&self, program: &str) -> Utf8PathBuf {
        self.mirror_root.join(program)
    }

    pub fn dice_program_root(&self, program: &str) -> Utf8PathBuf {
        self.dice_root.join(program)
    }

    pub fn mirror_project_root(&self, program: &str, project: &str) -> Utf8PathBuf {
        self.mirror_program_root(program).join(project)
    }

    pub fn dice_project_root(&self, program: &str, project: &str) -> Utf8PathBuf {
        self.dice_program_root(program).join(project)
    }

    pub fn snapshot_root(&self, program: &str, project: &str) -> Utf8PathBuf {
        self.mirror_project_root(program, project).join("metadata")
    }

    pub fn latest_snapshot(
        &self,
        program: &str,
        project: &str,
        timestamp: &str,
    ) -> Result<Option<Utf8PathBuf>, DiceError> {
        let root = self.snapshot_root(program, project);
        let latest = fs_util::immediate_subdirs(&root)?
            .into_iter()
            .filter(|name| name.as_str() <= timestamp)
            .max();
        Ok(latest.map(|name| root.join(name)))
    }

    pub fn load_snapshot(snapshot: &Utf8Path) -> Result<Vec<FileRecord>, DiceError> {
        let entries = snapshot
            .read_dir_utf8()
            .map_err(|err| DiceError::Snapshot(format!("{snapshot}: {err}")))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| DiceError::Snapshot(err.to_string()))?;
            let path = entry.path();
            if path.is_file() && path.extension() == Some("json") {
                files.push(path.to_owned());
            }
        }
        files.sort();

        let mut records = Vec::new();
        for path in files {
            let content = fs::read_to_string(path.as_std_path())
                .map_err(|err| DiceError::Snapshot(format!("{path}: {err}")))?;
            let mut batch: Vec<FileRecord> = serde_json::from_str(&content)
                .map_err(|err| DiceError::Snapshot(format!("{path}: {err}")))?;
            records.append(&mut batch);
        }
        Ok(records)
    }

    pub fn copy_file_atomic(source: &Utf8Path, dest: &Utf8Path) -> Result<(), DiceError> {
        let parent = dest
            .parent()
            .ok_or_else(|| DiceError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| DiceError::Filesystem(err.to_string()))?;
        let temp = tempfile::Builder::new()
            .prefix(".gdc-dice-file")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| DiceError::Filesystem(err.to_string()))?;
        fs::copy(source.as_std_path(), temp.path())
            .map_err(|err| DiceError::Filesystem(format!("copy {source}: {err}")))?;
        temp.persist(dest.as_std_path())
            .map_err(|err| DiceError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), DiceError> {
        let parent = path
            .parent()
            .ok_or_else(|| DiceError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| DiceError::Filesystem(err.to_string()))?;
        let tmp_path = path.with_extension("tmp");
        fs::write(tmp_path.as_std_path(), content)
            .map_err(|err| DiceError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| DiceError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

pub fn mirror_file_path(mirror_project_root: &Utf8Path, record: &FileRecord) -> Utf8PathBuf {
    mirror_project_root
        .join(record.data_category.replace(' ', "_"))
        .join(record.data_type.replace(' ', "_"))
        .join(format!("{}.{}", record.file_id, record.file_name))
}

pub fn cohort_metadata_dir(program_root: &Utf8Path, cohort: &str, timestamp: &str) -> Utf8PathBuf {
    program_root.join(cohort).join("metadata").join(timestamp)
}

pub fn ledger_path(program_root: &Utf8Path, cohort: &str, timestamp: &str) -> Utf8PathBuf {
    cohort_metadata_dir(program_root, cohort, timestamp)
        .join(format!("{cohort}.{timestamp}.diced_metadata.tsv"))
}

pub fn counts_path(program_root: &Utf8Path, cohort: &str, timestamp: &str) -> Utf8PathBuf {
    cohort_metadata_dir(program_root, cohort, timestamp)
        .join(format!("{cohort}.{timestamp}.sample_counts.tsv"))
}

pub fn heatmap_path(program_root: &Utf8Path, cohort: &str, timestamp: &str) -> Utf8PathBuf {
    cohort_metadata_dir(program_root, cohort, timestamp)
        .join(format!("{cohort}.{timestamp}.heatmap.tsv"))
}
