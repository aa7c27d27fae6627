use std::fs;
use std::io::{self, BufReader};

use camino::{Utf8Path, Utf8PathBuf};
use flate2::bufread::MultiGzDecoder;

use crate::error::DiceError;

pub fn gunzip(gz_path: &Utf8Path, target: &Utf8Path) -> Result<(), DiceError> {
    let file = fs::File::open(gz_path.as_std_path())
        .map_err(|err| DiceError::Filesystem(format!("open gzip {gz_path}: {err}")))?;
    let mut decoder = MultiGzDecoder::new(BufReader::new(file));

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| DiceError::Filesystem(err.to_string()))?;
    }
    let mut outfile = fs::File::create(target.as_std_path())
        .map_err(|err| DiceError::Filesystem(err.to_string()))?;
    io::copy(&mut decoder, &mut outfile)
        .map_err(|err| DiceError::Filesystem(format!("decompress {gz_path}: {err}")))?;
    Ok(())
}

pub fn immediate_subdirs(dir: &Utf8Path) -> Result<Vec<String>, DiceError> {
    if !dir.as_std_path().is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    let entries = dir
        .read_dir_utf8()
        .map_err(|err| DiceError::Filesystem(format!("list {dir}: {err}")))?;
    for entry in entries {
        let entry = entry.map_err(|err| DiceError::Filesystem(err.to_string()))?;
        if entry.path().is_dir() {
            names.push(entry.file_name().to_string());
        }
    }
    names.sort();
    Ok(names)
}

pub fn utf8_path(path: std::path::PathBuf) -> Result<Utf8PathBuf, DiceError> {
    Utf8PathBuf::from_path_buf(path)
        .map_err(|path| DiceError::Filesystem(format!("non-utf8 path: {}", path.display())))
}
