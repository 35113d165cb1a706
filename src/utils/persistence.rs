use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};

use crate::errors::TrackerError;

const TMP_SUFFIX: &str = "tmp";

/// Writes `data` to `path` by staging it in a sibling temp file and renaming over the target.
pub fn write_atomic(path: &Path, data: &str) -> Result<(), TrackerError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = tmp_path(path);
    let mut file = File::create(&tmp)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Serializes `value` as pretty JSON and writes it atomically.
pub fn save_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), TrackerError> {
    let json = serde_json::to_string_pretty(value)?;
    write_atomic(path, &json)
}

/// Loads JSON from `path`, returning `None` when the file does not exist.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, TrackerError> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&data)?))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}
