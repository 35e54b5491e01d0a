use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;

use crate::error::ExtractError;
use crate::model::Record;

/// Loads a book's records. A missing file is an error; malformed JSON is
/// logged and treated as an empty set.
pub fn load_records(path: &Path) -> Result<Vec<Record>, ExtractError> {
    if !path.exists() {
        return Err(ExtractError::NotFound(path.to_path_buf()));
    }
    let raw = fs::read_to_string(path).map_err(|e| ExtractError::io(path, e))?;
    match serde_json::from_str::<Vec<Record>>(&raw) {
        Ok(records) => Ok(records),
        Err(e) => {
            warn!("Unreadable records in {:?}, treating as empty: {}", path, e);
            Ok(Vec::new())
        }
    }
}

/// True when `path` parses as a record array (not a chapter book or other
/// JSON that happens to share the directory).
pub fn holds_records(path: &Path) -> bool {
    fs::read_to_string(path)
        .ok()
        .is_some_and(|raw| serde_json::from_str::<Vec<Record>>(&raw).is_ok())
}

pub fn save_records(path: &Path, records: &[Record]) -> Result<(), ExtractError> {
    write_pretty(path, records, b"    ")
}

pub fn save_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), ExtractError> {
    write_pretty(path, value, b"  ")
}

/// Copies `path` to `path.bak` and returns the backup path.
pub fn backup(path: &Path) -> Result<PathBuf, ExtractError> {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    let bak = PathBuf::from(name);
    fs::copy(path, &bak).map_err(|e| ExtractError::io(&bak, e))?;
    Ok(bak)
}

fn write_pretty<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    indent: &[u8],
) -> Result<(), ExtractError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| ExtractError::io(dir, e))?;
    }
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .map_err(|source| ExtractError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    let mut file = fs::File::create(path).map_err(|e| ExtractError::io(path, e))?;
    file.write_all(&buf).map_err(|e| ExtractError::io(path, e))?;
    Ok(())
}
