use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;

use crate::error::GnssError;

/// Anchored regex for a filename glob where `*` matches any run of
/// characters and `?` exactly one.
pub fn glob_regex(pattern: &str) -> Result<Regex, GnssError> {
    let escaped = regex::escape(pattern)
        .replace(r"\*", ".*")
        .replace(r"\?", ".");
    Regex::new(&format!("^{escaped}$")).map_err(|err| GnssError::InvalidPattern(err.to_string()))
}

/// Regular files directly inside `dir` whose names match `pattern`, sorted
/// by name so probing is deterministic.
pub fn matching_files(dir: &Utf8Path, pattern: &str) -> Result<Vec<Utf8PathBuf>, GnssError> {
    let matcher = glob_regex(pattern)?;
    let entries = match fs::read_dir(dir.as_std_path()) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(GnssError::Filesystem(format!("read {dir}: {err}"))),
    };
    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| GnssError::Filesystem(err.to_string()))?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let is_file = entry.file_type().map(|kind| kind.is_file()).unwrap_or(false);
        if is_file && matcher.is_match(&name) {
            found.push(dir.join(name));
        }
    }
    found.sort();
    Ok(found)
}

pub fn remove_if_exists(path: &Utf8Path) -> Result<bool, GnssError> {
    match fs::remove_file(path.as_std_path()) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(GnssError::Filesystem(format!("remove {path}: {err}"))),
    }
}

pub fn is_non_empty_file(path: &Utf8Path) -> bool {
    fs::metadata(path.as_std_path())
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}

pub fn file_name(path: &Utf8Path) -> Result<&str, GnssError> {
    path.file_name()
        .ok_or_else(|| GnssError::Filesystem(format!("path has no file name: {path}")))
}
