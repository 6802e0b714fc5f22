//! File helpers shared by the JSON-backed stores

use crate::utils::errors::CliError;
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Owner read/write
pub const PRIVATE_FILE_MODE: u32 = 0o600;

/// Owner read/write/search
pub const PRIVATE_DIR_MODE: u32 = 0o700;

/// Outcome of reading a JSON document that may be missing or damaged
#[derive(Debug)]
pub enum JsonRead<T> {
    Missing,
    Parsed(T),
    Invalid(String),
}

impl<T> JsonRead<T> {
    /// Parsed value, or `T::default()` for missing and invalid documents
    pub fn unwrap_or_default(self) -> T
    where
        T: Default,
    {
        match self {
            JsonRead::Parsed(value) => value,
            _ => T::default(),
        }
    }
}

/// Read and parse a JSON document without ever failing
pub fn read_json<T: DeserializeOwned>(path: &Path) -> JsonRead<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return JsonRead::Missing,
        Err(e) => return JsonRead::Invalid(e.to_string()),
    };

    match serde_json::from_str(&content) {
        Ok(value) => JsonRead::Parsed(value),
        Err(e) => JsonRead::Invalid(e.to_string()),
    }
}

/// Serialize `value` as 2-space pretty JSON and replace `path` atomically
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T, mode: u32) -> Result<()> {
    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');
    write_atomic(path, content.as_bytes(), mode)
}

/// Write to a sibling temp file, set its mode, then rename over `path`
pub fn write_atomic(path: &Path, content: &[u8], mode: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "mycli".to_string());
    let tmp_path = parent.join(format!(".{}.tmp.{}.{}", file_name, std::process::id(), stamp));

    let written = create_restricted(&tmp_path, mode).and_then(|mut file| {
        file.write_all(content)?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(CliError::file_system(&tmp_path, e));
    }
    set_mode(&tmp_path, mode)?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(CliError::file_system(path, e));
    }
    Ok(())
}

/// Append one line to `path`, creating it and its parent directory on demand
///
/// The line is written with a single `write_all` on an `O_APPEND` handle so
/// concurrent writers interleave whole lines.
pub fn append_line(path: &Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let mut buffer = String::with_capacity(line.len() + 1);
    buffer.push_str(line);
    buffer.push('\n');

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut file| file.write_all(buffer.as_bytes()))
        .map_err(|e| CliError::file_system(path, e))
}

/// Create `dir` (and parents) if it does not exist yet
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() || dir.exists() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| CliError::file_system(dir, e))
}

/// Create `dir` if needed and restrict it to its owner, even when it already existed
pub fn ensure_private_dir(dir: &Path) -> Result<()> {
    ensure_dir(dir)?;
    set_mode(dir, PRIVATE_DIR_MODE)
}

/// Open a fresh file that carries `mode` from the moment it exists
#[cfg(unix)]
fn create_restricted(path: &Path, mode: u32) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(mode)
        .open(path)
}

#[cfg(not(unix))]
fn create_restricted(path: &Path, _mode: u32) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| CliError::file_system(path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
