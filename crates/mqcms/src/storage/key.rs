//! Object key rules.

use std::path::Path;

use super::{StorageError, StorageResult};

/// Longest key accepted, in bytes.
const MAX_KEY_LEN: usize = 255;

/// File extensions accepted for media uploads (lowercase).
pub const MEDIA_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "mp4", "mov", "avi", "webm",
];

/// Reject keys that could escape the storage root or are not a single name.
pub fn validate_key(key: &str) -> StorageResult<()> {
    let invalid = key.is_empty()
        || key.len() > MAX_KEY_LEN
        || key.starts_with('.')
        || key.contains("..")
        || key.contains(['/', '\\'])
        || key.chars().any(char::is_control);
    if invalid {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Turn a client-supplied file name into something safe to embed in a key.
/// Returns `None` when nothing usable is left.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    // Browsers on Windows may send the full client path.
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect();

    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_');
    if cleaned.is_empty() || cleaned.contains("..") {
        return None;
    }
    Some(cleaned.to_string())
}

/// Build the storage key for an upload: `<unix-millis>-<sanitized name>`.
///
/// The name must carry one of the [`MEDIA_EXTENSIONS`].
pub fn media_key(filename: &str, unix_millis: i64) -> StorageResult<String> {
    let name =
        sanitize_filename(filename).ok_or_else(|| StorageError::InvalidKey(filename.to_string()))?;

    let extension = Path::new(&name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension {
        Some(ext) if MEDIA_EXTENSIONS.contains(&ext.as_str()) => {}
        _ => {
            return Err(StorageError::InvalidKey(format!(
                "{filename}: unsupported media type"
            )));
        }
    }

    let key = format!("{unix_millis}-{name}");
    validate_key(&key)?;
    Ok(key)
}

/// True when `key` names a media object rather than some other document.
pub fn is_media_key(key: &str) -> bool {
    Path::new(key)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MEDIA_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}
