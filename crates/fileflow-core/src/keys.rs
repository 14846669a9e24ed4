//! Path and key helpers shared by the workflow engine and the table backends.
//!
//! Object names are flat; a "folder" is only the prefix before a `/`. Status rows are keyed
//! by a sanitized copy of the full object path, since row keys may not contain `/ \ # ?`
//! or control characters.

use crate::constants::NO_EXTENSION;

/// Folder name as stored in records and audit entries: without trailing slashes.
pub fn normalize_folder(folder: &str) -> &str {
    folder.trim_end_matches('/')
}

/// Join a folder prefix and a file name. An empty (or whitespace) folder yields the bare name.
pub fn combine(folder: &str, file_name: &str) -> String {
    if folder.trim().is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", normalize_folder(folder), file_name)
    }
}

/// Join an optional folder prefix and a blob name.
pub fn resolve(folder: Option<&str>, blob_name: &str) -> String {
    match folder {
        Some(folder) => combine(folder, blob_name),
        None => blob_name.to_string(),
    }
}

/// Folder of a full object name: everything before the first `/`, or empty.
pub fn folder_of(full_name: &str) -> &str {
    match full_name.find('/') {
        Some(idx) if idx > 0 => &full_name[..idx],
        _ => "",
    }
}

/// Last path segment of an object name.
pub fn file_name_of(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Listing prefix for an optional folder: `None` for no folder, otherwise `folder/`.
pub fn list_prefix(folder: Option<&str>) -> Option<String> {
    folder
        .filter(|f| !f.trim().is_empty())
        .map(|f| format!("{}/", normalize_folder(f)))
}

/// Lowercased extension of the object's base name without the dot, or `(none)`.
pub fn extension_bucket(name: &str) -> String {
    let base = file_name_of(name);
    match base.rfind('.') {
        Some(idx) if idx + 1 < base.len() => base[idx + 1..].to_lowercase(),
        _ => NO_EXTENSION.to_string(),
    }
}

/// Extension of the base name including the leading dot, or empty.
pub fn dotted_extension(name: &str) -> &str {
    let base = file_name_of(name);
    match base.rfind('.') {
        Some(idx) if idx + 1 < base.len() => &base[idx..],
        _ => "",
    }
}

/// Sanitize a path into a status-table row key.
///
/// `/`, `\`, `#` and `?` become `:`; control characters (0x00-0x1F, 0x7F) become `_`.
pub fn to_row_key(input: &str) -> String {
    input
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | '#' | '?' => ':',
            '\u{0000}'..='\u{001F}' | '\u{007F}' => '_',
            other => other,
        })
        .collect()
}
