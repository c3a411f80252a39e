//! Shared object key generation and validation.

use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

const MAX_FILE_NAME_LEN: usize = 200;

/// Reject keys that could escape a prefix or that object stores treat ambiguously.
pub fn validate_object_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.contains("..") || key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    if key.split('/').any(str::is_empty) {
        return Err(StorageError::InvalidKey(
            "Storage key contains an empty path segment".to_string(),
        ));
    }
    Ok(())
}

/// Keep the final path component and replace anything outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .trim();

    let mut sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    while sanitized.contains("..") {
        sanitized = sanitized.replace("..", ".");
    }
    let sanitized = sanitized.trim_matches('.').to_string();

    if sanitized.is_empty() {
        return "file".to_string();
    }
    if sanitized.len() > MAX_FILE_NAME_LEN {
        // Keep the tail so the extension survives.
        return sanitized[sanitized.len() - MAX_FILE_NAME_LEN..].to_string();
    }
    sanitized
}

/// Normalize a folder prefix: trailing slashes are dropped, everything else must already be a
/// valid key.
pub fn normalize_folder(folder: &str) -> StorageResult<String> {
    let folder = folder.trim().trim_end_matches('/');
    validate_object_key(folder)?;
    Ok(folder.to_string())
}

/// `{folder}/{uuid}-{sanitized file name}`
pub fn generate_object_key(folder: &str, file_name: &str) -> StorageResult<String> {
    let folder = normalize_folder(folder)?;
    let key = format!(
        "{}/{}-{}",
        folder,
        Uuid::new_v4(),
        sanitize_file_name(file_name)
    );
    validate_object_key(&key)?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_has_folder_uuid_and_name() {
        let key = generate_object_key("uploads", "Quarterly Report.pdf").unwrap();
        let (folder, rest) = key.split_once('/').unwrap();
        assert_eq!(folder, "uploads");
        let (uuid, name) = rest.split_at(36);
        assert!(Uuid::parse_str(uuid).is_ok());
        assert_eq!(name, "-Quarterly_Report.pdf");
    }

    #[test]
    fn keys_are_unique_per_call() {
        let a = generate_object_key("uploads", "a.txt").unwrap();
        let b = generate_object_key("uploads", "a.txt").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn nested_folders_are_allowed() {
        let key = generate_object_key("team/reports/", "x.csv").unwrap();
        assert!(key.starts_with("team/reports/"));
    }

    #[test]
    fn traversal_and_absolute_folders_are_rejected() {
        assert!(generate_object_key("../etc", "passwd").is_err());
        assert!(generate_object_key("/root", "a").is_err());
        assert!(generate_object_key("a//b", "a").is_err());
        assert!(generate_object_key("", "a").is_err());
    }

    #[test]
    fn file_names_lose_path_components() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\cv.docx"), "cv.docx");
        assert_eq!(sanitize_file_name("..."), "file");
        assert_eq!(sanitize_file_name("résumé.pdf"), "r_sum_.pdf");
    }

    #[test]
    fn long_names_keep_their_extension() {
        let long = format!("{}.tar.gz", "a".repeat(400));
        let sanitized = sanitize_file_name(&long);
        assert_eq!(sanitized.len(), 200);
        assert!(sanitized.ends_with(".tar.gz"));
    }
}
