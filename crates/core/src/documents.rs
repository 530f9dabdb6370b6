//! Client document rules: accepted file types, size limits, filename
//! sanitising and checklist satisfaction.

use crate::types::DbId;

/// Default upload size limit (50 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Longest filename kept after sanitising (extension included).
pub const MAX_FILENAME_LENGTH: usize = 200;

/// Accepted extensions and the content type served on download.
const ACCEPTED_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("heic", "image/heic"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("csv", "text/csv"),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("txt", "text/plain"),
];

/// Lowercased extension of `filename`, if it has one.
pub fn extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Content type for an accepted extension.
pub fn content_type_for(ext: &str) -> Option<&'static str> {
    ACCEPTED_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, ct)| *ct)
}

/// Validate an upload and return its lowercased extension.
pub fn validate_upload(filename: &str, size: usize, max_size: usize) -> Result<String, String> {
    if size == 0 {
        return Err("Uploaded file is empty".to_string());
    }
    if size > max_size {
        return Err(format!(
            "Uploaded file is {size} bytes; the limit is {max_size} bytes"
        ));
    }
    let ext = extension(filename)
        .ok_or_else(|| format!("File '{filename}' has no extension"))?;
    if content_type_for(&ext).is_none() {
        let accepted: Vec<&str> = ACCEPTED_TYPES.iter().map(|(e, _)| *e).collect();
        return Err(format!(
            "Unsupported file type '.{ext}'. Accepted: {}",
            accepted.join(", ")
        ));
    }
    Ok(ext)
}

/// Strip any path components and characters outside a conservative set so
/// the client-supplied name is safe to display and to send back in a
/// `Content-Disposition` header.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ' | '(' | ')') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        return "document".to_string();
    }

    if cleaned.chars().count() <= MAX_FILENAME_LENGTH {
        return cleaned.to_string();
    }

    // Keep the extension when truncating.
    match cleaned.rsplit_once('.') {
        Some((stem, ext)) if ext.len() < 16 => {
            let keep = MAX_FILENAME_LENGTH - ext.len() - 1;
            format!("{}.{ext}", stem.chars().take(keep).collect::<String>())
        }
        _ => cleaned.chars().take(MAX_FILENAME_LENGTH).collect(),
    }
}

/// The checklist fields that decide whether documents are complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecklistRequirement {
    pub id: DbId,
    pub is_required: bool,
    pub is_not_applicable: bool,
}

/// Whether every required, applicable checklist item has at least one live
/// document attached. `documented_item_ids` lists the checklist item of each
/// live document (repeats allowed).
pub fn required_items_satisfied(
    items: &[ChecklistRequirement],
    documented_item_ids: &[DbId],
) -> bool {
    items
        .iter()
        .filter(|item| item.is_required && !item.is_not_applicable)
        .all(|item| documented_item_ids.contains(&item.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: usize = 1024 * 1024;

    #[test]
    fn accepted_upload_returns_extension() {
        assert_eq!(validate_upload("W2.PDF", 10, MB).unwrap(), "pdf");
        assert_eq!(validate_upload("scan.heic", 10, MB).unwrap(), "heic");
    }

    #[test]
    fn rejects_empty_oversized_and_unknown() {
        assert!(validate_upload("a.pdf", 0, MB).unwrap_err().contains("empty"));
        assert!(validate_upload("a.pdf", MB + 1, MB).unwrap_err().contains("limit"));
        assert!(validate_upload("a.exe", 10, MB).unwrap_err().contains("Unsupported"));
        assert!(validate_upload("README", 10, MB).unwrap_err().contains("no extension"));
        assert!(validate_upload(".pdf", 10, MB).is_err());
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_for("pdf"), Some("application/pdf"));
        assert_eq!(content_type_for("jpeg"), Some("image/jpeg"));
        assert_eq!(content_type_for("zip"), None);
    }

    #[test]
    fn sanitize_strips_paths_and_odd_characters() {
        assert_eq!(sanitize_filename("C:\\Users\\me\\1099-INT.pdf"), "1099-INT.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("k1\"\r\n.pdf"), "k1___.pdf");
        assert_eq!(sanitize_filename("..."), "document");
    }

    #[test]
    fn sanitize_truncates_but_keeps_extension() {
        let long = format!("{}.pdf", "a".repeat(400));
        let cleaned = sanitize_filename(&long);
        assert_eq!(cleaned.len(), MAX_FILENAME_LENGTH);
        assert!(cleaned.ends_with(".pdf"));
    }

    #[test]
    fn checklist_satisfaction() {
        let items = [
            ChecklistRequirement { id: 1, is_required: true, is_not_applicable: false },
            ChecklistRequirement { id: 2, is_required: true, is_not_applicable: true },
            ChecklistRequirement { id: 3, is_required: false, is_not_applicable: false },
        ];
        assert!(!required_items_satisfied(&items, &[3]));
        assert!(required_items_satisfied(&items, &[1, 1]));
        assert!(required_items_satisfied(&[], &[]));
    }
}
