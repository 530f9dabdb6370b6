//! Client access-control flags.
//!
//! Client users reach an entity's tax years only through an ACL row naming
//! the flags they hold for that entity. Firm staff are not subject to ACLs.

/// May see the entity's tax years, status and documents.
pub const PERM_VIEW: &str = "view";
/// May upload and remove documents.
pub const PERM_UPLOAD: &str = "upload";
/// May sign the engagement letter and the e-file authorization.
pub const PERM_SIGN: &str = "sign";
/// May read and post in the message thread.
pub const PERM_MESSAGE: &str = "message";
/// May answer the questionnaire.
pub const PERM_QUESTIONNAIRE: &str = "questionnaire";

/// Every flag, in canonical order.
pub const ALL_PERMISSIONS: &[&str] = &[
    PERM_VIEW,
    PERM_UPLOAD,
    PERM_SIGN,
    PERM_MESSAGE,
    PERM_QUESTIONNAIRE,
];

/// Reject unknown or repeated flags.
pub fn validate_permissions(flags: &[String]) -> Result<(), String> {
    for (i, flag) in flags.iter().enumerate() {
        if !ALL_PERMISSIONS.contains(&flag.as_str()) {
            return Err(format!(
                "Invalid permission '{flag}'. Must be one of: {}",
                ALL_PERMISSIONS.join(", ")
            ));
        }
        if flags[..i].contains(flag) {
            return Err(format!("Duplicate permission '{flag}'"));
        }
    }
    Ok(())
}

/// Sort flags canonically, add `view` when any other flag is present and drop
/// duplicates. Input is assumed valid.
pub fn normalize_permissions(flags: &[String]) -> Vec<String> {
    let implies_view = !flags.is_empty();
    ALL_PERMISSIONS
        .iter()
        .filter(|p| flags.iter().any(|f| f == *p) || (**p == PERM_VIEW && implies_view))
        .map(|p| p.to_string())
        .collect()
}

/// Whether `flags` grants `wanted`. Every flag implies `view`.
pub fn has_permission(flags: &[String], wanted: &str) -> bool {
    if wanted == PERM_VIEW {
        return !flags.is_empty();
    }
    flags.iter().any(|f| f == wanted)
}
