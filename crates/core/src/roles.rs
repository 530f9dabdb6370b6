//! Well-known role name constants.
//!
//! These must match the seed data in `20260301000002_create_users.sql`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_STAFF: &str = "staff";
pub const ROLE_CLIENT: &str = "client";

/// Roles that belong to firm employees rather than clients.
pub const FIRM_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_STAFF];

/// Whether the role name belongs to a firm employee (admin or staff).
pub fn is_firm_role(role: &str) -> bool {
    FIRM_ROLES.contains(&role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_and_staff_are_firm_roles() {
        assert!(is_firm_role(ROLE_ADMIN));
        assert!(is_firm_role(ROLE_STAFF));
    }

    #[test]
    fn client_is_not_a_firm_role() {
        assert!(!is_firm_role(ROLE_CLIENT));
        assert!(!is_firm_role("unknown"));
    }
}
