//! Client entity kinds and identifying-field validation.

use chrono::Datelike;

pub const ENTITY_INDIVIDUAL: &str = "individual";
pub const ENTITY_HOUSEHOLD: &str = "household";
pub const ENTITY_SOLE_PROPRIETORSHIP: &str = "sole_proprietorship";
pub const ENTITY_PARTNERSHIP: &str = "partnership";
pub const ENTITY_LLC: &str = "llc";
pub const ENTITY_S_CORP: &str = "s_corp";
pub const ENTITY_C_CORP: &str = "c_corp";
pub const ENTITY_TRUST: &str = "trust";
pub const ENTITY_ESTATE: &str = "estate";
pub const ENTITY_NONPROFIT: &str = "nonprofit";

/// All valid entity type strings.
pub const VALID_ENTITY_TYPES: &[&str] = &[
    ENTITY_INDIVIDUAL,
    ENTITY_HOUSEHOLD,
    ENTITY_SOLE_PROPRIETORSHIP,
    ENTITY_PARTNERSHIP,
    ENTITY_LLC,
    ENTITY_S_CORP,
    ENTITY_C_CORP,
    ENTITY_TRUST,
    ENTITY_ESTATE,
    ENTITY_NONPROFIT,
];

/// Earliest tax year the firm tracks.
pub const MIN_TAX_YEAR: i32 = 2000;

pub fn validate_entity_type(entity_type: &str) -> Result<(), String> {
    if VALID_ENTITY_TYPES.contains(&entity_type) {
        Ok(())
    } else {
        Err(format!(
            "Invalid entity type '{entity_type}'. Must be one of: {}",
            VALID_ENTITY_TYPES.join(", ")
        ))
    }
}

/// Only the last four digits of an SSN/EIN are ever stored.
pub fn validate_tax_id_last4(value: &str) -> Result<(), String> {
    if value.len() == 4 && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err("tax_id_last4 must be exactly four digits".to_string())
    }
}

/// Tax years run from [`MIN_TAX_YEAR`] through next calendar year.
pub fn validate_tax_year(tax_year: i32) -> Result<(), String> {
    let max = chrono::Utc::now().year() + 1;
    if (MIN_TAX_YEAR..=max).contains(&tax_year) {
        Ok(())
    } else {
        Err(format!(
            "Tax year {tax_year} is out of range ({MIN_TAX_YEAR}-{max})"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_entity_types() {
        for t in VALID_ENTITY_TYPES {
            assert!(validate_entity_type(t).is_ok());
        }
        assert!(validate_entity_type("corporation").is_err());
    }

    #[test]
    fn tax_id_last4() {
        assert!(validate_tax_id_last4("0123").is_ok());
        assert!(validate_tax_id_last4("123").is_err());
        assert!(validate_tax_id_last4("12a4").is_err());
        assert!(validate_tax_id_last4("12345").is_err());
    }

    #[test]
    fn tax_year_range() {
        assert!(validate_tax_year(2024).is_ok());
        assert!(validate_tax_year(1999).is_err());
        let next = chrono::Utc::now().year() + 1;
        assert!(validate_tax_year(next).is_ok());
        assert!(validate_tax_year(next + 1).is_err());
    }
}
