use validator::ValidateEmail;

/// Maximum accepted length for a display name.
pub const MAX_DISPLAY_NAME_LEN: usize = 100;

/// Validates that the input looks like a valid email address
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.validate_email()
}

/// Trims a display name and drops it when empty. Rejects names that are too
/// long or contain control characters.
pub fn normalize_display_name(name: Option<&str>) -> Result<Option<String>, String> {
    let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    if name.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(format!(
            "Display name must be at most {MAX_DISPLAY_NAME_LEN} characters"
        ));
    }

    if name.chars().any(char::is_control) {
        return Err("Display name contains invalid characters".into());
    }

    Ok(Some(name.to_string()))
}
