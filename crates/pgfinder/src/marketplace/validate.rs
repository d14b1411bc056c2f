//! Shape checks for caller-supplied text. Pure functions; the transport
//! layer owns anything fancier (rate limits, captcha, markup stripping).

/// A field-specific input rejection, surfaced verbatim to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Trim and require a non-empty value; used for the listing's mandatory
/// text fields.
pub fn required_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::new(field, format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// Validate a display name: 2..=100 chars, letters, spaces, hyphens, and
/// apostrophes only. Returns the trimmed name.
pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::new("name", "name is required"));
    }
    if name.chars().count() < 2 {
        return Err(ValidationError::new(
            "name",
            "name must be at least 2 characters long",
        ));
    }
    if name.chars().count() > 100 {
        return Err(ValidationError::new(
            "name",
            "name is too long (maximum 100 characters)",
        ));
    }
    let allowed = |c: char| c.is_alphabetic() || c == ' ' || c == '-' || c == '\'';
    if !name.chars().all(allowed) {
        return Err(ValidationError::new(
            "name",
            "name can only contain letters, spaces, hyphens, and apostrophes",
        ));
    }
    Ok(name.to_string())
}

/// Validate and normalize an email address: trimmed, lower-cased, a single
/// `@` separating a non-empty local part from a dotted domain, no
/// whitespace, at most 254 chars.
pub fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ValidationError::new("email", "email is required"));
    }
    if email.len() > 254 {
        return Err(ValidationError::new("email", "email address is too long"));
    }
    if !email_shape_ok(&email) {
        return Err(ValidationError::new("email", "invalid email format"));
    }
    Ok(email)
}

fn email_shape_ok(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    // The domain needs an interior dot: "user@host" and "user@host." are out.
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && tld.chars().count() >= 2,
        None => false,
    }
}

/// Validate password strength: 8..=128 chars with at least one letter and
/// one digit. The caller hashes it; this module never stores anything.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::new("password", "password is required"));
    }
    if password.chars().count() < 8 {
        return Err(ValidationError::new(
            "password",
            "password must be at least 8 characters long",
        ));
    }
    if password.chars().count() > 128 {
        return Err(ValidationError::new(
            "password",
            "password is too long (maximum 128 characters)",
        ));
    }
    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_letter && has_digit) {
        return Err(ValidationError::new(
            "password",
            "password must contain at least one letter and one number",
        ));
    }
    Ok(())
}
