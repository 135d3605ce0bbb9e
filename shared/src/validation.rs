//! Validation utilities for the Kedai inventory back-office

// ============================================================================
// Stock Validations
// ============================================================================

/// Largest quantity or portion count a single entry may carry
pub const MAX_QUANTITY: i64 = 1_000_000_000;

/// Quantities recorded on purchases may be zero but never negative
pub fn validate_purchase_quantity(quantity: i64) -> Result<(), &'static str> {
    if quantity < 0 {
        return Err("Quantity cannot be negative");
    }
    if quantity > MAX_QUANTITY {
        return Err("Quantity must be at most 1000000000");
    }
    Ok(())
}

/// Stock-out quantities must remove at least one unit
pub fn validate_sale_quantity(quantity: i64) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be greater than zero");
    }
    if quantity > MAX_QUANTITY {
        return Err("Quantity must be at most 1000000000");
    }
    Ok(())
}

/// Currency amounts are whole, non-negative Rupiah
pub fn validate_amount(amount: i64) -> Result<(), &'static str> {
    if amount < 0 {
        return Err("Amount cannot be negative");
    }
    Ok(())
}

/// Low stock threshold, when set, must not be negative
pub fn validate_threshold(threshold: Option<i64>) -> Result<(), &'static str> {
    match threshold {
        Some(t) if t < 0 => Err("Low stock threshold cannot be negative"),
        _ => Ok(()),
    }
}

/// Free text labels (names, payment methods) must contain something
pub fn validate_label(value: &str) -> Result<(), &'static str> {
    if value.trim().is_empty() {
        return Err("Value cannot be empty");
    }
    if value.chars().count() > 200 {
        return Err("Value must be at most 200 characters");
    }
    Ok(())
}

/// Menu codes: 1-20 characters, letters, digits, dash or underscore
pub fn validate_menu_code(code: &str) -> Result<(), &'static str> {
    let code = code.trim();
    if code.is_empty() {
        return Err("Menu code cannot be empty");
    }
    if code.len() > 20 {
        return Err("Menu code must be at most 20 characters");
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err("Menu code may only contain letters, digits, '-' and '_'");
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}
