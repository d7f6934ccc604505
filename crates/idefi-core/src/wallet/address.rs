//! Ethereum address shape

use crate::error::ValidationError;

/// `0x` followed by 40 hex digits
pub const ADDRESS_LEN: usize = 42;

/// Check that `address` looks like an Ethereum address
pub fn validate_address_shape(address: &str) -> Result<(), ValidationError> {
    let valid = address.len() == ADDRESS_LEN
        && address.starts_with("0x")
        && address[2..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidAddress(address.to_string()))
    }
}
