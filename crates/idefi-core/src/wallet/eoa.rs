//! Externally-owned account check

use std::sync::Arc;

use super::validate_address_shape;
use crate::error::{Result, ValidationError};
use crate::integrations::CodeLookup;

/// On-chain code of an address with no contract deployed
pub const EMPTY_CODE: &str = "0x";

/// Accepts well-formed addresses with no deployed code
#[derive(Clone)]
pub struct EoaValidator {
    lookup: Arc<dyn CodeLookup>,
}

impl EoaValidator {
    pub fn new(lookup: Arc<dyn CodeLookup>) -> Self {
        Self { lookup }
    }

    /// Validate `address`
    ///
    /// A malformed address is rejected without calling the chain.
    pub async fn validate(&self, address: &str) -> Result<()> {
        validate_address_shape(address)?;
        let code = self.lookup.code_at(address).await?;
        if code != EMPTY_CODE {
            tracing::debug!(%address, "address has deployed code");
            return Err(ValidationError::NotExternallyOwned(address.to_string()).into());
        }
        Ok(())
    }
}
