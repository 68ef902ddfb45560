// src/nonce.rs
use std::collections::HashMap;

use ethers::types::{Address, U256};
use tracing::debug;

use crate::error::AccountError;

/// Next expected nonce per account. Values only move forward, one step per
/// accepted compare-and-increment.
#[derive(Debug, Clone, Default)]
pub struct NonceAuthority {
    expected: HashMap<Address, U256>,
}

impl NonceAuthority {
    pub fn get_nonce(&self, account: Address) -> U256 {
        self.expected.get(&account).copied().unwrap_or_default()
    }

    pub fn increment_if_equal(&mut self, account: Address, nonce: U256) -> Result<(), AccountError> {
        let current = self.get_nonce(account);
        if current != nonce {
            return Err(AccountError::InvalidNonce {
                expected: current,
                provided: nonce,
            });
        }
        let next = current.checked_add(U256::one()).ok_or(AccountError::InvalidNonce {
            expected: current,
            provided: nonce,
        })?;
        self.expected.insert(account, next);
        debug!("Nonce for {:?} advanced to {}", account, next);
        Ok(())
    }
}
