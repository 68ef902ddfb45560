// src/gate.rs
use ethers::types::Address;
use serde::{Deserialize, Serialize};

use crate::error::AccountError;

/// Identity of whoever invoked an account entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub caller: Address,
}

impl AuthContext {
    pub fn new(caller: Address) -> Self {
        Self { caller }
    }
}

/// The fixed `{trusted dispatcher, owner}` authorization set of one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessGate {
    trusted: Address,
    owner: Address,
}

impl AccessGate {
    pub fn new(trusted: Address, owner: Address) -> Self {
        Self { trusted, owner }
    }

    pub fn require_trusted_only(&self, ctx: AuthContext) -> Result<(), AccountError> {
        if ctx.caller != self.trusted {
            return Err(AccountError::NotAuthorized { caller: ctx.caller });
        }
        Ok(())
    }

    pub fn require_trusted_or_owner(&self, ctx: AuthContext) -> Result<(), AccountError> {
        if ctx.caller != self.trusted && ctx.caller != self.owner {
            return Err(AccountError::NotAuthorized { caller: ctx.caller });
        }
        Ok(())
    }
}
