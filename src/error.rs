// src/error.rs
use ethers::types::{Address, U256};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("Caller {caller:?} is not authorized")]
    NotAuthorized { caller: Address },

    #[error("Invalid nonce: expected {expected}, got {provided}")]
    InvalidNonce { expected: U256, provided: U256 },

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: U256, available: U256 },

    #[error("Fee payment failed: {0}")]
    PaymentFailed(String),

    #[error("Signature does not belong to the account owner")]
    InvalidSignature,

    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Malformed operation encoding: {0}")]
    MalformedOperationEncoding(String),

    #[error("Operation sender {sender:?} does not match account {account:?}")]
    SenderMismatch { sender: Address, account: Address },

    #[error("Account is bound to dispatcher {bound:?}, not {dispatcher:?}")]
    DispatcherMismatch { bound: Address, dispatcher: Address },

    #[error("No account registered at {0:?}")]
    UnknownAccount(Address),

    #[error("FailedOp({index}, {reason})")]
    FailedOp { index: usize, reason: String },

    #[error("Signing failed: {0}")]
    SigningFailed(String),
}

/// A reverted call inside the execution environment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct Revert(pub String);

impl Revert {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}
