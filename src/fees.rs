// src/fees.rs
use ethers::types::U256;

use crate::error::AccountError;
use crate::types::Operation;

// verificationGasLimit + callGasLimit + preVerificationGas
pub fn gas_limit(op: &Operation) -> Result<U256, AccountError> {
    U256::from(op.verification_gas_limit()?)
        .checked_add(U256::from(op.call_gas_limit()?))
        .and_then(|sum| sum.checked_add(op.pre_verification_gas))
        .ok_or_else(|| AccountError::MalformedOperationEncoding("Gas limit overflow".to_string()))
}

/// Maximum fee the operation can cost: gas limit at `maxFeePerGas`.
pub fn required_prefund(op: &Operation) -> Result<U256, AccountError> {
    gas_limit(op)?
        .checked_mul(U256::from(op.max_fee_per_gas()?))
        .ok_or_else(|| {
            AccountError::MalformedOperationEncoding("Max cost calculation overflow".to_string())
        })
}

/// Balance the account must hold to cover the fee and the value it forwards.
pub fn total_required_balance(op: &Operation) -> Result<U256, AccountError> {
    let value = op.decode_call()?.map(|call| call.value).unwrap_or_default();
    required_prefund(op)?
        .checked_add(value)
        .ok_or_else(|| AccountError::MalformedOperationEncoding("Required balance overflow".to_string()))
}
