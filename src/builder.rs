// src/builder.rs
use ethers::abi::AbiEncode;
use ethers::signers::LocalWallet;
use ethers::types::{Address, Bytes, U256};
use tracing::debug;

use crate::abi::ExecuteCall;
use crate::error::AccountError;
use crate::model::AccountModel;
use crate::packing::pack;
use crate::types::Operation;

pub const DEFAULT_GAS_LIMIT: u128 = 16_777_216;
pub const DEFAULT_FEE_PER_GAS: u128 = 256;

/// `execute(target, value, payload)` call data for the account.
pub fn encode_execute(target: Address, value: U256, payload: Bytes) -> Bytes {
    Bytes::from(
        ExecuteCall {
            dest: target,
            value,
            function_data: payload,
        }
        .encode(),
    )
}

pub fn generate_unsigned(call_data: Bytes, sender: Address, nonce: U256) -> Operation {
    Operation {
        sender,
        nonce,
        init_code: Bytes::new(),
        call_data,
        account_gas_limits: pack(DEFAULT_GAS_LIMIT, DEFAULT_GAS_LIMIT),
        pre_verification_gas: U256::from(DEFAULT_GAS_LIMIT),
        gas_fees: pack(DEFAULT_FEE_PER_GAS, DEFAULT_FEE_PER_GAS),
        paymaster_and_data: Bytes::new(),
        signature: Bytes::new(),
    }
}

/// Hashes `op` the way `model` expects, signs the digest and attaches the
/// 65-byte signature.
pub fn sign<M: AccountModel>(
    mut op: Operation,
    wallet: &LocalWallet,
    model: &M,
) -> Result<Operation, AccountError> {
    let op_hash = model.operation_hash(&op);
    let digest = model.signing_digest(op_hash);
    let signature = wallet
        .sign_hash(digest)
        .map_err(|e| AccountError::SigningFailed(e.to_string()))?;
    debug!("Signed {} operation {:?}", M::NAME, op_hash);
    op.signature = Bytes::from(signature.to_vec());
    Ok(op)
}
