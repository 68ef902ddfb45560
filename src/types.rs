// src/types.rs
use ethers::abi::AbiDecode;
use ethers::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};

use crate::abi::ExecuteCall;
use crate::error::AccountError;
use crate::packing::unpack;

/// Generic model: signature recovered to the owner.
pub const SIG_VALIDATION_SUCCESS: u64 = 0;
/// Generic model: signature valid but not the owner's.
pub const SIG_VALIDATION_FAILED: u64 = 1;

/// Native model: `IAccount.validateTransaction` selector, returned on acceptance.
pub const ACCOUNT_VALIDATION_SUCCESS_MAGIC: [u8; 4] = [0x20, 0x2b, 0xcc, 0xe7];
pub const ACCOUNT_VALIDATION_REJECTED: [u8; 4] = [0; 4];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub sender: Address,
    pub nonce: U256,
    pub init_code: Bytes,
    pub call_data: Bytes,
    /// `verificationGasLimit` (high 128 bits) | `callGasLimit` (low 128 bits)
    pub account_gas_limits: U256,
    pub pre_verification_gas: U256,
    /// `maxPriorityFeePerGas` (high 128 bits) | `maxFeePerGas` (low 128 bits)
    pub gas_fees: U256,
    pub paymaster_and_data: Bytes,
    pub signature: Bytes,
}

impl Operation {
    pub fn verification_gas_limit(&self) -> Result<u128, AccountError> {
        Ok(unpack(self.account_gas_limits)?.0)
    }

    pub fn call_gas_limit(&self) -> Result<u128, AccountError> {
        Ok(unpack(self.account_gas_limits)?.1)
    }

    pub fn max_priority_fee_per_gas(&self) -> Result<u128, AccountError> {
        Ok(unpack(self.gas_fees)?.0)
    }

    pub fn max_fee_per_gas(&self) -> Result<u128, AccountError> {
        Ok(unpack(self.gas_fees)?.1)
    }

    /// Decodes `call_data` as `execute(address,uint256,bytes)`.
    /// Empty call data means there is nothing to execute.
    pub fn decode_call(&self) -> Result<Option<ExecuteCall>, AccountError> {
        if self.call_data.is_empty() {
            return Ok(None);
        }
        ExecuteCall::decode(&self.call_data)
            .map(Some)
            .map_err(|e| AccountError::MalformedOperationEncoding(format!("callData: {e}")))
    }

    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }
}

/// Outcome of checking a signature against the owner. Each account model maps
/// this to its own coded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureStatus {
    Accepted,
    Rejected,
}

/// Outcome of an operation that validated and executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpReceipt {
    pub op_hash: H256,
    pub sender: Address,
    pub nonce: U256,
    pub actual_gas_cost: U256,
    pub return_data: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::MintCall;
    use crate::builder::encode_execute;
    use crate::packing::pack;
    use ethers::abi::AbiEncode;

    #[test]
    fn gas_accessors_read_packed_halves() {
        let op = Operation {
            account_gas_limits: pack(500_000, 120_000),
            gas_fees: pack(2, 30),
            ..Default::default()
        };

        assert_eq!(op.verification_gas_limit().unwrap(), 500_000);
        assert_eq!(op.call_gas_limit().unwrap(), 120_000);
        assert_eq!(op.max_priority_fee_per_gas().unwrap(), 2);
        assert_eq!(op.max_fee_per_gas().unwrap(), 30);
    }

    #[test]
    fn decode_call_handles_empty_and_garbage() {
        let mut op = Operation::default();
        assert_eq!(op.decode_call().unwrap(), None);

        op.call_data = Bytes::from(vec![0xde, 0xad, 0xbe, 0xef, 0x01]);
        assert!(matches!(
            op.decode_call(),
            Err(AccountError::MalformedOperationEncoding(_))
        ));
    }

    #[test]
    fn decode_call_reads_execute_arguments() {
        let token = Address::from_low_u64_be(0x70);
        let mint = MintCall {
            to: Address::from_low_u64_be(0xa1),
            amount: U256::exp10(18),
        }
        .encode();
        let op = Operation {
            call_data: encode_execute(token, U256::from(7), Bytes::from(mint.clone())),
            ..Default::default()
        };

        let call = op.decode_call().unwrap().unwrap();
        assert_eq!(call.dest, token);
        assert_eq!(call.value, U256::from(7));
        assert_eq!(call.function_data.to_vec(), mint);
    }

    #[test]
    fn operation_serializes_camel_case() {
        let json = serde_json::to_value(Operation::default()).unwrap();
        assert!(json.get("accountGasLimits").is_some());
        assert!(json.get("paymasterAndData").is_some());
        assert!(json.get("preVerificationGas").is_some());
    }
}
