// src/model.rs
use std::fmt::Debug;
use std::sync::Arc;

use ethers::types::{Address, Bytes, H256, U256};
use tracing::debug;

use crate::error::AccountError;
use crate::executor::{CallExecutor, PlainCall, SystemCall};
use crate::fees::total_required_balance;
use crate::hasher::{signed_message_digest, user_operation_hash, Eip712TransactionEncoder, TransactionEncoder};
use crate::system::{BOOTLOADER_FORMAL_ADDRESS, CONTRACT_DEPLOYER};
use crate::types::{
    Operation, SignatureStatus, ACCOUNT_VALIDATION_REJECTED, ACCOUNT_VALIDATION_SUCCESS_MAGIC,
    SIG_VALIDATION_FAILED, SIG_VALIDATION_SUCCESS,
};
use crate::world::{CallFrame, World};

/// The parts of the account lifecycle that differ between execution
/// environments. Everything else lives in [`crate::account::MinimalAccount`].
pub trait AccountModel: Clone + Debug + Send + Sync + 'static {
    /// Value handed back to the dispatcher from validation.
    type Code: Copy + Debug + PartialEq + Eq + Send + Sync;

    const NAME: &'static str;

    /// Whether a consumed nonce survives an abort later in the same operation.
    const RETAINS_NONCE_ON_ABORT: bool;

    /// The only identity allowed to drive validation.
    fn dispatcher(&self) -> Address;

    fn operation_hash(&self, op: &Operation) -> H256;

    /// Digest the owner signs for a given operation hash.
    fn signing_digest(&self, op_hash: H256) -> H256;

    /// Fee handling performed during validation.
    fn settle_prefund(
        &self,
        world: &mut World,
        account: Address,
        op: &Operation,
        missing_account_funds: U256,
    ) -> Result<(), AccountError>;

    fn executor_for(&self, target: Address) -> &'static dyn CallExecutor;

    fn status_code(&self, status: SignatureStatus) -> Self::Code;
}

/// ERC-4337 style: an EntryPoint dispatcher on a given chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericModel {
    pub entry_point: Address,
    pub chain_id: u64,
}

impl GenericModel {
    pub fn new(entry_point: Address, chain_id: u64) -> Self {
        Self {
            entry_point,
            chain_id,
        }
    }
}

impl AccountModel for GenericModel {
    type Code = U256;

    const NAME: &'static str = "generic";
    const RETAINS_NONCE_ON_ABORT: bool = false;

    fn dispatcher(&self) -> Address {
        self.entry_point
    }

    fn operation_hash(&self, op: &Operation) -> H256 {
        user_operation_hash(op, self.entry_point, self.chain_id)
    }

    fn signing_digest(&self, op_hash: H256) -> H256 {
        signed_message_digest(op_hash)
    }

    fn settle_prefund(
        &self,
        world: &mut World,
        account: Address,
        _op: &Operation,
        missing_account_funds: U256,
    ) -> Result<(), AccountError> {
        if missing_account_funds.is_zero() {
            return Ok(());
        }
        debug!("Paying {} prefund to {:?}", missing_account_funds, self.entry_point);
        world
            .call(CallFrame::plain(
                account,
                self.entry_point,
                missing_account_funds,
                Bytes::new(),
            ))
            .map(|_| ())
            .map_err(|revert| AccountError::PaymentFailed(revert.0))
    }

    fn executor_for(&self, _target: Address) -> &'static dyn CallExecutor {
        &PlainCall
    }

    fn status_code(&self, status: SignatureStatus) -> U256 {
        match status {
            SignatureStatus::Accepted => U256::from(SIG_VALIDATION_SUCCESS),
            SignatureStatus::Rejected => U256::from(SIG_VALIDATION_FAILED),
        }
    }
}

/// Bootloader style: the environment validates, charges and executes the
/// account directly.
#[derive(Debug, Clone)]
pub struct NativeModel {
    pub bootloader: Address,
    encoder: Arc<dyn TransactionEncoder>,
}

impl NativeModel {
    pub fn new(chain_id: u64) -> Self {
        Self::with_encoder(Arc::new(Eip712TransactionEncoder::new(chain_id)))
    }

    pub fn with_encoder(encoder: Arc<dyn TransactionEncoder>) -> Self {
        Self {
            bootloader: BOOTLOADER_FORMAL_ADDRESS,
            encoder,
        }
    }
}

impl AccountModel for NativeModel {
    type Code = [u8; 4];

    const NAME: &'static str = "native";
    const RETAINS_NONCE_ON_ABORT: bool = true;

    fn dispatcher(&self) -> Address {
        self.bootloader
    }

    fn operation_hash(&self, op: &Operation) -> H256 {
        self.encoder.encode_hash(op)
    }

    fn signing_digest(&self, op_hash: H256) -> H256 {
        op_hash
    }

    fn settle_prefund(
        &self,
        world: &mut World,
        account: Address,
        op: &Operation,
        _missing_account_funds: U256,
    ) -> Result<(), AccountError> {
        let required = total_required_balance(op)?;
        let available = world.balance_of(account);
        if available < required {
            return Err(AccountError::InsufficientBalance {
                required,
                available,
            });
        }
        Ok(())
    }

    fn executor_for(&self, target: Address) -> &'static dyn CallExecutor {
        if target == CONTRACT_DEPLOYER {
            &SystemCall
        } else {
            &PlainCall
        }
    }

    fn status_code(&self, status: SignatureStatus) -> [u8; 4] {
        match status {
            SignatureStatus::Accepted => ACCOUNT_VALIDATION_SUCCESS_MAGIC,
            SignatureStatus::Rejected => ACCOUNT_VALIDATION_REJECTED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_signs_over_prefixed_digest() {
        let model = GenericModel::new(Address::from_low_u64_be(0xe0), 1);
        let op = Operation::default();
        let hash = model.operation_hash(&op);
        assert_eq!(model.signing_digest(hash), signed_message_digest(hash));
        assert_eq!(model.status_code(SignatureStatus::Accepted), U256::zero());
        assert_eq!(model.status_code(SignatureStatus::Rejected), U256::one());
    }

    #[test]
    fn native_signs_encoded_hash_directly() {
        let model = NativeModel::new(300);
        let op = Operation::default();
        let hash = model.operation_hash(&op);
        assert_eq!(hash, Eip712TransactionEncoder::new(300).encode_hash(&op));
        assert_eq!(model.signing_digest(hash), hash);
        assert_eq!(model.dispatcher(), BOOTLOADER_FORMAL_ADDRESS);
    }

    #[test]
    fn only_native_routes_deployer_through_system_call() {
        let mut world = World::new();
        world.deploy_system(CONTRACT_DEPLOYER, Arc::new(crate::system::ContractDeployer));
        let from = Address::from_low_u64_be(0xacc);

        let generic = GenericModel::new(Address::from_low_u64_be(0xe0), 1);
        assert!(generic
            .executor_for(CONTRACT_DEPLOYER)
            .forward(&mut world, from, CONTRACT_DEPLOYER, U256::zero(), Bytes::new())
            .is_err());

        let native = NativeModel::new(1);
        assert!(native
            .executor_for(CONTRACT_DEPLOYER)
            .forward(&mut world, from, CONTRACT_DEPLOYER, U256::zero(), Bytes::new())
            .is_ok());
        assert!(native
            .executor_for(Address::from_low_u64_be(0x70))
            .forward(&mut world, from, Address::from_low_u64_be(0x70), U256::zero(), Bytes::new())
            .is_ok());
    }
}
