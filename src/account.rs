// src/account.rs
use ethers::types::{Address, Bytes, H256, U256};
use tracing::{debug, info, warn};

use crate::error::AccountError;
use crate::gate::{AccessGate, AuthContext};
use crate::model::{AccountModel, NativeModel};
use crate::signature::validate_signature;
use crate::types::{Operation, SignatureStatus};
use crate::world::World;

/// A smart account with a single immutable owner.
#[derive(Debug, Clone)]
pub struct MinimalAccount<M: AccountModel> {
    address: Address,
    owner: Address,
    gate: AccessGate,
    model: M,
}

impl<M: AccountModel> MinimalAccount<M> {
    pub fn new(address: Address, owner: Address, model: M) -> Self {
        info!(
            "Initialized {} account {:?} owned by {:?}",
            M::NAME,
            address,
            owner
        );
        Self {
            address,
            owner,
            gate: AccessGate::new(model.dispatcher(), owner),
            model,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn get_nonce(&self, world: &World) -> U256 {
        world.nonces().get_nonce(self.address)
    }

    /// Dispatcher entry point: consume the nonce, settle the prefund and check
    /// the owner's signature over `op_hash`.
    pub fn validate_op(
        &self,
        ctx: AuthContext,
        world: &mut World,
        op: &Operation,
        op_hash: H256,
        missing_account_funds: U256,
    ) -> Result<M::Code, AccountError> {
        self.gate.require_trusted_only(ctx)?;
        world.transact(M::RETAINS_NONCE_ON_ABORT, |world| {
            let status = self.validate_inner(world, op, op_hash, missing_account_funds)?;
            Ok(self.model.status_code(status))
        })
    }

    pub fn execute(
        &self,
        ctx: AuthContext,
        world: &mut World,
        target: Address,
        value: U256,
        payload: Bytes,
    ) -> Result<Bytes, AccountError> {
        self.gate.require_trusted_or_owner(ctx)?;
        self.dispatch(world, target, value, payload)
    }

    /// Runs a pre-signed operation on behalf of anyone. The signature is the
    /// only authorization, so a rejected one aborts.
    pub fn execute_from_outside(
        &self,
        world: &mut World,
        op: &Operation,
    ) -> Result<Bytes, AccountError> {
        let op_hash = self.model.operation_hash(op);
        world.transact(M::RETAINS_NONCE_ON_ABORT, |world| {
            match self.validate_inner(world, op, op_hash, U256::zero())? {
                SignatureStatus::Accepted => self.execute_operation(world, op),
                SignatureStatus::Rejected => Err(AccountError::InvalidSignature),
            }
        })
    }

    fn validate_inner(
        &self,
        world: &mut World,
        op: &Operation,
        op_hash: H256,
        missing_account_funds: U256,
    ) -> Result<SignatureStatus, AccountError> {
        if op.sender != self.address {
            return Err(AccountError::SenderMismatch {
                sender: op.sender,
                account: self.address,
            });
        }
        world.nonces_mut().increment_if_equal(self.address, op.nonce)?;
        self.model
            .settle_prefund(world, self.address, op, missing_account_funds)?;

        let digest = self.model.signing_digest(op_hash);
        let status = validate_signature(digest, &op.signature, self.owner)?;
        if status == SignatureStatus::Rejected {
            warn!(
                "Signature for {:?} nonce {} does not match owner",
                self.address, op.nonce
            );
        }
        Ok(status)
    }

    fn execute_operation(&self, world: &mut World, op: &Operation) -> Result<Bytes, AccountError> {
        match op.decode_call()? {
            Some(call) => self.dispatch(world, call.dest, call.value, call.function_data),
            None => Ok(Bytes::new()),
        }
    }

    fn dispatch(
        &self,
        world: &mut World,
        target: Address,
        value: U256,
        payload: Bytes,
    ) -> Result<Bytes, AccountError> {
        debug!("Account {:?} calling {:?} with value {}", self.address, target, value);
        self.model
            .executor_for(target)
            .forward(world, self.address, target, value, payload)
            .map_err(|revert| AccountError::ExecutionFailed(revert.0))
    }
}

impl MinimalAccount<NativeModel> {
    fn transaction_hash(&self, suggested_signed_hash: H256, op: &Operation) -> H256 {
        if suggested_signed_hash.is_zero() {
            self.model.operation_hash(op)
        } else {
            suggested_signed_hash
        }
    }

    pub fn validate_transaction(
        &self,
        ctx: AuthContext,
        world: &mut World,
        _tx_hash: H256,
        suggested_signed_hash: H256,
        op: &Operation,
    ) -> Result<[u8; 4], AccountError> {
        let hash = self.transaction_hash(suggested_signed_hash, op);
        self.validate_op(ctx, world, op, hash, U256::zero())
    }

    pub fn execute_transaction(
        &self,
        ctx: AuthContext,
        world: &mut World,
        _tx_hash: H256,
        _suggested_signed_hash: H256,
        op: &Operation,
    ) -> Result<Bytes, AccountError> {
        self.gate.require_trusted_or_owner(ctx)?;
        self.execute_operation(world, op)
    }

    /// Forwards the maximum fee to the bootloader.
    pub fn pay_for_transaction(
        &self,
        ctx: AuthContext,
        world: &mut World,
        _tx_hash: H256,
        _suggested_signed_hash: H256,
        op: &Operation,
    ) -> Result<(), AccountError> {
        self.gate.require_trusted_only(ctx)?;
        let fee = crate::fees::required_prefund(op)?;
        debug!("Paying {} to bootloader {:?}", fee, self.model.bootloader);
        self.model
            .executor_for(self.model.bootloader)
            .forward(world, self.address, self.model.bootloader, fee, Bytes::new())
            .map(|_| ())
            .map_err(|revert| AccountError::PaymentFailed(revert.0))
    }

    pub fn prepare_for_paymaster(
        &self,
        ctx: AuthContext,
        _tx_hash: H256,
        _possible_signed_hash: H256,
        _op: &Operation,
    ) -> Result<(), AccountError> {
        self.gate.require_trusted_only(ctx)
    }

    pub fn execute_transaction_from_outside(
        &self,
        world: &mut World,
        op: &Operation,
    ) -> Result<Bytes, AccountError> {
        self.execute_from_outside(world, op)
    }
}
