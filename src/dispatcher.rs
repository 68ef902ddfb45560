// src/dispatcher.rs
use std::collections::HashMap;
use std::sync::Arc;

use ethers::abi::{encode, Token};
use ethers::types::{Address, Bytes, H256, U256};
use ethers::utils::keccak256;
use tracing::{debug, error, info, warn};

use crate::account::MinimalAccount;
use crate::error::{AccountError, Revert};
use crate::fees::required_prefund;
use crate::gate::AuthContext;
use crate::model::{AccountModel, GenericModel, NativeModel};
use crate::types::{OpReceipt, Operation, ACCOUNT_VALIDATION_SUCCESS_MAGIC, SIG_VALIDATION_SUCCESS};
use crate::world::{CallFrame, Contract, World};

fn deposit_slot(account: Address) -> H256 {
    H256::from(keccak256(encode(&[
        Token::Address(account),
        Token::Uint(U256::one()),
    ])))
}

/// Receiving side of the EntryPoint: value sent to it is credited to the
/// sender's deposit.
struct DepositVault;

impl Contract for DepositVault {
    fn call(&self, frame: &CallFrame, world: &mut World) -> Result<Bytes, Revert> {
        if !frame.data.is_empty() {
            return Err(Revert::new("EntryPoint only accepts plain deposits"));
        }
        let slot = deposit_slot(frame.caller);
        let deposit = world
            .sload(frame.target, slot)
            .checked_add(frame.value)
            .ok_or_else(|| Revert::new("deposit overflow"))?;
        world.sstore(frame.target, slot, deposit);
        Ok(Bytes::new())
    }
}

fn check_dispatcher<M: AccountModel>(model: &M, dispatcher: Address) -> Result<(), AccountError> {
    if model.dispatcher() != dispatcher {
        return Err(AccountError::DispatcherMismatch {
            bound: model.dispatcher(),
            dispatcher,
        });
    }
    Ok(())
}

struct UserOpInfo {
    index: usize,
    op: Operation,
    op_hash: H256,
    prefund: U256,
}

/// Generic-model dispatcher driving batches of operations through
/// validate-then-execute.
pub struct EntryPoint {
    address: Address,
    chain_id: u64,
    accounts: HashMap<Address, MinimalAccount<GenericModel>>,
}

impl EntryPoint {
    pub fn deploy(world: &mut World, address: Address, chain_id: u64) -> Self {
        world.deploy(address, Arc::new(DepositVault));
        info!("EntryPoint deployed at {:?} on chain {}", address, chain_id);
        Self {
            address,
            chain_id,
            accounts: HashMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn model(&self) -> GenericModel {
        GenericModel::new(self.address, self.chain_id)
    }

    pub fn register_account(&mut self, account: MinimalAccount<GenericModel>) -> Result<(), AccountError> {
        check_dispatcher(account.model(), self.address)?;
        self.accounts.insert(account.address(), account);
        Ok(())
    }

    pub fn account(&self, address: Address) -> Option<&MinimalAccount<GenericModel>> {
        self.accounts.get(&address)
    }

    pub fn get_user_op_hash(&self, op: &Operation) -> H256 {
        self.model().operation_hash(op)
    }

    pub fn get_nonce(&self, world: &World, sender: Address) -> U256 {
        world.nonces().get_nonce(sender)
    }

    pub fn balance_of(&self, world: &World, account: Address) -> U256 {
        world.sload(self.address, deposit_slot(account))
    }

    pub fn deposit_to(
        &self,
        world: &mut World,
        payer: Address,
        account: Address,
        amount: U256,
    ) -> Result<(), AccountError> {
        world.transact(false, |world| {
            world
                .transfer(payer, self.address, amount)
                .map_err(|revert| AccountError::PaymentFailed(revert.0))?;
            let deposit = self
                .balance_of(world, account)
                .checked_add(amount)
                .ok_or_else(|| AccountError::PaymentFailed("deposit overflow".to_string()))?;
            world.sstore(self.address, deposit_slot(account), deposit);
            Ok(())
        })
    }

    /// Validates every operation, then executes them in order and pays the
    /// collected fees to `beneficiary`. Any validation or execution failure
    /// reverts the whole batch, nonces and fees included.
    pub fn handle_ops(
        &self,
        world: &mut World,
        ops: &[Operation],
        beneficiary: Address,
    ) -> Result<Vec<OpReceipt>, AccountError> {
        info!("Handling batch of {} operations", ops.len());
        world.transact(false, |world| {
            let mut infos = Vec::with_capacity(ops.len());
            for (index, op) in ops.iter().enumerate() {
                infos.push(self.validate_prepayment(world, index, op)?);
            }

            let mut collected = U256::zero();
            let mut receipts = Vec::with_capacity(infos.len());
            for info in infos {
                let receipt = self.execute_user_op(world, info)?;
                collected = collected.saturating_add(receipt.actual_gas_cost);
                receipts.push(receipt);
            }

            self.compensate(world, beneficiary, collected)?;
            Ok(receipts)
        })
    }

    fn validate_prepayment(
        &self,
        world: &mut World,
        index: usize,
        op: &Operation,
    ) -> Result<UserOpInfo, AccountError> {
        let failed = |reason: String| AccountError::FailedOp { index, reason };

        let account = self
            .accounts
            .get(&op.sender)
            .ok_or_else(|| failed("AA20 account not deployed".to_string()))?;
        let op_hash = self.get_user_op_hash(op);
        let prefund = required_prefund(op).map_err(|e| failed(format!("AA94 {e}")))?;

        let deposit = self.balance_of(world, op.sender);
        let missing_account_funds = prefund.saturating_sub(deposit);

        let code = account
            .validate_op(
                AuthContext::new(self.address),
                world,
                op,
                op_hash,
                missing_account_funds,
            )
            .map_err(|e| match e {
                AccountError::InvalidNonce { .. } => failed(format!("AA25 invalid account nonce: {e}")),
                other => failed(format!("AA23 reverted: {other}")),
            })?;
        if code != U256::from(SIG_VALIDATION_SUCCESS) {
            warn!("Operation {} rejected: signature error", index);
            return Err(failed("AA24 signature error".to_string()));
        }

        let deposit = self.balance_of(world, op.sender);
        if deposit < prefund {
            return Err(failed("AA21 didn't pay prefund".to_string()));
        }
        world.sstore(self.address, deposit_slot(op.sender), deposit - prefund);

        Ok(UserOpInfo {
            index,
            op: op.clone(),
            op_hash,
            prefund,
        })
    }

    fn execute_user_op(&self, world: &mut World, info: UserOpInfo) -> Result<OpReceipt, AccountError> {
        let account = self
            .accounts
            .get(&info.op.sender)
            .ok_or(AccountError::UnknownAccount(info.op.sender))?;
        let ctx = AuthContext::new(self.address);

        let return_data = match info.op.decode_call()? {
            Some(call) => account.execute(ctx, world, call.dest, call.value, call.function_data),
            None => Ok(Bytes::new()),
        }
        .map_err(|e| {
            error!("Operation {} execution reverted: {}", info.index, e);
            e
        })?;
        debug!("Operation {:?} executed", info.op_hash);

        Ok(OpReceipt {
            op_hash: info.op_hash,
            sender: info.op.sender,
            nonce: info.op.nonce,
            actual_gas_cost: info.prefund,
            return_data,
        })
    }

    fn compensate(&self, world: &mut World, beneficiary: Address, amount: U256) -> Result<(), AccountError> {
        if beneficiary.is_zero() {
            return Err(AccountError::FailedOp {
                index: 0,
                reason: "AA90 invalid beneficiary".to_string(),
            });
        }
        world
            .transfer(self.address, beneficiary, amount)
            .map_err(|revert| AccountError::FailedOp {
                index: 0,
                reason: format!("AA91 failed send to beneficiary: {revert}"),
            })
    }
}

/// Native-model driver: validate, pay, execute for one account transaction.
pub struct Bootloader {
    address: Address,
    accounts: HashMap<Address, MinimalAccount<NativeModel>>,
}

impl Bootloader {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            accounts: HashMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn register_account(&mut self, account: MinimalAccount<NativeModel>) -> Result<(), AccountError> {
        check_dispatcher(account.model(), self.address)?;
        self.accounts.insert(account.address(), account);
        Ok(())
    }

    pub fn account(&self, address: Address) -> Option<&MinimalAccount<NativeModel>> {
        self.accounts.get(&address)
    }

    pub fn transaction_hash(&self, op: &Operation) -> Result<H256, AccountError> {
        let account = self
            .accounts
            .get(&op.sender)
            .ok_or(AccountError::UnknownAccount(op.sender))?;
        Ok(account.model().operation_hash(op))
    }

    /// Any abort rolls the world back except the consumed nonce.
    pub fn process_transaction(&self, world: &mut World, op: &Operation) -> Result<OpReceipt, AccountError> {
        let account = self
            .accounts
            .get(&op.sender)
            .ok_or(AccountError::UnknownAccount(op.sender))?;
        let ctx = AuthContext::new(self.address);
        let tx_hash = account.model().operation_hash(op);

        let result = world.transact(NativeModel::RETAINS_NONCE_ON_ABORT, |world| {
            let magic = account.validate_transaction(ctx, world, tx_hash, tx_hash, op)?;
            if magic != ACCOUNT_VALIDATION_SUCCESS_MAGIC {
                debug!("Account returned magic 0x{}", hex::encode(magic));
                return Err(AccountError::InvalidSignature);
            }
            account.pay_for_transaction(ctx, world, tx_hash, tx_hash, op)?;
            let fee = required_prefund(op)?;
            let return_data = account.execute_transaction(ctx, world, tx_hash, tx_hash, op)?;
            Ok(OpReceipt {
                op_hash: tx_hash,
                sender: op.sender,
                nonce: op.nonce,
                actual_gas_cost: fee,
                return_data,
            })
        });

        match &result {
            Ok(_) => info!("Transaction {:?} executed", tx_hash),
            Err(e) => warn!("Transaction {:?} rejected: {}", tx_hash, e),
        }
        result
    }
}
