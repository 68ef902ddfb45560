// src/node.rs
use std::sync::Arc;

use anyhow::Result;
use clap::ValueEnum;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, H256, U256};
use ethers::utils::get_contract_address;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use crate::account::MinimalAccount;
use crate::builder::{generate_unsigned, sign};
use crate::dispatcher::{Bootloader, EntryPoint};
use crate::error::AccountError;
use crate::model::NativeModel;
use crate::system::{ContractDeployer, BOOTLOADER_FORMAL_ADDRESS, CONTRACT_DEPLOYER};
use crate::token::MockToken;
use crate::types::{OpReceipt, Operation};
use crate::world::World;

/// Canonical ERC-4337 v0.7 EntryPoint address.
pub const ENTRY_POINT_V07: &str = "0x0000000071727De22E5E9d8BAf0edAc6f37da032";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Generic,
    Native,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    pub chain_id: u64,
    pub model: ModelKind,
    pub owner_key: String,
    pub initial_balance: U256,
}

enum Runtime {
    Generic(EntryPoint),
    Native(Bootloader),
}

/// One account, its dispatcher and a mock token on a private world.
pub struct Node {
    owner: LocalWallet,
    account: Address,
    token: Address,
    runtime: Runtime,
    world: Mutex<World>,
}

impl Node {
    pub fn new(config: NodeConfig) -> Result<Self> {
        let owner = config
            .owner_key
            .parse::<LocalWallet>()?
            .with_chain_id(config.chain_id);
        let account = get_contract_address(owner.address(), 0u64);
        let token = get_contract_address(owner.address(), 1u64);

        let mut world = World::new();
        world.deploy(token, Arc::new(MockToken));
        world.deploy_system(CONTRACT_DEPLOYER, Arc::new(ContractDeployer));
        world.set_balance(account, config.initial_balance);

        let runtime = match config.model {
            ModelKind::Generic => {
                let mut entry_point =
                    EntryPoint::deploy(&mut world, ENTRY_POINT_V07.parse()?, config.chain_id);
                entry_point.register_account(MinimalAccount::new(
                    account,
                    owner.address(),
                    entry_point.model(),
                ))?;
                Runtime::Generic(entry_point)
            }
            ModelKind::Native => {
                let mut bootloader = Bootloader::new(BOOTLOADER_FORMAL_ADDRESS);
                bootloader.register_account(MinimalAccount::new(
                    account,
                    owner.address(),
                    NativeModel::new(config.chain_id),
                ))?;
                Runtime::Native(bootloader)
            }
        };

        info!(
            "Node ready: {:?} model, account {:?}, token {:?}",
            config.model, account, token
        );

        Ok(Self {
            owner,
            account,
            token,
            runtime,
            world: Mutex::new(world),
        })
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn owner(&self) -> Address {
        self.owner.address()
    }

    pub async fn send_operation(&self, op: Operation) -> Result<OpReceipt, AccountError> {
        let mut world = self.world.lock().await;
        match &self.runtime {
            Runtime::Generic(entry_point) => {
                let mut receipts = entry_point.handle_ops(&mut world, &[op], self.owner.address())?;
                receipts
                    .pop()
                    .ok_or_else(|| AccountError::FailedOp {
                        index: 0,
                        reason: "empty batch result".to_string(),
                    })
            }
            Runtime::Native(bootloader) => bootloader.process_transaction(&mut world, &op),
        }
    }

    pub fn operation_hash(&self, op: &Operation) -> Result<H256, AccountError> {
        match &self.runtime {
            Runtime::Generic(entry_point) => Ok(entry_point.get_user_op_hash(op)),
            Runtime::Native(bootloader) => bootloader.transaction_hash(op),
        }
    }

    pub async fn get_nonce(&self, sender: Address) -> U256 {
        self.world.lock().await.nonces().get_nonce(sender)
    }

    /// Builds the next operation for the node's account and signs it with the
    /// owner key.
    pub async fn build_operation(&self, call_data: Bytes) -> Result<Operation, AccountError> {
        let nonce = self.get_nonce(self.account).await;
        let op = generate_unsigned(call_data, self.account, nonce);
        match &self.runtime {
            Runtime::Generic(entry_point) => sign(op, &self.owner, &entry_point.model()),
            Runtime::Native(bootloader) => {
                let account = bootloader
                    .account(self.account)
                    .ok_or(AccountError::UnknownAccount(self.account))?;
                sign(op, &self.owner, account.model())
            }
        }
    }

    pub async fn balance_of(&self, address: Address) -> U256 {
        self.world.lock().await.balance_of(address)
    }

    pub async fn token_balance(&self, holder: Address) -> U256 {
        MockToken::balance_of(&*self.world.lock().await, self.token, holder)
    }
}
