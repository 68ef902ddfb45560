// src/world.rs
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use ethers::types::{Address, Bytes, H256, U256};
use tracing::debug;

use crate::error::Revert;
use crate::nonce::NonceAuthority;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Plain,
    /// Privileged path required by restricted system contracts.
    System,
}

#[derive(Debug, Clone)]
pub struct CallFrame {
    pub caller: Address,
    pub target: Address,
    pub value: U256,
    pub data: Bytes,
    pub kind: CallKind,
}

impl CallFrame {
    pub fn plain(caller: Address, target: Address, value: U256, data: Bytes) -> Self {
        Self {
            caller,
            target,
            value,
            data,
            kind: CallKind::Plain,
        }
    }

    pub fn system(caller: Address, target: Address, value: U256, data: Bytes) -> Self {
        Self {
            kind: CallKind::System,
            ..Self::plain(caller, target, value, data)
        }
    }
}

/// Code deployed at an address. State lives in [`World`] storage so that
/// snapshots cover it.
pub trait Contract: Send + Sync {
    fn call(&self, frame: &CallFrame, world: &mut World) -> Result<Bytes, Revert>;
}

/// In-memory stand-in for the ledger the account runs on.
#[derive(Clone, Default)]
pub struct World {
    balances: HashMap<Address, U256>,
    storage: HashMap<(Address, H256), U256>,
    code: HashMap<Address, Arc<dyn Contract>>,
    restricted: HashSet<Address>,
    nonces: NonceAuthority,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("balances", &self.balances)
            .field("storage_slots", &self.storage.len())
            .field("contracts", &self.code.keys().collect::<Vec<_>>())
            .field("restricted", &self.restricted)
            .field("nonces", &self.nonces)
            .finish()
    }
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deploy(&mut self, address: Address, contract: Arc<dyn Contract>) {
        self.code.insert(address, contract);
    }

    /// Deploys a contract that only accepts [`CallKind::System`] calls.
    pub fn deploy_system(&mut self, address: Address, contract: Arc<dyn Contract>) {
        self.deploy(address, contract);
        self.restricted.insert(address);
    }

    pub fn balance_of(&self, address: Address) -> U256 {
        self.balances.get(&address).copied().unwrap_or_default()
    }

    pub fn set_balance(&mut self, address: Address, amount: U256) {
        self.balances.insert(address, amount);
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), Revert> {
        if amount.is_zero() {
            return Ok(());
        }
        let available = self.balance_of(from);
        let remaining = available.checked_sub(amount).ok_or_else(|| {
            Revert::new(format!(
                "insufficient balance for transfer: {available} < {amount}"
            ))
        })?;
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or_else(|| Revert::new("balance overflow"))?;
        self.balances.insert(from, remaining);
        self.balances.insert(to, credited);
        Ok(())
    }

    pub fn sload(&self, address: Address, slot: H256) -> U256 {
        self.storage.get(&(address, slot)).copied().unwrap_or_default()
    }

    pub fn sstore(&mut self, address: Address, slot: H256, value: U256) {
        if value.is_zero() {
            self.storage.remove(&(address, slot));
        } else {
            self.storage.insert((address, slot), value);
        }
    }

    pub fn nonces(&self) -> &NonceAuthority {
        &self.nonces
    }

    pub fn nonces_mut(&mut self) -> &mut NonceAuthority {
        &mut self.nonces
    }

    /// Moves `frame.value` and runs the target's code, if any. Either all of it
    /// happens or none of it does.
    pub fn call(&mut self, frame: CallFrame) -> Result<Bytes, Revert> {
        if self.restricted.contains(&frame.target) && frame.kind != CallKind::System {
            return Err(Revert::new(format!(
                "{:?} only accepts system calls",
                frame.target
            )));
        }
        self.transact(false, |world| {
            world.transfer(frame.caller, frame.target, frame.value)?;
            let Some(contract) = world.code.get(&frame.target).cloned() else {
                return Ok(Bytes::new());
            };
            debug!(
                "Call {:?} -> {:?} ({:?}, value {})",
                frame.caller, frame.target, frame.kind, frame.value
            );
            contract.call(&frame, world)
        })
    }

    /// Runs `f` against this world and restores the prior state if it fails.
    /// With `keep_nonces` the nonce authority keeps whatever `f` consumed.
    pub fn transact<T, E>(
        &mut self,
        keep_nonces: bool,
        f: impl FnOnce(&mut World) -> Result<T, E>,
    ) -> Result<T, E> {
        let snapshot = self.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                let nonces = std::mem::take(&mut self.nonces);
                *self = snapshot;
                if keep_nonces {
                    self.nonces = nonces;
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Reverter;

    impl Contract for Reverter {
        fn call(&self, frame: &CallFrame, world: &mut World) -> Result<Bytes, Revert> {
            world.sstore(frame.target, H256::zero(), U256::from(42));
            Err(Revert::new("always reverts"))
        }
    }

    struct Echo;

    impl Contract for Echo {
        fn call(&self, frame: &CallFrame, _world: &mut World) -> Result<Bytes, Revert> {
            Ok(frame.data.clone())
        }
    }

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    #[test]
    fn plain_call_to_empty_address_moves_value() {
        let mut world = World::new();
        world.set_balance(addr(1), U256::from(100));

        let out = world
            .call(CallFrame::plain(addr(1), addr(2), U256::from(40), Bytes::new()))
            .unwrap();

        assert!(out.is_empty());
        assert_eq!(world.balance_of(addr(1)), U256::from(60));
        assert_eq!(world.balance_of(addr(2)), U256::from(40));
    }

    #[test]
    fn reverted_call_leaves_no_trace() {
        let mut world = World::new();
        world.set_balance(addr(1), U256::from(100));
        world.deploy(addr(9), Arc::new(Reverter));

        let err = world
            .call(CallFrame::plain(addr(1), addr(9), U256::from(10), Bytes::new()))
            .unwrap_err();

        assert_eq!(err, Revert::new("always reverts"));
        assert_eq!(world.balance_of(addr(1)), U256::from(100));
        assert_eq!(world.balance_of(addr(9)), U256::zero());
        assert_eq!(world.sload(addr(9), H256::zero()), U256::zero());
    }

    #[test]
    fn overdrawn_call_reverts() {
        let mut world = World::new();
        world.set_balance(addr(1), U256::from(5));
        assert!(world
            .call(CallFrame::plain(addr(1), addr(2), U256::from(6), Bytes::new()))
            .is_err());
        assert_eq!(world.balance_of(addr(1)), U256::from(5));
    }

    #[test]
    fn restricted_address_needs_system_call() {
        let mut world = World::new();
        world.deploy_system(addr(0x8006), Arc::new(Echo));
        let payload = Bytes::from(vec![1, 2, 3]);

        assert!(world
            .call(CallFrame::plain(addr(1), addr(0x8006), U256::zero(), payload.clone()))
            .is_err());
        let out = world
            .call(CallFrame::system(addr(1), addr(0x8006), U256::zero(), payload.clone()))
            .unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn transact_can_keep_consumed_nonces() {
        let mut world = World::new();
        world.set_balance(addr(1), U256::from(10));

        let result: Result<(), Revert> = world.transact(true, |w| {
            w.nonces_mut().increment_if_equal(addr(1), U256::zero()).unwrap();
            w.set_balance(addr(1), U256::zero());
            Err(Revert::new("abort"))
        });
        assert!(result.is_err());
        assert_eq!(world.nonces().get_nonce(addr(1)), U256::one());
        assert_eq!(world.balance_of(addr(1)), U256::from(10));

        let result: Result<(), Revert> = world.transact(false, |w| {
            w.nonces_mut().increment_if_equal(addr(1), U256::one()).unwrap();
            Err(Revert::new("abort"))
        });
        assert!(result.is_err());
        assert_eq!(world.nonces().get_nonce(addr(1)), U256::one());
    }
}
