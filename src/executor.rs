// src/executor.rs
use ethers::types::{Address, Bytes, U256};

use crate::error::Revert;
use crate::world::{CallFrame, World};

/// How the account forwards a call on its own behalf.
pub trait CallExecutor: Send + Sync {
    fn forward(
        &self,
        world: &mut World,
        from: Address,
        target: Address,
        value: U256,
        payload: Bytes,
    ) -> Result<Bytes, Revert>;
}

pub struct PlainCall;

impl CallExecutor for PlainCall {
    fn forward(
        &self,
        world: &mut World,
        from: Address,
        target: Address,
        value: U256,
        payload: Bytes,
    ) -> Result<Bytes, Revert> {
        world.call(CallFrame::plain(from, target, value, payload))
    }
}

pub struct SystemCall;

impl CallExecutor for SystemCall {
    fn forward(
        &self,
        world: &mut World,
        from: Address,
        target: Address,
        value: U256,
        payload: Bytes,
    ) -> Result<Bytes, Revert> {
        world.call(CallFrame::system(from, target, value, payload))
    }
}
