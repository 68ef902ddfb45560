// src/token.rs
use ethers::abi::{encode, AbiDecode, AbiEncode, Token};
use ethers::types::{Address, Bytes, H256, U256};
use ethers::utils::keccak256;

use crate::abi::IMockTokenCalls;
use crate::error::Revert;
use crate::world::{CallFrame, Contract, World};

/// ERC20-shaped mock with an open `mint`, used as a call target.
pub struct MockToken;

impl MockToken {
    fn balance_slot(account: Address) -> H256 {
        H256::from(keccak256(encode(&[
            Token::Address(account),
            Token::Uint(U256::zero()),
        ])))
    }

    pub fn balance_of(world: &World, token: Address, account: Address) -> U256 {
        world.sload(token, Self::balance_slot(account))
    }
}

impl Contract for MockToken {
    fn call(&self, frame: &CallFrame, world: &mut World) -> Result<Bytes, Revert> {
        let call = IMockTokenCalls::decode(&frame.data)
            .map_err(|e| Revert::new(format!("unknown token call: {e}")))?;
        match call {
            IMockTokenCalls::Mint(mint) => {
                let slot = Self::balance_slot(mint.to);
                let balance = world
                    .sload(frame.target, slot)
                    .checked_add(mint.amount)
                    .ok_or_else(|| Revert::new("mint overflow"))?;
                world.sstore(frame.target, slot, balance);
                Ok(Bytes::new())
            }
            IMockTokenCalls::BalanceOf(query) => {
                let balance = Self::balance_of(world, frame.target, query.account);
                Ok(Bytes::from(balance.encode()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{BalanceOfCall, MintCall};
    use std::sync::Arc;

    #[test]
    fn mint_and_query() {
        let token = Address::from_low_u64_be(0x70);
        let holder = Address::from_low_u64_be(0xa1);
        let mut world = World::new();
        world.deploy(token, Arc::new(MockToken));

        let mint = MintCall {
            to: holder,
            amount: U256::exp10(18),
        };
        world
            .call(CallFrame::plain(holder, token, U256::zero(), Bytes::from(mint.encode())))
            .unwrap();

        let query = BalanceOfCall { account: holder };
        let out = world
            .call(CallFrame::plain(holder, token, U256::zero(), Bytes::from(query.encode())))
            .unwrap();
        assert_eq!(U256::decode(&out).unwrap(), U256::exp10(18));
        assert_eq!(MockToken::balance_of(&world, token, holder), U256::exp10(18));
    }

    #[test]
    fn garbage_reverts() {
        let token = Address::from_low_u64_be(0x70);
        let mut world = World::new();
        world.deploy(token, Arc::new(MockToken));

        assert!(world
            .call(CallFrame::plain(
                Address::zero(),
                token,
                U256::zero(),
                Bytes::from(vec![1, 2, 3, 4])
            ))
            .is_err());
    }
}
