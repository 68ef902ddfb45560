// src/system.rs
use ethers::types::{Address, Bytes, H160, H256, U256};
use ethers::utils::keccak256;

use crate::error::Revert;
use crate::world::{CallFrame, CallKind, Contract, World};

const fn system_address(low: u16) -> Address {
    let mut bytes = [0u8; 20];
    bytes[18] = (low >> 8) as u8;
    bytes[19] = low as u8;
    H160(bytes)
}

/// Identity the native bootloader uses when calling accounts.
pub const BOOTLOADER_FORMAL_ADDRESS: Address = system_address(0x8001);

/// Well-known deployer; the environment refuses plain calls to it.
pub const CONTRACT_DEPLOYER: Address = system_address(0x8006);

const CALLS_SLOT: H256 = H256([0u8; 32]);
const LAST_PAYLOAD_SLOT: H256 = H256([1u8; 32]);

/// Records every privileged call it receives.
pub struct ContractDeployer;

impl ContractDeployer {
    pub fn calls(world: &World) -> U256 {
        world.sload(CONTRACT_DEPLOYER, CALLS_SLOT)
    }

    pub fn last_payload_hash(world: &World) -> H256 {
        let mut out = [0u8; 32];
        world
            .sload(CONTRACT_DEPLOYER, LAST_PAYLOAD_SLOT)
            .to_big_endian(&mut out);
        H256(out)
    }
}

impl Contract for ContractDeployer {
    fn call(&self, frame: &CallFrame, world: &mut World) -> Result<Bytes, Revert> {
        if frame.kind != CallKind::System {
            return Err(Revert::new("deployer requires a system call"));
        }
        let calls = Self::calls(world).saturating_add(U256::one());
        world.sstore(frame.target, CALLS_SLOT, calls);
        world.sstore(
            frame.target,
            LAST_PAYLOAD_SLOT,
            U256::from_big_endian(&keccak256(&frame.data)),
        );
        Ok(Bytes::new())
    }
}
