// src/hasher.rs
use std::fmt::Debug;

use ethers::abi::{encode, Token};
use ethers::types::{Address, H256, U256};
use ethers::utils::{hash_message, keccak256};

use crate::types::Operation;

fn hashed(bytes: &[u8]) -> Token {
    Token::FixedBytes(keccak256(bytes).to_vec())
}

/// Calculate the hash of an operation according to the ERC-4337 v0.7 layout.
/// The digest is scoped by the dispatcher address and the chain id.
pub fn user_operation_hash(op: &Operation, dispatcher: Address, chain_id: u64) -> H256 {
    let packed = encode(&[
        Token::Address(op.sender),
        Token::Uint(op.nonce),
        hashed(&op.init_code),
        hashed(&op.call_data),
        Token::FixedBytes(word(op.account_gas_limits)),
        Token::Uint(op.pre_verification_gas),
        Token::FixedBytes(word(op.gas_fees)),
        hashed(&op.paymaster_and_data),
    ]);
    let inner = keccak256(packed);

    let scoped = encode(&[
        Token::FixedBytes(inner.to_vec()),
        Token::Address(dispatcher),
        Token::Uint(U256::from(chain_id)),
    ]);
    H256::from(keccak256(scoped))
}

/// The "\x19Ethereum Signed Message:\n32" digest the owner actually signs.
pub fn signed_message_digest(op_hash: H256) -> H256 {
    hash_message(op_hash.as_bytes())
}

fn word(value: U256) -> Vec<u8> {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    out.to_vec()
}

/// Canonical transaction encoding supplied by the native environment.
pub trait TransactionEncoder: Debug + Send + Sync {
    fn encode_hash(&self, op: &Operation) -> H256;
}

const DOMAIN_TYPE: &str = "EIP712Domain(string name,string version,uint256 chainId)";
const TRANSACTION_TYPE: &str = "Transaction(address from,uint256 nonce,bytes initCode,bytes callData,bytes32 accountGasLimits,uint256 preVerificationGas,bytes32 gasFees,bytes paymasterAndData)";

/// EIP-712 typed-data digest of the transaction-shaped fields.
#[derive(Debug, Clone)]
pub struct Eip712TransactionEncoder {
    chain_id: u64,
}

impl Eip712TransactionEncoder {
    pub fn new(chain_id: u64) -> Self {
        Self { chain_id }
    }

    pub fn domain_separator(&self) -> H256 {
        let encoded = encode(&[
            hashed(DOMAIN_TYPE.as_bytes()),
            hashed(b"MinimalAccount"),
            hashed(b"2"),
            Token::Uint(U256::from(self.chain_id)),
        ]);
        H256::from(keccak256(encoded))
    }

    fn struct_hash(&self, op: &Operation) -> [u8; 32] {
        let encoded = encode(&[
            hashed(TRANSACTION_TYPE.as_bytes()),
            Token::Address(op.sender),
            Token::Uint(op.nonce),
            hashed(&op.init_code),
            hashed(&op.call_data),
            Token::FixedBytes(word(op.account_gas_limits)),
            Token::Uint(op.pre_verification_gas),
            Token::FixedBytes(word(op.gas_fees)),
            hashed(&op.paymaster_and_data),
        ]);
        keccak256(encoded)
    }
}

impl TransactionEncoder for Eip712TransactionEncoder {
    fn encode_hash(&self, op: &Operation) -> H256 {
        let mut digest_input = Vec::with_capacity(66);
        digest_input.extend_from_slice(&[0x19, 0x01]);
        digest_input.extend_from_slice(self.domain_separator().as_bytes());
        digest_input.extend_from_slice(&self.struct_hash(op));
        H256::from(keccak256(digest_input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packing::pack;
    use ethers::types::Bytes;

    fn sample() -> Operation {
        Operation {
            sender: Address::from_low_u64_be(0xaa),
            nonce: U256::from(3),
            init_code: Bytes::new(),
            call_data: Bytes::from(vec![1, 2, 3]),
            account_gas_limits: pack(100_000, 200_000),
            pre_verification_gas: U256::from(21_000),
            gas_fees: pack(1, 2),
            paymaster_and_data: Bytes::new(),
            signature: Bytes::new(),
        }
    }

    #[test]
    fn hash_is_deterministic_and_ignores_signature() {
        let dispatcher = Address::from_low_u64_be(0xe0);
        let op = sample();
        let mut signed = op.clone();
        signed.signature = Bytes::from(vec![9; 65]);

        assert_eq!(
            user_operation_hash(&op, dispatcher, 1),
            user_operation_hash(&signed, dispatcher, 1)
        );
    }

    #[test]
    fn every_signed_field_changes_the_hash() {
        let dispatcher = Address::from_low_u64_be(0xe0);
        let base = user_operation_hash(&sample(), dispatcher, 1);
        let mutations: Vec<fn(&mut Operation)> = vec![
            |op| op.sender = Address::from_low_u64_be(0xbb),
            |op| op.nonce = U256::from(4),
            |op| op.init_code = Bytes::from(vec![0xff]),
            |op| op.call_data = Bytes::from(vec![1, 2, 4]),
            |op| op.account_gas_limits = pack(100_001, 200_000),
            |op| op.pre_verification_gas = U256::from(21_001),
            |op| op.gas_fees = pack(1, 3),
            |op| op.paymaster_and_data = Bytes::from(vec![0x01]),
        ];
        for mutate in mutations {
            let mut op = sample();
            mutate(&mut op);
            assert_ne!(user_operation_hash(&op, dispatcher, 1), base);
        }
    }

    #[test]
    fn hash_is_scoped_by_dispatcher_and_chain() {
        let op = sample();
        let a = Address::from_low_u64_be(0xe0);
        let b = Address::from_low_u64_be(0xe1);
        assert_ne!(user_operation_hash(&op, a, 1), user_operation_hash(&op, b, 1));
        assert_ne!(user_operation_hash(&op, a, 1), user_operation_hash(&op, a, 2));
    }

    #[test]
    fn signed_message_digest_wraps_hash() {
        let hash = user_operation_hash(&sample(), Address::zero(), 1);
        assert_ne!(signed_message_digest(hash), hash);
        assert_eq!(signed_message_digest(hash), hash_message(hash.as_bytes()));
    }

    #[test]
    fn eip712_encoder_is_deterministic_and_chain_scoped() {
        let op = sample();
        let mainnet = Eip712TransactionEncoder::new(1);
        let other = Eip712TransactionEncoder::new(300);
        assert_eq!(mainnet.encode_hash(&op), mainnet.encode_hash(&op));
        assert_ne!(mainnet.encode_hash(&op), other.encode_hash(&op));

        let mut bumped = op.clone();
        bumped.nonce = U256::from(4);
        assert_ne!(mainnet.encode_hash(&op), mainnet.encode_hash(&bumped));

        let mut signed = op.clone();
        signed.signature = Bytes::from(vec![1; 65]);
        assert_eq!(mainnet.encode_hash(&op), mainnet.encode_hash(&signed));
    }
}
