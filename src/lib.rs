// src/lib.rs
//! A single-owner smart account whose authority comes from off-chain
//! signatures, runnable under an ERC-4337 style dispatcher or a native
//! bootloader.

pub mod abi;
pub mod account;
pub mod builder;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod fees;
pub mod gate;
pub mod hasher;
pub mod model;
pub mod node;
pub mod nonce;
pub mod packing;
pub mod rpc;
pub mod signature;
pub mod system;
pub mod token;
pub mod types;
pub mod world;

pub use account::MinimalAccount;
pub use error::AccountError;
pub use model::{AccountModel, GenericModel, NativeModel};
pub use types::Operation;
