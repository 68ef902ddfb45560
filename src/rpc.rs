// src/rpc.rs
use std::sync::Arc;

use ethers::types::{Address, Bytes, H256, U256};
use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::types::error::ErrorObjectOwned;
use tracing::{debug, error, info};

use crate::error::AccountError;
use crate::node::Node;
use crate::types::{OpReceipt, Operation};

// Define the RPC interface
#[rpc(server, namespace = "aa")]
pub trait AccountRpc {
    /// Submits a signed operation through the node's dispatcher
    #[method(name = "sendOperation")]
    async fn send_operation(&self, op: Operation) -> RpcResult<OpReceipt>;

    #[method(name = "operationHash")]
    async fn operation_hash(&self, op: Operation) -> RpcResult<H256>;

    #[method(name = "getNonce")]
    async fn get_nonce(&self, sender: Address) -> RpcResult<U256>;

    /// Builds and owner-signs the next operation for the node's account
    #[method(name = "buildOperation")]
    async fn build_operation(&self, call_data: Bytes) -> RpcResult<Operation>;

    #[method(name = "balanceOf")]
    async fn balance_of(&self, address: Address) -> RpcResult<U256>;

    #[method(name = "tokenBalance")]
    async fn token_balance(&self, holder: Address) -> RpcResult<U256>;
}

pub struct AccountRpcImpl {
    node: Arc<Node>,
}

impl AccountRpcImpl {
    pub fn new(node: Arc<Node>) -> Self {
        Self { node }
    }
}

fn rpc_error(e: AccountError) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(-32000, format!("Account error: {}", e), None::<()>)
}

#[async_trait]
impl AccountRpcServer for AccountRpcImpl {
    async fn send_operation(&self, op: Operation) -> RpcResult<OpReceipt> {
        debug!("Received operation from {:?} nonce {}", op.sender, op.nonce);

        match self.node.send_operation(op).await {
            Ok(receipt) => {
                info!("Operation {:?} included, fee {}", receipt.op_hash, receipt.actual_gas_cost);
                Ok(receipt)
            }
            Err(e) => {
                error!("Failed to process operation: {}", e);
                Err(rpc_error(e))
            }
        }
    }

    async fn operation_hash(&self, op: Operation) -> RpcResult<H256> {
        self.node.operation_hash(&op).map_err(rpc_error)
    }

    async fn get_nonce(&self, sender: Address) -> RpcResult<U256> {
        Ok(self.node.get_nonce(sender).await)
    }

    async fn build_operation(&self, call_data: Bytes) -> RpcResult<Operation> {
        self.node.build_operation(call_data).await.map_err(rpc_error)
    }

    async fn balance_of(&self, address: Address) -> RpcResult<U256> {
        Ok(self.node.balance_of(address).await)
    }

    async fn token_balance(&self, holder: Address) -> RpcResult<U256> {
        Ok(self.node.token_balance(holder).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::MintCall;
    use crate::builder::encode_execute;
    use crate::node::{ModelKind, NodeConfig};
    use ethers::abi::AbiEncode;

    fn rpc() -> AccountRpcImpl {
        let node = Node::new(NodeConfig {
            chain_id: 31337,
            model: ModelKind::Generic,
            owner_key: "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
                .to_string(),
            initial_balance: U256::exp10(19),
        })
        .unwrap();
        AccountRpcImpl::new(Arc::new(node))
    }

    #[tokio::test]
    async fn build_and_send() {
        let rpc = rpc();
        let account = rpc.node.account();
        let mint = MintCall {
            to: account,
            amount: U256::exp10(18),
        };
        let call_data = encode_execute(rpc.node.token(), U256::zero(), Bytes::from(mint.encode()));

        let op = rpc.build_operation(call_data).await.unwrap();
        let hash = rpc.operation_hash(op.clone()).await.unwrap();
        let receipt = rpc.send_operation(op).await.unwrap();

        assert_eq!(receipt.op_hash, hash);
        assert_eq!(rpc.token_balance(account).await.unwrap(), U256::exp10(18));
        assert_eq!(rpc.get_nonce(account).await.unwrap(), U256::one());
    }

    #[tokio::test]
    async fn unsigned_operation_maps_to_rpc_error() {
        let rpc = rpc();
        let mut op = rpc.build_operation(Bytes::new()).await.unwrap();
        op.signature = Bytes::new();

        let err = rpc.send_operation(op).await.unwrap_err();
        assert_eq!(err.code(), -32000);
        assert!(err.message().contains("FailedOp"));
        assert_eq!(rpc.get_nonce(rpc.node.account()).await.unwrap(), U256::zero());
    }

    #[test]
    fn rpc_module_registers_namespaced_methods() {
        let module = rpc().into_rpc();
        let names: Vec<_> = module.method_names().collect();
        assert!(names.contains(&"aa_sendOperation"));
        assert!(names.contains(&"aa_getNonce"));
        assert!(names.contains(&"aa_buildOperation"));
    }
}
