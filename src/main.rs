// src/main.rs
use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use dotenv::dotenv;
use ethers::types::U256;
use jsonrpsee::server::{ServerBuilder, ServerHandle};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use minimal_account::node::{ModelKind, Node, NodeConfig};
use minimal_account::rpc::{AccountRpcImpl, AccountRpcServer};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(short, long, default_value = "127.0.0.1:8545")]
    rpc_server_addr: String,

    /// Owner key of the account
    #[clap(short, long)]
    private_key: String,

    #[clap(short, long)]
    chain_id: u64,

    #[clap(short, long, value_enum, default_value = "generic")]
    model: ModelKind,

    /// Starting native balance of the account, in wei
    #[clap(short, long, default_value = "10000000000000000000")]
    initial_balance: u128,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Parse command line arguments
    let args = Args::parse();

    let node = Node::new(NodeConfig {
        chain_id: args.chain_id,
        model: args.model,
        owner_key: args.private_key,
        initial_balance: U256::from(args.initial_balance),
    })?;
    info!(
        "Account {:?} owned by {:?}, mock token at {:?}",
        node.account(),
        node.owner(),
        node.token()
    );

    // Create the JSON-RPC server
    let server_addr: SocketAddr = args.rpc_server_addr.parse()?;
    let account_rpc = AccountRpcImpl::new(Arc::new(node));

    info!("Starting smart account RPC server on {}", server_addr);

    let server_handle = start_server(server_addr, account_rpc).await?;

    // Keep the server running until Ctrl+C is pressed
    tokio::signal::ctrl_c().await?;
    server_handle.stop()?;
    info!("Server stopped");

    Ok(())
}

async fn start_server(
    server_addr: SocketAddr,
    account_rpc: AccountRpcImpl,
) -> anyhow::Result<ServerHandle> {
    let server = ServerBuilder::default()
        .build(server_addr)
        .await?;

    let server_handle = server.start(account_rpc.into_rpc());

    Ok(server_handle)
}
