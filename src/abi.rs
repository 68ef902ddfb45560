// src/abi.rs
use ethers::prelude::abigen;

abigen!(
    IMinimalAccount,
    r#"[
        function execute(address dest, uint256 value, bytes functionData) external
    ]"#
);

abigen!(
    IMockToken,
    r#"[
        function mint(address to, uint256 amount) external
        function balanceOf(address account) external view returns (uint256)
    ]"#
);
