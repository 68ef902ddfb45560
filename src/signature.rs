// src/signature.rs
use ethers::types::{Address, Signature, H256, U256};

use crate::error::AccountError;
use crate::types::SignatureStatus;

/// secp256k1n / 2. Signatures with a larger `s` are malleable and refused.
const SECP256K1_HALF_ORDER: U256 = U256([
    0xDFE9_2F46_681B_20A0,
    0x5D57_6E73_57A4_501D,
    0xFFFF_FFFF_FFFF_FFFF,
    0x7FFF_FFFF_FFFF_FFFF,
]);

/// Recovers the signer of `digest`. Structurally invalid signatures are errors,
/// never a silently wrong address.
pub fn recover_signer(digest: H256, signature: &[u8]) -> Result<Address, AccountError> {
    let signature = Signature::try_from(signature)
        .map_err(|e| AccountError::MalformedSignature(e.to_string()))?;

    if signature.v != 27 && signature.v != 28 {
        return Err(AccountError::MalformedSignature(format!(
            "invalid recovery byte {}",
            signature.v
        )));
    }
    if signature.s > SECP256K1_HALF_ORDER {
        return Err(AccountError::MalformedSignature("non-canonical s value".to_string()));
    }

    signature
        .recover(digest)
        .map_err(|e| AccountError::MalformedSignature(e.to_string()))
}

pub fn is_owner(digest: H256, signature: &[u8], owner: Address) -> Result<bool, AccountError> {
    Ok(recover_signer(digest, signature)? == owner)
}

pub fn validate_signature(
    digest: H256,
    signature: &[u8],
    owner: Address,
) -> Result<SignatureStatus, AccountError> {
    if is_owner(digest, signature, owner)? {
        Ok(SignatureStatus::Accepted)
    } else {
        Ok(SignatureStatus::Rejected)
    }
}
