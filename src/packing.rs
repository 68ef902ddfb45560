// src/packing.rs
use ethers::types::U256;

use crate::error::AccountError;

/// Places `high` in the upper 128 bits and `low` in the lower 128 bits.
pub fn pack(high: u128, low: u128) -> U256 {
    (U256::from(high) << 128) | U256::from(low)
}

/// Inverse of [`pack`].
pub fn unpack(word: U256) -> Result<(u128, u128), AccountError> {
    let high = word >> 128;
    let low = word & U256::from(u128::MAX);
    if high.bits() > 128 || low.bits() > 128 {
        return Err(AccountError::MalformedOperationEncoding(format!(
            "word {word:#x} does not split into two 128-bit halves"
        )));
    }
    let unpacked = (high.low_u128(), low.low_u128());
    if pack(unpacked.0, unpacked.1) != word {
        return Err(AccountError::MalformedOperationEncoding(format!(
            "word {word:#x} does not re-encode to itself"
        )));
    }
    Ok(unpacked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_edge_values() {
        let samples = [
            (0, 0),
            (0, u128::MAX),
            (u128::MAX, 0),
            (u128::MAX, u128::MAX),
            (1, 1),
            (16_777_216, 256),
            (1 << 127, (1 << 127) - 1),
        ];
        for (high, low) in samples {
            assert_eq!(unpack(pack(high, low)).unwrap(), (high, low));
        }
    }

    #[test]
    fn halves_do_not_overlap() {
        let word = pack(1, 0);
        assert_eq!(word, U256::one() << 128);
        let word = pack(0, u128::MAX);
        assert_eq!(word, U256::from(u128::MAX));
        assert_eq!(pack(u128::MAX, u128::MAX), U256::MAX);
    }

    #[test]
    fn unpacks_arbitrary_words() {
        let (high, low) = unpack(U256::MAX - 1).unwrap();
        assert_eq!(high, u128::MAX);
        assert_eq!(low, u128::MAX - 1);
    }
}
