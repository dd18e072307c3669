//! Key capability for shard routing.
//!
//! A cache key needs two things: map semantics (`Eq + Hash`) inside its
//! owning shard, and a stable 64-bit dispersion value that routes it to a
//! shard in the first place. The dispersion hash is deliberately simple and
//! deliberately stable: string keys use an FNV-style multiply over
//! codepoints, numeric keys use their bit pattern widened to 64 bits.
//! Changing either would silently reshuffle every key across shards.

use std::hash::Hash;
use std::sync::Arc;

use crate::error::{Error, Result};

/// FNV-64 prime used by the string dispersion hash.
pub(crate) const FNV_PRIME_64: u64 = 1_099_511_628_211;

/// Capability required of cache keys.
///
/// Implementations report [`Error::KeyIsNil`] or
/// [`Error::InvalidKeyTypeForHash`] for keys that cannot be routed; the
/// built-in implementations for strings and integers never fail. A failed
/// route drops writes, fails lookups with the routing error, and makes
/// deletes report `false`.
pub trait CacheKey: Clone + Eq + Hash + Send + Sync + 'static {
    /// Returns the 64-bit dispersion value used to select a shard.
    ///
    /// Must return the same value for equal keys.
    fn route_hash(&self) -> Result<u64>;
}

/// FNV-style dispersion over the codepoints of a string.
///
/// The accumulator starts at zero; iteration is per codepoint, not per
/// byte, so a multi-byte character contributes exactly one round.
#[inline]
fn fnv_codepoints(s: &str) -> u64 {
    let mut val = 0u64;
    for symbol in s.chars() {
        val ^= symbol as u64;
        val = val.wrapping_mul(FNV_PRIME_64);
    }
    val
}

impl CacheKey for String {
    #[inline]
    fn route_hash(&self) -> Result<u64> {
        Ok(fnv_codepoints(self))
    }
}

impl CacheKey for Box<str> {
    #[inline]
    fn route_hash(&self) -> Result<u64> {
        Ok(fnv_codepoints(self))
    }
}

impl CacheKey for Arc<str> {
    #[inline]
    fn route_hash(&self) -> Result<u64> {
        Ok(fnv_codepoints(self))
    }
}

macro_rules! impl_cache_key_for_int {
    ($($t:ty),* $(,)?) => {
        $(
            impl CacheKey for $t {
                #[inline]
                fn route_hash(&self) -> Result<u64> {
                    // Sign-extending cast: negative keys disperse across
                    // the upper range instead of collapsing near zero.
                    Ok(*self as u64)
                }
            }
        )*
    };
}

impl_cache_key_for_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

/// `None` behaves as an unroutable key: lookups fail with
/// [`Error::KeyIsNil`], writes are dropped, deletes report `false`.
impl<K: CacheKey> CacheKey for Option<K> {
    #[inline]
    fn route_hash(&self) -> Result<u64> {
        match self {
            Some(key) => key.route_hash(),
            None => Err(Error::KeyIsNil),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
