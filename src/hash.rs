//! Hash mixing for table indices.
//!
//! The table derives a slot's ideal index from the *high* bits of a 64-bit
//! hash, so every hash it receives is first passed through [`mix`] to spread
//! entropy from whichever bits the user's hasher populated. The mixed value
//! is then forced odd, which reserves `0` as the empty-slot marker.

use core::hash::BuildHasher;
use core::hash::Hasher;

/// Mixes a raw 64-bit hash so that every input bit affects every output bit.
///
/// This is the 64-bit finalizer from MurmurHash3. It is a bijection, so
/// distinct inputs never collide, and `mix(0) == 0`.
///
/// # Examples
///
/// ```rust
/// use shift_hash::hash::mix;
///
/// assert_eq!(mix(0), 0);
/// assert_ne!(mix(1), mix(2));
/// // Adjacent inputs land far apart in the high bits.
/// assert_ne!(mix(1) >> 60, mix(2) >> 60);
/// ```
#[inline(always)]
pub const fn mix(mut x: u64) -> u64 {
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    x ^= x >> 33;
    x
}

/// The hash value actually stored in a slot. Never zero.
#[inline(always)]
pub(crate) const fn table_hash(raw: u64) -> u64 {
    mix(raw) | 1
}

const SEED: u64 = 0x243f_6a88_85a3_08d3;
const MULTIPLIER: u64 = 0x9e37_79b9_7f4a_7c15;

/// A small, deterministic [`Hasher`] built on [`mix`].
///
/// Words are folded into the state multiplicatively and the state is mixed
/// once in [`finish`](Hasher::finish). It is not resistant to hash flooding;
/// it is the default only when neither the `foldhash` nor the `std` feature is
/// enabled.
#[derive(Debug, Clone)]
pub struct MixHasher {
    state: u64,
    written: u64,
}

impl MixHasher {
    #[inline(always)]
    fn fold(&mut self, word: u64) {
        self.state = (self.state.rotate_left(23) ^ word).wrapping_mul(MULTIPLIER);
    }
}

impl Hasher for MixHasher {
    fn write(&mut self, bytes: &[u8]) {
        let mut chunks = bytes.chunks_exact(8);
        for chunk in &mut chunks {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            self.fold(u64::from_le_bytes(word));
        }

        let tail = chunks.remainder();
        if !tail.is_empty() {
            let mut word = [0u8; 8];
            word[..tail.len()].copy_from_slice(tail);
            self.fold(u64::from_le_bytes(word));
        }
        self.written = self.written.wrapping_add(bytes.len() as u64);
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.fold(i);
        self.written = self.written.wrapping_add(8);
    }

    #[inline]
    fn write_usize(&mut self, i: usize) {
        self.write_u64(i as u64);
    }

    #[inline]
    fn finish(&self) -> u64 {
        mix(self.state ^ self.written)
    }
}

/// A [`BuildHasher`] producing [`MixHasher`]s from a fixed seed.
///
/// Two `MixState`s with the same seed always hash equal keys identically,
/// across runs and across machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MixState {
    seed: u64,
}

impl MixState {
    /// Creates a builder whose hashers start from `seed`.
    pub const fn with_seed(seed: u64) -> Self {
        Self { seed }
    }
}

impl Default for MixState {
    fn default() -> Self {
        Self::with_seed(SEED)
    }
}

impl BuildHasher for MixState {
    type Hasher = MixHasher;

    fn build_hasher(&self) -> MixHasher {
        MixHasher {
            state: self.seed,
            written: 0,
        }
    }
}
