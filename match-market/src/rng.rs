//! Deterministic per-trial random streams.
//!
//! Each Monte-Carlo trial draws from its own `ChaCha20` stream whose seed is
//! derived from the user seed and the trial index, so results do not depend
//! on the order or thread trials run on.

use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<ChaCha20Rng> {
    /// Seed a `ChaCha20` stream directly.
    #[must_use]
    pub fn from_seed_u64(seed: u64) -> Self {
        Self::wrap(ChaCha20Rng::seed_from_u64(seed))
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Wrap an existing generator.
    pub const fn wrap(rng: R) -> Self {
        Self { rng, draws: 0 }
    }

    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

/// Random stream used by a single trial.
pub type TrialRng = CountingRng<ChaCha20Rng>;

/// Derive the stream for `trial` under `user_seed`.
#[must_use]
pub fn trial_stream(user_seed: u64, trial: u64) -> TrialRng {
    let mut tag = [0u8; 13];
    tag[..5].copy_from_slice(b"trial");
    tag[5..].copy_from_slice(&trial.to_le_bytes());
    CountingRng::from_seed_u64(derive_stream_seed(user_seed, &tag))
}

/// HMAC-SHA256 of `domain_tag` keyed by the user seed, folded to 64 bits.
#[must_use]
pub fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()).expect("64-bit seed is valid key");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
