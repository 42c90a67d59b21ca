//! Seeded random streams for a game.
use hmac::{Hmac, Mac};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

/// Purpose a random stream is reserved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RngStream {
    /// Roster shuffles, event picks and rerolls.
    Round,
    /// Feast trigger rolls.
    Stage,
}

impl RngStream {
    pub const ALL: [Self; 2] = [Self::Round, Self::Stage];

    const fn label(self) -> &'static [u8] {
        match self {
            Self::Round => b"hgs/round",
            Self::Stage => b"hgs/stage",
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::Round => 0,
            Self::Stage => 1,
        }
    }
}

/// One ChaCha20 generator per [`RngStream`], all derived from a single seed.
#[derive(Debug, Clone)]
pub struct RngStreams {
    streams: [CountingRng<ChaCha20Rng>; 2],
}

impl RngStreams {
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            streams: RngStream::ALL.map(|stream| {
                CountingRng::new(ChaCha20Rng::from_seed(stream_key(seed, stream)))
            }),
        }
    }

    pub fn get_mut(&mut self, stream: RngStream) -> &mut CountingRng<ChaCha20Rng> {
        &mut self.streams[stream.slot()]
    }

    #[must_use]
    pub fn draws(&self, stream: RngStream) -> u64 {
        self.streams[stream.slot()].draws()
    }
}

/// Generator wrapper that counts how often it was drawn from.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    inner: R,
    draws: u64,
}

impl<R> CountingRng<R> {
    pub const fn new(inner: R) -> Self {
        Self { inner, draws: 0 }
    }

    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }

    fn tick(&mut self) -> &mut R {
        self.draws = self.draws.saturating_add(1);
        &mut self.inner
    }
}

impl<R: RngCore> RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.tick().next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.tick().next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.tick().fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.tick().try_fill_bytes(dest)
    }
}

/// HMAC-SHA256 keyed by the stream label over the user seed; the full
/// digest is the ChaCha20 key.
fn stream_key(seed: u64, stream: RngStream) -> [u8; 32] {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(stream.label()).expect("HMAC accepts keys of any length");
    mac.update(&seed.to_be_bytes());
    mac.finalize().into_bytes().into()
}
