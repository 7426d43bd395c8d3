//! Random alias addresses

use std::sync::Arc;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::Mutex;

/// Characters the local part is made of
const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of the local part
const LOCAL_PART_LENGTH: usize = 8;

/// Generates `<random>@<domain>` addresses
///
/// There is no uniqueness check against existing aliases, with 36^8 possible local parts a
/// collision is not expected at the volumes this runs at.
#[derive(Clone, Debug)]
pub struct AddressGenerator {
    /// Source of randomness, shared by all clones
    rng: Arc<Mutex<StdRng>>,

    /// Domain every address ends with
    domain: String,
}

impl AddressGenerator {
    /// Create a generator seeded by the operating system
    pub fn from_os_rng(domain: impl Into<String>) -> Self {
        Self::with_rng(StdRng::from_os_rng(), domain)
    }

    /// Create a generator with a fixed seed, the same seed gives the same addresses
    #[cfg_attr(not(test), expect(dead_code))]
    pub fn from_seed(seed: u64, domain: impl Into<String>) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), domain)
    }

    fn with_rng(rng: StdRng, domain: impl Into<String>) -> Self {
        Self {
            rng: Arc::new(Mutex::new(rng)),
            domain: domain.into(),
        }
    }

    /// Generate a new address
    pub async fn generate(&self) -> String {
        let local_part = {
            let mut rng = self.rng.lock().await;

            random_string(&mut *rng, LOCAL_PART_LENGTH)
        };

        format!("{local_part}@{}", self.domain)
    }
}

/// Random string of `length` characters out of [`CHARSET`]
fn random_string<R: Rng>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| char::from(CHARSET[rng.random_range(0..CHARSET.len())]))
        .collect()
}
