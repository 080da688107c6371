//! Chronologically ordered, collision-resistant record keys.
//!
//! A key is 20 characters: 8 encode the millisecond timestamp, 12 are
//! random. Keys generated within the same millisecond increment the random
//! part instead of redrawing it, so keys from one generator always sort in
//! creation order.

use rand::Rng;

/// Alphabet in ASCII order so that lexicographic order matches numeric order.
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = 12;

/// Stateful key generator. Wrap it in a mutex to share it.
#[derive(Debug, Default)]
pub struct PushIdGenerator {
    last_time: i64,
    last_random: [u8; RANDOM_CHARS],
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a key stamped with the current wall-clock time.
    pub fn generate(&mut self) -> String {
        self.generate_at(chrono::Utc::now().timestamp_millis())
    }

    /// Generate a key stamped with `now_ms`.
    pub fn generate_at(&mut self, now_ms: i64) -> String {
        let duplicate = now_ms == self.last_time;
        self.last_time = now_ms;

        let mut out = Vec::with_capacity(TIME_CHARS + RANDOM_CHARS);

        let mut time_chars = [0u8; TIME_CHARS];
        let mut t = now_ms.max(0) as u64;
        for slot in time_chars.iter_mut().rev() {
            *slot = PUSH_CHARS[(t % 64) as usize];
            t /= 64;
        }
        out.extend_from_slice(&time_chars);

        if duplicate {
            // Carry through trailing 63s, then bump the next digit.
            for digit in self.last_random.iter_mut().rev() {
                if *digit == 63 {
                    *digit = 0;
                } else {
                    *digit += 1;
                    break;
                }
            }
        } else {
            let mut rng = rand::thread_rng();
            for digit in self.last_random.iter_mut() {
                *digit = rng.gen_range(0..64);
            }
        }

        out.extend(self.last_random.iter().map(|&d| PUSH_CHARS[d as usize]));

        // Every byte comes from PUSH_CHARS, which is ASCII.
        String::from_utf8_lossy(&out).into_owned()
    }
}
