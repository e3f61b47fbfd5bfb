//! Random byte source for the RAND opcode.

use std::time::{SystemTime, UNIX_EPOCH};

/// Substitute when the seed is zero (a fixed point of xorshift) or the clock
/// is unavailable.
const FALLBACK_SEED: u32 = 0x2545_F491;

/// 32-bit xorshift generator (shift triple 2/15/17); each step yields the
/// top byte of the new state.
///
/// Seeding at reset makes runs reproducible; tests pin seed/value pairs
/// against this exact generator.
#[derive(Clone, Debug)]
pub struct XorShift {
    state: u32,
}

impl XorShift {
    /// `None` seeds from the system clock for ordinary interactive runs.
    pub fn new(seed: Option<u32>) -> Self {
        let seed = seed.unwrap_or_else(clock_seed);
        XorShift {
            state: if seed == 0 { FALLBACK_SEED } else { seed },
        }
    }

    pub fn next_byte(&mut self) -> u8 {
        let mut x = self.state;
        x ^= x << 2;
        x ^= x >> 15;
        x ^= x << 17;
        self.state = x;
        (x >> 24) as u8
    }
}

fn clock_seed() -> u32 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.subsec_nanos() ^ elapsed.as_secs() as u32,
        Err(_) => FALLBACK_SEED,
    }
}
