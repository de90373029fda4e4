use rand::Rng;

use crate::error::Result;
use crate::platform::Pointer;
use crate::sleep;
use crate::types::ScreenPoint;

/// Clicks through a platform pointer, each click optionally left to chance
/// so the bot never behaves like a perfectly reliable machine.
pub struct Dispatcher<R> {
    pointer: Box<dyn Pointer>,
    rng: R,
    /// Pause after every click, jittered by +/-30%.
    pause_ms: u64,
}

impl<R: Rng> Dispatcher<R> {
    pub fn new(pointer: Box<dyn Pointer>, rng: R, pause_ms: u64) -> Self {
        Self { pointer, rng, pause_ms }
    }

    /// True with probability `chance` (clamped to [0, 1]).
    pub fn roll(&mut self, chance: f64) -> bool {
        self.rng.gen_bool(chance.clamp(0.0, 1.0))
    }

    pub fn click(&mut self, at: ScreenPoint) -> Result<()> {
        self.pointer.click(at)?;
        sleep::sleep_jitter_ms(self.pause_ms);
        Ok(())
    }

    /// Click `at` with probability `chance`. Returns whether it clicked.
    pub fn click_with_chance(&mut self, at: ScreenPoint, chance: f64) -> Result<bool> {
        if !self.roll(chance) {
            return Ok(false);
        }
        self.click(at)?;
        Ok(true)
    }
}
