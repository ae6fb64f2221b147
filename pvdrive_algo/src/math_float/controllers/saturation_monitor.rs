// Tracks how long a PI output has been pinned to one of its bounds.
// A loop that stays saturated for many cycles usually means the reference is not
// reachable; this is reported, never acted on.

// Licensed under the Apache License, Version 2.0

use super::pi::PiController;

/// Consecutive-saturation counter for one control loop.
#[derive(Clone, Debug)]
pub struct SaturationMonitor {
    name: &'static str, // Loop name used in log messages
    warn_after: u32,    // Threshold in cycles
    cycles: u32,        // Consecutive saturated cycles so far
}

impl SaturationMonitor {
    pub fn new(name: &'static str, warn_after: u32) -> Self {
        Self {
            name,
            warn_after,
            cycles: 0,
        }
    }

    /// Observe the controller after its update for this cycle.
    pub fn tick(&mut self, pi: &PiController) {
        if !pi.is_saturated() {
            if self.is_pinned() {
                info!("{} loop left saturation after {} cycles", self.name, self.cycles);
            }
            self.cycles = 0;
            return;
        }

        self.cycles = self.cycles.saturating_add(1);
        if self.cycles == self.warn_after {
            warn!(
                "{} loop pinned at {} for {} cycles, reference may be unreachable",
                self.name,
                pi.output(),
                self.cycles
            );
        }
    }

    /// Consecutive saturated cycles.
    #[inline(always)]
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    /// True once saturation has lasted at least the warning threshold.
    #[inline(always)]
    pub fn is_pinned(&self) -> bool {
        self.warn_after > 0 && self.cycles >= self.warn_after
    }
}
