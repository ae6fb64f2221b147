// Last-known-value hold for one feedback channel.
// A failed read keeps the previous value and counts how many cycles in a row the
// channel has been stale. Whether that count is fatal is decided by the drive.
// Until the first good read there is nothing to hold, which the drive treats as lost.

// Licensed under the Apache License, Version 2.0

use super::{Channel, Reading};

#[derive(Clone, Debug)]
pub struct HeldReading {
    channel: Channel,
    value: i32,        // Last good value (0 until the first successful read)
    has_value: bool,   // At least one successful read so far
    stale_cycles: u16, // Consecutive failed reads
}

impl HeldReading {
    pub const fn new(channel: Channel) -> Self {
        Self {
            channel,
            value: 0,
            has_value: false,
            stale_cycles: 0,
        }
    }

    /// Feed this cycle's read result, returns the value to use.
    pub fn tick(&mut self, reading: Reading) -> i32 {
        match reading {
            Ok(value) => {
                if self.stale_cycles > 0 {
                    debug!(
                        "{} reading back after {} stale cycles",
                        self.channel.name(),
                        self.stale_cycles
                    );
                }
                self.value = value;
                self.has_value = true;
                self.stale_cycles = 0;
            }
            Err(_) => {
                if self.stale_cycles == 0 {
                    debug!("{} reading unavailable, holding {}", self.channel.name(), self.value);
                }
                self.stale_cycles = self.stale_cycles.saturating_add(1);
            }
        }
        self.value
    }

    #[inline(always)]
    pub fn value(&self) -> i32 {
        self.value
    }

    /// False until the channel has delivered its first value.
    #[inline(always)]
    pub fn has_value(&self) -> bool {
        self.has_value
    }

    #[inline(always)]
    pub fn is_stale(&self) -> bool {
        self.stale_cycles > 0
    }

    #[inline(always)]
    pub fn stale_cycles(&self) -> u16 {
        self.stale_cycles
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoundaryError;

    #[test]
    fn starts_at_zero() {
        let held = HeldReading::new(Channel::Speed);
        assert_eq!(held.value(), 0);
        assert!(!held.has_value());
        assert!(!held.is_stale());
    }

    #[test]
    fn failures_before_first_read_hold_nothing() {
        let mut held = HeldReading::new(Channel::Current);
        assert_eq!(held.tick(Err(BoundaryError::Unavailable)), 0);
        assert!(!held.has_value());
        assert_eq!(held.tick(Ok(-7)), -7);
        assert!(held.has_value());
        held.tick(Err(BoundaryError::Timeout));
        assert!(held.has_value());
    }

    #[test]
    fn holds_last_value_on_failure() {
        let mut held = HeldReading::new(Channel::Speed);
        assert_eq!(held.tick(Ok(250)), 250);
        assert_eq!(held.tick(Err(BoundaryError::Timeout)), 250);
        assert_eq!(held.tick(Err(BoundaryError::Unavailable)), 250);
        assert!(held.is_stale());
        assert_eq!(held.stale_cycles(), 2);
    }

    #[test]
    fn fresh_value_clears_staleness() {
        let mut held = HeldReading::new(Channel::Voltage);
        held.tick(Err(BoundaryError::NotUpdated));
        assert_eq!(held.tick(Ok(4800)), 4800);
        assert_eq!(held.stale_cycles(), 0);
        assert_eq!(held.channel(), Channel::Voltage);
    }
}
