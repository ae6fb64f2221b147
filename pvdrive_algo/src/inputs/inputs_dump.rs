// Implements a double-buffering system for the drive feedback (current, speed, PV voltage),
// so that values written by interrupt routines are consumed as one coherent snapshot at
// the start of each control cycle.

// Key Features:
// - Two `DataInputs` buffers: one being filled, one ready for reading.
// - A bitmask per buffer tracks which mandatory fields are still pending.
// - A buffer only becomes readable once every mandatory field has been written.
// - The buffer being read is never the one being written. Exclusion between a writer and
//   the reader is the caller's critical section, the `&mut self` receivers enforce it.
// - Implements the sensor boundary: a cycle without a new complete snapshot reports
//   every channel as `NotUpdated`, which the stale-value hold absorbs.

// Detailed Operation:
// Writers (ADC end-of-sequence, bus transfer complete) call the `set_*` methods.
// Each call stores the value into the buffer being updated and clears the field bit.
// When both buffers are complete the roles swap and the iteration counter advances.
// The control cycle calls `get_data()` (or `sample()` through `Sensors`) on the other
// buffer. Sharing between interrupt and cycle context goes through the platform's
// critical section or resource lock.

// Licensed under the Apache License, Version 2.0

use super::{DataInputs, SensorSample};
use crate::boundary::Sensors;
use crate::error::BoundaryError;

/// Bit masks for each field of `DataInputs`.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataInputsBit {
    /// Motor current field bit.
    CURRENT = 1 << 0,

    /// Encoder speed field bit.
    SPEED = 1 << 1,

    /// PV source voltage field bit.
    VOLTAGE = 1 << 2,
}

/// All feedback fields are mandatory.
pub const ALL_FIELDS: u32 =
    DataInputsBit::CURRENT as u32 | DataInputsBit::SPEED as u32 | DataInputsBit::VOLTAGE as u32;

/// Two buffers of `DataInputs` and their completion flags.
pub struct InputsDump<const MANDATORY_FIELDS: u32 = ALL_FIELDS> {
    /// One buffer being updated, one ready for reading.
    buffers: [DataInputs; 2],

    /// Index of the buffer currently being updated.
    idx2update: usize,

    /// Pending-field flags for each buffer.
    flags: [u32; 2],

    /// Completed snapshots counter.
    iter: usize,

    /// Counter value at the last read.
    prev_iter: usize,
}

impl<const MANDATORY_FIELDS: u32> InputsDump<MANDATORY_FIELDS> {
    /// Creates a dump with buffer 0 pending and buffer 1 marked ready (but never updated).
    pub const fn new() -> Self {
        Self {
            buffers: [DataInputs::ZERO, DataInputs::ZERO],
            idx2update: 0,
            flags: [MANDATORY_FIELDS, 0],
            iter: 0,
            prev_iter: 0,
        }
    }

    #[inline(always)]
    fn is_ready(&self, idx: usize) -> bool {
        self.flags[idx] == 0
    }

    #[inline(always)]
    fn get_opposite(&self, idx: usize) -> usize {
        1 - idx
    }

    #[inline(always)]
    fn clear_field_bit(&mut self, idx: usize, bit: DataInputsBit) {
        self.flags[idx] &= !(bit as u32);
    }

    /// Once both buffers are complete, start filling the one that was just read from.
    fn check_fill(&mut self, idx: usize) {
        if self.is_ready(0) && self.is_ready(1) {
            let idx = self.get_opposite(idx);
            self.flags[idx] = MANDATORY_FIELDS;
            self.idx2update = idx;
            self.iter = self.iter.wrapping_add(1);
        }
    }

    /// Stores the motor current reading.
    pub fn set_current(&mut self, value: i32) {
        let idx = self.idx2update;
        self.buffers[idx].current = value;
        self.clear_field_bit(idx, DataInputsBit::CURRENT);
        self.check_fill(idx);
    }

    /// Stores the encoder speed reading.
    pub fn set_speed(&mut self, value: i32) {
        let idx = self.idx2update;
        self.buffers[idx].speed = value;
        self.clear_field_bit(idx, DataInputsBit::SPEED);
        self.check_fill(idx);
    }

    /// Stores the PV source voltage reading.
    pub fn set_voltage(&mut self, value: i32) {
        let idx = self.idx2update;
        self.buffers[idx].voltage = value;
        self.clear_field_bit(idx, DataInputsBit::VOLTAGE);
        self.check_fill(idx);
    }

    /// True if a complete snapshot arrived since the last read.
    #[inline(always)]
    pub fn is_updated(&self) -> bool {
        self.iter != self.prev_iter
    }

    /// Copies the latest complete snapshot.
    #[inline(always)]
    pub fn get_data(&mut self) -> DataInputs {
        let ready_idx = self.get_opposite(self.idx2update);
        self.prev_iter = self.iter;
        self.buffers[ready_idx]
    }
}

impl<const MANDATORY_FIELDS: u32> Default for InputsDump<MANDATORY_FIELDS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const MANDATORY_FIELDS: u32> Sensors for InputsDump<MANDATORY_FIELDS> {
    fn sample(&mut self) -> SensorSample {
        if self.is_updated() {
            SensorSample::fresh(self.get_data())
        } else {
            SensorSample::unavailable(BoundaryError::NotUpdated)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(dump: &mut InputsDump, current: i32, speed: i32, voltage: i32) {
        dump.set_current(current);
        dump.set_speed(speed);
        dump.set_voltage(voltage);
    }

    #[test]
    fn not_updated_until_all_fields_written() {
        let mut dump: InputsDump = InputsDump::new();
        assert!(!dump.is_updated());

        dump.set_current(10);
        dump.set_speed(20);
        assert!(!dump.is_updated());

        dump.set_voltage(30);
        assert!(dump.is_updated());
        assert_eq!(
            dump.get_data(),
            DataInputs {
                current: 10,
                speed: 20,
                voltage: 30
            }
        );
        assert!(!dump.is_updated());
    }

    #[test]
    fn partial_update_never_leaks() {
        let mut dump: InputsDump = InputsDump::new();
        fill(&mut dump, 1, 2, 3);

        // Second round only half written: the reader still gets the first snapshot
        dump.set_current(100);
        dump.set_speed(200);
        let data = dump.get_data();
        assert_eq!((data.current, data.speed, data.voltage), (1, 2, 3));
    }

    #[test]
    fn latest_complete_snapshot_wins() {
        let mut dump: InputsDump = InputsDump::new();
        fill(&mut dump, 1, 2, 3);
        fill(&mut dump, 4, 5, 6);
        assert!(dump.is_updated());
        let data = dump.get_data();
        assert_eq!((data.current, data.speed, data.voltage), (4, 5, 6));
    }

    #[test]
    fn sensor_boundary_reports_missing_snapshot() {
        let mut dump: InputsDump = InputsDump::new();
        let sample = dump.sample();
        assert_eq!(sample.speed, Err(BoundaryError::NotUpdated));

        fill(&mut dump, -7, 300, 4900);
        let sample = dump.sample();
        assert_eq!(sample.current, Ok(-7));
        assert_eq!(sample.speed, Ok(300));
        assert_eq!(sample.voltage, Ok(4900));

        // Nothing new since: stale again
        assert_eq!(dump.sample().voltage, Err(BoundaryError::NotUpdated));
    }

    #[test]
    fn read_leaves_flags_untouched() {
        let mut dump: InputsDump = InputsDump::new();
        fill(&mut dump, 1, 2, 3);
        let before = dump.flags;
        dump.get_data();
        assert_eq!(dump.flags, before);
        assert_eq!(dump.flags[dump.get_opposite(dump.idx2update)], 0);

        fill(&mut dump, 4, 5, 6);
        assert_eq!(dump.get_data().voltage, 6);
    }

    #[test]
    fn optional_fields_can_be_skipped() {
        const SPEED_ONLY: u32 = DataInputsBit::SPEED as u32;
        let mut dump: InputsDump<SPEED_ONLY> = InputsDump::new();
        dump.set_speed(42);
        assert!(dump.is_updated());
        assert_eq!(dump.get_data().speed, 42);
    }
}
