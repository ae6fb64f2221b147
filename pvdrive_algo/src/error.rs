//! Error types of the control core.
//!
//! Only construction can fail. Per-cycle work never returns an error: boundary
//! failures are absorbed by the stale-value hold in [`crate::inputs`].

// Licensed under the Apache License, Version 2.0

use thiserror::Error;

/// Result type for configuration checks.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Rejected tuning or limits, reported once at startup.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// Sample period must be strictly positive and finite.
    #[error("sample period must be > 0 s, got {0}")]
    SamplePeriod(f32),

    /// Integral time constant must be strictly positive and finite.
    #[error("integral time constant must be > 0 s, got {0}")]
    TimeConstant(f32),

    /// Proportional gain must be finite.
    #[error("gain must be finite, got {0}")]
    Gain(f32),

    /// Saturation bounds are inverted.
    #[error("output bounds inverted: min {min} > max {max}")]
    OutputBounds { min: i8, max: i8 },

    /// Converter duty limits must satisfy 0 <= min <= max <= 1.
    #[error("duty limits must satisfy 0 <= min <= max <= 1, got [{min}, {max}]")]
    DutyLimits { min: f32, max: f32 },

    /// Nominal storage voltage must be positive.
    #[error("nominal storage voltage must be > 0 mV, got {0}")]
    NominalVoltage(i32),
}

/// Failure reported by an I/O boundary (sensor, bus, actuator, telemetry sink).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BoundaryError {
    /// The device did not answer.
    #[error("device unavailable")]
    Unavailable,

    /// The device answered too late for this cycle.
    #[error("read timed out")]
    Timeout,

    /// The bus transfer returned fewer bytes than requested.
    #[error("short bus read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: u8, actual: u8 },

    /// No complete snapshot has been captured since the previous read.
    #[error("no new snapshot since last read")]
    NotUpdated,

    /// Actuator or telemetry sink refused the write.
    #[error("write rejected")]
    WriteRejected,
}
