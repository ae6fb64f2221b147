//! I/O boundaries of the control core.
//!
//! Peripheral drivers (ADC, inter-chip bus, PWM timers, UART) live outside this crate
//! and plug in through these traits. All calls are synchronous and must return within
//! the sample period.

// Licensed under the Apache License, Version 2.0

use crate::error::BoundaryError;
use crate::inputs::SensorSample;
use crate::DriveStatus;

/// Feedback source polled once at the start of every cycle.
pub trait Sensors {
    /// Capture current, speed and voltage. Channels that cannot be read report an error.
    fn sample(&mut self) -> SensorSample;
}

/// Values handed to the PWM boundary each cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActuationCommand {
    /// Converter duty, already clamped to the configured safe range (0.0..1.0).
    pub converter_duty: f32,

    /// Complementary drive bridge commands, `[u, -u]`.
    pub bridge: [f32; 2],
}

/// Sink of the three actuation values.
pub trait Actuators {
    fn write(&mut self, command: &ActuationCommand) -> Result<(), BoundaryError>;
}

/// Everything worth logging about one cycle. Values belong to the same cycle:
/// the frame is built after sensing and after the control update.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetryFrame {
    pub timestamp_ms: u32,
    pub pv_voltage: i32,
    pub speed_reference: i32,
    pub speed: i32,
    pub current_reference: i32,
    pub current: i32,
    pub current_output: f32,

    pub speed_output: f32,
    pub converter_duty: f32,
    pub status: DriveStatus,
    /// `Channel::mask()` bits of channels holding a stale value
    pub stale: u8,
    pub speed_saturated_cycles: u32,
    pub current_saturated_cycles: u32,
}

/// External logger of telemetry frames. Failures never influence control.
pub trait TelemetrySink {
    fn record(&mut self, frame: &TelemetryFrame) -> Result<(), BoundaryError>;
}

/// Telemetry disabled: frames are dropped at compile time.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTelemetry;

impl TelemetrySink for NoTelemetry {
    #[inline(always)]
    fn record(&mut self, _frame: &TelemetryFrame) -> Result<(), BoundaryError> {
        Ok(())
    }
}
