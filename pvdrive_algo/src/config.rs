// Compile-time configuration of the drive: loop rate, PI tuning, references,
// converter limits and fault-handling thresholds.

// Key Features:
// - All values are `const` and resolved at build time, nothing is reconfigured at runtime.
// - `DriveConfig::DEFAULT` carries the bench setup (PV simulator + supercapacitor + DC motor).
// - `DriveConfig::validate()` checks every constraint once, before the loop starts.

// Licensed under the Apache License, Version 2.0

use crate::error::{ConfigError, ConfigResult};

/// Control loop rate [Hz]
pub const LOOP_FREQUENCY_HZ: u32 = 10_000;

/// Control loop sample period [s]
pub const SAMPLE_PERIOD_S: f32 = 1.0 / LOOP_FREQUENCY_HZ as f32;

/// Encoder slave address on the inter-chip bus
pub const ENCODER_BUS_ADDRESS: u8 = 8;

/// Width of one speed value on the inter-chip bus [bytes]
pub const ENCODER_BUS_WIDTH: u8 = 4;

/// Where the current feedback of the inner loop comes from.
///
/// Resolved once at startup from [`DriveConfig::feedback`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FeedbackSource {
    /// Current, speed and voltage all come from the sensor boundary.
    SensorFed,
    /// Current feedback is pushed in from outside (e.g. a host over UART),
    /// speed and voltage are still sensed.
    ExternallyInjected,
}

impl FeedbackSource {
    pub const fn name(self) -> &'static str {
        match self {
            FeedbackSource::SensorFed => "sensor-fed",
            FeedbackSource::ExternallyInjected => "externally-injected",
        }
    }
}

/// Tuning of one PI loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PiParams {
    /// Proportional gain
    pub gain: f32,
    /// Integral time constant [s]
    pub time_constant: f32,
    /// Sample period [s]
    pub sample_period: f32,
    /// Upper saturation bound
    pub output_max: i8,
    /// Lower saturation bound
    pub output_min: i8,
}

impl PiParams {
    pub const fn new(
        gain: f32,
        time_constant: f32,
        sample_period: f32,
        output_max: i8,
        output_min: i8,
    ) -> Self {
        Self {
            gain,
            time_constant,
            sample_period,
            output_max,
            output_min,
        }
    }

    /// Checks the constraints the PI update law relies on.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.sample_period.is_finite() && self.sample_period > 0.0) {
            return Err(ConfigError::SamplePeriod(self.sample_period));
        }
        if !(self.time_constant.is_finite() && self.time_constant > 0.0) {
            return Err(ConfigError::TimeConstant(self.time_constant));
        }
        if !self.gain.is_finite() {
            return Err(ConfigError::Gain(self.gain));
        }
        if self.output_min > self.output_max {
            return Err(ConfigError::OutputBounds {
                min: self.output_min,
                max: self.output_max,
            });
        }
        Ok(())
    }
}

/// Actuation-safe range of the converter duty (0.0..1.0 of a switching period).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DutyLimits {
    pub min: f32,
    pub max: f32,
}

impl DutyLimits {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let ok = self.min.is_finite()
            && self.max.is_finite()
            && 0.0 <= self.min
            && self.min <= self.max
            && self.max <= 1.0;
        if ok {
            Ok(())
        } else {
            Err(ConfigError::DutyLimits {
                min: self.min,
                max: self.max,
            })
        }
    }

    /// Clamp an advisory duty from the power-balance law into the safe range.
    #[inline(always)]
    pub fn apply(&self, duty: f32) -> f32 {
        duty.clamp(self.min, self.max)
    }
}

/// Complete drive configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DriveConfig {
    /// Outer (speed) loop tuning
    pub speed_pi: PiParams,
    /// Inner (current) loop tuning
    pub current_pi: PiParams,

    /// Speed reference [rad/s]
    pub speed_reference: i32,
    /// Current reference [A], only reported in telemetry; the inner loop follows the speed loop output
    pub current_reference: i32,
    /// PV source voltage target [mV]
    pub voltage_reference: i32,
    /// Nominal supercapacitor voltage [mV]
    pub storage_nominal_mv: i32,

    /// Clamp applied to the converter duty before it reaches the PWM boundary
    pub duty_limits: DutyLimits,

    /// Consecutive stale cycles tolerated on a channel before the drive faults
    pub max_stale_cycles: u16,
    /// Consecutive saturated cycles after which a loop is reported as pinned
    pub saturation_warn_cycles: u32,

    /// Current feedback source
    pub feedback: FeedbackSource,
}

impl DriveConfig {
    /// Bench configuration.
    pub const DEFAULT: DriveConfig = DriveConfig {
        speed_pi: PiParams::new(2.8e-5, 1.5e-3, SAMPLE_PERIOD_S, 126, -126),
        current_pi: PiParams::new(3.2593, 4.6136, SAMPLE_PERIOD_S, 1, -1),

        speed_reference: 300,
        current_reference: 105,
        voltage_reference: 5000,
        storage_nominal_mv: 2500,

        duty_limits: DutyLimits::new(0.1, 0.9),

        max_stale_cycles: 3,
        saturation_warn_cycles: LOOP_FREQUENCY_HZ, // one second pinned

        feedback: FeedbackSource::SensorFed,
    };

    /// Check every constraint of the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.speed_pi.validate()?;
        self.current_pi.validate()?;
        self.duty_limits.validate()?;
        if self.storage_nominal_mv <= 0 {
            return Err(ConfigError::NominalVoltage(self.storage_nominal_mv));
        }
        Ok(())
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
