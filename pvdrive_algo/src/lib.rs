// Control core of a DC drive fed from a PV simulator and buffered by a supercapacitor.
// A speed PI loop feeds a current PI loop that drives the motor bridge, and a separate
// duty law balances power between the PV source and the supercapacitor through a
// Cuk converter.

// Licensed under the Apache License, Version 2.0

#![cfg_attr(not(feature = "std"), no_std)]

// Must stay first so the logging macros are visible to every module below.
mod fmt;

pub mod boundary;
pub mod cascade;
pub mod config;
pub mod control_loop;
pub mod error;
pub mod inputs;
pub mod math_float;
pub mod power_balance;

use boundary::{ActuationCommand, TelemetryFrame};
use cascade::CascadeController;
use config::{DriveConfig, FeedbackSource, LOOP_FREQUENCY_HZ};
use error::ConfigResult;
use inputs::{Channel, HeldReading, SensorSample};
use power_balance::{compute_duty, DUTY_NEUTRAL};

pub use control_loop::ControlLoop;

/// Operating state of the drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriveStatus {
    /// All consumed channels are fresh or within their stale-hold allowance.
    Running,
    /// A channel was never read or stayed stale for longer than allowed (first lost
    /// channel reported).
    Fault(Channel),
}

/// Owns the controllers and the held feedback, and turns one sensor sample into one
/// actuation command.
pub struct DriveController {
    config: DriveConfig,
    cascade: CascadeController,

    current: HeldReading,
    speed: HeldReading,
    voltage: HeldReading,
    injected_current: i32, // Used instead of `current` in ExternallyInjected mode

    faults: u8, // `Channel::mask()` bits of channels past the stale allowance
    command: ActuationCommand,
}

impl DriveController {
    /// Create the drive from a validated configuration.
    ///
    /// # Arguments
    /// * `config` - Tuning, references and limits, usually `DriveConfig::DEFAULT`
    pub fn new(config: DriveConfig) -> ConfigResult<Self> {
        config.validate()?;
        let cascade = CascadeController::new(
            config.speed_pi,
            config.current_pi,
            config.saturation_warn_cycles,
        )?;

        info!(
            "DRIVE: {} Hz loop, {} feedback, speed ref {} rad/s, PV ref {} mV",
            LOOP_FREQUENCY_HZ,
            config.feedback.name(),
            config.speed_reference,
            config.voltage_reference
        );

        let mut drive = Self {
            config,
            cascade,
            current: HeldReading::new(Channel::Current),
            speed: HeldReading::new(Channel::Speed),
            voltage: HeldReading::new(Channel::Voltage),
            injected_current: 0,
            faults: 0,
            command: Self::safe_command(&config),
        };
        // Nothing has been read yet, every consumed channel starts lost
        drive.faults = drive.fault_mask();
        Ok(drive)
    }

    /// Push an externally measured current (used in `ExternallyInjected` mode only).
    pub fn inject_current(&mut self, value: i32) {
        self.injected_current = value;
    }

    /// Main update, called once per control period.
    ///
    /// Order: hold/refresh feedback, update fault state, speed loop, current loop,
    /// converter duty. A lost channel (never read, or stale past its allowance) puts
    /// only the part of the drive that consumes it into its safe state: speed or
    /// current loss zeroes the bridge and freezes both integrators, voltage loss sets
    /// the converter to neutral.
    pub fn tick(&mut self, sample: &SensorSample) -> ActuationCommand {
        let sensed_current = self.current.tick(sample.current);
        let speed = self.speed.tick(sample.speed);
        let voltage = self.voltage.tick(sample.voltage);

        let current = match self.config.feedback {
            FeedbackSource::SensorFed => sensed_current,
            FeedbackSource::ExternallyInjected => self.injected_current,
        };

        self.update_faults();

        let safe = Self::safe_command(&self.config);

        // Cascade is frozen (integrators untouched) while its feedback is lost
        let bridge = if self.faults & (Channel::Current.mask() | Channel::Speed.mask()) == 0 {
            self.cascade
                .tick(
                    self.config.speed_reference as f32,
                    speed as f32,
                    current as f32,
                )
                .bridge()
        } else {
            safe.bridge
        };

        let converter_duty = if self.faults & Channel::Voltage.mask() == 0 {
            let voltage_error = self.config.voltage_reference as f32 - voltage as f32;
            let duty = compute_duty(voltage_error, self.config.storage_nominal_mv as f32);
            self.config.duty_limits.apply(duty)
        } else {
            safe.converter_duty
        };

        self.command = ActuationCommand {
            converter_duty,
            bridge,
        };
        self.command
    }

    /// Bridge off, converter at its neutral duty.
    fn safe_command(config: &DriveConfig) -> ActuationCommand {
        ActuationCommand {
            converter_duty: config.duty_limits.apply(DUTY_NEUTRAL),
            bridge: [0.0, 0.0],
        }
    }

    /// Channels that are lost: never read, or stale past the allowance.
    fn fault_mask(&self) -> u8 {
        let limit = self.config.max_stale_cycles;
        let mut faults = 0;
        for held in [&self.current, &self.speed, &self.voltage] {
            let channel = held.channel();
            if channel == Channel::Current
                && self.config.feedback == FeedbackSource::ExternallyInjected
            {
                continue;
            }
            if !held.has_value() || held.stale_cycles() > limit {
                faults |= channel.mask();
            }
        }
        faults
    }

    /// Recompute the fault mask and log transitions.
    fn update_faults(&mut self) {
        let faults = self.fault_mask();
        for channel in Channel::ALL {
            let was = self.faults & channel.mask() != 0;
            let is = faults & channel.mask() != 0;
            if is && !was {
                warn!("DRIVE: {} feedback lost, entering safe state", channel.name());
            } else if was && !is {
                info!("DRIVE: {} feedback available", channel.name());
            }
        }
        self.faults = faults;
    }

    /// Current operating state.
    pub fn status(&self) -> DriveStatus {
        Channel::ALL
            .into_iter()
            .find(|channel| self.faults & channel.mask() != 0)
            .map_or(DriveStatus::Running, DriveStatus::Fault)
    }

    /// `Channel::mask()` bits of channels currently holding a stale value.
    pub fn stale_mask(&self) -> u8 {
        [&self.current, &self.speed, &self.voltage]
            .into_iter()
            .filter(|held| held.is_stale())
            .fold(0, |mask, held| mask | held.channel().mask())
    }

    /// Current feedback the inner loop consumed on the latest tick.
    pub fn current_feedback(&self) -> i32 {
        match self.config.feedback {
            FeedbackSource::SensorFed => self.current.value(),
            FeedbackSource::ExternallyInjected => self.injected_current,
        }
    }

    /// Telemetry for the latest tick.
    pub fn frame(&self, timestamp_ms: u32) -> TelemetryFrame {
        let step = self.cascade.last();
        let (speed_sat, current_sat) = self.cascade.saturation_cycles();
        TelemetryFrame {
            timestamp_ms,
            pv_voltage: self.voltage.value(),
            speed_reference: self.config.speed_reference,
            speed: self.speed.value(),
            current_reference: self.config.current_reference,
            current: self.current_feedback(),
            current_output: step.current_output,
            speed_output: step.speed_output,
            converter_duty: self.command.converter_duty,
            status: self.status(),
            stale: self.stale_mask(),
            speed_saturated_cycles: speed_sat,
            current_saturated_cycles: current_sat,
        }
    }

    /// Latest actuation command.
    #[inline(always)]
    pub fn command(&self) -> ActuationCommand {
        self.command
    }

    pub fn cascade(&self) -> &CascadeController {
        &self.cascade
    }
}
