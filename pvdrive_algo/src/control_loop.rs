// Fixed-rate control cycle: sense -> compute -> actuate -> telemetry.

// Key Features:
// - Owns the drive controller and the three I/O boundaries, no global state.
// - Sensors are sampled once, at the start of the cycle, and that snapshot is used
//   for the whole update.
// - Telemetry is emitted after sensing and control, so a frame never mixes cycles.
// - Actuator and telemetry failures are logged on their first occurrence and otherwise
//   ignored; they never alter the control computation.

// Licensed under the Apache License, Version 2.0

use crate::boundary::{ActuationCommand, Actuators, NoTelemetry, Sensors, TelemetrySink};
use crate::config::DriveConfig;
use crate::error::ConfigResult;
use crate::DriveController;

/// Periodic control routine. Call [`ControlLoop::run_cycle`] once per sample period.
pub struct ControlLoop<S, A, T = NoTelemetry> {
    sensors: S,
    actuators: A,
    telemetry: T,
    drive: DriveController,

    cycles: u32,
    actuator_failing: bool,
    telemetry_failing: bool,
}

impl<S: Sensors, A: Actuators> ControlLoop<S, A, NoTelemetry> {
    /// Control loop without telemetry.
    pub fn without_telemetry(config: DriveConfig, sensors: S, actuators: A) -> ConfigResult<Self> {
        Self::new(config, sensors, actuators, NoTelemetry)
    }
}

impl<S: Sensors, A: Actuators, T: TelemetrySink> ControlLoop<S, A, T> {
    pub fn new(config: DriveConfig, sensors: S, actuators: A, telemetry: T) -> ConfigResult<Self> {
        Ok(Self {
            sensors,
            actuators,
            telemetry,
            drive: DriveController::new(config)?,
            cycles: 0,
            actuator_failing: false,
            telemetry_failing: false,
        })
    }

    /// Run one complete control cycle.
    ///
    /// # Arguments
    /// * `timestamp_ms` - Cycle timestamp reported in telemetry
    ///
    /// # Returns
    /// The actuation command written this cycle.
    pub fn run_cycle(&mut self, timestamp_ms: u32) -> ActuationCommand {
        let sample = self.sensors.sample();
        let command = self.drive.tick(&sample);

        match self.actuators.write(&command) {
            Ok(()) => self.actuator_failing = false,
            Err(err) => {
                if !self.actuator_failing {
                    error!("LOOP: actuator write failed: {}", err);
                }
                self.actuator_failing = true;
            }
        }

        let frame = self.drive.frame(timestamp_ms);
        match self.telemetry.record(&frame) {
            Ok(()) => self.telemetry_failing = false,
            Err(err) => {
                if !self.telemetry_failing {
                    debug!("LOOP: telemetry dropped: {}", err);
                }
                self.telemetry_failing = true;
            }
        }

        self.cycles = self.cycles.wrapping_add(1);
        command
    }

    /// Completed cycles (wrapping).
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn drive(&self) -> &DriveController {
        &self.drive
    }

    /// Mutable access, e.g. to inject current feedback between cycles.
    pub fn drive_mut(&mut self) -> &mut DriveController {
        &mut self.drive
    }

    pub fn sensors_mut(&mut self) -> &mut S {
        &mut self.sensors
    }

    pub fn actuators(&self) -> &A {
        &self.actuators
    }

    pub fn telemetry(&self) -> &T {
        &self.telemetry
    }
}
