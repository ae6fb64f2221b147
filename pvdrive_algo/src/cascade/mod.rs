// Speed -> current cascade built from two independent PI controllers.

// Key Features:
// - Outer loop regulates speed, its saturated output is the current reference of the inner loop.
// - The speed update always completes before the current error is formed.
// - The inner loop output is mapped onto a complementary bridge pair (+u, -u).

// Licensed under the Apache License, Version 2.0

use crate::config::PiParams;
use crate::error::ConfigResult;
use crate::math_float::controllers::{PiController, SaturationMonitor};

/// Errors and outputs computed during one cascade step, kept for telemetry and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CascadeStep {
    pub speed_error: f32,
    pub speed_output: f32,
    pub current_error: f32,
    pub current_output: f32,
}

impl CascadeStep {
    /// Complementary bridge commands: first leg gets the output, second leg its negation.
    #[inline(always)]
    pub fn bridge(&self) -> [f32; 2] {
        [self.current_output, -self.current_output]
    }
}

/// Owns the speed and current controllers and sequences them each cycle.
pub struct CascadeController {
    speed: PiController,
    current: PiController,
    speed_sat: SaturationMonitor,
    current_sat: SaturationMonitor,
    last: CascadeStep,
}

impl CascadeController {
    pub fn new(
        speed: PiParams,
        current: PiParams,
        saturation_warn_cycles: u32,
    ) -> ConfigResult<Self> {
        Ok(Self {
            speed: PiController::new(speed)?,
            current: PiController::new(current)?,
            speed_sat: SaturationMonitor::new("speed", saturation_warn_cycles),
            current_sat: SaturationMonitor::new("current", saturation_warn_cycles),
            last: CascadeStep::default(),
        })
    }

    /// Run one cascade step.
    ///
    /// # Arguments
    /// * `speed_reference` - Requested speed
    /// * `speed_feedback` - Measured speed
    /// * `current_feedback` - Measured (or injected) current
    pub fn tick(
        &mut self,
        speed_reference: f32,
        speed_feedback: f32,
        current_feedback: f32,
    ) -> CascadeStep {
        // Outer loop first: its fresh output is the inner loop reference
        let speed_error = speed_reference - speed_feedback;
        self.speed.tick(speed_error);
        self.speed_sat.tick(&self.speed);

        let current_error = self.speed.output() - current_feedback;
        self.current.tick(current_error);
        self.current_sat.tick(&self.current);

        self.last = CascadeStep {
            speed_error,
            speed_output: self.speed.output(),
            current_error,
            current_output: self.current.output(),
        };
        self.last
    }

    /// Result of the latest step (all zero before the first one).
    #[inline(always)]
    pub fn last(&self) -> CascadeStep {
        self.last
    }

    pub fn speed(&self) -> &PiController {
        &self.speed
    }

    pub fn current(&self) -> &PiController {
        &self.current
    }

    /// Consecutive saturated cycles of (speed, current) loops.
    pub fn saturation_cycles(&self) -> (u32, u32) {
        (self.speed_sat.cycles(), self.current_sat.cycles())
    }
}
