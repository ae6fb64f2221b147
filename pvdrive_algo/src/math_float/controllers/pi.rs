// Implements a floating-point PI controller with output saturation, used for both the
// speed (outer) and the current (inner) loop of the drive cascade.

// Key Features:
// - Gain, integral time constant and sample period fixed at construction.
// - Forward-Euler integration with the increment pre-scaled by gain * Ts / Ti.
// - Anti-windup by clamping the integrator to the same bounds as the output.
// - Output always inside [output_min, output_max] (signed 8-bit range).

// Licensed under the Apache License, Version 2.0

use crate::config::PiParams;
use crate::error::ConfigResult;

/// Discrete PI controller with clamped output and clamped integrator.
#[derive(Clone, Debug)]
pub struct PiController {
    gain: f32,       // Proportional gain.
    ki_step: f32,    // Integral increment per unit error: gain * Ts / Ti.
    output_max: f32, // Upper saturation bound.
    output_min: f32, // Lower saturation bound.
    integrator: f32, // Accumulated integral term.
    output: f32,     // Last saturated control action.
}

impl PiController {
    /// Creates a controller with zero integrator and zero output.
    pub fn new(params: PiParams) -> ConfigResult<Self> {
        params.validate()?;
        Ok(Self {
            gain: params.gain,
            ki_step: params.gain * params.sample_period / params.time_constant,
            output_max: params.output_max as f32,
            output_min: params.output_min as f32,
            integrator: 0.0,
            output: 0.0,
        })
    }

    /// Advances the controller by one sample with `error = reference - feedback`.
    pub fn tick(&mut self, error: f32) {
        // Proportional term
        let p = self.gain * error;

        // Integrate, then clamp so the integrator never holds more than the output can express
        self.integrator += self.ki_step * error;
        self.integrator = self.integrator.clamp(self.output_min, self.output_max);

        self.output = (p + self.integrator).clamp(self.output_min, self.output_max);
    }

    /// Last saturated control action.
    #[inline(always)]
    pub fn output(&self) -> f32 {
        self.output
    }

    #[inline(always)]
    pub fn integrator(&self) -> f32 {
        self.integrator
    }

    /// True when the output sits on one of its bounds.
    #[inline(always)]
    pub fn is_saturated(&self) -> bool {
        self.output >= self.output_max || self.output <= self.output_min
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn unit(max: i8, min: i8) -> PiController {
        PiController::new(PiParams::new(1.0, 1.0, 1.0, max, min)).unwrap()
    }

    #[test]
    fn starts_at_rest() {
        let pi = unit(10, -10);
        assert_eq!(pi.output(), 0.0);
        assert_eq!(pi.integrator(), 0.0);
    }

    #[test]
    fn zero_error_after_init_gives_zero_output() {
        let mut pi = unit(10, -10);
        pi.tick(0.0);
        assert_eq!(pi.output(), 0.0);
        assert_eq!(pi.integrator(), 0.0);
    }

    #[test]
    fn proportional_and_integral_terms() {
        // gain 2, Ts 0.5, Ti 1 -> ki_step = 1
        let mut pi = PiController::new(PiParams::new(2.0, 1.0, 0.5, 100, -100)).unwrap();
        pi.tick(3.0);
        assert_relative_eq!(pi.integrator(), 3.0);
        assert_relative_eq!(pi.output(), 9.0);
        pi.tick(1.0);
        assert_relative_eq!(pi.integrator(), 4.0);
        assert_relative_eq!(pi.output(), 6.0);
    }

    #[test]
    fn step_saturates_without_windup() {
        let mut pi = unit(10, -10);
        for cycle in 1..=50 {
            pi.tick(100.0);
            assert_eq!(pi.output(), 10.0, "cycle {}", cycle);
            assert!(pi.integrator() <= 10.0);
            assert!(pi.is_saturated());
        }

        // Recovery is immediate once the error reverses, no unwinding of a huge integral
        pi.tick(-15.0);
        assert!(pi.output() < 0.0);
    }

    #[test]
    fn holds_output_at_equilibrium() {
        let mut pi = unit(10, -10);
        pi.tick(2.0);
        pi.tick(1.0);
        let settled = pi.output();
        assert_relative_eq!(settled, 3.0 + 1.0);

        pi.tick(0.0);
        let at_rest = pi.output();
        for _ in 0..100 {
            pi.tick(0.0);
            assert_eq!(pi.output(), at_rest);
        }
    }

    #[test]
    fn negative_saturation() {
        let mut pi = unit(1, -1);
        pi.tick(-42.0);
        assert_eq!(pi.output(), -1.0);
        assert_eq!(pi.integrator(), -1.0);
    }

    #[test]
    fn degenerate_bounds_pin_output() {
        let mut pi = unit(3, 3);
        pi.tick(-100.0);
        assert_eq!(pi.output(), 3.0);
        pi.tick(100.0);
        assert_eq!(pi.output(), 3.0);
    }

    #[test]
    fn rejects_invalid_params() {
        assert!(PiController::new(PiParams::new(1.0, 1.0, -1.0, 1, -1)).is_err());
        assert!(PiController::new(PiParams::new(1.0, 1.0, 1.0, -1, 1)).is_err());
    }

    proptest! {
        #[test]
        fn output_always_within_bounds(
            gain in -50.0f32..50.0,
            time_constant in 1e-4f32..10.0,
            sample_period in 1e-5f32..1.0,
            max in -20i8..=127,
            span in 0i8..=100,
            errors in proptest::collection::vec(-1e4f32..1e4, 1..200),
        ) {
            let min = max.saturating_sub(span);
            let mut pi = PiController::new(
                PiParams::new(gain, time_constant, sample_period, max, min)
            ).unwrap();
            for e in errors {
                pi.tick(e);
                prop_assert!(pi.output() >= min as f32 && pi.output() <= max as f32);
                prop_assert!(pi.integrator() >= min as f32 && pi.integrator() <= max as f32);
            }
        }
    }
}
