// Power-balance duty law for the bidirectional Cuk converter between the PV source
// and the supercapacitor bank.

// Detailed Operation:
// The ideal Cuk conversion ratio is M = D / (1 - D). Around the neutral point D = 0.5
// (M = 1, no net transfer) its slope is dM/dD = 1 / (1 - D)^2 = 4, so a relative
// voltage deficit e / V maps to a duty offset of e / (4 * V). A sagging source
// (positive error) raises the duty and pushes stored energy towards the source; a
// surplus lowers it and charges the bank. The law is linear in the error, so +e and
// -e land symmetrically around the midpoint.
//
// The result is advisory: it is not clamped here. The caller limits it to an
// actuation-safe range (see `DutyLimits`) before it reaches the PWM boundary.

// Licensed under the Apache License, Version 2.0

/// Duty at which the converter moves no net energy.
pub const DUTY_NEUTRAL: f32 = 0.5;

/// Small-signal slope of the Cuk conversion ratio at the neutral duty.
const RATIO_SLOPE: f32 = 4.0;

/// Compute the converter duty from a voltage-balance error.
///
/// # Arguments
/// * `voltage_error` - Desired minus measured source voltage [mV]
/// * `nominal_voltage` - Nominal storage voltage [mV]
///
/// # Returns
/// Unclamped duty, `DUTY_NEUTRAL` for zero error. A non-positive or non-finite
/// nominal voltage (empty or unknown storage) yields `DUTY_NEUTRAL`.
#[inline]
pub fn compute_duty(voltage_error: f32, nominal_voltage: f32) -> f32 {
    if !(nominal_voltage.is_finite() && nominal_voltage > 0.0) {
        return DUTY_NEUTRAL;
    }
    DUTY_NEUTRAL + voltage_error / (RATIO_SLOPE * nominal_voltage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn zero_error_is_neutral() {
        for v in [1.0, 2500.0, 1e6] {
            assert_eq!(compute_duty(0.0, v), DUTY_NEUTRAL);
        }
    }

    #[test]
    fn sagging_source_raises_duty() {
        // 5000 mV target, 4000 mV measured, 2500 mV bank -> 0.5 + 1000 / 10000
        assert_relative_eq!(compute_duty(1000.0, 2500.0), 0.6);
        assert_relative_eq!(compute_duty(-1000.0, 2500.0), 0.4);
    }

    #[test]
    fn larger_bank_softens_response() {
        let small = compute_duty(500.0, 1000.0);
        let large = compute_duty(500.0, 4000.0);
        assert!(small > large);
        assert!(large > DUTY_NEUTRAL);
    }

    #[test]
    fn degenerate_nominal_is_neutral() {
        assert_eq!(compute_duty(1234.0, 0.0), DUTY_NEUTRAL);
        assert_eq!(compute_duty(1234.0, -10.0), DUTY_NEUTRAL);
        assert_eq!(compute_duty(1234.0, f32::NAN), DUTY_NEUTRAL);
    }

    proptest! {
        #[test]
        fn reflects_around_midpoint(e in -1e5f32..1e5, v in 1.0f32..1e5) {
            let up = compute_duty(e, v) - DUTY_NEUTRAL;
            let down = compute_duty(-e, v) - DUTY_NEUTRAL;
            prop_assert!((up + down).abs() <= 1e-6 + 1e-6 * up.abs());
        }

        #[test]
        fn monotonic_and_finite(a in -1e5f32..1e5, b in -1e5f32..1e5, v in 1.0f32..1e5) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let d_lo = compute_duty(lo, v);
            let d_hi = compute_duty(hi, v);
            prop_assert!(d_lo.is_finite() && d_hi.is_finite());
            prop_assert!(d_lo <= d_hi);
        }
    }
}
