pub mod cuk_duty;

pub use cuk_duty::{compute_duty, DUTY_NEUTRAL};
