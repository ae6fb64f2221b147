//! Feedback captured at the start of each control cycle.
//!
//! [`SensorSample`] is what the sensor boundary hands over: one result per channel.
//! [`HeldReading`] turns those results into the values the control law consumes,
//! holding the last good value across failed reads. [`InputsDump`] is the
//! interrupt-side capture buffer for platforms where feedback arrives asynchronously.
//! [`read_speed`] fetches the encoder speed over the inter-chip bus.

pub mod encoder_bus;
pub mod held_reading;
pub mod inputs_dump;

pub use encoder_bus::{read_speed, EncoderBus};
pub use held_reading::HeldReading;
pub use inputs_dump::{DataInputsBit, InputsDump};

use crate::error::BoundaryError;

/// Result of reading one feedback channel.
pub type Reading = Result<i32, BoundaryError>;

/// Feedback values in device-native units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DataInputs {
    /// Motor current.
    pub current: i32,

    /// Encoder speed, fetched over the inter-chip bus.
    pub speed: i32,

    /// PV source voltage [mV].
    pub voltage: i32,
}

impl DataInputs {
    pub const ZERO: DataInputs = DataInputs {
        current: 0,
        speed: 0,
        voltage: 0,
    };
}

/// Feedback channels of the drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    Current,
    Speed,
    Voltage,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Current, Channel::Speed, Channel::Voltage];

    pub const fn name(self) -> &'static str {
        match self {
            Channel::Current => "current",
            Channel::Speed => "speed",
            Channel::Voltage => "voltage",
        }
    }

    /// Bit used in stale-flag masks.
    pub const fn mask(self) -> u8 {
        match self {
            Channel::Current => 1 << 0,
            Channel::Speed => 1 << 1,
            Channel::Voltage => 1 << 2,
        }
    }
}

/// One poll of the sensor boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SensorSample {
    pub current: Reading,
    pub speed: Reading,
    pub voltage: Reading,
}

impl SensorSample {
    /// Every channel read successfully.
    pub const fn fresh(data: DataInputs) -> Self {
        Self {
            current: Ok(data.current),
            speed: Ok(data.speed),
            voltage: Ok(data.voltage),
        }
    }

    /// Every channel failed with the same error.
    pub const fn unavailable(err: BoundaryError) -> Self {
        Self {
            current: Err(err),
            speed: Err(err),
            voltage: Err(err),
        }
    }
}
