// Lumped model of the bench: PV simulator source, supercapacitor behind a Cuk
// converter, H-bridge and brushed DC motor. Forward-Euler integration at the
// control sample period. Good enough to close the loop, not a design model.

use pvdrive_algo::boundary::{ActuationCommand, Actuators, Sensors};
use pvdrive_algo::config::ENCODER_BUS_ADDRESS;
use pvdrive_algo::error::BoundaryError;
use pvdrive_algo::inputs::{read_speed, DataInputs, EncoderBus, SensorSample};

/// Motor armature resistance [Ohm]
const R_ARM: f32 = 1.2;
/// Motor armature inductance [H]
const L_ARM: f32 = 2.0e-3;
/// Torque / back-EMF constant [N*m/A], [V*s/rad]
const K_MOTOR: f32 = 0.012;
/// Rotor inertia [kg*m^2]
const J_ROTOR: f32 = 5.0e-5;
/// Viscous friction [N*m*s/rad]
const B_FRICTION: f32 = 2.0e-6;

/// PV simulator open-circuit voltage [V]
const V_OPEN: f32 = 6.0;
/// PV simulator source resistance [Ohm]
const R_SOURCE: f32 = 0.8;

/// Supercapacitor bank [F]
const C_BANK: f32 = 10.0;
/// Current the converter moves per unit of duty offset from neutral [A]
const CONVERTER_GAIN: f32 = 4.0;

pub struct Plant {
    dt: f32,
    current: f32,  // Armature current [A]
    speed: f32,    // Rotor speed [rad/s]
    pv_volts: f32, // Source terminal voltage [V]
    sc_volts: f32, // Supercapacitor voltage [V]
}

impl Plant {
    pub fn new(dt: f32, sc_volts: f32) -> Self {
        Self {
            dt,
            current: 0.0,
            speed: 0.0,
            pv_volts: V_OPEN,
            sc_volts,
        }
    }

    /// Advance the model by one sample with the command the drive just issued.
    pub fn step(&mut self, command: &ActuationCommand) {
        let bridge = command.bridge[0].clamp(-1.0, 1.0);
        let v_arm = bridge * self.pv_volts;

        let di = (v_arm - R_ARM * self.current - K_MOTOR * self.speed) / L_ARM;
        let dw = (K_MOTOR * self.current - B_FRICTION * self.speed) / J_ROTOR;
        self.current += di * self.dt;
        self.speed += dw * self.dt;

        // Converter above neutral duty feeds the source node from the bank, below it charges the bank
        let support = if self.sc_volts > 0.0 {
            CONVERTER_GAIN * (command.converter_duty - 0.5)
        } else {
            0.0
        };
        self.sc_volts = (self.sc_volts - support * self.dt / C_BANK).max(0.0);

        let bridge_draw = (self.current * bridge).max(0.0);
        let source_current = (bridge_draw - support).max(0.0);
        self.pv_volts = (V_OPEN - R_SOURCE * source_current).max(0.0);
    }

    /// Readings in the units the drive expects: A, rad/s, mV.
    pub fn readings(&self) -> DataInputs {
        DataInputs {
            current: self.current.round() as i32,
            speed: self.speed.round() as i32,
            voltage: (self.pv_volts * 1000.0).round() as i32,
        }
    }

    pub fn sc_volts(&self) -> f32 {
        self.sc_volts
    }
}

/// Encoder board on the inter-chip bus: answers with the latest plant speed, or with
/// nothing while the bus is down.
struct EncoderBoard {
    speed: i32,
    bus_down: bool,
}

impl EncoderBus for EncoderBoard {
    fn request(&mut self, address: u8, buf: &mut [u8]) -> Result<usize, BoundaryError> {
        if address != ENCODER_BUS_ADDRESS {
            return Err(BoundaryError::Unavailable);
        }
        if self.bus_down {
            return Ok(0);
        }
        let payload = self.speed.to_le_bytes();
        let n = payload.len().min(buf.len());
        buf[..n].copy_from_slice(&payload[..n]);
        Ok(n)
    }
}

/// Sensor boundary fed from the plant. Speed goes through the encoder bus, which
/// can be taken down to script an outage.
pub struct PlantSensors {
    latest: DataInputs,
    encoder: EncoderBoard,
}

impl PlantSensors {
    pub fn new() -> Self {
        Self {
            latest: DataInputs::ZERO,
            encoder: EncoderBoard {
                speed: 0,
                bus_down: false,
            },
        }
    }

    pub fn update(&mut self, readings: DataInputs) {
        self.latest = readings;
        self.encoder.speed = readings.speed;
    }

    pub fn set_bus_down(&mut self, down: bool) {
        self.encoder.bus_down = down;
    }
}

impl Sensors for PlantSensors {
    fn sample(&mut self) -> SensorSample {
        SensorSample {
            speed: read_speed(&mut self.encoder),
            ..SensorSample::fresh(self.latest)
        }
    }
}

/// PWM boundary: checks the command is within the device range and keeps it.
#[derive(Default)]
pub struct PwmOutputs {
    last: Option<ActuationCommand>,
}

impl PwmOutputs {
    pub fn last(&self) -> Option<ActuationCommand> {
        self.last
    }
}

impl Actuators for PwmOutputs {
    fn write(&mut self, command: &ActuationCommand) -> Result<(), BoundaryError> {
        let duty_ok = (0.0..=1.0).contains(&command.converter_duty);
        let bridge_ok = command.bridge.iter().all(|u| u.is_finite());
        if !(duty_ok && bridge_ok) {
            return Err(BoundaryError::WriteRejected);
        }
        self.last = Some(*command);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pvdrive_algo::config::ENCODER_BUS_WIDTH;

    #[test]
    fn speed_arrives_over_encoder_bus() {
        let mut sensors = PlantSensors::new();
        sensors.update(DataInputs {
            current: 2,
            speed: -150,
            voltage: 5400,
        });
        let sample = sensors.sample();
        assert_eq!(sample.speed, Ok(-150));
        assert_eq!(sample.voltage, Ok(5400));
    }

    #[test]
    fn bus_outage_is_short_read_on_speed_only() {
        let mut sensors = PlantSensors::new();
        sensors.update(DataInputs {
            current: 2,
            speed: 200,
            voltage: 5000,
        });
        sensors.set_bus_down(true);
        let sample = sensors.sample();
        assert_eq!(
            sample.speed,
            Err(BoundaryError::ShortRead {
                expected: ENCODER_BUS_WIDTH,
                actual: 0
            })
        );
        assert_eq!(sample.current, Ok(2));

        sensors.set_bus_down(false);
        assert_eq!(sensors.sample().speed, Ok(200));
    }

    #[test]
    fn encoder_ignores_other_addresses() {
        let mut board = EncoderBoard {
            speed: 1,
            bus_down: false,
        };
        let mut buf = [0u8; 4];
        assert_eq!(
            board.request(ENCODER_BUS_ADDRESS + 1, &mut buf),
            Err(BoundaryError::Unavailable)
        );
    }
}
