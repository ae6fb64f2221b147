// Speed feedback fetched from the encoder board over the inter-chip bus.
// The encoder answers a request on `ENCODER_BUS_ADDRESS` with one little-endian
// `i32` of `ENCODER_BUS_WIDTH` bytes. Fewer bytes than that is a failed read.

// Licensed under the Apache License, Version 2.0

use super::Reading;
use crate::config::{ENCODER_BUS_ADDRESS, ENCODER_BUS_WIDTH};
use crate::error::BoundaryError;

/// Master side of the inter-chip bus.
pub trait EncoderBus {
    /// Request `buf.len()` bytes from the slave at `address`.
    ///
    /// # Returns
    /// Number of bytes actually received into `buf`.
    fn request(&mut self, address: u8, buf: &mut [u8]) -> Result<usize, BoundaryError>;
}

/// Fetch one speed value from the encoder board.
pub fn read_speed<B: EncoderBus>(bus: &mut B) -> Reading {
    let mut buf = [0u8; ENCODER_BUS_WIDTH as usize];
    let received = bus.request(ENCODER_BUS_ADDRESS, &mut buf)?;
    if received < buf.len() {
        return Err(BoundaryError::ShortRead {
            expected: ENCODER_BUS_WIDTH,
            actual: received as u8,
        });
    }
    Ok(i32::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Slave that answers with a fixed payload, possibly truncated.
    struct FakeBus {
        payload: [u8; 4],
        deliver: usize,
        addressed: Option<u8>,
    }

    impl EncoderBus for FakeBus {
        fn request(&mut self, address: u8, buf: &mut [u8]) -> Result<usize, BoundaryError> {
            self.addressed = Some(address);
            let n = self.deliver.min(buf.len());
            buf[..n].copy_from_slice(&self.payload[..n]);
            Ok(n)
        }
    }

    fn bus(value: i32, deliver: usize) -> FakeBus {
        FakeBus {
            payload: value.to_le_bytes(),
            deliver,
            addressed: None,
        }
    }

    #[test]
    fn decodes_full_transfer() {
        let mut bus = bus(-1234, 4);
        assert_eq!(read_speed(&mut bus), Ok(-1234));
        assert_eq!(bus.addressed, Some(ENCODER_BUS_ADDRESS));
    }

    #[test]
    fn truncated_transfer_is_short_read() {
        let mut bus = bus(300, 2);
        assert_eq!(
            read_speed(&mut bus),
            Err(BoundaryError::ShortRead {
                expected: ENCODER_BUS_WIDTH,
                actual: 2
            })
        );
    }

    #[test]
    fn bus_error_passes_through() {
        struct DeadBus;
        impl EncoderBus for DeadBus {
            fn request(&mut self, _: u8, _: &mut [u8]) -> Result<usize, BoundaryError> {
                Err(BoundaryError::Timeout)
            }
        }
        assert_eq!(read_speed(&mut DeadBus), Err(BoundaryError::Timeout));
    }
}
