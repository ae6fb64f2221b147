// CSV telemetry sink plus a bounded history of the most recent frames.

use std::io::Write;

use crossbeam_queue::ArrayQueue;
use pvdrive_algo::boundary::{TelemetryFrame, TelemetrySink};
use pvdrive_algo::error::BoundaryError;
use pvdrive_algo::DriveStatus;

pub const CSV_HEADER: &str = "t_ms,pv_mv,speed_ref,speed,current_ref,current,u_current,u_speed,duty,status,stale,sat_speed,sat_current";

pub struct CsvTelemetry<W: Write> {
    out: W,
    every: u32,
    seen: u32,
    history: ArrayQueue<TelemetryFrame>,
}

impl<W: Write> CsvTelemetry<W> {
    /// Write every `every`-th frame, keep the last `history` frames in memory.
    pub fn new(mut out: W, every: u32, history: usize) -> std::io::Result<Self> {
        writeln!(out, "{}", CSV_HEADER)?;
        Ok(Self {
            out,
            every: every.max(1),
            seen: 0,
            history: ArrayQueue::new(history.max(1)),
        })
    }

    /// Drain the retained frames, oldest first.
    pub fn drain_history(&self) -> Vec<TelemetryFrame> {
        std::iter::from_fn(|| self.history.pop()).collect()
    }
}

fn status_label(status: DriveStatus) -> &'static str {
    match status {
        DriveStatus::Running => "running",
        DriveStatus::Fault(channel) => channel.name(),
    }
}

pub fn format_frame(f: &TelemetryFrame) -> String {
    format!(
        "{},{},{},{},{},{},{:.4},{:.4},{:.4},{},{:#05b},{},{}",
        f.timestamp_ms,
        f.pv_voltage,
        f.speed_reference,
        f.speed,
        f.current_reference,
        f.current,
        f.current_output,
        f.speed_output,
        f.converter_duty,
        status_label(f.status),
        f.stale,
        f.speed_saturated_cycles,
        f.current_saturated_cycles,
    )
}

impl<W: Write> TelemetrySink for CsvTelemetry<W> {
    fn record(&mut self, frame: &TelemetryFrame) -> Result<(), BoundaryError> {
        self.history.force_push(*frame);
        let due = self.seen % self.every == 0;
        self.seen = self.seen.wrapping_add(1);
        if due {
            writeln!(self.out, "{}", format_frame(frame)).map_err(|_| BoundaryError::WriteRejected)?;
        }
        Ok(())
    }
}
