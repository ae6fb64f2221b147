// Closed-loop simulation of the drive control core on the host.
// Runs `ControlLoop` at the configured sample period against a lumped plant model and
// prints telemetry as CSV on stdout (logs go to stderr).

mod plant;
mod telemetry;

use std::io;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use pvdrive_algo::config::{DriveConfig, FeedbackSource, LOOP_FREQUENCY_HZ, SAMPLE_PERIOD_S};
use pvdrive_algo::ControlLoop;

use plant::{Plant, PlantSensors, PwmOutputs};
use telemetry::{format_frame, CsvTelemetry};

#[derive(Parser, Debug)]
#[command(about = "Simulate the PV-fed drive control loop")]
struct Args {
    /// Number of control cycles to run
    #[arg(long, default_value_t = 20_000)]
    cycles: u32,

    /// Print one CSV row every N cycles
    #[arg(long, default_value_t = 100)]
    every: u32,

    /// Frames kept for the end-of-run summary
    #[arg(long, default_value_t = 5)]
    tail: usize,

    /// Override the speed reference [rad/s]
    #[arg(long)]
    speed_ref: Option<i32>,

    /// Feed this current to the inner loop instead of the sensed one
    #[arg(long, allow_hyphen_values = true)]
    injected_current: Option<i32>,

    /// Cycle at which the encoder bus goes down
    #[arg(long)]
    outage_at: Option<u32>,

    /// Length of the encoder bus outage in cycles
    #[arg(long, default_value_t = 0)]
    outage_len: u32,
}

/// Simulated time of `cycle` [ms].
fn timestamp_ms(cycle: u32) -> u32 {
    (u64::from(cycle) * 1000 / u64::from(LOOP_FREQUENCY_HZ)) as u32
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simulator=info,pvdrive_algo=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = DriveConfig::DEFAULT;
    if let Some(speed_ref) = args.speed_ref {
        config.speed_reference = speed_ref;
    }
    if args.injected_current.is_some() {
        config.feedback = FeedbackSource::ExternallyInjected;
    }

    let sink = CsvTelemetry::new(io::stdout().lock(), args.every, args.tail)
        .context("writing CSV header")?;
    let mut control = ControlLoop::new(config, PlantSensors::new(), PwmOutputs::default(), sink)
        .context("invalid drive configuration")?;
    let mut plant = Plant::new(SAMPLE_PERIOD_S, config.storage_nominal_mv as f32 / 1000.0);

    let outage = args
        .outage_at
        .map(|start| start..start.saturating_add(args.outage_len));

    info!(cycles = args.cycles, feedback = config.feedback.name(), "starting simulation");

    for cycle in 0..args.cycles {
        let bus_down = outage.as_ref().is_some_and(|range| range.contains(&cycle));
        control.sensors_mut().update(plant.readings());
        control.sensors_mut().set_bus_down(bus_down);
        if let Some(current) = args.injected_current {
            control.drive_mut().inject_current(current);
        }

        control.run_cycle(timestamp_ms(cycle));

        // The plant reacts to what actually reached the PWM boundary
        if let Some(command) = control.actuators().last() {
            plant.step(&command);
        }
    }

    let drive = control.drive();
    info!(
        status = ?drive.status(),
        speed = plant.readings().speed,
        pv_mv = plant.readings().voltage,
        sc_volts = plant.sc_volts(),
        "simulation finished"
    );
    for frame in control.telemetry().drain_history() {
        info!("tail: {}", format_frame(&frame));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_stay_exact_on_long_runs() {
        assert_eq!(timestamp_ms(0), 0);
        assert_eq!(timestamp_ms(9), 0);
        assert_eq!(timestamp_ms(10), 1);
        // Past f32's 24-bit mantissa
        assert_eq!(timestamp_ms(16_777_217), 1_677_721);
        assert_eq!(timestamp_ms(u32::MAX), 429_496_729);
    }
}
