//! The sampling loop: one run of the experiment from the start command to its end.
//!
//! Every sampling period the loop reads the encoder, applies the (constant) actuator command and
//! sends one telemetry line. There is no feedback from the angle to the actuator.

use el_messages::{
    Command, END_MARKER, EncoderScale, IDLE_DUTY_PERCENT, RUN_DUTY_PERCENT, Sample, SampleClock,
    Session, SessionConfig, Step, StopReason,
};
use embassy_sync::{blocking_mutex::raw::NoopRawMutex, channel::Receiver};
use embassy_time::{Duration, Instant, Ticker};
use esp_hal::{Async, uart::UartTx};
use log::info;

use crate::{
    gpio::{encoder::QuadratureEncoder, pwm::Actuator},
    uart::{COMMAND_CAPACITY, error::SerialError, send_line},
};

/// The hardware a run needs.
pub struct Rig {
    pub encoder: QuadratureEncoder,
    pub actuator: Actuator,
    pub tx: UartTx<'static, Async>,
    pub scale: EncoderScale,
}

/// How a run ended.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub reason: StopReason,
    /// Telemetry lines sent.
    pub samples: u32,
}

/// Waits for [`Command::Start`], then samples every [`SessionConfig::sample_period_ms`] until the
/// host sends [`Command::Stop`] or [`SessionConfig::max_samples`] is reached.
///
/// The actuator is returned to [`IDLE_DUTY_PERCENT`] whenever the run ends, even on error.
///
/// # Errors
/// Returns an error if a telemetry line cannot be formatted or sent. The run is abandoned.
pub async fn run_session(
    rig: &mut Rig,
    from_receiver: &Receiver<'static, NoopRawMutex, Command, COMMAND_CAPACITY>,
    config: SessionConfig,
) -> Result<RunSummary, SerialError> {
    let mut session = Session::new(config);
    info!("Waiting for the start command");
    while !session.is_running() {
        session.handle(from_receiver.receive().await);
    }
    info!("Run started");

    rig.actuator.set_duty(IDLE_DUTY_PERCENT);
    rig.encoder.clear();
    rig.encoder.start();

    let result = stream_samples(rig, from_receiver, &mut session).await;

    rig.actuator.set_duty(IDLE_DUTY_PERCENT);
    rig.encoder.pause();

    let summary = result?;
    send_line(&mut rig.tx, END_MARKER).await?;
    send_line(&mut rig.tx, "\n").await?;
    Ok(summary)
}

async fn stream_samples(
    rig: &mut Rig,
    from_receiver: &Receiver<'static, NoopRawMutex, Command, COMMAND_CAPACITY>,
    session: &mut Session,
) -> Result<RunSummary, SerialError> {
    let config = *session.config();
    let clock = SampleClock::start(Instant::now().as_micros());
    let mut ticker = Ticker::every(Duration::from_millis(u64::from(config.sample_period_ms)));
    let mut samples = 0;

    let reason = loop {
        let time_ms = clock.elapsed_ms(Instant::now().as_micros());
        let stop_requested = from_receiver
            .try_receive()
            .is_ok_and(|command| command == Command::Stop);
        match session.tick(stop_requested) {
            Step::Sample { .. } => {
                let angle_deg = rig.scale.angle_degrees(rig.encoder.count());
                rig.actuator.set_duty(RUN_DUTY_PERCENT);
                let sample = Sample {
                    angle_deg,
                    duty_percent: rig.actuator.duty_percent(),
                    time_ms,
                };
                let line = sample.to_line()?;
                send_line(&mut rig.tx, &line).await?;
                samples += 1;
            }
            Step::Finish(reason) => break reason,
            // The session was stopped from outside the loop.
            Step::Idle => break StopReason::HostRequest,
        }
        // A late period is followed by catch-up ticks, keeping the average rate at 1/Ts.
        ticker.next().await;
    };

    Ok(RunSummary { reason, samples })
}
