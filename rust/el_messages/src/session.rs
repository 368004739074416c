//! Lifecycle of one experiment run and its fixed-period schedule.
//!
//! A run starts when the host sends [`Command::Start`] and ends either when the host sends
//! [`Command::Stop`] or after [`SessionConfig::max_samples`] samples. Each period the MCU calls
//! [`Session::tick`] once and only samples when it returns [`Step::Sample`].

use crate::command::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Sampling period Ts in milliseconds.
    pub sample_period_ms: u32,
    /// A run ends on its own after this many samples.
    pub max_samples: u32,
}

impl Default for SessionConfig {
    /// 1 ms sampling for 200 seconds.
    fn default() -> Self {
        Self {
            sample_period_ms: 1,
            max_samples: 200_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The host sent [`Command::Stop`].
    HostRequest,
    /// The run reached [`SessionConfig::max_samples`].
    SampleLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for [`Command::Start`].
    Idle,
    Running { samples: u32 },
    Finished(StopReason),
}

/// What the MCU must do in the current period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// No run in progress.
    Idle,
    /// Take and send sample number `index` (starting at 0).
    Sample { index: u32 },
    /// The run has just ended. No sample is taken in this period.
    Finish(StopReason),
}

#[derive(Debug, Clone)]
pub struct Session {
    config: SessionConfig,
    phase: Phase,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
        }
    }

    #[inline]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running { .. })
    }

    /// Applies a host command. Returns true if the phase changed.
    ///
    /// `Start` is only accepted when no run is in progress, and `Stop` only while one is.
    pub fn handle(&mut self, command: Command) -> bool {
        match (self.phase, command) {
            (Phase::Idle | Phase::Finished(_), Command::Start) => {
                self.phase = Phase::Running { samples: 0 };
                true
            }
            (Phase::Running { .. }, Command::Stop) => {
                self.phase = Phase::Finished(StopReason::HostRequest);
                true
            }
            _ => false,
        }
    }

    /// Advances the run by one period.
    ///
    /// The sample limit is checked before the stop request, and both before a sample is taken, so
    /// a run produces at most [`SessionConfig::max_samples`] samples.
    pub fn tick(&mut self, stop_requested: bool) -> Step {
        let Phase::Running { samples } = self.phase else {
            return Step::Idle;
        };
        if samples >= self.config.max_samples {
            self.phase = Phase::Finished(StopReason::SampleLimit);
            return Step::Finish(StopReason::SampleLimit);
        }
        if stop_requested {
            self.phase = Phase::Finished(StopReason::HostRequest);
            return Step::Finish(StopReason::HostRequest);
        }
        self.phase = Phase::Running {
            samples: samples + 1,
        };
        Step::Sample { index: samples }
    }
}

/// Timestamps relative to the start of a run.
///
/// Instants are given in microseconds of a monotonic clock, as returned by the MCU's timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleClock {
    start_us: u64,
}

impl SampleClock {
    pub fn start(start_us: u64) -> Self {
        Self { start_us }
    }

    /// Whole milliseconds between the start of the run and `now_us`.
    ///
    /// Instants before the start read as 0. Saturates at [`u32::MAX`].
    pub fn elapsed_ms(&self, now_us: u64) -> u32 {
        let elapsed_ms = now_us.saturating_sub(self.start_us) / 1000;
        u32::try_from(elapsed_ms).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn run_until_finish(session: &mut Session, stop_at: Option<u32>) -> (u32, StopReason) {
        let mut sent = 0;
        loop {
            let stop_requested = stop_at.is_some_and(|at| sent == at);
            match session.tick(stop_requested) {
                Step::Sample { index } => {
                    assert_eq!(index, sent);
                    sent += 1;
                }
                Step::Finish(reason) => return (sent, reason),
                Step::Idle => panic!("Session went idle while running"),
            }
        }
    }

    #[test]
    fn test_waits_for_start() {
        let mut session = Session::new(SessionConfig::default());
        assert_eq!(session.tick(false), Step::Idle);
        assert!(!session.handle(Command::Stop));
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.handle(Command::Start));
        assert!(session.is_running());
        // A second start does not restart the run.
        assert!(!session.handle(Command::Start));
    }

    #[test]
    fn test_sample_limit() {
        let mut session = Session::new(SessionConfig {
            sample_period_ms: 1,
            max_samples: 5,
        });
        session.handle(Command::Start);
        assert_eq!(run_until_finish(&mut session, None), (5, StopReason::SampleLimit));
        assert_eq!(session.phase(), Phase::Finished(StopReason::SampleLimit));
        assert_eq!(session.tick(false), Step::Idle);
    }

    #[test]
    fn test_stop_request() {
        let mut session = Session::new(SessionConfig::default());
        session.handle(Command::Start);
        assert_eq!(
            run_until_finish(&mut session, Some(3)),
            (3, StopReason::HostRequest)
        );
    }

    /// The limit wins when it coincides with a stop request.
    #[test]
    fn test_limit_checked_before_stop() {
        let mut session = Session::new(SessionConfig {
            sample_period_ms: 1,
            max_samples: 2,
        });
        session.handle(Command::Start);
        assert_eq!(
            run_until_finish(&mut session, Some(2)),
            (2, StopReason::SampleLimit)
        );
    }

    #[test]
    fn test_stop_command_and_restart() {
        let mut session = Session::new(SessionConfig::default());
        session.handle(Command::Start);
        session.tick(false);
        assert_eq!(session.phase(), Phase::Running { samples: 1 });
        assert!(session.handle(Command::Stop));
        assert_eq!(session.phase(), Phase::Finished(StopReason::HostRequest));
        assert!(session.handle(Command::Start));
        assert_eq!(session.phase(), Phase::Running { samples: 0 });
    }

    #[test]
    fn test_clock() {
        let clock = SampleClock::start(5_000_000);
        assert_eq!(clock.elapsed_ms(4_000_000), 0);
        assert_eq!(clock.elapsed_ms(5_000_999), 0);
        assert_eq!(clock.elapsed_ms(5_001_000), 1);
        assert_eq!(clock.elapsed_ms(205_000_000), 200_000);
        assert_eq!(clock.elapsed_ms(u64::MAX), u32::MAX);
    }
}
