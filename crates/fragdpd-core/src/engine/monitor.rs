use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Phases of the simulation state machine, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationPhase {
    PreProcessing,
    Minimization,
    TimeStepIntegration,
    PostProcessing,
}

impl fmt::Display for SimulationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PreProcessing => "Pre-processing",
            Self::Minimization => "Minimization",
            Self::TimeStepIntegration => "Time-step integration",
            Self::PostProcessing => "Post-processing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub enum Progress {
    PhaseStart { phase: SimulationPhase },
    PhaseFinish { phase: SimulationPhase },

    TaskStart { total_steps: u64 },
    TaskIncrement,
    TaskFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Forwards progress events to an optional callback.
///
/// With no callback installed, reporting is a no-op; the engine never builds
/// an event string eagerly for a reporter that is not listening.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    #[inline]
    pub fn is_listening(&self) -> bool {
        self.callback.is_some()
    }
}

/// Cooperative cancellation token.
///
/// The integrator polls the flag once per minimization or time step and, when
/// set, terminates the run cleanly: pending output is flushed and the worker
/// pool is released before the workflow returns.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn reporter_without_callback_is_silent() {
        let reporter = ProgressReporter::new();
        assert!(!reporter.is_listening());
        reporter.report(Progress::TaskIncrement);
    }

    #[test]
    fn reporter_forwards_events_in_order() {
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            events.lock().unwrap().push(format!("{event:?}"));
        }));

        reporter.report(Progress::PhaseStart {
            phase: SimulationPhase::Minimization,
        });
        reporter.report(Progress::TaskStart { total_steps: 3 });
        reporter.report(Progress::TaskIncrement);

        let recorded = events.lock().unwrap();
        assert_eq!(recorded.len(), 3);
        assert!(recorded[0].contains("Minimization"));
        assert!(recorded[1].contains("total_steps: 3"));
    }

    #[test]
    fn stop_signal_is_shared_between_clones() {
        let signal = StopSignal::new();
        let clone = signal.clone();
        assert!(!signal.is_stop_requested());
        clone.request_stop();
        assert!(signal.is_stop_requested());
    }
}
