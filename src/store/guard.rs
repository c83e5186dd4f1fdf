//! Safe-write coordination with the sampling core
//!
//! Storage I/O and real-time audio sampling share the same peripheral
//! bus. The guard pauses the second core's sampling loop for the duration
//! of a storage transaction and restarts it afterwards, but only if it had
//! actually been running.

use log::debug;

/// Control over the audio core's sampling loop.
///
/// Implemented by the audio pipeline facade; the simulation harness
/// provides a scripted version for tests.
pub trait SamplingControl {
    /// True while the sampling loop is active
    fn is_sampling(&self) -> bool;

    /// Stop the sampling loop and wait for it to drain
    fn stop_sampling(&mut self);

    /// Restart the sampling loop with its previous configuration
    fn start_sampling(&mut self);
}

/// Scoped pause of the sampling core.
///
/// Blocking and non-reentrant: nested construction within the same
/// control flow is not supported and must be avoided by callers.
pub struct SafeWriteGuard<'a, S: SamplingControl> {
    sampling: &'a mut S,
    was_running: bool,
}

impl<'a, S: SamplingControl> SafeWriteGuard<'a, S> {
    /// Pause sampling if it is active; the previous state is restored on
    /// drop
    pub fn new(sampling: &'a mut S) -> Self {
        let was_running = sampling.is_sampling();
        if was_running {
            debug!("safe-write: pausing sampling core");
            sampling.stop_sampling();
        }
        Self {
            sampling,
            was_running,
        }
    }
}

impl<S: SamplingControl> Drop for SafeWriteGuard<'_, S> {
    fn drop(&mut self) {
        if self.was_running {
            debug!("safe-write: resuming sampling core");
            self.sampling.start_sampling();
        }
    }
}

/// No-op sampling control for contexts without an active audio pipeline
/// (early boot, host tools)
#[derive(Clone, Copy, Debug, Default)]
pub struct IdleSampling;

impl SamplingControl for IdleSampling {
    fn is_sampling(&self) -> bool {
        false
    }

    fn stop_sampling(&mut self) {}

    fn start_sampling(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        running: bool,
        stops: u32,
        starts: u32,
    }

    impl SamplingControl for Recorder {
        fn is_sampling(&self) -> bool {
            self.running
        }

        fn stop_sampling(&mut self) {
            self.running = false;
            self.stops += 1;
        }

        fn start_sampling(&mut self) {
            self.running = true;
            self.starts += 1;
        }
    }

    #[test]
    fn guard_pauses_and_resumes_active_sampling() {
        let mut ctl = Recorder {
            running: true,
            stops: 0,
            starts: 0,
        };
        {
            let _guard = SafeWriteGuard::new(&mut ctl);
        }
        assert_eq!(ctl.stops, 1);
        assert_eq!(ctl.starts, 1);
        assert!(ctl.running);
    }

    #[test]
    fn guard_leaves_idle_sampling_alone() {
        let mut ctl = Recorder {
            running: false,
            stops: 0,
            starts: 0,
        };
        {
            let _guard = SafeWriteGuard::new(&mut ctl);
        }
        assert_eq!(ctl.stops, 0);
        assert_eq!(ctl.starts, 0);
    }
}
