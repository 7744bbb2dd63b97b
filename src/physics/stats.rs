use std::time::Duration;

/// Counters and timings recorded during the most recent physics tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    /// Number of ticks run so far, starting from 1 for the first tick.
    pub frame: u64,
    pub bodies: usize,
    /// Candidate pairs produced by the broad phase.
    pub pairs: usize,
    /// Contacts that survived solving.
    pub collisions: usize,
    /// Bodies that moved far enough to be swept.
    pub fast_bodies: usize,
    /// Sweeps that hit something.
    pub fast_body_collisions: usize,
    /// Bodies whose broad phase proxy had to be moved.
    pub broadphase_updates: usize,
    /// Bodies whose integration failed and were left where they were.
    pub integrate_failures: usize,
    pub integrate_time: Duration,
    pub broadphase_time: Duration,
    pub narrowphase_time: Duration,
    pub solve_time: Duration,
}

impl FrameStats {
    #[inline]
    pub fn total_time(&self) -> Duration {
        self.integrate_time + self.broadphase_time + self.narrowphase_time + self.solve_time
    }
}
