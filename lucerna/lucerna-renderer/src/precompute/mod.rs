//! Probe precompute orchestrator state: the monotonic cursor, the sweep
//! flag set by the manual trigger, and per-layer validity tracking.
//!
//! The GPU sequencing for one probe (cubemap capture -> queue flush ->
//! octahedral projection -> irradiance/distance filtering) lives in
//! `Renderer::run_probe`; this type owns only the state machine so it can
//! be exercised without a device.

/// Where the orchestrator is within a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrecomputeState {
    Idle,
    /// A probe's pipeline is running to completion within the current tick.
    Probe(usize),
}

pub struct ProbePrecompute {
    probe_count: usize,
    cursor: usize,
    state: PrecomputeState,
    sweeping: bool,
    /// Layer `i` holds a complete precompute result. Stale layers stay
    /// readable; this bitmap makes staleness observable instead of silent.
    valid: Vec<bool>,
}

impl ProbePrecompute {
    pub fn new(probe_count: usize) -> Self {
        Self {
            probe_count,
            cursor: 0,
            state: PrecomputeState::Idle,
            sweeping: false,
            valid: vec![false; probe_count],
        }
    }

    /// The manual trigger: start (or continue) a sweep over all probes, one
    /// probe per tick.
    pub fn trigger(&mut self) {
        self.sweeping = true;
    }

    /// Whether the current tick should run one probe's pipeline.
    pub fn wants_step(&self) -> bool {
        self.sweeping
    }

    pub fn state(&self) -> PrecomputeState {
        self.state
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn probe_count(&self) -> usize {
        self.probe_count
    }

    /// Enter `Probe(cursor)` and return the index to precompute.
    pub fn begin_step(&mut self) -> usize {
        self.state = PrecomputeState::Probe(self.cursor);
        self.cursor
    }

    /// Record the outcome and advance. The cursor advances even on failure
    /// (no retry; the stale layer persists until the next pass over this
    /// index). Wrapping back to 0 ends the sweep.
    pub fn finish_step(&mut self, ok: bool) {
        if let PrecomputeState::Probe(index) = self.state {
            self.valid[index] = ok;
        }
        self.state = PrecomputeState::Idle;
        self.cursor += 1;
        if self.cursor >= self.probe_count {
            self.cursor = 0;
            self.sweeping = false;
        }
    }

    pub fn is_valid(&self, index: usize) -> bool {
        self.valid.get(index).copied().unwrap_or(false)
    }

    pub fn invalid_count(&self) -> usize {
        self.valid.iter().filter(|&&v| !v).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_wraps_exactly_once_after_probe_count_steps() {
        let mut pre = ProbePrecompute::new(8);
        pre.trigger();
        assert_eq!(pre.cursor(), 0);
        for expected in 0..8 {
            assert!(pre.wants_step());
            assert_eq!(pre.begin_step(), expected);
            pre.finish_step(true);
        }
        assert_eq!(pre.cursor(), 0);
        assert!(!pre.wants_step(), "sweep ends when the cursor wraps");
    }

    #[test]
    fn failure_advances_cursor_and_marks_layer_invalid() {
        let mut pre = ProbePrecompute::new(3);
        pre.trigger();
        pre.begin_step();
        pre.finish_step(true);
        pre.begin_step();
        pre.finish_step(false);
        assert_eq!(pre.cursor(), 2);
        assert!(pre.is_valid(0));
        assert!(!pre.is_valid(1));
        assert_eq!(pre.invalid_count(), 2);
    }

    #[test]
    fn state_returns_to_idle_between_steps() {
        let mut pre = ProbePrecompute::new(2);
        assert_eq!(pre.state(), PrecomputeState::Idle);
        let index = pre.begin_step();
        assert_eq!(pre.state(), PrecomputeState::Probe(index));
        pre.finish_step(true);
        assert_eq!(pre.state(), PrecomputeState::Idle);
    }

    #[test]
    fn retrigger_restarts_sweep_from_current_cursor() {
        let mut pre = ProbePrecompute::new(2);
        pre.trigger();
        pre.begin_step();
        pre.finish_step(true);
        pre.begin_step();
        pre.finish_step(true);
        assert!(!pre.wants_step());
        pre.trigger();
        assert!(pre.wants_step());
        assert_eq!(pre.begin_step(), 0);
    }
}
