//! Fail-fast execution of ordered steps.

/// Progress of a step sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    /// No step has started.
    Pending,
    /// The step at this zero-based index is executing.
    Running(usize),
    /// The step at `failed_step` failed; later steps were skipped.
    Aborted {
        /// Zero-based index of the failing step.
        failed_step: usize,
    },
    /// Every step passed. An empty sequence completes immediately.
    Completed,
}

/// Final result of a sequence run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceOutcome {
    /// Terminal state, either `Aborted` or `Completed`.
    pub state: SequenceState,
    /// Number of steps that were executed, the failing one included.
    pub executed: usize,
    /// Number of steps in the sequence.
    pub total: usize,
}

impl SequenceOutcome {
    /// Returns `true` when every step passed.
    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self.state, SequenceState::Completed)
    }
}

/// Runs steps in order and stops at the first failure.
#[derive(Debug)]
pub struct Sequencer<'s, T> {
    steps: &'s [T],
    state: SequenceState,
}

impl<'s, T> Sequencer<'s, T> {
    /// A pending sequencer over `steps`.
    #[must_use]
    pub const fn new(steps: &'s [T]) -> Self {
        Self {
            steps,
            state: SequenceState::Pending,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SequenceState {
        self.state
    }

    /// Executes each step with `step(index, item)` until one returns
    /// `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Propagates the first error `step` returns; the sequencer stays in
    /// the `Running` state of the step that raised it.
    pub fn run<E, F>(&mut self, mut step: F) -> Result<SequenceOutcome, E>
    where
        F: FnMut(usize, &T) -> Result<bool, E>,
    {
        let total = self.steps.len();
        for (index, item) in self.steps.iter().enumerate() {
            self.state = SequenceState::Running(index);
            if !step(index, item)? {
                self.state = SequenceState::Aborted { failed_step: index };
                let skipped = total.saturating_sub(index.saturating_add(1));
                tracing::debug!(failed_step = index, skipped, "sequence aborted");
                return Ok(SequenceOutcome {
                    state: self.state,
                    executed: total.saturating_sub(skipped),
                    total,
                });
            }
        }
        self.state = SequenceState::Completed;
        Ok(SequenceOutcome {
            state: self.state,
            executed: total,
            total,
        })
    }
}
