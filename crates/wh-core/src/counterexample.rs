//! Counterexample representation and rendering.
//!
//! When a property violation is detected, a counterexample shows
//! the sequence of queue operations that led to the failure.

use std::fmt;

/// A counterexample showing the failure path.
///
/// Contains the sequence of queue states and thread actions that led
/// to an invariant violation. Can be rendered as a thread diagram.
#[derive(Debug, Clone, Default)]
pub struct Counterexample {
    /// Sequence of state snapshots
    pub states: Vec<StateSnapshot>,
    /// Thread interleaving that caused the failure
    pub interleaving: Vec<ThreadAction>,
    /// DST seed for reproduction (if applicable)
    pub dst_seed: Option<u64>,
    /// Human-readable description of the failure
    pub description: Option<String>,
}

/// Snapshot of queue state at a point in time.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    /// Step number in the execution
    pub step: u64,
    /// Description of the state, e.g. `count=2 head=0 tail=2`
    pub description: String,
    /// Variable values at this point
    pub variables: Vec<(String, String)>,
}

/// Action taken by a thread.
#[derive(Debug, Clone)]
pub struct ThreadAction {
    /// Thread identifier
    pub thread_id: u64,
    /// Step number when this action occurred
    pub step: u64,
    /// Description of the action, e.g. `push(3)`
    pub action: String,
    pub outcome: ActionOutcome,
}

/// How a queue operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    /// The caller was still waiting (full on push, empty on pop)
    Blocked,
    /// Returned because the queue was shut down
    Cancelled,
    /// A timed operation hit its deadline
    TimedOut,
    /// The caller abandoned the result (injected crash)
    Abandoned,
}

impl Counterexample {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a counterexample with DST seed for reproduction.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        debug_assert!(seed != 0, "DST seed should not be zero");
        Self {
            dst_seed: Some(seed),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    /// Add a state snapshot. Steps must increase.
    pub fn add_state(&mut self, state: StateSnapshot) {
        debug_assert!(
            self.states.last().map_or(true, |last| state.step > last.step),
            "States must be added in order"
        );
        self.states.push(state);
    }

    pub fn add_action(&mut self, action: ThreadAction) {
        self.interleaving.push(action);
    }

    /// Render the counterexample as a thread diagram.
    ///
    /// Format:
    /// ```text
    /// DST_SEED=12345
    ///
    /// Step | Thread 0       | Thread 1       | State
    /// -----|----------------|----------------|------
    ///    1 | push(1)        |                | count=1
    ///    2 |                | pop() [BLOCKED]|
    /// ```
    #[must_use]
    pub fn render_diagram(&self) -> String {
        let mut output = String::new();

        if let Some(seed) = self.dst_seed {
            output.push_str(&format!("DST_SEED={}\n\n", seed));
        }

        if let Some(ref desc) = self.description {
            output.push_str(&format!("Failure: {}\n\n", desc));
        }

        let mut threads: Vec<u64> = self.interleaving.iter().map(|a| a.thread_id).collect();
        threads.sort_unstable();
        threads.dedup();

        if threads.is_empty() {
            output.push_str("(no thread actions recorded)\n");
            for state in &self.states {
                output.push_str(&format!("{:4} | {}\n", state.step, state.description));
            }
            return output;
        }

        let width = self
            .interleaving
            .iter()
            .map(|a| a.label().len())
            .chain(threads.iter().map(|t| format!("Thread {}", t).len()))
            .max()
            .unwrap_or(0);

        output.push_str("Step |");
        for tid in &threads {
            output.push_str(&format!(" {:<width$} |", format!("Thread {}", tid)));
        }
        output.push_str(" State\n-----|");
        for _ in &threads {
            output.push_str(&format!("{}|", "-".repeat(width + 2)));
        }
        output.push_str("------\n");

        let mut steps: Vec<u64> = self
            .interleaving
            .iter()
            .map(|a| a.step)
            .chain(self.states.iter().map(|s| s.step))
            .collect();
        steps.sort_unstable();
        steps.dedup();

        for step in steps {
            output.push_str(&format!("{:4} |", step));
            for tid in &threads {
                let label = self
                    .interleaving
                    .iter()
                    .find(|a| a.step == step && a.thread_id == *tid)
                    .map(ThreadAction::label)
                    .unwrap_or_default();
                output.push_str(&format!(" {:<width$} |", label));
            }
            if let Some(state) = self.states.iter().find(|s| s.step == step) {
                output.push_str(&format!(" {}", state.description));
            }
            output.push('\n');
        }

        output
    }
}

impl ThreadAction {
    fn label(&self) -> String {
        match self.outcome {
            ActionOutcome::Completed => self.action.clone(),
            outcome => format!("{} [{}]", self.action, outcome),
        }
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionOutcome::Completed => "OK",
            ActionOutcome::Blocked => "BLOCKED",
            ActionOutcome::Cancelled => "CANCELLED",
            ActionOutcome::TimedOut => "TIMEOUT",
            ActionOutcome::Abandoned => "ABANDONED",
        };
        f.write_str(label)
    }
}
