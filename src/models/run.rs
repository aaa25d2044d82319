use camino::Utf8PathBuf;
use serde::Serialize;
use std::fmt;

/// Pipeline stage a source entry can fail in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Import,
    Simplify,
    Export,
}

impl Stage {
    /// Reason logged when an entry fails in this stage
    pub fn failure_reason(&self) -> &'static str {
        match self {
            Stage::Import => "import error",
            Stage::Simplify => "simplification error",
            Stage::Export => "export error",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.failure_reason())
    }
}

/// Lifecycle of one source entry.
///
/// Transitions only move forward; the three failure states and `Exported`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Discovered,
    Imported,
    Simplified,
    Exported,
    ImportFailed,
    SimplifyFailed,
    ExportFailed,
}

impl EntryState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EntryState::Exported
                | EntryState::ImportFailed
                | EntryState::SimplifyFailed
                | EntryState::ExportFailed
        )
    }

    /// State reached when the current stage succeeds
    pub fn advance(self) -> Self {
        match self {
            EntryState::Discovered => EntryState::Imported,
            EntryState::Imported => EntryState::Simplified,
            EntryState::Simplified => EntryState::Exported,
            terminal => terminal,
        }
    }

    /// State reached when the current stage fails
    pub fn fail(self) -> Self {
        match self {
            EntryState::Discovered => EntryState::ImportFailed,
            EntryState::Imported => EntryState::SimplifyFailed,
            EntryState::Simplified => EntryState::ExportFailed,
            terminal => terminal,
        }
    }

    /// Stage that runs from this state, if any
    pub fn pending_stage(&self) -> Option<Stage> {
        match self {
            EntryState::Discovered => Some(Stage::Import),
            EntryState::Imported => Some(Stage::Simplify),
            EntryState::Simplified => Some(Stage::Export),
            _ => None,
        }
    }
}

/// Success/failure counters for one batch invocation; never decremented
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    pub successes: usize,
    pub failures: usize,
}

impl RunCounters {
    pub fn record_success(&mut self) {
        self.successes += 1;
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    pub fn total(&self) -> usize {
        self.successes + self.failures
    }
}

impl fmt::Display for RunCounters {
    /// Rendered as `(failures/successes)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}/{})", self.failures, self.successes)
    }
}

/// Final result of a batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub counters: RunCounters,
    pub destination_root: Utf8PathBuf,
    /// Directory entries that could not be read during traversal
    pub unreadable_entries: usize,
}

impl BatchSummary {
    pub fn success_count(&self) -> usize {
        self.counters.successes
    }

    pub fn failure_count(&self) -> usize {
        self.counters.failures
    }
}
