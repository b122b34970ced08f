//! Run report: what a replay, saturation or bulk estimation did.

use chrono::{DateTime, Utc};
use factloop_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counters from one interpreter cycle over one template.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RunOutcome {
    /// Rows returned by the select query.
    pub rows: usize,
    /// Distinct grounded invocations actually executed.
    pub executions: usize,
    /// Rows answered from the execution cache.
    pub cached: usize,
    /// Invocations that failed to bind or process.
    pub failures: usize,
    /// Distinct insert statements applied.
    pub statements: usize,
    /// Triples the store did not hold before.
    pub inserted: usize,
}

impl RunOutcome {
    pub fn changed(&self) -> bool {
        self.inserted > 0
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Replay,
    Saturate,
    Distances,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Replay => write!(f, "replay"),
            Self::Saturate => write!(f, "saturate"),
            Self::Distances => write!(f, "distances"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pending,
    Success,
    Failure,
}

/// Accumulated over every run of one template.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateStats {
    pub runs: usize,
    pub rows: usize,
    pub executions: usize,
    pub cached: usize,
    pub failures: usize,
    pub inserted: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RunReport {
    pub run_id: String,
    pub mode: Mode,
    pub started: DateTime<Utc>,
    pub ended: Option<DateTime<Utc>>,
    pub outcome: Outcome,
    pub passes: usize,
    /// Triples added by subclass inference and classification.
    pub inferred: usize,
    /// Triples added by template runs.
    pub inserted: usize,
    pub templates: BTreeMap<String, TemplateStats>,
}

impl RunReport {
    pub fn new(mode: Mode) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            mode,
            started: Utc::now(),
            ended: None,
            outcome: Outcome::Pending,
            passes: 0,
            inferred: 0,
            inserted: 0,
            templates: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, template: &str, outcome: &RunOutcome) {
        let stats = self.templates.entry(template.to_string()).or_default();
        stats.runs += 1;
        stats.rows += outcome.rows;
        stats.executions += outcome.executions;
        stats.cached += outcome.cached;
        stats.failures += outcome.failures;
        stats.inserted += outcome.inserted;
        self.inserted += outcome.inserted;
    }

    pub fn finish(&mut self, outcome: Outcome) {
        self.outcome = outcome;
        self.ended = Some(Utc::now());
    }

    pub fn wall_ms(&self) -> u64 {
        self.ended
            .map(|end| (end - self.started).num_milliseconds().max(0) as u64)
            .unwrap_or(0)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} {}: {} passes, {} inserted, {} inferred, {} templates, {}ms",
            self.mode,
            match self.outcome {
                Outcome::Pending => "pending",
                Outcome::Success => "ok",
                Outcome::Failure => "failed",
            },
            self.passes,
            self.inserted,
            self.inferred,
            self.templates.len(),
            self.wall_ms()
        )
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::Internal(format!("report: {e}")))
    }
}
