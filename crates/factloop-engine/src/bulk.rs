//! Pairwise minimum distance between every patch in the graph.
//!
//! Each pair runs on its own blocking worker. Workers only read their two
//! patches; the graph is updated once, after every worker has finished.

use crate::context::Engine;
use crate::report::{Mode, Outcome, RunOutcome, RunReport};
use factloop_core::vocab::{self, kd};
use factloop_core::{Error, Result, Term};
use factloop_memory::Patch;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Distance class property for a minimum distance in metres.
pub fn distance_class(d: f64) -> Option<String> {
    if d < 0.01 {
        Some("inContact".into())
    } else if d < 0.1 {
        Some("isClose".into())
    } else if d < 1.0 {
        Some("isInTheVicinityOf".into())
    } else if d <= 20.0 {
        Some(format!("has{}m", d.round() as i64))
    } else if d < 100.0 {
        Some(format!("has{}0m", (d / 10.0).round() as i64))
    } else if d < 1001.0 {
        Some(format!("has{}00m", (d / 100.0).round() as i64))
    } else {
        None
    }
}

impl Engine {
    /// Patches typed in the graph that resolve in memory, sorted by IRI.
    fn resolved_patches(&self) -> Result<Vec<(String, Arc<Patch>)>> {
        let query = format!(
            "SELECT DISTINCT ?p WHERE {{ ?p <{}> <{}> }}",
            vocab::RDF_TYPE,
            self.namespaces().term(kd::PATCH)
        );
        let env = self.exec_env()?;
        let mut patches = Vec::new();
        for row in self.select(&query)? {
            let Some(iri) = row.get("p").and_then(Term::as_iri) else {
                continue;
            };
            match env.resolve(iri).as_ref().and_then(|r| r.as_patch()) {
                Some(patch) => patches.push((iri.to_string(), Arc::clone(patch))),
                None => warn!(patch = %iri, "patch not found in memory"),
            }
        }
        patches.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(patches)
    }

    /// Estimate every pairwise distance and record its class, waiting at
    /// most `bulk.timeout_secs` for the workers. Returns the report of the
    /// single batched update.
    pub async fn estimate_patch_distances(&self) -> Result<RunReport> {
        let limit = Duration::from_secs(self.config().bulk.timeout_secs);
        self.estimate_patch_distances_within(limit).await
    }

    /// As [`Engine::estimate_patch_distances`] with an explicit wait limit.
    /// On expiry the workers are cancelled and the graph is left untouched.
    pub async fn estimate_patch_distances_within(&self, limit: Duration) -> Result<RunReport> {
        let mut report = RunReport::new(Mode::Distances);
        let patches = self.resolved_patches()?;
        let max_points = self.config().bulk.max_points_per_patch;
        let cancel = CancellationToken::new();

        let mut workers = JoinSet::new();
        for (i, (a_iri, a)) in patches.iter().enumerate() {
            for (b_iri, b) in &patches[i + 1..] {
                let (a_iri, b_iri) = (a_iri.clone(), b_iri.clone());
                let (a, b) = (Arc::clone(a), Arc::clone(b));
                let cancel = cancel.clone();
                workers.spawn_blocking(move || {
                    let d = a.min_distance_until(&b, max_points, || cancel.is_cancelled());
                    (a_iri, b_iri, d)
                });
            }
        }
        let pairs = workers.len();
        info!(patches = patches.len(), pairs, "distance workers started");

        let collect = async {
            let mut results = Vec::with_capacity(pairs);
            while let Some(joined) = workers.join_next().await {
                results.push(joined.map_err(|e| Error::Internal(format!("distance worker: {e}")))?);
            }
            Ok::<_, Error>(results)
        };
        let waited = tokio::time::timeout(limit, collect).await;
        let results = match waited {
            Ok(results) => results?,
            Err(_) => {
                cancel.cancel();
                workers.shutdown().await;
                warn!(?limit, pairs, "distance workers cancelled");
                return Err(Error::timeout("patch distance workers", limit));
            }
        };

        let mut statements: Vec<String> = results
            .iter()
            .filter_map(|(a, b, d)| {
                let class = distance_class((*d)?)?;
                Some(format!(
                    "INSERT DATA {{ <{a}> <{}> <{b}> }}",
                    self.namespaces().term(&class)
                ))
            })
            .collect();
        statements.sort();

        let mut outcome = RunOutcome {
            rows: pairs,
            executions: pairs,
            statements: statements.len(),
            ..Default::default()
        };
        if !statements.is_empty() {
            let _cycle = self.lock_run();
            let before = self.store().len()?;
            self.update_batch(&statements)?;
            outcome.inserted = self.store().len()?.saturating_sub(before);
        }
        report.record("MinPatchesDistance", &outcome);
        report.passes = 1;
        report.finish(Outcome::Success);
        info!("{}", report.summary());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_classes() {
        assert_eq!(distance_class(0.005).as_deref(), Some("inContact"));
        assert_eq!(distance_class(0.05).as_deref(), Some("isClose"));
        assert_eq!(distance_class(0.5).as_deref(), Some("isInTheVicinityOf"));
        assert_eq!(distance_class(7.4).as_deref(), Some("has7m"));
        assert_eq!(distance_class(20.0).as_deref(), Some("has20m"));
        assert_eq!(distance_class(46.0).as_deref(), Some("has50m"));
        assert_eq!(distance_class(340.0).as_deref(), Some("has300m"));
        assert_eq!(distance_class(2000.0), None);
    }
}
