//! The select, execute, insert cycle.

use crate::context::Engine;
use crate::invocation::Invocation;
use crate::report::RunOutcome;
use crate::template::{CompiledTemplate, OUT};
use factloop_algo::ExecEnv;
use factloop_core::{Binding, BindingError, Result, Term};
use std::collections::{HashMap, HashSet};
use tracing::{debug, error};

impl Engine {
    /// Run one template once. True when at least one new fact reached the
    /// graph, the same test the fixpoint drivers use.
    pub fn run(&self, template: &CompiledTemplate) -> Result<bool> {
        Ok(self.run_detailed(template)?.changed())
    }

    pub fn run_detailed(&self, template: &CompiledTemplate) -> Result<RunOutcome> {
        let _cycle = self.lock_run();
        let mut outcome = RunOutcome::default();

        let rows = self.select(&template.select_query)?;
        outcome.rows = rows.len();
        if rows.is_empty() {
            debug!(template = %template.name, "nothing to do");
            return Ok(outcome);
        }
        let env = self.exec_env()?;

        // grounded invocation -> its results, for this cycle only
        let mut cache: HashMap<String, Vec<Term>> = HashMap::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut batch: Vec<String> = Vec::new();

        for row in &rows {
            let values = match row_values(&template.shared_variables, row) {
                Ok(values) => values,
                Err(e) => {
                    error!(template = %template.name, error = %e, "row skipped");
                    outcome.failures += 1;
                    continue;
                }
            };
            let exec = template.exec_query.fill(&values).to_text();
            let insert = template.insert_template.fill(&values);

            let results = match cache.get(&exec) {
                Some(hit) => {
                    outcome.cached += 1;
                    hit.clone()
                }
                None => {
                    outcome.executions += 1;
                    let results = match self.execute(&exec, &env) {
                        Ok(results) => results,
                        Err(e) => {
                            error!(template = %template.name, invocation = %exec, error = %e, "invocation failed");
                            outcome.failures += 1;
                            Vec::new()
                        }
                    };
                    cache.insert(exec, results.clone());
                    results
                }
            };

            for out in &results {
                match insert.fill_one(OUT, &out.to_query_text()).render() {
                    Ok(statement) => {
                        if seen.insert(statement.clone()) {
                            batch.push(statement);
                        }
                    }
                    Err(e) => {
                        error!(template = %template.name, error = %e, "insert left ungrounded");
                        outcome.failures += 1;
                    }
                }
            }
        }

        outcome.statements = batch.len();
        if !batch.is_empty() {
            let before = self.store().len()?;
            self.update_batch(&batch)?;
            outcome.inserted = self.store().len()?.saturating_sub(before);
        }
        debug!(
            template = %template.name,
            rows = outcome.rows,
            executions = outcome.executions,
            inserted = outcome.inserted,
            "cycle done"
        );
        Ok(outcome)
    }

    /// Evaluate one grounded execute query through the registry.
    pub fn execute(&self, exec_query: &str, env: &ExecEnv) -> std::result::Result<Vec<Term>, BindingError> {
        let invocation = Invocation::parse(exec_query, self.namespaces())?;
        self.registry()
            .invoke(&invocation.algorithm, &invocation.args, env)
    }
}

/// Query text for each shared variable of a row. Blank nodes are refused:
/// `_:id` in an update mints a fresh node instead of naming the bound one.
fn row_values(shared: &[String], row: &Binding) -> std::result::Result<HashMap<String, String>, BindingError> {
    let mut values = HashMap::with_capacity(shared.len());
    for var in shared {
        match row.get(var) {
            Some(Term::Blank(id)) => {
                return Err(BindingError::BlankNode {
                    var: var.clone(),
                    id: id.clone(),
                })
            }
            Some(term) => {
                values.insert(var.clone(), term.to_query_text());
            }
            None => {}
        }
    }
    Ok(values)
}
