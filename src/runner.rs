//! Bounded-concurrency execution of planned statements.
//!
//! Every [`Query`] is written to its own file in the output directory.
//! A failing statement is recorded in the [`RunReport`] and does not stop
//! the others.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::engine::Warehouse;
use crate::error::{WexError, WexResult};
use crate::output::sink_for;
use crate::query::{Query, unique_names};
use crate::settings::OutputSettings;

/// Result of one statement.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub label: String,
    pub sql: String,
    pub path: PathBuf,
    pub rows: u64,
    pub elapsed_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Results of a whole run, in plan order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<Outcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn total_rows(&self) -> u64 {
        self.outcomes.iter().map(|o| o.rows).sum()
    }

    /// Write the report as pretty JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> WexResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

pub struct Runner {
    warehouse: Warehouse,
    output: OutputSettings,
    concurrency: usize,
}

impl Runner {
    pub fn new(warehouse: Warehouse, output: OutputSettings, concurrency: usize) -> Self {
        Self {
            warehouse,
            output,
            concurrency: concurrency.max(1),
        }
    }

    /// Files the queries are written to, in order. Queries sharing a stem
    /// (two views of one table under one dataset) get `_2`, `_3` suffixes.
    pub fn output_paths(&self, queries: &[Query]) -> Vec<PathBuf> {
        let stems: Vec<String> = queries.iter().map(Query::file_stem).collect();
        unique_names(&stems)
            .into_iter()
            .map(|stem| {
                self.output
                    .directory
                    .join(format!("{}.{}", stem, self.output.format.extension()))
            })
            .collect()
    }

    /// Execute every query, at most `concurrency` at a time.
    pub async fn run(&self, queries: Vec<Query>) -> WexResult<RunReport> {
        fs::create_dir_all(&self.output.directory)?;

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        let paths = self.output_paths(&queries);
        for (index, (query, path)) in queries.into_iter().zip(paths).enumerate() {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| WexError::Execution(e.to_string()))?;
            let warehouse = self.warehouse.clone();
            let output = self.output.clone();

            tasks.spawn(async move {
                let _permit = permit;
                let started = Instant::now();
                let result = extract_to_file(&warehouse, &output, &query, &path).await;
                let elapsed_ms = started.elapsed().as_millis();
                let outcome = match result {
                    Ok(rows) => {
                        info!("{}: {} rows -> {}", query.label(), rows, path.display());
                        Outcome {
                            label: query.label(),
                            sql: query.sql,
                            path,
                            rows,
                            elapsed_ms,
                            error: None,
                        }
                    }
                    Err(e) => {
                        error!("{}: {}", query.label(), e);
                        Outcome {
                            label: query.label(),
                            sql: query.sql,
                            path,
                            rows: 0,
                            elapsed_ms,
                            error: Some(e.to_string()),
                        }
                    }
                };
                (index, outcome)
            });
        }

        let mut finished = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (index, outcome) = joined.map_err(|e| WexError::Execution(e.to_string()))?;
            finished.push((index, outcome));
        }
        finished.sort_by_key(|(index, _)| *index);

        let report = RunReport {
            outcomes: finished.into_iter().map(|(_, o)| o).collect(),
        };
        info!(
            "Run finished: {} succeeded, {} failed, {} rows",
            report.succeeded(),
            report.failed(),
            report.total_rows()
        );
        Ok(report)
    }
}

async fn extract_to_file(
    warehouse: &Warehouse,
    output: &OutputSettings,
    query: &Query,
    path: &Path,
) -> WexResult<u64> {
    let file = File::create(path)?;
    let mut sink = sink_for(output, BufWriter::new(file));
    warehouse.extract(query, &mut sink).await
}
