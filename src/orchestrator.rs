//! Phase execution
//!
//! One pass per invocation:
//! 1. Fetch the instance attributes snapshot
//! 2. Resolve every populated script key for the phase, in kind order
//! 3. Run the resolved scripts sequentially and classify each result

use std::collections::HashMap;
use tracing::{error, info};

use crate::metadata::MetadataClient;
use crate::scripts::fetch::ScriptFetcher;
use crate::scripts::resolve::resolve;
use crate::scripts::runner::ScriptRunner;
use crate::scripts::{MetadataKeySet, ScriptRecord};
use crate::{Config, Phase, ScriptError};

/// What happened to one script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The script ran; carries its exit code (-1 when killed by a signal)
    Exited(i32),
    /// The script could not be resolved, downloaded or started
    Failed(String),
}

/// Per-script outcomes in the order they were handled
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub outcomes: Vec<(String, Outcome)>,
}

impl RunSummary {
    fn record(&mut self, key: &str, outcome: Outcome) {
        self.outcomes.push((key.to_string(), outcome));
    }

    /// Whether any script was found for the phase
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Outcome recorded for a metadata key
    pub fn outcome(&self, key: &str) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, outcome)| outcome)
    }
}

/// Resolve the populated script keys of a metadata snapshot, in kind order
///
/// Entries that fail to resolve are logged, recorded in `summary`, and
/// left out of the returned list.
pub async fn collect_scripts(
    keys: &MetadataKeySet,
    attributes: &HashMap<String, String>,
    fetcher: &ScriptFetcher,
    summary: &mut RunSummary,
) -> Vec<ScriptRecord> {
    let mut scripts = Vec::new();

    for (kind, key, value) in keys.select(attributes) {
        info!("Found {} in metadata.", key);
        match resolve(fetcher, value, kind, key).await {
            Ok(record) => scripts.push(record),
            Err(e) => {
                error!("{}: {}", key, e);
                summary.record(key, Outcome::Failed(e.to_string()));
            }
        }
    }

    scripts
}

/// Run scripts one after another, never in parallel
pub async fn run_scripts(
    runner: &ScriptRunner,
    scripts: &[ScriptRecord],
    summary: &mut RunSummary,
) {
    for script in scripts {
        let outcome = match runner.run(script).await {
            Ok(status) => {
                let code = status.code().unwrap_or(-1);
                info!("{} exit status {}", script.key, code);
                Outcome::Exited(code)
            }
            Err(e) => {
                error!("{}: {}", script.key, e);
                Outcome::Failed(e.to_string())
            }
        };
        summary.record(&script.key, outcome);
    }
}

/// Run every metadata script for a phase
///
/// Only a failed attributes query is returned as an error; per-script
/// problems end up in the summary.
pub async fn run_phase(config: &Config, phase: Phase) -> Result<RunSummary, ScriptError> {
    let keys = MetadataKeySet::for_phase(phase);
    let attributes = MetadataClient::new(config)?.get_attributes().await?;

    let mut summary = RunSummary::default();
    if keys.select(&attributes).next().is_none() {
        info!("No {} scripts to run.", phase);
        return Ok(summary);
    }

    let fetcher = ScriptFetcher::new(config)?;
    let scripts = collect_scripts(&keys, &attributes, &fetcher, &mut summary).await;

    let runner = ScriptRunner::new(config);
    run_scripts(&runner, &scripts, &mut summary).await;

    info!("Finished running {} scripts.", phase);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripts::ScriptKind;

    fn attributes(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_single_ps1_script() {
        let keys = MetadataKeySet::for_phase(Phase::Startup);
        let fetcher = ScriptFetcher::new(&Config::default()).unwrap();
        let mut summary = RunSummary::default();

        let scripts = collect_scripts(
            &keys,
            &attributes(&[("windows-startup-script-ps1", "Write-Output hi")]),
            &fetcher,
            &mut summary,
        )
        .await;

        assert_eq!(
            scripts,
            vec![ScriptRecord::new(
                ScriptKind::Ps1,
                "Write-Output hi",
                "windows-startup-script-ps1"
            )]
        );
        assert!(summary.is_empty());
    }

    #[tokio::test]
    async fn test_scripts_in_kind_order() {
        let keys = MetadataKeySet::for_phase(Phase::Startup);
        let fetcher = ScriptFetcher::new(&Config::default()).unwrap();
        let mut summary = RunSummary::default();

        let scripts = collect_scripts(
            &keys,
            &attributes(&[
                ("windows-startup-script-bat", "echo bat"),
                ("windows-startup-script-cmd", "echo cmd"),
                ("windows-startup-script-ps1", "Write-Output ps1"),
                ("windows-shutdown-script-ps1", "Write-Output other phase"),
            ]),
            &fetcher,
            &mut summary,
        )
        .await;

        let order: Vec<_> = scripts.iter().map(|s| s.kind).collect();
        assert_eq!(order, vec![ScriptKind::Ps1, ScriptKind::Cmd, ScriptKind::Bat]);
    }

    #[tokio::test]
    async fn test_unresolvable_url_is_recorded_and_skipped() {
        let keys = MetadataKeySet::for_phase(Phase::Specialize);
        let fetcher = ScriptFetcher::new(&Config::default()).unwrap();
        let mut summary = RunSummary::default();

        let scripts = collect_scripts(
            &keys,
            &attributes(&[
                ("sysprep-specialize-script-cmd", "echo cmd"),
                ("sysprep-specialize-script-url", "gs://bucket/setup.exe"),
            ]),
            &fetcher,
            &mut summary,
        )
        .await;

        assert_eq!(scripts.len(), 1);
        assert!(matches!(
            summary.outcome("sysprep-specialize-script-url"),
            Some(Outcome::Failed(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_values_yield_no_scripts() {
        let keys = MetadataKeySet::for_phase(Phase::Shutdown);
        let fetcher = ScriptFetcher::new(&Config::default()).unwrap();
        let mut summary = RunSummary::default();

        let scripts = collect_scripts(
            &keys,
            &attributes(&[
                ("windows-shutdown-script-ps1", ""),
                ("windows-shutdown-script-url", ""),
                ("unrelated", "value"),
            ]),
            &fetcher,
            &mut summary,
        )
        .await;

        assert!(scripts.is_empty());
        assert!(summary.is_empty());
    }
}
