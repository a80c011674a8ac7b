// src/engine/poll.rs

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::ConfigSource;
use crate::errors::Result;
use crate::history::HistoryStore;
use crate::pipeline::PipelineRunner;
use crate::types::CloneFailurePolicy;
use crate::watch::ChangeDetector;

use super::{CycleSummary, RunnerSettings};

/// Drives change detection and pipeline runs, one pipeline at a time.
pub struct PollLoop<S: ConfigSource> {
    source: S,
    detector: ChangeDetector,
    runner: PipelineRunner,
    history: HistoryStore,
    settings: RunnerSettings,
}

impl<S: ConfigSource> PollLoop<S> {
    pub fn new(
        source: S,
        detector: ChangeDetector,
        runner: PipelineRunner,
        settings: RunnerSettings,
    ) -> Self {
        let history = runner.history().clone();
        Self {
            source,
            detector,
            runner,
            history,
            settings,
        }
    }

    /// Poll until an unrecoverable error or Ctrl-C. In `once` mode a single
    /// cycle is run.
    ///
    /// Ctrl-C is honoured at any point: during the sleep it just ends the
    /// loop, and during a cycle it abandons the pipeline being run (its
    /// running command is killed and no `RunLog` is recorded).
    pub async fn run(self) -> Result<()> {
        info!(
            interval = ?self.settings.poll_interval,
            once = self.settings.once,
            "poll loop started"
        );

        let mut shutdown = spawn_shutdown_listener();

        loop {
            let summary = tokio::select! {
                res = self.run_cycle() => res?,
                Some(()) = shutdown.recv() => {
                    warn!("shutdown requested during a poll cycle; abandoning it");
                    return Ok(());
                }
            };
            info!(
                ran = summary.ran,
                unchanged = summary.unchanged,
                failed = summary.failed,
                abandoned = summary.abandoned,
                "poll cycle finished"
            );

            if self.settings.once {
                return Ok(());
            }

            tokio::select! {
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
                Some(()) = shutdown.recv() => {
                    info!("shutdown requested; stopping poll loop");
                    return Ok(());
                }
            }
        }
    }

    /// One pass over every configured pipeline.
    ///
    /// - An unreadable config or history abandons the cycle (an error in
    ///   `once` mode).
    /// - A detection error skips that pipeline.
    /// - A clone/checkout failure ends the loop unless the clone policy is
    ///   `skip`.
    /// - Any other run error (e.g. a task failure under the `abort` policy)
    ///   ends the loop.
    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        let mut summary = CycleSummary::default();

        let loaded = self
            .source
            .load()
            .and_then(|cfg| Ok((cfg, self.history.load()?)));
        let (cfg, history) = match loaded {
            Ok(loaded) => loaded,
            Err(err) if !self.settings.once => {
                error!(error = %err, "could not read config or history; retrying next cycle");
                summary.abandoned = true;
                return Ok(summary);
            }
            Err(err) => return Err(err),
        };

        for pipeline in cfg.pipelines() {
            let identity = pipeline.identity();

            let status = match self.detector.detect(pipeline, &history).await {
                Ok(status) => status,
                Err(err) => {
                    warn!(
                        pipeline = identity,
                        error = %err,
                        "change detection failed; skipping this cycle"
                    );
                    summary.failed += 1;
                    continue;
                }
            };

            if !status.is_changed() {
                info!(pipeline = identity, "no new commits; skipping");
                summary.unchanged += 1;
                continue;
            }
            info!(pipeline = identity, ?status, "change detected");

            match self.runner.run_observed(pipeline, status.current()).await {
                Ok(_) => summary.ran += 1,
                Err(err)
                    if err.is_source_failure()
                        && self.settings.on_clone_failure == CloneFailurePolicy::Skip =>
                {
                    error!(pipeline = identity, error = %err, "pipeline skipped");
                    summary.failed += 1;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(summary)
    }
}

/// Forward the first Ctrl-C to the returned channel. If the signal cannot be
/// listened for, the channel closes and the loop only stops on errors.
fn spawn_shutdown_listener() -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        let _ = tx.send(()).await;
    });
    rx
}
