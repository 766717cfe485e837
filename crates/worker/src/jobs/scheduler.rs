//! In-process scheduler for the pipeline's periodic tasks.
//!
//! Each registered job ticks on its own interval. A run that overruns its
//! interval delays the next tick instead of stacking runs, so one job never
//! overlaps itself.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::error::PipelineError;
use crate::middleware::metrics::record_job_run;

/// How often a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobFrequency {
    Minutes(u64),
    Hourly,
    Daily,
}

impl JobFrequency {
    pub fn period(self) -> Duration {
        let minutes = match self {
            JobFrequency::Minutes(minutes) => minutes.max(1),
            JobFrequency::Hourly => 60,
            JobFrequency::Daily => 24 * 60,
        };
        Duration::from_secs(minutes * 60)
    }
}

/// A periodic pipeline task.
#[async_trait::async_trait]
pub trait Job: Send + Sync {
    /// Name used in logs and metric labels.
    fn name(&self) -> &'static str;

    fn frequency(&self) -> JobFrequency;

    async fn execute(&self) -> Result<(), PipelineError>;
}

/// Execute a job once, logging and recording the outcome.
///
/// Returns whether the job succeeded.
pub async fn run_job(job: &dyn Job) -> bool {
    let name = job.name();
    let start = Instant::now();
    info!(job = name, "Job starting");

    let result = job.execute().await;
    let elapsed = start.elapsed();
    record_job_run(name, elapsed.as_secs_f64(), result.is_ok());

    match result {
        Ok(()) => {
            info!(job = name, elapsed_ms = elapsed.as_millis(), "Job completed");
            true
        }
        Err(e) => {
            error!(job = name, elapsed_ms = elapsed.as_millis(), error = %e, "Job failed");
            false
        }
    }
}

/// Tick `job` until shutdown is signalled. The first run happens one
/// period after start.
async fn tick_until_shutdown(job: Arc<dyn Job>, mut shutdown: watch::Receiver<bool>) {
    let frequency = job.frequency();
    let period = frequency.period();
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(job = job.name(), ?frequency, "Job scheduled");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                run_job(job.as_ref()).await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!(job = job.name(), "Job stopped");
                    return;
                }
            }
        }
    }
}

pub struct JobScheduler {
    jobs: Vec<Arc<dyn Job>>,
    shutdown: watch::Sender<bool>,
    tasks: JoinSet<()>,
}

impl JobScheduler {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            jobs: Vec::new(),
            shutdown,
            tasks: JoinSet::new(),
        }
    }

    pub fn register<J: Job + 'static>(&mut self, job: J) {
        self.jobs.push(Arc::new(job));
    }

    /// Spawn one ticking task per registered job.
    pub fn start(&mut self) {
        info!(jobs = self.jobs.len(), "Starting job scheduler");
        for job in &self.jobs {
            self.tasks
                .spawn(tick_until_shutdown(Arc::clone(job), self.shutdown.subscribe()));
        }
    }

    /// Signal every job to stop after its current run.
    pub fn shutdown(&self) {
        info!("Stopping job scheduler");
        self.shutdown.send_replace(true);
    }

    /// Wait up to `timeout` for running jobs to finish.
    pub async fn wait_for_shutdown(mut self, timeout: Duration) {
        let drain = async {
            while let Some(result) = self.tasks.join_next().await {
                if let Err(e) = result {
                    warn!(error = %e, "Job task panicked");
                }
            }
        };

        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!(?timeout, "Job shutdown timed out");
        }
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}
