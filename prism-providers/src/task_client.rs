//! Task client: submit a generation job and poll it to a terminal state
//!
//! Submission and polling share one deadline. When it elapses the task is
//! abandoned locally; the remote job may keep running unless cancel on
//! timeout is enabled.

use crate::{GenerationProvider, JobSpec, RemoteStatus, UNKNOWN_TASK_REASON};
use prism_core::{GenerationTask, PrismError, PrismResult, ProviderError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_POLL_FAILURES: u32 = 3;

/// Behavior shared by every job the client runs.
#[derive(Debug, Clone, Copy)]
pub struct TaskClientConfig {
    /// Consecutive poll errors tolerated before giving up.
    pub max_poll_failures: u32,
    /// Send a provider cancel when the local deadline elapses.
    pub cancel_on_timeout: bool,
}

impl Default for TaskClientConfig {
    fn default() -> Self {
        Self {
            max_poll_failures: DEFAULT_MAX_POLL_FAILURES,
            cancel_on_timeout: false,
        }
    }
}

/// Poll cadence and deadline of a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    pub interval: Duration,
    pub deadline: Duration,
}

impl PollTiming {
    pub fn new(interval: Duration, deadline: Duration) -> Self {
        Self { interval, deadline }
    }
}

/// A job that reached `Succeeded`.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub task: GenerationTask,
    pub result_url: String,
    pub actual_prompt: Option<String>,
    pub polls: u32,
    pub elapsed: Duration,
}

#[derive(Clone)]
pub struct TaskClient {
    provider: Arc<dyn GenerationProvider>,
    config: TaskClientConfig,
}

impl TaskClient {
    pub fn new(provider: Arc<dyn GenerationProvider>, config: TaskClientConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &Arc<dyn GenerationProvider> {
        &self.provider
    }

    pub fn config(&self) -> TaskClientConfig {
        self.config
    }

    /// Submit `spec` and wait until the task is terminal or `timing.deadline`
    /// elapses. Dropping the returned future abandons the poll loop.
    pub async fn submit_and_wait(
        &self,
        spec: &JobSpec,
        timing: PollTiming,
    ) -> PrismResult<TaskOutcome> {
        let started = Instant::now();
        let mut task: Option<GenerationTask> = None;
        let mut polls = 0u32;

        let driven = tokio::time::timeout_at(
            started + timing.deadline,
            self.drive(spec, timing.interval, &mut task, &mut polls),
        )
        .await;

        match driven {
            Ok(Ok((result_url, actual_prompt))) => {
                let elapsed = started.elapsed();
                let task = task.ok_or_else(|| PrismError::internal("task missing after success"))?;
                info!(
                    task_id = %task.task_id,
                    kind = %spec.kind,
                    polls,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "generation task succeeded"
                );
                Ok(TaskOutcome {
                    task,
                    result_url,
                    actual_prompt,
                    polls,
                    elapsed,
                })
            }
            Ok(Err(err)) => Err(err),
            Err(_) => Err(self.abandon(task, spec, timing.deadline)),
        }
    }

    async fn drive(
        &self,
        spec: &JobSpec,
        interval: Duration,
        slot: &mut Option<GenerationTask>,
        polls: &mut u32,
    ) -> PrismResult<(String, Option<String>)> {
        let submitted = self.provider.submit(spec).await?;
        info!(
            task_id = %submitted.task_id,
            kind = %spec.kind,
            provider = self.provider.name(),
            model = self.provider.model(spec.kind),
            "generation task submitted"
        );
        let task = slot.insert(GenerationTask::submitted(submitted.task_id, spec.kind));

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        let mut consecutive_failures = 0u32;
        loop {
            ticker.tick().await;
            *polls += 1;

            let snapshot = match self.provider.poll(spec.kind, &task.task_id).await {
                Ok(snapshot) => {
                    consecutive_failures = 0;
                    snapshot
                }
                Err(err) => {
                    consecutive_failures += 1;
                    if consecutive_failures > self.config.max_poll_failures {
                        task.fail(err.to_string())?;
                        return Err(err);
                    }
                    warn!(
                        task_id = %task.task_id,
                        attempt = consecutive_failures,
                        error = %err,
                        "poll failed, retrying"
                    );
                    continue;
                }
            };
            task.record_poll();

            let status = snapshot.status();
            debug!(task_id = %task.task_id, status = %status, "polled generation task");
            match status {
                RemoteStatus::Pending => {}
                RemoteStatus::Running => task.mark_running()?,
                RemoteStatus::Succeeded => {
                    let Some(url) = snapshot.result_url else {
                        let reason = "provider reported success without a result url";
                        task.fail(reason)?;
                        return Err(ProviderError::InvalidResponse {
                            provider: self.provider.name().to_string(),
                            reason: reason.to_string(),
                        }
                        .into());
                    };
                    task.succeed(url.clone())?;
                    return Ok((url, snapshot.actual_prompt));
                }
                RemoteStatus::Failed | RemoteStatus::Unknown => {
                    let (code, message) = if status == RemoteStatus::Unknown {
                        ("UNKNOWN".to_string(), UNKNOWN_TASK_REASON.to_string())
                    } else {
                        (
                            snapshot.error_code.unwrap_or_else(|| "FAILED".to_string()),
                            snapshot
                                .error_message
                                .unwrap_or_else(|| "no reason given".to_string()),
                        )
                    };
                    task.fail(message.clone())?;
                    warn!(task_id = %task.task_id, code = %code, reason = %message, "generation task failed");
                    return Err(ProviderError::TaskFailed {
                        task_id: task.task_id.clone(),
                        code,
                        message,
                    }
                    .into());
                }
                RemoteStatus::Canceled => {
                    task.cancel()?;
                    return Err(ProviderError::TaskCanceled {
                        task_id: task.task_id.clone(),
                    }
                    .into());
                }
            }
        }
    }

    fn abandon(&self, task: Option<GenerationTask>, spec: &JobSpec, limit: Duration) -> PrismError {
        let task_id = task.map(|mut task| {
            // Already terminal means the deadline raced a final poll; keep its state.
            let _ = task.time_out(format!("deadline of {}s elapsed", limit.as_secs_f64()));
            task.task_id
        });

        warn!(
            task_id = task_id.as_deref().unwrap_or("<unsubmitted>"),
            kind = %spec.kind,
            limit_secs = limit.as_secs_f64(),
            "generation deadline elapsed, abandoning task"
        );

        if self.config.cancel_on_timeout {
            if let Some(id) = task_id.clone() {
                let provider = Arc::clone(&self.provider);
                tokio::spawn(async move {
                    match provider.cancel(&id).await {
                        Ok(()) => debug!(task_id = %id, "remote task cancel requested"),
                        Err(err) => warn!(task_id = %id, error = %err, "remote task cancel failed"),
                    }
                });
            }
        }

        PrismError::generation_timeout(limit, task_id)
    }
}

impl std::fmt::Debug for TaskClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskClient")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish()
    }
}
