//! # Scheduling Pipeline / 调度流水线
//!
//! The four activities a [`Regression`](crate::core::regression::Regression)
//! runs concurrently while it executes:
//!
//! 1. [`schedule`] - moves every test into `pending`, in insertion order.
//! 2. [`run`] - one per runner slot. Takes a test from `pending`, gets it
//!    admitted into `running`, starts it, and waits for it to exit.
//! 3. [`collect`] - frees the `running` slot of each completed test and puts
//!    the test into `done`.
//! 4. [`report_progress`] - samples the queues on a fixed cadence and
//!    publishes a [`Progress`] value until every test is done.
//!
//! 回归执行时并发运行的四个活动：调度器、运行器、收集器和进度报告器。

use futures::StreamExt;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::IntervalStream;
use tokio_util::sync::CancellationToken;

use crate::core::config::RunOptions;
use crate::core::error::{RegressionError, TestError};
use crate::core::models::{Progress, TestResult, TestStatus};
use crate::core::process::ControllableProcess;
use crate::core::queue::{BoundedQueue, RunningGate, RunningSlot};
use crate::core::test::Test;

/// The queues shared by the pipeline activities.
#[derive(Debug)]
pub(crate) struct Stages {
    pub pending: BoundedQueue<Arc<Test>>,
    pub running: RunningGate<Arc<Test>>,
    pub done: BoundedQueue<Arc<Test>>,
    /// Ids of tests already put into `done`.
    collected: Mutex<HashSet<u64>>,
    /// Cancelled by fail-fast after the first non-passing test.
    halt: CancellationToken,
}

impl Stages {
    pub fn new(total: usize, run_limit: usize) -> Self {
        Self {
            pending: BoundedQueue::new("pending", total),
            running: RunningGate::new(run_limit),
            done: BoundedQueue::new("done", total),
            collected: Mutex::new(HashSet::with_capacity(total)),
            halt: CancellationToken::new(),
        }
    }

    fn collected(&self) -> MutexGuard<'_, HashSet<u64>> {
        self.collected.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_halted(&self) -> bool {
        self.halt.is_cancelled()
    }

    /// Puts `test` into `done` unless it is already there.
    pub async fn record(&self, test: Arc<Test>) -> Result<bool, RegressionError> {
        let fresh = self.collected().insert(test.id());
        if !fresh {
            return Ok(false);
        }
        self.done
            .put(test)
            .await
            .map_err(|_| RegressionError::QueueClosed("done"))?;
        Ok(true)
    }
}

/// A test handed from a runner to the collector, with the running slot it
/// occupied, if it was admitted at all.
#[derive(Debug)]
pub(crate) struct Completion {
    pub test: Arc<Test>,
    pub slot: Option<RunningSlot<Arc<Test>>>,
}

/// Admits every test into `pending`, then closes it so that runners stop once
/// it is drained.
pub(crate) async fn schedule(
    tests: Arc<[Arc<Test>]>,
    stages: Arc<Stages>,
) -> Result<(), RegressionError> {
    for test in tests.iter() {
        // A test driven by hand before the regression started still flows
        // through the pipeline so that it reaches `done`.
        if let Err(error) = test.schedule() {
            tracing::warn!(test = %test.name(), %error, "test was not idle when scheduled");
        }
        stages
            .pending
            .put(Arc::clone(test))
            .await
            .map_err(|_| RegressionError::QueueClosed("pending"))?;
        tracing::trace!(test = %test.name(), "test scheduled");
    }
    stages.pending.close();
    Ok(())
}

/// One runner. Exits once `pending` is closed and drained.
pub(crate) async fn run(
    stages: Arc<Stages>,
    options: Arc<RunOptions>,
    completions: mpsc::UnboundedSender<Completion>,
) -> Result<(), RegressionError> {
    while let Some(test) = stages.pending.get().await {
        let slot = if stages.is_halted() {
            None
        } else {
            tokio::select! {
                slot = stages.running.admit(test.id(), Arc::clone(&test)) => slot,
                _ = stages.halt.cancelled() => None,
            }
        };

        match slot {
            Some(_) if !stages.is_halted() => execute(&test, &stages, &options).await,
            _ => {
                if test.abandon() {
                    tracing::debug!(test = %test.name(), "test abandoned after fail-fast");
                }
            }
        }

        completions
            .send(Completion { test, slot })
            .map_err(|_| RegressionError::QueueClosed("running"))?;
    }
    Ok(())
}

/// Starts `test` and waits for it. Errors are logged, never propagated: the
/// test always ends in a terminal state and still reaches `done`.
async fn execute(test: &Test, stages: &Stages, options: &RunOptions) {
    let verdict = match test.start(options).await {
        Ok(()) => wait_or_halt(test, stages, options).await,
        // Started by someone else; reap it here all the same.
        Err(TestError::AlreadyRunning {
            status: TestStatus::Running,
            ..
        }) => wait_or_halt(test, stages, options).await,
        Err(error) => Err(error),
    };

    match verdict {
        Ok(result) => {
            tracing::debug!(test = %test.name(), %result, "test completed");
        }
        // Already logged by `Test::start`.
        Err(TestError::Spawn { .. }) => {}
        Err(error) => {
            tracing::error!(test = %test.name(), %error, "test did not complete cleanly");
        }
    }

    if options.fail_fast && test.result() != TestResult::Passed && !stages.is_halted() {
        tracing::info!(test = %test.name(), "fail-fast: stopping the regression");
        stages.halt.cancel();
    }
}

/// Waits for the test. If fail-fast halts the pipeline meanwhile, the test
/// is terminated, then killed after the grace period, and still reaped here.
async fn wait_or_halt(
    test: &Test,
    stages: &Stages,
    options: &RunOptions,
) -> Result<TestResult, TestError> {
    let wait = test.wait(options);
    tokio::pin!(wait);

    tokio::select! {
        verdict = &mut wait => return verdict,
        _ = stages.halt.cancelled() => {}
    }

    test.terminate();
    match tokio::time::timeout(options.kill_grace, &mut wait).await {
        Ok(verdict) => verdict,
        Err(_) => {
            test.kill();
            wait.await
        }
    }
}

/// Moves completed tests into `done` until every runner has hung up.
pub(crate) async fn collect(
    stages: Arc<Stages>,
    mut completions: mpsc::UnboundedReceiver<Completion>,
) -> Result<(), RegressionError> {
    while let Some(Completion { test, slot }) = completions.recv().await {
        if let Some(slot) = slot {
            stages.running.release(slot);
        }
        stages.record(test).await?;
    }
    Ok(())
}

/// Publishes a progress sample every `interval` until all tests are done.
pub(crate) async fn report_progress(
    tests: Arc<[Arc<Test>]>,
    stages: Arc<Stages>,
    interval: Duration,
    started: Instant,
    progress: watch::Sender<Progress>,
) -> Result<(), RegressionError> {
    let mut ticks = IntervalStream::new(tokio::time::interval(interval));
    while ticks.next().await.is_some() {
        let current = sample(&tests, &stages, started.elapsed());
        progress.send_replace(current);
        if current.is_complete() {
            break;
        }
    }
    Ok(())
}

/// Counts queue occupancy and the verdicts reached so far.
pub(crate) fn sample(tests: &[Arc<Test>], stages: &Stages, elapsed: Duration) -> Progress {
    let (passed, failed) = tests
        .iter()
        .filter(|test| test.is_terminal())
        .fold((0, 0), |(passed, failed), test| match test.result() {
            TestResult::Passed => (passed + 1, failed),
            TestResult::Failed => (passed, failed + 1),
            TestResult::NotApplicable => (passed, failed),
        });

    Progress {
        total: tests.len(),
        pending: stages.pending.len(),
        running: stages.running.len(),
        done: stages.done.len(),
        passed,
        failed,
        elapsed,
    }
}
