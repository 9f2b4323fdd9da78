//! # Regression Module / 回归模块
//!
//! A [`Regression`] owns a named, ordered set of [`Test`]s and runs them
//! through the bounded pipeline in [`pipeline`](crate::core::pipeline):
//! `pending` holds every admitted test, `running` admits at most `run_limit`
//! of them at once, and `done` receives each test once it reached a terminal
//! state.
//!
//! 一个 [`Regression`] 拥有一组具名且有序的测试，并通过有界流水线运行它们：
//! `pending` 保存所有已调度的测试，`running` 同时最多接纳 `run_limit` 个，
//! 测试进入终止状态后进入 `done`。
//!
//! ## Failure policy / 失败策略
//!
//! Failures are isolated per test by default: a test that cannot be spawned,
//! fails, or times out still reaches `done` with a `Failed` verdict and the
//! remaining tests keep running. With `fail_fast` enabled the first
//! non-passing test stops the run instead.
//!
//! Cancelling a running regression (see [`Regression::cancel`]) aborts the
//! pipeline, terminates and reaps every running test, and only then returns
//! [`RegressionError::Cancelled`]. When a test's shell exits, whatever is
//! left in its process group is killed, so no child process that stays in
//! its group outlives `start()`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::core::command::Command;
use crate::core::config::RunOptions;
use crate::core::error::RegressionError;
use crate::core::models::{Progress, RegressionResult, TestResult, TestSummary};
use crate::core::pipeline::{self, Stages};
use crate::core::process::{ControlSignal, ControllableProcess};
use crate::core::test::Test;

/// A named collection of tests executed under one bounded-concurrency session.
pub struct Regression {
    name: String,
    /// Lookup keys, parallel to `tests`.
    keys: Vec<String>,
    index: HashMap<String, usize>,
    tests: Arc<[Arc<Test>]>,
    options: Arc<RunOptions>,
    stages: Arc<Stages>,
    cancel: CancellationToken,
    started: AtomicBool,
    result: Mutex<RegressionResult>,
    progress: watch::Sender<Progress>,
}

impl Regression {
    /// Builds a regression from tests in their intended order.
    ///
    /// Identical commands are kept once. Tests whose names collide are keyed
    /// `name`, `name#2`, `name#3`, ...; a test without a name is keyed by its
    /// command line.
    ///
    /// 按给定顺序构建回归。相同的命令只保留一次；名称冲突的测试依次使用
    /// `name`、`name#2`、`name#3` 作为键；没有名称的测试以其命令行为键。
    pub fn new(
        name: impl Into<String>,
        tests: impl IntoIterator<Item = Test>,
        options: RunOptions,
    ) -> Self {
        let name = name.into();
        let mut seen: HashSet<Command> = HashSet::new();
        let mut keys = Vec::new();
        let mut index = HashMap::new();
        let mut kept = Vec::new();

        for test in tests {
            if !seen.insert(test.command().clone()) {
                tracing::warn!(
                    regression = %name,
                    command = %test.command(),
                    "duplicate command ignored"
                );
                continue;
            }

            let base = if test.name().is_empty() {
                test.command().line().to_string()
            } else {
                test.name().to_string()
            };
            let mut key = base.clone();
            let mut suffix = 2;
            while index.contains_key(&key) {
                key = format!("{base}#{suffix}");
                suffix += 1;
            }

            index.insert(key.clone(), kept.len());
            keys.push(key);
            kept.push(Arc::new(test));
        }

        let total = kept.len();
        let stages = Stages::new(total, options.run_limit.get());
        let (progress, _) = watch::channel(Progress {
            total,
            ..Progress::default()
        });

        Self {
            name,
            keys,
            index,
            tests: kept.into(),
            options: Arc::new(options),
            stages: Arc::new(stages),
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
            result: Mutex::new(RegressionResult::NotApplicable),
            progress,
        }
    }

    /// One test per line, with default options.
    pub fn from_lines<I, S>(name: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_lines_with_options(name, lines, RunOptions::default())
    }

    /// One test per line. Blank lines and `#` comments are skipped.
    pub fn from_lines_with_options<I, S>(
        name: impl Into<String>,
        lines: I,
        options: RunOptions,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tests = lines
            .into_iter()
            .filter_map(|line| {
                let line = line.as_ref().trim();
                if line.is_empty() || line.starts_with('#') {
                    None
                } else {
                    Some(Test::from_line(line))
                }
            })
            .collect::<Vec<_>>();
        Self::new(name, tests, options)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn run_limit(&self) -> usize {
        self.options.run_limit.get()
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Looks a test up by its key.
    pub fn get(&self, key: &str) -> Option<&Arc<Test>> {
        self.index.get(key).map(|&position| &self.tests[position])
    }

    /// `(key, test)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Test>)> {
        self.keys.iter().map(String::as_str).zip(self.tests.iter())
    }

    pub fn tests(&self) -> impl Iterator<Item = &Arc<Test>> {
        self.tests.iter()
    }

    pub fn passed(&self) -> impl Iterator<Item = &Arc<Test>> {
        self.tests.iter().filter(|test| test.passed())
    }

    /// Every test whose verdict is not `Passed`, including tests that never ran.
    pub fn failed(&self) -> impl Iterator<Item = &Arc<Test>> {
        self.tests.iter().filter(|test| !test.passed())
    }

    /// The aggregate verdict. Only meaningful after [`start`](Self::start) returned.
    pub fn result(&self) -> RegressionResult {
        *self.result.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_result(&self, result: RegressionResult) {
        *self.result.lock().unwrap_or_else(PoisonError::into_inner) = result;
    }

    pub fn pending_len(&self) -> usize {
        self.stages.pending.len()
    }

    /// Number of tests currently admitted into `running`.
    pub fn running_len(&self) -> usize {
        self.stages.running.len()
    }

    pub fn done_len(&self) -> usize {
        self.stages.done.len()
    }

    /// The most tests that were ever admitted into `running` at once.
    pub fn peak_running(&self) -> usize {
        self.stages.running.peak()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Requests cancellation. `start()` cleans up and returns `Cancelled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Progress samples published while the regression runs.
    pub fn subscribe_progress(&self) -> watch::Receiver<Progress> {
        self.progress.subscribe()
    }

    /// The latest progress snapshot.
    pub fn progress(&self) -> Progress {
        pipeline::sample(&self.tests, &self.stages, std::time::Duration::ZERO)
    }

    pub fn summaries(&self) -> Vec<TestSummary> {
        self.tests.iter().map(|test| test.summary()).collect()
    }

    /// Runs every test and returns the aggregate verdict.
    ///
    /// `Passed` iff every test passed; an empty regression passes vacuously.
    /// May be called once.
    ///
    /// 运行所有测试并返回汇总结论。当且仅当所有测试都通过时为 `Passed`；
    /// 空回归视为通过。只能调用一次。
    pub async fn start(&self) -> Result<RegressionResult, RegressionError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(RegressionError::AlreadyStarted(self.name.clone()));
        }

        let total = self.tests.len();
        let started = Instant::now();
        if total == 0 {
            tracing::info!(regression = %self.name, "regression has no tests");
            self.set_result(TestResult::Passed);
            self.progress.send_replace(Progress::default());
            return Ok(TestResult::Passed);
        }

        let runners = self.run_limit().min(total);
        tracing::info!(
            regression = %self.name,
            total,
            run_limit = self.run_limit(),
            "regression started"
        );

        let (completions, received) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();
        tasks.spawn(pipeline::schedule(
            Arc::clone(&self.tests),
            Arc::clone(&self.stages),
        ));
        for _ in 0..runners {
            tasks.spawn(pipeline::run(
                Arc::clone(&self.stages),
                Arc::clone(&self.options),
                completions.clone(),
            ));
        }
        drop(completions);
        tasks.spawn(pipeline::collect(Arc::clone(&self.stages), received));
        tasks.spawn(pipeline::report_progress(
            Arc::clone(&self.tests),
            Arc::clone(&self.stages),
            self.options.progress_interval,
            started,
            self.progress.clone(),
        ));

        let outcome = loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    break Err(RegressionError::Cancelled {
                        name: self.name.clone(),
                        finished: 0,
                        total,
                    });
                }
                joined = tasks.join_next() => match joined {
                    None => break Ok(()),
                    Some(Ok(Ok(()))) => {}
                    Some(Ok(Err(error))) => break Err(error),
                    Some(Err(error)) => break Err(RegressionError::Task(error.to_string())),
                },
            }
        };

        let outcome = match outcome {
            Ok(()) if self.done_len() == total => Ok(()),
            Ok(()) => Err(RegressionError::Task(format!(
                "pipeline stopped with {}/{total} tests done",
                self.done_len()
            ))),
            Err(error) => Err(error),
        };

        if let Err(error) = outcome {
            tasks.shutdown().await;
            self.reap().await;
            self.set_result(TestResult::Failed);
            self.progress
                .send_replace(pipeline::sample(&self.tests, &self.stages, started.elapsed()));

            let error = match error {
                RegressionError::Cancelled { name, total, .. } => RegressionError::Cancelled {
                    name,
                    finished: self.done_len(),
                    total,
                },
                other => other,
            };
            tracing::warn!(regression = %self.name, %error, "regression aborted");
            return Err(error);
        }

        let result = if self.tests.iter().all(|test| test.passed()) {
            TestResult::Passed
        } else {
            TestResult::Failed
        };
        self.set_result(result);
        self.progress
            .send_replace(pipeline::sample(&self.tests, &self.stages, started.elapsed()));
        tracing::info!(regression = %self.name, %result, elapsed = ?started.elapsed(), "regression finished");
        Ok(result)
    }

    /// Stops and reaps every running test, then moves every terminal test
    /// that the collector did not get to into `done`.
    async fn reap(&self) {
        self.stages.running.close();
        let running = self.tests.iter().filter(|test| test.is_running());
        futures::future::join_all(running.map(|test| test.shutdown(&self.options))).await;

        for test in self.tests.iter().filter(|test| test.is_terminal()) {
            if let Err(error) = self.stages.record(Arc::clone(test)).await {
                tracing::warn!(test = %test.name(), %error, "could not record test");
            }
        }
    }
}

impl ControllableProcess for Regression {
    /// Broadcasts to every test. Tests that are not running ignore it.
    fn signal(&self, signal: ControlSignal) {
        tracing::debug!(regression = %self.name, %signal, "broadcasting signal");
        for test in self.tests.iter() {
            test.signal(signal);
        }
    }
}

impl std::fmt::Debug for Regression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Regression")
            .field("name", &self.name)
            .field("tests", &self.tests.len())
            .field("run_limit", &self.run_limit())
            .field("result", &self.result())
            .finish_non_exhaustive()
    }
}
