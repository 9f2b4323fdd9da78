//! # Test Module / 测试模块
//!
//! A [`Test`] wraps one [`Command`] and, once started, one OS child process.
//! It owns the process lifecycle and derives the test's status and verdict.
//!
//! 一个 [`Test`] 包装一条 [`Command`]，启动后还对应一个操作系统子进程。
//! 它负责进程的生命周期，并推导测试的状态与结论。
//!
//! ## State Machine / 状态机
//!
//! ```text
//! Idle --schedule()--> Pending --start()--> Running --exit--> Finished
//!   \______________start()______________/        \--terminate/kill/timeout--> Terminated
//! ```
//!
//! A failed spawn moves the test straight to `Terminated` with a `Failed`
//! verdict.

use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::core::classifier::ClassifierInput;
use crate::core::command::Command;
use crate::core::config::RunOptions;
use crate::core::error::TestError;
use crate::core::models::{TestOutput, TestResult, TestStatus, TestSummary};
use crate::core::process::{ControlSignal, ControllableProcess, ProcessGroup};
use crate::infra::command::{self as shell, TestProcess};

static NEXT_TEST_ID: AtomicU64 = AtomicU64::new(1);

/// Upper bound for draining output pipes after the process has exited.
const OUTPUT_DRAIN_LIMIT: Duration = Duration::from_secs(2);

/// One schedulable unit of work.
///
/// `Test` is shared between the pipeline and whoever controls it, so all of its
/// operations take `&self`. Short-lived bookkeeping lives behind a std mutex;
/// the process handle lives behind an async mutex because waiting on it spans
/// await points.
///
/// 一个可调度的工作单元。`Test` 在流水线和控制方之间共享，所以所有操作都接受 `&self`。
pub struct Test {
    id: u64,
    name: String,
    command: Command,
    state: Mutex<TestState>,
    process: tokio::sync::Mutex<Option<TestProcess>>,
}

#[derive(Debug, Default)]
struct TestState {
    status: TestStatus,
    result: TestResult,
    pid: Option<u32>,
    suspended: bool,
    /// Set by our own terminate/kill, so the exit counts as Terminated.
    stop_requested: bool,
    timed_out: bool,
    exit_code: Option<i32>,
    started_at: Option<DateTime<Local>>,
    finished_at: Option<DateTime<Local>>,
    output: Option<TestOutput>,
}

impl Test {
    pub fn new(command: Command) -> Self {
        let name = derive_name(&command);
        Self {
            id: NEXT_TEST_ID.fetch_add(1, Ordering::Relaxed),
            name,
            command,
            state: Mutex::new(TestState::default()),
            process: tokio::sync::Mutex::new(None),
        }
    }

    pub fn from_line(line: &str) -> Self {
        Self::new(Command::parse(line))
    }

    fn state(&self) -> MutexGuard<'_, TestState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Process-unique, monotonically increasing id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The `--test` value after its last `/`, or an empty string.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn flow(&self) -> Option<&str> {
        self.command.flow()
    }

    pub fn seed(&self) -> i64 {
        self.command.seed_or(0)
    }

    pub fn status(&self) -> TestStatus {
        self.state().status
    }

    /// `NotApplicable` until the test reaches a terminal state.
    pub fn result(&self) -> TestResult {
        self.state().result
    }

    pub fn pid(&self) -> Option<u32> {
        self.state().pid
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.state().exit_code
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.state().started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Local>> {
        self.state().finished_at
    }

    pub fn duration(&self) -> Option<Duration> {
        let state = self.state();
        match (state.started_at, state.finished_at) {
            (Some(start), Some(end)) => (end - start).to_std().ok(),
            _ => None,
        }
    }

    /// Captured stdout/stderr, available once the test has finished.
    pub fn output(&self) -> Option<TestOutput> {
        self.state().output.clone()
    }

    pub fn is_suspended(&self) -> bool {
        self.state().suspended
    }

    pub fn timed_out(&self) -> bool {
        self.state().timed_out
    }

    pub fn is_idle(&self) -> bool {
        self.status() == TestStatus::Idle
    }

    pub fn is_running(&self) -> bool {
        self.status() == TestStatus::Running
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn passed(&self) -> bool {
        self.result() == TestResult::Passed
    }

    pub fn failed(&self) -> bool {
        self.result() == TestResult::Failed
    }

    /// Admits the test into scheduling: `Idle -> Pending`.
    pub fn schedule(&self) -> Result<(), TestError> {
        let mut state = self.state();
        if state.status != TestStatus::Idle {
            return Err(TestError::InvalidState {
                name: self.name.clone(),
                status: state.status,
            });
        }
        state.status = TestStatus::Pending;
        Ok(())
    }

    /// Spawns the test process: `Idle | Pending -> Running`.
    ///
    /// A spawn failure is terminal: the test becomes `Terminated` with a
    /// `Failed` verdict and the error is logged and returned.
    ///
    /// 派生测试进程。派生失败是终止性的：测试变为 `Terminated`，结果为 `Failed`，
    /// 错误会被记录并返回。
    pub async fn start(&self, options: &RunOptions) -> Result<(), TestError> {
        self.ensure_startable()?;
        let mut slot = self.process.lock().await;

        let spawned = {
            let mut state = self.state();
            if !matches!(state.status, TestStatus::Idle | TestStatus::Pending) {
                return Err(TestError::AlreadyRunning {
                    name: self.name.clone(),
                    status: state.status,
                });
            }

            let now = Local::now();
            state.started_at = Some(now);
            match shell::spawn_shell(
                self.command.line(),
                &options.shell,
                options.working_dir.as_deref(),
            ) {
                Ok(process) => {
                    state.status = TestStatus::Running;
                    state.pid = process.pid();
                    Ok(process)
                }
                Err(source) => {
                    state.status = TestStatus::Terminated;
                    state.result = TestResult::Failed;
                    state.finished_at = Some(now);
                    Err(source)
                }
            }
        };

        match spawned {
            Ok(process) => {
                tracing::debug!(test = %self.name, pid = ?process.pid(), "test started");
                *slot = Some(process);
                Ok(())
            }
            Err(source) => {
                tracing::error!(test = %self.name, error = %source, "failed to spawn test process");
                Err(TestError::Spawn {
                    name: self.name.clone(),
                    source,
                })
            }
        }
    }

    fn ensure_startable(&self) -> Result<(), TestError> {
        let status = self.status();
        if matches!(status, TestStatus::Idle | TestStatus::Pending) {
            Ok(())
        } else {
            Err(TestError::AlreadyRunning {
                name: self.name.clone(),
                status,
            })
        }
    }

    /// Awaits process exit and computes the verdict: `Running -> Finished | Terminated`.
    ///
    /// With `options.test_timeout` set, the wait is raced against a timer; on
    /// expiry the process is terminated, given `options.kill_grace` to exit,
    /// then killed, and the test ends `Terminated`/`Failed`.
    ///
    /// Calling this on a test that already reached a terminal state returns
    /// its verdict again.
    ///
    /// 等待进程退出并计算结论。若设置了超时，等待会与计时器竞争；
    /// 超时后先 terminate，宽限期后 kill，测试以 `Terminated`/`Failed` 结束。
    pub async fn wait(&self, options: &RunOptions) -> Result<TestResult, TestError> {
        let mut slot = self.process.lock().await;
        if self.is_terminal() {
            return Ok(self.result());
        }
        let Some(process) = slot.as_mut() else {
            return Err(TestError::NotStarted {
                name: self.name.clone(),
            });
        };

        let exited = match options.test_timeout {
            Some(limit) => match tokio::time::timeout(limit, process.wait()).await {
                Ok(exited) => exited,
                Err(_) => {
                    tracing::warn!(test = %self.name, timeout = ?limit, "test timed out");
                    self.state().timed_out = true;
                    self.escalate(process, options.kill_grace).await
                }
            },
            None => process.wait().await,
        };

        self.finish(process, exited, options).await
    }

    /// Stops a running test and reaps it: terminate, wait up to
    /// `options.kill_grace`, kill.
    ///
    /// If another task is currently waiting on the process, that task reaps it
    /// and this call returns once the process lock is released. No-op for a
    /// test that is not running.
    pub async fn shutdown(&self, options: &RunOptions) {
        if !self.is_running() {
            return;
        }
        let grace = options.kill_grace;
        self.terminate();

        let mut slot = match tokio::time::timeout(grace, self.process.lock()).await {
            Ok(slot) => slot,
            Err(_) => {
                self.kill();
                self.process.lock().await
            }
        };
        if self.is_terminal() {
            return;
        }
        if let Some(process) = slot.as_mut() {
            let exited = self.escalate(process, grace).await;
            if let Err(error) = self.finish(process, exited, options).await {
                tracing::warn!(test = %self.name, %error, "failed to reap test during shutdown");
            }
        }
    }

    /// Marks a test that never started as `Terminated`/`Failed`.
    /// Returns `false` if the test had already started.
    pub fn abandon(&self) -> bool {
        let mut state = self.state();
        if !matches!(state.status, TestStatus::Idle | TestStatus::Pending) {
            return false;
        }
        state.status = TestStatus::Terminated;
        state.result = TestResult::Failed;
        state.finished_at = Some(Local::now());
        true
    }

    pub fn summary(&self) -> TestSummary {
        let duration = self.duration();
        let state = self.state();
        TestSummary {
            id: self.id,
            name: self.name.clone(),
            command: self.command.line().to_string(),
            status: state.status,
            result: state.result,
            pid: state.pid,
            exit_code: state.exit_code,
            timed_out: state.timed_out,
            started_at: state.started_at,
            finished_at: state.finished_at,
            duration,
        }
    }

    /// terminate -> grace -> kill, then wait for the exit.
    async fn escalate(
        &self,
        process: &mut TestProcess,
        grace: Duration,
    ) -> std::io::Result<std::process::ExitStatus> {
        self.terminate();
        match tokio::time::timeout(grace, process.wait()).await {
            Ok(exited) => exited,
            Err(_) => {
                tracing::warn!(test = %self.name, "test ignored SIGTERM, killing");
                self.kill();
                process.wait().await
            }
        }
    }

    async fn finish(
        &self,
        process: &mut TestProcess,
        exited: std::io::Result<std::process::ExitStatus>,
        options: &RunOptions,
    ) -> Result<TestResult, TestError> {
        let status = match exited {
            Ok(status) => status,
            Err(source) => {
                let mut state = self.state();
                state.status = TestStatus::Terminated;
                state.result = TestResult::Failed;
                state.finished_at = Some(Local::now());
                return Err(TestError::Wait {
                    name: self.name.clone(),
                    source,
                });
            }
        };
        let finished_at = Local::now();
        let exit_code = shell::exit_code(&status);
        let killed = shell::killed_by_signal(&status);
        self.reap_group(process);
        let output = process.collect_output(OUTPUT_DRAIN_LIMIT).await;

        let (stop_requested, timed_out) = {
            let state = self.state();
            (state.stop_requested, state.timed_out)
        };

        // A stop request that arrived after the process had already exited on
        // its own does not turn a natural exit into a termination.
        let (status, result) = if (stop_requested && killed) || timed_out {
            (TestStatus::Terminated, TestResult::Failed)
        } else {
            (TestStatus::Finished, self.classify(exit_code, &output, options))
        };

        let mut state = self.state();
        state.status = status;
        state.result = result;
        state.exit_code = exit_code;
        state.suspended = false;
        state.finished_at = Some(finished_at);
        state.output = Some(output);
        tracing::debug!(test = %self.name, ?exit_code, %status, %result, "test finished");
        Ok(result)
    }

    /// Kills whatever the shell left behind in its process group. The leader
    /// is already reaped; an empty group makes this a no-op.
    fn reap_group(&self, process: &TestProcess) {
        let Some(pid) = process.pid() else {
            return;
        };
        let group = ProcessGroup::new(pid);
        if group.is_alive() {
            tracing::debug!(test = %self.name, pgid = pid, "killing leftover processes of the test");
            group.signal(ControlSignal::Kill);
        }
    }

    /// Exit code 0 gives a provisional pass; a configured classifier overrides
    /// it. A classifier error keeps the provisional verdict and is only logged.
    fn classify(
        &self,
        exit_code: Option<i32>,
        output: &TestOutput,
        options: &RunOptions,
    ) -> TestResult {
        let provisional = TestResult::from_exit_code(exit_code);
        let Some(classifier) = options.classifier.as_deref() else {
            return provisional;
        };

        let input = ClassifierInput {
            name: &self.name,
            command: &self.command,
            exit_code,
            output,
        };
        match classifier.classify(&input) {
            Ok(verdict) => verdict,
            Err(error) => {
                tracing::warn!(test = %self.name, %error, "result classification failed, using exit code");
                provisional
            }
        }
    }
}

impl ControllableProcess for Test {
    /// Signals the test's process group. A no-op unless the test is Running.
    fn signal(&self, signal: ControlSignal) {
        let (group, resume_after) = {
            let mut state = self.state();
            if state.status != TestStatus::Running {
                return;
            }
            let Some(pid) = state.pid else {
                return;
            };
            let was_suspended = state.suspended;
            match signal {
                ControlSignal::Suspend => state.suspended = true,
                ControlSignal::Resume => state.suspended = false,
                ControlSignal::Terminate | ControlSignal::Kill => {
                    state.stop_requested = true;
                    state.suspended = false;
                }
                ControlSignal::Interrupt => state.suspended = false,
            }
            // A stopped process does not act on SIGTERM/SIGINT until continued.
            let resume_after = was_suspended
                && matches!(signal, ControlSignal::Terminate | ControlSignal::Interrupt);
            (ProcessGroup::new(pid), resume_after)
        };

        tracing::debug!(test = %self.name, pgid = group.leader(), %signal, "signalling test");
        group.signal(signal);
        if resume_after {
            group.signal(ControlSignal::Resume);
        }
    }
}

impl std::fmt::Debug for Test {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("Test")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("command", &self.command.line())
            .field("status", &state.status)
            .field("result", &state.result)
            .field("pid", &state.pid)
            .finish_non_exhaustive()
    }
}

/// `--test chip/smoke_reset` names the test `smoke_reset`.
fn derive_name(command: &Command) -> String {
    let test = command.test().unwrap_or("");
    match test.rsplit_once('/') {
        Some((_, name)) => name.to_string(),
        None => test.to_string(),
    }
}
