//! # Command Execution Module / 命令执行模块
//!
//! Spawns a test's command line under a shell, in its own process group, and
//! captures stdout and stderr concurrently while it runs.
//!
//! 在独立进程组中通过 shell 派生测试命令行，并在其运行期间并发捕获 stdout 和 stderr。

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::core::models::TestOutput;

/// A spawned test process together with the tasks draining its output.
/// 已派生的测试进程及读取其输出的任务。
#[derive(Debug)]
pub struct TestProcess {
    child: Child,
    pid: Option<u32>,
    stdout: Option<Reader>,
    stderr: Option<Reader>,
    exit: Option<ExitStatus>,
}

/// A reader task and the buffer it appends to. The buffer outlives the task,
/// so output read before an abort is kept.
#[derive(Debug)]
struct Reader {
    task: JoinHandle<()>,
    buffer: Arc<Mutex<String>>,
}

/// Spawns `line` as `<shell> -c <line>`.
///
/// The child becomes the leader of a new process group so that signals sent
/// to the group also reach anything the shell starts. stdin is closed.
///
/// # Arguments
/// * `line` - The full command line, passed to the shell verbatim
/// * `shell` - Path of the shell, e.g. `/bin/sh`
/// * `working_dir` - Optional working directory for the child
///
/// 以 `<shell> -c <line>` 派生命令。子进程成为新进程组的组长，
/// 因此发给该组的信号也能到达 shell 启动的所有程序。stdin 被关闭。
pub fn spawn_shell(
    line: &str,
    shell: &str,
    working_dir: Option<&Path>,
) -> std::io::Result<TestProcess> {
    let mut cmd = tokio::process::Command::new(shell);
    cmd.arg("-c")
        .arg(line)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn()?;
    let pid = child.id();

    // Spawn one reader task per stream so that neither pipe can fill up and
    // block the child.
    // 每个输出流使用一个读取任务，避免任何管道写满而阻塞子进程。
    let stdout = child.stdout.take().map(capture);
    let stderr = child.stderr.take().map(capture);

    Ok(TestProcess {
        child,
        pid,
        stdout,
        stderr,
        exit: None,
    })
}

/// Reads a stream line by line into a shared buffer until EOF.
///
/// Lines are decoded lossily and the pipe is drained to EOF: a reader that
/// stopped early would make the child's next write fail with SIGPIPE.
fn capture<R>(stream: R) -> Reader
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buffer = Arc::new(Mutex::new(String::new()));
    let sink = Arc::clone(&buffer);
    let task = tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => sink.lock().await.push_str(&String::from_utf8_lossy(&line)),
                Err(error) => {
                    tracing::warn!(%error, "failed to read test output");
                    break;
                }
            }
        }
    });
    Reader { task, buffer }
}

impl TestProcess {
    /// The pid of the shell, which is also the process group id.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// The exit status, once [`wait`](Self::wait) has observed it.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit
    }

    /// Waits for the process to exit. Cancel-safe: dropping the future leaves
    /// the process untouched and it can be waited on again.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        if let Some(status) = self.exit {
            return Ok(status);
        }
        let status = self.child.wait().await?;
        self.exit = Some(status);
        Ok(status)
    }

    /// Joins the output readers.
    ///
    /// A reader only finishes when every writer of the pipe has closed it, so a
    /// detached grandchild could keep it open forever; `limit` bounds the wait
    /// and only what was read by then is returned.
    pub async fn collect_output(&mut self, limit: Duration) -> TestOutput {
        TestOutput {
            stdout: join_reader(self.stdout.take(), limit).await,
            stderr: join_reader(self.stderr.take(), limit).await,
        }
    }
}

async fn join_reader(reader: Option<Reader>, limit: Duration) -> String {
    let Some(Reader { mut task, buffer }) = reader else {
        return String::new();
    };
    match tokio::time::timeout(limit, &mut task).await {
        Ok(Ok(())) => {}
        Ok(Err(error)) => tracing::warn!(%error, "output reader task failed"),
        Err(_) => {
            task.abort();
            tracing::warn!("output pipe still open after process exit, output truncated");
        }
    }
    let output = buffer.lock().await;
    output.clone()
}

/// Extracts the exit code, mapping death-by-signal to `128 + signal` the way
/// shells report it.
pub fn exit_code(status: &ExitStatus) -> Option<i32> {
    if let Some(code) = status.code() {
        return Some(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status.signal().map(|signal| 128 + signal)
    }
    #[cfg(not(unix))]
    {
        None
    }
}

/// Whether the process was ended by a signal rather than exiting on its own.
pub fn killed_by_signal(status: &ExitStatus) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status.signal().is_some()
    }
    #[cfg(not(unix))]
    {
        let _ = status;
        false
    }
}
