//! # Process Control / 进程控制
//!
//! The capability set shared by anything that can be paused, resumed, or
//! stopped with an OS signal: a single process group, a [`Test`], or a whole
//! [`Regression`].
//!
//! 可通过操作系统信号暂停、恢复或停止的对象所共享的能力集合：
//! 单个进程组、[`Test`] 或整个 [`Regression`]。
//!
//! [`Test`]: crate::core::test::Test
//! [`Regression`]: crate::core::regression::Regression

use std::fmt;
use std::io;

/// The control signals a test process can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlSignal {
    /// SIGSTOP
    Suspend,
    /// SIGCONT
    Resume,
    /// SIGINT
    Interrupt,
    /// SIGTERM
    Terminate,
    /// SIGKILL
    Kill,
}

impl fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControlSignal::Suspend => "SIGSTOP",
            ControlSignal::Resume => "SIGCONT",
            ControlSignal::Interrupt => "SIGINT",
            ControlSignal::Terminate => "SIGTERM",
            ControlSignal::Kill => "SIGKILL",
        };
        f.write_str(name)
    }
}

/// Something that can be controlled with signals.
///
/// Implementors only provide [`signal`](ControllableProcess::signal); the five
/// named operations are thin wrappers. Sending a signal to something that is
/// not running is a no-op, so cleanup code may call these unconditionally.
///
/// 可以通过信号控制的对象。实现者只需提供 `signal`，
/// 五个具名操作都是其薄封装。向未运行的对象发送信号不做任何事，
/// 因此清理代码可以无条件调用它们。
pub trait ControllableProcess {
    fn signal(&self, signal: ControlSignal);

    fn suspend(&self) {
        self.signal(ControlSignal::Suspend);
    }

    fn resume(&self) {
        self.signal(ControlSignal::Resume);
    }

    fn interrupt(&self) {
        self.signal(ControlSignal::Interrupt);
    }

    fn terminate(&self) {
        self.signal(ControlSignal::Terminate);
    }

    fn kill(&self) {
        self.signal(ControlSignal::Kill);
    }
}

/// A process group led by a spawned test's shell. Signals go to the whole
/// group so that programs started by `sh -c` are controlled as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessGroup {
    leader: u32,
}

impl ProcessGroup {
    /// `leader` must be the pid of a process spawned as its own group leader.
    pub fn new(leader: u32) -> Self {
        Self { leader }
    }

    pub fn leader(&self) -> u32 {
        self.leader
    }

    /// Delivers a signal to every process in the group.
    #[cfg(unix)]
    pub fn send(&self, signal: ControlSignal) -> io::Result<()> {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        let signal = match signal {
            ControlSignal::Suspend => Signal::SIGSTOP,
            ControlSignal::Resume => Signal::SIGCONT,
            ControlSignal::Interrupt => Signal::SIGINT,
            ControlSignal::Terminate => Signal::SIGTERM,
            ControlSignal::Kill => Signal::SIGKILL,
        };
        let pgid = i32::try_from(self.leader)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

        killpg(Pid::from_raw(pgid), signal).map_err(io::Error::from)
    }

    #[cfg(not(unix))]
    pub fn send(&self, _signal: ControlSignal) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "process group signals are only available on Unix",
        ))
    }

    /// Whether any process of the group is still around (zombies included).
    #[cfg(unix)]
    pub fn is_alive(&self) -> bool {
        use nix::sys::signal::killpg;
        use nix::unistd::Pid;

        i32::try_from(self.leader)
            .map(|pgid| killpg(Pid::from_raw(pgid), None).is_ok())
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    pub fn is_alive(&self) -> bool {
        false
    }
}

impl ControllableProcess for ProcessGroup {
    fn signal(&self, signal: ControlSignal) {
        if let Err(error) = self.send(signal) {
            // ESRCH here just means the group already exited.
            tracing::debug!(pgid = self.leader, %signal, %error, "signal not delivered");
        }
    }
}
