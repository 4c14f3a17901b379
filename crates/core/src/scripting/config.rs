//! Tunables for script execution.

use std::path::PathBuf;
use std::time::Duration;

/// Default interpreter used to run materialized script files.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Default number of output lines buffered before a flush to the store.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Default bound on how long `create` waits for the process to start.
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on how long `stop` / `delete` wait for a process to settle.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Execution configuration shared by the runner and the orchestrator.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Interpreter that runs the materialized script file.
    pub shell: PathBuf,
    /// Directory where temporary script files are written.
    pub script_dir: PathBuf,
    /// Output lines per store flush.
    pub batch_size: usize,
    /// Upper bound for the start handshake in `create`.
    pub start_timeout: Duration,
    /// Upper bound for `stop` / `delete` waiting on the background unit.
    pub stop_timeout: Duration,
    /// Deadline applied by `create` when the caller gives none.
    /// `None` means scripts may run forever.
    pub default_deadline: Option<Duration>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            shell: PathBuf::from(DEFAULT_SHELL),
            script_dir: std::env::temp_dir(),
            batch_size: DEFAULT_BATCH_SIZE,
            start_timeout: DEFAULT_START_TIMEOUT,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            default_deadline: None,
        }
    }
}

impl ExecutionConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default          |
    /// |--------------------------------|------------------|
    /// | `SCRIPT_SHELL`                 | `/bin/sh`        |
    /// | `SCRIPT_DIR`                   | system temp dir  |
    /// | `SCRIPT_OUTPUT_BATCH_SIZE`     | `10`             |
    /// | `SCRIPT_START_TIMEOUT_SECS`    | `10`             |
    /// | `SCRIPT_STOP_TIMEOUT_SECS`     | `10`             |
    /// | `SCRIPT_DEFAULT_DEADLINE_SECS` | unset            |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let shell = std::env::var("SCRIPT_SHELL")
            .map(PathBuf::from)
            .unwrap_or(defaults.shell);

        let script_dir = std::env::var("SCRIPT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.script_dir);

        let batch_size: usize = std::env::var("SCRIPT_OUTPUT_BATCH_SIZE")
            .unwrap_or_else(|_| DEFAULT_BATCH_SIZE.to_string())
            .parse()
            .expect("SCRIPT_OUTPUT_BATCH_SIZE must be a valid usize");

        let start_timeout = secs_from_env("SCRIPT_START_TIMEOUT_SECS")
            .unwrap_or(DEFAULT_START_TIMEOUT);

        let stop_timeout =
            secs_from_env("SCRIPT_STOP_TIMEOUT_SECS").unwrap_or(DEFAULT_STOP_TIMEOUT);

        let default_deadline = secs_from_env("SCRIPT_DEFAULT_DEADLINE_SECS");

        Self {
            shell,
            script_dir,
            batch_size,
            start_timeout,
            stop_timeout,
            default_deadline,
        }
    }
}

/// Read an optional whole-seconds duration from `key`.
fn secs_from_env(key: &str) -> Option<Duration> {
    std::env::var(key).ok().map(|raw| {
        let secs: u64 = raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a valid u64"));
        Duration::from_secs(secs)
    })
}
