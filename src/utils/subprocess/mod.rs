use std::process::Stdio;
use tokio::process::Command;

/// Environment variables passed through to allowlisted commands.
const ALLOWED_ENV_VARS: &[&str] = &[
    "PATH",
    "HOME",
    "USER",
    "LANG",
    "LC_ALL",
    "TZ",
    "TERM",
    "TMPDIR",
    "NODE_ENV",
    "PM2_HOME",
];

/// Create a `Command` with a scrubbed environment and no stdin.
///
/// Calls `env_clear()` then copies only the allowlisted variables from the
/// current process, so provider keys never reach a child process. The child
/// is killed if the returned future is dropped.
pub fn scrubbed_command(program: &str) -> Command {
    let mut cmd = Command::new(program);
    cmd.env_clear();
    for &var in ALLOWED_ENV_VARS {
        if let Ok(val) = std::env::var(var) {
            cmd.env(var, val);
        }
    }
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}
