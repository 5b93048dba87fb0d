//! Shared POSIX-shell command execution, grounded in `csa_process::spawn_tool`'s
//! spawn-then-capture idiom (stdout/stderr piped, child isolated via `setsid`).

use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use vibe_core::ValidationResult;

/// Run one POSIX shell command in `work_dir` inside the given process
/// environment (e.g. `docker exec <id> sh -c <command>`), capturing combined
/// output. Always returns; `success = (exit_code == 0)` per 
pub async fn run_shell_command(mut cmd: Command) -> std::io::Result<ValidationResult> {
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.stdin(Stdio::null());
    cmd.kill_on_drop(true);

    let started = Instant::now();
    let mut child = cmd.spawn()?;

    let mut stdout = child.stdout.take().expect("stdout piped");
    let mut stderr = child.stderr.take().expect("stderr piped");
    let mut out_buf = String::new();
    let mut err_buf = String::new();
    let (_, _, status) = tokio::join!(
        async {
            let _ = stdout.read_to_string(&mut out_buf).await;
        },
        async {
            let _ = stderr.read_to_string(&mut err_buf).await;
        },
        child.wait()
    );
    let status = status?;
    let duration = started.elapsed();

    let exit_code = status.code().unwrap_or(1);
    let mut combined = out_buf;
    if !err_buf.is_empty() {
        if !combined.is_empty() {
            combined.push('\n');
        }
        combined.push_str(&err_buf);
    }

    Ok(if exit_code == 0 {
        ValidationResult::ok(combined, duration)
    } else {
        ValidationResult::failed(combined, exit_code, duration)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_success_and_exit_code() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo hi");
        let result = run_shell_command(cmd).await.unwrap();
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("hi"));
    }

    #[tokio::test]
    async fn reports_non_zero_exit_without_erroring() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("exit 3");
        let result = run_shell_command(cmd).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, 3);
    }
}
