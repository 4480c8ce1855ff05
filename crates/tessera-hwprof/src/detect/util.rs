use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};

/// Run a closure on a worker thread and join with timeout.
/// Returns (result, maybe_reason, elapsed_ms)
pub fn with_timeout<T: Send + 'static, F: FnOnce() -> T + Send + 'static>(
    label: &str,
    dur: Duration,
    f: F,
) -> (Option<T>, Option<String>, u64) {
    let (tx, rx) = mpsc::channel();
    let start = Instant::now();
    thread::spawn(move || {
        let out = f();
        let _ = tx.send(out);
    });
    let res = rx.recv_timeout(dur).ok();
    let ms = start.elapsed().as_millis() as u64;
    if res.is_none() {
        (None, Some(format!("{label}_timeout")), ms)
    } else {
        (res, None, ms)
    }
}

/// Runs `program args..` and returns stdout. Non-zero exit is an error.
pub fn run_command(program: &str, args: &[&str]) -> Result<String> {
    let out = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .with_context(|| format!("spawn {program}"))?;
    if !out.status.success() {
        return Err(anyhow!("{program} exited with {}", out.status));
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

/// First whitespace-trimmed integer in `s`, if any.
pub fn parse_leading_u64(s: &str) -> Option<u64> {
    let t = s.trim();
    let end = t
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(t.len());
    t[..end].parse().ok()
}
