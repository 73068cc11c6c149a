/// Fuzzer process control: find running fuzzer processes by command-line
/// pattern and stop them gracefully.
///
/// SIGTERM (not SIGKILL) so the fuzzer can flush its own state on the
/// way out.
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::path::Path;

/// Seam between the monitor loop and real signal delivery; tests
/// substitute a recording stub.
pub trait ProcessControl {
    /// PIDs whose command line matches the configured pattern.
    /// An empty result is a legitimate state, not an error.
    fn locate_pids(&self) -> Vec<i32>;

    /// SIGTERM every matching PID; returns how many were signalled.
    /// A no-op when nothing matches.
    fn terminate(&self) -> usize;
}

/// Locates fuzzer processes by scanning `/proc/<pid>/cmdline` for a
/// substring match.
pub struct FuzzerProcessController {
    pattern: String,
}

impl FuzzerProcessController {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

/// cmdline files are NUL-separated argv; join with spaces for matching.
fn cmdline_matches(raw: &[u8], pattern: &str) -> bool {
    let joined: String = raw
        .iter()
        .map(|&b| if b == 0 { ' ' } else { b as char })
        .collect();
    joined.contains(pattern)
}

fn scan_proc(proc_root: &Path, pattern: &str, own_pid: i32) -> Vec<i32> {
    let Ok(entries) = std::fs::read_dir(proc_root) else {
        return Vec::new();
    };

    let mut pids = Vec::new();
    for entry in entries.flatten() {
        let Some(pid) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.parse::<i32>().ok())
        else {
            continue;
        };
        if pid == own_pid {
            continue;
        }
        // Processes can exit between readdir and read; treat as absent.
        let Ok(raw) = std::fs::read(entry.path().join("cmdline")) else {
            continue;
        };
        if !raw.is_empty() && cmdline_matches(&raw, pattern) {
            pids.push(pid);
        }
    }
    pids.sort_unstable();
    pids
}

impl ProcessControl for FuzzerProcessController {
    fn locate_pids(&self) -> Vec<i32> {
        scan_proc(Path::new("/proc"), &self.pattern, std::process::id() as i32)
    }

    fn terminate(&self) -> usize {
        let pids = self.locate_pids();
        if pids.is_empty() {
            tracing::info!(pattern = %self.pattern, "no fuzzer processes found to stop");
            return 0;
        }

        let mut stopped = 0;
        for pid in pids {
            match kill(Pid::from_raw(pid), Signal::SIGTERM) {
                Ok(()) => {
                    tracing::info!(pid, "stopping fuzzer process");
                    stopped += 1;
                }
                Err(e) => {
                    // Racing against process exit is expected here.
                    tracing::warn!(pid, error = %e, "failed to signal fuzzer process");
                }
            }
        }
        stopped
    }
}
