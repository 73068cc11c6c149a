/// Stats file parsing: reads the fuzzer's live `key: value` stats file
/// into an immutable snapshot of named counters.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A single counter value: AFL++ stats files mix numeric counters with
/// free-text fields (banner, command line, timestamps).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(u64),
    Text(String),
}

/// One point-in-time reading of the stats file.
///
/// No identity beyond its contents; two snapshots compare structurally.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    fields: HashMap<String, Value>,
}

impl Snapshot {
    /// Numeric counter lookup. Absent or non-numeric fields read as 0,
    /// so callers never scatter fallback literals.
    pub fn counter(&self, name: &str) -> u64 {
        match self.fields.get(name) {
            Some(Value::Int(n)) => *n,
            _ => 0,
        }
    }

    /// Whether the counter is present at all (rendering distinguishes
    /// "absent" from "zero").
    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Raw field lookup, used for equality on marker fields like
    /// `last_find` where only sameness matters, not the value.
    pub fn marker(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, Value)]) -> Self {
        Self {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }
}

/// Errors reading the stats file. Both variants are terminal for the
/// monitor loop: a vanished stats file means the fuzzing job is gone.
#[derive(Debug)]
pub enum StatsError {
    /// The stats file does not exist.
    NotFound { path: PathBuf },
    /// Any other I/O failure while reading.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for StatsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatsError::NotFound { path } => {
                write!(f, "stats file {} does not exist", path.display())
            }
            StatsError::Read { path, source } => {
                write!(f, "failed to read stats file {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for StatsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StatsError::NotFound { .. } => None,
            StatsError::Read { source, .. } => Some(source),
        }
    }
}

/// Parse stats file contents. A line is significant only if it contains
/// a `:`; the first `:` splits key from value, both sides trimmed.
/// All-digit values become integers, everything else stays text.
fn parse(contents: &str) -> Snapshot {
    let mut fields = HashMap::new();
    for line in contents.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() {
            continue;
        }
        let parsed = if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            match value.parse::<u64>() {
                Ok(n) => Value::Int(n),
                Err(_) => Value::Text(value.to_string()),
            }
        } else {
            Value::Text(value.to_string())
        };
        fields.insert(key.to_string(), parsed);
    }
    Snapshot { fields }
}

/// Read and parse the stats file at `path`.
pub fn read_snapshot(path: &Path) -> Result<Snapshot, StatsError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StatsError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            StatsError::Read {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    Ok(parse(&contents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_numeric_value() {
        let snap = parse("corpus_count: 42\n");
        assert_eq!(snap.marker("corpus_count"), Some(&Value::Int(42)));
        assert_eq!(snap.counter("corpus_count"), 42);
    }

    #[test]
    fn test_parse_text_value() {
        let snap = parse("note: not a number\n");
        assert_eq!(
            snap.marker("note"),
            Some(&Value::Text("not a number".to_string()))
        );
        // Text fields read as 0 through the counter accessor
        assert_eq!(snap.counter("note"), 0);
    }

    #[test]
    fn test_line_without_colon_ignored() {
        let snap = parse("banner text\ncorpus_count: 1\n");
        assert!(!snap.has("banner text"));
        assert!(snap.has("corpus_count"));
    }

    #[test]
    fn test_first_colon_splits() {
        let snap = parse("command_line: afl-fuzz -i in -o out: extra\n");
        assert_eq!(
            snap.marker("command_line"),
            Some(&Value::Text("afl-fuzz -i in -o out: extra".to_string()))
        );
    }

    #[test]
    fn test_whitespace_trimmed() {
        let snap = parse("  execs_done  :   12345  \n");
        assert_eq!(snap.counter("execs_done"), 12345);
    }

    #[test]
    fn test_negative_number_stays_text() {
        let snap = parse("delta: -5\n");
        assert_eq!(snap.marker("delta"), Some(&Value::Text("-5".to_string())));
    }

    #[test]
    fn test_empty_value_stays_text() {
        let snap = parse("empty:\n");
        assert_eq!(snap.marker("empty"), Some(&Value::Text(String::new())));
        assert_eq!(snap.counter("empty"), 0);
    }

    #[test]
    fn test_absent_counter_defaults_to_zero() {
        let snap = parse("");
        assert_eq!(snap.counter("time_wo_finds"), 0);
        assert!(!snap.has("time_wo_finds"));
    }

    #[test]
    fn test_realistic_afl_stats() {
        let contents = "\
start_time        : 1718000000
last_find         : 1718003600
cycles_done       : 3
corpus_count      : 1204
saved_crashes     : 2
saved_hangs       : 0
execs_done        : 8422901
edges_found       : 1822
total_edges       : 65536
time_wo_finds     : 120
afl_banner        : target_bin
";
        let snap = parse(contents);
        assert_eq!(snap.counter("cycles_done"), 3);
        assert_eq!(snap.counter("saved_crashes"), 2);
        assert_eq!(snap.counter("time_wo_finds"), 120);
        assert_eq!(snap.marker("last_find"), Some(&Value::Int(1718003600)));
        assert_eq!(
            snap.marker("afl_banner"),
            Some(&Value::Text("target_bin".to_string()))
        );
    }

    #[test]
    fn test_read_snapshot_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fuzzer_stats");
        let err = read_snapshot(&path).unwrap_err();
        assert!(matches!(err, StatsError::NotFound { .. }));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_read_snapshot_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fuzzer_stats");
        std::fs::write(&path, "corpus_count: 7\n").unwrap();
        let snap = read_snapshot(&path).unwrap();
        assert_eq!(snap.counter("corpus_count"), 7);
    }
}
