/// Snapshot comparison: classifies the transition between consecutive
/// stats readings and renders the counters for display.
use crate::stats::Snapshot;

/// Counters whose change means the fuzzer made progress.
const WATCHED_FIELDS: [&str; 5] = [
    "last_find",
    "corpus_count",
    "saved_crashes",
    "edges_found",
    "total_edges",
];

/// How the new snapshot relates to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// No previous snapshot yet; a header line precedes the first data row.
    FirstObservation,
    /// At least one watched counter differs from the previous snapshot.
    Changed,
    /// No watched counter moved.
    Unchanged,
    /// `time_wo_finds` exceeded the configured maximum. Takes priority
    /// over every other classification.
    Stagnant { idle_secs: u64 },
}

/// Rendered counter columns for log rows and notification bodies.
/// Absent counters render as the literal "N/A".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFields {
    pub cycles: String,
    pub corpus: String,
    pub crashes: String,
    pub hangs: String,
    pub execs: String,
    pub edges: String,
    pub total_edges: String,
}

impl DisplayFields {
    pub fn render(snapshot: &Snapshot) -> Self {
        Self {
            cycles: render_counter(snapshot, "cycles_done"),
            corpus: render_counter(snapshot, "corpus_count"),
            crashes: render_counter(snapshot, "saved_crashes"),
            hangs: render_counter(snapshot, "saved_hangs"),
            execs: render_counter(snapshot, "execs_done"),
            edges: render_counter(snapshot, "edges_found"),
            total_edges: render_counter(snapshot, "total_edges"),
        }
    }
}

/// Result of comparing one tick's snapshot against the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub classification: Classification,
    /// Fires whenever `saved_crashes` moved between consecutive snapshots,
    /// independently of the classification.
    pub crash_delta: bool,
    pub display: DisplayFields,
}

/// Classify the transition from `prev` to `new`.
pub fn classify(prev: Option<&Snapshot>, new: &Snapshot, max_idle_secs: u64) -> TickReport {
    let display = DisplayFields::render(new);

    let crash_delta = match prev {
        Some(prev) => prev.counter("saved_crashes") != new.counter("saved_crashes"),
        None => false,
    };

    let idle_secs = new.counter("time_wo_finds");
    let classification = if idle_secs > max_idle_secs {
        Classification::Stagnant { idle_secs }
    } else {
        match prev {
            None => Classification::FirstObservation,
            Some(prev) if any_watched_field_differs(prev, new) => Classification::Changed,
            Some(_) => Classification::Unchanged,
        }
    };

    TickReport {
        classification,
        crash_delta,
        display,
    }
}

fn any_watched_field_differs(prev: &Snapshot, new: &Snapshot) -> bool {
    WATCHED_FIELDS.iter().any(|field| {
        if *field == "last_find" {
            // Timestamp-like marker, compared only for sameness.
            prev.marker(field) != new.marker(field)
        } else {
            prev.counter(field) != new.counter(field)
        }
    })
}

fn render_counter(snapshot: &Snapshot, name: &str) -> String {
    if snapshot.has(name) {
        group_thousands(snapshot.counter(name))
    } else {
        "N/A".to_string()
    }
}

/// Format with comma separators every three digits: 12345 -> "12,345".
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
