use session_features::LabelRegistry;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Correct and total predictions for one actual label
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct LabelCounts {
    correct: usize,
    total: usize,
}

/// Per-label accuracy of a batch of predictions
#[derive(Debug, Default)]
pub struct AccuracyReport {
    counts: BTreeMap<usize, LabelCounts>,
    skipped: usize,
}

impl AccuracyReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a prediction for a session whose true label is `actual`
    pub fn record(&mut self, actual: usize, predicted: usize) {
        let counts = self.counts.entry(actual).or_default();
        counts.total += 1;
        if actual == predicted {
            counts.correct += 1;
        }
    }

    pub fn skip(&mut self) {
        self.skipped += 1;
    }

    /// Number of sessions that were predicted
    pub fn total(&self) -> usize {
        self.counts.values().map(|c| c.total).sum()
    }

    pub fn correct(&self) -> usize {
        self.counts.values().map(|c| c.correct).sum()
    }

    pub fn accuracy(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.correct() as f64 / total as f64,
        }
    }

    pub fn render(&self, registry: &LabelRegistry) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = writeln!(out, "\nPer-label accuracy:");
        let _ = writeln!(
            out,
            "{:<6} {:<20} {:>8} {:>8} {:>9}",
            "Label", "Site", "Correct", "Total", "Accuracy"
        );
        let _ = writeln!(out, "{}", "-".repeat(55));
        for (&label, counts) in &self.counts {
            let _ = writeln!(
                out,
                "{:<6} {:<20} {:>8} {:>8} {:>8.2}%",
                label,
                registry.name(label),
                counts.correct,
                counts.total,
                counts.correct as f64 / counts.total.max(1) as f64 * 100.0
            );
        }
        let _ = writeln!(
            out,
            "\nOverall accuracy: {:.2}% ({}/{})",
            self.accuracy() * 100.0,
            self.correct(),
            self.total()
        );
        if self.skipped > 0 {
            let _ = writeln!(out, "Skipped sessions: {}", self.skipped);
        }
        out
    }
}
