//! Run progress counters and the text rendered from them.

/// Tracks "current index of total" and the percent of the current item.
///
/// The counter and status strings are pure functions of the two counters and
/// the current label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressTracker {
    total: usize,
    completed: usize,
    label: Option<String>,
    percent: u8,
}

impl ProgressTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a run of `total` items.
    pub fn begin_run(&mut self, total: usize) {
        self.total = total;
        self.completed = 0;
        self.label = None;
        self.percent = 0;
    }

    /// Sets the label of the item now downloading without counting anything.
    pub fn set_label(&mut self, label: Option<&str>) {
        self.label = label.map(str::to_string);
    }

    /// Counts one finished item and moves the label to the next one.
    ///
    /// The count never exceeds the total captured at run start.
    pub fn advance(&mut self, next_label: Option<&str>) {
        self.completed = (self.completed + 1).min(self.total);
        self.set_label(next_label);
        self.percent = 0;
    }

    /// Records a percent signal. Values outside `0..=100` are dropped and the
    /// previous value is kept; returns whether the value was accepted.
    pub fn percent(&mut self, value: i64) -> bool {
        match u8::try_from(value) {
            Ok(p) if p <= 100 => {
                self.percent = p;
                true
            }
            _ => false,
        }
    }

    /// "{completed} of {total}".
    #[must_use]
    pub fn counter_text(&self) -> String {
        format!("{} of {}", self.completed, self.total)
    }

    /// "Downloading: {label}", or "Download complete" once nothing is left.
    #[must_use]
    pub fn status_text(&self) -> String {
        self.label.as_ref().map_or_else(
            || "Download complete".to_string(),
            |label| format!("Downloading: {label}"),
        )
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub const fn completed(&self) -> usize {
        self.completed
    }

    #[must_use]
    pub const fn current_percent(&self) -> u8 {
        self.percent
    }
}
