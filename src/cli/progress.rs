//! Progress bar and summary reporting for CLI downloads.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::format::format_duration;
use crate::{Messages, RunSummary};

const SEPARATOR: &str = "────────────────────────────────────────────────────────────";

/// Bar for the item currently downloading: percent, counter prefix, status
/// message.
pub fn make_item_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    let style = ProgressStyle::with_template(
        "{spinner:.cyan} {prefix:>10} [{bar:40.cyan/blue}] {pos:>3}% {wide_msg}",
    )
    .map_or_else(|_| ProgressStyle::default_bar(), |s| s.progress_chars("━━╌"));
    bar.set_style(style);
    bar
}

/// Prints the tracks queued from one link.
pub fn print_fetched(link: &str, count: usize) {
    println!("  {link} ... {count} track(s)");
}

pub fn print_failure(bar: &ProgressBar, label: &str, error: &str) {
    bar.println(format!("  {} {label}: {error}", style("✗").red()));
}

/// Prints the totals of a finished run.
pub fn print_summary(summary: &RunSummary, messages: &Messages) {
    println!("\n{SEPARATOR}");
    println!("{}", style(&messages.done).bold());
    println!("{SEPARATOR}");
    println!("  Tracks selected:   {}", summary.total);
    println!("  Downloaded:        {}", style(summary.succeeded).green());
    if summary.failed > 0 {
        println!("  Failed:            {}", style(summary.failed).red());
    }
    println!("  Total time:        {}", format_duration(summary.elapsed));
    println!("{SEPARATOR}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_bar_counts_percent() {
        let bar = make_item_bar();
        assert_eq!(bar.length(), Some(100));
        bar.set_position(42);
        assert_eq!(bar.position(), 42);
    }
}
