//! The download sequencing state machine.
//!
//! [`Orchestrator`] is synchronous and does no I/O. It hands out a
//! [`Dispatch`] for each item that should be downloaded next and expects the
//! caller to report the outcome back through [`Orchestrator::on_item_completed`]
//! with the same [`Ticket`]. The [`crate::service`] module drives it from a
//! single-consumer mailbox.

use std::time::{Duration, Instant};

use crate::error::Locked;
use crate::format::format_duration;
use crate::item::{CatalogId, Item};
use crate::progress::ProgressTracker;
use crate::selection::SelectionSet;
use crate::session::{AuthState, SessionGate};

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Completed,
}

/// Identifies one dispatched download. Signals carrying any other ticket than
/// the in-flight one are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// An item the caller must now download.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub ticket: Ticket,
    pub item: Item,
}

/// Result of asking for a run to start.
#[derive(Debug)]
pub enum StartOutcome {
    /// The run started; download this item.
    Dispatch(Dispatch),
    /// Nothing is selected. No download was issued and no counter changed.
    NothingToDo,
    AlreadyRunning,
    Rejected(Locked),
}

/// How a single download ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Succeeded,
    Failed(String),
}

/// What to do after a completion signal.
#[derive(Debug)]
pub enum Step {
    /// Stale or unexpected signal; nothing changed.
    Ignored,
    Next(Dispatch),
    Finished(RunSummary),
}

/// Totals for one finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Selected count captured when the run started.
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// Point-in-time view for presentation layers.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub auth: AuthState,
    pub status: RunStatus,
    pub counter_text: String,
    pub status_text: String,
    pub percent: u8,
    pub completed: usize,
    pub total: usize,
    pub current: Option<Item>,
    pub queued: Vec<Item>,
    pub selected: Vec<CatalogId>,
}

#[derive(Debug)]
struct RunState {
    total: usize,
    current: Item,
    ticket: Ticket,
    succeeded: usize,
    failed: usize,
    started: Instant,
    last_signal: Instant,
}

/// Serializes downloads of the selected items, one at a time.
#[derive(Debug, Default)]
pub struct Orchestrator {
    gate: SessionGate,
    selection: SelectionSet,
    progress: ProgressTracker,
    status: RunStatus,
    run: Option<RunState>,
    next_ticket: u64,
}

impl Orchestrator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers the session's login outcome.
    ///
    /// # Errors
    ///
    /// Fails if the session was already resolved.
    pub fn resolve_session(&mut self, accepted: bool) -> crate::Result<AuthState> {
        self.gate.resolve(accepted)
    }

    #[must_use]
    pub const fn gate(&self) -> &SessionGate {
        &self.gate
    }

    #[must_use]
    pub const fn auth_state(&self) -> AuthState {
        self.gate.state()
    }

    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    #[must_use]
    pub const fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    #[must_use]
    pub const fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    /// The item currently downloading, if any.
    #[must_use]
    pub fn current_item(&self) -> Option<&Item> {
        self.run.as_ref().map(|run| &run.current)
    }

    /// The in-flight item, only if `ticket` is the in-flight dispatch.
    #[must_use]
    pub fn in_flight(&self, ticket: Ticket) -> Option<&Item> {
        self.run
            .as_ref()
            .filter(|run| run.ticket == ticket)
            .map(|run| &run.current)
    }

    /// Time since the in-flight download last signalled anything. The
    /// orchestrator never times a download out; embedding applications can
    /// watch this to detect a stuck downloader.
    #[must_use]
    pub fn stalled_for(&self, now: Instant) -> Option<Duration> {
        self.run
            .as_ref()
            .map(|run| now.saturating_duration_since(run.last_signal))
    }

    fn editable(&self) -> Result<(), Locked> {
        self.gate.check()?;
        if self.status == RunStatus::Running {
            return Err(Locked::RunInProgress);
        }
        Ok(())
    }

    /// Queues an item at the end.
    ///
    /// # Errors
    ///
    /// Refused unless authenticated and idle.
    pub fn add(&mut self, item: Item) -> Result<(), Locked> {
        self.editable()?;
        self.selection.add(item);
        Ok(())
    }

    /// Queues items in order, returning how many were added.
    ///
    /// # Errors
    ///
    /// Refused unless authenticated and idle.
    pub fn extend(&mut self, items: Vec<Item>) -> Result<usize, Locked> {
        self.editable()?;
        let count = items.len();
        self.selection.extend(items);
        Ok(count)
    }

    /// Removes items by identity. Allowed during a run: removing the
    /// in-flight item turns its completion into a plain advance, and removed
    /// future items are never dispatched.
    ///
    /// # Errors
    ///
    /// Refused unless authenticated.
    pub fn remove(&mut self, ids: &[CatalogId]) -> Result<usize, Locked> {
        self.gate.check()?;
        Ok(self.selection.remove_all(ids))
    }

    /// Removes every selected entry.
    ///
    /// # Errors
    ///
    /// Refused unless authenticated and idle.
    pub fn remove_selected(&mut self) -> Result<usize, Locked> {
        self.editable()?;
        Ok(self.selection.remove_selected())
    }

    /// # Errors
    ///
    /// Refused unless authenticated and idle.
    pub fn select(&mut self, id: &CatalogId) -> Result<bool, Locked> {
        self.editable()?;
        Ok(self.selection.select(id))
    }

    /// # Errors
    ///
    /// Refused unless authenticated and idle.
    pub fn deselect(&mut self, id: &CatalogId) -> Result<bool, Locked> {
        self.editable()?;
        Ok(self.selection.deselect(id))
    }

    /// # Errors
    ///
    /// Refused unless authenticated and idle.
    pub fn select_all(&mut self) -> Result<(), Locked> {
        self.editable()?;
        self.selection.select_all();
        Ok(())
    }

    /// # Errors
    ///
    /// Refused unless authenticated and idle.
    pub fn clear_selection(&mut self) -> Result<(), Locked> {
        self.editable()?;
        self.selection.clear_selection();
        Ok(())
    }

    /// Starts a run over the currently selected items.
    pub fn start_run(&mut self) -> StartOutcome {
        if let Err(reason) = self.gate.check() {
            return StartOutcome::Rejected(reason);
        }
        if self.status == RunStatus::Running {
            return StartOutcome::AlreadyRunning;
        }
        let Some(head) = self.selection.head().cloned() else {
            self.status = RunStatus::Completed;
            return StartOutcome::NothingToDo;
        };

        let total = self.selection.selected_count();
        self.progress.begin_run(total);
        self.progress.set_label(Some(head.label()));

        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        let now = Instant::now();
        self.run = Some(RunState {
            total,
            current: head.clone(),
            ticket,
            succeeded: 0,
            failed: 0,
            started: now,
            last_signal: now,
        });
        self.status = RunStatus::Running;
        log::info!("Starting run of {total} item(s)");

        StartOutcome::Dispatch(Dispatch { ticket, item: head })
    }

    /// Handles the terminal signal of a dispatched download.
    ///
    /// Success and failure both advance the queue. The finished item is
    /// removed by identity, which is a no-op if it was already removed while
    /// in flight.
    pub fn on_item_completed(&mut self, ticket: Ticket, outcome: ItemOutcome) -> Step {
        let Some(run) = self.run.as_mut().filter(|run| run.ticket == ticket) else {
            log::debug!("Ignoring stale completion for {ticket:?}");
            return Step::Ignored;
        };

        match outcome {
            ItemOutcome::Succeeded => {
                run.succeeded += 1;
                log::info!("Downloaded {}", run.current.label());
            }
            ItemOutcome::Failed(cause) => {
                run.failed += 1;
                log::warn!("Failed getting item {}: {cause}", run.current.label());
            }
        }

        self.selection.remove_all([run.current.id()]);
        let next = self.selection.head().cloned();
        self.progress.advance(next.as_ref().map(Item::label));

        let Some(item) = next else {
            let summary = RunSummary {
                total: run.total,
                succeeded: run.succeeded,
                failed: run.failed,
                elapsed: run.started.elapsed(),
            };
            self.run = None;
            self.status = RunStatus::Completed;
            log::info!(
                "Run complete in {}: {} succeeded, {} failed, {} of {} processed",
                format_duration(summary.elapsed),
                summary.succeeded,
                summary.failed,
                self.progress.completed(),
                summary.total
            );
            return Step::Finished(summary);
        };

        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        run.ticket = ticket;
        run.current = item.clone();
        run.last_signal = Instant::now();
        Step::Next(Dispatch { ticket, item })
    }

    /// Handles a percent signal. Returns the accepted value, or `None` when
    /// the ticket is stale or the value is out of range.
    pub fn on_percent(&mut self, ticket: Ticket, value: i64) -> Option<u8> {
        let run = self.run.as_mut().filter(|run| run.ticket == ticket)?;
        run.last_signal = Instant::now();
        self.progress
            .percent(value)
            .then(|| self.progress.current_percent())
    }

    /// Abandons the current run without waiting for the in-flight download.
    /// Returns whether a run was cancelled.
    pub fn cancel(&mut self) -> bool {
        if self.run.take().is_none() {
            return false;
        }
        self.status = RunStatus::Idle;
        log::info!("Run cancelled");
        true
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            auth: self.gate.state(),
            status: self.status,
            counter_text: self.progress.counter_text(),
            status_text: self.progress.status_text(),
            percent: self.progress.current_percent(),
            completed: self.progress.completed(),
            total: self.progress.total(),
            current: self.current_item().cloned(),
            queued: self.selection.items().to_vec(),
            selected: self
                .selection
                .selected()
                .map(|item| item.id().clone())
                .collect(),
        }
    }
}
