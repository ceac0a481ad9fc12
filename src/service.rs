//! Mailbox-driven runtime around the [`Orchestrator`].
//!
//! A [`Service`] owns the orchestrator and processes one [`Command`] at a
//! time from an unbounded channel. Downloads run in spawned tasks and post
//! their percent and completion signals back into the same channel, so every
//! state transition happens on the service's single control sequence and no
//! lock is held while a download is in progress.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::catalog::{self, Catalog};
use crate::downloader::{PercentSink, TrackDownloader};
use crate::error::{Error, Locked, Result};
use crate::item::{CatalogId, Item};
use crate::link::parse_link;
use crate::orchestrator::{
    Dispatch, ItemOutcome, Orchestrator, RunStatus, RunSummary, Snapshot, StartOutcome, Step,
    Ticket,
};
use crate::session::{AuthState, Authenticator, Credentials, SessionGate};

/// Notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    SessionResolved(AuthState),
    /// "Downloading: {label}" style status line.
    Status(String),
    /// "N of M" counter line.
    Counter(String),
    Percent(u8),
    ItemFailed { label: String, error: String },
    RunCompleted(RunSummary),
    /// A run was requested with nothing selected.
    NothingToDo,
    Cancelled,
}

/// Result of [`ServiceHandle::start_run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStart {
    Started,
    NothingToDo,
    AlreadyRunning,
    Rejected(Locked),
}

type Reply<T> = oneshot::Sender<T>;

enum Command {
    Gate { reply: Reply<SessionGate> },
    ResolveSession { accepted: bool, reply: Reply<Result<AuthState>> },
    Add { items: Vec<Item>, reply: Reply<std::result::Result<usize, Locked>> },
    Remove { ids: Vec<CatalogId>, reply: Reply<std::result::Result<usize, Locked>> },
    RemoveSelected { reply: Reply<std::result::Result<usize, Locked>> },
    Select { id: CatalogId, reply: Reply<std::result::Result<bool, Locked>> },
    Deselect { id: CatalogId, reply: Reply<std::result::Result<bool, Locked>> },
    SelectAll { reply: Reply<std::result::Result<(), Locked>> },
    ClearSelection { reply: Reply<std::result::Result<(), Locked>> },
    StartRun { reply: Reply<RunStart> },
    Cancel { reply: Reply<bool> },
    Snapshot { reply: Reply<Snapshot> },
    Percent { ticket: Ticket, value: i64 },
    Completed { ticket: Ticket, outcome: ItemOutcome },
}

/// Forwards a download task's percent signals into the mailbox.
struct TicketSink {
    ticket: Ticket,
    tx: mpsc::UnboundedSender<Command>,
}

impl PercentSink for TicketSink {
    fn percent(&self, value: i64) {
        let _ = self.tx.send(Command::Percent {
            ticket: self.ticket,
            value,
        });
    }
}

/// The orchestrator's single consumer.
pub struct Service {
    orchestrator: Orchestrator,
    downloader: Arc<dyn TrackDownloader>,
    commands: mpsc::UnboundedReceiver<Command>,
    loopback: mpsc::WeakUnboundedSender<Command>,
    events: mpsc::UnboundedSender<ServiceEvent>,
    in_flight: Option<CancellationToken>,
}

impl Service {
    /// Spawns the service on the current tokio runtime.
    ///
    /// The service stops once every [`ServiceHandle`] is dropped and no
    /// download task is left running.
    #[must_use]
    pub fn spawn(
        downloader: Arc<dyn TrackDownloader>,
    ) -> (ServiceHandle, mpsc::UnboundedReceiver<ServiceEvent>) {
        let (tx, commands) = mpsc::unbounded_channel();
        let (events, events_rx) = mpsc::unbounded_channel();
        let service = Self {
            orchestrator: Orchestrator::new(),
            downloader,
            commands,
            loopback: tx.downgrade(),
            events,
            in_flight: None,
        };
        tokio::spawn(service.run());
        (ServiceHandle { tx }, events_rx)
    }

    async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            self.handle(command);
        }
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        log::debug!("Download service stopped");
    }

    fn emit(&self, event: ServiceEvent) {
        let _ = self.events.send(event);
    }

    fn emit_progress(&self) {
        let progress = self.orchestrator.progress();
        self.emit(ServiceEvent::Counter(progress.counter_text()));
        self.emit(ServiceEvent::Status(progress.status_text()));
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Gate { reply } => {
                let _ = reply.send(self.orchestrator.gate().clone());
            }
            Command::ResolveSession { accepted, reply } => {
                let result = self.orchestrator.resolve_session(accepted);
                if let Ok(state) = result {
                    self.emit(ServiceEvent::SessionResolved(state));
                }
                let _ = reply.send(result);
            }
            Command::Add { items, reply } => {
                let _ = reply.send(self.orchestrator.extend(items));
            }
            Command::Remove { ids, reply } => {
                let _ = reply.send(self.orchestrator.remove(&ids));
            }
            Command::RemoveSelected { reply } => {
                let _ = reply.send(self.orchestrator.remove_selected());
            }
            Command::Select { id, reply } => {
                let _ = reply.send(self.orchestrator.select(&id));
            }
            Command::Deselect { id, reply } => {
                let _ = reply.send(self.orchestrator.deselect(&id));
            }
            Command::SelectAll { reply } => {
                let _ = reply.send(self.orchestrator.select_all());
            }
            Command::ClearSelection { reply } => {
                let _ = reply.send(self.orchestrator.clear_selection());
            }
            Command::StartRun { reply } => {
                let start = match self.orchestrator.start_run() {
                    StartOutcome::Dispatch(dispatch) => {
                        self.dispatch(dispatch);
                        RunStart::Started
                    }
                    StartOutcome::NothingToDo => {
                        self.emit(ServiceEvent::NothingToDo);
                        RunStart::NothingToDo
                    }
                    StartOutcome::AlreadyRunning => RunStart::AlreadyRunning,
                    StartOutcome::Rejected(reason) => RunStart::Rejected(reason),
                };
                let _ = reply.send(start);
            }
            Command::Cancel { reply } => {
                let cancelled = self.orchestrator.cancel();
                if cancelled {
                    if let Some(token) = self.in_flight.take() {
                        token.cancel();
                    }
                    self.emit(ServiceEvent::Cancelled);
                }
                let _ = reply.send(cancelled);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.orchestrator.snapshot());
            }
            Command::Percent { ticket, value } => {
                if let Some(percent) = self.orchestrator.on_percent(ticket, value) {
                    self.emit(ServiceEvent::Percent(percent));
                }
            }
            Command::Completed { ticket, outcome } => self.complete(ticket, outcome),
        }
    }

    fn complete(&mut self, ticket: Ticket, outcome: ItemOutcome) {
        let label = self
            .orchestrator
            .in_flight(ticket)
            .map(|item| item.label().to_string());
        let failure = match &outcome {
            ItemOutcome::Failed(error) => Some(error.clone()),
            ItemOutcome::Succeeded => None,
        };

        match self.orchestrator.on_item_completed(ticket, outcome) {
            Step::Ignored => {}
            Step::Next(dispatch) => {
                self.report_failure(label, failure);
                self.dispatch(dispatch);
            }
            Step::Finished(summary) => {
                self.in_flight = None;
                self.report_failure(label, failure);
                self.emit_progress();
                self.emit(ServiceEvent::RunCompleted(summary));
            }
        }
    }

    fn report_failure(&self, label: Option<String>, failure: Option<String>) {
        if let (Some(label), Some(error)) = (label, failure) {
            self.emit(ServiceEvent::ItemFailed { label, error });
        }
    }

    /// Spawns the download task for one dispatched item.
    fn dispatch(&mut self, dispatch: Dispatch) {
        let Some(tx) = self.loopback.upgrade() else {
            log::error!("Download service is shutting down; abandoning run");
            self.orchestrator.cancel();
            return;
        };
        self.emit_progress();

        let Dispatch { ticket, item } = dispatch;
        log::debug!("Trying: {}", item.label());

        let token = CancellationToken::new();
        self.in_flight = Some(token.clone());
        let downloader = Arc::clone(&self.downloader);

        tokio::spawn(async move {
            let sink = TicketSink {
                ticket,
                tx: tx.clone(),
            };
            let download = AssertUnwindSafe(downloader.download(&item, &sink)).catch_unwind();
            let outcome = tokio::select! {
                result = download => match result {
                    Ok(Ok(())) => ItemOutcome::Succeeded,
                    Ok(Err(e)) => ItemOutcome::Failed(e.to_string()),
                    Err(_) => ItemOutcome::Failed("downloader panicked".to_string()),
                },
                () = token.cancelled() => ItemOutcome::Failed(Error::Cancelled.to_string()),
            };
            let _ = tx.send(Command::Completed { ticket, outcome });
        });
    }
}

/// Cloneable front end to a running [`Service`].
#[derive(Clone)]
pub struct ServiceHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl ServiceHandle {
    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .map_err(|_| Error::ServiceStopped)?;
        rx.await.map_err(|_| Error::ServiceStopped)
    }

    /// Logs in and resolves the session gate with the outcome. A rejected
    /// login is returned as `Ok(AuthState::Rejected)` and is terminal.
    ///
    /// The handshake runs on a copy of the service's gate so the mailbox
    /// keeps serving commands meanwhile; only the outcome is sent back.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionAlreadyResolved`] without contacting the
    /// remote service if the session already has an outcome.
    pub async fn authenticate(
        &self,
        authenticator: &dyn Authenticator,
        credentials: &Credentials,
    ) -> Result<AuthState> {
        let mut gate = self.request(|reply| Command::Gate { reply }).await?;
        gate.authenticate(authenticator, credentials).await?;
        let accepted = gate.is_open();
        self.request(|reply| Command::ResolveSession { accepted, reply })
            .await?
    }

    /// Validates a pasted link, fetches its items and queues them.
    ///
    /// # Errors
    ///
    /// Invalid links are rejected before any fetch; a locked session or a
    /// running download refuses the queueing; fetch failures queue nothing.
    pub async fn add_link(&self, catalog: &dyn Catalog, text: &str) -> Result<usize> {
        let link = parse_link(text)?;
        let snapshot = self.snapshot().await?;
        match snapshot.auth {
            AuthState::Authenticated => {}
            AuthState::Unknown => return Err(Locked::NotAuthenticated.into()),
            AuthState::Rejected => return Err(Locked::SessionRejected.into()),
        }
        if snapshot.status == RunStatus::Running {
            return Err(Locked::RunInProgress.into());
        }
        let items = catalog::resolve(catalog, &link).await?;
        self.add_items(items).await
    }

    /// Queues already-resolved items at the end.
    ///
    /// # Errors
    ///
    /// Fails if the session is locked or a run is in progress.
    pub async fn add_items(&self, items: Vec<Item>) -> Result<usize> {
        Ok(self
            .request(|reply| Command::Add { items, reply })
            .await??)
    }

    /// Removes items by identity; allowed during a run.
    ///
    /// # Errors
    ///
    /// Fails if the session is not authenticated.
    pub async fn remove(&self, ids: Vec<CatalogId>) -> Result<usize> {
        Ok(self
            .request(|reply| Command::Remove { ids, reply })
            .await??)
    }

    /// # Errors
    ///
    /// Fails if the session is locked or a run is in progress.
    pub async fn remove_selected(&self) -> Result<usize> {
        Ok(self
            .request(|reply| Command::RemoveSelected { reply })
            .await??)
    }

    /// # Errors
    ///
    /// Fails if the session is locked or a run is in progress.
    pub async fn select(&self, id: CatalogId) -> Result<bool> {
        Ok(self
            .request(|reply| Command::Select { id, reply })
            .await??)
    }

    /// # Errors
    ///
    /// Fails if the session is locked or a run is in progress.
    pub async fn deselect(&self, id: CatalogId) -> Result<bool> {
        Ok(self
            .request(|reply| Command::Deselect { id, reply })
            .await??)
    }

    /// # Errors
    ///
    /// Fails if the session is locked or a run is in progress.
    pub async fn select_all(&self) -> Result<()> {
        Ok(self
            .request(|reply| Command::SelectAll { reply })
            .await??)
    }

    /// # Errors
    ///
    /// Fails if the session is locked or a run is in progress.
    pub async fn clear_selection(&self) -> Result<()> {
        Ok(self
            .request(|reply| Command::ClearSelection { reply })
            .await??)
    }

    /// Starts a run over the selected items.
    ///
    /// # Errors
    ///
    /// Fails only if the service has stopped.
    pub async fn start_run(&self) -> Result<RunStart> {
        self.request(|reply| Command::StartRun { reply }).await
    }

    /// Abandons the current run. Returns whether a run was cancelled.
    ///
    /// # Errors
    ///
    /// Fails only if the service has stopped.
    pub async fn cancel(&self) -> Result<bool> {
        self.request(|reply| Command::Cancel { reply }).await
    }

    /// # Errors
    ///
    /// Fails only if the service has stopped.
    pub async fn snapshot(&self) -> Result<Snapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }
}
