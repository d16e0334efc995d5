//! Serialized command service
//!
//! A single task owns the [`FilterSync`] and drains a queue of requests one
//! at a time, so two commands can never interleave their map, persist, and
//! enforce steps. Any number of front ends hold a cloned [`ServiceHandle`].
//!
//! The task runs startup reconciliation before it reads the queue; requests
//! sent while loading simply wait their turn.

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::protocol::{Reply, Request};
use crate::rule::{FilterRule, RuleId};
use crate::sync::{CheckReport, FilterSync, Phase};
use crate::{Error, Result};

/// Default number of requests that may wait in the queue
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

struct Envelope {
    request: Request,
    reply: oneshot::Sender<Result<Reply>>,
}

/// Spawns the task that hosts a [`FilterSync`]
pub struct FilterService;

impl FilterService {
    /// Spawn the service with the default queue depth
    ///
    /// The join handle yields the core back once every handle is dropped.
    pub fn spawn(sync: FilterSync) -> (ServiceHandle, JoinHandle<FilterSync>) {
        Self::spawn_with_capacity(sync, DEFAULT_QUEUE_DEPTH)
    }

    /// Spawn the service with a bounded queue of `capacity` requests
    pub fn spawn_with_capacity(
        sync: FilterSync,
        capacity: usize,
    ) -> (ServiceHandle, JoinHandle<FilterSync>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (phase_tx, phase_rx) = watch::channel(sync.phase());
        let task = tokio::spawn(run(sync, rx, phase_tx));
        (
            ServiceHandle {
                tx,
                phase: phase_rx,
            },
            task,
        )
    }
}

async fn run(
    mut sync: FilterSync,
    mut rx: mpsc::Receiver<Envelope>,
    phase: watch::Sender<Phase>,
) -> FilterSync {
    bring_up(&mut sync, &phase).await;

    while let Some(envelope) = rx.recv().await {
        // A failed startup is retried by the next command rather than a timer
        if sync.phase() != Phase::Ready {
            bring_up(&mut sync, &phase).await;
        }

        let kind = envelope.request.kind();
        tracing::debug!(request = kind, "Executing command");
        let result = execute(&mut sync, envelope.request).await;
        if let Err(e) = &result {
            tracing::debug!(request = kind, error = %e, "Command failed");
        }
        if envelope.reply.send(result).is_err() {
            tracing::debug!(request = kind, "Requester went away before the reply");
        }
    }

    tracing::info!("All handles dropped, filter service stopping");
    sync
}

async fn bring_up(sync: &mut FilterSync, phase: &watch::Sender<Phase>) {
    phase.send_replace(Phase::Loading);
    if let Err(e) = sync.start().await {
        tracing::error!(error = %e, "Startup reconciliation failed");
    }
    phase.send_replace(sync.phase());
}

async fn execute(sync: &mut FilterSync, request: Request) -> Result<Reply> {
    match request {
        Request::AddFilter { pattern } => sync.add(&pattern).await.map(Reply::Rule),
        Request::RemoveFilter { id } => sync.remove(id).await.map(Reply::Removed),
        Request::ToggleFilter { id } => sync.toggle(id).await.map(Reply::Toggled),
        Request::GetFilters => sync.list().map(Reply::Rules),
        Request::ClearAll => sync.clear_all().await.map(|()| Reply::Cleared),
        Request::CheckSync => sync.check().await.map(Reply::Check),
    }
}

/// Cloneable entry point to the command queue
#[derive(Clone)]
pub struct ServiceHandle {
    tx: mpsc::Sender<Envelope>,
    phase: watch::Receiver<Phase>,
}

impl ServiceHandle {
    /// Queue a request and wait for its result
    pub async fn call(&self, request: Request) -> Result<Reply> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope { request, reply })
            .await
            .map_err(|_| Error::ServiceClosed)?;
        rx.await.map_err(|_| Error::ServiceClosed)?
    }

    /// Handle one raw wire request and produce its raw reply
    pub async fn dispatch(&self, raw: Value) -> Value {
        if let Some(reply) = Request::unassignable_id_reply(&raw) {
            return reply.to_value();
        }
        let result = match Request::from_value(raw) {
            Ok(request) => self.call(request).await,
            Err(e) => Err(e),
        };
        Reply::from(result).to_value()
    }

    /// Last phase reported by the service task
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Wait until the core has finished startup reconciliation
    pub async fn ready(&self) -> Result<()> {
        let mut phase = self.phase.clone();
        phase
            .wait_for(|p| *p == Phase::Ready)
            .await
            .map(|_| ())
            .map_err(|_| Error::ServiceClosed)
    }

    pub async fn add(&self, pattern: impl Into<String>) -> Result<FilterRule> {
        match self.call(Request::AddFilter { pattern: pattern.into() }).await? {
            Reply::Rule(rule) => Ok(rule),
            other => Err(unexpected(other)),
        }
    }

    pub async fn remove(&self, id: RuleId) -> Result<bool> {
        match self.call(Request::RemoveFilter { id }).await? {
            Reply::Removed(removed) => Ok(removed),
            other => Err(unexpected(other)),
        }
    }

    pub async fn toggle(&self, id: RuleId) -> Result<Option<FilterRule>> {
        match self.call(Request::ToggleFilter { id }).await? {
            Reply::Toggled(rule) => Ok(rule),
            other => Err(unexpected(other)),
        }
    }

    pub async fn list(&self) -> Result<Vec<FilterRule>> {
        match self.call(Request::GetFilters).await? {
            Reply::Rules(rules) => Ok(rules),
            other => Err(unexpected(other)),
        }
    }

    pub async fn clear_all(&self) -> Result<()> {
        match self.call(Request::ClearAll).await? {
            Reply::Cleared => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn check(&self) -> Result<CheckReport> {
        match self.call(Request::CheckSync).await? {
            Reply::Check(report) => Ok(report),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(reply: Reply) -> Error {
    Error::InvalidRequest {
        message: format!("unexpected reply {:?}", reply),
    }
}
