use std::sync::Arc;

use kameo::actor::{ActorRef, WeakActorRef};
use kameo::error::{ActorStopReason, BoxError};
use kameo::message::{Context, Message};
use kameo::request::MessageSend;
use kameo::{mailbox::unbounded::UnboundedMailbox, Actor};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::access::{HistoryStore, TriageRecord};

#[derive(Error, Debug, Clone)]
pub enum HistoryError {
    #[error("History writer unavailable: {0}")]
    Unavailable(String),
}

/// History actor messages for telling (fire-and-forget)
#[derive(Debug, Clone)]
pub enum HistoryTell {
    /// Persist one assessment
    Record(Box<TriageRecord>),
}

/// History actor messages for asking (request-response)
#[derive(Debug, Clone)]
pub enum HistoryAsk {
    GetStats,
}

/// Write counters since startup
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub saved: u64,
    pub failed: u64,
    pub last_error: Option<String>,
}

/// Owns the history store; writes happen off the request path
pub struct HistoryActor {
    store: Arc<dyn HistoryStore>,
    stats: HistoryStats,
}

impl HistoryActor {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self {
            store,
            stats: HistoryStats::default(),
        }
    }

    async fn write(&mut self, record: &TriageRecord) {
        match self.store.record(record).await {
            Ok(()) => {
                self.stats.saved += 1;
                debug!(app = %record.app_name, diagnosis = %record.diagnosis, "History record saved");
            }
            Err(e) => {
                self.stats.failed += 1;
                self.stats.last_error = Some(e.to_string());
                warn!(app = %record.app_name, "Failed to save history record: {}", e);
            }
        }
    }
}

impl Actor for HistoryActor {
    type Mailbox = UnboundedMailbox<Self>;

    fn name() -> &'static str {
        "HistoryActor"
    }

    async fn on_start(&mut self, _actor_ref: ActorRef<Self>) -> Result<(), BoxError> {
        info!("HistoryActor started");
        Ok(())
    }

    async fn on_stop(&mut self, _actor_ref: WeakActorRef<Self>, reason: ActorStopReason) -> Result<(), BoxError> {
        info!(
            saved = self.stats.saved,
            failed = self.stats.failed,
            "HistoryActor stopping: {:?}",
            reason
        );
        Ok(())
    }
}

impl Message<HistoryTell> for HistoryActor {
    type Reply = ();

    async fn handle(&mut self, msg: HistoryTell, _ctx: Context<'_, Self, Self::Reply>) -> Self::Reply {
        match msg {
            HistoryTell::Record(record) => self.write(&record).await,
        }
    }
}

impl Message<HistoryAsk> for HistoryActor {
    type Reply = Result<HistoryStats, HistoryError>;

    async fn handle(&mut self, msg: HistoryAsk, _ctx: Context<'_, Self, Self::Reply>) -> Self::Reply {
        match msg {
            HistoryAsk::GetStats => Ok(self.stats.clone()),
        }
    }
}

/// Cloneable sender side used by request handlers
#[derive(Clone)]
pub struct HistoryHandle {
    actor: ActorRef<HistoryActor>,
}

impl HistoryHandle {
    pub fn spawn(store: Arc<dyn HistoryStore>) -> Self {
        Self {
            actor: kameo::spawn(HistoryActor::new(store)),
        }
    }

    /// Queue a record without waiting for the write
    pub async fn record(&self, record: TriageRecord) {
        let app = record.app_name.clone();
        if let Err(e) = self.actor.tell(HistoryTell::Record(Box::new(record))).send().await {
            warn!(app = %app, "Failed to queue history record: {}", e);
        }
    }

    pub async fn stats(&self) -> Result<HistoryStats, HistoryError> {
        self.actor
            .ask(HistoryAsk::GetStats)
            .send()
            .await
            .map_err(|e| HistoryError::Unavailable(e.to_string()))
    }
}
