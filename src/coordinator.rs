//! Runs a `Session` against the outside world.
//!
//! The coordinator feeds actions into the session and executes the effects it
//! returns: generation streams and title lookups are spawned as tasks, match
//! clears become timers, and notices queue up for the transport to deliver.
//! Every task reports back through one channel as a plain `Action`; the owner
//! receives from that channel and hands each action to `dispatch`.

use std::sync::Arc;

use futures::StreamExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::config::Limits;
use crate::document::UploadedDocument;
use crate::error::GatewayError;
use crate::gateway::{Gateway, GenerationUpdate};
use crate::session::{Action, Effect, Notice, Session, SessionSnapshot, Ticket};

pub struct Coordinator<R = StdRng> {
  session: Session<R>,
  gateway: Arc<Gateway>,
  limits: Limits,
  tx: mpsc::UnboundedSender<Action>,
  notices: Vec<Notice>,
  generations: Vec<(Ticket, JoinHandle<()>)>,
  background: Vec<JoinHandle<()>>,
}

impl Coordinator<StdRng> {
  pub fn new(gateway: Arc<Gateway>, limits: Limits) -> (Self, mpsc::UnboundedReceiver<Action>) {
    Self::with_rng(gateway, limits, StdRng::from_entropy())
  }
}

impl<R: Rng> Coordinator<R> {
  pub fn with_rng(gateway: Arc<Gateway>, limits: Limits, rng: R) -> (Self, mpsc::UnboundedReceiver<Action>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let coordinator = Self {
      session: Session::with_rng(limits.clone(), rng),
      gateway,
      limits,
      tx,
      notices: Vec::new(),
      generations: Vec::new(),
      background: Vec::new(),
    };
    (coordinator, rx)
  }

  /// Apply one action and run whatever it asks for.
  pub fn dispatch(&mut self, action: Action) {
    let effects = self.session.apply(action);
    for effect in effects {
      self.run(effect);
    }
    self.prune();
  }

  fn run(&mut self, effect: Effect) {
    match effect {
      Effect::Notify(notice) => {
        info!(target: "session", notice = %notice.message(), "Notice raised");
        self.notices.push(notice);
      }
      Effect::RequestTitle { epoch, filename } => {
        let handle = self.spawn_title(epoch, filename);
        self.background.push(handle);
      }
      Effect::StartGeneration { ticket, document } => {
        let handle = self.spawn_generation(ticket, document);
        self.generations.push((ticket, handle));
      }
      Effect::ScheduleMatchClear { token } => {
        let tx = self.tx.clone();
        let delay = self.limits.match_clear_delay();
        self.background.push(tokio::spawn(async move {
          sleep(delay).await;
          let _ = tx.send(Action::MatchClearElapsed { token });
        }));
      }
    }
  }

  fn spawn_generation(&self, ticket: Ticket, document: UploadedDocument) -> JoinHandle<()> {
    let tx = self.tx.clone();
    let mut updates = self.gateway.generate_kind(ticket.kind, document);
    let deadline = Instant::now() + self.limits.generation_timeout();

    tokio::spawn(async move {
      let send = |update| tx.send(Action::Generation { ticket, update }).is_ok();
      if !send(GenerationUpdate::Started) {
        return;
      }
      loop {
        match timeout_at(deadline, updates.next()).await {
          Ok(Some(update)) => {
            if !send(update) {
              return;
            }
          }
          Ok(None) => return,
          Err(_) => {
            warn!(target: "generation", kind = %ticket.kind, "Generation timed out");
            send(GenerationUpdate::Failed(GatewayError::Timeout.to_string()));
            return;
          }
        }
      }
    })
  }

  fn spawn_title(&self, epoch: u64, filename: String) -> JoinHandle<()> {
    let tx = self.tx.clone();
    let gateway = self.gateway.clone();
    let limit = self.limits.generation_timeout();

    tokio::spawn(async move {
      let title = match timeout(limit, gateway.suggest_title(&filename)).await {
        Ok(Ok(t)) => Some(t),
        Ok(Err(e)) => {
          debug!(target: "generation", error = %e, "Title unavailable; using defaults");
          None
        }
        Err(_) => {
          debug!(target: "generation", "Title request timed out; using defaults");
          None
        }
      };
      let _ = tx.send(Action::TitleResolved { epoch, title });
    })
  }

  // Generations for an older document can never be used again, so stop them.
  fn prune(&mut self) {
    let epoch = self.session.epoch();
    self.generations.retain(|(ticket, handle)| {
      if ticket.epoch != epoch && !handle.is_finished() {
        debug!(target: "generation", kind = %ticket.kind, epoch = ticket.epoch, "Aborting superseded generation");
        handle.abort();
      }
      ticket.epoch == epoch && !handle.is_finished()
    });
    self.background.retain(|h| !h.is_finished());
  }

  pub fn take_notices(&mut self) -> Vec<Notice> {
    std::mem::take(&mut self.notices)
  }

  pub fn session(&self) -> &Session<R> {
    &self.session
  }

  pub fn snapshot(&self) -> SessionSnapshot {
    self.session.snapshot()
  }
}

impl<R> Drop for Coordinator<R> {
  fn drop(&mut self) {
    for (_, handle) in &self.generations {
      handle.abort();
    }
    for handle in &self.background {
      handle.abort();
    }
  }
}
