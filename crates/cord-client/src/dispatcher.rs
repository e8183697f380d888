//! Event dispatcher
//!
//! Resolves each inbound dispatch envelope through the middleware
//! registry and invokes the registered handlers for the resulting
//! internal event. Each internal event name gets one worker task fed by
//! an unbounded queue: handlers for that name run sequentially, in
//! envelope then registration order, while different event names run
//! concurrently. A slow handler never stalls frame draining or
//! heartbeats, only its own event name's queue.
//!
//! One-shot registrations are removed under the registration lock before
//! invocation, which is what makes them exactly-once even when two
//! matching envelopes race.

use crate::context::ClientContext;
use crate::error::DispatchError;
use crate::middleware::MiddlewareRegistry;
use cord_core::Event;
use cord_gateway::Envelope;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Handler lifetime mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerMode {
    /// Invoked for every matching event
    Persistent,
    /// Invoked exactly once, then removed
    OnceOnly,
}

type Callback = Arc<dyn Fn(Event) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

struct Registration {
    id: u64,
    mode: HandlerMode,
    callback: Callback,
}

type HandlerMap = Arc<Mutex<HashMap<String, Vec<Registration>>>>;

/// One envelope's worth of work for an event-name worker
struct FanOut {
    event_name: &'static str,
    callbacks: Vec<Callback>,
    event: Event,
}

/// Removes its registration when asked; dropping the handle leaves the
/// handler in place.
pub struct RegistrationHandle {
    id: u64,
    event: String,
    handlers: HandlerMap,
}

impl RegistrationHandle {
    /// Unregister the handler; true if it was still registered
    pub fn remove(&self) -> bool {
        let mut handlers = self.handlers.lock();
        match handlers.get_mut(&self.event) {
            Some(list) => {
                let before = list.len();
                list.retain(|r| r.id != self.id);
                before != list.len()
            }
            None => false,
        }
    }
}

/// The dispatch pipeline: middleware resolution plus handler fan-out
pub struct Dispatcher {
    registry: MiddlewareRegistry,
    context: ClientContext,
    handlers: HandlerMap,
    queues: Mutex<HashMap<&'static str, mpsc::UnboundedSender<FanOut>>>,
    next_id: AtomicU64,
    errors: mpsc::Sender<DispatchError>,
    closed: AtomicBool,
}

impl Dispatcher {
    /// Build a dispatcher; recoverable failures flow to the returned
    /// error receiver.
    #[must_use]
    pub fn new(
        registry: MiddlewareRegistry,
        context: ClientContext,
    ) -> (Self, mpsc::Receiver<DispatchError>) {
        let (errors_tx, errors_rx) = mpsc::channel(64);
        (
            Self {
                registry,
                context,
                handlers: Arc::new(Mutex::new(HashMap::new())),
                queues: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                errors: errors_tx,
                closed: AtomicBool::new(false),
            },
            errors_rx,
        )
    }

    /// Register a handler for an internal event name
    pub fn register<F, Fut>(
        &self,
        event: impl Into<String>,
        mode: HandlerMode,
        handler: F,
    ) -> RegistrationHandle
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let event = event.into();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let callback: Callback =
            Arc::new(move |ev| -> BoxFuture<'static, anyhow::Result<()>> {
                Box::pin(handler(ev))
            });

        self.handlers
            .lock()
            .entry(event.clone())
            .or_default()
            .push(Registration { id, mode, callback });

        RegistrationHandle {
            id,
            event,
            handlers: self.handlers.clone(),
        }
    }

    /// Number of live registrations for an event name
    #[must_use]
    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers.lock().get(event).map_or(0, Vec::len)
    }

    /// Stop accepting new dispatches; in-flight handler tasks finish
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Process one dispatch envelope.
    ///
    /// Unknown wire events are dropped silently. Transform failures are
    /// reported and only poison their own envelope. Handler invocation
    /// happens on the event name's worker task; this returns as soon as
    /// the fan-out is queued.
    pub fn handle(&self, envelope: &Envelope) {
        if self.is_closed() {
            return;
        }

        let Some(wire_event) = envelope.event_name() else {
            return;
        };
        let Some(transform) = self.registry.get(wire_event) else {
            tracing::trace!(event = wire_event, "no middleware, dropping");
            return;
        };

        let (internal_event, typed) = match transform(&self.context, envelope) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(event = wire_event, error = %e, "middleware failed");
                self.report(DispatchError::Middleware {
                    event: wire_event.to_string(),
                    source: e,
                });
                return;
            }
        };

        // Snapshot the callbacks under the lock. OnceOnly entries are
        // removed here, before invocation: a concurrent dispatch of the
        // same event sees an already-empty slot.
        let callbacks: Vec<Callback> = {
            let mut handlers = self.handlers.lock();
            match handlers.get_mut(internal_event) {
                Some(list) => {
                    let snapshot = list.iter().map(|r| r.callback.clone()).collect();
                    list.retain(|r| r.mode == HandlerMode::Persistent);
                    snapshot
                }
                None => return,
            }
        };
        if callbacks.is_empty() {
            return;
        }

        tracing::debug!(
            event = internal_event,
            handlers = callbacks.len(),
            "dispatching"
        );

        let job = FanOut {
            event_name: internal_event,
            callbacks,
            event: typed,
        };

        // One worker per internal event name keeps dispatch order for
        // that name across envelopes; distinct names stay concurrent.
        let mut queues = self.queues.lock();
        let sender = queues
            .entry(internal_event)
            .or_insert_with(|| Self::spawn_worker(self.errors.clone()));
        if let Err(mpsc::error::SendError(job)) = sender.send(job) {
            let fresh = Self::spawn_worker(self.errors.clone());
            let _ = fresh.send(job);
            *sender = fresh;
        }
    }

    fn spawn_worker(errors: mpsc::Sender<DispatchError>) -> mpsc::UnboundedSender<FanOut> {
        let (tx, mut rx) = mpsc::unbounded_channel::<FanOut>();
        tokio::spawn(async move {
            while let Some(FanOut {
                event_name,
                callbacks,
                event,
            }) = rx.recv().await
            {
                for callback in callbacks {
                    // Each handler runs in its own task so a panic,
                    // even in the closure body before its first await,
                    // is contained and reported, not propagated.
                    let event = event.clone();
                    let outcome = tokio::spawn(async move { callback(event).await }).await;
                    let error = match outcome {
                        Ok(Ok(())) => continue,
                        Ok(Err(e)) => DispatchError::Handler {
                            event: event_name.to_string(),
                            message: e.to_string(),
                        },
                        Err(_) => DispatchError::HandlerPanic {
                            event: event_name.to_string(),
                        },
                    };
                    tracing::warn!(event = event_name, error = %error, "handler failed");
                    let _ = errors.try_send(error);
                }
            }
        });
        tx
    }

    fn report(&self, error: DispatchError) {
        if self.errors.try_send(error).is_err() {
            tracing::debug!("dispatch error channel full or closed");
        }
    }
}
