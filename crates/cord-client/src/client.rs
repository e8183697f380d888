//! Client facade
//!
//! Owns one gateway shard per configured shard index, pumps their
//! dispatch frames through the dispatcher, and exposes the registration
//! surface (`on`/`once`), the shared cache, and the REST client.

use crate::cache::Cache;
use crate::context::ClientContext;
use crate::dispatcher::{Dispatcher, HandlerMode, RegistrationHandle};
use crate::error::{ClientError, DispatchError};
use crate::http::RestClient;
use crate::middleware::MiddlewareRegistry;
use cord_common::config::ClientConfig;
use cord_core::{Event, Guild, Snowflake, User};
use cord_gateway::protocol::StatusUpdate;
use cord_gateway::{
    Backoff, Connect, Envelope, GatewayError, Intents, Shard, ShardConfig, ShardHandle,
    WsConnector,
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Builds a [`Client`]; the connector seam exists so simulations can
/// stand in for real sockets.
pub struct ClientBuilder {
    config: ClientConfig,
    intents: Intents,
    backoff: Backoff,
    connector: Arc<dyn Connect>,
    registry: MiddlewareRegistry,
}

impl ClientBuilder {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            intents: Intents::default(),
            backoff: Backoff::new(),
            connector: Arc::new(WsConnector::new()),
            registry: MiddlewareRegistry::standard(),
        }
    }

    #[must_use]
    pub fn intents(mut self, intents: Intents) -> Self {
        self.intents = intents;
        self
    }

    #[must_use]
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Replace how gateway connections are opened
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connect>) -> Self {
        self.connector = connector;
        self
    }

    /// Replace the middleware table
    #[must_use]
    pub fn middleware(mut self, registry: MiddlewareRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Assemble the client; shards do not connect until [`Client::start`]
    pub fn build(self) -> Result<Client, ClientError> {
        let cache = Arc::new(Cache::new());
        let context = ClientContext::new(cache.clone());
        let (dispatcher, errors) = Dispatcher::new(self.registry, context);
        let rest = RestClient::new(&self.config.api_base_url, self.config.token.clone())?;

        Ok(Client {
            config: self.config,
            intents: self.intents,
            backoff: self.backoff,
            connector: self.connector,
            cache,
            dispatcher: Arc::new(dispatcher),
            rest,
            errors: Some(errors),
            shards: Vec::new(),
            tasks: Vec::new(),
        })
    }
}

/// The client facade
pub struct Client {
    config: ClientConfig,
    intents: Intents,
    backoff: Backoff,
    connector: Arc<dyn Connect>,
    cache: Arc<Cache>,
    dispatcher: Arc<Dispatcher>,
    rest: RestClient,
    errors: Option<mpsc::Receiver<DispatchError>>,
    shards: Vec<ShardHandle>,
    tasks: Vec<JoinHandle<Result<(), GatewayError>>>,
}

impl Client {
    #[must_use]
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// Spawn every shard session and the event pump.
    ///
    /// Returns immediately; use [`Client::wait`] to block on the shard
    /// tasks or poll readiness through the shard handles.
    pub fn start(&mut self) {
        if !self.tasks.is_empty() {
            return;
        }

        let (events_tx, mut events_rx) = mpsc::channel::<Envelope>(256);

        for index in 0..self.config.shard_count {
            let shard_config = ShardConfig::new(&self.config.token, &self.config.gateway_url)
                .with_shard(index, self.config.shard_count)
                .with_intents(self.intents)
                .with_backoff(self.backoff.clone());

            let (shard, handle) = Shard::new(
                shard_config,
                Box::new(self.connector.clone()),
                events_tx.clone(),
            );
            self.shards.push(handle);
            self.tasks.push(tokio::spawn(shard.run()));
        }
        drop(events_tx);

        let dispatcher = self.dispatcher.clone();
        let pump = tokio::spawn(async move {
            while let Some(envelope) = events_rx.recv().await {
                dispatcher.handle(&envelope);
            }
            Ok::<(), GatewayError>(())
        });
        self.tasks.push(pump);

        tracing::info!(shards = self.config.shard_count, "client started");
    }

    /// Register a persistent handler for an internal event name
    pub fn on<F, Fut>(&self, event: impl Into<String>, handler: F) -> RegistrationHandle
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.dispatcher.register(event, HandlerMode::Persistent, handler)
    }

    /// Register a handler invoked exactly once
    pub fn once<F, Fut>(&self, event: impl Into<String>, handler: F) -> RegistrationHandle
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.dispatcher.register(event, HandlerMode::OnceOnly, handler)
    }

    /// Take the dispatch error stream; yields per-envelope and
    /// per-handler failures that did not interrupt dispatch.
    pub fn errors(&mut self) -> Option<mpsc::Receiver<DispatchError>> {
        self.errors.take()
    }

    /// Handles to the running shards, in index order
    #[must_use]
    pub fn shards(&self) -> &[ShardHandle] {
        &self.shards
    }

    /// The shared domain-state cache
    #[must_use]
    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    /// Convenience read: a cached guild by id
    #[must_use]
    pub fn guild(&self, id: Snowflake) -> Option<Guild> {
        self.cache.guild(id)
    }

    /// The bot account, once READY has been processed
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.cache.current_user()
    }

    /// The REST collaborator
    #[must_use]
    pub fn http(&self) -> &RestClient {
        &self.rest
    }

    /// Post a message to a channel through the REST API
    pub async fn send_message(
        &self,
        channel_id: Snowflake,
        content: impl Into<String>,
    ) -> Result<(), ClientError> {
        let body = json!({ "content": content.into() });
        self.rest
            .post(&format!("channels/{channel_id}/messages"), &body)
            .await?;
        Ok(())
    }

    /// Send a presence update on every Ready shard
    pub async fn update_status(&self, status: impl Into<String>) -> Result<(), ClientError> {
        let update = StatusUpdate {
            status: status.into(),
        };
        let mut sent = false;
        for shard in &self.shards {
            match shard.update_status(update.clone()).await {
                Ok(()) => sent = true,
                Err(GatewayError::NotReady) => {}
                Err(e) => return Err(e.into()),
            }
        }
        if sent {
            Ok(())
        } else {
            Err(GatewayError::NotReady.into())
        }
    }

    /// Stop dispatching and shut every shard down
    pub fn close(&self) {
        tracing::info!("client closing");
        self.dispatcher.close();
        for shard in &self.shards {
            shard.shutdown();
        }
    }

    /// Wait for all shard tasks to finish.
    ///
    /// Returns the first fatal shard error, if any; an orderly
    /// [`Client::close`] resolves with `Ok`.
    pub async fn wait(&mut self) -> Result<(), ClientError> {
        let mut first_error: Option<ClientError> = None;
        for task in self.tasks.drain(..) {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if first_error.is_none() {
                        first_error = Some(e.into());
                    }
                }
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(ClientError::Runtime(e.to_string()));
                    }
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
