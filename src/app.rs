//! The main application logic, decoupled from the entry point.

use crate::{
    config::{Config, PatternSource},
    core::Notifier,
    delivery::{DeliveryWorker, OutputLog},
    matching::{load_patterns_from_file, patterns_from_mutations, Pattern, PatternMatcher},
    mutation::{mutate_all, FileMutationStore, MutationStore, NullMutationStore},
    network::{Connector, StreamListener, TungsteniteConnector},
    notification::{http_client, DiscordNotifier, SlackNotifier},
    sink::match_channel,
    task_manager::TaskManager,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, instrument};

/// A handle to the running application and the tasks it spawned.
#[derive(Debug)]
pub struct App {
    task_manager: TaskManager,
    pattern_count: usize,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// Number of patterns the matcher was built with.
    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }

    /// Waits for the shutdown signal, then for every task to finish.
    pub async fn run(self) -> Result<()> {
        let mut shutdown_rx = self.task_manager.get_shutdown_rx();
        // A dropped sender counts as a shutdown request too.
        loop {
            let requested = *shutdown_rx.borrow_and_update();
            if requested || shutdown_rx.changed().await.is_err() {
                break;
            }
        }
        info!("Shutdown signal received. Waiting for tasks to complete...");

        let panicked = self.task_manager.shutdown().await;
        if panicked > 0 {
            anyhow::bail!("{panicked} task(s) panicked during shutdown");
        }
        info!("All tasks shut down.");
        Ok(())
    }
}

/// Builder for the main application.
///
/// Every fallible startup step (pattern loading, mutation persistence, output
/// file creation) happens in [`AppBuilder::build`], before anything is
/// spawned. The overrides swap out the outer edges for tests.
pub struct AppBuilder {
    config: Config,
    connector_override: Option<Arc<dyn Connector>>,
    notifiers_override: Option<Vec<Arc<dyn Notifier>>>,
    mutation_store_override: Option<Arc<dyn MutationStore>>,
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            connector_override: None,
            notifiers_override: None,
            mutation_store_override: None,
        }
    }

    /// Overrides how the stream source is reached (for testing).
    pub fn connector_override(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector_override = Some(connector);
        self
    }

    /// Replaces the webhook notifiers built from the configuration.
    pub fn notifiers_override(mut self, notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        self.notifiers_override = Some(notifiers);
        self
    }

    /// Overrides where generated mutations are persisted.
    pub fn mutation_store_override(mut self, store: Arc<dyn MutationStore>) -> Self {
        self.mutation_store_override = Some(store);
        self
    }

    /// Builds every component and spawns the listener and delivery tasks.
    #[instrument(skip_all)]
    pub async fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let config = self.config;
        let source = config.validate()?;

        // =========================================================================
        // 1. Patterns
        // =========================================================================
        let patterns = match source {
            PatternSource::File(path) => load_patterns_from_file(&path).await?,
            PatternSource::Mutate(seeds) => {
                let store: Arc<dyn MutationStore> = match self.mutation_store_override {
                    Some(store) => store,
                    None if config.matching.persist_mutations => {
                        Arc::new(FileMutationStore::new(config.matching.mutations_dir.clone()))
                    }
                    None => Arc::new(NullMutationStore),
                };
                let mutations = mutate_all(seeds.as_slice(), store.as_ref())?;
                info!(
                    seeds = seeds.len(),
                    mutations = mutations.len(),
                    "Generated mutations"
                );
                patterns_from_mutations(&mutations)?
            }
        };
        let matcher = build_matcher(patterns, config.matching.min_padding)?;
        let pattern_count = matcher.pattern_count();

        // =========================================================================
        // 2. Output file and notifiers
        // =========================================================================
        let log = OutputLog::create(&config.output.path)?;
        let notifiers = match self.notifiers_override {
            Some(notifiers) => notifiers,
            None => build_notifiers(&config)?,
        };

        // =========================================================================
        // 3. Spawn tasks
        // =========================================================================
        let (match_tx, match_rx) = match_channel(config.output.queue_capacity);
        let mut task_manager = TaskManager::new(shutdown_rx);

        let connector: Arc<dyn Connector> = match self.connector_override {
            Some(connector) => connector,
            None => Arc::new(TungsteniteConnector),
        };
        let mut listener = StreamListener::new(
            config.network.certstream_url.clone(),
            matcher,
            match_tx,
            config.network.reconnect_delay(),
        )
        .with_connector(connector);
        let listener_shutdown = task_manager.get_shutdown_rx();
        task_manager.spawn("StreamListener", async move {
            listener.run(listener_shutdown).await;
        });

        let worker = DeliveryWorker::new(match_rx, log, notifiers).echo(config.output.echo_stdout);
        let worker_shutdown = task_manager.get_shutdown_rx();
        task_manager.spawn("DeliveryWorker", worker.run(worker_shutdown));

        info!(tasks = ?task_manager.task_names(), pattern_count, "Application started");
        Ok(App {
            task_manager,
            pattern_count,
        })
    }
}

fn build_matcher(patterns: Vec<Pattern>, min_padding: usize) -> Result<PatternMatcher> {
    let count = patterns.len();
    let matcher = PatternMatcher::new(patterns, min_padding)?;
    info!(count, "Compiled pattern set");
    Ok(matcher)
}

fn build_notifiers(config: &Config) -> Result<Vec<Arc<dyn Notifier>>> {
    let output = &config.output;
    if output.discord_webhooks.is_empty() && output.slack_webhooks.is_empty() {
        return Ok(Vec::new());
    }

    let client =
        http_client(output.webhook_timeout()).context("Failed to build webhook HTTP client")?;
    let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();
    for url in &output.discord_webhooks {
        notifiers.push(Arc::new(DiscordNotifier::new(client.clone(), url.clone())));
    }
    for url in &output.slack_webhooks {
        notifiers.push(Arc::new(SlackNotifier::new(client.clone(), url.clone())));
    }
    info!(
        discord = output.discord_webhooks.len(),
        slack = output.slack_webhooks.len(),
        "Webhook notifiers enabled"
    );
    Ok(notifiers)
}
