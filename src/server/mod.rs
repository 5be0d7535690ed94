//! Server context and stdio transport
//!
//! All mutable shared state lives in one [`ServerContext`] constructed at
//! startup and injected into the dispatcher. No process-wide statics, so
//! tests and embedders can run any number of isolated instances.

#[cfg(test)]
mod tests;

use crate::cache::ResponseCache;
use crate::cancel::CancellationTracker;
use crate::config::GatewayConfig;
use crate::dispatch::{Dispatcher, RequestMeta};
use crate::outbound::ExternalCallClient;
use crate::protocol::{Implementation, LogLevel, ResourceContents, ServerCapabilities};
use crate::tools::ToolRegistry;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

/// Resolves the opaque `ui://` URIs carried on tool descriptors into
/// renderable content. The dispatch engine never inspects or interprets
/// what comes back.
#[async_trait]
pub trait ResourceResolver: Send + Sync {
    async fn resolve(&self, uri: &str) -> Result<Option<ResourceContents>>;
}

/// Default resolver over content registered at startup.
#[derive(Debug, Default)]
pub struct StaticResourceResolver {
    contents: HashMap<String, String>,
}

impl StaticResourceResolver {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn insert(&mut self, uri: impl Into<String>, body: impl Into<String>) {
        self.contents.insert(uri.into(), body.into());
    }
}

#[async_trait]
impl ResourceResolver for StaticResourceResolver {
    #[inline]
    async fn resolve(&self, uri: &str) -> Result<Option<ResourceContents>> {
        Ok(self.contents.get(uri).map(|body| ResourceContents {
            uri: uri.to_string(),
            mime_type: Some("text/html".to_string()),
            text: body.clone(),
        }))
    }
}

/// Owns the tool catalog, the cache and cancellation tables, the current
/// log level, and the outbound client for the lifetime of the server.
pub struct ServerContext {
    server_info: Implementation,
    instructions: Option<String>,
    registry: ToolRegistry,
    cache: ResponseCache,
    cancellations: CancellationTracker,
    outbound: ExternalCallClient,
    log_level: Mutex<LogLevel>,
    resolver: Box<dyn ResourceResolver>,
    cache_ttl: Duration,
    cache_sweep_interval: Duration,
}

impl ServerContext {
    /// Build a context with the built-in tool catalog.
    #[inline]
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        Self::with_registry(config, ToolRegistry::create_default()?)
    }

    /// Build a context around a caller-supplied catalog.
    #[inline]
    pub fn with_registry(config: &GatewayConfig, registry: ToolRegistry) -> Result<Self> {
        let outbound = ExternalCallClient::new(Duration::from_secs(config.outbound.timeout_secs))?
            .with_max_retries(config.outbound.max_retries)
            .with_initial_delay(Duration::from_millis(config.outbound.initial_delay_ms));

        Ok(Self {
            server_info: Implementation {
                name: config.server.name.clone(),
                version: config.server.version.clone(),
            },
            instructions: config.server.instructions.clone(),
            registry,
            cache: ResponseCache::new(),
            cancellations: CancellationTracker::new(),
            outbound,
            log_level: Mutex::new(LogLevel::Info),
            resolver: Box::new(StaticResourceResolver::new()),
            cache_ttl: Duration::from_secs(config.cache.default_ttl_secs),
            cache_sweep_interval: Duration::from_secs(config.cache.sweep_interval_secs),
        })
    }

    /// Replace the UI resource resolver.
    #[inline]
    pub fn with_resolver(mut self, resolver: Box<dyn ResourceResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    #[inline]
    pub fn server_info(&self) -> &Implementation {
        &self.server_info
    }

    #[inline]
    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    #[inline]
    pub fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities::fixed()
    }

    #[inline]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    #[inline]
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Default time-to-live for entries tools store through
    /// [`ResponseCache::get_or_fetch`], from `cache.default_ttl_secs`.
    #[inline]
    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    #[inline]
    pub fn cancellations(&self) -> &CancellationTracker {
        &self.cancellations
    }

    #[inline]
    pub fn outbound(&self) -> &ExternalCallClient {
        &self.outbound
    }

    #[inline]
    pub fn resolver(&self) -> &dyn ResourceResolver {
        self.resolver.as_ref()
    }

    /// Current server-wide log level.
    #[inline]
    pub fn log_level(&self) -> LogLevel {
        *self.log_level.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[inline]
    pub fn set_log_level(&self, level: LogLevel) {
        *self.log_level.lock().unwrap_or_else(|e| e.into_inner()) = level;
    }

    /// Whether a message at `level` should be sent under the current
    /// server-wide level.
    #[inline]
    pub fn should_emit(&self, level: LogLevel) -> bool {
        level >= self.log_level()
    }
}

/// Serve line-delimited JSON-RPC over stdio until EOF. A background task
/// sweeps expired cache entries on the configured interval.
#[inline]
pub async fn serve_stdio(ctx: Arc<ServerContext>) -> Result<()> {
    info!("Starting MCP gateway on stdio");

    let sweeper = {
        let ctx = Arc::clone(&ctx);
        let interval = ctx.cache_sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                ctx.cache().sweep_expired();
            }
        })
    };

    let dispatcher = Dispatcher::new(Arc::clone(&ctx));
    let meta = RequestMeta::default();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut reader = BufReader::new(stdin);

    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                info!("EOF reached, closing connection");
                break;
            }
            Ok(_) => {
                if let Some(response) = dispatcher.handle_raw(&line, &meta).await {
                    stdout.write_all(response.as_bytes()).await?;
                    stdout.write_all(b"\n").await?;
                    stdout.flush().await?;
                } else {
                    debug!("No response owed for incoming line");
                }
            }
            Err(e) => {
                error!("Error reading from stdin: {e}");
                break;
            }
        }
    }

    sweeper.abort();
    info!("MCP gateway stopped");
    Ok(())
}
