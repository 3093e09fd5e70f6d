// Channels and the process-wide channel registry

use crate::formatter::Versioning;
use crate::sink::SinkChain;
use remora_core::port::AuthenticationProvider;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketCachePolicy {
    /// Keep idle sockets around for reuse
    Default,
    /// Drop sockets once `socket_cache_timeout_secs` elapsed
    AbsoluteTimeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSettings {
    pub name: String,
    pub port: u16,
    pub socket_cache: SocketCachePolicy,
    pub socket_cache_timeout_secs: u64,
    pub versioning: Versioning,
}

pub struct Channel {
    settings: ChannelSettings,
    client_chain: SinkChain,
    server_chain: SinkChain,
    authentication_provider: Arc<dyn AuthenticationProvider>,
}

impl Channel {
    pub fn new(
        settings: ChannelSettings,
        client_chain: SinkChain,
        server_chain: SinkChain,
        authentication_provider: Arc<dyn AuthenticationProvider>,
    ) -> Self {
        Self {
            settings,
            client_chain,
            server_chain,
            authentication_provider,
        }
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn settings(&self) -> &ChannelSettings {
        &self.settings
    }

    pub fn client_chain(&self) -> &SinkChain {
        &self.client_chain
    }

    pub fn server_chain(&self) -> &SinkChain {
        &self.server_chain
    }

    pub fn authentication_provider(&self) -> Arc<dyn AuthenticationProvider> {
        self.authentication_provider.clone()
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("settings", &self.settings)
            .field("client_chain", &self.client_chain)
            .field("server_chain", &self.server_chain)
            .finish_non_exhaustive()
    }
}

/// Channels by name. A name is registered at most once.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: Mutex<HashMap<String, Arc<Channel>>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the channel registered under `name`, building it only if absent.
    pub fn get_or_register<F>(&self, name: &str, build: F) -> Arc<Channel>
    where
        F: FnOnce() -> Channel,
    {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = channels.get(name) {
            debug!(channel = %name, "Reusing registered channel");
            return existing.clone();
        }

        let channel = Arc::new(build());
        info!(
            channel = %name,
            port = channel.settings.port,
            client_stages = ?channel.client_chain.kinds(),
            server_stages = ?channel.server_chain.kinds(),
            "Channel registered"
        );
        channels.insert(name.to_string(), channel.clone());
        channel
    }

    pub fn get(&self, name: &str) -> Option<Arc<Channel>> {
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
