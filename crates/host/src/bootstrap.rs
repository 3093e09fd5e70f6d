// Composition root: wires adapters into a running component host

use crate::config::HostConfig;
use anyhow::{Context, Result};
use remora_core::application::{shutdown_channel, SessionSweeper, ShutdownSender};
use remora_core::port::{SessionStore, SystemTimeProvider};
use remora_core::{ComponentHost, Dispatcher};
use remora_infra_memory::{InMemoryActivator, InMemorySessionStore, InMemoryTransactionCoordinator};
use remora_transport::{StandardCryptoProvider, Channel, ChannelRegistry, ProtocolSetup};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Everything a running host owns
pub struct HostRuntime {
    dispatcher: Arc<Dispatcher>,
    channels: ChannelRegistry,
    channel: Arc<Channel>,
    sweep_period: Duration,
    shutdown_tx: Option<ShutdownSender>,
    sweeper: Option<JoinHandle<()>>,
}

impl HostRuntime {
    pub fn build(config: &HostConfig) -> Result<Self> {
        let store: Arc<dyn SessionStore> =
            Arc::new(InMemorySessionStore::new(config.session_age_minutes));

        let host = ComponentHost::builder(config.host_name.clone())
            .activator(Arc::new(InMemoryActivator::new()))
            .session_store(store)
            .time_provider(Arc::new(SystemTimeProvider))
            .transaction_coordinator(Arc::new(InMemoryTransactionCoordinator::new()))
            .with_notifications()
            .build()
            .context("Component host construction failed")?;

        let mut setup = ProtocolSetup::new(Arc::new(StandardCryptoProvider::new()))
            .with_channel_name(format!("{}_tcp", config.host_name))
            .with_tcp_port(config.tcp_port)
            .context("Invalid TCP port")?
            .with_versioning(config.versioning)
            .with_socket_caching(config.socket_caching)
            .with_encryption(config.encryption)
            .with_algorithm(config.algorithm.clone())
            .with_oaep(config.oaep);

        let channels = ChannelRegistry::new();
        let channel = setup.create_channel(&channels);

        info!(
            host = %config.host_name,
            channel = %channel.name(),
            port = channel.settings().port,
            encryption = config.encryption,
            "Host runtime built"
        );

        Ok(Self {
            dispatcher: Arc::new(Dispatcher::new(Arc::new(host))),
            channels,
            channel,
            sweep_period: Duration::from_secs(config.session_sweep_secs),
            shutdown_tx: None,
            sweeper: None,
        })
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn host(&self) -> &Arc<ComponentHost> {
        self.dispatcher.host()
    }

    pub fn channel(&self) -> &Arc<Channel> {
        &self.channel
    }

    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    /// Spawn the session sweeper. Calling twice has no further effect.
    pub fn start(&mut self) {
        if self.sweeper.is_some() {
            return;
        }
        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let sweeper = SessionSweeper::new(self.host().sessions().clone(), self.sweep_period);
        self.sweeper = Some(tokio::spawn(sweeper.run(shutdown_rx)));
        self.shutdown_tx = Some(shutdown_tx);
    }

    pub fn is_running(&self) -> bool {
        self.sweeper.is_some()
    }

    /// Stop background tasks and the notification service
    pub async fn shutdown(&mut self, grace: Duration) {
        if let Some(tx) = self.shutdown_tx.take() {
            tx.shutdown();
        }
        if let Some(handle) = self.sweeper.take() {
            match tokio::time::timeout(grace, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = ?e, "Session sweeper task failed"),
                Err(_) => error!(grace_ms = grace.as_millis() as u64, "Session sweeper did not stop in time"),
            }
        }
        self.host().notifications().stop();
        info!(host = %self.host().name(), "Host runtime stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_start_and_shutdown() {
        let mut runtime = HostRuntime::build(&HostConfig::default()).unwrap();
        assert_eq!(runtime.channels().len(), 1);
        assert_eq!(runtime.channel().client_chain().crypto_stage_count(), 1);
        assert!(runtime.host().notifications().is_running());
        assert!(runtime.dispatcher().registered_components().is_empty());
        assert_eq!(runtime.dispatcher().session_age_limit(), 30);

        runtime.start();
        runtime.start();
        assert!(runtime.is_running());

        runtime.shutdown(Duration::from_secs(1)).await;
        assert!(!runtime.is_running());
        assert!(!runtime.host().notifications().is_running());
    }

    #[test]
    fn test_out_of_range_port_fails_build() {
        let config = HostConfig {
            tcp_port: 65536,
            ..HostConfig::default()
        };
        let err = HostRuntime::build(&config).err().unwrap();
        assert!(format!("{err:#}").contains("65536"));
    }
}
