// Protocol setup: turns endpoint settings into client and server sink chains

use crate::channel::{Channel, ChannelRegistry, ChannelSettings, SocketCachePolicy};
use crate::crypto::{CryptoProvider, CryptoSettings, TRIPLE_DES};
use crate::error::{Result, TransportError};
use crate::formatter::{Formatter, FormatterSettings, JsonFormatter, Versioning};
use crate::sink::{ChainSide, CryptoStage, SinkChain, SinkStage};
use remora_core::port::{AuthenticationProvider, NullAuthenticationProvider};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

pub const DEFAULT_ALGORITHM: &str = TRIPLE_DES;
pub const DEFAULT_TCP_PORT: u16 = 0;

/// Endpoint settings for one TCP channel.
///
/// Defaults: encryption on with `3DES`, OAEP off, socket caching on, strict
/// versioning and a unique channel name.
pub struct ProtocolSetup {
    channel_name: String,
    tcp_port: u16,
    versioning: Versioning,
    socket_caching: bool,
    encryption: bool,
    algorithm: String,
    oaep: bool,
    require_crypto_client: bool,
    encryption_configured: bool,
    crypto_provider: Arc<dyn CryptoProvider>,
    authentication_provider: Arc<dyn AuthenticationProvider>,
    client_sinks_after_formatter: Vec<SinkStage>,
    server_sinks_before_formatter: Vec<SinkStage>,
}

impl ProtocolSetup {
    pub fn new(crypto_provider: Arc<dyn CryptoProvider>) -> Self {
        Self {
            channel_name: format!("TcpCustomServerProtocolSetup_{}", Uuid::new_v4()),
            tcp_port: DEFAULT_TCP_PORT,
            versioning: Versioning::Strict,
            socket_caching: true,
            encryption: true,
            algorithm: DEFAULT_ALGORITHM.to_string(),
            oaep: false,
            require_crypto_client: true,
            encryption_configured: false,
            crypto_provider,
            authentication_provider: Arc::new(NullAuthenticationProvider),
            client_sinks_after_formatter: Vec::new(),
            server_sinks_before_formatter: Vec::new(),
        }
    }

    pub fn with_channel_name(mut self, name: impl Into<String>) -> Self {
        self.channel_name = name.into();
        self
    }

    pub fn with_tcp_port(mut self, port: i64) -> Result<Self> {
        self.set_tcp_port(port)?;
        Ok(self)
    }

    pub fn set_tcp_port(&mut self, port: i64) -> Result<()> {
        self.tcp_port = u16::try_from(port).map_err(|_| TransportError::PortOutOfRange(port))?;
        Ok(())
    }

    pub fn with_versioning(mut self, versioning: Versioning) -> Self {
        self.versioning = versioning;
        self
    }

    pub fn with_socket_caching(mut self, enabled: bool) -> Self {
        self.socket_caching = enabled;
        self
    }

    pub fn with_encryption(mut self, enabled: bool) -> Self {
        self.encryption = enabled;
        self
    }

    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = algorithm.into();
        self
    }

    pub fn with_oaep(mut self, oaep: bool) -> Self {
        self.oaep = oaep;
        self
    }

    pub fn with_require_crypto_client(mut self, required: bool) -> Self {
        self.require_crypto_client = required;
        self
    }

    pub fn with_authentication_provider(mut self, provider: Arc<dyn AuthenticationProvider>) -> Self {
        self.authentication_provider = provider;
        self
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    pub fn tcp_port(&self) -> u16 {
        self.tcp_port
    }

    pub fn versioning(&self) -> Versioning {
        self.versioning
    }

    pub fn socket_caching(&self) -> bool {
        self.socket_caching
    }

    pub fn encryption(&self) -> bool {
        self.encryption
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn oaep(&self) -> bool {
        self.oaep
    }

    pub fn authentication_provider(&self) -> Arc<dyn AuthenticationProvider> {
        self.authentication_provider.clone()
    }

    /// Client side: runs after the formatter on send.
    pub fn add_client_sink_after_formatter(&mut self, stage: SinkStage) {
        self.client_sinks_after_formatter.push(stage);
    }

    /// Server side: runs before the formatter on receive.
    pub fn add_server_sink_before_formatter(&mut self, stage: SinkStage) {
        self.server_sinks_before_formatter.push(stage);
    }

    /// Add the crypto stages once. Later calls, or calls with encryption
    /// disabled, leave the chains untouched.
    pub fn configure_encryption(&mut self) {
        if !self.encryption {
            return;
        }
        if self.encryption_configured {
            debug!(channel = %self.channel_name, "Encryption already configured");
            return;
        }

        let settings = CryptoSettings {
            algorithm: self.algorithm.clone(),
            oaep: self.oaep,
        };
        self.add_client_sink_after_formatter(SinkStage::Crypto(CryptoStage {
            settings: settings.clone(),
            provider: self.crypto_provider.clone(),
            require_crypto_client: false,
        }));
        self.add_server_sink_before_formatter(SinkStage::Crypto(CryptoStage {
            settings,
            provider: self.crypto_provider.clone(),
            require_crypto_client: self.require_crypto_client,
        }));
        self.encryption_configured = true;
    }

    pub fn client_chain(&self) -> SinkChain {
        let mut stages = vec![SinkStage::Formatter(self.formatter())];
        stages.extend(self.client_sinks_after_formatter.iter().cloned());
        SinkChain::new(ChainSide::Client, stages)
    }

    pub fn server_chain(&self) -> SinkChain {
        let mut stages: Vec<SinkStage> = self.server_sinks_before_formatter.to_vec();
        stages.push(SinkStage::Formatter(self.formatter()));
        SinkChain::new(ChainSide::Server, stages)
    }

    pub fn channel_settings(&self) -> ChannelSettings {
        let socket_cache = if self.socket_caching {
            SocketCachePolicy::Default
        } else {
            SocketCachePolicy::AbsoluteTimeout
        };
        ChannelSettings {
            name: self.channel_name.clone(),
            port: self.tcp_port,
            socket_cache,
            socket_cache_timeout_secs: 0,
            versioning: self.versioning,
        }
    }

    /// Build the channel, or return the one already registered under this
    /// setup's name.
    pub fn create_channel(&mut self, registry: &ChannelRegistry) -> Arc<Channel> {
        if let Some(existing) = registry.get(&self.channel_name) {
            return existing;
        }
        if !self.encryption {
            warn!(channel = %self.channel_name, "Channel created without encryption");
        }
        self.configure_encryption();

        let settings = self.channel_settings();
        let client_chain = self.client_chain();
        let server_chain = self.server_chain();
        let authentication_provider = self.authentication_provider.clone();
        registry.get_or_register(&self.channel_name, move || {
            Channel::new(settings, client_chain, server_chain, authentication_provider)
        })
    }

    fn formatter(&self) -> Arc<dyn Formatter> {
        Arc::new(JsonFormatter::new(FormatterSettings {
            versioning: self.versioning,
            ..FormatterSettings::default()
        }))
    }
}

impl fmt::Debug for ProtocolSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolSetup")
            .field("channel_name", &self.channel_name)
            .field("tcp_port", &self.tcp_port)
            .field("versioning", &self.versioning)
            .field("socket_caching", &self.socket_caching)
            .field("encryption", &self.encryption)
            .field("algorithm", &self.algorithm)
            .field("oaep", &self.oaep)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::mocks::XorCryptoProvider;
    use crate::sink::SinkStageKind;

    fn setup() -> ProtocolSetup {
        ProtocolSetup::new(Arc::new(XorCryptoProvider::new()))
    }

    #[test]
    fn test_defaults() {
        let setup = setup();
        assert!(setup
            .channel_name()
            .starts_with("TcpCustomServerProtocolSetup_"));
        assert!(setup.encryption());
        assert_eq!(setup.algorithm(), "3DES");
        assert!(!setup.oaep());
        assert!(setup.socket_caching());
        assert_eq!(setup.versioning(), Versioning::Strict);
        assert_ne!(setup.channel_name(), self::setup().channel_name());
    }

    #[test]
    fn test_port_range() {
        let mut setup = setup();
        assert!(setup.set_tcp_port(0).is_ok());
        assert!(setup.set_tcp_port(65535).is_ok());
        assert_eq!(setup.tcp_port(), 65535);
        assert!(matches!(
            setup.set_tcp_port(65536),
            Err(TransportError::PortOutOfRange(65536))
        ));
        assert!(matches!(
            setup.set_tcp_port(-1),
            Err(TransportError::PortOutOfRange(-1))
        ));
        assert_eq!(setup.tcp_port(), 65535);
    }

    #[test]
    fn test_chain_order() {
        let mut setup = setup();
        setup.configure_encryption();
        assert_eq!(
            setup.client_chain().kinds(),
            vec![SinkStageKind::Formatter, SinkStageKind::Crypto]
        );
        assert_eq!(
            setup.server_chain().kinds(),
            vec![SinkStageKind::Crypto, SinkStageKind::Formatter]
        );
    }

    #[test]
    fn test_encryption_configured_once() {
        let mut setup = setup().with_algorithm("3DES");
        setup.configure_encryption();
        setup.configure_encryption();
        assert_eq!(setup.client_chain().crypto_stage_count(), 1);
        assert_eq!(setup.server_chain().crypto_stage_count(), 1);
    }

    #[test]
    fn test_disabled_encryption_builds_formatter_only() {
        let mut setup = setup().with_encryption(false).with_socket_caching(false);
        let registry = ChannelRegistry::new();
        let channel = setup.create_channel(&registry);
        assert_eq!(channel.client_chain().kinds(), vec![SinkStageKind::Formatter]);
        assert_eq!(channel.server_chain().kinds(), vec![SinkStageKind::Formatter]);
        assert_eq!(
            channel.settings().socket_cache,
            SocketCachePolicy::AbsoluteTimeout
        );
    }

    #[test]
    fn test_create_channel_is_idempotent() {
        let registry = ChannelRegistry::new();
        let mut setup = setup().with_tcp_port(8085).unwrap();
        let first = setup.create_channel(&registry);
        let second = setup.create_channel(&registry);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
        assert_eq!(first.settings().port, 8085);
        assert_eq!(first.client_chain().crypto_stage_count(), 1);
    }
}
