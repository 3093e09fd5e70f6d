// Sink chains: ordered stages a payload passes through on one side of a channel

use crate::crypto::{CryptoProvider, CryptoSettings, PeerProfile, SymmetricCipher};
use crate::error::{Result, TransportError};
use crate::formatter::Formatter;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainSide {
    Client,
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkStageKind {
    Formatter,
    Crypto,
}

#[derive(Clone)]
pub struct CryptoStage {
    pub settings: CryptoSettings,
    pub provider: Arc<dyn CryptoProvider>,
    /// Server side only: refuse peers that cannot encrypt
    pub require_crypto_client: bool,
}

#[derive(Clone)]
pub enum SinkStage {
    Formatter(Arc<dyn Formatter>),
    Crypto(CryptoStage),
}

impl SinkStage {
    pub fn kind(&self) -> SinkStageKind {
        match self {
            SinkStage::Formatter(_) => SinkStageKind::Formatter,
            SinkStage::Crypto(_) => SinkStageKind::Crypto,
        }
    }
}

impl fmt::Debug for SinkStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkStage::Formatter(formatter) => write!(f, "Formatter({})", formatter.name()),
            SinkStage::Crypto(stage) => write!(f, "Crypto({})", stage.settings.algorithm),
        }
    }
}

/// Client chains run their stages in order when sending; server chains
/// run them in order when receiving.
#[derive(Debug, Clone)]
pub struct SinkChain {
    side: ChainSide,
    stages: Vec<SinkStage>,
}

impl SinkChain {
    pub fn new(side: ChainSide, stages: Vec<SinkStage>) -> Self {
        Self { side, stages }
    }

    pub fn side(&self) -> ChainSide {
        self.side
    }

    pub fn stages(&self) -> &[SinkStage] {
        &self.stages
    }

    pub fn kinds(&self) -> Vec<SinkStageKind> {
        self.stages.iter().map(SinkStage::kind).collect()
    }

    pub fn crypto_stage_count(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| s.kind() == SinkStageKind::Crypto)
            .count()
    }

    /// Negotiate every crypto stage against the peer and freeze the chain
    /// for one connection.
    pub fn open_session(&self, peer: &PeerProfile) -> Result<ConnectionSession> {
        let mut stages = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            match stage {
                SinkStage::Formatter(formatter) => {
                    stages.push(ActiveStage::Format(formatter.clone()));
                }
                SinkStage::Crypto(crypto) => {
                    if self.side == ChainSide::Server
                        && crypto.require_crypto_client
                        && !peer.supports_encryption
                    {
                        return Err(TransportError::CryptoClientRequired);
                    }
                    if !peer.supports_encryption {
                        debug!(
                            algorithm = %crypto.settings.algorithm,
                            "Peer cannot encrypt, skipping crypto stage"
                        );
                        continue;
                    }
                    let cipher = crypto.provider.negotiate(&crypto.settings, peer)?;
                    stages.push(ActiveStage::Encrypt(cipher));
                }
            }
        }

        debug!(side = ?self.side, stages = stages.len(), "Connection session opened");
        Ok(ConnectionSession {
            side: self.side,
            stages,
        })
    }
}

enum ActiveStage {
    Format(Arc<dyn Formatter>),
    Encrypt(Arc<dyn SymmetricCipher>),
}

enum Payload {
    Message(serde_json::Value),
    Bytes(Vec<u8>),
}

/// A sink chain bound to one peer.
pub struct ConnectionSession {
    side: ChainSide,
    stages: Vec<ActiveStage>,
}

impl ConnectionSession {
    pub fn side(&self) -> ChainSide {
        self.side
    }

    pub fn is_encrypted(&self) -> bool {
        self.stages
            .iter()
            .any(|s| matches!(s, ActiveStage::Encrypt(_)))
    }

    pub fn send(&self, message: &serde_json::Value) -> Result<Vec<u8>> {
        let mut payload = Payload::Message(message.clone());
        match self.side {
            ChainSide::Client => {
                for stage in &self.stages {
                    payload = outbound(stage, payload)?;
                }
            }
            ChainSide::Server => {
                for stage in self.stages.iter().rev() {
                    payload = outbound(stage, payload)?;
                }
            }
        }
        match payload {
            Payload::Bytes(bytes) => Ok(bytes),
            Payload::Message(_) => Err(TransportError::Chain(
                "chain has no formatter stage".into(),
            )),
        }
    }

    pub fn receive(&self, bytes: &[u8]) -> Result<serde_json::Value> {
        let mut payload = Payload::Bytes(bytes.to_vec());
        match self.side {
            ChainSide::Client => {
                for stage in self.stages.iter().rev() {
                    payload = inbound(stage, payload)?;
                }
            }
            ChainSide::Server => {
                for stage in &self.stages {
                    payload = inbound(stage, payload)?;
                }
            }
        }
        match payload {
            Payload::Message(message) => Ok(message),
            Payload::Bytes(_) => Err(TransportError::Chain(
                "chain has no formatter stage".into(),
            )),
        }
    }
}

impl fmt::Debug for ConnectionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSession")
            .field("side", &self.side)
            .field("stages", &self.stages.len())
            .field("encrypted", &self.is_encrypted())
            .finish()
    }
}

fn outbound(stage: &ActiveStage, payload: Payload) -> Result<Payload> {
    match (stage, payload) {
        (ActiveStage::Format(formatter), Payload::Message(message)) => {
            Ok(Payload::Bytes(formatter.serialize(&message)?))
        }
        (ActiveStage::Encrypt(cipher), Payload::Bytes(bytes)) => {
            Ok(Payload::Bytes(cipher.encrypt(&bytes)?))
        }
        (ActiveStage::Format(_), Payload::Bytes(_)) => Err(TransportError::Chain(
            "formatter stage received bytes on send".into(),
        )),
        (ActiveStage::Encrypt(_), Payload::Message(_)) => Err(TransportError::Chain(
            "crypto stage placed before the formatter".into(),
        )),
    }
}

fn inbound(stage: &ActiveStage, payload: Payload) -> Result<Payload> {
    match (stage, payload) {
        (ActiveStage::Encrypt(cipher), Payload::Bytes(bytes)) => {
            Ok(Payload::Bytes(cipher.decrypt(&bytes)?))
        }
        (ActiveStage::Format(formatter), Payload::Bytes(bytes)) => {
            Ok(Payload::Message(formatter.deserialize(&bytes)?))
        }
        (_, Payload::Message(_)) => Err(TransportError::Chain(
            "stage after the formatter on receive".into(),
        )),
    }
}
