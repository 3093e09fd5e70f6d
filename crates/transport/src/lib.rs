// Remora Transport - Sink chains, protocol setup and channel registry
// Sockets and framing stay outside; this crate only decides what a payload
// goes through on its way in and out.

pub mod channel;
pub mod crypto;
pub mod error;
pub mod formatter;
pub mod setup;
pub mod sink;

pub use channel::{Channel, ChannelRegistry, ChannelSettings, SocketCachePolicy};
pub use crypto::{
    CryptoProvider, CryptoSettings, PeerProfile, StandardCryptoProvider, SymmetricCipher,
};
pub use error::{Result, TransportError};
pub use formatter::{Formatter, FormatterSettings, JsonFormatter, Versioning, WireMessage};
pub use setup::ProtocolSetup;
pub use sink::{ChainSide, ConnectionSession, CryptoStage, SinkChain, SinkStage, SinkStageKind};
