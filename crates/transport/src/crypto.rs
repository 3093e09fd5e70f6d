// Crypto stage: symmetric encryption negotiated per connection

use crate::error::{Result, TransportError};
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use des::TdesEde3;
use hkdf::Hkdf;
use sha2::Sha256;
use std::fmt;
use std::sync::Arc;

pub const AES_256_GCM: &str = "AES-256-GCM";
pub const TRIPLE_DES: &str = "3DES";

const NONCE_LEN: usize = 12;
const AES_KEY_LEN: usize = 32;
const TDES_KEY_LEN: usize = 24;
const TDES_IV_LEN: usize = 8;

type TdesCbcEncryptor = cbc::Encryptor<TdesEde3>;
type TdesCbcDecryptor = cbc::Decryptor<TdesEde3>;

/// Symmetric cipher agreed for one connection
pub trait SymmetricCipher: Send + Sync {
    fn algorithm(&self) -> &str;

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoSettings {
    pub algorithm: String,
    pub oaep: bool,
}

/// What the remote side announced during the handshake
#[derive(Clone, Default)]
pub struct PeerProfile {
    pub supports_encryption: bool,
    pub algorithms: Vec<String>,
    /// Shared secret the session key is derived from
    pub key_material: Vec<u8>,
}

impl PeerProfile {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn encrypted(algorithm: impl Into<String>, key_material: impl Into<Vec<u8>>) -> Self {
        Self {
            supports_encryption: true,
            algorithms: vec![algorithm.into()],
            key_material: key_material.into(),
        }
    }

    pub fn offers(&self, algorithm: &str) -> bool {
        self.algorithms
            .iter()
            .any(|a| a.eq_ignore_ascii_case(algorithm))
    }
}

impl fmt::Debug for PeerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerProfile")
            .field("supports_encryption", &self.supports_encryption)
            .field("algorithms", &self.algorithms)
            .finish_non_exhaustive()
    }
}

/// Produces a cipher for a connection from local settings and the peer profile
pub trait CryptoProvider: Send + Sync {
    fn negotiate(
        &self,
        settings: &CryptoSettings,
        peer: &PeerProfile,
    ) -> Result<Arc<dyn SymmetricCipher>>;
}

/// Session ciphers keyed with HKDF-SHA256 over the peer's key material.
///
/// Supported algorithms:
/// - `AES-256-GCM`, output layout `nonce || ciphertext`
/// - `3DES` (EDE3 in CBC mode with PKCS#7 padding), output layout
///   `iv || ciphertext`
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardCryptoProvider;

impl StandardCryptoProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn supports(algorithm: &str) -> bool {
        [AES_256_GCM, TRIPLE_DES]
            .iter()
            .any(|known| known.eq_ignore_ascii_case(algorithm))
    }

    fn derive_key<const N: usize>(settings: &CryptoSettings, key_material: &[u8]) -> Result<[u8; N]> {
        let info = format!("remora/{}/oaep={}", settings.algorithm, settings.oaep);
        let hk = Hkdf::<Sha256>::new(None, key_material);
        let mut okm = [0u8; N];
        hk.expand(info.as_bytes(), &mut okm)
            .map_err(|e| TransportError::Crypto(format!("key derivation failed: {e}")))?;
        Ok(okm)
    }
}

impl CryptoProvider for StandardCryptoProvider {
    fn negotiate(
        &self,
        settings: &CryptoSettings,
        peer: &PeerProfile,
    ) -> Result<Arc<dyn SymmetricCipher>> {
        if !Self::supports(&settings.algorithm) {
            return Err(TransportError::Crypto(format!(
                "unsupported algorithm '{}'",
                settings.algorithm
            )));
        }
        if !peer.offers(&settings.algorithm) {
            return Err(TransportError::Crypto(format!(
                "peer does not offer '{}'",
                settings.algorithm
            )));
        }
        if peer.key_material.is_empty() {
            return Err(TransportError::Crypto("peer sent no key material".into()));
        }

        if settings.algorithm.eq_ignore_ascii_case(TRIPLE_DES) {
            let key = Self::derive_key::<TDES_KEY_LEN>(settings, &peer.key_material)?;
            return Ok(Arc::new(TripleDesCipher { key }));
        }

        let key = Self::derive_key::<AES_KEY_LEN>(settings, &peer.key_material)?;
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| TransportError::Crypto(format!("invalid key: {e}")))?;
        Ok(Arc::new(AesGcmCipher { cipher }))
    }
}

struct AesGcmCipher {
    cipher: Aes256Gcm,
}

impl SymmetricCipher for AesGcmCipher {
    fn algorithm(&self) -> &str {
        AES_256_GCM
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| TransportError::Crypto(format!("encryption failed: {e}")))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < NONCE_LEN {
            return Err(TransportError::Crypto("ciphertext too short".into()));
        }
        let (nonce, body) = ciphertext.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|e| TransportError::Crypto(format!("decryption failed: {e}")))
    }
}

/// Triple DES carries no authentication tag; a wrong key usually shows up
/// as a padding error but may yield garbage.
struct TripleDesCipher {
    key: [u8; TDES_KEY_LEN],
}

impl SymmetricCipher for TripleDesCipher {
    fn algorithm(&self) -> &str {
        TRIPLE_DES
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut iv = [0u8; TDES_IV_LEN];
        OsRng.fill_bytes(&mut iv);
        let ciphertext = TdesCbcEncryptor::new_from_slices(&self.key, &iv)
            .map_err(|e| TransportError::Crypto(format!("invalid key: {e}")))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut out = Vec::with_capacity(TDES_IV_LEN + ciphertext.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < TDES_IV_LEN * 2 {
            return Err(TransportError::Crypto("ciphertext too short".into()));
        }
        let (iv, body) = ciphertext.split_at(TDES_IV_LEN);
        TdesCbcDecryptor::new_from_slices(&self.key, iv)
            .map_err(|e| TransportError::Crypto(format!("invalid key: {e}")))?
            .decrypt_padded_vec_mut::<Pkcs7>(body)
            .map_err(|_| TransportError::Crypto("decryption failed: bad padding".into()))
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Accepts any algorithm name and XORs with the first key byte.
    #[derive(Debug, Default)]
    pub struct XorCryptoProvider {
        negotiations: AtomicUsize,
    }

    impl XorCryptoProvider {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn negotiations(&self) -> usize {
            self.negotiations.load(Ordering::SeqCst)
        }
    }

    impl CryptoProvider for XorCryptoProvider {
        fn negotiate(
            &self,
            settings: &CryptoSettings,
            peer: &PeerProfile,
        ) -> Result<Arc<dyn SymmetricCipher>> {
            self.negotiations.fetch_add(1, Ordering::SeqCst);
            let key = peer.key_material.first().copied().unwrap_or(0x5a);
            Ok(Arc::new(XorCipher {
                algorithm: settings.algorithm.clone(),
                key,
            }))
        }
    }

    struct XorCipher {
        algorithm: String,
        key: u8,
    }

    impl SymmetricCipher for XorCipher {
        fn algorithm(&self) -> &str {
            &self.algorithm
        }

        fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
            Ok(plaintext.iter().map(|b| b ^ self.key).collect())
        }

        fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
            self.encrypt(ciphertext)
        }
    }
}
