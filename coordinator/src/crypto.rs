//! Recovery of the coordinator key from its encrypted form.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use async_trait::async_trait;
use infimum_state::PrivateKey;
use zeroize::Zeroizing;

use crate::error::ServiceError;

pub const NONCE_LEN: usize = 12;
pub const KEY_LEN: usize = 32;

pub const COORDINATOR_KEY_VAR: &str = "COORDINATOR_KEY";

/// Key material of the service itself, wiped when dropped.
pub type KeyMaterial = Zeroizing<Vec<u8>>;

/// Source of the material which unlocks encrypted coordinator keys.
#[async_trait]
pub trait KeyStore: Send + Sync
{
    async fn key_material(&self) -> Result<KeyMaterial, ServiceError>;
}

pub trait Decryptor: Send + Sync
{
    /// Decrypts `payload` under `material`, yielding the plaintext key.
    fn decrypt(&self, material: &KeyMaterial, payload: &[u8]) -> Result<Zeroizing<Vec<u8>>, ServiceError>;
}

/// Reads hex encoded key material from an environment variable on every request.
#[derive(Clone, Debug)]
pub struct EnvKeyStore
{
    var: String
}

impl EnvKeyStore
{
    pub fn new(var: impl Into<String>) -> EnvKeyStore
    {
        EnvKeyStore { var: var.into() }
    }
}

impl Default for EnvKeyStore
{
    fn default() -> Self
    {
        EnvKeyStore::new(COORDINATOR_KEY_VAR)
    }
}

#[async_trait]
impl KeyStore for EnvKeyStore
{
    async fn key_material(&self) -> Result<KeyMaterial, ServiceError>
    {
        let encoded = Zeroizing::new(
            std::env::var(&self.var).map_err(|_| ServiceError::Config(format!("{} is not set", self.var)))?
        );
        let material = hex::decode(encoded.trim())
            .map_err(|_| ServiceError::Config(format!("{} is not hex encoded", self.var)))?;

        Ok(Zeroizing::new(material))
    }
}

/// AES-256-GCM over `nonce || ciphertext`.
#[derive(Clone, Copy, Debug, Default)]
pub struct AesGcmDecryptor;

impl AesGcmDecryptor
{
    /// Encrypts a coordinator key for storage. Used by operators and tests.
    pub fn encrypt(
        material: &[u8],
        nonce: [u8; NONCE_LEN],
        plaintext: &[u8]
    ) -> Result<Vec<u8>, ServiceError>
    {
        let cipher = Self::cipher(material)?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| ServiceError::Decryption("encryption failed".into()))?;

        let mut payload = nonce.to_vec();
        payload.extend_from_slice(&ciphertext);
        Ok(payload)
    }

    fn cipher(material: &[u8]) -> Result<Aes256Gcm, ServiceError>
    {
        if material.len() != KEY_LEN
        {
            Err(ServiceError::Decryption(format!("expected a {} byte key, found {} bytes", KEY_LEN, material.len())))?
        }
        Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(material)))
    }
}

impl Decryptor for AesGcmDecryptor
{
    fn decrypt(&self, material: &KeyMaterial, payload: &[u8]) -> Result<Zeroizing<Vec<u8>>, ServiceError>
    {
        if payload.len() <= NONCE_LEN { Err(ServiceError::Decryption("payload is too short".into()))? }

        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let plaintext = Self::cipher(material)?
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| ServiceError::Decryption("authentication failed".into()))?;

        Ok(Zeroizing::new(plaintext))
    }
}

/// Parses a decrypted `macisk.` key.
pub fn parse_private_key(plaintext: &[u8]) -> Result<PrivateKey, ServiceError>
{
    let text = core::str::from_utf8(plaintext)
        .map_err(|_| ServiceError::Decryption("plaintext is not a serialized key".into()))?;

    Ok(PrivateKey::parse(text)?)
}
