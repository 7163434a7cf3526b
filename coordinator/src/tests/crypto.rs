use infimum_state::{KeyError, PrivateKey};
use zeroize::Zeroizing;

use crate::crypto::{parse_private_key, AesGcmDecryptor, Decryptor, EnvKeyStore, KeyStore, NONCE_LEN};
use crate::error::ServiceError;
use crate::tests::{get_encrypted_coordinator_key, KEY_MATERIAL};

/// An encrypted coordinator key decrypts back to the same key.
#[test]
fn decrypt_coordinator_key()
{
    let material = Zeroizing::new(KEY_MATERIAL.to_vec());
    let plaintext = AesGcmDecryptor.decrypt(&material, &get_encrypted_coordinator_key()).unwrap();
    let key = parse_private_key(&plaintext).unwrap();

    assert_eq!(key.public_key(), PrivateKey::from_bytes([7u8; 32]).unwrap().public_key());
}

/// Decryption under the wrong material fails authentication.
#[test]
fn wrong_key_material()
{
    let material = Zeroizing::new(vec![1u8; 32]);
    let result = AesGcmDecryptor.decrypt(&material, &get_encrypted_coordinator_key());
    assert!(matches!(result, Err(ServiceError::Decryption(_))));

    let material = Zeroizing::new(vec![1u8; 16]);
    let result = AesGcmDecryptor.decrypt(&material, &get_encrypted_coordinator_key());
    assert!(matches!(result, Err(ServiceError::Decryption(_))));
}

/// A payload holding no ciphertext is rejected.
#[test]
fn short_payload()
{
    let material = Zeroizing::new(KEY_MATERIAL.to_vec());
    let result = AesGcmDecryptor.decrypt(&material, &[0u8; NONCE_LEN]);
    assert!(matches!(result, Err(ServiceError::Decryption(_))));
}

/// Plaintexts which are not serialized keys are rejected.
#[test]
fn malformed_plaintext()
{
    assert!(matches!(parse_private_key(&[0xff, 0xfe]), Err(ServiceError::Decryption(_))));
    assert!(matches!(parse_private_key(b"macipk.00"), Err(ServiceError::Key(KeyError::Malformed(_)))));
}

/// Key material is read from the environment on demand.
#[tokio::test]
async fn env_key_store()
{
    let var = "INFIMUM_TEST_ENV_KEY_STORE";
    std::env::set_var(var, hex::encode(KEY_MATERIAL));
    let material = EnvKeyStore::new(var).key_material().await.unwrap();
    assert_eq!(material.as_slice(), &KEY_MATERIAL);

    std::env::set_var(var, "not hex");
    assert!(matches!(EnvKeyStore::new(var).key_material().await, Err(ServiceError::Config(_))));

    std::env::remove_var(var);
    assert!(matches!(EnvKeyStore::new(var).key_material().await, Err(ServiceError::Config(_))));
}
