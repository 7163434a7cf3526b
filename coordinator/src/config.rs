//! Service configuration, read from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ServiceError;
use crate::prover::ZkeyLocator;
use crate::reconstruct::RetryPolicy;
use crate::service::ServiceConfig;

pub const ZKEYS_DIR_VAR: &str = "COORDINATOR_ZKEYS_DIR";
pub const OUTPUT_DIR_VAR: &str = "COORDINATOR_OUTPUT_DIR";
pub const PROVER_BIN_VAR: &str = "COORDINATOR_PROVER_BIN";
pub const PROOF_TIMEOUT_VAR: &str = "COORDINATOR_PROOF_TIMEOUT_SECS";
pub const SCAN_RETRIES_VAR: &str = "COORDINATOR_SCAN_RETRIES";
pub const SCAN_BACKOFF_VAR: &str = "COORDINATOR_SCAN_BACKOFF_MS";
pub const NETWORK_VAR: &str = "COORDINATOR_NETWORK";

pub const DEFAULT_PROOF_TIMEOUT_SECS: u64 = 3600;
pub const DEFAULT_SCAN_RETRIES: u32 = 3;
pub const DEFAULT_SCAN_BACKOFF_MS: u64 = 500;
pub const DEFAULT_NETWORK: &str = "localhost";

/// Coordinator configuration.
///
/// The AES key unlocking coordinator keys is not part of it:
/// [`EnvKeyStore`](crate::crypto::EnvKeyStore) reads `COORDINATOR_KEY` per request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CoordinatorConfig
{
    /// Directory holding the proving keys.
    pub zkeys_dir: PathBuf,

    /// Directory the per-poll output directories are published into.
    pub output_dir: PathBuf,

    /// The external prover executable.
    pub prover_bin: PathBuf,

    pub proof_timeout: Duration,

    /// Attempts per event scan window.
    pub scan_retries: u32,

    /// Delay before the first scan retry.
    pub scan_backoff: Duration,

    /// The network whose verifier parameters the tally targets.
    pub network: String
}

impl CoordinatorConfig
{
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ServiceError>
    {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServiceError>
    where
        F: Fn(&str) -> Option<String>
    {
        let required = |name: &str| lookup(name).ok_or_else(|| ServiceError::Config(format!("{} must be set", name)));

        let zkeys_dir = PathBuf::from(required(ZKEYS_DIR_VAR)?);
        let output_dir = PathBuf::from(required(OUTPUT_DIR_VAR)?);
        let prover_bin = PathBuf::from(required(PROVER_BIN_VAR)?);

        let proof_timeout_secs: u64 = parse_or(&lookup, PROOF_TIMEOUT_VAR, DEFAULT_PROOF_TIMEOUT_SECS)?;
        let scan_retries: u32 = parse_or(&lookup, SCAN_RETRIES_VAR, DEFAULT_SCAN_RETRIES)?;
        let scan_backoff_ms: u64 = parse_or(&lookup, SCAN_BACKOFF_VAR, DEFAULT_SCAN_BACKOFF_MS)?;
        let network = lookup(NETWORK_VAR).unwrap_or_else(|| DEFAULT_NETWORK.to_string());

        if proof_timeout_secs == 0 { Err(ServiceError::Config(format!("{} must be positive", PROOF_TIMEOUT_VAR)))? }
        if scan_retries == 0 { Err(ServiceError::Config(format!("{} must be positive", SCAN_RETRIES_VAR)))? }

        Ok(Self {
            zkeys_dir,
            output_dir,
            prover_bin,
            proof_timeout: Duration::from_secs(proof_timeout_secs),
            scan_retries,
            scan_backoff: Duration::from_millis(scan_backoff_ms),
            network
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy
    {
        RetryPolicy { max_attempts: self.scan_retries, base_delay: self.scan_backoff }
    }

    pub fn service_config(&self) -> ServiceConfig
    {
        ServiceConfig {
            zkeys: ZkeyLocator::new(&self.zkeys_dir),
            output_dir: self.output_dir.clone(),
            proof_timeout: self.proof_timeout,
            retry: self.retry_policy(),
            network: self.network.clone()
        }
    }
}

fn parse_or<T, F>(lookup: &F, name: &str, default: T) -> Result<T, ServiceError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>
{
    match lookup(name)
    {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ServiceError::Config(format!("{} has an invalid value `{}`", name, value))),
    }
}
