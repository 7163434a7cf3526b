use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use infimum_coordinator::logger::initialize_logger;
use infimum_coordinator::{
    Address,
    AesGcmDecryptor,
    CommandBackend,
    CoordinatorConfig,
    EnvKeyStore,
    ProofRequest,
    ProofService,
    SnapshotChain
};
use infimum_state::{BlockNumber, PollId};
use tracing::info;

/// Generates the message processing and tally proofs of a poll.
#[derive(Debug, Parser)]
#[command(name = "infimum-coordinator", version)]
struct Cli
{
    /// Exported chain snapshot to read contract state and events from.
    #[arg(long)]
    snapshot: PathBuf,

    #[arg(long)]
    poll_id: PollId,

    /// Address of the MACI contract.
    #[arg(long)]
    maci: Address,

    /// Address of the tally contract.
    #[arg(long)]
    tally: Address,

    /// Select the quadratic voting proving keys.
    #[arg(long)]
    quadratic: bool,

    /// Hex encoded `nonce || ciphertext` of the coordinator key.
    #[arg(long, env = "COORDINATOR_ENCRYPTED_KEY", hide_env_values = true)]
    encrypted_key: String,

    #[arg(long, default_value_t = 0)]
    start_block: BlockNumber,

    #[arg(long)]
    end_block: BlockNumber,

    #[arg(long, default_value_t = 5000)]
    blocks_per_batch: u64,

    /// Overrides COORDINATOR_OUTPUT_DIR.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Overrides COORDINATOR_ZKEYS_DIR.
    #[arg(long)]
    zkeys_dir: Option<PathBuf>,

    /// Overrides COORDINATOR_NETWORK.
    #[arg(long)]
    network: Option<String>,

    /// Overrides COORDINATOR_PROOF_TIMEOUT_SECS. Must be positive.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()>
{
    dotenvy::dotenv().ok();
    initialize_logger();

    let cli = Cli::parse();
    let mut config = CoordinatorConfig::from_env().context("failed to load configuration")?;

    if let Some(output_dir) = cli.output_dir { config.output_dir = output_dir; }
    if let Some(zkeys_dir) = cli.zkeys_dir { config.zkeys_dir = zkeys_dir; }
    if let Some(network) = cli.network { config.network = network; }
    if let Some(secs) = cli.timeout_secs { config.proof_timeout = Duration::from_secs(secs); }

    info!(snapshot = %cli.snapshot.display(), network = %config.network, "starting coordinator");

    let chain = SnapshotChain::from_file(&cli.snapshot).await?;
    let service = ProofService::new(
        Arc::new(chain),
        Arc::new(EnvKeyStore::default()),
        Arc::new(AesGcmDecryptor),
        Arc::new(CommandBackend::new(&config.prover_bin)),
        config.service_config()
    );

    let request = ProofRequest {
        poll_id: cli.poll_id,
        maci_address: cli.maci,
        tally_address: cli.tally,
        use_quadratic_voting: cli.quadratic,
        encrypted_coordinator_private_key: hex::decode(cli.encrypted_key.trim())
            .context("the encrypted key is not hex encoded")?,
        start_block: cli.start_block,
        end_block: cli.end_block,
        blocks_per_batch: cli.blocks_per_batch
    };

    let bundle = service.generate_proofs(request).await?;
    info!(
        output = %bundle.output_dir.display(),
        process_proofs = bundle.process_proofs.len(),
        tally_proofs = bundle.tally_proofs.len(),
        "proofs published"
    );
    println!("{}", serde_json::to_string_pretty(&bundle)?);

    Ok(())
}
