use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::error::ServiceError;
use crate::prover::{ProofBackend, ProofData, ProofJob, TallyOutput};

pub const STATE_FILE: &str = "state.json";
pub const PROCESS_PROOFS_FILE: &str = "process_proofs.json";
pub const TALLY_PROOFS_FILE: &str = "tally_proofs.json";
pub const TALLY_FILE: &str = "tally.json";

/// Drives an external prover executable.
///
/// The prover is invoked as `<program> <process|tally> --state <file> --poll-id <id>
/// --zkey <file> --tally-address <address> --network <name> --output <dir>` and reads
/// the serialized coordinator key from stdin, so the key never appears in the process
/// table. The child is killed if the request is dropped.
#[derive(Clone, Debug)]
pub struct CommandBackend
{
    program: PathBuf
}

impl CommandBackend
{
    pub fn new(program: impl Into<PathBuf>) -> CommandBackend
    {
        CommandBackend { program: program.into() }
    }

    async fn run(&self, job: &ProofJob<'_>, subcommand: &str, zkey: &Path) -> Result<(), ServiceError>
    {
        let state_path = job.output_dir.join(STATE_FILE);
        if !tokio::fs::try_exists(&state_path).await?
        {
            tokio::fs::write(&state_path, job.state.to_json()?).await?;
        }

        let Some(private_key) = job.coordinator.private_key.as_ref()
        else
        {
            return Err(ServiceError::ProofBackendFailure("the coordinator private key is unavailable".into()));
        };

        debug!(program = %self.program.display(), subcommand, "spawning prover");
        let mut child = Command::new(&self.program)
            .arg(subcommand)
            .arg("--state").arg(&state_path)
            .arg("--poll-id").arg(job.poll_id.to_string())
            .arg("--zkey").arg(zkey)
            .arg("--tally-address").arg(job.tally_address.to_string())
            .arg("--network").arg(job.network)
            .arg("--output").arg(job.output_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take()
        {
            let key = Zeroizing::new(private_key.serialize());
            stdin.write_all(key.as_bytes()).await?;
            // Closing the pipe signals the end of the key.
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        if !output.status.success()
        {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr.lines().last().unwrap_or_default().trim().to_string();
            Err(ServiceError::ProofBackendFailure(format!("`{}` exited with {}: {}", subcommand, output.status, reason)))?
        }

        info!(subcommand, "prover finished");
        Ok(())
    }
}

async fn read_artifact<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<T, ServiceError>
{
    let path = dir.join(name);
    let json = tokio::fs::read_to_string(&path).await
        .map_err(|error| ServiceError::ProofBackendFailure(format!("missing artifact {}: {}", path.display(), error)))?;

    serde_json::from_str(&json)
        .map_err(|error| ServiceError::ProofBackendFailure(format!("malformed artifact {}: {}", path.display(), error)))
}

#[async_trait]
impl ProofBackend for CommandBackend
{
    async fn generate_message_processing_proofs(&self, job: &ProofJob<'_>) -> Result<Vec<ProofData>, ServiceError>
    {
        self.run(job, "process", &job.zkeys.process_messages).await?;
        read_artifact(job.output_dir, PROCESS_PROOFS_FILE).await
    }

    async fn generate_tally_proofs(&self, job: &ProofJob<'_>) -> Result<TallyOutput, ServiceError>
    {
        self.run(job, "tally", &job.zkeys.tally_votes).await?;

        Ok(TallyOutput {
            tally_proofs: read_artifact(job.output_dir, TALLY_PROOFS_FILE).await?,
            tally_data: read_artifact(job.output_dir, TALLY_FILE).await?
        })
    }
}
