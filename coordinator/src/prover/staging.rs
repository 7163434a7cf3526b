use std::path::{Path, PathBuf};

use infimum_state::PollId;
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::ServiceError;

/// A scratch directory which becomes the poll's output directory only once every
/// artifact is written. An unpublished directory is removed on drop, so an error,
/// timeout or cancellation never leaves partial proofs behind.
///
/// Each request stages under its own randomly suffixed `.poll-{id}.` directory; two
/// requests for one poll never share a staging area, and the later publish fails.
#[derive(Debug)]
pub struct StagingDir
{
    staging: Option<TempDir>,
    target: PathBuf
}

impl StagingDir
{
    pub async fn create(output_root: &Path, poll_id: PollId) -> Result<StagingDir, ServiceError>
    {
        tokio::fs::create_dir_all(output_root).await?;

        let target = output_root.join(format!("poll-{}", poll_id));
        if tokio::fs::try_exists(&target).await?
        {
            Err(ServiceError::Config(format!("output directory {} already exists", target.display())))?
        }

        let staging = tempfile::Builder::new()
            .prefix(&format!(".poll-{}.", poll_id))
            .tempdir_in(output_root)?;
        debug!(path = %staging.path().display(), "created staging directory");

        Ok(StagingDir { staging: Some(staging), target })
    }

    pub fn path(&self) -> &Path
    {
        match &self.staging
        {
            Some(staging) => staging.path(),
            None => &self.target,
        }
    }

    /// Atomically moves the staged artifacts to their final location.
    ///
    /// Fails if the target appeared in the meantime, leaving it untouched.
    pub async fn publish(mut self) -> Result<PathBuf, ServiceError>
    {
        let Some(staging) = self.staging.take() else { return Ok(self.target.clone()) };

        if tokio::fs::try_exists(&self.target).await?
        {
            remove(staging);
            return Err(ServiceError::Config(format!("output directory {} already exists", self.target.display())));
        }

        let renamed = tokio::fs::rename(staging.path(), &self.target).await;
        if let Err(error) = renamed
        {
            remove(staging);
            return Err(error.into());
        }

        // The directory now lives at the target, so there is nothing left to remove.
        let _ = staging.into_path();

        Ok(self.target.clone())
    }
}

fn remove(staging: TempDir)
{
    let path = staging.path().to_path_buf();
    if let Err(error) = staging.close()
    {
        warn!(path = %path.display(), %error, "failed to remove staging directory");
    }
}

impl Drop for StagingDir
{
    fn drop(&mut self)
    {
        if let Some(staging) = self.staging.take() { remove(staging); }
    }
}
