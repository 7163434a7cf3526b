//! Rebuilds a [`MaciState`] from the chain event log.

use std::time::Duration;

use infimum_state::{BlockNumber, Keypair, MaciState, PollId, StateError};
use tracing::{debug, warn};

use crate::chain::{Address, ChainEvent, ChainReader, EventKind};
use crate::error::ServiceError;

/// Bounded exponential backoff for event scans.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy
{
    /// Total attempts per block window, including the first.
    pub max_attempts: u32,

    /// The delay before the first retry; doubled for every further retry.
    pub base_delay: Duration
}

impl Default for RetryPolicy
{
    fn default() -> Self
    {
        RetryPolicy { max_attempts: 3, base_delay: Duration::from_millis(500) }
    }
}

impl RetryPolicy
{
    /// The delay after the given failed attempt, counted from one.
    pub fn delay(&self, attempt: u32) -> Duration
    {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// The inclusive block range holding the events to replay.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ScanRange
{
    pub start_block: BlockNumber,
    pub end_block: BlockNumber,
    pub blocks_per_batch: u64
}

impl ScanRange
{
    /// Splits the range into consecutive windows of at most `blocks_per_batch` blocks.
    pub fn windows(&self) -> Result<Windows, ServiceError>
    {
        if self.blocks_per_batch == 0 { Err(ServiceError::Config("blocks per batch must be positive".into()))? }
        if self.start_block > self.end_block
        {
            Err(ServiceError::Config(format!("start block {} is after end block {}", self.start_block, self.end_block)))?
        }

        Ok(Windows {
            next: Some(self.start_block),
            end_block: self.end_block,
            blocks_per_batch: self.blocks_per_batch
        })
    }
}

/// Inclusive `(from, to)` block windows, produced as they are scanned.
#[derive(Clone, Debug)]
pub struct Windows
{
    next: Option<BlockNumber>,
    end_block: BlockNumber,
    blocks_per_batch: u64
}

impl Iterator for Windows
{
    type Item = (BlockNumber, BlockNumber);

    fn next(&mut self) -> Option<Self::Item>
    {
        let from = self.next?;
        let to = from.saturating_add(self.blocks_per_batch - 1).min(self.end_block);
        self.next = if to == self.end_block { None } else { Some(to + 1) };

        Some((from, to))
    }
}

/// Applies events to a fresh state, keeping only the target poll materialized.
#[derive(Debug)]
pub struct Replayer
{
    state: MaciState,
    target: PollId,
    last_position: Option<(BlockNumber, u32)>
}

impl Replayer
{
    pub fn new(state_tree_depth: u8, target: PollId) -> Result<Replayer, ServiceError>
    {
        Ok(Replayer {
            state: MaciState::new(state_tree_depth)?,
            target,
            last_position: None
        })
    }

    pub fn apply(&mut self, event: &ChainEvent) -> Result<(), ServiceError>
    {
        let position = event.position();
        if let Some(last) = self.last_position
        {
            if position <= last
            {
                Err(divergence(format!("event at {:?} does not follow event at {:?}", position, last)))?
            }
        }
        self.last_position = Some(position);

        match &event.kind
        {
            EventKind::SignUp(sign_up) =>
            {
                let expected = self.state.num_sign_ups();
                if sign_up.state_index != expected
                {
                    Err(divergence(format!("sign-up at index {} where {} was expected", sign_up.state_index, expected)))?
                }

                self.state.sign_up(sign_up.public_key, sign_up.voice_credit_balance, sign_up.timestamp)?;
            },
            EventKind::DeployPoll(deploy) =>
            {
                let expected = self.state.num_polls();
                if deploy.poll_id != expected
                {
                    Err(divergence(format!("poll {} deployed where {} was expected", deploy.poll_id, expected)))?
                }

                if deploy.poll_id == self.target
                {
                    self.state.deploy_poll(
                        deploy.end_timestamp,
                        deploy.max_values,
                        deploy.tree_depths,
                        deploy.message_batch_size,
                        Keypair::from_public_key(deploy.coordinator_public_key)
                    )?;
                }
                else
                {
                    self.state.deploy_null_poll()?;
                }
            },
            EventKind::PublishMessage(publish) if publish.poll_id == self.target =>
            {
                let poll = self.state.poll_mut(self.target).map_err(|error| match error
                {
                    StateError::PollNotFound(_) => divergence(format!("message published to poll {} before its deployment", self.target)),
                    error => error.into(),
                })?;
                poll.publish_message(publish.message, publish.enc_pub_key)?;
            },
            EventKind::PublishMessage(_) => {},
        }

        Ok(())
    }

    pub fn finish(self) -> MaciState
    {
        self.state
    }
}

/// Reads one window, retrying transient failures with backoff.
pub async fn scan_window<C: ChainReader + ?Sized>(
    chain: &C,
    maci: &Address,
    from: BlockNumber,
    to: BlockNumber,
    retry: &RetryPolicy
) -> Result<Vec<ChainEvent>, ServiceError>
{
    let mut attempt = 1;
    loop
    {
        match chain.scan_events(maci, from, to).await
        {
            Ok(events) => return Ok(events),
            Err(error) if attempt >= retry.max_attempts =>
            {
                return Err(ServiceError::EventScanFailure { from, to, reason: error.to_string() });
            },
            Err(error) =>
            {
                let delay = retry.delay(attempt);
                warn!(from, to, attempt, %error, ?delay, "event scan failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            },
        }
    }
}

/// Replays every window of `range` in order.
pub async fn reconstruct<C: ChainReader + ?Sized>(
    chain: &C,
    maci: &Address,
    state_tree_depth: u8,
    target: PollId,
    range: &ScanRange,
    retry: &RetryPolicy
) -> Result<MaciState, ServiceError>
{
    let mut replayer = Replayer::new(state_tree_depth, target)?;

    for (from, to) in range.windows()?
    {
        let events = scan_window(chain, maci, from, to, retry).await?;
        debug!(from, to, events = events.len(), "scanned block window");

        for event in &events
        {
            if !(from..=to).contains(&event.block)
            {
                Err(divergence(format!("event at block {} reported for window {}..={}", event.block, from, to)))?
            }
            replayer.apply(event)?;
        }
    }

    Ok(replayer.finish())
}

fn divergence(reason: String) -> ServiceError
{
    ServiceError::ReconstructionDivergence(reason)
}
