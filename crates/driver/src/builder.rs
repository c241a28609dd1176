//! Optimistic and synchronous payload building.
//!
//! After every commit the driver predicts whether this node proposes next
//! and, if so, asks the engine to start building ahead of time.  When the
//! proposer turn actually arrives the pre-built payload is fetched, or a
//! synchronous build runs as the fallback.  A wrong prediction only costs
//! latency, never a bad proposal.

use std::sync::atomic::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

use tenon_common::metrics::OPTIMISTIC_BUILDS_TOTAL;
use tenon_db::traits::{ExecStateProvider, ExecStateStore};
use tenon_eectl::engine::EngineApi;
use tenon_eectl::errors::EngineError;
use tenon_eectl::messages::{BlockStatus, ForkchoiceTarget, PayloadEnv};
use tenon_primitives::buf::Buf32;
use tenon_state::{ElPayload, ElWithdrawal, ProposedPayload};
use tracing::*;

use crate::driver::{ConsensusRound, EngineDriver, OptimisticPayload};
use crate::errors::{DriverError, DriverResult};

/// Unix time in seconds.
fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl<E, D> EngineDriver<E, D>
where
    E: EngineApi,
    D: ExecStateStore + ExecStateProvider,
{
    /// Speculatively starts a payload build when this node is predicted to
    /// propose next.  Failures only cost the head start, so they are logged
    /// and swallowed.
    pub async fn trigger_build_optimistic(&self, round: ConsensusRound) {
        if !self.build_optimistic.load(Ordering::Relaxed) {
            return;
        }

        // Consensus comes up after us; without it there is no prediction.
        let Some(consensus) = self.consensus.read().clone() else {
            trace!("no consensus API registered, skipping optimistic build");
            return;
        };

        let validators = match consensus.validator_set(round.height()).await {
            Ok(validators) => validators,
            Err(err) => {
                debug!(%err, "validator set unavailable, skipping optimistic build");
                return;
            }
        };
        let Some(proposer) = validators.next_proposer() else {
            return;
        };
        if proposer.address() != self.addresses.local_address() {
            return;
        }

        match self.request_build(unix_now()).await {
            Ok(handle) => {
                debug!(
                    payload_id = %handle.payload_id(),
                    height = handle.height(),
                    "started optimistic payload build"
                );
                *self.optimistic.lock() = Some(handle);
            }
            Err(err) => warn!(%err, "optimistic payload build failed"),
        }
    }

    /// Produces the payload to propose this round, preferring the optimistic
    /// build and falling back to a synchronous one.
    pub async fn propose_payload(&self, round: ConsensusRound) -> DriverResult<ProposedPayload> {
        let head = self.db.get_head()?;
        let expected_height = head.block_height() + 1;

        let payload = match self.fetch_optimistic(expected_height).await {
            Some(payload) => {
                OPTIMISTIC_BUILDS_TOTAL.with_label_values(&["hit"]).inc();
                payload
            }
            None => {
                OPTIMISTIC_BUILDS_TOTAL.with_label_values(&["miss"]).inc();
                let payload = self.build_now(round).await?;
                if payload.block_number != expected_height {
                    return Err(DriverError::BuiltHeightMismatch {
                        expected: expected_height,
                        got: payload.block_number,
                    });
                }
                payload
            }
        };

        let proposal = ProposedPayload::from_payload(&payload)
            .map_err(|e| DriverError::Other(format!("encoding payload: {e}")))?;
        info!(height = payload.block_number, "proposing execution payload");
        Ok(proposal)
    }

    /// Consumes the held build handle when it targets `height` and fetches
    /// its payload.  Any problem turns into a miss.
    async fn fetch_optimistic(&self, height: u64) -> Option<ElPayload> {
        let handle = {
            let mut slot = self.optimistic.lock();
            match *slot {
                Some(handle) if handle.height() == height => slot.take(),
                _ => None,
            }
        }?;

        match self.engine.get_payload(handle.payload_id()).await {
            Ok(built) => {
                let payload = built.into_payload();
                if payload.block_number != height {
                    warn!(
                        expected = height,
                        got = payload.block_number,
                        "discarding optimistic payload built for the wrong height"
                    );
                    return None;
                }
                Some(payload)
            }
            Err(err) => {
                warn!(
                    %err,
                    payload_id = %handle.payload_id(),
                    age = ?handle.updated_at().elapsed(),
                    "optimistic payload fetch failed, rebuilding"
                );
                None
            }
        }
    }

    /// Asks the engine for a forkchoice update with build attributes on top
    /// of the current head, returning the handle for the started build.
    async fn request_build(&self, timestamp: u64) -> DriverResult<OptimisticPayload> {
        let head = self.db.get_head()?;
        let eligible = self
            .db
            .list_eligible_withdrawals(self.config.max_withdrawals_per_block)?;
        let withdrawals: Vec<ElWithdrawal> = eligible.iter().map(Into::into).collect();

        let timestamp = timestamp.max(head.block_time() + 1);
        let env = PayloadEnv::new(
            timestamp,
            // Deterministic randomness carried over from the parent hash.
            head.block_hash(),
            self.fee_recipients.local_fee_recipient(),
            withdrawals,
            Buf32::zero(),
        );

        let resp = self
            .engine
            .update_forkchoice(ForkchoiceTarget::all(head.block_hash()), Some(env))
            .await?;
        match resp.status() {
            BlockStatus::Valid => {}
            BlockStatus::Syncing => return Err(DriverError::EngineSyncing),
            status => return Err(DriverError::UnexpectedStatus(status.clone())),
        }
        // should never happen, a VALID answer to attributed fcu carries an id
        let payload_id = resp.payload_id().ok_or(EngineError::MissingPayloadId)?;

        Ok(OptimisticPayload::new(payload_id, head.block_height() + 1))
    }

    /// Synchronous build: trigger, give the engine the configured delay to
    /// fill the block from its pool, then fetch.
    async fn build_now(&self, round: ConsensusRound) -> DriverResult<ElPayload> {
        let handle = self.request_build(round.timestamp()).await?;

        tokio::time::sleep(self.config.build_delay()).await;

        let built = self.engine.get_payload(handle.payload_id()).await?;
        Ok(built.into_payload())
    }
}
