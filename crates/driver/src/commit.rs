//! Commit-time payload application.

use tenon_db::traits::{ExecStateProvider, ExecStateStore};
use tenon_eectl::engine::EngineApi;
use tenon_eectl::messages::{BlockStatus, ForkchoiceTarget};
use tenon_primitives::buf::Buf32;
use tenon_state::{ExecutionHead, ProposedPayload};
use tracing::*;

use crate::driver::{ConsensusRound, EngineDriver};
use crate::errors::{DriverError, DriverResult};
use crate::events::EvmLog;
use crate::verification;

impl<E, D> EngineDriver<E, D>
where
    E: EngineApi,
    D: ExecStateStore + ExecStateProvider,
{
    /// Applies a committed proposal: re-verifies it, imports it into the
    /// engine, finalizes forkchoice on it, advances the stored head,
    /// delivers the block's events and clears the included withdrawals.
    pub async fn apply_payload(
        &self,
        round: ConsensusRound,
        proposal: &ProposedPayload,
        events: &[EvmLog],
    ) -> DriverResult<()> {
        let payload = verification::verify_payload(
            proposal,
            self.db.as_ref(),
            self.fee_recipients.as_ref(),
            round.timestamp(),
            self.config.max_withdrawals_per_block,
        )?;

        let status = self
            .engine
            .submit_payload(payload.clone(), vec![], Buf32::zero(), vec![])
            .await?;
        match status {
            BlockStatus::Valid => {}
            BlockStatus::Syncing => return Err(DriverError::EngineSyncing),
            BlockStatus::Invalid { validation_error } => {
                return Err(DriverError::RejectedPayload(
                    validation_error.unwrap_or_else(|| "engine gave no reason".to_string()),
                ));
            }
            status @ BlockStatus::Accepted => {
                return Err(DriverError::UnexpectedStatus(status));
            }
        }

        // Head, safe and finalized all move to the new block at once, every
        // committed block is final.
        let block_hash = payload.block_hash;
        let resp = self
            .engine
            .update_forkchoice(ForkchoiceTarget::all(block_hash), None)
            .await?;
        match resp.status() {
            BlockStatus::Valid => {}
            BlockStatus::Syncing => return Err(DriverError::EngineSyncing),
            status => return Err(DriverError::UnexpectedStatus(status.clone())),
        }

        let head = ExecutionHead::new(
            round.height(),
            payload.block_number,
            block_hash,
            payload.timestamp,
        );
        self.db.update_head(head)?;

        self.deliver_events(&block_hash, events)?;

        let included: Vec<u64> = payload.withdrawals.iter().map(|w| w.index).collect();
        if !included.is_empty() {
            self.db.remove_withdrawals(&included)?;
        }

        info!(
            block_height = payload.block_number,
            block_hash = ?block_hash,
            withdrawals = included.len(),
            "committed execution payload"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tenon_eectl::engine::MockEngineApi;
    use tenon_eectl::messages::ForkchoiceResp;
    use tenon_primitives::buf::Buf20;
    use tenon_rocksdb::test_utils::get_rocksdb_tmp_instance;
    use tenon_rocksdb::ExecStateDb;
    use tenon_state::{ElPayload, ElWithdrawal};
    use tenon_test_utils::ArbitraryGenerator;

    use super::*;
    use crate::config::DriverConfig;
    use crate::errors::PayloadError;
    use crate::events::{EventFilter, EvmEventProcessor};
    use crate::providers::{AddressProvider, FeeRecipientProvider};

    const GENESIS_HASH: [u8; 32] = [7u8; 32];
    const FEE_RECIPIENT: [u8; 20] = [5u8; 20];

    struct LocalAddress;

    impl AddressProvider for LocalAddress {
        fn local_address(&self) -> Buf20 {
            Buf20::zero()
        }
    }

    struct FixedFeeRecipient;

    impl FeeRecipientProvider for FixedFeeRecipient {
        fn local_fee_recipient(&self) -> Buf20 {
            FEE_RECIPIENT.into()
        }

        fn verify_fee_recipient(&self, recipient: &Buf20) -> anyhow::Result<()> {
            if *recipient == Buf20::from(FEE_RECIPIENT) {
                Ok(())
            } else {
                Err(anyhow::anyhow!("unknown fee recipient"))
            }
        }
    }

    struct Recording {
        address: Buf20,
        seen: Mutex<Vec<EvmLog>>,
    }

    impl Recording {
        fn new(address: Buf20) -> Self {
            Self {
                address,
                seen: Mutex::new(vec![]),
            }
        }
    }

    impl EvmEventProcessor for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn filter(&self) -> EventFilter {
            EventFilter {
                addresses: vec![self.address],
                topics: vec![],
            }
        }

        fn deliver(&self, _block_hash: &Buf32, log: &EvmLog) -> anyhow::Result<()> {
            self.seen.lock().push(log.clone());
            Ok(())
        }
    }

    fn setup_driver(
        engine: MockEngineApi,
        procs: Vec<Arc<dyn EvmEventProcessor>>,
    ) -> EngineDriver<MockEngineApi, ExecStateDb> {
        let (db, ops) = get_rocksdb_tmp_instance().unwrap();
        let db = Arc::new(ExecStateDb::new(db, ops));
        db.insert_genesis_head(&GENESIS_HASH).unwrap();

        EngineDriver::new(
            Arc::new(engine),
            db,
            Arc::new(LocalAddress),
            Arc::new(FixedFeeRecipient),
            procs,
            DriverConfig::default(),
        )
        .unwrap()
    }

    fn committable_payload() -> ElPayload {
        let mut payload: ElPayload = ArbitraryGenerator::new().generate();
        payload.parent_hash = GENESIS_HASH.into();
        payload.prev_randao = GENESIS_HASH.into();
        payload.block_number = 1;
        payload.timestamp = 1;
        payload.fee_recipient = FEE_RECIPIENT.into();
        payload.withdrawals = vec![];
        payload.witness = None;
        payload
    }

    fn valid_engine_for(payload: &ElPayload) -> MockEngineApi {
        let block_hash = payload.block_hash;
        let mut engine = MockEngineApi::new();
        engine
            .expect_submit_payload()
            .times(1)
            .returning(|_, _, _, _| Ok(BlockStatus::Valid));
        engine
            .expect_update_forkchoice()
            .withf(move |target, attrs| target.head() == block_hash && attrs.is_none())
            .times(1)
            .returning(|_, _| Ok(ForkchoiceResp::new(BlockStatus::Valid, None)));
        engine
    }

    #[tokio::test]
    async fn test_apply_payload_advances_head() {
        let payload = committable_payload();
        let driver = setup_driver(valid_engine_for(&payload), vec![]);
        let proposal = ProposedPayload::from_payload(&payload).unwrap();

        driver
            .apply_payload(ConsensusRound::new(4, 1), &proposal, &[])
            .await
            .unwrap();

        let head = driver.db.get_head().unwrap();
        assert_eq!(head.created_height(), 4);
        assert_eq!(head.block_height(), 1);
        assert_eq!(head.block_hash(), payload.block_hash);
        assert_eq!(head.block_time(), payload.timestamp);
    }

    #[tokio::test]
    async fn test_apply_payload_clears_included_withdrawals() {
        let mut payload = committable_payload();
        payload.withdrawals = vec![
            ElWithdrawal {
                index: 0,
                validator_index: 0,
                address: [8; 20].into(),
                amount_gwei: 50,
            },
            ElWithdrawal {
                index: 1,
                validator_index: 0,
                address: [9; 20].into(),
                amount_gwei: 70,
            },
        ];

        let driver = setup_driver(valid_engine_for(&payload), vec![]);
        driver.db.insert_withdrawal([8; 20].into(), 50, 0).unwrap();
        driver.db.insert_withdrawal([9; 20].into(), 70, 0).unwrap();

        let proposal = ProposedPayload::from_payload(&payload).unwrap();
        driver
            .apply_payload(ConsensusRound::new(4, 1), &proposal, &[])
            .await
            .unwrap();

        assert!(driver.db.list_eligible_withdrawals(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_payload_rejected_by_engine() {
        let payload = committable_payload();
        let mut engine = MockEngineApi::new();
        engine
            .expect_submit_payload()
            .times(1)
            .returning(|_, _, _, _| {
                Ok(BlockStatus::Invalid {
                    validation_error: Some("bad state root".to_string()),
                })
            });

        let driver = setup_driver(engine, vec![]);
        let proposal = ProposedPayload::from_payload(&payload).unwrap();

        let err = driver
            .apply_payload(ConsensusRound::new(4, 1), &proposal, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::RejectedPayload(reason) if reason == "bad state root"));

        // Nothing advanced.
        assert_eq!(driver.db.get_head().unwrap().block_height(), 0);
    }

    #[tokio::test]
    async fn test_apply_payload_syncing_engine() {
        let payload = committable_payload();
        let mut engine = MockEngineApi::new();
        engine
            .expect_submit_payload()
            .times(1)
            .returning(|_, _, _, _| Ok(BlockStatus::Syncing));

        let driver = setup_driver(engine, vec![]);
        let proposal = ProposedPayload::from_payload(&payload).unwrap();

        let err = driver
            .apply_payload(ConsensusRound::new(4, 1), &proposal, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::EngineSyncing));
        assert_eq!(driver.db.get_head().unwrap().block_height(), 0);
    }

    #[tokio::test]
    async fn test_apply_payload_verifies_before_engine() {
        // Broken parent linkage never reaches the engine, the mock has no
        // expectations.
        let mut payload = committable_payload();
        payload.parent_hash = [9; 32].into();

        let driver = setup_driver(MockEngineApi::new(), vec![]);
        let proposal = ProposedPayload::from_payload(&payload).unwrap();

        let err = driver
            .apply_payload(ConsensusRound::new(4, 1), &proposal, &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DriverError::Payload(PayloadError::InvalidParentHash { .. })
        ));
    }

    #[tokio::test]
    async fn test_apply_payload_delivers_events() {
        let payload = committable_payload();
        let recorder = Arc::new(Recording::new([2; 20].into()));
        let driver = setup_driver(valid_engine_for(&payload), vec![recorder.clone()]);
        let proposal = ProposedPayload::from_payload(&payload).unwrap();

        let log = EvmLog {
            address: [2; 20].into(),
            topics: vec![[1; 32].into()],
            data: vec![1, 2, 3],
        };
        driver
            .apply_payload(ConsensusRound::new(4, 1), &proposal, &[log.clone()])
            .await
            .unwrap();

        assert_eq!(*recorder.seen.lock(), vec![log]);
    }

    #[tokio::test]
    async fn test_apply_payload_rejects_unrouted_event() {
        let payload = committable_payload();
        let recorder = Arc::new(Recording::new([2; 20].into()));
        let driver = setup_driver(valid_engine_for(&payload), vec![recorder]);
        let proposal = ProposedPayload::from_payload(&payload).unwrap();

        let log = EvmLog {
            address: [3; 20].into(),
            topics: vec![],
            data: vec![],
        };
        let err = driver
            .apply_payload(ConsensusRound::new(4, 1), &proposal, &[log])
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::UnroutedEvent(address) if address == Buf20::from([3; 20])));
    }
}
