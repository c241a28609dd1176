//! Payload proposal validation.
//!
//! Pure protocol checks: a proposal either reproduces exactly the payload
//! this node would accept on top of its own head, or it is rejected with the
//! violated invariant.  No writes happen here, all state comes in through
//! the read-only provider trait.

use tenon_db::traits::ExecStateProvider;
use tenon_state::{ElPayload, ProposedPayload};

use crate::errors::PayloadError;
use crate::providers::FeeRecipientProvider;

/// Validates `proposal` against the current head and withdrawal queue,
/// returning the decoded payload when every check passes.
///
/// Checks run in a fixed order and short-circuit on the first violation:
/// encoding, withdrawal set, witness, fee recipient, height and parent
/// linkage, timestamp window, randomness.
pub fn verify_payload<D, F>(
    proposal: &ProposedPayload,
    provider: &D,
    fee_recipients: &F,
    consensus_time: u64,
    max_withdrawals: u64,
) -> Result<ElPayload, PayloadError>
where
    D: ExecStateProvider + ?Sized,
    F: FeeRecipientProvider + ?Sized,
{
    let payload = decode_proposal(proposal)?;

    let eligible = provider.list_eligible_withdrawals(max_withdrawals)?;
    let withdrawals_match = payload.withdrawals.len() == eligible.len()
        && payload.withdrawals.iter().zip(eligible.iter()).all(|(w, e)| {
            w.index == e.id() && w.address == e.address() && w.amount_gwei == e.amount_gwei()
        });
    if !withdrawals_match {
        return Err(PayloadError::WithdrawalsMismatch);
    }

    if payload.witness.is_some() {
        return Err(PayloadError::UnexpectedWitness);
    }

    fee_recipients
        .verify_fee_recipient(&payload.fee_recipient)
        .map_err(PayloadError::FeeRecipient)?;

    let head = provider.get_head()?;

    let expected_number = head.block_height() + 1;
    if payload.block_number != expected_number {
        return Err(PayloadError::InvalidPayloadNumber {
            expected: expected_number,
            got: payload.block_number,
        });
    }
    if payload.parent_hash != head.block_hash() {
        return Err(PayloadError::InvalidParentHash {
            expected: head.block_hash(),
            got: payload.parent_hash,
        });
    }

    let min = head.block_time() + 1;
    let max = consensus_time.max(min);
    if payload.timestamp < min || payload.timestamp > max {
        return Err(PayloadError::InvalidTimestamp {
            min,
            max,
            got: payload.timestamp,
        });
    }

    // Deterministic randomness carried over from the parent hash.
    if payload.prev_randao != head.block_hash() {
        return Err(PayloadError::InvalidRandao {
            expected: head.block_hash(),
            got: payload.prev_randao,
        });
    }

    Ok(payload)
}

fn decode_proposal(proposal: &ProposedPayload) -> Result<ElPayload, PayloadError> {
    match (proposal.payload(), proposal.payload_json()) {
        (Some(_), Some(_)) => Err(PayloadError::MultiplePayloads),
        (None, None) => Err(PayloadError::MissingPayload),
        (Some(raw), None) => {
            ElPayload::from_borsh_bytes(raw).map_err(|e| PayloadError::Decode(e.to_string()))
        }
        (None, Some(raw)) => {
            ElPayload::from_json_bytes(raw).map_err(|e| PayloadError::Decode(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use tenon_db::traits::MockExecStateProvider;
    use tenon_primitives::buf::Buf20;
    use tenon_state::{ExecutionHead, WithdrawalEntry};
    use tenon_test_utils::ArbitraryGenerator;

    use super::*;

    const HEAD_HASH: [u8; 32] = [7u8; 32];

    struct AcceptAll;

    impl FeeRecipientProvider for AcceptAll {
        fn local_fee_recipient(&self) -> Buf20 {
            Buf20::zero()
        }

        fn verify_fee_recipient(&self, _recipient: &Buf20) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct RejectAll;

    impl FeeRecipientProvider for RejectAll {
        fn local_fee_recipient(&self) -> Buf20 {
            Buf20::zero()
        }

        fn verify_fee_recipient(&self, _recipient: &Buf20) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("unknown fee recipient"))
        }
    }

    fn head() -> ExecutionHead {
        ExecutionHead::new(3, 10, HEAD_HASH.into(), 1000)
    }

    fn provider_with(
        head: ExecutionHead,
        eligible: Vec<WithdrawalEntry>,
    ) -> MockExecStateProvider {
        let mut provider = MockExecStateProvider::new();
        provider.expect_get_head().returning(move || Ok(head));
        provider
            .expect_list_eligible_withdrawals()
            .returning(move |_| Ok(eligible.clone()));
        provider
    }

    fn valid_payload() -> ElPayload {
        let mut payload: ElPayload = ArbitraryGenerator::new().generate();
        payload.parent_hash = HEAD_HASH.into();
        payload.prev_randao = HEAD_HASH.into();
        payload.block_number = 11;
        payload.timestamp = 1001;
        payload.withdrawals = vec![];
        payload.witness = None;
        payload
    }

    fn proposal(payload: &ElPayload) -> ProposedPayload {
        ProposedPayload::from_payload(payload).unwrap()
    }

    #[test]
    fn test_accepts_valid_payload() {
        let payload = valid_payload();
        let provider = provider_with(head(), vec![]);

        let decoded =
            verify_payload(&proposal(&payload), &provider, &AcceptAll, 1001, 32).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_accepts_json_encoded_payload() {
        let payload = valid_payload();
        let provider = provider_with(head(), vec![]);
        let msg = ProposedPayload::from_json_payload(&payload).unwrap();

        let decoded = verify_payload(&msg, &provider, &AcceptAll, 1001, 32).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_rejects_both_encodings() {
        let payload = valid_payload();
        let msg = ProposedPayload::new(
            Some(payload.to_borsh_bytes().unwrap()),
            Some(payload.to_json_bytes().unwrap()),
        );
        let provider = provider_with(head(), vec![]);

        let err = verify_payload(&msg, &provider, &AcceptAll, 1001, 32).unwrap_err();
        assert!(matches!(err, PayloadError::MultiplePayloads));
        assert_eq!(err.to_string(), "only one payload type allowed");
    }

    #[test]
    fn test_rejects_empty_proposal() {
        let msg = ProposedPayload::new(None, None);
        let provider = provider_with(head(), vec![]);

        let err = verify_payload(&msg, &provider, &AcceptAll, 1001, 32).unwrap_err();
        assert!(matches!(err, PayloadError::MissingPayload));
        assert_eq!(err.to_string(), "no payload provided");
    }

    #[test]
    fn test_rejects_undecodable_payload() {
        let msg = ProposedPayload::new(Some(vec![0xff, 0x01]), None);
        let provider = provider_with(head(), vec![]);

        let err = verify_payload(&msg, &provider, &AcceptAll, 1001, 32).unwrap_err();
        assert!(matches!(err, PayloadError::Decode(_)));
    }

    #[test]
    fn test_rejects_missing_withdrawals() {
        // The queue has an eligible entry the payload does not carry.
        let payload = valid_payload();
        let eligible = vec![WithdrawalEntry::new(0, [9; 20].into(), 2, 50)];
        let provider = provider_with(head(), eligible);

        let err = verify_payload(&proposal(&payload), &provider, &AcceptAll, 1001, 32).unwrap_err();
        assert!(matches!(err, PayloadError::WithdrawalsMismatch));
    }

    #[test]
    fn test_rejects_reordered_withdrawals() {
        let first = WithdrawalEntry::new(0, [1; 20].into(), 2, 5);
        let second = WithdrawalEntry::new(1, [2; 20].into(), 2, 7);

        let mut payload = valid_payload();
        payload.withdrawals = vec![(&second).into(), (&first).into()];
        let provider = provider_with(head(), vec![first, second]);

        let err = verify_payload(&proposal(&payload), &provider, &AcceptAll, 1001, 32).unwrap_err();
        assert!(matches!(err, PayloadError::WithdrawalsMismatch));
    }

    #[test]
    fn test_accepts_matching_withdrawals() {
        let first = WithdrawalEntry::new(0, [1; 20].into(), 2, 5);
        let second = WithdrawalEntry::new(1, [2; 20].into(), 2, 7);

        let mut payload = valid_payload();
        payload.withdrawals = vec![(&first).into(), (&second).into()];
        let provider = provider_with(head(), vec![first, second]);

        let decoded =
            verify_payload(&proposal(&payload), &provider, &AcceptAll, 1001, 32).unwrap();
        assert_eq!(decoded.withdrawals.len(), 2);
    }

    #[test]
    fn test_rejects_witness_before_linkage() {
        // The witness check fires even though the linkage is also wrong.
        let mut payload = valid_payload();
        payload.witness = Some(vec![1, 2, 3]);
        payload.block_number = 99;
        let provider = provider_with(head(), vec![]);

        let err = verify_payload(&proposal(&payload), &provider, &AcceptAll, 1001, 32).unwrap_err();
        assert!(matches!(err, PayloadError::UnexpectedWitness));
    }

    #[test]
    fn test_rejects_fee_recipient_verbatim() {
        let payload = valid_payload();
        let provider = provider_with(head(), vec![]);

        let err = verify_payload(&proposal(&payload), &provider, &RejectAll, 1001, 32).unwrap_err();
        assert_eq!(err.to_string(), "fee recipient: unknown fee recipient");
    }

    #[test]
    fn test_rejects_wrong_payload_number() {
        let mut payload = valid_payload();
        payload.block_number = 12;
        let provider = provider_with(head(), vec![]);

        let err = verify_payload(&proposal(&payload), &provider, &AcceptAll, 1001, 32).unwrap_err();
        assert!(matches!(
            err,
            PayloadError::InvalidPayloadNumber {
                expected: 11,
                got: 12
            }
        ));
    }

    #[test]
    fn test_rejects_wrong_parent_hash() {
        let mut payload = valid_payload();
        payload.parent_hash = [8; 32].into();
        let provider = provider_with(head(), vec![]);

        let err = verify_payload(&proposal(&payload), &provider, &AcceptAll, 1001, 32).unwrap_err();
        assert!(matches!(err, PayloadError::InvalidParentHash { .. }));
    }

    #[test]
    fn test_timestamp_window() {
        let check = |timestamp: u64, consensus_time: u64| {
            let mut payload = valid_payload();
            payload.timestamp = timestamp;
            let provider = provider_with(head(), vec![]);
            verify_payload(&proposal(&payload), &provider, &AcceptAll, consensus_time, 32)
        };

        // Window is [head.block_time + 1, max(consensus_time, min)].
        assert!(check(1000, 1005).is_err());
        assert!(check(1001, 1005).is_ok());
        assert!(check(1005, 1005).is_ok());
        assert!(check(1006, 1005).is_err());

        // A lagging consensus clock still leaves the window open at min.
        assert!(check(1001, 500).is_ok());
        assert!(check(1002, 500).is_err());
    }

    #[test]
    fn test_rejects_wrong_randao() {
        let mut payload = valid_payload();
        payload.prev_randao = [1; 32].into();
        let provider = provider_with(head(), vec![]);

        let err = verify_payload(&proposal(&payload), &provider, &AcceptAll, 1001, 32).unwrap_err();
        assert!(matches!(err, PayloadError::InvalidRandao { .. }));
    }

    #[test]
    fn test_validation_is_repeatable() {
        let payload = valid_payload();
        let provider = provider_with(head(), vec![]);
        let msg = proposal(&payload);

        let first = verify_payload(&msg, &provider, &AcceptAll, 1001, 32).unwrap();
        let second = verify_payload(&msg, &provider, &AcceptAll, 1001, 32).unwrap();
        assert_eq!(first, second);
    }
}
