//! Capabilities the driver consumes from the enclosing node.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tenon_primitives::buf::{Buf20, Buf32};

/// Read access to the consensus validator set, used to predict the next
/// proposer.  Registered late since consensus comes up after the driver.
#[async_trait]
pub trait ConsensusApi: Send + Sync {
    /// The validator set with rotation priorities as of `height`.
    async fn validator_set(&self, height: u64) -> anyhow::Result<ValidatorSet>;
}

/// The local node's identity inside the validator set.
pub trait AddressProvider: Send + Sync {
    fn local_address(&self) -> Buf20;
}

/// Source of the fee recipient this node builds with and judge of the fee
/// recipients other nodes propose.
pub trait FeeRecipientProvider: Send + Sync {
    fn local_fee_recipient(&self) -> Buf20;

    /// Rejects fee recipients the protocol does not accept.  The error is
    /// carried into the payload rejection verbatim.
    fn verify_fee_recipient(&self, recipient: &Buf20) -> anyhow::Result<()>;
}

/// A consensus validator as the proposer rotation sees it.
#[derive(Clone, Debug)]
pub struct Validator {
    pubkey: Buf32,
    power: i64,
    priority: i64,
}

impl Validator {
    pub fn new(pubkey: Buf32, power: i64, priority: i64) -> Self {
        Self {
            pubkey,
            power,
            priority,
        }
    }

    pub fn pubkey(&self) -> Buf32 {
        self.pubkey
    }

    /// Voting power, also the per-step priority gain in the rotation.
    pub fn power(&self) -> i64 {
        self.power
    }

    pub fn priority(&self) -> i64 {
        self.priority
    }

    /// The validator's consensus address, the first 20 bytes of the sha256
    /// digest of its public key.
    pub fn address(&self) -> Buf20 {
        let digest = Sha256::digest(self.pubkey.0);
        let mut buf = [0u8; 20];
        buf.copy_from_slice(&digest[..20]);
        buf.into()
    }
}

/// A snapshot of the validator set with its proposer rotation priorities.
#[derive(Clone, Debug, Default)]
pub struct ValidatorSet {
    validators: Vec<Validator>,
}

impl ValidatorSet {
    pub fn new(validators: Vec<Validator>) -> Self {
        Self { validators }
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    /// Predicts the proposer one rotation step ahead: every validator's
    /// priority grows by its power and the highest priority wins, ties
    /// broken by ascending address.
    pub fn next_proposer(&self) -> Option<&Validator> {
        self.validators.iter().max_by(|a, b| {
            let (pa, pb) = (a.priority + a.power, b.priority + b.power);
            pa.cmp(&pb).then_with(|| b.address().cmp(&a.address()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(seed: u8, power: i64, priority: i64) -> Validator {
        Validator::new([seed; 32].into(), power, priority)
    }

    #[test]
    fn test_address_is_sha256_prefix() {
        let validator = validator(7, 1, 0);
        let digest = Sha256::digest([7u8; 32]);
        assert_eq!(validator.address().0.as_slice(), &digest[..20]);
    }

    #[test]
    fn test_next_proposer_advances_one_step() {
        // After one step b overtakes a: 5 + 10 > 12 + 1.
        let a = validator(1, 1, 12);
        let b = validator(2, 10, 5);
        let set = ValidatorSet::new(vec![a, b.clone()]);

        assert_eq!(set.next_proposer().unwrap().address(), b.address());
    }

    #[test]
    fn test_next_proposer_tie_breaks_by_ascending_address() {
        let a = validator(1, 5, 0);
        let b = validator(2, 5, 0);
        let expected = a.address().min(b.address());

        let set = ValidatorSet::new(vec![a, b]);
        assert_eq!(set.next_proposer().unwrap().address(), expected);
    }

    #[test]
    fn test_next_proposer_empty_set() {
        assert!(ValidatorSet::default().next_proposer().is_none());
    }
}
