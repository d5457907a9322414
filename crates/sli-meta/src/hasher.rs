use sli_types::{NetworkId, TxHash};

use crate::error::{MetaError, MetaResult};
use crate::records::TransactionEnvelope;

const TX_DOMAIN: &str = "sli-tx-v1";

/// Domain-separated BLAKE3 transaction hasher bound to one network.
///
/// The network id is mixed into every hash, so an envelope replayed on
/// another network never matches a processing record from this one.
pub struct TransactionHasher {
    network_id: NetworkId,
}

impl TransactionHasher {
    pub fn new(network_id: NetworkId) -> Self {
        Self { network_id }
    }

    pub fn for_passphrase(passphrase: &str) -> Self {
        Self::new(NetworkId::from_passphrase(passphrase))
    }

    pub fn network_id(&self) -> &NetworkId {
        &self.network_id
    }

    pub fn hash(&self, envelope: &TransactionEnvelope) -> MetaResult<TxHash> {
        let data = bincode::serialize(envelope)
            .map_err(|e| MetaError::Serialization(e.to_string()))?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(TX_DOMAIN.as_bytes());
        hasher.update(b":");
        hasher.update(self.network_id.as_bytes());
        hasher.update(&data);
        Ok(TxHash::from_hash(*hasher.finalize().as_bytes()))
    }
}
