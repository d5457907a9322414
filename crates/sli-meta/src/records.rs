use serde::{Deserialize, Serialize};
use sli_types::{NetworkId, Sequence, TxHash};

/// Header of a closed ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerHeader {
    pub sequence: Sequence,
    /// Network that closed this ledger.
    pub network_id: NetworkId,
    pub previous_ledger_hash: [u8; 32],
    /// Close time, seconds since UNIX epoch.
    pub close_time: u64,
    pub protocol_version: u32,
}

/// Memo attached to a transaction envelope.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Memo {
    #[default]
    None,
    Text(String),
    Id(u64),
    Hash([u8; 32]),
    Return([u8; 32]),
}

impl Memo {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Text(_) => "text",
            Self::Id(_) => "id",
            Self::Hash(_) => "hash",
            Self::Return(_) => "return",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationBody {
    CreateAccount { destination: String, starting_balance: i64 },
    Payment { destination: String, asset: String, amount: i64 },
    ManageData { name: String, value: Option<Vec<u8>> },
    BumpSequence { bump_to: i64 },
    InvokeContract { contract_id: String, function: String, args: Vec<Vec<u8>> },
}

impl OperationBody {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::CreateAccount { .. } => "CreateAccount",
            Self::Payment { .. } => "Payment",
            Self::ManageData { .. } => "ManageData",
            Self::BumpSequence { .. } => "BumpSequence",
            Self::InvokeContract { .. } => "InvokeContract",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Overrides the envelope's source account when set.
    pub source_account: Option<String>,
    pub body: OperationBody,
}

impl Operation {
    pub fn new(body: OperationBody) -> Self {
        Self { source_account: None, body }
    }

    pub fn payment(destination: impl Into<String>, asset: impl Into<String>, amount: i64) -> Self {
        Self::new(OperationBody::Payment {
            destination: destination.into(),
            asset: asset.into(),
            amount,
        })
    }

    pub fn create_account(destination: impl Into<String>, starting_balance: i64) -> Self {
        Self::new(OperationBody::CreateAccount {
            destination: destination.into(),
            starting_balance,
        })
    }

    pub fn manage_data(name: impl Into<String>, value: Option<Vec<u8>>) -> Self {
        Self::new(OperationBody::ManageData { name: name.into(), value })
    }
}

/// A transaction as submitted to the network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEnvelope {
    pub source_account: String,
    pub fee: u32,
    pub seq_num: i64,
    pub memo: Memo,
    pub operations: Vec<Operation>,
}

impl TransactionEnvelope {
    pub fn new(source_account: impl Into<String>, seq_num: i64) -> Self {
        Self {
            source_account: source_account.into(),
            fee: 100,
            seq_num,
            memo: Memo::None,
            operations: Vec::new(),
        }
    }

    pub fn with_fee(mut self, fee: u32) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_memo(mut self, memo: Memo) -> Self {
        self.memo = memo;
        self
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionResultCode {
    Success,
    Failed,
    TooEarly,
    TooLate,
    MissingOperation,
    BadSeq,
    BadAuth,
    InsufficientBalance,
    NoAccount,
    InsufficientFee,
    InternalError,
}

/// Result recorded by the network when the transaction was applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub fee_charged: i64,
    pub code: TransactionResultCode,
}

impl TransactionResult {
    pub fn success(fee_charged: i64) -> Self {
        Self { fee_charged, code: TransactionResultCode::Success }
    }

    pub fn failed(fee_charged: i64, code: TransactionResultCode) -> Self {
        Self { fee_charged, code }
    }

    pub fn successful(&self) -> bool {
        self.code == TransactionResultCode::Success
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    Account,
    Trustline,
    Data,
    ContractData,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerKey {
    pub kind: EntryKind,
    pub id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub key: LedgerKey,
    pub last_modified: Sequence,
    pub data: Vec<u8>,
}

/// One state change produced by applying a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEntryChange {
    Created(LedgerEntry),
    Updated(LedgerEntry),
    Removed(LedgerKey),
    /// Entry value before the change that follows it.
    State(LedgerEntry),
}

impl LedgerEntryChange {
    pub fn key(&self) -> &LedgerKey {
        match self {
            Self::Created(entry) | Self::Updated(entry) | Self::State(entry) => &entry.key,
            Self::Removed(key) => key,
        }
    }
}

/// Processing record for one transaction, in apply order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResultMeta {
    pub transaction_hash: TxHash,
    pub result: TransactionResult,
    pub fee_changes: Vec<LedgerEntryChange>,
    pub changes: Vec<LedgerEntryChange>,
}

/// Everything the network recorded when closing one ledger.
///
/// `tx_set` is ordered by transaction hash; `tx_processing` is ordered the way
/// transactions were applied. The two are joined by hash when decoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerCloseMeta {
    pub header: LedgerHeader,
    pub tx_set: Vec<TransactionEnvelope>,
    pub tx_processing: Vec<TransactionResultMeta>,
}

impl LedgerCloseMeta {
    pub fn sequence(&self) -> Sequence {
        self.header.sequence
    }

    pub fn network_id(&self) -> &NetworkId {
        &self.header.network_id
    }

    pub fn transaction_count(&self) -> usize {
        self.tx_processing.len()
    }
}
