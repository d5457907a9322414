use std::fmt;
use std::str::FromStr;

use sli_meta::{Memo, TransactionEnvelope};
use sli_types::TxHash;

use crate::error::IngestError;

/// Selects transactions by the memo attached to their envelope.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum MemoFilter {
    #[default]
    Any,
    Text(String),
    Id(u64),
    Hash([u8; 32]),
}

impl MemoFilter {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    pub fn matches(&self, envelope: &TransactionEnvelope) -> bool {
        match (self, &envelope.memo) {
            (Self::Any, _) => true,
            (Self::Text(want), Memo::Text(got)) => want == got,
            (Self::Id(want), Memo::Id(got)) => want == got,
            (Self::Hash(want), Memo::Hash(got)) => want == got,
            _ => false,
        }
    }
}

/// Parses `id:<u64>`, `hash:<64 hex chars>`, `text:<text>`, or bare text.
impl FromStr for MemoFilter {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(id) = s.strip_prefix("id:") {
            return id
                .parse()
                .map(Self::Id)
                .map_err(|e| IngestError::InvalidMemoFilter(format!("memo id {id:?}: {e}")));
        }
        if let Some(hex) = s.strip_prefix("hash:") {
            return TxHash::from_hex(hex)
                .map(|hash| Self::Hash(*hash.as_bytes()))
                .map_err(|e| IngestError::InvalidMemoFilter(format!("memo hash: {e}")));
        }
        let text = s.strip_prefix("text:").unwrap_or(s);
        if text.is_empty() {
            return Err(IngestError::InvalidMemoFilter("empty memo text".into()));
        }
        Ok(Self::Text(text.to_string()))
    }
}

impl fmt::Display for MemoFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Text(text) => write!(f, "text:{text}"),
            Self::Id(id) => write!(f, "id:{id}"),
            Self::Hash(hash) => write!(f, "hash:{}", TxHash::from(*hash).to_hex()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_memo(memo: Memo) -> TransactionEnvelope {
        TransactionEnvelope::new("GSOURCE", 1).with_memo(memo)
    }

    #[test]
    fn any_matches_everything() {
        for memo in [Memo::None, Memo::Text("x".into()), Memo::Id(3), Memo::Return([0; 32])] {
            assert!(MemoFilter::Any.matches(&with_memo(memo)));
        }
    }

    #[test]
    fn typed_filters_match_only_their_kind() {
        let text = MemoFilter::text("invoice-7");
        assert!(text.matches(&with_memo(Memo::Text("invoice-7".into()))));
        assert!(!text.matches(&with_memo(Memo::Text("invoice-8".into()))));
        assert!(!text.matches(&with_memo(Memo::None)));

        let id = MemoFilter::Id(42);
        assert!(id.matches(&with_memo(Memo::Id(42))));
        assert!(!id.matches(&with_memo(Memo::Text("42".into()))));

        let hash = MemoFilter::Hash([9; 32]);
        assert!(hash.matches(&with_memo(Memo::Hash([9; 32]))));
        assert!(!hash.matches(&with_memo(Memo::Return([9; 32]))));
    }

    #[test]
    fn parses_prefixed_forms() {
        assert_eq!("id:17".parse::<MemoFilter>().unwrap(), MemoFilter::Id(17));
        assert_eq!("text:id:17".parse::<MemoFilter>().unwrap(), MemoFilter::text("id:17"));
        assert_eq!("hello".parse::<MemoFilter>().unwrap(), MemoFilter::text("hello"));

        let hex = "ab".repeat(32);
        assert_eq!(
            format!("hash:{hex}").parse::<MemoFilter>().unwrap(),
            MemoFilter::Hash([0xab; 32])
        );
    }

    #[test]
    fn rejects_malformed_filters() {
        for bad in ["id:nope", "hash:zz", "hash:abcd", "", "text:"] {
            assert!(matches!(
                bad.parse::<MemoFilter>(),
                Err(IngestError::InvalidMemoFilter(_))
            ));
        }
    }

    #[test]
    fn display_round_trips() {
        for filter in [MemoFilter::Id(5), MemoFilter::text("x"), MemoFilter::Hash([1; 32])] {
            assert_eq!(filter.to_string().parse::<MemoFilter>().unwrap(), filter);
        }
    }
}
