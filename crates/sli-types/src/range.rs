use std::fmt;

use crate::error::TypeError;

/// Ledger sequence number.
pub type Sequence = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RangeKind {
    Bounded,
    Unbounded,
}

/// Span of ledgers a backend is asked to serve.
///
/// A bounded range covers `start..=end`. An unbounded range starts at `start`
/// and follows the network frontier until the caller stops.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LedgerRange {
    start: Sequence,
    end: Option<Sequence>,
}

impl LedgerRange {
    /// Range covering `start..=end`. Fails if `end < start`.
    pub fn bounded(start: Sequence, end: Sequence) -> Result<Self, TypeError> {
        if end < start {
            return Err(TypeError::InvalidRange { start, end });
        }
        Ok(Self {
            start,
            end: Some(end),
        })
    }

    /// Range starting at `start` with no upper limit.
    pub const fn unbounded(start: Sequence) -> Self {
        Self { start, end: None }
    }

    pub fn kind(&self) -> RangeKind {
        match self.end {
            Some(_) => RangeKind::Bounded,
            None => RangeKind::Unbounded,
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.end.is_some()
    }

    pub fn start(&self) -> Sequence {
        self.start
    }

    pub fn end(&self) -> Option<Sequence> {
        self.end
    }

    /// Returns `true` if `seq` falls inside the range.
    pub fn contains(&self, seq: Sequence) -> bool {
        seq >= self.start && self.end.map_or(true, |end| seq <= end)
    }

    /// Number of ledgers in a bounded range; `None` when unbounded.
    pub fn len(&self) -> Option<u64> {
        self.end
            .map(|end| u64::from(end) - u64::from(self.start) + 1)
    }
}

impl fmt::Display for LedgerRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "[{}, {}]", self.start, end),
            None => write!(f, "[{}, ∞)", self.start),
        }
    }
}
