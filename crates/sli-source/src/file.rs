use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sli_meta::{LedgerCloseMeta, LedgerMetaCodec};
use sli_types::Sequence;
use tracing::debug;

use crate::error::{SourceError, SourceResult};
use crate::traits::LedgerSource;

const LEDGER_EXTENSION: &str = "slcm";

/// Ledger source backed by a directory of framed metadata files.
///
/// Each ledger lives in `<dir>/<seq>.slcm`. The frontier is the end of the
/// contiguous run of files starting at the lowest sequence present, so a
/// ledger written out of order stays invisible until the gap is filled.
#[derive(Clone, Debug)]
pub struct FileSource {
    dir: PathBuf,
}

impl FileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ledger_path(&self, seq: Sequence) -> PathBuf {
        self.dir.join(format!("{seq}.{LEDGER_EXTENSION}"))
    }

    /// Export a ledger into the directory.
    pub async fn write_ledger(&self, meta: &LedgerCloseMeta) -> SourceResult<PathBuf> {
        let bytes = LedgerMetaCodec::encode(meta)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        let path = self.ledger_path(meta.sequence());
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        Ok(path)
    }

    async fn present_sequences(&self) -> SourceResult<BTreeSet<Sequence>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(SourceError::Unavailable(e.to_string())),
        };

        let mut present = BTreeSet::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(LEDGER_EXTENSION) {
                continue;
            }
            if let Some(seq) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<Sequence>().ok())
            {
                present.insert(seq);
            }
        }
        Ok(present)
    }
}

#[async_trait]
impl LedgerSource for FileSource {
    async fn latest_sequence(&self) -> SourceResult<Sequence> {
        let present = self.present_sequences().await?;
        let mut frontier = match present.first() {
            Some(first) => *first,
            None => return Ok(0),
        };
        for seq in present.iter().skip(1) {
            if *seq != frontier + 1 {
                break;
            }
            frontier = *seq;
        }
        Ok(frontier)
    }

    async fn fetch_by_sequence(&self, seq: Sequence) -> SourceResult<LedgerCloseMeta> {
        let path = self.ledger_path(seq);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(SourceError::NotFound(seq)),
            Err(e) => return Err(SourceError::Unavailable(e.to_string())),
        };
        debug!(seq, path = %path.display(), bytes = bytes.len(), "read ledger file");

        let meta = LedgerMetaCodec::decode(&bytes)?;
        if meta.sequence() != seq {
            return Err(SourceError::Protocol(format!(
                "file {} holds ledger {}",
                path.display(),
                meta.sequence()
            )));
        }
        Ok(meta)
    }
}
