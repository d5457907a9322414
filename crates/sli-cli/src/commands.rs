use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use serde_json::json;
use sli_backend::{BackendError, LedgerBackend};
use sli_ingest::{IngestReport, Ingestor, MemoFilter, StopReason, TransactionRecord};
use sli_source::{FileSource, LedgerSource, RpcSource};
use sli_types::{LedgerRange, Sequence};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::{Cli, Command, ExportArgs, IngestArgs, OutputFormat};
use crate::config::SliConfig;

pub async fn run_command(cli: Cli, config: SliConfig) -> anyhow::Result<()> {
    let cancel = cancel_on_ctrl_c();
    match cli.command {
        Command::Latest => cmd_latest(cli.format, &config, &cancel).await,
        Command::Ingest(args) => {
            if let Some(report) = cmd_ingest(cli.format, &config, args, &cancel).await? {
                print_summary(cli.format, &report);
            }
            Ok(())
        }
        Command::Export(args) => cmd_export(cli.format, &config, args, &cancel).await,
    }
}

/// Token that fires on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping");
            token.cancel();
        }
    });
    cancel
}

fn rpc_source(config: &SliConfig) -> anyhow::Result<Arc<dyn LedgerSource>> {
    let source = RpcSource::new(&config.rpc)
        .with_context(|| format!("creating RPC client for {}", config.rpc.url))?;
    Ok(Arc::new(source))
}

async fn cmd_latest(
    format: OutputFormat,
    config: &SliConfig,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let backend = LedgerBackend::with_config(rpc_source(config)?, config.backend.clone());
    let latest = match backend.latest_sequence(cancel).await {
        Ok(seq) => seq,
        Err(BackendError::Canceled) => return Ok(()),
        Err(err) => return Err(err).context("querying latest ledger"),
    };
    match format {
        OutputFormat::Text => println!("Latest ledger: {}", latest.to_string().bold()),
        OutputFormat::Json => println!("{}", json!({ "sequence": latest })),
    }
    Ok(())
}

async fn cmd_ingest(
    format: OutputFormat,
    config: &SliConfig,
    args: IngestArgs,
    cancel: &CancellationToken,
) -> anyhow::Result<Option<IngestReport>> {
    let source: Arc<dyn LedgerSource> = match &args.source_dir {
        Some(dir) => Arc::new(FileSource::new(dir)),
        None => rpc_source(config)?,
    };
    let backend = LedgerBackend::with_config(source, config.backend.clone());

    // Interrupted before a range exists: nothing ran, so there is no report.
    let start = match args.start {
        Some(start) => start,
        None => match backend.latest_sequence(cancel).await {
            Ok(seq) => seq,
            Err(BackendError::Canceled) => return Ok(None),
            Err(err) => return Err(err).context("resolving start ledger"),
        },
    };
    let range = resolve_range(start, args.end, args.count)?;
    let filter = match &args.memo {
        Some(memo) => memo.parse::<MemoFilter>()?,
        None => MemoFilter::Any,
    };

    let ingestor = Ingestor::new(backend, &config.network_passphrase)
        .with_memo_filter(filter)
        .with_state_change_policy(config.ingest.state_changes)
        .with_max_ledger_retries(config.ingest.max_ledger_retries);

    let quiet = args.quiet;
    let report = ingestor
        .run(cancel, range, |record| {
            if !quiet {
                print_transaction(format, record);
            }
        })
        .await
        .with_context(|| format!("ingesting {range}"))?;
    Ok(Some(report))
}

async fn cmd_export(
    format: OutputFormat,
    config: &SliConfig,
    args: ExportArgs,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let range = LedgerRange::bounded(args.start, args.end)?;
    let backend = LedgerBackend::with_config(rpc_source(config)?, config.backend.clone());
    let target = FileSource::new(&args.out);

    backend.prepare(cancel, range).await?;
    let mut written = 0u64;
    for seq in args.start..=args.end {
        let meta = match backend.fetch_ledger(cancel, seq).await {
            Ok(meta) => meta,
            Err(BackendError::Canceled) => break,
            Err(err) => return Err(err).with_context(|| format!("fetching ledger {seq}")),
        };
        target
            .write_ledger(&meta)
            .await
            .with_context(|| format!("writing ledger {seq}"))?;
        written += 1;
    }

    match format {
        OutputFormat::Text => println!(
            "{} Exported {} ledgers to {}",
            "✓".green().bold(),
            written,
            args.out.display().to_string().bold()
        ),
        OutputFormat::Json => println!(
            "{}",
            json!({ "exported": written, "dir": args.out.display().to_string() })
        ),
    }
    Ok(())
}

fn resolve_range(
    start: Sequence,
    end: Option<Sequence>,
    count: Option<u32>,
) -> anyhow::Result<LedgerRange> {
    match (end, count) {
        (Some(end), _) => Ok(LedgerRange::bounded(start, end)?),
        (None, Some(0)) => anyhow::bail!("--count must be at least 1"),
        (None, Some(count)) => {
            let end = start
                .checked_add(count - 1)
                .context("--count runs past the last possible ledger")?;
            Ok(LedgerRange::bounded(start, end)?)
        }
        (None, None) => Ok(LedgerRange::unbounded(start)),
    }
}

fn print_transaction(format: OutputFormat, record: &TransactionRecord) {
    match format {
        OutputFormat::Text => {
            let status = if record.successful {
                "success".green()
            } else {
                "failed".red()
            };
            println!(
                "{} {} {} ops={} [{}]",
                record.ledger_sequence.to_string().dimmed(),
                record.hash.to_hex().yellow(),
                status,
                record.operation_count(),
                operation_types(record).join(", ")
            );
        }
        OutputFormat::Json => println!("{}", transaction_json(record)),
    }
}

fn operation_types(record: &TransactionRecord) -> Vec<&'static str> {
    record
        .envelope
        .operations
        .iter()
        .map(|op| op.body.type_name())
        .collect()
}

fn transaction_json(record: &TransactionRecord) -> serde_json::Value {
    json!({
        "ledger": record.ledger_sequence,
        "hash": record.hash.to_hex(),
        "successful": record.successful,
        "operations": operation_types(record),
        "memo": record.envelope.memo.kind_name(),
    })
}

fn print_summary(format: OutputFormat, report: &IngestReport) {
    match format {
        OutputFormat::Text => {
            let stats = &report.stats;
            let stop = match report.stop {
                StopReason::RangeExhausted => "range complete".green(),
                StopReason::Canceled => "canceled".yellow(),
            };
            println!();
            println!("{} {} ({})", "Ingested".bold(), report.range, stop);
            println!("  Ledgers: {}", report.ledgers);
            println!(
                "  Transactions: {} ({} successful, {} failed)",
                stats.total_transactions(),
                stats.successful_transactions().to_string().green(),
                stats.failed_transactions().to_string().red()
            );
            println!(
                "  Operations: {} in successful, {} in failed",
                stats.operations_in_successful(),
                stats.operations_in_failed()
            );
            println!("  State changes: {}", stats.state_changes());
            println!("  Delivered: {}", report.delivered);
        }
        OutputFormat::Json => println!("{}", summary_json(report)),
    }
}

fn summary_json(report: &IngestReport) -> serde_json::Value {
    json!({
        "range": report.range.to_string(),
        "stop": match report.stop {
            StopReason::RangeExhausted => "range_exhausted",
            StopReason::Canceled => "canceled",
        },
        "ledgers": report.ledgers,
        "delivered": report.delivered,
        "next_sequence": report.next_sequence,
        "stats": report.stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sli_meta::{
        LedgerCloseMetaBuilder, Memo, Operation, TransactionEnvelope, TransactionResult,
        TransactionResultCode,
    };

    const NET: &str = "Test SDF Network ; September 2015";

    #[test]
    fn range_from_flags() {
        assert_eq!(resolve_range(10, Some(20), None).unwrap(), LedgerRange::bounded(10, 20).unwrap());
        assert_eq!(resolve_range(10, None, Some(5)).unwrap(), LedgerRange::bounded(10, 14).unwrap());
        assert_eq!(resolve_range(10, None, None).unwrap(), LedgerRange::unbounded(10));
        assert!(resolve_range(10, Some(9), None).is_err());
        assert!(resolve_range(10, None, Some(0)).is_err());
        assert!(resolve_range(u32::MAX, None, Some(2)).is_err());
    }

    async fn write_fixture(dir: &std::path::Path) {
        let source = FileSource::new(dir);
        for seq in 100..=103 {
            let meta = LedgerCloseMetaBuilder::new(NET, seq)
                .transaction(
                    TransactionEnvelope::new("GA", i64::from(seq))
                        .with_memo(Memo::Id(u64::from(seq)))
                        .with_operation(Operation::payment("GB", "XLM", 5)),
                    TransactionResult::success(100),
                    vec![],
                )
                .transaction(
                    TransactionEnvelope::new("GC", i64::from(seq))
                        .with_operation(Operation::payment("GB", "XLM", 5))
                        .with_operation(Operation::payment("GD", "XLM", 5)),
                    TransactionResult::failed(100, TransactionResultCode::InsufficientBalance),
                    vec![],
                )
                .build()
                .unwrap();
            source.write_ledger(&meta).await.unwrap();
        }
    }

    fn ingest_args(dir: &std::path::Path) -> IngestArgs {
        IngestArgs {
            start: Some(100),
            end: None,
            count: Some(3),
            memo: None,
            quiet: true,
            source_dir: Some(dir.to_path_buf()),
        }
    }

    #[tokio::test]
    async fn ingest_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path()).await;

        let report = cmd_ingest(
            OutputFormat::Json,
            &SliConfig::default(),
            ingest_args(dir.path()),
            &CancellationToken::new(),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(report.stop, StopReason::RangeExhausted);
        assert_eq!(report.ledgers, 3);
        assert_eq!(report.stats.successful_transactions(), 3);
        assert_eq!(report.stats.operations_in_failed(), 6);

        let summary = summary_json(&report);
        assert_eq!(summary["stop"], "range_exhausted");
        assert_eq!(summary["next_sequence"], 103);
        assert_eq!(summary["stats"]["failed_transactions"], 3);
    }

    #[tokio::test]
    async fn ingest_without_start_begins_at_directory_frontier() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path()).await;
        let args = IngestArgs {
            start: None,
            count: Some(1),
            memo: Some("id:103".into()),
            ..ingest_args(dir.path())
        };

        let report = cmd_ingest(OutputFormat::Text, &SliConfig::default(), args, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.range, LedgerRange::bounded(103, 103).unwrap());
        assert_eq!(report.delivered, 1);
    }

    #[tokio::test]
    async fn interrupt_while_resolving_start_is_a_clean_stop() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path()).await;
        let args = IngestArgs {
            start: None,
            ..ingest_args(dir.path())
        };
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = cmd_ingest(OutputFormat::Text, &SliConfig::default(), args, &cancel)
            .await
            .unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn wrong_network_fails_ingest() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path()).await;
        let config = SliConfig {
            network_passphrase: "Public Global Stellar Network ; September 2015".into(),
            ..SliConfig::default()
        };
        let err = cmd_ingest(OutputFormat::Text, &config, ingest_args(dir.path()), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("network"));
    }

    #[tokio::test]
    async fn invalid_memo_filter_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let args = IngestArgs {
            memo: Some("id:abc".into()),
            ..ingest_args(dir.path())
        };
        assert!(cmd_ingest(OutputFormat::Text, &SliConfig::default(), args, &CancellationToken::new())
            .await
            .is_err());
    }

    #[test]
    fn transaction_json_fields() {
        let meta = LedgerCloseMetaBuilder::new(NET, 9)
            .transaction(
                TransactionEnvelope::new("GA", 1)
                    .with_memo(Memo::Text("hi".into()))
                    .with_operation(Operation::create_account("GB", 10))
                    .with_operation(Operation::payment("GB", "XLM", 5)),
                TransactionResult::success(100),
                vec![],
            )
            .build()
            .unwrap();
        let record = sli_ingest::LedgerTransactionReader::new(NET, meta)
            .unwrap()
            .read()
            .unwrap();
        let value = transaction_json(&record);
        assert_eq!(value["ledger"], 9);
        assert_eq!(value["successful"], true);
        assert_eq!(value["operations"], json!(["CreateAccount", "Payment"]));
        assert_eq!(operation_types(&record), ["CreateAccount", "Payment"]);
        assert_eq!(value["hash"].as_str().unwrap().len(), 64);
        assert_eq!(value["memo"], "text");
    }
}
