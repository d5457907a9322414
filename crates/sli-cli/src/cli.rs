use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sli",
    about = "Sequential Ledger Ingestion: stream closed ledgers and inspect their transactions",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// JSON-RPC endpoint of the ledger service
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// Network passphrase the ledgers must belong to
    #[arg(long, global = true)]
    pub network: Option<String>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the latest closed ledger sequence
    Latest,
    /// Stream ledgers and print their transactions
    Ingest(IngestArgs),
    /// Copy a bounded range of ledgers into a directory of .slcm files
    Export(ExportArgs),
}

#[derive(Args)]
pub struct IngestArgs {
    /// First ledger to ingest (defaults to the latest closed ledger)
    #[arg(long)]
    pub start: Option<u32>,

    /// Last ledger to ingest; omit to follow the network
    #[arg(long, conflicts_with = "count")]
    pub end: Option<u32>,

    /// Number of ledgers to ingest
    #[arg(long)]
    pub count: Option<u32>,

    /// Only print transactions whose memo matches (text, id:N or hash:HEX)
    #[arg(long)]
    pub memo: Option<String>,

    /// Print the summary only
    #[arg(short, long)]
    pub quiet: bool,

    /// Read ledgers from a directory of .slcm files instead of RPC
    #[arg(long)]
    pub source_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct ExportArgs {
    #[arg(long)]
    pub start: u32,

    #[arg(long)]
    pub end: u32,

    /// Target directory
    #[arg(long)]
    pub out: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_latest() {
        let cli = Cli::try_parse_from(["sli", "latest"]).unwrap();
        assert!(matches!(cli.command, Command::Latest));
        assert_eq!(cli.format, OutputFormat::Text);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn parse_ingest_bounded() {
        let cli = Cli::try_parse_from([
            "sli", "ingest", "--start", "1900940", "--end", "1901000", "--memo", "id:7", "-q",
        ])
        .unwrap();
        if let Command::Ingest(args) = cli.command {
            assert_eq!(args.start, Some(1_900_940));
            assert_eq!(args.end, Some(1_901_000));
            assert_eq!(args.memo.as_deref(), Some("id:7"));
            assert!(args.quiet);
            assert!(args.source_dir.is_none());
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn end_and_count_conflict() {
        assert!(Cli::try_parse_from(["sli", "ingest", "--start", "1", "--end", "2", "--count", "3"])
            .is_err());
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "sli",
            "ingest",
            "--source-dir",
            "/tmp/ledgers",
            "--network",
            "Standalone Network ; February 2017",
            "--format",
            "json",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.network.as_deref(), Some("Standalone Network ; February 2017"));
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.verbose, 2);
        if let Command::Ingest(args) = cli.command {
            assert_eq!(args.source_dir, Some(PathBuf::from("/tmp/ledgers")));
            assert_eq!(args.start, None);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_export() {
        let cli = Cli::try_parse_from([
            "sli", "--rpc-url", "http://localhost:8000", "export", "--start", "5", "--end", "9",
            "--out", "dump",
        ])
        .unwrap();
        assert_eq!(cli.rpc_url.as_deref(), Some("http://localhost:8000"));
        if let Command::Export(args) = cli.command {
            assert_eq!((args.start, args.end), (5, 9));
            assert_eq!(args.out, PathBuf::from("dump"));
        } else {
            panic!("wrong command");
        }
    }
}
