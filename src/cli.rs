use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "era-stats", version, about = "zkSync Era address activity and balance reporter")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect stats for every address in a file and write a report
    Report(ReportArgs),
    /// Fetch stats for a single address and print them as JSON
    Inspect { address: String },
    /// Print the current USD quote for a token symbol
    Price { symbol: String },
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// File with one address per line
    #[arg(long, default_value = "addresses.txt")]
    pub addresses: PathBuf,
    /// Where to write the report
    #[arg(long, default_value = "output/report.csv")]
    pub out: PathBuf,
    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Csv)]
    pub format: ReportFormat,
    /// Worker count; defaults to the number of CPUs
    #[arg(long)]
    pub workers: Option<usize>,
    /// Abort the whole run on the first failed address
    #[arg(long)]
    pub fail_fast: bool,
    /// Overwrite the output file if it already exists
    #[arg(long)]
    pub force: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ReportFormat {
    Csv,
    Json,
}
