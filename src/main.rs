use anyhow::{ensure, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use article_span_processor::config::{
    ColumnNames, PipelineConfig, DEFAULT_CATEGORY_CAP, DEFAULT_CIP_COLUMN, DEFAULT_CIP_OUTPUT,
    DEFAULT_INPUT, DEFAULT_SA_COLUMN, DEFAULT_SA_OUTPUT, DEFAULT_SCORE_COLUMN,
    DEFAULT_YEAR_COLUMN, MAX_CATEGORY_CAP,
};

#[derive(Parser)]
#[command(name = "article_span_processor")]
#[command(about = "Subject-area and CIP category spans per year and citation-impact group")]
struct Cli {
    /// Article-level table (.csv, .tsv, optionally .gz, or .parquet)
    #[arg(short, long, default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Output JSON for subject-area spans
    #[arg(long, default_value = DEFAULT_SA_OUTPUT)]
    sa_output: PathBuf,

    /// Output JSON for CIP spans
    #[arg(long, default_value = DEFAULT_CIP_OUTPUT)]
    cip_output: PathBuf,

    /// Field delimiter (default: inferred from the extension)
    #[arg(short, long)]
    delimiter: Option<char>,

    /// Counts above this value are merged into the top bucket
    #[arg(
        long,
        default_value_t = DEFAULT_CATEGORY_CAP,
        value_parser = clap::value_parser!(i64).range(1..=MAX_CATEGORY_CAP)
    )]
    category_cap: i64,

    /// Citation-impact score column
    #[arg(long, default_value = DEFAULT_SCORE_COLUMN)]
    score_column: String,

    /// Publication year column
    #[arg(long, default_value = DEFAULT_YEAR_COLUMN)]
    year_column: String,

    /// Subject-area count column
    #[arg(long, default_value = DEFAULT_SA_COLUMN)]
    sa_column: String,

    /// CIP count column
    #[arg(long, default_value = DEFAULT_CIP_COLUMN)]
    cip_column: String,

    /// Disable the row progress spinner
    #[arg(long)]
    no_progress: bool,
}

impl Cli {
    fn into_config(self) -> Result<PipelineConfig> {
        let delimiter = match self.delimiter {
            Some(c) => {
                ensure!(c.is_ascii(), "delimiter must be a single ASCII character, got '{c}'");
                Some(c as u8)
            }
            None => None,
        };

        Ok(PipelineConfig {
            input: self.input,
            sa_output: self.sa_output,
            cip_output: self.cip_output,
            columns: ColumnNames {
                score: self.score_column,
                year: self.year_column,
                sa_count: self.sa_column,
                cip_count: self.cip_column,
            },
            delimiter,
            category_cap: self.category_cap,
            show_progress: !self.no_progress,
        })
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args = Cli::parse();
    let config = args.into_config()?;
    info!("Input: {}", config.input.display());

    let stats = article_span_processor::run(&config)?;

    info!(
        "Chart-ready summaries written to {} and {} ({} years)",
        config.sa_output.display(),
        config.cip_output.display(),
        stats.distinct_years
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_need_no_flags() {
        let config = Cli::parse_from(["article_span_processor"]).into_config().unwrap();
        assert_eq!(config.input, PathBuf::from("ArticleLevelData.csv"));
        assert_eq!(config.sa_output, PathBuf::from("sa_data.json"));
        assert_eq!(config.cip_output, PathBuf::from("cip_data.json"));
        assert_eq!(config.category_cap, 4);
        assert_eq!(config.columns, ColumnNames::default());
        assert!(config.delimiter.is_none());
    }

    #[test]
    fn cli_overrides_paths_and_delimiter() {
        let config = Cli::parse_from([
            "article_span_processor",
            "-i",
            "in.tsv",
            "--sa-output",
            "out/sa.json",
            "--cip-output",
            "out/cip.json",
            "-d",
            ";",
            "--no-progress",
        ])
        .into_config()
        .unwrap();
        assert_eq!(config.input, PathBuf::from("in.tsv"));
        assert_eq!(config.cip_output, PathBuf::from("out/cip.json"));
        assert_eq!(config.delimiter, Some(b';'));
        assert!(!config.show_progress);
    }

    #[test]
    fn cli_rejects_bad_values() {
        for cap in ["0", "65", "9223372036854775807"] {
            let parsed = Cli::try_parse_from(["article_span_processor", "--category-cap", cap]);
            assert!(parsed.is_err(), "cap {cap} accepted");
        }
        let widest = Cli::try_parse_from(["article_span_processor", "--category-cap", "64"]);
        assert_eq!(widest.unwrap().category_cap, MAX_CATEGORY_CAP);
        let cli = Cli::try_parse_from(["article_span_processor", "-d", "§"]).unwrap();
        assert!(cli.into_config().is_err());
    }
}
