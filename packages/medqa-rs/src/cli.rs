//! Command line arguments backing the `medqa` binary.
use clap::{Parser, Subcommand, ValueEnum};
use medqa_ocr::ColumnSplit;
use medqa_rs::PipelineConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
  name = "medqa",
  about = "A CLI tool for extracting question-answer pairs from scanned medical PDFs",
  version
)]
pub struct Args {
  #[command(subcommand)]
  pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
  /// Print version information
  Version,
  /// Run the full pipeline over one PDF document
  Extract {
    /// PDF document to process
    pdf: PathBuf,

    /// Directory receiving page texts, the QA file and the manifest
    #[arg(long, short = 'o', default_value = "output")]
    output_dir: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,

    /// Model name passed to the generation endpoint
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// Base URL of the generation endpoint
    #[arg(long)]
    llm_url: Option<String>,

    /// Base URL of the layout detection service
    #[arg(long)]
    layout_url: Option<String>,

    /// Rendering resolution
    #[arg(long)]
    dpi: Option<u32>,

    /// Pixel band within which boxes count as one line (0 disables banding)
    #[arg(long)]
    line_tolerance: Option<i32>,

    /// How the column boundary is chosen
    #[arg(long, value_enum)]
    column_split: Option<SplitArg>,

    #[command(flatten)]
    verbosity: Verbosity,
  },
  /// Filter an existing QA file through an LLM quality review
  Review {
    /// QA JSON-lines file to review
    input: PathBuf,

    /// Where to write the surviving pairs
    #[arg(long, short = 'o')]
    output: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,

    /// Model name passed to the generation endpoint
    #[arg(long, short = 'm')]
    model: Option<String>,

    #[command(flatten)]
    verbosity: Verbosity,
  },
  /// Report malformed lines in a QA JSON-lines file
  Inspect {
    /// QA JSON-lines file to check
    file: PathBuf,
  },
}

#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
  /// TOML configuration file
  #[arg(long, short = 'c')]
  pub config: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct Verbosity {
  /// Only log warnings and errors
  #[arg(long, short = 'q', conflicts_with = "verbose")]
  pub quiet: bool,

  /// Log request-level details
  #[arg(long, short = 'v')]
  pub verbose: bool,
}

impl Verbosity {
  pub fn level(&self) -> &'static str {
    if self.quiet {
      "warn"
    } else if self.verbose {
      "debug"
    } else {
      "info"
    }
  }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SplitArg {
  Midpoint,
  Kmeans,
}

impl From<SplitArg> for ColumnSplit {
  fn from(arg: SplitArg) -> Self {
    match arg {
      SplitArg::Midpoint => ColumnSplit::Midpoint,
      SplitArg::Kmeans => ColumnSplit::KMeans,
    }
  }
}

/// Command line values that override the configuration file.
#[derive(Debug, Default)]
pub struct Overrides {
  pub model: Option<String>,
  pub llm_url: Option<String>,
  pub layout_url: Option<String>,
  pub dpi: Option<u32>,
  pub line_tolerance: Option<i32>,
  pub column_split: Option<SplitArg>,
}

impl Overrides {
  pub fn apply(self, config: &mut PipelineConfig) {
    if let Some(model) = self.model {
      config.llm.model = model;
    }
    if let Some(url) = self.llm_url {
      config.llm.base_url = url;
    }
    if let Some(url) = self.layout_url {
      config.layout.endpoint = url;
    }
    if let Some(dpi) = self.dpi {
      config.render.dpi = dpi;
    }
    if let Some(tolerance) = self.line_tolerance {
      config.reading_order.line_tolerance = tolerance;
    }
    if let Some(split) = self.column_split {
      config.reading_order.column_split = split.into();
    }
  }
}
