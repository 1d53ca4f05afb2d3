mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Args, Commands, Overrides};
use medqa_rs::{inspect_file, read_qa_file, write_qa_file, OllamaClient, PdfQaProcessor, PipelineConfig, QaReviewer};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(level: &str) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .compact()
    .init();
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
  let config = PipelineConfig::load(path)?;
  if let Some(path) = path {
    info!("Loaded configuration from {}", path.display());
  }
  Ok(config)
}

#[tokio::main]
async fn main() {
  let args = Args::parse();

  if let Err(e) = run(args).await {
    eprintln!("Error: {:#}", e);
    std::process::exit(1);
  }
}

async fn run(args: Args) -> Result<()> {
  match args.command {
    Commands::Version => {
      println!("medqa {}", env!("CARGO_PKG_VERSION"));
    }
    Commands::Extract {
      pdf,
      output_dir,
      config,
      model,
      llm_url,
      layout_url,
      dpi,
      line_tolerance,
      column_split,
      verbosity,
    } => {
      init_tracing(verbosity.level());

      let mut pipeline_config = load_config(config.config.as_deref())?;
      Overrides {
        model,
        llm_url,
        layout_url,
        dpi,
        line_tolerance,
        column_split,
      }
      .apply(&mut pipeline_config);

      let processor = PdfQaProcessor::from_config(&pipeline_config)?;
      let summary = processor
        .process_pdf(&pdf, &output_dir)
        .await
        .with_context(|| format!("Failed to process {}", pdf.display()))?;

      if summary.pages_processed == 0 {
        anyhow::bail!("no page of {} could be processed", pdf.display());
      }
    }
    Commands::Review {
      input,
      output,
      config,
      model,
      verbosity,
    } => {
      init_tracing(verbosity.level());

      let mut pipeline_config = load_config(config.config.as_deref())?;
      Overrides {
        model,
        ..Default::default()
      }
      .apply(&mut pipeline_config);

      let pairs = read_qa_file(&input).await?;
      info!("Reviewing {} pairs from {}", pairs.len(), input.display());

      let client = OllamaClient::new(&pipeline_config.llm)?;
      let reviewer = QaReviewer::new(Arc::new(client), pipeline_config.prompts.clone());
      let (kept, _) = reviewer.review(&pairs).await;

      write_qa_file(&output, &kept).await?;
      info!("Wrote {} pairs to {}", kept.len(), output.display());
    }
    Commands::Inspect { file } => {
      let report = inspect_file(&file)?;
      for issue in &report.issues {
        println!("{}", issue);
      }
      println!(
        "{}: {} valid, {} invalid, {} blank",
        file.display(),
        report.valid,
        report.issues.len(),
        report.blank
      );
      if !report.is_clean() {
        std::process::exit(1);
      }
    }
  }

  Ok(())
}
