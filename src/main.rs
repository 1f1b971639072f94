use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use freight_accrual::audit::AuditSummarizer;
use freight_accrual::logging::init_logging;
use freight_accrual::pipeline::{run_accrual, CodingContext, PipelineOutput};
use freight_accrual::{run_redwood, CodingConfig, Table};

#[derive(Parser)]
#[command(name = "freight-accrual")]
#[command(about = "Assign location codes, centers and GL accounts to freight invoices")]
#[command(version)]
struct Cli {
    /// Coding configuration (TOML); defaults apply when the file is absent
    #[arg(long, global = true, default_value = "config/coding.toml")]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Code an accrual extract
    Accrual {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Quality summary JSON (default: next to the output)
        #[arg(long)]
        summary: Option<PathBuf>,
    },
    /// Code a weekly extract and write the USD/CAD audit summaries
    WeeklyAudit {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output_dir: PathBuf,
        /// Only summarize rows from this run number
        #[arg(long)]
        batch: Option<String>,
    },
    /// Code Redwood shipments whose BOL is not in the A3 extract
    Redwood {
        #[arg(long)]
        a3: PathBuf,
        #[arg(long)]
        redwood: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config = CodingConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    let ctx = CodingContext::load(config).context("loading reference data")?;

    match cli.command {
        Commands::Accrual {
            input,
            output,
            summary,
        } => {
            println!("🚚 Accrual coding: {}", input.display());
            let table = read_table(&input)?;
            let result = run_accrual(&table, &ctx).context("coding accrual rows")?;
            write_output(&result, &output, summary)?;
        }
        Commands::WeeklyAudit {
            input,
            output_dir,
            batch,
        } => {
            println!("🧾 Weekly audit: {}", input.display());
            let table = read_table(&input)?;
            let result = run_accrual(&table, &ctx).context("coding weekly audit rows")?;

            fs::create_dir_all(&output_dir)
                .with_context(|| format!("creating {}", output_dir.display()))?;
            write_output(&result, &output_dir.join("weekly_audit_coded.csv"), None)?;

            let summarizer = AuditSummarizer::new(&ctx.config.audit.batch_column);
            let audit = summarizer.summarize(&result.records, batch.as_deref());
            let written = audit
                .write(&output_dir)
                .with_context(|| format!("writing audit summaries to {}", output_dir.display()))?;

            for partition in &audit.partitions {
                let status = if partition.balance.is_balanced() { "✓" } else { "⚠️" };
                println!(
                    "{} {}: {} records, header {:.2}, {} detail lines",
                    status,
                    partition.currency.as_str(),
                    partition.record_count,
                    partition.header_total,
                    partition.details.len()
                );
            }
            for path in written {
                println!("✓ Wrote {}", path.display());
            }
        }
        Commands::Redwood {
            a3,
            redwood,
            output,
        } => {
            println!("🌲 Redwood accrual: {} vs {}", redwood.display(), a3.display());
            let a3_table = read_table(&a3)?;
            let redwood_table = read_table(&redwood)?;
            let result = run_redwood(&a3_table, &redwood_table, &ctx).context("coding Redwood rows")?;
            write_output(&result, &output, None)?;
        }
    }

    Ok(())
}

fn read_table(path: &Path) -> Result<Table> {
    let table = Table::read(path).with_context(|| format!("reading {}", path.display()))?;
    info!(path = %path.display(), rows = table.rows.len(), "input loaded");
    Ok(table)
}

/// Coded CSV plus the quality summary JSON beside it
fn write_output(result: &PipelineOutput, output: &Path, summary: Option<PathBuf>) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    result
        .to_table()
        .write(output)
        .with_context(|| format!("writing {}", output.display()))?;

    let summary_path = summary.unwrap_or_else(|| output.with_extension("summary.json"));
    let json = serde_json::to_string_pretty(&result.summary)?;
    fs::write(&summary_path, json)
        .with_context(|| format!("writing {}", summary_path.display()))?;

    println!("✓ {}", result.summary.summary());
    println!("✓ Wrote {}", output.display());
    println!("✓ Wrote {}", summary_path.display());
    Ok(())
}
