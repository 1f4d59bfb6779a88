mod cli;
mod telemetry;

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use nodetally_core::{
    dump_table, emit_customer_reports, read_snapshot, read_xlsx_table, run_pipeline, write_snapshot,
};
use nodetally_warehouse::{DatabricksClient, WarehouseConfig, validate_identifier};
use polars::prelude::DataFrame;

use cli::Args;
use telemetry::init_tracing;

struct SourceTables {
    df_customers: DataFrame,
    df_nodes: DataFrame,
}

fn load_tables(args: &Args) -> Result<SourceTables> {
    if let Some(dir) = &args.input_dir {
        tracing::info!(dir = %dir.display(), "loading tables from snapshots");
        return Ok(SourceTables {
            df_customers: read_snapshot(dir, &args.customer_table)
                .with_context(|| format!("loading snapshot of {}", args.customer_table))?,
            df_nodes: read_snapshot(dir, &args.node_table)
                .with_context(|| format!("loading snapshot of {}", args.node_table))?,
        });
    }

    if let Some(dir) = &args.input_xlsx_dir {
        tracing::info!(dir = %dir.display(), "loading tables from spreadsheets");
        return Ok(SourceTables {
            df_customers: read_xlsx_table(dir, &args.customer_table)
                .with_context(|| format!("reading spreadsheet of {}", args.customer_table))?,
            df_nodes: read_xlsx_table(dir, &args.node_table)
                .with_context(|| format!("reading spreadsheet of {}", args.node_table))?,
        });
    }

    let config = WarehouseConfig::from_env().context("reading warehouse configuration")?;
    tracing::debug!(?config, "warehouse configuration");
    let client = DatabricksClient::new(config);
    Ok(SourceTables {
        df_customers: client
            .fetch(&args.customer_table)
            .with_context(|| format!("fetching {}", args.customer_table))?,
        df_nodes: client
            .fetch(&args.node_table)
            .with_context(|| format!("fetching {}", args.node_table))?,
    })
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.verbose);

    for table in [&args.customer_table, &args.node_table] {
        validate_identifier(table).with_context(|| format!("table name {table:?}"))?;
    }

    let mut tables = load_tables(&args)?;

    if let Some(dir) = &args.snapshot_dir {
        write_snapshot(&mut tables.df_customers, dir, &args.customer_table)
            .context("writing customer snapshot")?;
        write_snapshot(&mut tables.df_nodes, dir, &args.node_table)
            .context("writing node snapshot")?;
    }

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;

    if args.dump_tables {
        for (table, df) in [
            (&args.customer_table, &tables.df_customers),
            (&args.node_table, &tables.df_nodes),
        ] {
            dump_table(df, table, &args.dump_path(table))
                .with_context(|| format!("dumping {table}"))?;
        }
    }

    let output = run_pipeline(&tables.df_nodes, &tables.df_customers).context("building reports")?;

    let path = args.report_path(chrono::Local::now().date_naive());
    let emitted = emit_customer_reports(&output.reports, &path)
        .with_context(|| format!("writing {}", path.display()))?;

    output.summary.log();
    emitted.log();
    tracing::info!(path = %path.display(), "report written");
    Ok(())
}
