use std::path::PathBuf;

use anyhow::anyhow;
use clap::Parser as ClapParser;
use clap::Subcommand;
use indexmap::IndexMap;
use serde::Serialize;
use sproc_lineage::lineage::{LineageReport, extract_lineage};
use sproc_lineage::parser::parse_sql;
use std::time::Instant;
use strum_macros::{Display, EnumString};

#[derive(clap::Parser)]
#[command(name = "sproc-lineage")]
#[command(about = "Sybase T-SQL stored procedure lineage extractor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract lineage from one or more stored procedure files.
    ExtractLineage(LineageCommand),
}

#[derive(Clone, Copy, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
enum OutputFormat {
    Json,
    Text,
}

#[derive(clap::Args)]
struct LineageCommand {
    /// Path to the SQL file or directory containing SQL files.
    #[arg(value_name = "SQL_[FILE|DIR]")]
    sql: PathBuf,
    /// Output format: `json` or `text`.
    #[arg(short, long, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
#[serde(untagged)]
enum OutLineage {
    Ok(LineageReport),
    ErrLineage { error: String },
}

impl OutLineage {
    fn to_text(&self) -> String {
        match self {
            OutLineage::Ok(report) => report.to_string(),
            OutLineage::ErrLineage { error } => format!("Error: {}", error),
        }
    }
}

fn output_lineage(sql_file_path: &PathBuf) -> anyhow::Result<OutLineage> {
    let sql = std::fs::read_to_string(sql_file_path).map_err(|_| {
        anyhow!(
            "Failed to read sql file {}",
            sql_file_path.display().to_string()
        )
    })?;
    let out_lineage = match parse_sql(&sql) {
        Ok(ast) => OutLineage::Ok(extract_lineage(&ast)),
        Err(err) => OutLineage::ErrLineage {
            error: format!(
                "Could not parse SQL in file {} due to error: {}",
                sql_file_path.display(),
                err
            ),
        },
    };
    Ok(out_lineage)
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

fn main() -> anyhow::Result<()> {
    let now = Instant::now();

    env_logger::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::ExtractLineage(lineage_command) => {
            let sql_file_or_dir = &lineage_command.sql;
            let out_str = if sql_file_or_dir.is_dir() {
                let mut file_lineages: IndexMap<String, OutLineage> = IndexMap::new();
                let mut sql_in_dir: Vec<_> = std::fs::read_dir(sql_file_or_dir)?
                    .filter_map(|res| res.ok())
                    .map(|entry| entry.path())
                    .filter(|file| file.extension().is_some_and(|ext| ext == "sql"))
                    .collect();
                sql_in_dir.sort();

                for sql_file in sql_in_dir {
                    let output_lineage = output_lineage(&sql_file)?;
                    file_lineages.insert(
                        std::path::absolute(sql_file)?.display().to_string(),
                        output_lineage,
                    );
                }

                match lineage_command.format {
                    OutputFormat::Json => to_json(&file_lineages, lineage_command.pretty)?,
                    OutputFormat::Text => file_lineages
                        .iter()
                        .map(|(file, lineage)| format!("{}\n{}", file, lineage.to_text()))
                        .collect::<Vec<String>>()
                        .join("\n\n"),
                }
            } else {
                let output_lineage = output_lineage(sql_file_or_dir)?;
                match lineage_command.format {
                    OutputFormat::Json => to_json(&output_lineage, lineage_command.pretty)?,
                    OutputFormat::Text => output_lineage.to_text(),
                }
            };
            println!("{}", out_str);
        }
    }

    let elapsed = now.elapsed();
    log::info!("Elapsed: {:.2?}", elapsed);

    Ok(())
}
