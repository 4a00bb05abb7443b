use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use farmergo::config::Config;
use farmergo::error::DataError;
use farmergo::fetch::{drive, HttpSheetFetcher};
use farmergo::registry::Registry;
use farmergo::service::DataService;
use farmergo::stats::{summarize, StatDiff};
use farmergo::types::{CleanedTable, Gender};

#[derive(Parser)]
#[command(name = "farmergo")]
#[command(about = "Anthropometric data service for farm equipment design")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered parameters, optionally filtered
    Parameters {
        /// Substring to match against parameter names
        #[arg(long)]
        search: Option<String>,
        /// List only parameters used for this application
        #[arg(long)]
        application: Option<String>,
    },
    /// Show the definition, applications and design guide for a parameter
    Info {
        /// Parameter name, e.g. "HAND LENGTH"
        parameter: String,
    },
    /// Fetch and normalize a parameter's data sheet
    Fetch {
        /// Parameter name, e.g. STATURE
        parameter: String,
        /// Population to fetch (male or female)
        #[arg(long)]
        gender: Gender,
        /// Comma-separated regions to keep (All India is always included)
        #[arg(long)]
        regions: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: Format,
        /// Write the output to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Compare male and female data for a parameter
    Compare {
        /// Parameter name, e.g. STATURE
        parameter: String,
    },
    /// Download the measurement diagram for a parameter
    Image {
        /// Parameter name, e.g. STATURE
        parameter: String,
        /// Population the diagram belongs to
        #[arg(long)]
        gender: Gender,
        /// File to write the image to
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Csv,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    farmergo::logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load()?;
    let fetcher = Arc::new(HttpSheetFetcher::new(&config.fetch)?);
    let service = DataService::new(fetcher.clone());

    match cli.command {
        Commands::Parameters {
            search,
            application,
        } => {
            let registry = Registry::global();
            let matches: Vec<_> = match (&search, &application) {
                (_, Some(app)) => registry.parameters_for_application(app),
                (Some(term), None) => registry.search(term),
                (None, None) => registry.parameters.iter().collect(),
            };

            if matches.is_empty() {
                println!("⚠️  No parameters matched");
            } else {
                println!("📋 {} parameter(s):", matches.len());
                for parameter in matches {
                    println!("   {}", parameter.name);
                }
            }
        }

        Commands::Info { parameter } => {
            let registry = Registry::global();
            match registry.get(&parameter) {
                Some(parameter) => {
                    println!("🔬 {}", parameter.name);
                    println!("\nDefinition:\n   {}", parameter.definition);
                    println!("\nApplications:");
                    for application in &parameter.applications {
                        println!("   - {}", application);
                    }
                    println!("\nDesign guide:\n   {}", parameter.design_guide);
                }
                None => {
                    println!("⚠️  Unknown parameter: {}", parameter);
                    let nearby = registry.search(&parameter);
                    if !nearby.is_empty() {
                        println!("   Did you mean:");
                        for candidate in nearby {
                            println!("   - {}", candidate.name);
                        }
                    }
                }
            }
        }

        Commands::Fetch {
            parameter,
            gender,
            regions,
            format,
            out,
        } => {
            let table = match service.table(&parameter, gender).await {
                Ok(table) => table,
                Err(e @ DataError::UnknownParameter(_)) => {
                    println!("⚠️  {}", e);
                    return Ok(());
                }
                Err(e) => {
                    // A failed fetch renders as the empty state, not a crash.
                    error!("fetch failed: {}", e);
                    println!("❌ Error fetching data: {}", e);
                    Arc::new(CleanedTable::empty())
                }
            };

            let selected = selected_regions(regions);
            render_table(&table, selected.as_deref(), format, out.as_deref())?;
        }

        Commands::Compare { parameter } => match service.compare(&parameter).await {
            Ok(comparison) => {
                println!("🔄 Male vs female — {}\n", comparison.parameter);
                print_diff("5th Percentile", &comparison.p5);
                print_diff("Mean", &comparison.mean);
                print_diff("95th Percentile", &comparison.p95);
            }
            Err(e) => {
                error!("comparison failed: {}", e);
                println!("❌ Unable to load data for comparison: {}", e);
            }
        },

        Commands::Image {
            parameter,
            gender,
            out,
        } => {
            let registry = Registry::global();
            let entry = match registry.get(&parameter) {
                Some(entry) => entry,
                None => {
                    println!("⚠️  Unknown parameter: {}", parameter);
                    return Ok(());
                }
            };
            let file_id = entry.links(gender).and_then(|links| links.image.as_deref());
            let file_id = match file_id {
                Some(id) => id,
                None => {
                    println!("⚠️  Image data not available for this parameter");
                    return Ok(());
                }
            };

            match drive::fetch_image(fetcher.client(), file_id).await {
                Some(bytes) => {
                    std::fs::write(&out, &bytes)?;
                    info!(file = %out.display(), bytes = bytes.len(), "image saved");
                    println!("🖼️  Saved {} image to {}", entry.name, out.display());
                }
                None => println!("❌ Unable to fetch image for {}", entry.name),
            }
        }
    }

    Ok(())
}

/// Parse the `--regions` list, always keeping "All India" for the baseline.
fn selected_regions(regions: Option<String>) -> Option<Vec<String>> {
    let list = regions?;
    let mut selected: Vec<String> = list
        .split(',')
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();
    if !selected.iter().any(|r| r == "All India") {
        selected.insert(0, "All India".to_string());
    }
    Some(selected)
}

fn render_table(
    table: &CleanedTable,
    regions: Option<&[String]>,
    format: Format,
    out: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    if !table.has_numeric_data() {
        println!("⚠️  No usable numeric data (missing columns: 5th Percentile, Mean, 95th Percentile)");
        return Ok(());
    }

    let rows: Vec<_> = match regions {
        Some(regions) => table.rows_for_regions(regions).into_iter().cloned().collect(),
        None => table.rows.clone(),
    };

    if rows.is_empty() {
        println!("⚠️  No data available for the selected regions");
        return Ok(());
    }

    let filtered = CleanedTable {
        rows,
        numeric_columns: table.numeric_columns.clone(),
        state_column: table.state_column.clone(),
    };

    let rendered = match format {
        Format::Csv => filtered.to_csv()?,
        Format::Json => filtered.to_json()?,
        Format::Table => {
            let mut text = format!(
                "{:<24}{:>16}{:>10}{:>18}\n",
                "State", "5th Percentile", "Mean", "95th Percentile"
            );
            for row in &filtered.rows {
                text.push_str(&format!(
                    "{:<24}{:>16}{:>10}{:>18}\n",
                    row.state.as_deref().unwrap_or("-"),
                    cell(row.p5),
                    cell(row.mean),
                    cell(row.p95),
                ));
            }
            let summary = summarize(&filtered);
            text.push_str(&format!(
                "\n📊 {} region(s) | avg 5th: {} | avg mean: {} | avg 95th: {}\n",
                summary.rows,
                cell(summary.avg_p5),
                cell(summary.avg_mean),
                cell(summary.avg_p95),
            ));
            text
        }
    };

    match out {
        Some(path) => {
            std::fs::write(path, rendered)?;
            println!("💾 Wrote {} row(s) to {}", filtered.rows.len(), path.display());
        }
        None => print!("{}", rendered),
    }

    Ok(())
}

fn print_diff(label: &str, diff: &StatDiff) {
    println!(
        "   {:<18} male: {:>8}   female: {:>8}   diff: {:>8}",
        label,
        cell(diff.male),
        cell(diff.female),
        cell(diff.difference),
    );
}

fn cell(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "N/A".to_string(),
    }
}
