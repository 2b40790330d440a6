//! Product Costing CLI
//!
//! Command-line interface over a CSV data directory: product costing,
//! indirect cost distribution, multi-month projections and schedule reports.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use product_costing::catalog::DEFAULT_DATA_PATH;
use product_costing::costing::CostingService;
use product_costing::forecast::{Forecaster, StaticForecaster, UntrainedForecaster};
use product_costing::projection::{ProjectionConfig, ProjectionEngine, ProjectionMode};
use product_costing::{reports, InMemoryRepository, LoadedCatalog, PriceBook, YearMonth};
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "costing", version, about = "Product costing and cost projection")]
struct Cli {
    /// Directory holding the CSV master data
    #[arg(long, global = true, env = "COSTING_DATA_DIR", default_value = DEFAULT_DATA_PATH)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recipe cost of one product at current prices
    Recipe { product_id: u32 },

    /// Full cost per kg of one product (material + indirect)
    Cost {
        product_id: u32,
        /// Base month of indirect costs (omit for variable cost only)
        #[arg(long)]
        base: Option<YearMonth>,
        /// Production month (default: current month)
        #[arg(long)]
        month: Option<YearMonth>,
    },

    /// Distribute indirect costs over a month's production
    Distribute {
        #[arg(long)]
        base: YearMonth,
        #[arg(long)]
        month: YearMonth,
        /// Add forecasts for products not scheduled that month
        #[arg(long)]
        hybrid: bool,
    },

    /// Project costs over a range of months
    Project {
        #[arg(long)]
        start: YearMonth,
        #[arg(long)]
        end: YearMonth,
        #[arg(long)]
        base: YearMonth,
        /// manual, ml, mixed or hybrid
        #[arg(long, default_value = "mixed")]
        mode: ProjectionMode,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// Write to a file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Raw material requirements of a month's schedule
    Requirements {
        #[arg(long)]
        month: Option<YearMonth>,
    },

    /// Production and variable cost summary of a month's schedule
    Monthly {
        #[arg(long)]
        month: Option<YearMonth>,
    },

    /// Recipe cost of every active product
    Summary,

    /// Indirect cost pool of a base month
    Pool {
        #[arg(long)]
        base: YearMonth,
    },

    /// Preview a bulk price adjustment and its effect on product costs
    AdjustPrices {
        /// Percentage, e.g. 5 for +5%
        #[arg(long, allow_hyphen_values = true)]
        pct: f64,
        /// Only adjust this material category
        #[arg(long)]
        category: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

fn current_month() -> YearMonth {
    YearMonth::from_date(chrono::Local::now().date_naive())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, value)?;
    writeln!(handle)?;
    Ok(())
}

fn load_forecaster(data_dir: &Path) -> Result<Box<dyn Forecaster + Sync>> {
    if data_dir.join("forecasts.csv").exists() {
        let forecaster = StaticForecaster::from_csv_path(data_dir)?;
        log::debug!("forecaster.loaded predictions={}", forecaster.len());
        Ok(Box::new(forecaster))
    } else {
        log::debug!("forecaster.untrained path={}", data_dir.display());
        Ok(Box::new(UntrainedForecaster))
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let loaded = LoadedCatalog::load_from(&cli.data_dir)
        .with_context(|| format!("loading data from {}", cli.data_dir.display()))?;
    let mut repo = InMemoryRepository::from_loaded(loaded)
        .with_context(|| format!("checking data in {}", cli.data_dir.display()))?;

    match cli.command {
        Command::Recipe { product_id } => {
            let cost = CostingService::new(&repo).recipe_cost(product_id)?;
            print_json(&cost)?;
        }
        Command::Cost { product_id, base, month } => {
            let month = month.unwrap_or_else(current_month);
            let cost = CostingService::new(&repo).full_cost(product_id, base, month)?;
            print_json(&cost)?;
        }
        Command::Distribute { base, month, hybrid } => {
            let service = CostingService::new(&repo);
            let report = if hybrid {
                let forecaster = load_forecaster(&cli.data_dir)?;
                service.distribution_hybrid(base, month, forecaster.as_ref())?
            } else {
                service.distribution(base, month)?
            };
            print_json(&report)?;
        }
        Command::Project {
            start,
            end,
            base,
            mode,
            format,
            output,
        } => {
            let forecaster = load_forecaster(&cli.data_dir)?;
            let config = ProjectionConfig::new(start, end, base, mode)?;
            let result = ProjectionEngine::new(&repo, forecaster.as_ref()).project(&config)?;

            let mut writer: Box<dyn Write> = match &output {
                Some(path) => {
                    Box::new(File::create(path).with_context(|| format!("creating {}", path.display()))?)
                }
                None => Box::new(io::stdout().lock()),
            };
            match format {
                OutputFormat::Json => {
                    #[derive(Serialize)]
                    struct Output<'a> {
                        summary: product_costing::projection::PeriodSummary,
                        months: &'a [product_costing::projection::MonthProjection],
                    }
                    serde_json::to_writer_pretty(
                        &mut writer,
                        &Output {
                            summary: result.summary(),
                            months: &result.months,
                        },
                    )?;
                    writeln!(writer)?;
                }
                OutputFormat::Csv => result.write_csv(&mut writer)?,
            }

            if let Some(path) = output {
                eprintln!("Projection written to: {}", path.display());
            }
        }
        Command::Requirements { month } => {
            let report = reports::material_requirements(&repo, month.unwrap_or_else(current_month));
            print_json(&report)?;
        }
        Command::Monthly { month } => {
            let summary = reports::monthly_summary(&repo, month.unwrap_or_else(current_month));
            print_json(&summary)?;
        }
        Command::Summary => {
            let rows = CostingService::new(&repo).costing_summary();
            print_json(&rows)?;
        }
        Command::Pool { base } => {
            let summary = CostingService::new(&repo).pool_summary(base)?;
            print_json(&summary)?;
        }
        Command::AdjustPrices { pct, category } => {
            let before = CostingService::new(&repo).costing_summary();
            let mut book = PriceBook::new();
            let adjustment = book.apply_bulk_adjustment(&mut repo, pct, category.as_deref())?;
            let after = CostingService::new(&repo).costing_summary();

            #[derive(Serialize)]
            struct Impact {
                product_id: u32,
                code: String,
                cost_per_kg_before: f64,
                cost_per_kg_after: f64,
            }
            let impact: Vec<Impact> = before
                .into_iter()
                .zip(after)
                .map(|(b, a)| Impact {
                    product_id: b.product_id,
                    code: b.code,
                    cost_per_kg_before: b.cost_per_kg,
                    cost_per_kg_after: a.cost_per_kg,
                })
                .collect();

            #[derive(Serialize)]
            struct Preview {
                adjustment: product_costing::pricing::AdjustmentReport,
                impact: Vec<Impact>,
            }
            print_json(&Preview { adjustment, impact })?;
        }
    }

    Ok(())
}
