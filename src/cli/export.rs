//! Export command implementation

use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

use super::CliError;
use crate::config::{ConfigError, ExportConfig, DEFAULT_CONFIG_FILE};
use crate::downloader::progress::format_duration;
use crate::downloader::{RunController, RunSummary};
use crate::fetcher::payload::QueryTemplate;
use crate::metrics;
use crate::shutdown::SharedShutdown;

const RULE: &str = "======================================================================";

/// Supplier export CLI
#[derive(Parser, Debug)]
#[command(name = "supplier-export")]
#[command(about = "Export the supplier directory to a CSV file", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Output CSV path (default: {output_file_prefix}_{YYYYMMDD_HHMMSS}.csv)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Output format for the final summary (json or human)
    #[arg(long, default_value = "human")]
    pub output_format: OutputFormat,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

impl Cli {
    fn human(&self) -> bool {
        self.output_format == OutputFormat::Human
    }

    /// Run one export
    ///
    /// # Returns
    /// The run summary; cancelled runs are a success here
    ///
    /// # Errors
    /// Configuration, metrics setup and run failures
    pub async fn execute(&self, shutdown: SharedShutdown) -> Result<RunSummary, CliError> {
        if self.human() {
            print_banner();
        }

        let config = match self.load_config() {
            Ok(config) => config,
            Err(e) => {
                self.report_failure(&e.to_string());
                return Err(e.into());
            }
        };

        if self.human() {
            print_config(&config);
        }

        if let Some(addr) = config.metrics_addr {
            metrics::init_metrics(addr)?;
        }

        let mut controller =
            RunController::from_config(config, shutdown)?.with_progress(self.human());
        if let Some(output) = &self.output {
            controller = controller.with_output_path(output);
        }

        match controller.run().await {
            Ok(summary) => {
                self.report_summary(&summary)?;
                Ok(summary)
            }
            Err(e) => {
                self.report_failure(&e.to_string());
                Err(e.into())
            }
        }
    }

    fn load_config(&self) -> Result<ExportConfig, ConfigError> {
        let config = ExportConfig::load(&self.config)?;
        if let Err(e) = config.validate() {
            if matches!(e, ConfigError::MissingAccessToken) && self.human() {
                println!("\u{274c} Please set access_token in the configuration file");
                println!(
                    "\u{1f4a1} Hint: copy the Access-Token value from the request headers in your browser's developer tools"
                );
            }
            return Err(e);
        }
        Ok(config)
    }

    fn report_summary(&self, summary: &RunSummary) -> Result<(), CliError> {
        match self.output_format {
            OutputFormat::Json => {
                let mut output = serde_json::to_value(summary)?;
                output["success"] = serde_json::Value::Bool(true);
                println!("{}", serde_json::to_string(&output)?);
            }
            OutputFormat::Human => print_summary(summary),
        }
        Ok(())
    }

    fn report_failure(&self, error: &str) {
        match self.output_format {
            OutputFormat::Json => {
                let output = serde_json::json!({ "success": false, "error": error });
                println!("{output}");
            }
            OutputFormat::Human => println!("\n\u{274c} Export failed: {error}"),
        }
    }
}

fn print_banner() {
    println!("{RULE}");
    println!("Supplier data export");
    println!("{RULE}");
}

fn print_config(config: &ExportConfig) {
    let template = QueryTemplate::supplier_query();
    info!(
        base_url = %config.base_url,
        page_size = config.page_size.get(),
        workers = config.max_workers,
        "Configuration ready"
    );

    println!("Target URL: {}", config.base_url);
    println!("Service: {}", template.service_name());
    println!("Method: {}", template.method_name());
    println!("Page size: {} records", config.page_size);
    println!("Request delay: {:.1} s", config.request_delay.as_secs_f64());
    println!("Workers: {}", config.max_workers);
    println!("Token: {}", config.masked_token());
    println!("{RULE}");
}

fn print_summary(summary: &RunSummary) {
    println!("{RULE}");
    if summary.cancelled {
        println!(
            "\n\u{26a0}\u{fe0f} Export interrupted! {} rows saved",
            summary.total_rows_written
        );
    } else if summary.total_count == 0 {
        println!("\n\u{274c} The server reported no records to export");
    } else {
        println!(
            "\n\u{2705} Export completed! {} rows saved",
            summary.total_rows_written
        );
    }

    println!("   Records reported: {}", summary.total_count);
    println!("   Pages requested:  {}", summary.total_pages_requested);
    println!("   Pages failed:     {}", summary.total_pages_failed);
    println!("   Elapsed:          {}", format_duration(summary.elapsed));
    if let Some(path) = &summary.output_path {
        println!("   Output file:      {}", path.display());
    }

    if summary.total_pages_failed > 0 {
        warn!(
            pages_failed = summary.total_pages_failed,
            missing_rows = summary.missing_rows(),
            "Some pages could not be fetched"
        );
        println!(
            "\n\u{26a0}\u{fe0f} {} pages failed, about {} records are missing",
            summary.total_pages_failed,
            summary.missing_rows()
        );
    }
    if summary.total_rows_written > 0 {
        println!("\n\u{1f4a1} Tip: open the CSV file with Excel or any spreadsheet tool");
    }
}
