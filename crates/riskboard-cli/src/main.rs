mod display;

use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use riskboard_core::{
    DashboardQuery, ExportDataType, ExportFormat, ExportRequest, RawValue, Taxonomy, TimeRange,
    badge_markup, classify, legend,
};
use riskboard_live::{DashboardView, RefreshConfig, RefreshController};
use riskboard_sync::{ClientConfig, DashboardClient};
use riskboard_sync::http::DEFAULT_BASE_URL;

/// Risk dashboard client: live snapshots, classification and exports.
#[derive(Parser)]
#[command(name = "riskboard", version, about, long_about = None)]
struct Cli {
    /// Backend API base URL
    #[arg(long, env = "RISKBOARD_API_URL", default_value = DEFAULT_BASE_URL, global = true)]
    api_url: String,

    /// Bearer token for the backend
    #[arg(long, env = "RISKBOARD_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Per-request timeout
    #[arg(long, default_value_t = 10, global = true)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Refresh on a timer and print every new snapshot until Ctrl-C
    Watch {
        /// Auto-refresh period
        #[arg(long, default_value_t = 30)]
        interval_secs: u64,

        #[command(flatten)]
        query: QueryArgs,
    },
    /// Run one refresh cycle and print the result
    Snapshot {
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Classify values and print their badges and legend
    Classify {
        /// risk, status, department, priority or compliance
        taxonomy: Taxonomy,

        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Ask the backend to generate an export file
    Export {
        #[arg(long, value_enum, default_value_t = DataTypeArg::Risks)]
        data_type: DataTypeArg,

        #[arg(long, value_enum, default_value_t = FormatArg::Excel)]
        format: FormatArg,
    },
}

#[derive(Args)]
struct QueryArgs {
    /// 7d, 30d, 90d or 1y
    #[arg(long, default_value = "30d")]
    time_range: TimeRange,

    /// Restrict to one department id
    #[arg(long)]
    department: Option<String>,
}

impl From<QueryArgs> for DashboardQuery {
    fn from(args: QueryArgs) -> Self {
        Self {
            time_range: args.time_range,
            department_id: args.department,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DataTypeArg {
    Risks,
    Assessments,
    Controls,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Excel,
    Csv,
    Pdf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    tracing::debug!("riskboard v{}", env!("CARGO_PKG_VERSION"));
    let client_config = cli_config(&cli);

    match cli.command {
        Command::Classify { taxonomy, values } => {
            for value in &values {
                let raw = RawValue::from(value);
                let d = classify(taxonomy, raw);
                let badge = badge_markup(taxonomy, raw, None);
                display::print_classification(taxonomy, value, &d, &badge);
            }
            println!();
            display::print_legend(taxonomy, &legend(taxonomy, &values));
        }
        Command::Snapshot { query } => {
            let config = RefreshConfig {
                auto_refresh: false,
                ..RefreshConfig::default()
            };
            let ctl =
                RefreshController::new(client(&client_config)?, DashboardView::headless(), config)
                    .with_query(query.into());
            ctl.initialize()
                .context("refresh already in flight")?
                .await
                .context("refresh task failed")?;
            display::print_snapshot(&ctl.snapshot(), &ctl.notifications().entries());
        }
        Command::Watch {
            interval_secs,
            query,
        } => {
            let config = RefreshConfig {
                period: Duration::from_secs(interval_secs.max(1)),
                ..RefreshConfig::default()
            };
            let ctl = RefreshController::new(client(&client_config)?, DashboardView::full(), config)
                .with_query(query.into());
            let mut updates = ctl.subscribe();
            ctl.initialize();

            loop {
                tokio::select! {
                    changed = updates.changed() => {
                        changed.context("snapshot channel closed")?;
                        let snapshot = updates.borrow_and_update().clone();
                        display::print_snapshot(&snapshot, &ctl.notifications().entries());
                    }
                    signal = tokio::signal::ctrl_c() => {
                        signal.context("listening for Ctrl-C")?;
                        break;
                    }
                }
            }
            ctl.shutdown();
        }
        Command::Export { data_type, format } => {
            let ctl = RefreshController::new(
                client(&client_config)?,
                DashboardView::headless(),
                RefreshConfig::default(),
            );
            let request = ExportRequest {
                data_type: data_type.into(),
                format: format.into(),
                filters: Default::default(),
            };
            let response = ctl.export(&request).await.context("export failed")?;
            println!("{:<26} {}", "filename", response.filename);
            if let Some(size) = response.size {
                println!("{:<26} {}", "size", size);
            }
            if let Some(url) = &response.download_url {
                println!("{:<26} {}", "download_url", url);
            }
        }
    }

    Ok(())
}

fn cli_config(cli: &Cli) -> ClientConfig {
    ClientConfig {
        base_url: cli.api_url.clone(),
        token: cli.token.clone(),
        timeout: Duration::from_secs(cli.timeout_secs),
    }
}

fn client(config: &ClientConfig) -> anyhow::Result<DashboardClient> {
    DashboardClient::new(config.clone()).context("building HTTP client")
}

impl From<DataTypeArg> for ExportDataType {
    fn from(arg: DataTypeArg) -> Self {
        match arg {
            DataTypeArg::Risks => Self::Risks,
            DataTypeArg::Assessments => Self::Assessments,
            DataTypeArg::Controls => Self::Controls,
        }
    }
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Excel => Self::Excel,
            FormatArg::Csv => Self::Csv,
            FormatArg::Pdf => Self::Pdf,
        }
    }
}
