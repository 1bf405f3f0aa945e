use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use camwatch::driver::{self, DriveOptions};
use camwatch::duration::{format_duration, parse_duration};
use camwatch::logging::{self, LogFormat};
use camwatch::settings::{self, Overrides};
use camwatch_sdk::{CameraPublisher, ChannelTransport, LogSink, Output, Reporter, TestPattern};

#[derive(Parser, Debug)]
#[command(name = "camwatch")]
#[command(about = "Run a synthetic camera through the health-monitored publication pipeline")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Parameter namespace of the camera
    #[arg(short, long, default_value = "camera")]
    namespace: String,

    /// Camera name (overrides `<namespace>.camera_name`)
    #[arg(long)]
    camera_name: Option<String>,

    /// Calibration URL (overrides `<namespace>.calib_url`)
    #[arg(long)]
    calib_url: Option<String>,

    /// Frame rate (overrides `<namespace>.fps`)
    #[arg(long)]
    fps: Option<f64>,

    /// Stop after this long (e.g. "10s", "500ms"); runs until Ctrl-C if absent
    #[arg(short, long)]
    duration: Option<String>,

    /// Write the latest health report to this JSON file
    #[arg(long)]
    output_file: Option<PathBuf>,

    /// Send health reports to a TCP listener (host:port)
    #[arg(long)]
    output_tcp: Option<String>,

    /// Fail every Nth acquisition
    #[arg(long)]
    fail_every: Option<u64>,

    /// Skip acquisition while nobody subscribes
    #[arg(long)]
    lazy: bool,

    /// Log layout
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    /// Print the final health report as JSON on exit
    #[arg(long)]
    print_report: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.log_format, "info")?;

    let duration = args
        .duration
        .as_deref()
        .map(parse_duration)
        .transpose()
        .context("invalid --duration")?;

    let overrides = Overrides {
        config: args.config.clone(),
        namespace: args.namespace.clone(),
        camera_name: args.camera_name.clone(),
        calib_url: args.calib_url.clone(),
        fps: args.fps,
        fail_every: args.fail_every,
        lazy: args.lazy,
    };
    let config = settings::load(&overrides)?;
    let driver_settings = settings::driver_settings(&config)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut reporter = Reporter::builder()
            .interval(Duration::from_millis(driver_settings.report_interval_ms.max(1)));
        if let Some(path) = &args.output_file {
            reporter = reporter.output(Output::file(path));
        }
        if let Some(addr) = &args.output_tcp {
            reporter = reporter.output(Output::tcp(addr));
        }
        let reporter = reporter.build();

        let transport = Arc::new(ChannelTransport::new(driver_settings.transport_capacity));
        let publisher = CameraPublisher::builder()
            .load_params(&config, &args.namespace)?
            .acquire(
                TestPattern::new(driver_settings.width, driver_settings.height)
                    .fail_every(driver_settings.fail_every),
            )
            .transport(transport)
            .sink(LogSink::new())
            .shared_sink(reporter.sink())
            .build()
            .context("failed to build camera publisher")?;
        let publisher = Arc::new(publisher);

        let options = DriveOptions {
            fps: publisher.fps(),
            duration,
            lazy: driver_settings.lazy,
        };
        info!(
            topic = publisher.topic(),
            fps = options.fps,
            duration = options.duration.map(format_duration).as_deref().unwrap_or("unbounded"),
            lazy = options.lazy,
            "starting camera"
        );

        let emission = reporter.start();
        let shutdown = async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        };
        let summary = driver::run(publisher, options, shutdown).await?;
        reporter.emit_now().await;
        emission.stop();

        info!(
            cycles = summary.stats.cycles,
            published = summary.stats.published,
            failures = summary.stats.acquisition_failures,
            idle = summary.idle_cycles,
            elapsed = %format_duration(summary.elapsed),
            "camera stopped"
        );

        if args.print_report {
            if let Some(report) = &summary.final_report {
                println!("{}", serde_json::to_string_pretty(report)?);
            }
        }
        Ok::<(), anyhow::Error>(())
    })
}
