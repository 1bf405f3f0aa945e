//! Runs a publisher at a fixed rate until told to stop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use camwatch_sdk::{CameraPublisher, Clock, PublisherStats};
use camwatch_types::{HealthReport, Level};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// How the drive loop paces and gates cycles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveOptions {
    /// Cycles per second.
    pub fps: f64,
    /// Stop after this long; `None` runs until shutdown.
    pub duration: Option<Duration>,
    /// Skip acquisition while the transport has no subscribers.
    pub lazy: bool,
}

/// What a finished run did.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub stats: PublisherStats,
    pub idle_cycles: u64,
    pub elapsed: Duration,
    pub final_report: Option<HealthReport>,
}

/// Drive `publisher` until `options.duration` passes or `shutdown` resolves.
///
/// Each cycle runs on the blocking pool, since acquisition may block on
/// hardware.
pub async fn run<F>(
    publisher: Arc<CameraPublisher>,
    options: DriveOptions,
    shutdown: F,
) -> Result<RunSummary>
where
    F: Future<Output = ()>,
{
    let period = cycle_period(options.fps)?;
    let started = Instant::now();
    let deadline = options.duration.map(|d| started + d);

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut idle_cycles = 0u64;
    let mut last_level: Option<Level> = None;

    loop {
        let sleep_until_deadline = async {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown requested");
                break;
            }
            _ = sleep_until_deadline => {
                debug!("run duration reached");
                break;
            }
            _ = ticker.tick() => {}
        }

        let idle = options.lazy && publisher.subscriber_count() == 0;
        let cycle_publisher = publisher.clone();
        let report = tokio::task::spawn_blocking(move || {
            if idle {
                cycle_publisher.idle_cycle()
            } else {
                let now = cycle_publisher.clock().now();
                cycle_publisher.publish_cycle(now).report
            }
        })
        .await
        .context("publish cycle panicked")?;

        if idle {
            idle_cycles += 1;
        }
        if last_level != Some(report.level) {
            info!(level = %report.level, "health level changed");
            last_level = Some(report.level);
        }
    }

    Ok(RunSummary {
        stats: publisher.stats(),
        idle_cycles,
        elapsed: started.elapsed(),
        final_report: publisher.last_report(),
    })
}

/// The interval between cycles at `fps`.
///
/// Rejects rates whose period is zero or does not fit in a `Duration`, which
/// `tokio::time::interval` cannot pace.
pub fn cycle_period(fps: f64) -> Result<Duration> {
    let period = Duration::try_from_secs_f64(1.0 / fps)
        .with_context(|| format!("frame rate {fps} has no usable period"))?;
    if period.is_zero() {
        bail!("frame rate {fps} is too high to pace");
    }
    Ok(period)
}
