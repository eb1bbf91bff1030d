//! Cron-driven periodic runs.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use tracing::{error, info, warn};

use crate::config::SchedulerConfig;
use crate::pipeline::JobRunner;

/// Parse a cron expression, accepting the standard 5-field form.
///
/// The `cron` crate wants `sec min hour dom month dow`, so 5-field
/// expressions get a leading `0` seconds field.
pub fn parse_cron(expr: &str) -> Result<Schedule> {
    let trimmed = expr.trim();
    let normalized = if trimmed.split_whitespace().count() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    };
    Schedule::from_str(&normalized).with_context(|| format!("invalid cron expression '{}'", expr))
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| anyhow!("invalid timezone '{}': {}", name, e))
}

/// A cron schedule evaluated in a fixed timezone.
#[derive(Debug, Clone)]
pub struct RunSchedule {
    schedule: Schedule,
    tz: Tz,
}

impl RunSchedule {
    pub fn from_config(config: &SchedulerConfig) -> Result<Self> {
        Ok(Self {
            schedule: parse_cron(&config.cron)?,
            tz: parse_timezone(&config.timezone)?,
        })
    }

    /// First fire time strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule
            .after(&now.with_timezone(&self.tz))
            .next()
            .map(|t| t.with_timezone(&Utc))
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }
}

/// Sleep until each fire time, then run the pipeline. Never returns unless
/// the schedule has no future fire times.
pub async fn run_scheduler(runner: Arc<JobRunner>, schedule: RunSchedule) {
    info!("⏰ Scheduler started (timezone {})", schedule.timezone());

    loop {
        let now = Utc::now();
        let Some(next) = schedule.next_after(now) else {
            warn!("Schedule has no upcoming fire times; scheduler stopping");
            return;
        };
        info!(
            "⏰ Next scheduled run at {}",
            next.with_timezone(&schedule.timezone()).format("%Y-%m-%d %H:%M %Z")
        );

        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        tokio::time::sleep(wait).await;

        match runner.run().await {
            Ok(summary) => info!(
                "⏰ Scheduled run finished: {} scraped, {} added",
                summary.total_scraped, summary.total_added
            ),
            Err(e) => error!("⏰ Scheduled run failed: {}", e),
        }
    }
}
