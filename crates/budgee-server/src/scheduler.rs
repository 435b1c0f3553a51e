//! Background monthly budget reset
//!
//! The reset check runs once at startup and then on a fixed interval, so a
//! server left running across a month boundary rolls the budget over without
//! a client having to ask. Controlled by:
//!
//! - `BUDGEE_RESET_INTERVAL_SECS`: seconds between checks (default 3600, 0 disables)

use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tracing::{error, info, warn};

use budgee_core::{Database, EventBus, LedgerEvent, MonthlyReset};

/// Seconds between checks when `BUDGEE_RESET_INTERVAL_SECS` is not set
pub const DEFAULT_RESET_INTERVAL_SECS: u64 = 3600;

/// Configuration for the reset scheduler
#[derive(Debug, Clone)]
pub struct ResetScheduleConfig {
    pub interval: Duration,
}

impl Default for ResetScheduleConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_RESET_INTERVAL_SECS),
        }
    }
}

impl ResetScheduleConfig {
    /// Parse configuration from environment variables
    ///
    /// Returns None when the scheduler is disabled (`BUDGEE_RESET_INTERVAL_SECS=0`).
    pub fn from_env() -> Option<Self> {
        Self::from_value(std::env::var("BUDGEE_RESET_INTERVAL_SECS").ok().as_deref())
    }

    fn from_value(value: Option<&str>) -> Option<Self> {
        let secs = match value.map(str::trim) {
            None | Some("") => DEFAULT_RESET_INTERVAL_SECS,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) => secs,
                Err(_) => {
                    warn!(value = raw, "Invalid BUDGEE_RESET_INTERVAL_SECS, using default");
                    DEFAULT_RESET_INTERVAL_SECS
                }
            },
        };

        if secs == 0 {
            warn!("BUDGEE_RESET_INTERVAL_SECS is 0, automatic monthly reset disabled");
            return None;
        }

        Some(Self {
            interval: Duration::from_secs(secs),
        })
    }
}

/// Start the reset scheduler as a background task
pub fn start_reset_scheduler(db: Database, events: EventBus, config: ResetScheduleConfig) {
    info!(
        "Starting monthly reset scheduler: checking every {}s",
        config.interval.as_secs()
    );

    tokio::spawn(async move {
        let mut ticker = interval(config.interval);

        // The first tick fires immediately, covering a restart in a new month
        loop {
            ticker.tick().await;

            if let Err(e) = run_reset_check(&db, &events) {
                error!("Monthly reset check failed: {}", e);
            }
        }
    });
}

/// Run one reset check, announcing any changes on the change feed
pub fn run_reset_check(db: &Database, events: &EventBus) -> budgee_core::Result<Option<MonthlyReset>> {
    let reset = db.check_and_reset_monthly_budget(Utc::now())?;

    if let Some(ref reset) = reset {
        info!(transferred = reset.transferred, "Scheduled monthly reset ran");

        if let Err(e) = db.log_audit(
            "scheduler",
            "monthly_reset",
            Some("budget"),
            None,
            Some(&format!("transferred={:.2}", reset.transferred)),
        ) {
            warn!("Failed to log monthly reset to audit: {}", e);
        }

        events.publish(LedgerEvent::BudgetChanged);
        events.publish(LedgerEvent::NotificationAdded {
            id: reset.notification_id,
        });
    }

    Ok(reset)
}
