//! Scheduler configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Background scrape scheduling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Run a full scrape every N minutes
    pub interval_minutes: Option<u64>,
    /// Run a full re-scrape daily at this UTC time ("HH:MM")
    pub daily_at: Option<String>,
    /// Follow every scheduled full scrape with an upcoming-calendar scrape
    pub include_upcoming: bool,
    /// Scrape once at startup when the store holds no catalog records
    pub scrape_on_empty: bool,
    /// How long shutdown waits for an in-flight run (seconds)
    pub shutdown_grace_secs: u64,
}

impl SchedulerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval_minutes.map(|m| Duration::from_secs(m.saturating_mul(60)))
    }

    /// Parsed daily trigger time, if configured
    pub fn daily_time(&self) -> Result<Option<DailyTime>, String> {
        self.daily_at.as_deref().map(str::parse).transpose()
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_minutes: None,
            daily_at: Some("03:00".to_string()),
            include_upcoming: true,
            scrape_on_empty: true,
            shutdown_grace_secs: 10,
        }
    }
}

/// Time of day for the daily trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTime {
    pub hour: u8,
    pub minute: u8,
}

impl DailyTime {
    /// Six-field cron expression (sec min hour dom mon dow)
    pub fn cron_expression(&self) -> String {
        format!("0 {} {} * * *", self.minute, self.hour)
    }
}

impl FromStr for DailyTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("daily_at must be HH:MM, got '{}'", s))?;
        let hour: u8 = h
            .parse()
            .map_err(|_| format!("invalid hour in daily_at '{}'", s))?;
        let minute: u8 = m
            .parse()
            .map_err(|_| format!("invalid minute in daily_at '{}'", s))?;
        if hour > 23 || minute > 59 {
            return Err(format!("daily_at out of range: '{}'", s));
        }
        Ok(Self { hour, minute })
    }
}

impl fmt::Display for DailyTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}
