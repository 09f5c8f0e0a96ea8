//! Service configuration
use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_DB_PATH: &str = "appointments.db";

#[derive(Debug, Clone)]
pub struct BookingConfig {
    pub db_path: PathBuf,
    /// Offset of the store's reference timezone, used to decide what "today" is.
    pub utc_offset: FixedOffset,
    /// Narrow the generic status update to the assigned doctor.
    pub restrict_generic_update: bool,
    /// Let a cancelled or rejected appointment give up its slot.
    pub release_closed_slots: bool,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            utc_offset: Utc.fix(),
            restrict_generic_update: false,
            release_closed_slots: false,
        }
    }
}

impl BookingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read overrides from `BOOKING_*` environment variables, falling back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`BookingConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup("BOOKING_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(minutes) = lookup("BOOKING_UTC_OFFSET_MINUTES") {
            let minutes: i32 = minutes.trim().parse()?;
            config.utc_offset = offset_from_minutes(minutes)?;
        }
        if let Some(flag) = lookup("BOOKING_RESTRICT_GENERIC_UPDATE") {
            config.restrict_generic_update = parse_flag(&flag)?;
        }
        if let Some(flag) = lookup("BOOKING_RELEASE_CLOSED_SLOTS") {
            config.release_closed_slots = parse_flag(&flag)?;
        }

        Ok(config)
    }

    /// Open (or create) the sled database at `db_path`.
    pub fn open_db(&self) -> anyhow::Result<Arc<sled::Db>> {
        let db = sled::open(&self.db_path)?;
        tracing::debug!(path = %self.db_path.display(), "opened appointment database");
        Ok(Arc::new(db))
    }

    pub fn set_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }
    pub fn set_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }
    pub fn set_restrict_generic_update(mut self, restrict: bool) -> Self {
        self.restrict_generic_update = restrict;
        self
    }
    pub fn set_release_closed_slots(mut self, release: bool) -> Self {
        self.release_closed_slots = release;
        self
    }

    /// Today's date in the reference timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.utc_offset).date_naive()
    }
}

fn offset_from_minutes(minutes: i32) -> anyhow::Result<FixedOffset> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| anyhow::anyhow!("UTC offset of {minutes} minutes is out of range"))
}

fn parse_flag(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow::anyhow!("expected a boolean flag, got '{other}'")),
    }
}
