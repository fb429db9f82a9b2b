//! Per-week maintenance state.
//!
//! Each ISO week moves through `Fresh -> ReminderSent -> Done` (steps may be
//! skipped). The state is persisted as an integer per week key so the bot
//! remembers across restarts what it already sent.

use std::{collections::BTreeMap, fmt, path::PathBuf};

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use tokio::sync::Mutex;

use crate::{errors::Error, Result};

/// ISO-8601 week (year is the ISO year, not the calendar year).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IsoWeek {
    pub year: i32,
    pub week: u32,
}

impl IsoWeek {
    pub fn of(date: NaiveDate) -> Self {
        let w = date.iso_week();
        Self {
            year: w.year(),
            week: w.week(),
        }
    }

    pub fn key(&self) -> String {
        format!("{}-W{:02}", self.year, self.week)
    }
}

impl fmt::Display for IsoWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeekState {
    /// Kick-off reminder sent, nobody reported back yet.
    Fresh = 0,
    /// Follow-up reminder sent.
    ReminderSent = 1,
    /// Maintenance reported done.
    Done = 2,
}

impl WeekState {
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(Self::Fresh),
            1 => Some(Self::ReminderSent),
            2 => Some(Self::Done),
            _ => None,
        }
    }
}

#[async_trait]
pub trait WeekStateStore: Send + Sync {
    /// `None` if nothing happened in `week` yet.
    async fn get(&self, week: IsoWeek) -> Result<Option<WeekState>>;
    async fn set(&self, week: IsoWeek, state: WeekState) -> Result<()>;
    async fn clear(&self, week: IsoWeek) -> Result<()>;
}

/// Week states kept in a small JSON object: `{"2026-W42": 0}`.
pub struct FileStateStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> Result<BTreeMap<String, serde_json::Value>> {
        let txt = match tokio::fs::read_to_string(&self.path).await {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if txt.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&txt).map_err(|e| {
            Error::State(format!("state file {} is corrupt: {e}", self.path.display()))
        })
    }

    async fn write_all(&self, map: &BTreeMap<String, serde_json::Value>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let txt = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, txt).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl WeekStateStore for FileStateStore {
    async fn get(&self, week: IsoWeek) -> Result<Option<WeekState>> {
        let _guard = self.lock.lock().await;
        let map = self.read_all().await?;
        let Some(raw) = map.get(&week.key()) else {
            return Ok(None);
        };
        raw.as_i64()
            .and_then(WeekState::from_i64)
            .map(Some)
            .ok_or_else(|| Error::State(format!("invalid state {raw} stored for {week}")))
    }

    async fn set(&self, week: IsoWeek, state: WeekState) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_all().await?;
        map.insert(week.key(), serde_json::Value::from(state.as_i64()));
        self.write_all(&map).await
    }

    async fn clear(&self, week: IsoWeek) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_all().await?;
        if map.remove(&week.key()).is_some() {
            self.write_all(&map).await?;
        }
        Ok(())
    }
}

/// In-process store; state is lost on restart.
#[derive(Default)]
pub struct MemoryStateStore {
    map: Mutex<BTreeMap<IsoWeek, WeekState>>,
}

#[async_trait]
impl WeekStateStore for MemoryStateStore {
    async fn get(&self, week: IsoWeek) -> Result<Option<WeekState>> {
        Ok(self.map.lock().await.get(&week).copied())
    }

    async fn set(&self, week: IsoWeek, state: WeekState) -> Result<()> {
        self.map.lock().await.insert(week, state);
        Ok(())
    }

    async fn clear(&self, week: IsoWeek) -> Result<()> {
        self.map.lock().await.remove(&week);
        Ok(())
    }
}
