use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub const SESSION_SCHEMA_VERSION: u32 = 2;
pub const DEFAULT_BOH_PERCENT: f64 = 5.0;
pub const DEFAULT_FOH_PERCENT: f64 = 3.0;
pub const DEFAULT_COST_PER_HEAD: f64 = 65.0;

/// Which of the two ledger sequences an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Hours,
    Tips,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Hours => "hours",
            EntryKind::Tips => "tips",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "hours" => Ok(EntryKind::Hours),
            "tips" => Ok(EntryKind::Tips),
            other => Err(format!("unknown entry kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// A single hours or tips value. `auto` marks values handed off by a calculator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Entry {
    pub value: f64,
    pub auto: bool,
}

impl Entry {
    pub fn manual(value: f64) -> Self {
        Self { value, auto: false }
    }

    pub fn automatic(value: f64) -> Self {
        Self { value, auto: true }
    }
}

// Older documents stored bare numbers instead of records.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Legacy(f64),
    Record {
        value: f64,
        #[serde(default)]
        auto: bool,
    },
}

impl<'de> Deserialize<'de> for Entry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entry = match StoredEntry::deserialize(deserializer)? {
            StoredEntry::Legacy(value) => Entry::manual(value),
            StoredEntry::Record { value, auto } => Entry { value, auto },
        };
        if !entry.value.is_finite() {
            return Err(serde::de::Error::custom("entry value must be finite"));
        }
        Ok(entry)
    }
}

/// The `endOfDayData` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftSession {
    #[serde(default = "legacy_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub session_start_time: Option<i64>,
    #[serde(default)]
    pub total_hours: f64,
    #[serde(default)]
    pub total_tips: f64,
    #[serde(default)]
    pub hours_entries: Vec<Entry>,
    #[serde(default)]
    pub tips_entries: Vec<Entry>,
}

fn legacy_schema_version() -> u32 {
    1
}

impl Default for ShiftSession {
    fn default() -> Self {
        Self {
            schema_version: SESSION_SCHEMA_VERSION,
            session_start_time: None,
            total_hours: 0.0,
            total_tips: 0.0,
            hours_entries: Vec::new(),
            tips_entries: Vec::new(),
        }
    }
}

impl ShiftSession {
    pub fn is_empty(&self) -> bool {
        self.hours_entries.is_empty() && self.tips_entries.is_empty()
    }
}

/// The `tipCalcPreset` document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TipPreset {
    pub boh: f64,
    pub foh: f64,
}

impl Default for TipPreset {
    fn default() -> Self {
        Self {
            boh: DEFAULT_BOH_PERCENT,
            foh: DEFAULT_FOH_PERCENT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LargeParty {
    #[serde(default)]
    pub headcount: f64,
    #[serde(default = "default_cost_per_head")]
    pub cost_per_head: f64,
}

fn default_cost_per_head() -> f64 {
    DEFAULT_COST_PER_HEAD
}

impl Default for LargeParty {
    fn default() -> Self {
        Self {
            headcount: 0.0,
            cost_per_head: DEFAULT_COST_PER_HEAD,
        }
    }
}

/// The calculator views, stored under `lastActiveApp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppId {
    #[serde(rename = "tipcalc")]
    TipCalc,
    #[serde(rename = "hourscalc")]
    HoursCalc,
    #[serde(rename = "endofday")]
    EndOfDay,
}

impl AppId {
    pub fn as_str(self) -> &'static str {
        match self {
            AppId::TipCalc => "tipcalc",
            AppId::HoursCalc => "hourscalc",
            AppId::EndOfDay => "endofday",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            AppId::TipCalc => "Tip Breakdown",
            AppId::HoursCalc => "Hours Calculator",
            AppId::EndOfDay => "End of Day",
        }
    }

    pub fn path(self) -> String {
        format!("/app/{}", self.as_str())
    }
}

impl FromStr for AppId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tipcalc" => Ok(AppId::TipCalc),
            "hourscalc" => Ok(AppId::HoursCalc),
            "endofday" => Ok(AppId::EndOfDay),
            other => Err(format!("unknown app '{other}'")),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddEntryRequest {
    pub kind: EntryKind,
    pub value: f64,
}

#[derive(Debug, Deserialize)]
pub struct EditEntryRequest {
    pub value: f64,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub index: usize,
    pub direction: Direction,
}

#[derive(Debug, Deserialize)]
pub struct TipRequest {
    #[serde(default)]
    pub owed: Option<f64>,
    #[serde(default)]
    pub sales: Option<f64>,
    #[serde(default)]
    pub cash: Option<f64>,
    #[serde(default)]
    pub parties: Vec<LargeParty>,
}

#[derive(Debug, Deserialize)]
pub struct PresetRequest {
    pub boh: f64,
    pub foh: f64,
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmQuery {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Deserialize)]
pub struct HoursRequest {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub break_minutes: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_start_time: Option<i64>,
    pub total_hours: f64,
    pub total_tips: f64,
    pub hourly_rate: f64,
    pub entry_count: usize,
    pub hours_entries: Vec<Entry>,
    pub tips_entries: Vec<Entry>,
    pub can_undo: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BreakdownLine {
    pub hours: f64,
    pub auto: bool,
    pub tips: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BreakdownResponse {
    pub hourly_rate: f64,
    pub lines: Vec<BreakdownLine>,
    pub total: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StaleResponse {
    pub stale: bool,
    pub age_hours: Option<i64>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LastAppResponse {
    pub app: Option<String>,
}
