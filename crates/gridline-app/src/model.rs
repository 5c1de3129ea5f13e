// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

/// Number of placeholder rows shown while a fetch is in flight.
pub const SKELETON_ROW_COUNT: usize = 10;

pub const DEFAULT_TEXT_PLACEHOLDER: &str = "Filter...";

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    DateTime(OffsetDateTime),
    Empty,
}

impl CellValue {
    pub fn display(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                format!("{}", *value as i64)
            }
            Self::Number(value) => value.to_string(),
            Self::DateTime(value) => value.format(&Rfc3339).unwrap_or_default(),
            Self::Empty => String::new(),
        }
    }

    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Reads the cell as a wall-clock timestamp. Text cells are parsed as
    /// RFC 3339 or as a bare `YYYY-MM-DD` (midnight).
    pub fn as_datetime(&self) -> Option<PrimitiveDateTime> {
        match self {
            Self::DateTime(value) => Some(PrimitiveDateTime::new(value.date(), value.time())),
            Self::Text(raw) => {
                let raw = raw.trim();
                if let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc3339) {
                    return Some(PrimitiveDateTime::new(parsed.date(), parsed.time()));
                }
                parse_day(raw)
                    .ok()
                    .map(|date| PrimitiveDateTime::new(date, Time::MIDNIGHT))
            }
            Self::Number(_) | Self::Empty => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<OffsetDateTime> for CellValue {
    fn from(value: OffsetDateTime) -> Self {
        Self::DateTime(value)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    fields: Vec<(String, CellValue)>,
    skeleton: bool,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a loading placeholder with one empty cell per column.
    pub fn skeleton(columns: &[ColumnDescriptor]) -> Self {
        Self {
            fields: columns
                .iter()
                .map(|column| (column.field.clone(), CellValue::Empty))
                .collect(),
            skeleton: true,
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<CellValue>) {
        let field = field.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((field, value)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&CellValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub const fn is_skeleton(&self) -> bool {
        self.skeleton
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    #[default]
    Client,
    Server,
}

impl FilterMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "client" => Some(Self::Client),
            "server" => Some(Self::Server),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    Single,
    #[default]
    Multiple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKind {
    #[default]
    None,
    Text,
    Select,
    Date,
    DateRange,
}

impl FilterKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Text => "text",
            Self::Select => "select",
            Self::Date => "date",
            Self::DateRange => "date-range",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" | "" => Some(Self::None),
            "text" => Some(Self::Text),
            "select" => Some(Self::Select),
            "date" => Some(Self::Date),
            "date-range" => Some(Self::DateRange),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeColor {
    pub background: String,
    pub text: String,
}

/// Per-column filter settings. Unset fields fall back to the filter's
/// defaults when the filter is built.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterConfig {
    pub placeholder: Option<String>,
    pub options: Vec<String>,
    pub badge_colors: BTreeMap<String, BadgeColor>,
    pub selection: Option<SelectionMode>,
    pub mode: Option<FilterMode>,
    pub min_date: Option<Date>,
    pub max_date: Option<Date>,
}

impl FilterConfig {
    pub fn mode(&self) -> FilterMode {
        self.mode.unwrap_or_default()
    }

    pub fn selection(&self) -> SelectionMode {
        self.selection.unwrap_or_default()
    }

    pub fn placeholder(&self) -> &str {
        self.placeholder
            .as_deref()
            .unwrap_or(DEFAULT_TEXT_PLACEHOLDER)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub field: String,
    pub header: String,
    pub filter: FilterKind,
    pub filter_config: FilterConfig,
    pub min_width: Option<u16>,
    pub max_width: Option<u16>,
    pub sortable: bool,
}

impl ColumnDescriptor {
    pub fn new(field: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            header: header.into(),
            filter: FilterKind::None,
            filter_config: FilterConfig::default(),
            min_width: None,
            max_width: None,
            sortable: true,
        }
    }

    pub fn with_filter(mut self, kind: FilterKind, config: FilterConfig) -> Self {
        self.filter = kind;
        self.filter_config = config;
        self
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.filter_config.mode()
    }
}

/// Badge slug for a status value: lowercase with whitespace runs joined by `-`.
pub fn status_class(value: &str) -> String {
    value
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

pub fn parse_day(raw: &str) -> anyhow::Result<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|error| anyhow::anyhow!("invalid date {raw:?}; expected YYYY-MM-DD ({error})"))
}

pub fn format_day(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

pub fn parse_clock(raw: &str) -> anyhow::Result<Time> {
    Time::parse(raw.trim(), format_description!("[hour]:[minute]"))
        .map_err(|error| anyhow::anyhow!("invalid time {raw:?}; expected HH:MM ({error})"))
}

#[cfg(test)]
mod tests {
    use super::{
        CellValue, ColumnDescriptor, FilterConfig, FilterKind, FilterMode, Row, SelectionMode,
        format_day, parse_clock, parse_day, status_class,
    };
    use anyhow::Result;
    use time::macros::{date, datetime, time};

    #[test]
    fn row_set_replaces_existing_field_in_place() {
        let mut row = Row::new().with("chatId", "C-1").with("status", "Open");
        row.set("chatId", "C-2");

        let fields: Vec<_> = row.fields().map(|(name, _)| name).collect();
        assert_eq!(fields, vec!["chatId", "status"]);
        assert_eq!(row.get("chatId"), Some(&CellValue::from("C-2")));
        assert!(!row.is_skeleton());
    }

    #[test]
    fn skeleton_row_has_one_empty_cell_per_column() {
        let columns = vec![
            ColumnDescriptor::new("chatId", "Chat ID"),
            ColumnDescriptor::new("status", "Status"),
        ];
        let row = Row::skeleton(&columns);
        assert!(row.is_skeleton());
        assert_eq!(row.get("status"), Some(&CellValue::Empty));
        assert_eq!(row.fields().count(), 2);
    }

    #[test]
    fn text_cells_parse_as_datetimes() {
        let stamped = CellValue::from("2026-01-15T07:03:12.175Z");
        let parsed = stamped.as_datetime().expect("rfc3339 cell");
        assert_eq!(parsed.date(), date!(2026 - 01 - 15));
        assert_eq!(parsed.hour(), 7);

        let bare = CellValue::from("2026-01-15");
        assert_eq!(
            bare.as_datetime().map(|value| value.time()),
            Some(time!(00:00))
        );

        assert!(CellValue::from("not a date").as_datetime().is_none());
        assert!(CellValue::Number(3.0).as_datetime().is_none());
    }

    #[test]
    fn display_formats_whole_numbers_without_fraction() {
        assert_eq!(CellValue::from(42_i64).display(), "42");
        assert_eq!(CellValue::Number(2.5).display(), "2.5");
        assert_eq!(
            CellValue::from(datetime!(2026-01-15 07:03 UTC)).display(),
            "2026-01-15T07:03:00Z"
        );
    }

    #[test]
    fn filter_config_defaults() {
        let config = FilterConfig::default();
        assert_eq!(config.mode(), FilterMode::Client);
        assert_eq!(config.selection(), SelectionMode::Multiple);
        assert_eq!(config.placeholder(), "Filter...");
    }

    #[test]
    fn filter_kind_round_trips_through_labels() {
        for kind in [
            FilterKind::None,
            FilterKind::Text,
            FilterKind::Select,
            FilterKind::Date,
            FilterKind::DateRange,
        ] {
            assert_eq!(FilterKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(FilterKind::parse("number"), None);
    }

    #[test]
    fn status_class_slugifies() {
        assert_eq!(status_class("Resolved by Bot"), "resolved-by-bot");
        assert_eq!(status_class("  In   Progress "), "in-progress");
    }

    #[test]
    fn day_and_clock_parsing() -> Result<()> {
        assert_eq!(parse_day("2025-09-10")?, date!(2025 - 09 - 10));
        assert_eq!(format_day(date!(2025 - 09 - 10)), "2025-09-10");
        assert_eq!(parse_clock("08:30")?, time!(08:30));
        assert!(parse_day("09/10/2025").is_err());
        assert!(parse_clock("25:00").is_err());
        Ok(())
    }
}
