// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use time::{Date, PrimitiveDateTime, Time};

use crate::model::{BadgeColor, CellValue, FilterConfig, FilterKind, FilterMode, SelectionMode};

/// Sentinel member of a multiple-selection filter meaning "no constraint".
pub const ALL_OPTION: &str = "All";

time::serde::format_description!(day_format, Date, "[year]-[month]-[day]");
time::serde::format_description!(clock_format, Time, "[hour]:[minute]");

/// Aggregate filter state keyed by column field. Absent key = no filter.
pub type FilterSet = BTreeMap<String, FilterModel>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "filterType",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum FilterModel {
    Text {
        #[serde(alias = "text")]
        filter: String,
    },
    Select {
        options: BTreeSet<String>,
    },
    Date {
        #[serde(with = "day_format")]
        date: Date,
        #[serde(default, with = "clock_format::option", skip_serializing_if = "Option::is_none")]
        time_from: Option<Time>,
        #[serde(default, with = "clock_format::option", skip_serializing_if = "Option::is_none")]
        time_to: Option<Time>,
    },
    DateRange {
        #[serde(with = "day_format")]
        start_date: Date,
        #[serde(with = "day_format")]
        end_date: Date,
        #[serde(default, with = "clock_format::option", skip_serializing_if = "Option::is_none")]
        time_from: Option<Time>,
        #[serde(default, with = "clock_format::option", skip_serializing_if = "Option::is_none")]
        time_to: Option<Time>,
    },
}

impl FilterModel {
    pub const fn kind(&self) -> FilterKind {
        match self {
            Self::Text { .. } => FilterKind::Text,
            Self::Select { .. } => FilterKind::Select,
            Self::Date { .. } => FilterKind::Date,
            Self::DateRange { .. } => FilterKind::DateRange,
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(raw)
            .map_err(|error| anyhow::anyhow!("decode filter model: {error}"))?;
        Ok(model)
    }

    pub fn to_json(&self) -> Result<String> {
        let raw = serde_json::to_string(self)
            .map_err(|error| anyhow::anyhow!("encode filter model: {error}"))?;
        Ok(raw)
    }
}

/// Signal returned by filter transitions. `Changed` means the host grid must
/// re-evaluate and collect models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterEvent {
    Changed,
    Unchanged,
}

/// Pending (being edited) and applied (in effect) copies of a filter value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Staged<T> {
    pending: T,
    applied: T,
}

impl<T: Clone + Default> Staged<T> {
    pub fn new(value: T) -> Self {
        Self {
            pending: value.clone(),
            applied: value,
        }
    }

    pub const fn pending(&self) -> &T {
        &self.pending
    }

    pub fn pending_mut(&mut self) -> &mut T {
        &mut self.pending
    }

    pub const fn applied(&self) -> &T {
        &self.applied
    }

    pub fn commit(&mut self) {
        self.applied = self.pending.clone();
    }

    pub fn cancel(&mut self) {
        self.pending = self.applied.clone();
    }

    pub fn replace(&mut self, value: T) {
        self.pending = value.clone();
        self.applied = value;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFilter {
    placeholder: String,
    mode: FilterMode,
    text: Staged<String>,
}

impl TextFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            placeholder: config.placeholder().to_owned(),
            mode: config.mode(),
            text: Staged::default(),
        }
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        *self.text.pending_mut() = text.into();
    }

    pub fn pending_text(&self) -> &str {
        self.text.pending()
    }

    pub fn is_active(&self) -> bool {
        !self.text.applied().is_empty()
    }

    pub fn evaluate(&self, cell: Option<&CellValue>) -> bool {
        if self.mode == FilterMode::Server || !self.is_active() {
            return true;
        }
        let Some(cell) = cell.filter(|cell| !cell.is_empty()) else {
            return false;
        };
        cell.display()
            .to_lowercase()
            .contains(&self.text.applied().to_lowercase())
    }

    pub fn model(&self) -> Option<FilterModel> {
        self.is_active().then(|| FilterModel::Text {
            filter: self.text.applied().clone(),
        })
    }

    fn set_model(&mut self, model: Option<&FilterModel>) -> Result<()> {
        match model {
            None => self.text.replace(String::new()),
            Some(FilterModel::Text { filter }) => self.text.replace(filter.clone()),
            Some(other) => bail!(
                "text filter cannot apply a {} model",
                other.kind().as_str()
            ),
        }
        Ok(())
    }

    fn commit(&mut self) -> FilterEvent {
        let was_active = self.is_active();
        self.text.commit();
        change_signal(was_active, self.is_active())
    }

    fn cancel(&mut self) {
        self.text.cancel();
    }

    fn clear(&mut self) {
        self.text.replace(String::new());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectFilter {
    options: Vec<String>,
    badge_colors: BTreeMap<String, BadgeColor>,
    mode: FilterMode,
    selection_mode: SelectionMode,
    selected: Staged<BTreeSet<String>>,
}

impl SelectFilter {
    pub fn new(config: &FilterConfig) -> Self {
        let selection_mode = config.selection();
        Self {
            options: config.options.clone(),
            badge_colors: config
                .badge_colors
                .iter()
                .map(|(key, color)| (key.to_lowercase(), color.clone()))
                .collect(),
            mode: config.mode(),
            selection_mode,
            selected: Staged::new(Self::empty_selection(selection_mode)),
        }
    }

    fn empty_selection(selection_mode: SelectionMode) -> BTreeSet<String> {
        match selection_mode {
            SelectionMode::Single => BTreeSet::new(),
            SelectionMode::Multiple => BTreeSet::from([ALL_OPTION.to_owned()]),
        }
    }

    /// Options as presented to the user; multiple mode leads with `All`.
    pub fn display_options(&self) -> Vec<&str> {
        let mut options = Vec::with_capacity(self.options.len() + 1);
        if self.selection_mode == SelectionMode::Multiple {
            options.push(ALL_OPTION);
        }
        options.extend(self.options.iter().map(String::as_str));
        options
    }

    pub fn badge(&self, option: &str) -> Option<&BadgeColor> {
        self.badge_colors.get(&option.to_lowercase())
    }

    pub const fn selection_mode(&self) -> SelectionMode {
        self.selection_mode
    }

    pub fn is_selected(&self, option: &str) -> bool {
        self.selected.pending().contains(option)
    }

    pub fn pending_selection(&self) -> &BTreeSet<String> {
        self.selected.pending()
    }

    fn knows(&self, option: &str) -> bool {
        self.options.is_empty() || self.options.iter().any(|known| known == option)
    }

    pub fn toggle(&mut self, option: &str) {
        let is_all = self.selection_mode == SelectionMode::Multiple && option == ALL_OPTION;
        if !is_all && !self.knows(option) {
            tracing::debug!(option, "ignoring unknown select option");
            return;
        }

        let selection_mode = self.selection_mode;
        let selected = self.selected.pending_mut();
        match selection_mode {
            SelectionMode::Single => {
                let was_selected = selected.contains(option);
                selected.clear();
                if !was_selected {
                    selected.insert(option.to_owned());
                }
            }
            SelectionMode::Multiple if is_all => {
                selected.clear();
                selected.insert(ALL_OPTION.to_owned());
            }
            SelectionMode::Multiple => {
                selected.remove(ALL_OPTION);
                if !selected.remove(option) {
                    selected.insert(option.to_owned());
                }
                if selected.is_empty() {
                    selected.insert(ALL_OPTION.to_owned());
                }
            }
        }
    }

    pub fn is_active(&self) -> bool {
        let applied = self.selected.applied();
        !applied.is_empty() && !applied.contains(ALL_OPTION)
    }

    pub fn evaluate(&self, cell: Option<&CellValue>) -> bool {
        if self.mode == FilterMode::Server || !self.is_active() {
            return true;
        }
        cell.is_some_and(|cell| self.selected.applied().contains(&cell.display()))
    }

    pub fn model(&self) -> Option<FilterModel> {
        self.is_active().then(|| FilterModel::Select {
            options: self.selected.applied().clone(),
        })
    }

    fn set_model(&mut self, model: Option<&FilterModel>) -> Result<()> {
        let selection = match model {
            None => Self::empty_selection(self.selection_mode),
            Some(FilterModel::Select { options }) => {
                let real: BTreeSet<String> = options
                    .iter()
                    .filter(|option| option.as_str() != ALL_OPTION)
                    .cloned()
                    .collect();
                if self.selection_mode == SelectionMode::Single && real.len() > 1 {
                    bail!(
                        "single-selection filter cannot apply {} options",
                        real.len()
                    );
                }
                if real.is_empty() || options.contains(ALL_OPTION) {
                    Self::empty_selection(self.selection_mode)
                } else {
                    real
                }
            }
            Some(other) => bail!(
                "select filter cannot apply a {} model",
                other.kind().as_str()
            ),
        };
        self.selected.replace(selection);
        Ok(())
    }

    fn commit(&mut self) -> FilterEvent {
        let was_active = self.is_active();
        self.selected.commit();
        change_signal(was_active, self.is_active())
    }

    fn cancel(&mut self) {
        self.selected.cancel();
    }

    fn clear(&mut self) {
        self.selected
            .replace(Self::empty_selection(self.selection_mode));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeStep {
    #[default]
    Start,
    End,
}

/// Selected day (or range) plus optional time-of-day window. Single-date
/// filters only use `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateSelection {
    pub start: Option<Date>,
    pub end: Option<Date>,
    pub time_from: Option<Time>,
    pub time_to: Option<Time>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFilter {
    range: bool,
    mode: FilterMode,
    min_date: Option<Date>,
    max_date: Option<Date>,
    selection: Staged<DateSelection>,
    step: RangeStep,
}

impl DateFilter {
    pub fn new(config: &FilterConfig, range: bool) -> Self {
        Self {
            range,
            mode: config.mode(),
            min_date: config.min_date,
            max_date: config.max_date,
            selection: Staged::default(),
            step: RangeStep::Start,
        }
    }

    pub const fn is_range(&self) -> bool {
        self.range
    }

    pub const fn step(&self) -> RangeStep {
        self.step
    }

    pub const fn pending(&self) -> &DateSelection {
        self.selection.pending()
    }

    pub const fn applied(&self) -> &DateSelection {
        self.selection.applied()
    }

    pub fn is_day_disabled(&self, day: Date) -> bool {
        self.min_date.is_some_and(|min| day < min) || self.max_date.is_some_and(|max| day > max)
    }

    /// Syncs the pending selection with what is applied; called whenever the
    /// filter surface is opened.
    pub fn begin_edit(&mut self) {
        self.selection.cancel();
        let pending = self.selection.pending();
        self.step = if self.range && pending.start.is_some() && pending.end.is_none() {
            RangeStep::End
        } else {
            RangeStep::Start
        };
    }

    /// Records a day pick. Returns false when the day is outside the
    /// configured bounds.
    pub fn pick_day(&mut self, day: Date) -> bool {
        if self.is_day_disabled(day) {
            return false;
        }
        let range = self.range;
        let step = self.step;
        let pending = self.selection.pending_mut();
        if !range {
            pending.start = Some(day);
            return true;
        }
        match (step, pending.start) {
            (RangeStep::End, Some(start)) => {
                if day < start {
                    pending.start = Some(day);
                    pending.end = Some(start);
                } else {
                    pending.end = Some(day);
                }
                self.step = RangeStep::Start;
            }
            _ => {
                pending.start = Some(day);
                pending.end = None;
                self.step = RangeStep::End;
            }
        }
        true
    }

    pub fn set_time_window(&mut self, from: Option<Time>, to: Option<Time>) {
        let pending = self.selection.pending_mut();
        pending.time_from = from;
        pending.time_to = to;
    }

    pub fn is_active(&self) -> bool {
        selection_is_complete(self.range, self.selection.applied())
    }

    pub fn evaluate(&self, cell: Option<&CellValue>) -> bool {
        if self.mode == FilterMode::Server || !self.is_active() {
            return true;
        }
        let Some(stamp) = cell.and_then(CellValue::as_datetime) else {
            return false;
        };
        let applied = self.selection.applied();
        let day = stamp.date();
        let in_days = match (applied.start, applied.end) {
            (Some(start), Some(end)) if self.range => start <= day && day <= end,
            (Some(date), _) if !self.range => day == date,
            _ => false,
        };
        in_days && within_time_window(stamp, applied.time_from, applied.time_to)
    }

    pub fn model(&self) -> Option<FilterModel> {
        let applied = *self.selection.applied();
        match (applied.start, applied.end) {
            (Some(start_date), Some(end_date)) if self.range => Some(FilterModel::DateRange {
                start_date,
                end_date,
                time_from: applied.time_from,
                time_to: applied.time_to,
            }),
            (Some(date), _) if !self.range => Some(FilterModel::Date {
                date,
                time_from: applied.time_from,
                time_to: applied.time_to,
            }),
            _ => None,
        }
    }

    fn set_model(&mut self, model: Option<&FilterModel>) -> Result<()> {
        let selection = match model {
            None => DateSelection::default(),
            Some(FilterModel::Date {
                date,
                time_from,
                time_to,
            }) if !self.range => DateSelection {
                start: Some(*date),
                end: None,
                time_from: *time_from,
                time_to: *time_to,
            },
            Some(FilterModel::DateRange {
                start_date,
                end_date,
                time_from,
                time_to,
            }) if self.range => DateSelection {
                start: Some(*start_date.min(end_date)),
                end: Some(*start_date.max(end_date)),
                time_from: *time_from,
                time_to: *time_to,
            },
            Some(other) => bail!(
                "{} filter cannot apply a {} model",
                if self.range { "date-range" } else { "date" },
                other.kind().as_str()
            ),
        };
        self.selection.replace(selection);
        self.step = RangeStep::Start;
        Ok(())
    }

    /// Re-validates the applied selection against new bounds, clearing it
    /// when any selected day falls outside them.
    pub fn refresh_bounds(&mut self, min_date: Option<Date>, max_date: Option<Date>) -> FilterEvent {
        self.min_date = min_date;
        self.max_date = max_date;
        let applied = *self.selection.applied();
        let out_of_range = [applied.start, applied.end]
            .into_iter()
            .flatten()
            .any(|day| self.is_day_disabled(day));
        if out_of_range {
            self.clear();
            FilterEvent::Changed
        } else {
            FilterEvent::Unchanged
        }
    }

    fn commit(&mut self) -> FilterEvent {
        let was_active = self.is_active();
        if !selection_is_complete(self.range, self.selection.pending()) {
            let pending = self.selection.pending_mut();
            pending.start = None;
            pending.end = None;
        }
        self.selection.commit();
        self.step = RangeStep::Start;
        change_signal(was_active, self.is_active())
    }

    fn cancel(&mut self) {
        self.selection.cancel();
        self.step = RangeStep::Start;
    }

    fn clear(&mut self) {
        self.selection.replace(DateSelection::default());
        self.step = RangeStep::Start;
    }
}

fn selection_is_complete(range: bool, selection: &DateSelection) -> bool {
    if range {
        selection.start.is_some() && selection.end.is_some()
    } else {
        selection.start.is_some()
    }
}

fn within_time_window(stamp: PrimitiveDateTime, from: Option<Time>, to: Option<Time>) -> bool {
    let minutes = |time: Time| u16::from(time.hour()) * 60 + u16::from(time.minute());
    let cell = minutes(stamp.time());
    from.is_none_or(|from| cell >= minutes(from)) && to.is_none_or(|to| cell <= minutes(to))
}

fn change_signal(was_active: bool, is_active: bool) -> FilterEvent {
    if was_active || is_active {
        FilterEvent::Changed
    } else {
        FilterEvent::Unchanged
    }
}

/// A column's filter component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnFilter {
    Text(TextFilter),
    Select(SelectFilter),
    Date(DateFilter),
}

impl ColumnFilter {
    /// Builds the filter for a column kind; `None` for unfiltered columns.
    pub fn for_kind(kind: FilterKind, config: &FilterConfig) -> Option<Self> {
        match kind {
            FilterKind::None => None,
            FilterKind::Text => Some(Self::Text(TextFilter::new(config))),
            FilterKind::Select => Some(Self::Select(SelectFilter::new(config))),
            FilterKind::Date => Some(Self::Date(DateFilter::new(config, false))),
            FilterKind::DateRange => Some(Self::Date(DateFilter::new(config, true))),
        }
    }

    pub const fn mode(&self) -> FilterMode {
        match self {
            Self::Text(filter) => filter.mode,
            Self::Select(filter) => filter.mode,
            Self::Date(filter) => filter.mode,
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Self::Text(filter) => filter.is_active(),
            Self::Select(filter) => filter.is_active(),
            Self::Date(filter) => filter.is_active(),
        }
    }

    pub fn evaluate(&self, cell: Option<&CellValue>) -> bool {
        match self {
            Self::Text(filter) => filter.evaluate(cell),
            Self::Select(filter) => filter.evaluate(cell),
            Self::Date(filter) => filter.evaluate(cell),
        }
    }

    pub fn model(&self) -> Option<FilterModel> {
        match self {
            Self::Text(filter) => filter.model(),
            Self::Select(filter) => filter.model(),
            Self::Date(filter) => filter.model(),
        }
    }

    /// Replaces both pending and applied state. `None` clears the filter.
    pub fn set_model(&mut self, model: Option<&FilterModel>) -> Result<()> {
        match self {
            Self::Text(filter) => filter.set_model(model),
            Self::Select(filter) => filter.set_model(model),
            Self::Date(filter) => filter.set_model(model),
        }
    }

    pub fn commit(&mut self) -> FilterEvent {
        match self {
            Self::Text(filter) => filter.commit(),
            Self::Select(filter) => filter.commit(),
            Self::Date(filter) => filter.commit(),
        }
    }

    pub fn cancel(&mut self) -> FilterEvent {
        match self {
            Self::Text(filter) => filter.cancel(),
            Self::Select(filter) => filter.cancel(),
            Self::Date(filter) => filter.cancel(),
        }
        FilterEvent::Changed
    }

    pub fn clear(&mut self) -> FilterEvent {
        match self {
            Self::Text(filter) => filter.clear(),
            Self::Select(filter) => filter.clear(),
            Self::Date(filter) => filter.clear(),
        }
        FilterEvent::Changed
    }

    pub fn as_text_mut(&mut self) -> Option<&mut TextFilter> {
        match self {
            Self::Text(filter) => Some(filter),
            _ => None,
        }
    }

    pub fn as_select_mut(&mut self) -> Option<&mut SelectFilter> {
        match self {
            Self::Select(filter) => Some(filter),
            _ => None,
        }
    }

    pub fn as_date_mut(&mut self) -> Option<&mut DateFilter> {
        match self {
            Self::Date(filter) => Some(filter),
            _ => None,
        }
    }
}
