// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use gridline_app::{
    ColumnDescriptor, ColumnFilter, FilterConfig, FilterEvent, FilterKind, FilterSet,
    GridCoordinator, GridHost, GridOptions, PageCommand, PageEvent, PagingMode, Row, parse_day,
};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::thread;
use std::time::Instant;

/// One retrieval request. `limit` is `None` when the grid pages locally and
/// wants every matching row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub filters: FilterSet,
    pub offset: usize,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub rows: Vec<Row>,
    pub total: usize,
}

pub trait DataSource {
    fn fetch(&mut self, query: &Query) -> Result<Page>;
}

/// Rows held in memory, filtered with the same semantics the grid uses for
/// client-side filters. Filters arrive keyed by external field names.
#[derive(Debug, Clone)]
pub struct MemorySource {
    rows: Vec<Row>,
    internal_fields: BTreeMap<String, String>,
    failures_left: usize,
}

impl MemorySource {
    pub fn new(rows: Vec<Row>, field_map: &BTreeMap<String, String>) -> Self {
        Self {
            rows,
            internal_fields: field_map
                .iter()
                .map(|(internal, external)| (external.clone(), internal.clone()))
                .collect(),
            failures_left: 0,
        }
    }

    /// Makes the next `count` fetches fail.
    pub fn fail_next(mut self, count: usize) -> Self {
        self.failures_left = count;
        self
    }

    fn matchers(&self, filters: &FilterSet) -> Result<Vec<(String, ColumnFilter)>> {
        filters
            .iter()
            .map(|(external, model)| {
                let field = self
                    .internal_fields
                    .get(external)
                    .unwrap_or(external)
                    .clone();
                let mut matcher = ColumnFilter::for_kind(model.kind(), &FilterConfig::default())
                    .ok_or_else(|| anyhow!("no matcher for {external}"))?;
                matcher.set_model(Some(model))?;
                Ok((field, matcher))
            })
            .collect()
    }
}

impl DataSource for MemorySource {
    fn fetch(&mut self, query: &Query) -> Result<Page> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            bail!("data source unavailable");
        }
        let matchers = self.matchers(&query.filters)?;
        let matching: Vec<&Row> = self
            .rows
            .iter()
            .filter(|row| {
                matchers
                    .iter()
                    .all(|(field, matcher)| matcher.evaluate(row.get(field)))
            })
            .collect();
        let total = matching.len();
        let rows = matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(Page { rows, total })
    }
}

/// Host that turns coordinator callbacks into a pending `Query` for the
/// session to service.
#[derive(Debug, Clone)]
pub struct MemoryHost {
    paging: PagingMode,
    filters: FilterSet,
    offset: usize,
    limit: usize,
    pending: bool,
}

impl MemoryHost {
    pub fn new(options: &GridOptions) -> Self {
        Self {
            paging: options.paging,
            filters: FilterSet::new(),
            offset: 0,
            limit: options.page_size,
            pending: true,
        }
    }

    pub fn take_request(&mut self) -> Option<Query> {
        if !std::mem::take(&mut self.pending) {
            return None;
        }
        Some(self.current_query())
    }

    pub fn requery(&mut self) {
        self.pending = true;
    }

    fn current_query(&self) -> Query {
        let (offset, limit) = match self.paging {
            PagingMode::Client => (0, None),
            PagingMode::Server => (self.offset, Some(self.limit)),
        };
        Query {
            filters: self.filters.clone(),
            offset,
            limit,
        }
    }
}

impl GridHost for MemoryHost {
    fn filters_changed(&mut self, filters: &FilterSet) {
        tracing::info!(filters = filters.len(), "server filters changed");
        self.filters = filters.clone();
        self.offset = 0;
        self.pending = true;
    }

    fn page_requested(&mut self, offset: usize, limit: usize) {
        tracing::debug!(offset, limit, "page requested");
        self.offset = offset;
        self.limit = limit;
        self.pending = true;
    }

    fn loading_changed(&mut self, loading: bool) {
        tracing::debug!(loading, "loading state changed");
    }
}

/// Drives a coordinator against a data source: fires due timers and answers
/// host requests until nothing is outstanding.
pub struct Session<S> {
    grid: GridCoordinator<MemoryHost>,
    source: S,
    retry_requested: Rc<Cell<bool>>,
}

impl<S: DataSource> Session<S> {
    pub fn new(columns: Vec<ColumnDescriptor>, options: GridOptions, source: S) -> Self {
        let host = MemoryHost::new(&options);
        Self {
            grid: GridCoordinator::new(columns, options, host),
            source,
            retry_requested: Rc::new(Cell::new(false)),
        }
    }

    pub const fn grid(&self) -> &GridCoordinator<MemoryHost> {
        &self.grid
    }

    /// Fires timers due at `now` and services at most one pending fetch.
    pub fn poll_at(&mut self, now: Instant) {
        self.grid.poll(now);
        self.service(now);
    }

    fn service(&mut self, now: Instant) {
        let Some(query) = self.grid.host_mut().take_request() else {
            return;
        };
        self.grid.set_loading(true, now);
        match self.source.fetch(&query) {
            Ok(page) => {
                tracing::debug!(rows = page.rows.len(), total = page.total, "fetched page");
                self.grid.set_total_records(page.total);
                self.grid.set_loading(false, now);
                self.grid.update_data(page.rows, None);
            }
            Err(error) => {
                let flag = Rc::clone(&self.retry_requested);
                self.grid
                    .set_error(format!("{error:#}"), Some(Box::new(move || flag.set(true))));
            }
        }
    }

    /// Runs on the wall clock until no timer is armed and no fetch is
    /// outstanding.
    pub fn settle(&mut self) {
        self.service(Instant::now());
        while let Some(deadline) = self.grid.next_deadline() {
            thread::sleep(deadline.saturating_duration_since(Instant::now()));
            self.poll_at(Instant::now());
        }
    }

    /// Re-issues the last query after an error. Returns false when the grid
    /// was not in an error state.
    pub fn retry(&mut self) -> bool {
        if !self.grid.retry() {
            return false;
        }
        if self.retry_requested.replace(false) {
            self.grid.host_mut().requery();
        }
        true
    }

    pub fn page(&mut self, command: PageCommand) -> PageEvent {
        self.grid.page(command)
    }

    /// Edits and commits one column filter from its command-line form:
    /// plain text, `a|b` options, `YYYY-MM-DD`, or `START..END`.
    pub fn apply_filter(&mut self, field: &str, value: &str, now: Instant) -> Result<FilterEvent> {
        let column = self
            .grid
            .columns()
            .iter()
            .find(|column| column.field == field)
            .ok_or_else(|| anyhow!("unknown column {field:?}"))?;
        let kind = column.filter;
        let filter = self
            .grid
            .filter_mut(field)
            .ok_or_else(|| anyhow!("column {field:?} is not filterable"))?;

        match kind {
            FilterKind::Text => {
                let text = filter
                    .as_text_mut()
                    .ok_or_else(|| anyhow!("column {field:?} has no text filter"))?;
                text.set_text(value);
            }
            FilterKind::Select => {
                let select = filter
                    .as_select_mut()
                    .ok_or_else(|| anyhow!("column {field:?} has no select filter"))?;
                for option in value.split('|').map(str::trim).filter(|option| !option.is_empty()) {
                    select.toggle(option);
                }
            }
            FilterKind::Date | FilterKind::DateRange => {
                let date = filter
                    .as_date_mut()
                    .ok_or_else(|| anyhow!("column {field:?} has no date filter"))?;
                date.begin_edit();
                let days = match value.split_once("..") {
                    Some((start, end)) if date.is_range() => vec![parse_day(start)?, parse_day(end)?],
                    None if !date.is_range() => vec![parse_day(value)?],
                    _ if date.is_range() => bail!("column {field:?} expects START..END, got {value:?}"),
                    _ => bail!("column {field:?} expects a single YYYY-MM-DD day, got {value:?}"),
                };
                for day in days {
                    if !date.pick_day(day) {
                        bail!("day {day} is outside the allowed range for {field:?}");
                    }
                }
            }
            FilterKind::None => bail!("column {field:?} is not filterable"),
        }
        Ok(self.grid.commit_filter(field, now))
    }
}
