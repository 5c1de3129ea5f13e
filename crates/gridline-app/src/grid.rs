// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use crate::filter::{ColumnFilter, FilterEvent, FilterSet};
use crate::model::{ColumnDescriptor, FilterMode, Row, SKELETON_ROW_COUNT};
use crate::pagination::{DEFAULT_PAGE_SIZE, PageCommand, PageEvent, Pagination, PagingMode};
use crate::timer::{DEFAULT_DEBOUNCE, DEFAULT_LOADING_TIMEOUT, Debouncer};

/// Collaborator that owns data retrieval. The coordinator never fetches; it
/// tells the host what changed and the host answers with `update_data`.
pub trait GridHost {
    /// Server-mode filters after debounce, keyed by external field name.
    fn filters_changed(&mut self, filters: &FilterSet);
    fn page_requested(&mut self, offset: usize, limit: usize);
    fn loading_changed(&mut self, _loading: bool) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridOptions {
    pub paging: PagingMode,
    pub page_size: usize,
    pub debounce: Duration,
    pub loading_timeout: Duration,
    /// Internal column field -> field name the host expects.
    pub field_map: BTreeMap<String, String>,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            paging: PagingMode::Client,
            page_size: DEFAULT_PAGE_SIZE,
            debounce: DEFAULT_DEBOUNCE,
            loading_timeout: DEFAULT_LOADING_TIMEOUT,
            field_map: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    Rows,
    Loading,
    Empty,
    Error(String),
}

pub type RetryFn = Box<dyn FnOnce()>;

struct ErrorState {
    message: String,
    retry: Option<RetryFn>,
}

impl fmt::Debug for ErrorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorState")
            .field("message", &self.message)
            .field("retry", &self.retry.is_some())
            .finish()
    }
}

/// Renames filter keys through `field_map`; unmapped fields pass through.
pub fn map_fields(filters: &FilterSet, field_map: &BTreeMap<String, String>) -> FilterSet {
    filters
        .iter()
        .map(|(field, model)| {
            let external = field_map.get(field).unwrap_or(field);
            (external.clone(), model.clone())
        })
        .collect()
}

pub struct GridCoordinator<H> {
    host: H,
    options: GridOptions,
    columns: Vec<ColumnDescriptor>,
    filters: BTreeMap<String, ColumnFilter>,
    rows: Vec<Row>,
    matching: Vec<usize>,
    pagination: Pagination,
    aggregate: FilterSet,
    debounce: Debouncer<FilterSet>,
    last_dispatched: FilterSet,
    loading: bool,
    watchdog: Debouncer<()>,
    error: Option<ErrorState>,
}

impl<H: GridHost> GridCoordinator<H> {
    pub fn new(columns: Vec<ColumnDescriptor>, options: GridOptions, host: H) -> Self {
        let mut grid = Self {
            host,
            pagination: Pagination::new(options.paging, options.page_size),
            debounce: Debouncer::new(options.debounce),
            watchdog: Debouncer::new(options.loading_timeout),
            options,
            columns: Vec::new(),
            filters: BTreeMap::new(),
            rows: Vec::new(),
            matching: Vec::new(),
            aggregate: FilterSet::new(),
            last_dispatched: FilterSet::new(),
            loading: false,
            error: None,
        };
        grid.set_columns(columns);
        grid
    }

    /// Replaces the column configuration wholesale. Every filter starts over
    /// empty.
    pub fn set_columns(&mut self, columns: Vec<ColumnDescriptor>) {
        self.filters = columns
            .iter()
            .filter_map(|column| {
                ColumnFilter::for_kind(column.filter, &column.filter_config)
                    .map(|filter| (column.field.clone(), filter))
            })
            .collect();
        self.columns = columns;
        self.aggregate.clear();
        self.debounce.cancel();
        if !self.last_dispatched.is_empty() {
            tracing::debug!("columns replaced; releasing server filters");
            self.last_dispatched.clear();
            self.pagination.reset();
            self.host.filters_changed(&FilterSet::new());
        }
        if self.loading {
            self.rows = self.skeleton_rows();
        }
        self.refilter();
    }

    pub const fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub const fn options(&self) -> &GridOptions {
        &self.options
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub const fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub const fn aggregate(&self) -> &FilterSet {
        &self.aggregate
    }

    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|error| error.message.as_str())
    }

    pub fn filter(&self, field: &str) -> Option<&ColumnFilter> {
        self.filters.get(field)
    }

    /// Access for editing a column's pending filter state. Edits take effect
    /// through `commit_filter`.
    pub fn filter_mut(&mut self, field: &str) -> Option<&mut ColumnFilter> {
        self.filters.get_mut(field)
    }

    pub fn commit_filter(&mut self, field: &str, now: Instant) -> FilterEvent {
        self.transition_filter(field, now, ColumnFilter::commit)
    }

    pub fn cancel_filter(&mut self, field: &str, now: Instant) -> FilterEvent {
        self.transition_filter(field, now, ColumnFilter::cancel)
    }

    pub fn clear_filter(&mut self, field: &str, now: Instant) -> FilterEvent {
        self.transition_filter(field, now, ColumnFilter::clear)
    }

    fn transition_filter(
        &mut self,
        field: &str,
        now: Instant,
        transition: fn(&mut ColumnFilter) -> FilterEvent,
    ) -> FilterEvent {
        let Some(filter) = self.filters.get_mut(field) else {
            tracing::warn!(field, "no filter configured for column");
            return FilterEvent::Unchanged;
        };
        let event = transition(filter);
        if event == FilterEvent::Changed {
            let models = self.collect_models();
            self.on_filter_event(models, now);
        }
        event
    }

    fn collect_models(&self) -> FilterSet {
        self.filters
            .iter()
            .filter_map(|(field, filter)| filter.model().map(|model| (field.clone(), model)))
            .collect()
    }

    /// Records the grid's latest per-column filter models. Client-mode
    /// filters narrow the visible rows immediately; the whole aggregate is
    /// buffered for the debounced server dispatch. Server paging keeps its
    /// page until the host is asked to refetch.
    pub fn on_filter_event(&mut self, raw: FilterSet, now: Instant) {
        for field in raw.keys().filter(|field| !self.filters.contains_key(*field)) {
            tracing::warn!(field = field.as_str(), "dropping filter model for unknown column");
        }
        for (field, filter) in &mut self.filters {
            let incoming = raw.get(field);
            if filter.model().as_ref() == incoming {
                continue;
            }
            if let Err(error) = filter.set_model(incoming) {
                tracing::warn!(field = field.as_str(), %error, "rejected filter model");
            }
        }

        self.aggregate = self.collect_models();
        if self.pagination.mode() == PagingMode::Client {
            self.pagination.reset();
        }
        self.refilter();
        self.debounce.push(self.aggregate.clone(), now);
        tracing::debug!(
            active = self.aggregate.len(),
            token = self.debounce.token(),
            "filter change buffered"
        );
    }

    /// Fires whatever timers are due at `now`: the debounced filter dispatch
    /// and the loading watchdog.
    pub fn poll(&mut self, now: Instant) {
        if let Some(aggregate) = self.debounce.poll(now) {
            self.flush_filters(&aggregate);
        }
        if self.watchdog.poll(now).is_some() {
            tracing::warn!(
                timeout_ms = self.options.loading_timeout.as_millis() as u64,
                "loading watchdog expired; clearing loading state"
            );
            self.set_loading(false, now);
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.debounce.deadline(), self.watchdog.deadline()) {
            (Some(left), Some(right)) => Some(left.min(right)),
            (left, right) => left.or(right),
        }
    }

    fn server_filters(&self, aggregate: &FilterSet) -> FilterSet {
        aggregate
            .iter()
            .filter(|(field, _)| {
                self.filters
                    .get(*field)
                    .is_some_and(|filter| filter.mode() == FilterMode::Server)
            })
            .map(|(field, model)| (field.clone(), model.clone()))
            .collect()
    }

    fn flush_filters(&mut self, aggregate: &FilterSet) {
        let server = self.server_filters(aggregate);
        if server == self.last_dispatched {
            tracing::debug!("server filters unchanged; nothing to dispatch");
            return;
        }
        let mapped = map_fields(&server, &self.options.field_map);
        tracing::debug!(filters = mapped.len(), "dispatching server filters");
        self.last_dispatched = server;
        self.pagination.reset();
        self.host.filters_changed(&mapped);
    }

    fn is_server_side(&self) -> bool {
        self.options.paging == PagingMode::Server
            || self
                .filters
                .values()
                .any(|filter| filter.mode() == FilterMode::Server)
    }

    /// Resets every column filter and returns to the first page. Server-side
    /// grids tell the host right away so it can reload unfiltered data.
    pub fn clear_all_filters(&mut self) {
        for filter in self.filters.values_mut() {
            let _ = filter.clear();
        }
        self.aggregate.clear();
        self.debounce.cancel();
        self.pagination.reset();
        self.refilter();
        if self.is_server_side() {
            self.last_dispatched.clear();
            self.host.filters_changed(&FilterSet::new());
        }
    }

    /// Replaces the dataset in view. A supplied page size is applied before
    /// the rows so the new rows never render under the old size.
    pub fn update_data(&mut self, rows: Vec<Row>, page_size: Option<usize>) {
        if let Some(size) = page_size {
            self.pagination.resize(size);
        }
        self.rows = rows;
        if self.error.take().is_some() {
            tracing::debug!("new data replaced the error state");
        }
        self.refilter();
    }

    /// Server paging only: the host reports how many records match upstream.
    pub fn set_total_records(&mut self, total: usize) {
        if self.pagination.mode() == PagingMode::Server {
            self.pagination.set_total_records(total);
        } else {
            tracing::debug!(total, "client paging derives its own total; ignoring");
        }
    }

    pub fn page(&mut self, command: PageCommand) -> PageEvent {
        let event = self.pagination.dispatch(command);
        if let PageEvent::FetchRequested { offset, limit } = event {
            self.host.page_requested(offset, limit);
        }
        event
    }

    pub fn set_loading(&mut self, loading: bool, now: Instant) {
        if loading {
            let was_loading = std::mem::replace(&mut self.loading, true);
            self.watchdog.push((), now);
            self.error = None;
            self.rows = self.skeleton_rows();
            self.refilter();
            if !was_loading {
                self.host.loading_changed(true);
            }
        } else if self.loading {
            self.end_loading();
        }
    }

    fn end_loading(&mut self) {
        self.watchdog.cancel();
        self.loading = false;
        self.rows.retain(|row| !row.is_skeleton());
        self.refilter();
        self.host.loading_changed(false);
    }

    pub fn set_error(&mut self, message: impl Into<String>, retry: Option<RetryFn>) {
        if self.loading {
            self.end_loading();
        }
        let message = message.into();
        tracing::warn!(message = message.as_str(), "grid entered error state");
        self.rows.clear();
        self.refilter();
        self.error = Some(ErrorState { message, retry });
    }

    /// Clears the error state and runs its retry callback. Returns false when
    /// there was no error to retry.
    pub fn retry(&mut self) -> bool {
        let Some(error) = self.error.take() else {
            return false;
        };
        if let Some(callback) = error.retry {
            callback();
        }
        true
    }

    fn skeleton_rows(&self) -> Vec<Row> {
        (0..SKELETON_ROW_COUNT)
            .map(|_| Row::skeleton(&self.columns))
            .collect()
    }

    fn row_passes(&self, row: &Row) -> bool {
        self.filters
            .iter()
            .all(|(field, filter)| filter.evaluate(row.get(field)))
    }

    fn refilter(&mut self) {
        self.matching = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| !row.is_skeleton() && self.row_passes(row))
            .map(|(index, _)| index)
            .collect();
        // Skeletons are not records; keep the page while they are shown.
        if self.pagination.mode() == PagingMode::Client && !self.loading {
            self.pagination.set_total_records(self.matching.len());
        }
    }

    /// Rows passing every client-mode filter, before paging.
    pub fn matching_rows(&self) -> impl Iterator<Item = &Row> {
        self.matching.iter().map(|index| &self.rows[*index])
    }

    /// What the grid shows right now: skeletons while loading, nothing on
    /// error, otherwise the current page of matching rows.
    pub fn visible_rows(&self) -> Vec<&Row> {
        if self.error.is_some() {
            return Vec::new();
        }
        if self.loading {
            return self.rows.iter().filter(|row| row.is_skeleton()).collect();
        }
        match self.pagination.mode() {
            PagingMode::Client => self
                .pagination
                .page_slice(&self.matching)
                .iter()
                .map(|index| &self.rows[*index])
                .collect(),
            PagingMode::Server => self.matching_rows().collect(),
        }
    }

    pub fn overlay(&self) -> Overlay {
        if let Some(error) = &self.error {
            return Overlay::Error(error.message.clone());
        }
        if self.loading {
            return Overlay::Loading;
        }
        if self.matching.is_empty() {
            Overlay::Empty
        } else {
            Overlay::Rows
        }
    }
}
