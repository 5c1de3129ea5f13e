// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const PAGE_SIZE_OPTIONS: [usize; 4] = [10, 25, 50, 100];
pub const MAX_VISIBLE_PAGES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PagingMode {
    #[default]
    Client,
    Server,
}

impl PagingMode {
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

/// Paging position. Stored as a 0-based row offset plus page size; page
/// numbers are 1-based and only derived for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    mode: PagingMode,
    offset: usize,
    page_size: usize,
    total_records: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCommand {
    Next,
    Previous,
    First,
    Last,
    GoTo(usize),
    SetPageSize(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    /// The local window moved; the caller re-slices its rows.
    Repaginated { page: usize },
    /// Server mode: the host must fetch `limit` rows starting at `offset`.
    FetchRequested { offset: usize, limit: usize },
    Ignored,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(PagingMode::Client, DEFAULT_PAGE_SIZE)
    }
}

impl Pagination {
    pub fn new(mode: PagingMode, page_size: usize) -> Self {
        Self {
            mode,
            offset: 0,
            page_size: page_size.max(1),
            total_records: 0,
        }
    }

    pub const fn mode(&self) -> PagingMode {
        self.mode
    }

    pub const fn offset(&self) -> usize {
        self.offset
    }

    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    pub const fn total_records(&self) -> usize {
        self.total_records
    }

    pub const fn current_page(&self) -> usize {
        self.offset / self.page_size + 1
    }

    pub const fn total_pages(&self) -> usize {
        let pages = self.total_records.div_ceil(self.page_size);
        if pages == 0 { 1 } else { pages }
    }

    pub const fn is_first_page(&self) -> bool {
        self.current_page() == 1
    }

    pub const fn is_last_page(&self) -> bool {
        self.current_page() >= self.total_pages()
    }

    /// Updates the record count, pulling a stale offset back onto the last
    /// page.
    pub fn set_total_records(&mut self, total: usize) {
        self.total_records = total;
        if self.current_page() > self.total_pages() {
            self.offset = (self.total_pages() - 1) * self.page_size;
        }
    }

    pub fn reset(&mut self) {
        self.offset = 0;
    }

    pub fn dispatch(&mut self, command: PageCommand) -> PageEvent {
        match command {
            PageCommand::Next => self.go_to_page(self.current_page() + 1),
            PageCommand::Previous => match self.current_page() {
                1 => PageEvent::Ignored,
                page => self.go_to_page(page - 1),
            },
            PageCommand::First => self.go_to_page(1),
            PageCommand::Last => self.go_to_page(self.total_pages()),
            PageCommand::GoTo(page) => self.go_to_page(page),
            PageCommand::SetPageSize(size) => self.change_page_size(size),
        }
    }

    pub fn go_to_page(&mut self, page: usize) -> PageEvent {
        if page < 1 || page > self.total_pages() {
            return PageEvent::Ignored;
        }
        self.offset = (page - 1) * self.page_size;
        self.page_event()
    }

    pub fn change_page_size(&mut self, size: usize) -> PageEvent {
        if size == 0 {
            return PageEvent::Ignored;
        }
        self.page_size = size;
        self.offset = 0;
        self.page_event()
    }

    /// Applies a page size reported alongside fresh data. Unlike
    /// `change_page_size` this neither emits a fetch nor jumps to page 1; the
    /// offset snaps to the page that holds the current first row.
    pub fn resize(&mut self, size: usize) {
        if size == 0 || size == self.page_size {
            return;
        }
        self.page_size = size;
        self.offset = self.offset / size * size;
    }

    fn page_event(&self) -> PageEvent {
        match self.mode {
            PagingMode::Client => PageEvent::Repaginated {
                page: self.current_page(),
            },
            PagingMode::Server => PageEvent::FetchRequested {
                offset: self.offset,
                limit: self.page_size,
            },
        }
    }

    /// Up to five page numbers centered on the current page, sliding at
    /// either end so `min(5, total_pages)` numbers are always returned.
    pub fn visible_page_window(&self) -> Vec<usize> {
        let total = self.total_pages();
        let current = self.current_page().min(total);
        if total <= MAX_VISIBLE_PAGES {
            return (1..=total).collect();
        }
        let half = MAX_VISIBLE_PAGES / 2;
        let start = current
            .saturating_sub(half)
            .max(1)
            .min(total - MAX_VISIBLE_PAGES + 1);
        (start..start + MAX_VISIBLE_PAGES).collect()
    }

    /// The rows of the current page out of a locally held dataset.
    pub fn page_slice<'a, T>(&self, rows: &'a [T]) -> &'a [T] {
        let start = self.offset.min(rows.len());
        let end = start.saturating_add(self.page_size).min(rows.len());
        &rows[start..end]
    }

    pub fn range_label(&self) -> String {
        if self.total_records == 0 {
            return "0 of 0".to_owned();
        }
        let first = self.offset + 1;
        let last = (self.offset + self.page_size).min(self.total_records);
        format!("{first}-{last} of {}", self.total_records)
    }
}
