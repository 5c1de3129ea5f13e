// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use gridline_app::{
    BadgeColor, ColumnDescriptor, FilterConfig, FilterKind, FilterMode, FilterSet, GridHost, Row,
    SelectionMode,
};
use std::collections::BTreeMap;
use time::macros::date;
use time::{Date, Duration, OffsetDateTime, Time};

const REFERENCE_DAY: Date = date!(2025 - 09 - 10);

const CHAT_TOPICS: [&str; 10] = [
    "Resolved by Bot",
    "Billing question",
    "Password reset",
    "Bot handoff to agent",
    "Delivery delay",
    "Refund request",
    "Account upgrade",
    "Bot could not answer",
    "Address change",
    "Order cancellation",
];

const CHAT_STATUSES: [&str; 4] = ["Open", "Resolved", "Escalated", "Pending"];
const CHANNELS: [&str; 4] = ["Web", "Email", "WhatsApp", "Mobile App"];

const FIRST_NAMES: [&str; 16] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Elliot", "Robin", "Cameron", "Hayden", "Rowan",
];
const LAST_NAMES: [&str; 18] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Campbell", "Turner", "Flores", "Bennett", "Price", "Morris", "Foster", "Brooks",
];
const AGENTS: [&str; 6] = [
    "Support Bot",
    "Dana Hughes",
    "Sam Ortiz",
    "Lee Chen",
    "Priya Nair",
    "Support Bot",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRecord {
    pub chat_id: String,
    pub customer_name: String,
    pub chat_topic: String,
    pub agent_name: String,
    pub channel: String,
    pub status: String,
    pub created_at: OffsetDateTime,
}

impl ChatRecord {
    pub fn to_row(&self) -> Row {
        Row::new()
            .with("chatId", self.chat_id.as_str())
            .with("customerName", self.customer_name.as_str())
            .with("chatTopic", self.chat_topic.as_str())
            .with("agentName", self.agent_name.as_str())
            .with("channel", self.channel.as_str())
            .with("status", self.status.as_str())
            .with("createdAt", self.created_at)
    }
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Deterministic generator of support-chat records. The same seed always
/// yields the same sequence.
#[derive(Debug, Clone)]
pub struct ChatFaker {
    rng: DeterministicRng,
    seed: u64,
    sequence: u32,
}

impl ChatFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
            sequence: 0,
        }
    }

    pub const fn seed(&self) -> u64 {
        self.seed
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    fn pick<'a>(&mut self, values: &'a [&'a str]) -> &'a str {
        values[self.rng.int_n(values.len())]
    }

    pub fn chat(&mut self) -> ChatRecord {
        let day_offset = (self.sequence / 10) as i64;
        let day = reference_start() + Duration::days(day_offset);
        let minutes = self.rng.int_n(24 * 60) as i64;
        let created_at = day + Duration::minutes(minutes);
        let chat_id = format!(
            "C-{:04}{:02}{:02}{:02}",
            day.year(),
            u8::from(day.month()),
            day.day(),
            self.sequence % 10 + 1
        );
        self.sequence += 1;

        ChatRecord {
            chat_id,
            customer_name: format!("{} {}", self.pick(&FIRST_NAMES), self.pick(&LAST_NAMES)),
            chat_topic: self.pick(&CHAT_TOPICS).to_owned(),
            agent_name: self.pick(&AGENTS).to_owned(),
            channel: self.pick(&CHANNELS).to_owned(),
            status: self.pick(&CHAT_STATUSES).to_owned(),
            created_at,
        }
    }

    pub fn chats(&mut self, count: usize) -> Vec<ChatRecord> {
        (0..count).map(|_| self.chat()).collect()
    }

    pub fn rows(&mut self, count: usize) -> Vec<Row> {
        self.chats(count).iter().map(ChatRecord::to_row).collect()
    }
}

/// Column set used by the demo and tests: chat id and created date are
/// filtered upstream, the rest in memory.
pub fn chat_columns() -> Vec<ColumnDescriptor> {
    let status_badges: BTreeMap<String, BadgeColor> = [
        ("open", "#DBEAFE", "#1E40AF"),
        ("resolved", "#DCFCE7", "#166534"),
        ("escalated", "#FEE2E2", "#991B1B"),
        ("pending", "#FEF3C7", "#92400E"),
    ]
    .into_iter()
    .map(|(status, background, text)| {
        (
            status.to_owned(),
            BadgeColor {
                background: background.to_owned(),
                text: text.to_owned(),
            },
        )
    })
    .collect();

    vec![
        ColumnDescriptor::new("chatId", "Chat ID").with_filter(
            FilterKind::Text,
            FilterConfig {
                placeholder: Some("Search chat id...".to_owned()),
                mode: Some(FilterMode::Server),
                ..FilterConfig::default()
            },
        ),
        ColumnDescriptor::new("customerName", "Customer")
            .with_filter(FilterKind::Text, FilterConfig::default()),
        ColumnDescriptor::new("chatTopic", "Chat Topic")
            .with_filter(FilterKind::Text, FilterConfig::default()),
        ColumnDescriptor::new("agentName", "Agent"),
        ColumnDescriptor::new("channel", "Channel").with_filter(
            FilterKind::Select,
            FilterConfig {
                options: CHANNELS.iter().map(|value| (*value).to_owned()).collect(),
                selection: Some(SelectionMode::Single),
                ..FilterConfig::default()
            },
        ),
        ColumnDescriptor::new("status", "Status").with_filter(
            FilterKind::Select,
            FilterConfig {
                options: CHAT_STATUSES.iter().map(|value| (*value).to_owned()).collect(),
                badge_colors: status_badges,
                ..FilterConfig::default()
            },
        ),
        ColumnDescriptor::new("createdAt", "Created").with_filter(
            FilterKind::DateRange,
            FilterConfig {
                mode: Some(FilterMode::Server),
                min_date: Some(reference_start().date()),
                ..FilterConfig::default()
            },
        ),
    ]
}

pub fn chat_field_map() -> BTreeMap<String, String> {
    [
        ("chatId", "chat_id"),
        ("customerName", "customer_name"),
        ("chatTopic", "chat_topic"),
        ("createdAt", "created_at"),
    ]
    .into_iter()
    .map(|(internal, external)| (internal.to_owned(), external.to_owned()))
    .collect()
}

pub fn chat_statuses() -> &'static [&'static str] {
    &CHAT_STATUSES
}

pub fn chat_channels() -> &'static [&'static str] {
    &CHANNELS
}

/// First day of generated chats; record `n` falls on day `n / 10`.
pub const fn reference_day() -> Date {
    REFERENCE_DAY
}

fn reference_start() -> OffsetDateTime {
    REFERENCE_DAY.with_time(Time::MIDNIGHT).assume_utc()
}

/// Host that records every callback for later assertions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingHost {
    pub dispatches: Vec<FilterSet>,
    pub page_requests: Vec<(usize, usize)>,
    pub loading: Vec<bool>,
}

impl GridHost for RecordingHost {
    fn filters_changed(&mut self, filters: &FilterSet) {
        self.dispatches.push(filters.clone());
    }

    fn page_requested(&mut self, offset: usize, limit: usize) {
        self.page_requests.push((offset, limit));
    }

    fn loading_changed(&mut self, loading: bool) {
        self.loading.push(loading);
    }
}
