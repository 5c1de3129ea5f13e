// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use gridline_app::{
    ColumnDescriptor, DEFAULT_DEBOUNCE, DEFAULT_LOADING_TIMEOUT, DEFAULT_PAGE_SIZE, FilterKind,
    FilterMode, GridOptions, PagingMode, SelectionMode, parse_day,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "gridline";
pub const CONFIG_PATH_ENV: &str = "GRIDLINE_CONFIG_PATH";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_LOG_LEVEL: &str = "warn";
const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub grid: Grid,
    /// Internal column field -> field name used by the data source.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub columns: Vec<ColumnOverride>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            grid: Grid::default(),
            fields: BTreeMap::new(),
            log: Log::default(),
            columns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Grid {
    pub page_size: Option<usize>,
    pub paging: Option<String>,
    pub debounce: Option<String>,
    pub loading_timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub level: Option<String>,
}

/// Adjusts one column of the built-in column set, matched by `field`.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnOverride {
    pub field: String,
    pub header: Option<String>,
    pub filter: Option<String>,
    pub mode: Option<String>,
    pub placeholder: Option<String>,
    pub options: Option<Vec<String>>,
    pub selection: Option<String>,
    pub min_date: Option<String>,
    pub max_date: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version; add `version = 1` and put values under [grid], [fields], and [log]",
                    path.display()
                )
            })?;
        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.grid.page_size == Some(0) {
            bail!("grid.page_size in {} must be positive", path.display());
        }
        self.paging()
            .with_context(|| format!("invalid [grid] in {}", path.display()))?;
        for (key, raw) in [
            ("grid.debounce", &self.grid.debounce),
            ("grid.loading_timeout", &self.grid.loading_timeout),
        ] {
            if let Some(raw) = raw
                && parse_duration(raw)? <= Duration::ZERO
            {
                bail!("{key} in {} must be positive, got {raw}", path.display());
            }
        }

        let level = self.log_level();
        if !LOG_LEVELS.contains(&level) {
            bail!(
                "log.level in {} must be one of {}, got {level:?}",
                path.display(),
                LOG_LEVELS.join(", ")
            );
        }

        for (internal, external) in &self.fields {
            if internal.trim().is_empty() || external.trim().is_empty() {
                bail!("[fields] in {} cannot map empty names", path.display());
            }
        }

        for column in &self.columns {
            column
                .validate()
                .with_context(|| format!("invalid [[columns]] entry in {}", path.display()))?;
        }
        Ok(())
    }

    pub fn page_size(&self) -> usize {
        self.grid.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn paging(&self) -> Result<PagingMode> {
        match self.grid.paging.as_deref() {
            None => Ok(PagingMode::Client),
            Some(raw) => PagingMode::parse(raw)
                .ok_or_else(|| anyhow!("paging must be \"client\" or \"server\", got {raw:?}")),
        }
    }

    pub fn debounce(&self) -> Result<Duration> {
        self.grid
            .debounce
            .as_deref()
            .map_or(Ok(DEFAULT_DEBOUNCE), parse_duration)
    }

    pub fn loading_timeout(&self) -> Result<Duration> {
        self.grid
            .loading_timeout
            .as_deref()
            .map_or(Ok(DEFAULT_LOADING_TIMEOUT), parse_duration)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Coordinator options with `base_fields` as the starting field map;
    /// entries from `[fields]` replace matching keys.
    pub fn grid_options(&self, base_fields: BTreeMap<String, String>) -> Result<GridOptions> {
        let mut field_map = base_fields;
        field_map.extend(self.fields.clone());
        Ok(GridOptions {
            paging: self.paging()?,
            page_size: self.page_size(),
            debounce: self.debounce()?,
            loading_timeout: self.loading_timeout()?,
            field_map,
        })
    }

    /// Applies `[[columns]]` overrides onto `columns`. Overrides naming an
    /// unknown field are an error.
    pub fn apply_columns(&self, mut columns: Vec<ColumnDescriptor>) -> Result<Vec<ColumnDescriptor>> {
        for entry in &self.columns {
            let column = columns
                .iter_mut()
                .find(|column| column.field == entry.field)
                .ok_or_else(|| anyhow!("[[columns]] names unknown field {:?}", entry.field))?;
            entry.apply(column)?;
        }
        Ok(columns)
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# gridline config\n# Place this file at: {}\n\nversion = 1\n\n[grid]\npage_size = {}\n# client pages rows in memory; server asks the data source for each page\npaging = \"client\"\ndebounce = \"{}ms\"\nloading_timeout = \"{}s\"\n\n[fields]\n# internal column field = name the data source expects\nchatId = \"chat_id\"\ncreatedAt = \"created_at\"\n\n[log]\n# trace, debug, info, warn, error, off; GRIDLINE_LOG overrides\nlevel = \"{}\"\n\n# [[columns]]\n# field = \"status\"\n# filter = \"select\"\n# mode = \"server\"\n# selection = \"single\"\n",
            path.display(),
            DEFAULT_PAGE_SIZE,
            DEFAULT_DEBOUNCE.as_millis(),
            DEFAULT_LOADING_TIMEOUT.as_secs(),
            DEFAULT_LOG_LEVEL,
        )
    }
}

impl ColumnOverride {
    fn validate(&self) -> Result<()> {
        let mut scratch = ColumnDescriptor::new(self.field.clone(), self.field.clone());
        self.apply(&mut scratch)
    }

    fn apply(&self, column: &mut ColumnDescriptor) -> Result<()> {
        if let Some(header) = &self.header {
            column.header = header.clone();
        }
        if let Some(raw) = &self.filter {
            column.filter = FilterKind::parse(raw).ok_or_else(|| {
                anyhow!(
                    "column {:?}: filter must be none, text, select, date, or date-range, got {raw:?}",
                    self.field
                )
            })?;
        }
        let config = &mut column.filter_config;
        if let Some(raw) = &self.mode {
            config.mode = Some(FilterMode::parse(raw).ok_or_else(|| {
                anyhow!(
                    "column {:?}: mode must be \"client\" or \"server\", got {raw:?}",
                    self.field
                )
            })?);
        }
        if let Some(placeholder) = &self.placeholder {
            config.placeholder = Some(placeholder.clone());
        }
        if let Some(options) = &self.options {
            config.options = options.clone();
        }
        if let Some(raw) = &self.selection {
            config.selection = Some(match raw.as_str() {
                "single" => SelectionMode::Single,
                "multiple" => SelectionMode::Multiple,
                _ => bail!(
                    "column {:?}: selection must be \"single\" or \"multiple\", got {raw:?}",
                    self.field
                ),
            });
        }
        if let Some(raw) = &self.min_date {
            config.min_date = Some(parse_day(raw).with_context(|| format!("column {:?}", self.field))?);
        }
        if let Some(raw) = &self.max_date {
            config.max_date = Some(parse_day(raw).with_context(|| format!("column {:?}", self.field))?);
        }
        if let (Some(min), Some(max)) = (config.min_date, config.max_date)
            && min > max
        {
            bail!("column {:?}: min_date is after max_date", self.field);
        }
        Ok(())
    }
}

pub fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 300ms or 8s)")
}

#[cfg(test)]
mod tests {
    use super::{CONFIG_PATH_ENV, Config, parse_duration};
    use crate::test_support::env_lock;
    use anyhow::Result;
    use gridline_app::{FilterKind, FilterMode, PagingMode, SelectionMode};
    use gridline_testkit::{chat_columns, chat_field_map};
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        let options = config.grid_options(BTreeMap::new())?;
        assert_eq!(options.paging, PagingMode::Client);
        assert_eq!(options.page_size, 10);
        assert_eq!(options.debounce, Duration::from_millis(300));
        assert_eq!(options.loading_timeout, Duration::from_secs(8));
        assert_eq!(config.log_level(), "warn");
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[grid]\npage_size = 25\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[grid], [fields], and [log]"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 3\n")?;
        let error = Config::load(&path).expect_err("v3 config should fail");
        assert!(error.to_string().contains("unsupported config version 3"));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn v1_config_parses_into_grid_options() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[grid]\npage_size = 25\npaging = \"server\"\ndebounce = \"150ms\"\nloading_timeout = \"2m\"\n[fields]\nchatId = \"id\"\nstatus = \"state\"\n[log]\nlevel = \"debug\"\n",
        )?;
        let config = Config::load(&path)?;
        let options = config.grid_options(chat_field_map())?;
        assert_eq!(options.paging, PagingMode::Server);
        assert_eq!(options.page_size, 25);
        assert_eq!(options.debounce, Duration::from_millis(150));
        assert_eq!(options.loading_timeout, Duration::from_secs(120));
        assert_eq!(options.field_map.get("chatId").map(String::as_str), Some("id"));
        assert_eq!(options.field_map.get("status").map(String::as_str), Some("state"));
        assert_eq!(
            options.field_map.get("createdAt").map(String::as_str),
            Some("created_at")
        );
        assert_eq!(config.log_level(), "debug");
        Ok(())
    }

    #[test]
    fn grid_values_are_validated() -> Result<()> {
        for (content, needle) in [
            ("version = 1\n[grid]\npage_size = 0\n", "must be positive"),
            ("version = 1\n[grid]\npaging = \"infinite\"\n", "invalid [grid]"),
            ("version = 1\n[grid]\ndebounce = \"0ms\"\n", "grid.debounce"),
            ("version = 1\n[grid]\nloading_timeout = \"soon\"\n", "invalid duration"),
            ("version = 1\n[log]\nlevel = \"loud\"\n", "log.level"),
            ("version = 1\n[fields]\nchatId = \"\"\n", "empty names"),
        ] {
            let (_temp, path) = write_config(content)?;
            let error = Config::load(&path).expect_err(content);
            let message = format!("{error:#}");
            assert!(message.contains(needle), "{content}: {message}");
        }
        Ok(())
    }

    #[test]
    fn column_overrides_adjust_matching_columns() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[[columns]]\nfield = \"status\"\nheader = \"State\"\nmode = \"server\"\nselection = \"single\"\n[[columns]]\nfield = \"agentName\"\nfilter = \"text\"\nplaceholder = \"Agent...\"\n[[columns]]\nfield = \"createdAt\"\nmax_date = \"2025-12-31\"\n",
        )?;
        let config = Config::load(&path)?;
        let columns = config.apply_columns(chat_columns())?;

        let status = columns
            .iter()
            .find(|column| column.field == "status")
            .expect("status column");
        assert_eq!(status.header, "State");
        assert_eq!(status.filter_mode(), FilterMode::Server);
        assert_eq!(status.filter_config.selection(), SelectionMode::Single);

        let agent = columns
            .iter()
            .find(|column| column.field == "agentName")
            .expect("agent column");
        assert_eq!(agent.filter, FilterKind::Text);
        assert_eq!(agent.filter_config.placeholder(), "Agent...");

        let created = columns
            .iter()
            .find(|column| column.field == "createdAt")
            .expect("created column");
        assert!(created.filter_config.min_date.is_some());
        assert!(created.filter_config.max_date.is_some());
        Ok(())
    }

    #[test]
    fn column_overrides_reject_bad_values() -> Result<()> {
        for (content, needle) in [
            ("version = 1\n[[columns]]\nfield = \"x\"\nfilter = \"slider\"\n", "filter must be"),
            ("version = 1\n[[columns]]\nfield = \"x\"\nselection = \"many\"\n", "selection must be"),
            ("version = 1\n[[columns]]\nfield = \"x\"\nmin_date = \"10/09/2025\"\n", "invalid date"),
            (
                "version = 1\n[[columns]]\nfield = \"x\"\nmin_date = \"2025-10-02\"\nmax_date = \"2025-10-01\"\n",
                "min_date is after max_date",
            ),
        ] {
            let (_temp, path) = write_config(content)?;
            let error = Config::load(&path).expect_err(content);
            let message = format!("{error:#}");
            assert!(message.contains(needle), "{content}: {message}");
        }

        let (_temp, path) = write_config("version = 1\n[[columns]]\nfield = \"nope\"\n")?;
        let config = Config::load(&path)?;
        let error = config
            .apply_columns(chat_columns())
            .expect_err("unknown field should fail");
        assert!(error.to_string().contains("unknown field"));
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var(CONFIG_PATH_ENV, &override_path);
        }
        let resolved = Config::default_path();
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }
        assert_eq!(resolved?, override_path);
        Ok(())
    }

    #[test]
    fn durations_parse_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("300ms")?, Duration::from_millis(300));
        assert_eq!(parse_duration("8s")?, Duration::from_secs(8));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        assert!(parse_duration("fast").is_err());
        Ok(())
    }

    #[test]
    fn example_config_round_trips() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        assert!(example.contains("version = 1"));
        assert!(example.contains("[grid]"));
        assert!(example.contains("[fields]"));
        assert!(example.contains("[log]"));

        std::fs::write(&path, &example)?;
        let config = Config::load(&path)?;
        assert_eq!(config.page_size(), 10);
        assert_eq!(config.fields.get("chatId").map(String::as_str), Some("chat_id"));
        Ok(())
    }
}
