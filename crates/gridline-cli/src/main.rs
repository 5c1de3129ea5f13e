// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod render;
mod runtime;
#[cfg(test)]
mod test_support;

use anyhow::{Context, Result, anyhow};
use config::Config;
use gridline_app::{PageCommand, PageEvent, PagingMode};
use gridline_testkit::{ChatFaker, chat_columns, chat_field_map};
use runtime::{MemorySource, Session};
use std::env;
use std::path::PathBuf;
use std::time::Instant;

const DEFAULT_ROWS: usize = 95;
const DEFAULT_SEED: u64 = 42;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `gridline --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;
    logging::init_logging(config.log_level())?;

    let mut grid_options = config.grid_options(chat_field_map())?;
    if options.server_paging {
        grid_options.paging = PagingMode::Server;
    }
    if let Some(size) = options.page_size {
        grid_options.page_size = size;
    }
    let columns = config.apply_columns(chat_columns())?;
    for (field, _) in &options.filters {
        let column = columns
            .iter()
            .find(|column| &column.field == field)
            .ok_or_else(|| anyhow!("--filter names unknown column {field:?}"))?;
        if column.filter == gridline_app::FilterKind::None {
            return Err(anyhow!("--filter names column {field:?}, which has no filter"));
        }
    }
    if options.check_only {
        return Ok(());
    }

    let rows = ChatFaker::new(options.seed).rows(options.rows);
    let source = MemorySource::new(rows, &grid_options.field_map).fail_next(options.fail_first);
    let mut session = Session::new(columns, grid_options, source);
    session.settle();

    for attempt in 1..=options.fail_first {
        if !session.retry() {
            break;
        }
        tracing::info!(attempt, "retrying after data source error");
        session.settle();
    }

    for (field, value) in &options.filters {
        session
            .apply_filter(field, value, Instant::now())
            .with_context(|| format!("apply --filter {field}={value}"))?;
    }
    session.settle();

    if options.page > 1 {
        if session.page(PageCommand::GoTo(options.page)) == PageEvent::Ignored {
            return Err(anyhow!(
                "page {} is out of range; {} page(s) available",
                options.page,
                session.grid().pagination().total_pages()
            ));
        }
        session.settle();
    }

    print!("{}", render::render_grid(session.grid()));
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
    server_paging: bool,
    rows: usize,
    seed: u64,
    page: usize,
    page_size: Option<usize>,
    fail_first: usize,
    filters: Vec<(String, String)>,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
        server_paging: false,
        rows: DEFAULT_ROWS,
        seed: DEFAULT_SEED,
        page: 1,
        page_size: None,
        fail_first: 0,
        filters: Vec::new(),
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--server" => {
                options.server_paging = true;
            }
            "--rows" => {
                options.rows = number_arg("--rows", iter.next())?;
            }
            "--seed" => {
                options.seed = number_arg("--seed", iter.next())?;
            }
            "--page" => {
                options.page = number_arg("--page", iter.next())?;
                if options.page == 0 {
                    return Err(anyhow!("--page starts at 1"));
                }
            }
            "--page-size" => {
                let size: usize = number_arg("--page-size", iter.next())?;
                if size == 0 {
                    return Err(anyhow!("--page-size must be positive"));
                }
                options.page_size = Some(size);
            }
            "--fail-first" => {
                options.fail_first = number_arg("--fail-first", iter.next())?;
            }
            "--filter" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--filter requires field=value"))?;
                let (field, filter) = value
                    .as_ref()
                    .split_once('=')
                    .ok_or_else(|| anyhow!("--filter expects field=value, got {:?}", value.as_ref()))?;
                options
                    .filters
                    .push((field.trim().to_owned(), filter.to_owned()));
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn number_arg<T, S>(flag: &str, value: Option<S>) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    S: AsRef<str>,
{
    let value = value.ok_or_else(|| anyhow!("{flag} requires a number"))?;
    value
        .as_ref()
        .parse()
        .with_context(|| format!("{flag} expects a number, got {:?}", value.as_ref()))
}

fn print_help() {
    println!("gridline");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --check                  Validate config and arguments, then exit");
    println!("  --server                 Page through the data source instead of in memory");
    println!("  --rows <n>               Number of generated chat records (default 95)");
    println!("  --seed <n>               Seed for generated records (default 42)");
    println!("  --page <n>               Page to show (1-based)");
    println!("  --page-size <n>          Rows per page");
    println!("  --fail-first <n>         Fail the first n fetches, then retry");
    println!("  --filter <field=value>   Filter a column; repeatable");
    println!("                           text, a|b for select, YYYY-MM-DD, START..END");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, DEFAULT_ROWS, DEFAULT_SEED, parse_cli_args};
    use anyhow::Result;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/gridline-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                print_config_path: false,
                print_example: false,
                check_only: false,
                show_help: false,
                server_paging: false,
                rows: DEFAULT_ROWS,
                seed: DEFAULT_SEED,
                page: 1,
                page_size: None,
                fail_first: 0,
                filters: Vec::new(),
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_values() {
        for (args, needle) in [
            (vec!["--config"], "--config requires a file path"),
            (vec!["--rows"], "--rows requires a number"),
            (vec!["--filter"], "--filter requires field=value"),
        ] {
            let error = parse_cli_args(args, default_options_path())
                .expect_err("missing value should fail");
            assert!(error.to_string().contains(needle), "{error}");
        }
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_reads_paging_and_data_flags() -> Result<()> {
        let options = parse_cli_args(
            vec![
                "--server",
                "--rows",
                "200",
                "--seed",
                "7",
                "--page",
                "3",
                "--page-size",
                "25",
                "--fail-first",
                "1",
            ],
            default_options_path(),
        )?;
        assert!(options.server_paging);
        assert_eq!(options.rows, 200);
        assert_eq!(options.seed, 7);
        assert_eq!(options.page, 3);
        assert_eq!(options.page_size, Some(25));
        assert_eq!(options.fail_first, 1);
        Ok(())
    }

    #[test]
    fn parse_cli_args_rejects_bad_numbers() {
        for args in [
            vec!["--rows", "many"],
            vec!["--page", "0"],
            vec!["--page-size", "0"],
        ] {
            assert!(parse_cli_args(args, default_options_path()).is_err());
        }
    }

    #[test]
    fn parse_cli_args_collects_repeated_filters() -> Result<()> {
        let options = parse_cli_args(
            vec![
                "--filter",
                "chatTopic=bot",
                "--filter",
                "status=Open|Pending",
                "--filter",
                "createdAt=2025-09-10..2025-09-12",
            ],
            default_options_path(),
        )?;
        assert_eq!(
            options.filters,
            vec![
                ("chatTopic".to_owned(), "bot".to_owned()),
                ("status".to_owned(), "Open|Pending".to_owned()),
                (
                    "createdAt".to_owned(),
                    "2025-09-10..2025-09-12".to_owned()
                ),
            ]
        );

        let error = parse_cli_args(vec!["--filter", "chatTopic"], default_options_path())
            .expect_err("missing = should fail");
        assert!(error.to_string().contains("field=value"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_print_check_and_help_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--check", "-h"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(options.show_help);
        Ok(())
    }
}
