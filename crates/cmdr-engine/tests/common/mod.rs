#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use cmdr_core::dependency::Dependency;
use cmdr_core::errors::{CmdError, Result};
use cmdr_core::params::ParamMap;
use cmdr_core::spec::{ArgSpec, CommandSpec};
use cmdr_engine::{
    BasicCommand, Commander, DownloadIterateCommand, IterateDownloadCommand, Registry,
    RunContext, Units,
};
use cmdr_store::{Database, FsCache};
use rusqlite::{params, Connection};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

pub const TEST_COMMAND: &str = "test_command";
pub const TEST_COMMAND_WITH_DEPENDENCY: &str = "test_command_with_dependency";
pub const DOWNLOAD_ITERATE: &str = "test_download_iterate_command";
pub const ITERATE_DOWNLOAD: &str = "test_iterate_download_command";
pub const PARALLEL_DOWNLOAD_ITERATE: &str = "test_parallel_download_iterate_command";
pub const PARALLEL_ITERATE_DOWNLOAD: &str = "test_parallel_iterate_download_command";
pub const FAILING_COMMAND: &str = "failing_command";
pub const EMPTY_UNITS_COMMAND: &str = "empty_units_command";

/// Call counters shared by every instance a factory builds
#[derive(Clone, Default)]
pub struct Counters {
    pub downloads: Arc<AtomicUsize>,
    pub parses: Arc<AtomicUsize>,
}

impl Counters {
    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    pub fn parses(&self) -> usize {
        self.parses.load(Ordering::SeqCst)
    }
}

pub struct TestEnv {
    pub dir: TempDir,
    pub commander: Arc<Commander>,
    pub counters: Counters,
}

impl TestEnv {
    pub fn conn(&self) -> Connection {
        self.commander.connect().unwrap()
    }

    pub fn cache_root(&self) -> PathBuf {
        self.dir.path().join("cache")
    }
}

pub fn setup() -> TestEnv {
    let dir = TempDir::new().unwrap();
    let counters = Counters::default();
    let registry = test_registry(&counters);

    let commander = Commander::new(
        registry,
        Database::new(dir.path().join("commander.db")),
        Arc::new(FsCache::new(dir.path().join("cache"))),
    )
    .unwrap();

    let conn = commander.connect().unwrap();
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS parents (
            name TEXT PRIMARY KEY,
            upper_name TEXT
         );
         CREATE TABLE IF NOT EXISTS children (
            name TEXT NOT NULL,
            parent_name TEXT NOT NULL REFERENCES parents(name),
            PRIMARY KEY (name, parent_name)
         );",
    )
    .unwrap();

    TestEnv {
        dir,
        commander: Arc::new(commander),
        counters,
    }
}

pub fn args(pairs: &[(&str, Value)]) -> ParamMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub fn parent_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM parents ORDER BY name")
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<std::result::Result<Vec<String>, _>>()
        .unwrap()
}

pub fn upper_name(conn: &Connection, name: &str) -> Option<String> {
    conn.query_row(
        "SELECT upper_name FROM parents WHERE name = ?1",
        [name],
        |row| row.get(0),
    )
    .unwrap()
}

fn save_parent(ctx: &RunContext<'_>, name: &str, upper: Option<&str>) -> Result<()> {
    ctx.conn()
        .execute(
            "INSERT INTO parents (name, upper_name) VALUES (?1, ?2)
             ON CONFLICT (name) DO UPDATE SET upper_name = COALESCE(?2, upper_name)",
            params![name, upper],
        )
        .map_err(|e| CmdError::failed(e.to_string()))?;
    ctx.link_entity("parent", name)
}

// ========== Commands ==========

pub struct TestCommand;

impl BasicCommand for TestCommand {
    type Output = (String, String);

    fn run(&mut self, ctx: &RunContext<'_>) -> Result<Self::Output> {
        let parent = ctx.parameter_str("parent_name")?.to_string();
        let child = ctx
            .option("child_name")
            .and_then(Value::as_str)
            .unwrap_or("child")
            .to_string();

        save_parent(ctx, &parent, None)?;
        ctx.conn()
            .execute(
                "INSERT OR IGNORE INTO children (name, parent_name) VALUES (?1, ?2)",
                params![child, parent],
            )
            .map_err(|e| CmdError::failed(e.to_string()))?;
        ctx.link_entity("child", &format!("{}/{}", parent, child))?;

        Ok((parent, child))
    }
}

pub struct TestCommandWithDependency;

impl BasicCommand for TestCommandWithDependency {
    type Output = usize;

    fn run(&mut self, ctx: &RunContext<'_>) -> Result<usize> {
        let count: i64 = ctx
            .conn()
            .query_row("SELECT COUNT(*) FROM parents", [], |row| row.get(0))
            .map_err(|e| CmdError::failed(e.to_string()))?;
        Ok(count as usize)
    }
}

pub struct FailingCommand;

impl BasicCommand for FailingCommand {
    type Output = ();

    fn run(&mut self, _ctx: &RunContext<'_>) -> Result<()> {
        Err(CmdError::failed("parent source unavailable"))
    }
}

pub struct NamesDownloadIterate {
    counters: Counters,
}

impl DownloadIterateCommand for NamesDownloadIterate {
    type Downloaded = Vec<String>;
    type Unit = String;
    type Output = String;

    fn download(&mut self, ctx: &RunContext<'_>) -> Result<Vec<String>> {
        let downloads = Arc::clone(&self.counters.downloads);
        ctx.cached("download", &(), move || {
            downloads.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["bob".to_string(), "shelly".to_string()])
        })
    }

    fn iterate(&mut self, _ctx: &RunContext<'_>, names: Vec<String>) -> Result<Units<String>> {
        Ok(Box::new(names.into_iter()))
    }

    fn parse_and_save(&mut self, ctx: &RunContext<'_>, name: String) -> Result<String> {
        self.counters.parses.fetch_add(1, Ordering::SeqCst);
        save_parent(ctx, &name, None)?;
        Ok(name)
    }
}

pub struct NamesIterateDownload {
    counters: Counters,
}

impl IterateDownloadCommand for NamesIterateDownload {
    type Unit = String;
    type Downloaded = Vec<String>;
    type Output = String;

    fn iterate(&mut self, _ctx: &RunContext<'_>) -> Result<Units<String>> {
        Ok(Box::new(
            ["bob", "shelly"].into_iter().map(ToString::to_string),
        ))
    }

    fn download(&mut self, ctx: &RunContext<'_>, name: &String) -> Result<Vec<String>> {
        let downloads = Arc::clone(&self.counters.downloads);
        ctx.cached("download", name, move || {
            downloads.fetch_add(1, Ordering::SeqCst);
            Ok(vec![name.to_uppercase()])
        })
    }

    fn parse_and_save(
        &mut self,
        ctx: &RunContext<'_>,
        downloaded: Vec<String>,
        name: &String,
    ) -> Result<String> {
        self.counters.parses.fetch_add(1, Ordering::SeqCst);
        let upper = downloaded.into_iter().next().unwrap_or_default();
        save_parent(ctx, name, Some(&upper))?;
        Ok(upper)
    }
}

/// Units carrying no data are skipped before `parse_and_save`
pub struct EmptyUnits {
    counters: Counters,
}

impl DownloadIterateCommand for EmptyUnits {
    type Downloaded = Vec<Option<String>>;
    type Unit = Option<String>;
    type Output = String;

    fn download(&mut self, _ctx: &RunContext<'_>) -> Result<Self::Downloaded> {
        Ok(vec![Some("bob".to_string()), None, None])
    }

    fn iterate(
        &mut self,
        _ctx: &RunContext<'_>,
        downloaded: Self::Downloaded,
    ) -> Result<Units<Option<String>>> {
        Ok(Box::new(downloaded.into_iter()))
    }

    fn parse_and_save(&mut self, ctx: &RunContext<'_>, unit: Option<String>) -> Result<String> {
        self.counters.parses.fetch_add(1, Ordering::SeqCst);
        let name = unit.unwrap_or_default();
        save_parent(ctx, &name, None)?;
        Ok(name)
    }
}

pub fn test_registry(counters: &Counters) -> Registry {
    let mut registry = Registry::with_builtins();

    registry
        .register_basic(
            CommandSpec::new(TEST_COMMAND)
                .about("Create a parent and one child")
                .parameter(ArgSpec::positional("parent_name"))
                .option(ArgSpec::value("child_name"))
                .test_parameters(args(&[("parent_name", json!("test_parent"))])),
            |_| Ok(TestCommand),
        )
        .unwrap();

    registry
        .register_basic(
            CommandSpec::new(TEST_COMMAND_WITH_DEPENDENCY)
                .parameter(ArgSpec::positional("parent_name"))
                .depends_on(Dependency::on(TEST_COMMAND).with_parameter("parent_name")),
            |_| Ok(TestCommandWithDependency),
        )
        .unwrap();

    registry
        .register_basic(CommandSpec::new(FAILING_COMMAND), |_| Ok(FailingCommand))
        .unwrap();

    let c = counters.clone();
    registry
        .register_download_iterate(
            CommandSpec::new(DOWNLOAD_ITERATE)
                .test_parameters(ParamMap::new())
                .test_options(ParamMap::new()),
            move |_| {
                Ok(NamesDownloadIterate {
                    counters: c.clone(),
                })
            },
        )
        .unwrap();

    let c = counters.clone();
    registry
        .register_iterate_download(CommandSpec::new(ITERATE_DOWNLOAD), move |_| {
            Ok(NamesIterateDownload {
                counters: c.clone(),
            })
        })
        .unwrap();

    let c = counters.clone();
    registry
        .register_parallel_download_iterate(
            CommandSpec::new(PARALLEL_DOWNLOAD_ITERATE)
                .test_options(args(&[("num_cores", json!(1))])),
            move |_| {
                Ok(NamesDownloadIterate {
                    counters: c.clone(),
                })
            },
        )
        .unwrap();

    let c = counters.clone();
    registry
        .register_parallel_iterate_download(CommandSpec::new(PARALLEL_ITERATE_DOWNLOAD), move |_| {
            Ok(NamesIterateDownload {
                counters: c.clone(),
            })
        })
        .unwrap();

    let c = counters.clone();
    registry
        .register_download_iterate(CommandSpec::new(EMPTY_UNITS_COMMAND), move |_| {
            Ok(EmptyUnits {
                counters: c.clone(),
            })
        })
        .unwrap();

    registry
}
