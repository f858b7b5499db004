//! In-memory driver used as the real delegate in integration tests.
//!
//! Recognized queries:
//! - `select 1`: one row, one int column
//! - `select * from users`: three rows of `(id, name)`, one name is null
//!
//! Anything else fails with SQL state `42P01`. Connection strings containing
//! `unreachable` fail to connect.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use driver_insight::{
    Capability, Connection, DatabaseMetadata, Driver, DriverError, DriverResult, Operation,
    Properties, Reply, ResultSet, ResultSetMetadata, Statement, Value,
};

#[derive(Debug, Clone)]
pub struct Column {
    pub name: &'static str,
    pub type_name: &'static str,
    pub nullable: bool,
}

#[derive(Debug, Clone)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

fn column(name: &'static str, type_name: &'static str, nullable: bool) -> Column {
    Column {
        name,
        type_name,
        nullable,
    }
}

/// Canned result for `sql`, or the error the database would raise.
pub fn run_query(sql: &str) -> DriverResult<Table> {
    let normalized = sql.trim().trim_end_matches(';').trim().to_lowercase();
    match normalized.as_str() {
        "select 1" => Ok(Table {
            columns: vec![column("?column?", "int4", false)],
            rows: vec![vec![Value::Int(1)]],
        }),
        "select * from users" => Ok(Table {
            columns: vec![column("id", "int8", false), column("name", "text", true)],
            rows: vec![
                vec![Value::Int(1), Value::from("alice")],
                vec![Value::Int(2), Value::Null],
                vec![Value::Int(3), Value::from("carol")],
            ],
        }),
        _ => Err(DriverError::database(
            Some("42P01"),
            format!("relation referenced by \"{}\" does not exist", sql.trim()),
        )),
    }
}

fn is_update(sql: &str) -> bool {
    let lower = sql.trim_start().to_lowercase();
    ["insert", "update", "delete"]
        .iter()
        .any(|keyword| lower.starts_with(keyword))
}

/// Driver for connection strings starting with its scheme.
#[derive(Debug)]
pub struct MemoryDriver {
    name: String,
    scheme: String,
}

impl MemoryDriver {
    pub fn new(name: &str, scheme: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_owned(),
            scheme: scheme.to_owned(),
        })
    }

    /// The default test driver, serving `jdbc:memory:` strings.
    pub fn ambient() -> Arc<Self> {
        Self::new("memory", "jdbc:memory:")
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts_url(&self, url: &str) -> bool {
        url.starts_with(&self.scheme)
    }

    async fn connect(&self, url: &str, _properties: &Properties) -> DriverResult<Box<dyn Connection>> {
        if url.contains("unreachable") {
            return Err(DriverError::database(Some("08001"), "connection refused"));
        }
        Ok(Box::new(MemoryConnection::new(&self.name, url)))
    }
}

pub struct MemoryConnection {
    driver_name: String,
    url: String,
    auto_commit: AtomicBool,
    closed: AtomicBool,
    extension_calls: Arc<AtomicUsize>,
}

impl MemoryConnection {
    pub fn new(driver_name: &str, url: &str) -> Self {
        Self {
            driver_name: driver_name.to_owned(),
            url: url.to_owned(),
            auto_commit: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            extension_calls: Arc::default(),
        }
    }

    /// A boxed raw connection for tests that wrap by hand.
    pub fn boxed() -> Box<dyn Connection> {
        Box::new(Self::new("memory", "jdbc:memory:test"))
    }

    fn check_open(&self) -> DriverResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DriverError::Closed("Connection"));
        }
        Ok(())
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn create_statement(&self) -> DriverResult<Box<dyn Statement>> {
        self.check_open()?;
        Ok(Box::new(MemoryStatement::default()))
    }

    async fn metadata(&self) -> DriverResult<Box<dyn DatabaseMetadata>> {
        self.check_open()?;
        Ok(Box::new(MemoryDatabaseMetadata {
            driver_name: self.driver_name.clone(),
            url: self.url.clone(),
        }))
    }

    async fn extension(&self, name: &str) -> DriverResult<Option<Box<dyn Capability>>> {
        self.check_open()?;
        match name {
            "vendor" => Ok(Some(Box::new(VendorExtension::new(
                self.extension_calls.clone(),
            )))),
            _ => Ok(None),
        }
    }

    async fn set_auto_commit(&self, enabled: bool) -> DriverResult<()> {
        self.check_open()?;
        self.auto_commit.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    async fn auto_commit(&self) -> DriverResult<bool> {
        self.check_open()?;
        Ok(self.auto_commit.load(Ordering::SeqCst))
    }

    async fn commit(&self) -> DriverResult<()> {
        self.check_open()?;
        if self.auto_commit.load(Ordering::SeqCst) {
            return Err(DriverError::database(
                Some("25000"),
                "cannot commit when autocommit is enabled",
            ));
        }
        Ok(())
    }

    async fn rollback(&self) -> DriverResult<()> {
        self.check_open()
    }

    async fn is_valid(&self, _timeout: Duration) -> DriverResult<bool> {
        Ok(!self.closed.load(Ordering::SeqCst))
    }

    async fn close(&self) -> DriverResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn is_closed(&self) -> DriverResult<bool> {
        Ok(self.closed.load(Ordering::SeqCst))
    }
}

#[derive(Default)]
pub struct MemoryStatement {
    last_table: Option<Table>,
    last_update: Option<u64>,
    max_rows: Option<u64>,
    closed: bool,
}

impl MemoryStatement {
    fn check_open(&self) -> DriverResult<()> {
        if self.closed {
            return Err(DriverError::Closed("Statement"));
        }
        Ok(())
    }

    fn limited(&self, mut table: Table) -> Table {
        if let Some(max) = self.max_rows.filter(|max| *max > 0) {
            table.rows.truncate(max as usize);
        }
        table
    }
}

#[async_trait]
impl Statement for MemoryStatement {
    async fn execute_query(&mut self, sql: &str) -> DriverResult<Box<dyn ResultSet>> {
        self.check_open()?;
        let _span = tracing::debug_span!("memory.execute_query").entered();
        let table = run_query(sql)?;
        Ok(Box::new(MemoryResultSet::new(self.limited(table))))
    }

    async fn execute_update(&mut self, sql: &str) -> DriverResult<u64> {
        self.check_open()?;
        if !is_update(sql) {
            return Err(DriverError::database(
                Some("0100E"),
                "statement does not produce an update count",
            ));
        }
        Ok(2)
    }

    async fn execute(&mut self, sql: &str) -> DriverResult<bool> {
        self.check_open()?;
        if is_update(sql) {
            self.last_table = None;
            self.last_update = Some(2);
            return Ok(false);
        }
        let table = run_query(sql)?;
        self.last_table = Some(self.limited(table));
        self.last_update = None;
        Ok(true)
    }

    async fn result_set(&mut self) -> DriverResult<Option<Box<dyn ResultSet>>> {
        self.check_open()?;
        Ok(self
            .last_table
            .take()
            .map(|table| Box::new(MemoryResultSet::new(table)) as Box<dyn ResultSet>))
    }

    async fn update_count(&mut self) -> DriverResult<Option<u64>> {
        self.check_open()?;
        Ok(self.last_update)
    }

    async fn set_max_rows(&mut self, max: u64) -> DriverResult<()> {
        self.check_open()?;
        self.max_rows = Some(max);
        Ok(())
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.closed = true;
        Ok(())
    }
}

pub struct MemoryResultSet {
    table: Table,
    cursor: Option<usize>,
    closed: bool,
}

impl MemoryResultSet {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            cursor: None,
            closed: false,
        }
    }

    /// Raw result set for `sql`, bypassing any statement.
    pub fn for_query(sql: &str) -> Box<dyn ResultSet> {
        Box::new(Self::new(run_query(sql).unwrap()))
    }

    fn current(&self, column: usize) -> DriverResult<&Value> {
        if self.closed {
            return Err(DriverError::Closed("ResultSet"));
        }
        let row = self
            .cursor
            .and_then(|cursor| self.table.rows.get(cursor))
            .ok_or_else(|| DriverError::database(Some("24000"), "no current row"))?;
        column
            .checked_sub(1)
            .and_then(|index| row.get(index))
            .ok_or_else(|| {
                DriverError::database(Some("22023"), format!("column index {column} out of range"))
            })
    }
}

#[async_trait]
impl ResultSet for MemoryResultSet {
    async fn next(&mut self) -> DriverResult<bool> {
        if self.closed {
            return Err(DriverError::Closed("ResultSet"));
        }
        let position = self.cursor.map_or(0, |cursor| cursor + 1);
        self.cursor = Some(position.min(self.table.rows.len()));
        Ok(position < self.table.rows.len())
    }

    async fn get_value(&self, column: usize) -> DriverResult<Value> {
        self.current(column).cloned()
    }

    async fn get_i64(&self, column: usize) -> DriverResult<Option<i64>> {
        match self.current(column)? {
            Value::Null => Ok(None),
            Value::Int(v) => Ok(Some(*v)),
            other => Err(DriverError::database(
                Some("22018"),
                format!("cannot convert {other} to i64"),
            )),
        }
    }

    async fn get_string(&self, column: usize) -> DriverResult<Option<String>> {
        match self.current(column)? {
            Value::Null => Ok(None),
            other => Ok(Some(other.to_string())),
        }
    }

    async fn metadata(&self) -> DriverResult<Box<dyn ResultSetMetadata>> {
        Ok(Box::new(MemoryResultSetMetadata {
            columns: self.table.columns.clone(),
        }))
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.closed = true;
        Ok(())
    }
}

pub struct MemoryResultSetMetadata {
    columns: Vec<Column>,
}

impl MemoryResultSetMetadata {
    fn column(&self, column: usize) -> DriverResult<&Column> {
        column
            .checked_sub(1)
            .and_then(|index| self.columns.get(index))
            .ok_or_else(|| {
                DriverError::database(Some("22023"), format!("column index {column} out of range"))
            })
    }
}

#[async_trait]
impl ResultSetMetadata for MemoryResultSetMetadata {
    async fn column_count(&self) -> DriverResult<usize> {
        Ok(self.columns.len())
    }

    async fn column_name(&self, column: usize) -> DriverResult<String> {
        Ok(self.column(column)?.name.to_owned())
    }

    async fn column_label(&self, column: usize) -> DriverResult<String> {
        Ok(self.column(column)?.name.to_uppercase())
    }

    async fn column_type_name(&self, column: usize) -> DriverResult<String> {
        Ok(self.column(column)?.type_name.to_owned())
    }

    async fn is_nullable(&self, column: usize) -> DriverResult<bool> {
        Ok(self.column(column)?.nullable)
    }
}

pub struct MemoryDatabaseMetadata {
    driver_name: String,
    url: String,
}

#[async_trait]
impl DatabaseMetadata for MemoryDatabaseMetadata {
    async fn product_name(&self) -> DriverResult<String> {
        Ok("MemoryDB".into())
    }

    async fn product_version(&self) -> DriverResult<String> {
        Ok("1.0".into())
    }

    async fn driver_name(&self) -> DriverResult<String> {
        Ok(self.driver_name.clone())
    }

    async fn url(&self) -> DriverResult<String> {
        Ok(self.url.clone())
    }

    async fn catalogs(&self) -> DriverResult<Box<dyn ResultSet>> {
        Ok(Box::new(MemoryResultSet::new(Table {
            columns: vec![column("catalog", "text", false)],
            rows: vec![vec![Value::from("main")], vec![Value::from("temp")]],
        })))
    }

    async fn tables(
        &self,
        _catalog: Option<&str>,
        _schema_pattern: Option<&str>,
        table_pattern: &str,
    ) -> DriverResult<Box<dyn ResultSet>> {
        let rows = ["users"]
            .iter()
            .filter(|name| table_pattern == "%" || table_pattern == **name)
            .map(|name| vec![Value::from(*name)])
            .collect();
        Ok(Box::new(MemoryResultSet::new(Table {
            columns: vec![column("table_name", "text", false)],
            rows,
        })))
    }
}

const PING: Operation = Operation::new("ping", &[], "String");
const ECHO: Operation = Operation::new("echo", &["Value"], "Value");
const ECHO_TWICE: Operation = Operation::new("echo", &["Value", "Value"], "Value");
const SESSION: Operation = Operation::new("session", &[], "Capability");
const LOOKUP: Operation = Operation::new("lookup", &["&str"], "Option<Capability>");
const FAIL: Operation = Operation::new("fail", &[], "()");
const SESSION_ID: Operation = Operation::new("id", &[], "i64");

/// Vendor capability with no dedicated wrapper.
pub struct VendorExtension {
    calls: Arc<AtomicUsize>,
}

impl VendorExtension {
    pub fn new(calls: Arc<AtomicUsize>) -> Self {
        Self { calls }
    }
}

#[async_trait]
impl Capability for VendorExtension {
    fn type_name(&self) -> &str {
        "VendorExtension"
    }

    fn operations(&self) -> Vec<Operation> {
        vec![PING, ECHO, ECHO_TWICE, SESSION, LOOKUP, FAIL]
    }

    async fn invoke(&self, operation: &str, args: Vec<Value>) -> DriverResult<Reply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match operation {
            "ping" => Ok(Reply::Value(Value::from("pong"))),
            "echo" => Ok(Reply::Value(args.into_iter().last().unwrap_or(Value::Null))),
            "session" => Ok(Reply::Capability(Some(Box::new(VendorSession)))),
            "lookup" => Ok(Reply::Capability(None)),
            "fail" => Err(DriverError::database(Some("XX000"), "vendor failure")),
            other => Err(DriverError::database(None, format!("unknown operation {other}"))),
        }
    }
}

pub struct VendorSession;

#[async_trait]
impl Capability for VendorSession {
    fn type_name(&self) -> &str {
        "VendorSession"
    }

    fn operations(&self) -> Vec<Operation> {
        vec![SESSION_ID]
    }

    async fn invoke(&self, operation: &str, _args: Vec<Value>) -> DriverResult<Reply> {
        match operation {
            "id" => Ok(Reply::Value(Value::Int(7))),
            other => Err(DriverError::database(None, format!("unknown operation {other}"))),
        }
    }
}
