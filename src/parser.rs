//! SQL classification used to enrich query spans.

use once_cell::sync::Lazy;
use regex::Regex;

/// Leading keyword class of a SQL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlOperation {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Drop,
    Alter,
    Truncate,
    Begin,
    Commit,
    Rollback,
    Other,
}

impl SqlOperation {
    /// Returns the operation as recorded in `db.operation`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlOperation::Select => "SELECT",
            SqlOperation::Insert => "INSERT",
            SqlOperation::Update => "UPDATE",
            SqlOperation::Delete => "DELETE",
            SqlOperation::Create => "CREATE",
            SqlOperation::Drop => "DROP",
            SqlOperation::Alter => "ALTER",
            SqlOperation::Truncate => "TRUNCATE",
            SqlOperation::Begin => "BEGIN",
            SqlOperation::Commit => "COMMIT",
            SqlOperation::Rollback => "ROLLBACK",
            SqlOperation::Other => "QUERY",
        }
    }

    fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "SELECT" | "WITH" | "VALUES" => SqlOperation::Select,
            "INSERT" => SqlOperation::Insert,
            "UPDATE" => SqlOperation::Update,
            "DELETE" => SqlOperation::Delete,
            "CREATE" => SqlOperation::Create,
            "DROP" => SqlOperation::Drop,
            "ALTER" => SqlOperation::Alter,
            "TRUNCATE" => SqlOperation::Truncate,
            "BEGIN" | "START" => SqlOperation::Begin,
            "COMMIT" => SqlOperation::Commit,
            "ROLLBACK" => SqlOperation::Rollback,
            _ => SqlOperation::Other,
        }
    }

    fn table_pattern(&self) -> Option<&'static Regex> {
        let index = match self {
            SqlOperation::Select => 0,
            SqlOperation::Insert => 1,
            SqlOperation::Update => 2,
            SqlOperation::Delete => 3,
            SqlOperation::Create => 4,
            SqlOperation::Drop => 5,
            SqlOperation::Alter => 6,
            SqlOperation::Truncate => 7,
            _ => return None,
        };
        TABLE_PATTERNS.get(index)
    }
}

impl std::fmt::Display for SqlOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const IDENT: &str = r#"[`"\[]?(\w+)[`"\]]?"#;

// Indexed by `SqlOperation::table_pattern`.
static TABLE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\bFROM\s+",
        r"\bINSERT\s+INTO\s+",
        r"\bUPDATE\s+",
        r"\bDELETE\s+FROM\s+",
        r"\bCREATE\s+(?:TEMP(?:ORARY)?\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?",
        r"\bDROP\s+TABLE\s+(?:IF\s+EXISTS\s+)?",
        r"\bALTER\s+TABLE\s+",
        r"\bTRUNCATE\s+(?:TABLE\s+)?",
    ]
    .iter()
    .map(|prefix| {
        Regex::new(&format!("(?i){prefix}{IDENT}")).expect("table pattern must compile")
    })
    .collect()
});

static LEADING_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\s(]*([A-Za-z]+)").expect("keyword pattern must compile"));

/// Classify a statement by its leading keyword.
pub fn parse_operation(sql: &str) -> SqlOperation {
    LEADING_KEYWORD
        .captures(sql)
        .and_then(|caps| caps.get(1))
        .map(|m| SqlOperation::from_keyword(&m.as_str().to_ascii_uppercase()))
        .unwrap_or(SqlOperation::Other)
}

/// Extract the primary table name from a SQL query.
///
/// Returns `None` if the table cannot be determined.
pub fn extract_table(sql: &str) -> Option<String> {
    parse_operation(sql)
        .table_pattern()?
        .captures(sql)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
}

/// Parsed SQL information attached to query spans.
#[derive(Debug)]
pub struct ParsedSql {
    pub operation: SqlOperation,
    pub table: Option<String>,
}

impl ParsedSql {
    pub fn parse(sql: &str) -> Self {
        Self {
            operation: parse_operation(sql),
            table: extract_table(sql),
        }
    }
}

/// Label used for spans of calls that turn query text into a cursor.
pub fn query_label(sql: &str) -> String {
    format!("SQL: [{}]", sql.trim())
}
