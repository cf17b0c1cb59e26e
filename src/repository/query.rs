//! SQL text for repository operations
//!
//! Only the shape of a statement is assembled here. Every caller-supplied
//! value travels as a bound argument, and a placeholder is only ever
//! produced by pushing its argument, so placeholder numbers and argument
//! positions stay in step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{Dialect, SqlValue, TABLE};

pub const DEFAULT_SEARCH_LIMIT: i64 = 100;
pub const MAX_SEARCH_LIMIT: i64 = 1000;

const COLUMNS: &str = "id, level, message, timestamp";

/// Optional filters for searching log entries
///
/// Empty strings and `None` values are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchParams {
    /// Exact level match
    pub level: Option<String>,
    /// Case-insensitive substring of the message
    pub message_contains: Option<String>,
    /// Inclusive lower time bound
    pub since: Option<DateTime<Utc>>,
    /// Inclusive upper time bound
    pub until: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl SearchParams {
    /// Requested limit, defaulted when non-positive and capped at [`MAX_SEARCH_LIMIT`]
    pub fn effective_limit(&self) -> i64 {
        if self.limit <= 0 {
            DEFAULT_SEARCH_LIMIT
        } else {
            self.limit.min(MAX_SEARCH_LIMIT)
        }
    }

    pub fn effective_offset(&self) -> i64 {
        self.offset.max(0)
    }

    fn level_filter(&self) -> Option<&str> {
        self.level.as_deref().filter(|s| !s.is_empty())
    }

    fn message_filter(&self) -> Option<&str> {
        self.message_contains.as_deref().filter(|s| !s.is_empty())
    }
}

/// Statement text plus its arguments in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<SqlValue>,
}

pub fn select_by_id(dialect: Dialect, id: i64) -> Statement {
    Statement {
        sql: format!(
            "SELECT {COLUMNS} FROM {TABLE} WHERE id = {}",
            dialect.placeholder(1)
        ),
        args: vec![SqlValue::Int(id)],
    }
}

pub fn select_all() -> Statement {
    Statement {
        sql: format!("SELECT {COLUMNS} FROM {TABLE}"),
        args: Vec::new(),
    }
}

/// Insert a new row and return it with its generated id
pub fn insert(dialect: Dialect, level: &str, message: &str, timestamp: DateTime<Utc>) -> Statement {
    Statement {
        sql: format!(
            "INSERT INTO {TABLE} (level, message, timestamp) VALUES ({}, {}, {}) RETURNING {COLUMNS}",
            dialect.placeholder(1),
            dialect.placeholder(2),
            dialect.placeholder(3),
        ),
        args: vec![level.into(), message.into(), timestamp.into()],
    }
}

/// Insert-or-update keyed on id
pub fn upsert(
    dialect: Dialect,
    id: i64,
    level: &str,
    message: &str,
    timestamp: DateTime<Utc>,
) -> Statement {
    Statement {
        sql: format!(
            "INSERT INTO {TABLE} (id, level, message, timestamp) VALUES ({}, {}, {}, {}) \
             ON CONFLICT (id) DO UPDATE SET \
             level = excluded.level, message = excluded.message, timestamp = excluded.timestamp",
            dialect.placeholder(1),
            dialect.placeholder(2),
            dialect.placeholder(3),
            dialect.placeholder(4),
        ),
        args: vec![id.into(), level.into(), message.into(), timestamp.into()],
    }
}

/// Conjunctive filter builder starting from an always-true predicate
#[derive(Debug)]
pub struct SearchQuery {
    dialect: Dialect,
    predicates: Vec<String>,
    args: Vec<SqlValue>,
}

impl SearchQuery {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            predicates: vec!["1=1".to_string()],
            args: Vec::new(),
        }
    }

    pub fn from_params(dialect: Dialect, params: &SearchParams) -> Self {
        let mut query = Self::new(dialect);

        if let Some(level) = params.level_filter() {
            query.and(level.into(), |p| format!("level = {p}"));
        }
        if let Some(needle) = params.message_filter() {
            let op = dialect.case_insensitive_like();
            let pattern = format!("%{}%", escape_like(needle));
            query.and(pattern.into(), |p| format!("message {op} {p} ESCAPE '\\'"));
        }
        if let Some(since) = params.since {
            query.and(since.into(), |p| format!("timestamp >= {p}"));
        }
        if let Some(until) = params.until {
            query.and(until.into(), |p| format!("timestamp <= {p}"));
        }

        query
    }

    /// Bind `value` and append the predicate rendered around its placeholder.
    pub fn and(&mut self, value: SqlValue, render: impl FnOnce(&str) -> String) -> &mut Self {
        let placeholder = self.bind(value);
        self.predicates.push(render(&placeholder));
        self
    }

    fn bind(&mut self, value: SqlValue) -> String {
        self.args.push(value);
        self.dialect.placeholder(self.args.len())
    }

    pub fn where_clause(&self) -> String {
        self.predicates.join(" AND ")
    }

    /// Finish with newest-first ordering and bound LIMIT / OFFSET.
    pub fn build(mut self, limit: i64, offset: i64) -> Statement {
        let where_clause = self.where_clause();
        let limit_placeholder = self.bind(SqlValue::Int(limit));
        let offset_placeholder = self.bind(SqlValue::Int(offset));

        Statement {
            sql: format!(
                "SELECT {COLUMNS} FROM {TABLE} WHERE {where_clause} \
                 ORDER BY timestamp DESC LIMIT {limit_placeholder} OFFSET {offset_placeholder}"
            ),
            args: self.args,
        }
    }
}

/// Escape LIKE wildcards so the value matches literally.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
