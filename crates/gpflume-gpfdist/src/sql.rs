//! SQL generation for the external-table load path.
//!
//! A bulk-load pass materializes the listener's locations as a readable
//! external table, copies it into the target table, and drops the
//! external table again. Statement execution goes through the
//! [`SqlExecutor`] seam so this crate carries no database driver.

use crate::load::{BulkLoad, LoadError, RuntimeContext};

/// Executes one SQL statement against the warehouse.
pub trait SqlExecutor: Send + Sync {
    fn execute(&self, sql: &str) -> Result<(), LoadError>;
}

/// `CREATE READABLE EXTERNAL TABLE` over gpfdist locations, structured
/// like the target table.
pub fn create_external_table(
    name: &str,
    like_table: &str,
    locations: &[String],
    delimiter: Option<&str>,
) -> String {
    let locations = locations
        .iter()
        .map(|l| format!("'{l}'"))
        .collect::<Vec<_>>()
        .join(", ");
    let mut sql = format!(
        "CREATE READABLE EXTERNAL TABLE {name} (LIKE {like_table}) \
         LOCATION({locations}) FORMAT 'TEXT'"
    );
    if let Some(d) = delimiter {
        sql.push_str(&format!(" (DELIMITER E'{}')", escape_delimiter(d)));
    }
    sql
}

pub fn insert_into(target: &str, external: &str) -> String {
    format!("INSERT INTO {target} SELECT * FROM {external}")
}

pub fn drop_external_table(name: &str) -> String {
    format!("DROP EXTERNAL TABLE IF EXISTS {name}")
}

/// Escape a delimiter for use inside an `E'...'` literal
fn escape_delimiter(d: &str) -> String {
    let mut out = String::with_capacity(d.len() * 2);
    for c in d.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

/// [`BulkLoad`] implementation that drives the three-statement
/// external-table pass through a [`SqlExecutor`].
pub struct SqlBulkLoad<E> {
    executor: E,
    target_table: String,
    delimiter: Option<String>,
}

impl<E: SqlExecutor> SqlBulkLoad<E> {
    pub fn new(executor: E, target_table: impl Into<String>, delimiter: Option<String>) -> Self {
        Self {
            executor,
            target_table: target_table.into(),
            delimiter,
        }
    }
}

impl<E: SqlExecutor> BulkLoad for SqlBulkLoad<E> {
    fn load(&self, context: &RuntimeContext) -> Result<(), LoadError> {
        if context.locations().is_empty() {
            return Err("no gpfdist locations to load from".into());
        }
        let external = format!("{}_ext", self.target_table);
        self.executor.execute(&create_external_table(
            &external,
            &self.target_table,
            context.locations(),
            self.delimiter.as_deref(),
        ))?;
        let inserted = self
            .executor
            .execute(&insert_into(&self.target_table, &external));
        // Always try to drop so a failed insert doesn't leak the table
        let dropped = self.executor.execute(&drop_external_table(&external));
        inserted?;
        dropped
    }
}
