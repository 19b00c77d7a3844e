//! Dialect hooks used while emitting command text.

/// Trait for dialect-specific SQL generation.
pub trait SqlGenerator: Send + Sync {
    /// Dialect name for diagnostics.
    fn name(&self) -> &'static str;
    /// Quote an identifier (table, alias or column name).
    fn quote_identifier(&self, name: &str) -> String;
    /// Parameter name for the 1-based `index`.
    fn placeholder(&self, index: usize) -> String;
    /// Binary operator concatenating two strings.
    fn string_concat_operator(&self) -> &str;
    /// Whether the dialect has a boolean type usable in both predicate and
    /// value positions.
    fn native_boolean(&self) -> bool {
        false
    }
}

/// Transact-SQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerGenerator;

impl SqlGenerator for SqlServerGenerator {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
    }

    fn placeholder(&self, index: usize) -> String {
        format!("@{}", index)
    }

    fn string_concat_operator(&self) -> &str {
        "+"
    }
}
