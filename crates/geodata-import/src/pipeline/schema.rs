//! Table names, column and index declarations, and the SQL they render to

use std::fmt;

use crate::error::{DatasetError, Result};

/// Prefix of the private name a table is staged under
pub const STAGED_PREFIX: &str = "_tmp_";

// Postgres truncates identifiers longer than this
const MAX_IDENTIFIER_LEN: usize = 63;

/// Validate a bare SQL identifier: lowercase ASCII letters, digits, `_`
///
/// Names are interpolated into DDL, so anything else is refused rather
/// than quoted.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if !valid_start || !valid_rest || name.len() > MAX_IDENTIFIER_LEN {
        return Err(DatasetError::Validation(format!("Invalid SQL identifier: '{}'", name)));
    }
    Ok(())
}

/// Render `value` as a SQL string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Render a catalog name as a quoted SQL identifier
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Public table and the private name it is built under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedTable {
    target: String,
    staged: String,
}

impl StagedTable {
    pub fn new(target: &str) -> Result<Self> {
        validate_identifier(target)?;
        let staged = format!("{}{}", STAGED_PREFIX, target);
        validate_identifier(&staged)?;

        Ok(Self {
            target: target.to_string(),
            staged,
        })
    }

    /// Name downstream consumers query
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Private name used until publication
    pub fn name(&self) -> &str {
        &self.staged
    }

    pub(crate) fn drop_staged_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {} CASCADE", self.staged)
    }

    pub(crate) fn drop_target_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {} CASCADE", self.target)
    }

    pub(crate) fn analyze_sql(&self) -> String {
        format!("ANALYZE {}", self.staged)
    }

    pub(crate) fn rename_sql(&self) -> String {
        format!("ALTER TABLE {} RENAME TO {}", self.staged, self.target)
    }

    /// Public name for a constraint, index or sequence named after the staged table
    ///
    /// Loaders that create the table themselves derive such names from it
    /// (`_tmp_<target>_pk`). Table renames leave them alone, so they have to
    /// be renamed before the next staged table reuses them.
    pub fn published_name(&self, object: &str) -> Option<String> {
        object
            .strip_prefix(self.staged.as_str())
            .map(|suffix| format!("{}{}", self.target, suffix))
    }

    pub(crate) fn rename_constraint_sql(&self, from: &str, to: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME CONSTRAINT {} TO {}",
            self.staged,
            quote_identifier(from),
            quote_identifier(to)
        )
    }
}

/// Relations that take their name from the table they belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DependentRelation {
    Index,
    Sequence,
}

impl DependentRelation {
    /// From a `pg_class.relkind` value
    pub(crate) fn from_relkind(relkind: &str) -> Option<Self> {
        match relkind {
            "i" => Some(DependentRelation::Index),
            "S" => Some(DependentRelation::Sequence),
            _ => None,
        }
    }

    pub(crate) fn rename_sql(&self, from: &str, to: &str) -> String {
        let keyword = match self {
            DependentRelation::Index => "INDEX",
            DependentRelation::Sequence => "SEQUENCE",
        };
        format!(
            "ALTER {} {} RENAME TO {}",
            keyword,
            quote_identifier(from),
            quote_identifier(to)
        )
    }
}

impl fmt::Display for StagedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.staged)
    }
}

/// One column of a staged table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: String,
    pub comment: Option<String>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// How the staged table comes into existence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSchema {
    /// The importer creates the table with these columns, in order
    Columns(Vec<ColumnDef>),
    /// The row loader creates the table itself (external loaders)
    CreatedByLoader,
}

impl TableSchema {
    /// Statements creating the staged table and commenting its columns
    pub(crate) fn create_statements(&self, table: &StagedTable) -> Result<Vec<String>> {
        let columns = match self {
            TableSchema::Columns(columns) => columns,
            TableSchema::CreatedByLoader => return Ok(Vec::new()),
        };

        if columns.is_empty() {
            return Err(DatasetError::Validation(format!(
                "Schema for {} declares no columns",
                table.target()
            )));
        }

        let mut definitions = Vec::with_capacity(columns.len());
        for column in columns {
            validate_identifier(&column.name)?;
            definitions.push(format!("{} {}", column.name, column.sql_type));
        }

        let mut statements = vec![format!(
            "CREATE TABLE {} (\n    {}\n)",
            table.name(),
            definitions.join(",\n    ")
        )];
        statements.extend(columns.iter().filter_map(|column| {
            column.comment.as_ref().map(|comment| {
                format!(
                    "COMMENT ON COLUMN {}.{} IS {}",
                    table.name(),
                    column.name,
                    quote_literal(comment)
                )
            })
        }));

        Ok(statements)
    }
}

/// Key or index declared for a loaded staged table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexDef {
    /// Primary key, named `<target>_pkey`
    PrimaryKey(Vec<String>),
    /// Secondary b-tree index
    Index { name: String, columns: Vec<String> },
    /// GiST index over a geometry column
    Spatial { name: String, column: String },
}

impl IndexDef {
    pub fn primary_key<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        IndexDef::PrimaryKey(columns.into_iter().map(Into::into).collect())
    }

    pub fn index<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        IndexDef::Index {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn spatial(name: impl Into<String>, column: impl Into<String>) -> Self {
        IndexDef::Spatial {
            name: name.into(),
            column: column.into(),
        }
    }

    pub(crate) fn create_sql(&self, table: &StagedTable) -> Result<String> {
        let columns = match self {
            IndexDef::PrimaryKey(columns) | IndexDef::Index { columns, .. } => columns.clone(),
            IndexDef::Spatial { column, .. } => vec![column.clone()],
        };
        if columns.is_empty() {
            return Err(DatasetError::Validation(format!(
                "Index on {} declares no columns",
                table.target()
            )));
        }
        for column in &columns {
            validate_identifier(column)?;
        }
        let column_list = columns.join(", ");

        match self {
            IndexDef::PrimaryKey(_) => {
                let constraint = format!("{}_pkey", table.target());
                validate_identifier(&constraint)?;
                Ok(format!(
                    "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
                    table.name(),
                    constraint,
                    column_list
                ))
            },
            IndexDef::Index { name, .. } => {
                validate_identifier(name)?;
                Ok(format!("CREATE INDEX {} ON {} ({})", name, table.name(), column_list))
            },
            IndexDef::Spatial { name, .. } => {
                validate_identifier(name)?;
                Ok(format!(
                    "CREATE INDEX {} ON {} USING GIST ({})",
                    name,
                    table.name(),
                    column_list
                ))
            },
        }
    }
}
