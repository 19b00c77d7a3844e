//! # quill
//!
//! Compiles declarative query trees into parameterized SQL commands.
//!
//! A [`QueryModel`] goes through three stages:
//!
//! 1. **Preparation**: clauses, result operators and method calls become an
//!    unresolved [`SqlStatement`](ir::SqlStatement).
//! 2. **Mapping resolution**: a [`MappingResolver`] maps types and members
//!    onto tables, columns and joins.
//! 3. **Generation**: the resolved statement is emitted as text plus
//!    parameters (`@1`, `@2`, ...).
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use quill::prelude::*;
//!
//! let resolver = SchemaMappingResolver::from_toml_str(SCHEMA)?;
//! let registry = MethodCallTransformerRegistry::with_defaults();
//!
//! let model = QueryModel::from_table("c", "Cook")
//!     .select(Expr::source("c", ValueType::entity("Cook")).member("FirstName", ValueType::String))
//!     .result_operator(ResultOperator::Take(Expr::int(5)));
//!
//! let command = QueryCompiler::new(&registry, &resolver).compile(&model)?;
//! // => "SELECT TOP (@1) [t0].[FirstName] FROM [CookTable] AS [t0]"
//! ```

pub mod config;
pub mod error;
pub mod generate;
pub mod ids;
pub mod ir;
pub mod mapping;
pub mod prepare;
pub mod query;
pub mod resolve;
pub mod transformer;
pub mod value;

pub use config::CompileOptions;
pub use error::{QuillError, QuillResult};
pub use generate::{CommandParameter, Dialect, SqlCommand};
pub use query::QueryModel;
pub use resolve::MappingResolver;
pub use transformer::MethodCallTransformerRegistry;

use generate::generate_command;
use ids::UniqueIdentifierGenerator;
use prepare::prepare_query_model;
use resolve::resolve_statement;

pub mod prelude {
    pub use crate::config::CompileOptions;
    pub use crate::error::*;
    pub use crate::generate::{Dialect, SqlCommand};
    pub use crate::mapping::{MappingSchema, SchemaMappingResolver};
    pub use crate::query::{BinaryOperator, Expr, FromClause, Ordering, QueryModel, ResultOperator};
    pub use crate::resolve::MappingResolver;
    pub use crate::transformer::{MethodCallTransformerRegistry, MethodSignature};
    pub use crate::value::{Value, ValueType};
    pub use crate::{QueryCompiler, compile};
}

/// Runs the three stages against a shared registry and resolver.
///
/// Both collaborators are only read, so one compiler (or several) can
/// compile concurrently once registration is complete.
pub struct QueryCompiler<'a> {
    registry: &'a MethodCallTransformerRegistry,
    resolver: &'a dyn MappingResolver,
    options: CompileOptions,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(registry: &'a MethodCallTransformerRegistry, resolver: &'a dyn MappingResolver) -> Self {
        Self {
            registry,
            resolver,
            options: CompileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn compile(&self, model: &QueryModel) -> QuillResult<SqlCommand> {
        let generator = self.options.dialect.generator();
        let mut ids = UniqueIdentifierGenerator::new();

        let prepared = prepare_query_model(model, self.registry, &mut ids)?;
        tracing::debug!(query = %model, tables = prepared.sql_tables().len(), "prepared statement");

        let native_boolean = self.options.native_boolean(generator.as_ref());
        let resolved = resolve_statement(&prepared, self.resolver, &mut ids, native_boolean)?;
        tracing::debug!(native_boolean, "resolved statement");

        let command = generate_command(&resolved, generator.as_ref(), native_boolean)?;
        tracing::debug!(
            dialect = generator.name(),
            sql = %command.command_text,
            parameters = command.parameters.len(),
            "generated command"
        );
        Ok(command)
    }
}

/// Compiles `model` in one call.
///
/// # Example
///
/// ```
/// use quill::prelude::*;
///
/// let resolver = SchemaMappingResolver::from_toml_str(r#"
///     [types.Cook]
///     table = "CookTable"
///     primary_key = "ID"
///     columns = [{ name = "ID", type = "Int32" }, { name = "FirstName", type = "String" }]
/// "#).unwrap();
/// let registry = MethodCallTransformerRegistry::with_defaults();
/// let model = QueryModel::from_table("c", "Cook")
///     .select(Expr::source("c", ValueType::entity("Cook")).member("FirstName", ValueType::String));
///
/// let command = compile(&model, &registry, &resolver, &CompileOptions::default()).unwrap();
/// assert_eq!(command.command_text, "SELECT [t0].[FirstName] FROM [CookTable] AS [t0]");
/// ```
pub fn compile(
    model: &QueryModel,
    registry: &MethodCallTransformerRegistry,
    resolver: &dyn MappingResolver,
    options: &CompileOptions,
) -> QuillResult<SqlCommand> {
    QueryCompiler::new(registry, resolver)
        .with_options(options.clone())
        .compile(model)
}
