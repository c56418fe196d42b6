//! SQL construction: tokens, expressions, the query builder, dialects,
//! and the generator that turns a plan + bindings into a query.

pub mod dialect;
pub mod expr;
pub mod generate;
pub mod numeric;
pub mod query;
pub mod token;

pub use dialect::{Dialect, SqlDialect};
pub use expr::{Expr, ExprExt};
pub use generate::{GeneratedQuery, QueryMetadata, SqlGenerator};
pub use query::{Cte, Join, JoinType, OrderByExpr, Query, SelectExpr, SortDir, TableRef};
pub use token::{Token, TokenStream};
