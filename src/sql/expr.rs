//! Expression AST - the core of SQL expression building.
//!
//! A strongly-typed AST for SQL expressions with exhaustive pattern
//! matching enforced by the compiler. Filter values from resolved entities
//! only ever enter as `Literal` variants, which the token layer escapes.

use super::dialect::{Dialect, SqlDialect};
use super::token::{Token, TokenStream};

// =============================================================================
// Expression AST
// =============================================================================

/// A SQL expression.
///
/// Every variant must be handled in `to_tokens_for_dialect()` - the
/// compiler enforces this.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference: optional_table.column
    Column {
        table: Option<String>,
        column: String,
    },

    /// Literal values
    Literal(Literal),

    /// Binary operation: left op right
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    /// Unary operation: op expr
    UnaryOp { op: UnaryOperator, expr: Box<Expr> },

    /// Function call: name(args...)
    Function {
        name: String,
        args: Vec<Expr>,
        distinct: bool,
    },

    /// IN: expr IN (values...)
    In {
        expr: Box<Expr>,
        values: Vec<Expr>,
        negated: bool,
    },

    /// BETWEEN: expr BETWEEN low AND high
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },

    /// IS NULL / IS NOT NULL
    IsNull { expr: Box<Expr>, negated: bool },

    /// EXTRACT(unit FROM expr)
    Extract { unit: DateUnit, expr: Box<Expr> },

    /// Wildcard: * or table.*
    Star { table: Option<String> },

    /// Parenthesized expression
    Paren(Box<Expr>),

    /// Raw SQL expression passed directly to output without escaping.
    ///
    /// # Security Warning
    ///
    /// **Never pass user input to this variant.** Only schema-declared
    /// default-filter fragments use it; everything user-derived goes
    /// through `Expr::Literal`.
    Raw(String),
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    /// Case-insensitive equality: UPPER(left) = UPPER(right)
    CiEq,
    // Logical
    And,
    Or,
    // Arithmetic
    Plus,
    Minus,
    Mul,
    Div,
    // Pattern
    Like,
    /// Case-insensitive LIKE: native ILIKE or UPPER()-wrapped LIKE
    ILike,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
}

/// Date parts usable in EXTRACT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateUnit {
    Year,
    Quarter,
    Month,
    Day,
}

impl DateUnit {
    fn keyword(&self) -> &'static str {
        match self {
            DateUnit::Year => "YEAR",
            DateUnit::Quarter => "QUARTER",
            DateUnit::Month => "MONTH",
            DateUnit::Day => "DAY",
        }
    }
}

// =============================================================================
// Expression to Tokens
// =============================================================================

impl Expr {
    /// Convert this expression to a token stream for a specific dialect.
    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        match self {
            Expr::Column { table, column } => {
                if let Some(t) = table {
                    ts.push(Token::Ident(t.clone()));
                    ts.push(Token::Dot);
                }
                ts.push(Token::Ident(column.clone()));
            }

            Expr::Literal(lit) => {
                ts.push(match lit {
                    Literal::Int(n) => Token::LitInt(*n),
                    Literal::Float(f) => Token::LitFloat(*f),
                    Literal::String(s) => Token::LitString(s.clone()),
                    Literal::Bool(b) => Token::LitBool(*b),
                    Literal::Null => Token::LitNull,
                });
            }

            Expr::BinaryOp { left, op, right } => match op {
                BinaryOperator::CiEq => {
                    // UPPER() on both sides works on every supported dialect
                    ts.push(Token::FunctionName("UPPER".into()));
                    ts.lparen();
                    ts.append(&left.to_tokens_for_dialect(dialect));
                    ts.rparen();
                    ts.space().push(Token::Eq).space();
                    ts.push(Token::FunctionName("UPPER".into()));
                    ts.lparen();
                    ts.append(&right.to_tokens_for_dialect(dialect));
                    ts.rparen();
                }
                BinaryOperator::ILike if !dialect.supports_ilike() => {
                    ts.push(Token::FunctionName("UPPER".into()));
                    ts.lparen();
                    ts.append(&left.to_tokens_for_dialect(dialect));
                    ts.rparen();
                    ts.space().push(Token::Like).space();
                    ts.push(Token::FunctionName("UPPER".into()));
                    ts.lparen();
                    ts.append(&right.to_tokens_for_dialect(dialect));
                    ts.rparen();
                }
                _ => {
                    ts.append(&left.to_tokens_for_dialect(dialect));
                    ts.space();
                    ts.push(binary_op_to_token(*op));
                    ts.space();
                    ts.append(&right.to_tokens_for_dialect(dialect));
                }
            },

            Expr::UnaryOp { op, expr } => {
                ts.push(match op {
                    UnaryOperator::Not => Token::Not,
                    UnaryOperator::Minus => Token::Minus,
                });
                ts.space();
                ts.append(&expr.to_tokens_for_dialect(dialect));
            }

            Expr::Function {
                name,
                args,
                distinct,
            } => {
                ts.push(Token::FunctionName(name.clone()));
                ts.lparen();
                if *distinct {
                    ts.push(Token::Distinct).space();
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        ts.comma().space();
                    }
                    ts.append(&arg.to_tokens_for_dialect(dialect));
                }
                ts.rparen();
            }

            Expr::In {
                expr,
                values,
                negated,
            } => {
                // Empty IN list: "x IN ()" is invalid SQL.
                // "x IN ()" is vacuously FALSE, "x NOT IN ()" vacuously TRUE.
                if values.is_empty() {
                    ts.push(if *negated { Token::True } else { Token::False });
                } else {
                    ts.append(&expr.to_tokens_for_dialect(dialect));
                    if *negated {
                        ts.space().push(Token::Not);
                    }
                    ts.space().push(Token::In).space().lparen();
                    for (i, val) in values.iter().enumerate() {
                        if i > 0 {
                            ts.comma().space();
                        }
                        ts.append(&val.to_tokens_for_dialect(dialect));
                    }
                    ts.rparen();
                }
            }

            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                ts.append(&expr.to_tokens_for_dialect(dialect));
                if *negated {
                    ts.space().push(Token::Not);
                }
                ts.space().push(Token::Between).space();
                ts.append(&low.to_tokens_for_dialect(dialect));
                ts.space().push(Token::And).space();
                ts.append(&high.to_tokens_for_dialect(dialect));
            }

            Expr::IsNull { expr, negated } => {
                ts.append(&expr.to_tokens_for_dialect(dialect));
                ts.space();
                ts.push(if *negated {
                    Token::IsNotNull
                } else {
                    Token::IsNull
                });
            }

            Expr::Extract { unit, expr } => {
                ts.push(Token::Extract);
                ts.lparen();
                ts.push(Token::Raw(unit.keyword().into()));
                ts.space().push(Token::From).space();
                ts.append(&expr.to_tokens_for_dialect(dialect));
                ts.rparen();
            }

            Expr::Star { table } => {
                if let Some(t) = table {
                    ts.push(Token::Ident(t.clone()));
                    ts.push(Token::Dot);
                }
                ts.push(Token::Star);
            }

            Expr::Paren(inner) => {
                ts.lparen();
                ts.append(&inner.to_tokens_for_dialect(dialect));
                ts.rparen();
            }

            Expr::Raw(sql) => {
                ts.push(Token::Raw(sql.clone()));
            }
        }

        ts
    }
}

fn binary_op_to_token(op: BinaryOperator) -> Token {
    match op {
        BinaryOperator::Eq => Token::Eq,
        BinaryOperator::Ne => Token::Ne,
        BinaryOperator::Lt => Token::Lt,
        BinaryOperator::Gt => Token::Gt,
        BinaryOperator::Lte => Token::Lte,
        BinaryOperator::Gte => Token::Gte,
        BinaryOperator::And => Token::And,
        BinaryOperator::Or => Token::Or,
        BinaryOperator::Plus => Token::Plus,
        BinaryOperator::Minus => Token::Minus,
        BinaryOperator::Mul => Token::Mul,
        BinaryOperator::Div => Token::Div,
        BinaryOperator::Like => Token::Like,
        // CiEq and ILike are rewritten in to_tokens_for_dialect
        BinaryOperator::CiEq => Token::Eq,
        BinaryOperator::ILike => Token::Raw("ILIKE".into()),
    }
}

// =============================================================================
// Constructors
// =============================================================================

/// Unqualified column reference.
pub fn col(name: &str) -> Expr {
    Expr::Column {
        table: None,
        column: name.into(),
    }
}

/// Table-qualified column reference.
pub fn table_col(table: &str, column: &str) -> Expr {
    Expr::Column {
        table: Some(table.into()),
        column: column.into(),
    }
}

pub fn lit_int(n: i64) -> Expr {
    Expr::Literal(Literal::Int(n))
}

pub fn lit_float(f: f64) -> Expr {
    Expr::Literal(Literal::Float(f))
}

pub fn lit_str(s: &str) -> Expr {
    Expr::Literal(Literal::String(s.into()))
}

pub fn lit_bool(b: bool) -> Expr {
    Expr::Literal(Literal::Bool(b))
}

pub fn lit_null() -> Expr {
    Expr::Literal(Literal::Null)
}

pub fn star() -> Expr {
    Expr::Star { table: None }
}

pub fn func(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Function {
        name: name.into(),
        args,
        distinct: false,
    }
}

pub fn sum(expr: Expr) -> Expr {
    func("SUM", vec![expr])
}

pub fn avg(expr: Expr) -> Expr {
    func("AVG", vec![expr])
}

pub fn min(expr: Expr) -> Expr {
    func("MIN", vec![expr])
}

pub fn max(expr: Expr) -> Expr {
    func("MAX", vec![expr])
}

pub fn count(expr: Expr) -> Expr {
    func("COUNT", vec![expr])
}

pub fn count_star() -> Expr {
    func("COUNT", vec![star()])
}

pub fn count_distinct(expr: Expr) -> Expr {
    Expr::Function {
        name: "COUNT".into(),
        args: vec![expr],
        distinct: true,
    }
}

pub fn extract(unit: DateUnit, expr: Expr) -> Expr {
    Expr::Extract {
        unit,
        expr: Box::new(expr),
    }
}

// =============================================================================
// Fluent combinators
// =============================================================================

/// Fluent helpers for building predicates.
pub trait ExprExt: Sized {
    fn into_expr(self) -> Expr;

    fn binop(self, op: BinaryOperator, rhs: Expr) -> Expr {
        Expr::BinaryOp {
            left: Box::new(self.into_expr()),
            op,
            right: Box::new(rhs),
        }
    }

    fn eq(self, rhs: impl Into<Expr>) -> Expr {
        self.binop(BinaryOperator::Eq, rhs.into())
    }
    fn ne(self, rhs: impl Into<Expr>) -> Expr {
        self.binop(BinaryOperator::Ne, rhs.into())
    }
    fn lt(self, rhs: impl Into<Expr>) -> Expr {
        self.binop(BinaryOperator::Lt, rhs.into())
    }
    fn gt(self, rhs: impl Into<Expr>) -> Expr {
        self.binop(BinaryOperator::Gt, rhs.into())
    }
    fn lte(self, rhs: impl Into<Expr>) -> Expr {
        self.binop(BinaryOperator::Lte, rhs.into())
    }
    fn gte(self, rhs: impl Into<Expr>) -> Expr {
        self.binop(BinaryOperator::Gte, rhs.into())
    }
    fn ci_eq(self, rhs: impl Into<Expr>) -> Expr {
        self.binop(BinaryOperator::CiEq, rhs.into())
    }
    fn and(self, rhs: impl Into<Expr>) -> Expr {
        self.binop(BinaryOperator::And, rhs.into())
    }
    fn or(self, rhs: impl Into<Expr>) -> Expr {
        self.binop(BinaryOperator::Or, rhs.into())
    }
    fn like(self, pattern: impl Into<Expr>) -> Expr {
        self.binop(BinaryOperator::Like, pattern.into())
    }
    fn ilike(self, pattern: impl Into<Expr>) -> Expr {
        self.binop(BinaryOperator::ILike, pattern.into())
    }

    fn paren(self) -> Expr {
        Expr::Paren(Box::new(self.into_expr()))
    }

    fn in_list(self, values: Vec<Expr>) -> Expr {
        Expr::In {
            expr: Box::new(self.into_expr()),
            values,
            negated: false,
        }
    }

    fn between(self, low: Expr, high: Expr) -> Expr {
        Expr::Between {
            expr: Box::new(self.into_expr()),
            low: Box::new(low),
            high: Box::new(high),
            negated: false,
        }
    }

    fn is_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into_expr()),
            negated: false,
        }
    }

    fn is_not_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into_expr()),
            negated: true,
        }
    }

    fn alias(self, alias: &str) -> super::query::SelectExpr {
        super::query::SelectExpr::new(self.into_expr()).with_alias(alias)
    }
}

impl ExprExt for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        lit_bool(b)
    }
}

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        lit_int(n)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        lit_str(s)
    }
}

/// Fold a list of predicates into one expression joined by AND.
///
/// Returns `None` for an empty list. Ordering is preserved, which keeps
/// serialization deterministic.
pub fn and_all(conditions: impl IntoIterator<Item = Expr>) -> Option<Expr> {
    conditions.into_iter().reduce(|acc, c| acc.and(c))
}
