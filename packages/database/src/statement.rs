//! Parameterized statement assembly.
//!
//! Filter conditions are written with language-agnostic `{}` placeholder
//! markers and their argument values side by side. [`StatementBuilder`]
//! renumbers the markers into Postgres `$1..$n` positions globally across
//! all conditions at build time, so argument order can never drift from
//! placeholder order and no value is ever spliced into the SQL text.

use std::fmt::Write as _;

use crate::DbError;

/// An argument value for a parameterized statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// Double-precision float.
    Float(f64),
    /// 64-bit integer.
    Int(i64),
    /// 16-bit integer.
    SmallInt(i16),
    /// Text value.
    Text(String),
}

/// One filter condition: a boolean SQL fragment with `{}` markers plus
/// the values that fill them, in order. Owned by a single
/// [`StatementBuilder`] and discarded once the statement is built.
#[derive(Debug, Clone)]
struct SqlCondition {
    clause: String,
    args: Vec<SqlValue>,
}

/// Builds a `SELECT` statement from a base clause, a set of filter
/// conditions joined with `AND`, and an ordering/limit tail.
///
/// Conditions are gated by an allow list of filterable field names, so a
/// filter referencing an unknown field fails validation before the
/// statement can reach the store.
#[derive(Debug)]
pub struct StatementBuilder {
    base: String,
    allowed_fields: &'static [&'static str],
    conditions: Vec<SqlCondition>,
    order_by: Option<String>,
    limit: Option<i64>,
}

impl StatementBuilder {
    /// Creates a builder over the given base `SELECT ... FROM ...`
    /// clause, restricted to conditions on the listed fields.
    #[must_use]
    pub fn new(base: &str, allowed_fields: &'static [&'static str]) -> Self {
        Self {
            base: base.to_string(),
            allowed_fields,
            conditions: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    /// Adds a filter condition on `field`.
    ///
    /// The clause may mix `AND`/`OR` freely; it is parenthesized as a
    /// unit when joined with other conditions.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Validation`] if `field` is not filterable or
    /// the `{}` marker count does not match the argument count.
    pub fn condition_on(
        &mut self,
        field: &str,
        clause: &str,
        args: Vec<SqlValue>,
    ) -> Result<&mut Self, DbError> {
        if !self.allowed_fields.contains(&field) {
            return Err(DbError::Validation {
                message: format!("unrecognized filter field: {field}"),
            });
        }

        let markers = clause.matches("{}").count();
        if markers != args.len() {
            return Err(DbError::Validation {
                message: format!(
                    "condition on {field} has {markers} placeholders but {} arguments",
                    args.len()
                ),
            });
        }

        self.conditions.push(SqlCondition {
            clause: clause.to_string(),
            args,
        });
        Ok(self)
    }

    /// Sets the `ORDER BY` clause.
    pub fn order_by(&mut self, order: &str) -> &mut Self {
        self.order_by = Some(order.to_string());
        self
    }

    /// Caps the result set. The cap is passed as a bound argument, not
    /// spliced into the text.
    pub const fn limit(&mut self, limit: i64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    /// Produces the final statement text and its ordered arguments.
    ///
    /// Placeholders are numbered `$1..$n` in condition push order; the
    /// limit argument, when present, is always last.
    #[must_use]
    pub fn build(self) -> (String, Vec<SqlValue>) {
        let mut sql = self.base;
        let mut args: Vec<SqlValue> = Vec::new();
        let mut next_placeholder = 1usize;

        for (i, condition) in self.conditions.into_iter().enumerate() {
            sql.push_str(if i == 0 { "\nWHERE " } else { "\nAND " });
            sql.push('(');
            sql.push_str(&renumber(&condition.clause, &mut next_placeholder));
            sql.push(')');
            args.extend(condition.args);
        }

        if let Some(order) = self.order_by {
            sql.push_str("\nORDER BY ");
            sql.push_str(&order);
        }

        if let Some(limit) = self.limit {
            write!(sql, "\nLIMIT ${next_placeholder}").ok();
            args.push(SqlValue::Int(limit));
        }

        (sql, args)
    }
}

/// Rewrites each `{}` marker in `clause` to the next global `$n`
/// position, advancing the shared counter.
fn renumber(clause: &str, next_placeholder: &mut usize) -> String {
    let mut out = String::with_capacity(clause.len() + 8);
    let mut rest = clause;

    while let Some(pos) = rest.find("{}") {
        out.push_str(&rest[..pos]);
        write!(out, "${next_placeholder}").ok();
        *next_placeholder += 1;
        rest = &rest[pos + 2..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[&str] = &["route", "highway_class"];

    fn placeholder_numbers(sql: &str) -> Vec<usize> {
        let mut numbers = Vec::new();
        let mut rest = sql;
        while let Some(pos) = rest.find('$') {
            rest = &rest[pos + 1..];
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            numbers.push(digits.parse().unwrap());
        }
        numbers
    }

    #[test]
    fn no_conditions_emits_no_where_clause() {
        let mut builder = StatementBuilder::new("SELECT id FROM roads", FIELDS);
        builder.order_by("highway_class ASC").limit(2000);
        let (sql, args) = builder.build();

        assert!(!sql.contains("WHERE"));
        assert!(sql.contains("ORDER BY highway_class ASC"));
        assert!(sql.ends_with("LIMIT $1"));
        assert_eq!(args, vec![SqlValue::Int(2000)]);
    }

    #[test]
    fn renumbers_placeholders_across_conditions() {
        let mut builder = StatementBuilder::new("SELECT id FROM roads", FIELDS);
        builder
            .condition_on(
                "route",
                "a({}, {}, {}, {})",
                vec![
                    SqlValue::Float(1.0),
                    SqlValue::Float(2.0),
                    SqlValue::Float(3.0),
                    SqlValue::Float(4.0),
                ],
            )
            .unwrap();
        builder
            .condition_on(
                "highway_class",
                "b({}) OR c({})",
                vec![SqlValue::SmallInt(0), SqlValue::SmallInt(1)],
            )
            .unwrap();
        let (sql, args) = builder.build();

        assert!(sql.contains("(a($1, $2, $3, $4))"));
        assert!(sql.contains("AND (b($5) OR c($6))"));
        assert_eq!(args.len(), 6);
    }

    #[test]
    fn placeholder_numbering_has_no_gaps_or_repeats() {
        let mut builder = StatementBuilder::new("SELECT id FROM roads", FIELDS);
        builder
            .condition_on("route", "x({}, {})", vec![SqlValue::Int(1), SqlValue::Int(2)])
            .unwrap();
        builder
            .condition_on("highway_class", "y({})", vec![SqlValue::Int(3)])
            .unwrap();
        builder
            .condition_on("route", "z({}, {}, {})", vec![
                SqlValue::Int(4),
                SqlValue::Int(5),
                SqlValue::Int(6),
            ])
            .unwrap();
        builder.limit(10);
        let (sql, args) = builder.build();

        let numbers = placeholder_numbers(&sql);
        assert_eq!(numbers, (1..=7).collect::<Vec<_>>());
        assert_eq!(args.len(), 7);
    }

    #[test]
    fn conditions_join_with_and_and_are_parenthesized() {
        let mut builder = StatementBuilder::new("SELECT id FROM roads", FIELDS);
        builder
            .condition_on("route", "p({}) OR q({})", vec![SqlValue::Int(1), SqlValue::Int(2)])
            .unwrap();
        builder
            .condition_on("highway_class", "r({})", vec![SqlValue::Int(3)])
            .unwrap();
        let (sql, _) = builder.build();

        assert!(sql.contains("WHERE (p($1) OR q($2))\nAND (r($3))"));
    }

    #[test]
    fn rejects_unrecognized_field() {
        let mut builder = StatementBuilder::new("SELECT id FROM roads", FIELDS);
        let err = builder
            .condition_on("surface", "s({})", vec![SqlValue::Int(1)])
            .unwrap_err();
        assert!(matches!(err, DbError::Validation { .. }));
    }

    #[test]
    fn rejects_marker_argument_mismatch() {
        let mut builder = StatementBuilder::new("SELECT id FROM roads", FIELDS);
        let err = builder
            .condition_on("route", "t({}, {})", vec![SqlValue::Int(1)])
            .unwrap_err();
        assert!(matches!(err, DbError::Validation { .. }));
    }
}
