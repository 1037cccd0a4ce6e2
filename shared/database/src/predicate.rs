//! Boolean filter expressions over entity fields.
//!
//! A `Predicate` is backend neutral: the Postgres repositories render it to a parameterized
//! `WHERE` clause and the in-memory repositories evaluate it against stored rows. Field
//! names are checked against the entity's column list before either happens, so no caller
//! supplied text is ever spliced into SQL.
//!
//! ```
//! use foodx_database::predicate::field;
//!
//! let active_grains = field("category").eq("Grains").and(field("is_active").eq(true));
//! assert_eq!(active_grains.fields(), vec!["category", "is_active"]);
//! ```

use std::cmp::Ordering;

use crate::error::{RepositoryError, RepositoryResult};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every row
    True,
    Compare { field: String, op: CompareOp, value: Value },
    /// Case-insensitive substring match on a text column
    Contains { field: String, term: String },
    /// Case-sensitive prefix match on a text column
    StartsWith { field: String, prefix: String },
    IsNull(String),
    In { field: String, values: Vec<Value> },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

/// Entry point for building predicates: `field("sku").eq("QN-1")`.
pub fn field(name: impl Into<String>) -> Field {
    Field(name.into())
}

#[derive(Debug, Clone)]
pub struct Field(String);

impl Field {
    fn compare(self, op: CompareOp, value: impl Into<Value>) -> Predicate {
        Predicate::Compare {
            field: self.0,
            op,
            value: value.into(),
        }
    }

    pub fn eq(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Eq, value)
    }

    pub fn ne(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Ne, value)
    }

    pub fn gt(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Gt, value)
    }

    pub fn ge(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Ge, value)
    }

    pub fn lt(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Lt, value)
    }

    pub fn le(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Le, value)
    }

    pub fn contains(self, term: impl Into<String>) -> Predicate {
        Predicate::Contains {
            field: self.0,
            term: term.into(),
        }
    }

    pub fn starts_with(self, prefix: impl Into<String>) -> Predicate {
        Predicate::StartsWith {
            field: self.0,
            prefix: prefix.into(),
        }
    }

    pub fn is_null(self) -> Predicate {
        Predicate::IsNull(self.0)
    }

    pub fn is_not_null(self) -> Predicate {
        Predicate::Not(Box::new(Predicate::IsNull(self.0)))
    }

    pub fn is_in<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Predicate {
        Predicate::In {
            field: self.0,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn between(self, low: impl Into<Value>, high: impl Into<Value>) -> Predicate {
        self.clone().ge(low).and(self.le(high))
    }
}

impl Predicate {
    pub fn and(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::True, p) | (p, Predicate::True) => p,
            (Predicate::And(mut left), Predicate::And(right)) => {
                left.extend(right);
                Predicate::And(left)
            }
            (Predicate::And(mut left), p) => {
                left.push(p);
                Predicate::And(left)
            }
            (p, Predicate::And(mut right)) => {
                right.insert(0, p);
                Predicate::And(right)
            }
            (a, b) => Predicate::And(vec![a, b]),
        }
    }

    pub fn or(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::Or(mut left), Predicate::Or(right)) => {
                left.extend(right);
                Predicate::Or(left)
            }
            (Predicate::Or(mut left), p) => {
                left.push(p);
                Predicate::Or(left)
            }
            (a, b) => Predicate::Or(vec![a, b]),
        }
    }

    /// Every field referenced by the expression, in order of appearance.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Predicate::True => {}
            Predicate::Compare { field, .. }
            | Predicate::Contains { field, .. }
            | Predicate::StartsWith { field, .. }
            | Predicate::In { field, .. }
            | Predicate::IsNull(field) => out.push(field.as_str()),
            Predicate::And(items) | Predicate::Or(items) => {
                items.iter().for_each(|p| p.collect_fields(out))
            }
            Predicate::Not(inner) => inner.collect_fields(out),
        }
    }

    pub fn validate_fields(&self, table: &str, columns: &[&str]) -> RepositoryResult<()> {
        match self.fields().into_iter().find(|f| !columns.contains(f)) {
            Some(unknown) => Err(RepositoryError::unknown_field(table, unknown)),
            None => Ok(()),
        }
    }

    /// Renders the expression as SQL, appending bound values to `params`.
    ///
    /// Placeholders are numbered after the parameters already present.
    pub fn to_sql(&self, params: &mut Vec<Value>) -> String {
        match self {
            Predicate::True => "TRUE".to_string(),
            Predicate::Compare { field, op, value } => {
                if value.is_null() {
                    return match op {
                        CompareOp::Eq => format!("{} IS NULL", field),
                        CompareOp::Ne => format!("{} IS NOT NULL", field),
                        _ => "FALSE".to_string(),
                    };
                }
                params.push(value.clone());
                let symbol = match op {
                    CompareOp::Eq => "=",
                    CompareOp::Ne => "IS DISTINCT FROM",
                    CompareOp::Gt => ">",
                    CompareOp::Ge => ">=",
                    CompareOp::Lt => "<",
                    CompareOp::Le => "<=",
                };
                format!("{} {} ${}", field, symbol, params.len())
            }
            Predicate::Contains { field, term } => {
                params.push(Value::Text(Some(format!("%{}%", escape_like(term)))));
                format!("{} ILIKE ${}", field, params.len())
            }
            Predicate::StartsWith { field, prefix } => {
                params.push(Value::Text(Some(format!("{}%", escape_like(prefix)))));
                format!("{} LIKE ${}", field, params.len())
            }
            Predicate::IsNull(field) => format!("{} IS NULL", field),
            Predicate::In { field, values } => {
                if values.is_empty() {
                    return "FALSE".to_string();
                }
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|value| {
                        params.push(value.clone());
                        format!("${}", params.len())
                    })
                    .collect();
                format!("{} IN ({})", field, placeholders.join(", "))
            }
            Predicate::And(items) => join_sql(items, " AND ", "TRUE", params),
            Predicate::Or(items) => join_sql(items, " OR ", "FALSE", params),
            // NULL operands count as false before negation so both backends agree.
            Predicate::Not(inner) => format!("NOT COALESCE(({}), FALSE)", inner.to_sql(params)),
        }
    }

    /// Evaluates the expression using `lookup` to read field values.
    pub fn matches(&self, lookup: &dyn Fn(&str) -> Option<Value>) -> bool {
        match self {
            Predicate::True => true,
            Predicate::Compare { field, op, value } => {
                let Some(actual) = lookup(field) else {
                    return false;
                };
                if value.is_null() {
                    return match op {
                        CompareOp::Eq => actual.is_null(),
                        CompareOp::Ne => !actual.is_null(),
                        _ => false,
                    };
                }
                let ordering = actual.compare(value);
                match op {
                    CompareOp::Eq => ordering == Some(Ordering::Equal),
                    CompareOp::Ne => ordering != Some(Ordering::Equal),
                    CompareOp::Gt => ordering == Some(Ordering::Greater),
                    CompareOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
                    CompareOp::Lt => ordering == Some(Ordering::Less),
                    CompareOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                }
            }
            Predicate::Contains { field, term } => lookup(field)
                .and_then(|v| v.as_text().map(|s| s.to_lowercase().contains(&term.to_lowercase())))
                .unwrap_or(false),
            Predicate::StartsWith { field, prefix } => lookup(field)
                .and_then(|v| v.as_text().map(|s| s.starts_with(prefix.as_str())))
                .unwrap_or(false),
            Predicate::IsNull(field) => lookup(field).map(|v| v.is_null()).unwrap_or(false),
            Predicate::In { field, values } => match lookup(field) {
                Some(actual) => values
                    .iter()
                    .any(|candidate| actual.compare(candidate) == Some(Ordering::Equal)),
                None => false,
            },
            Predicate::And(items) => items.iter().all(|p| p.matches(lookup)),
            Predicate::Or(items) => items.iter().any(|p| p.matches(lookup)),
            Predicate::Not(inner) => !inner.matches(lookup),
        }
    }
}

impl std::ops::Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        match self {
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }
}

fn join_sql(items: &[Predicate], separator: &str, empty: &str, params: &mut Vec<Value>) -> String {
    if items.is_empty() {
        return empty.to_string();
    }
    let parts: Vec<String> = items.iter().map(|p| p.to_sql(params)).collect();
    format!("({})", parts.join(separator))
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn row(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_renders_numbered_placeholders() {
        let predicate = field("category")
            .eq("Grains")
            .and(field("price").gt(2.5))
            .and(field("name").contains("quin"));
        let mut params = Vec::new();
        let sql = predicate.to_sql(&mut params);

        assert_eq!(sql, "(category = $1 AND price > $2 AND name ILIKE $3)");
        assert_eq!(params[2], Value::from("%quin%"));
    }

    #[test]
    fn test_null_equality_renders_is_null() {
        let mut params = Vec::new();
        let sql = field("sku").eq(Value::Text(None)).to_sql(&mut params);
        assert_eq!(sql, "sku IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn test_like_wildcards_are_escaped() {
        let mut params = Vec::new();
        field("rfq_number").starts_with("RFQ_2025%").to_sql(&mut params);
        assert_eq!(params[0], Value::from("RFQ\\_2025\\%%"));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let predicate = field("name").eq("x").or(field("drop table").eq(1));
        let err = predicate.validate_fields("products", &["id", "name"]).unwrap_err();
        assert!(matches!(err, RepositoryError::UnknownField { .. }));
    }

    #[test]
    fn test_matches_with_nulls() {
        let values = row(&[("sku", Value::Text(None)), ("is_active", Value::from(true))]);
        let lookup = |f: &str| values.get(f).cloned();

        assert!(field("sku").is_null().matches(&lookup));
        assert!(field("sku").ne("ABC").matches(&lookup));
        assert!(!field("sku").eq("ABC").matches(&lookup));
        assert!(!(!field("is_active").eq(true)).matches(&lookup));
    }

    #[test]
    fn test_empty_in_matches_nothing() {
        let values = row(&[("id", Value::from(1i64))]);
        let lookup = |f: &str| values.get(f).cloned();
        assert!(!field("id").is_in(Vec::<i64>::new()).matches(&lookup));
    }

    proptest! {
        #[test]
        fn contains_is_case_insensitive(word in "[a-zA-Z]{1,12}", prefix in "[a-z]{0,5}") {
            let text = format!("{}{}", prefix, word.to_uppercase());
            let values = row(&[("name", Value::from(text))]);
            let lookup = |f: &str| values.get(f).cloned();
            prop_assert!(field("name").contains(word.to_lowercase()).matches(&lookup));
        }

        #[test]
        fn placeholder_count_matches_params(n in 1usize..8) {
            let predicate = field("id").is_in((0..n as i64).collect::<Vec<_>>());
            let mut params = Vec::new();
            let sql = predicate.to_sql(&mut params);
            prop_assert_eq!(params.len(), n);
            prop_assert_eq!(sql.matches('$').count(), n);
        }
    }
}
