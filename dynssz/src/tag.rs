//! Parsing of the `static_size` and `dynamic_size` field annotations.
//!
//! Both annotations are comma-separated lists with one entry per nested
//! collection dimension, outermost first. A `static_size` entry is a positive
//! decimal or `?` (a variable-length dimension with no static baseline); a
//! `dynamic_size` entry is a spec-value expression or `?` (no override for
//! this dimension). Trailing dimensions may be omitted from either list.

use crate::expr::{ExprError, SizeExpr};

/// One dimension of a `static_size` annotation.
#[derive(Debug, Clone, PartialEq)]
pub enum StaticDim {
    /// A declared size (vector length, or list maximum).
    Size(u64),
    /// `?`: a variable-length dimension without a static baseline.
    Variable,
}

/// One dimension of a `dynamic_size` annotation.
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicDim {
    /// An expression to resolve against the spec registry.
    Expr(SizeExpr),
    /// `?`: this dimension keeps its static default.
    Skip,
}

pub fn parse_static_tag(tag: &str) -> Result<Vec<StaticDim>, ExprError> {
    split_dims(tag)
        .map(|(pos, entry)| {
            if entry == "?" {
                Ok(StaticDim::Variable)
            } else {
                entry
                    .parse::<u64>()
                    .ok()
                    .filter(|size| *size > 0)
                    .map(StaticDim::Size)
                    .ok_or(ExprError::Parse {
                        position: pos,
                        message: "static_size entries must be positive integers or `?`",
                    })
            }
        })
        .collect()
}

pub fn parse_dynamic_tag(tag: &str) -> Result<Vec<DynamicDim>, ExprError> {
    split_dims(tag)
        .map(|(_, entry)| {
            if entry == "?" {
                Ok(DynamicDim::Skip)
            } else {
                SizeExpr::parse(entry).map(DynamicDim::Expr)
            }
        })
        .collect()
}

/// Splits a tag on commas, trimming each entry and tracking its byte position
/// for error reporting.
fn split_dims(tag: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut pos = 0;
    tag.split(',').map(move |raw| {
        let start = pos;
        pos += raw.len() + 1;
        let trimmed = raw.trim();
        let offset = raw.len() - raw.trim_start().len();
        (start + offset, trimmed)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::SpecValues;

    #[test]
    fn static_dims() {
        assert_eq!(
            parse_static_tag("8192,32"),
            Ok(vec![StaticDim::Size(8192), StaticDim::Size(32)])
        );
        assert_eq!(
            parse_static_tag("?, 32"),
            Ok(vec![StaticDim::Variable, StaticDim::Size(32)])
        );
    }

    #[test]
    fn static_rejects_zero_and_junk() {
        assert!(parse_static_tag("0").is_err());
        assert!(parse_static_tag("-1").is_err());
        assert!(parse_static_tag("12x").is_err());
        assert!(parse_static_tag("").is_err());
    }

    #[test]
    fn dynamic_dims() {
        let dims = parse_dynamic_tag("SLOTS_PER_HISTORICAL_ROOT, ?").unwrap();
        assert_eq!(dims.len(), 2);
        assert_eq!(dims[1], DynamicDim::Skip);

        let specs: SpecValues = vec![("SLOTS_PER_HISTORICAL_ROOT".to_string(), 64)]
            .into_iter()
            .collect();
        match &dims[0] {
            DynamicDim::Expr(expr) => assert_eq!(expr.eval(&specs), Ok(64)),
            other => panic!("expected expression, got {:?}", other),
        }
    }

    #[test]
    fn dynamic_rejects_malformed_expressions() {
        assert!(parse_dynamic_tag("SLOTS_PER_EPOCH*").is_err());
    }
}
