//! Parser for the surface syntax
//!
//! A source string is a whitespace-separated sequence of parts; each part is
//! an optionally keyed number, string, symbol, or parenthesized table. The
//! grammar lives in `grammar.pest`.

use crate::error::RippleError;
use crate::expr::Expression;
use crate::limits::ResourceLimits;
use crate::RippleResult;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "parser/grammar.pest"]
struct SourceParser;

/// Parse a source string into a single expression
///
/// A source with one part yields that part. A source starting with `(`
/// yields its first expression. Any other multi-part source yields a
/// synthetic table of the parts.
pub fn parse(source: &str) -> RippleResult<Expression> {
    parse_with_limits(source, &ResourceLimits::default())
}

pub fn parse_with_limits(source: &str, limits: &ResourceLimits) -> RippleResult<Expression> {
    let mut parts = parse_parts_with_limits(source, limits)?;

    if parts.len() == 1 {
        Ok(parts.remove(0))
    } else if source.trim_start().starts_with('(') {
        Ok(parts.into_iter().next().unwrap_or_default())
    } else {
        Ok(Expression::table(parts))
    }
}

/// Parse a source string into its top-level sequence of parts
pub fn parse_parts(source: &str) -> RippleResult<Vec<Expression>> {
    parse_parts_with_limits(source, &ResourceLimits::default())
}

pub fn parse_parts_with_limits(
    source: &str,
    limits: &ResourceLimits,
) -> RippleResult<Vec<Expression>> {
    if source.len() > limits.max_source_bytes {
        return Err(RippleError::parse(
            format!(
                "source is {} bytes, over the limit of {}",
                source.len(),
                limits.max_source_bytes
            ),
            1,
            1,
        ));
    }
    check_depth(source, limits.max_expression_depth)?;

    let pairs = SourceParser::parse(Rule::source, source).map_err(map_pest_error)?;

    let mut parts = Vec::new();
    for pair in pairs {
        if pair.as_rule() == Rule::source {
            for inner in pair.into_inner() {
                if inner.as_rule() == Rule::part {
                    parts.push(build_part(inner)?);
                }
            }
        }
    }
    Ok(parts)
}

/// Reject sources nested deeper than the limit before handing them to the
/// recursive grammar. Parentheses inside quoted strings do not count.
fn check_depth(source: &str, max_depth: usize) -> RippleResult<()> {
    let mut depth = 0usize;
    let mut in_str = false;

    for c in source.chars() {
        match c {
            '\'' => in_str = !in_str,
            '(' if !in_str => {
                depth += 1;
                if depth > max_depth {
                    return Err(RippleError::parse(
                        format!("expression nesting exceeds depth {}", max_depth),
                        1,
                        1,
                    ));
                }
            }
            ')' if !in_str => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

fn map_pest_error(error: pest::error::Error<Rule>) -> RippleError {
    let (line, col) = match error.line_col {
        pest::error::LineColLocation::Pos((line, col)) => (line, col),
        pest::error::LineColLocation::Span((line, col), _) => (line, col),
    };
    RippleError::parse(error.variant.message().to_string(), line, col)
}

fn build_part(pair: Pair<Rule>) -> RippleResult<Expression> {
    let mut key = "";
    let mut value = Expression::none();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::key => key = inner.as_str(),
            Rule::value => value = build_value(inner)?,
            _ => {}
        }
    }
    Ok(value.keyed(key))
}

fn build_value(pair: Pair<Rule>) -> RippleResult<Expression> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| RippleError::Engine("empty value in parse tree".to_string()))?;

    match inner.as_rule() {
        Rule::number => build_number(inner),
        Rule::string => {
            let quoted = inner.as_str();
            Ok(Expression::from(&quoted[1..quoted.len() - 1]))
        }
        Rule::symbol => Ok(Expression::sym(inner.as_str())),
        Rule::table => {
            let mut parts = Vec::new();
            for part in inner.into_inner() {
                if part.as_rule() == Rule::part {
                    parts.push(build_part(part)?);
                }
            }
            Ok(Expression::table(parts))
        }
        rule => Err(RippleError::Engine(format!(
            "unexpected rule {:?} in parse tree",
            rule
        ))),
    }
}

fn build_number(pair: Pair<Rule>) -> RippleResult<Expression> {
    let text = pair.as_str();
    let (line, col) = pair.as_span().start_pos().line_col();
    let bad = || RippleError::parse(format!("bad numeric literal '{}'", text), line, col);

    if text.contains(|c| c == '.' || c == 'e' || c == 'E') {
        text.parse::<f64>().map(Expression::from).map_err(|_| bad())
    } else {
        text.parse::<i32>().map(Expression::from).map_err(|_| bad())
    }
}
