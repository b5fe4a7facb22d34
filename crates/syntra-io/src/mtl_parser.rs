//! Parser for the textual MTL specification format.
//!
//! The grammar lives in `mtl.pest`; operator precedence is handled by a
//! Pratt parser (disjunction binds weakest, then conjunction, then the
//! temporal operators; the unary operators bind strongest):
//!
//! ```text
//! (move) D[0,2] (!release)
//! F[1,2] p
//! a U b && !c
//! ```

use anyhow::{anyhow, bail, Context, Error};
use lazy_static::lazy_static;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;

use syntra_logic::{finally, globally, BoundKind, MtlFormula, TimeInterval};

#[derive(Parser)]
#[grammar = "mtl.pest"]
struct PestMtlParser;

// Precedence is defined lowest to highest; the temporal infix operators
// bind tighter than the boolean connectives.
lazy_static! {
    static ref PRATT_PARSER: PrattParser<Rule> = PrattParser::new()
        .op(Op::infix(Rule::or, Assoc::Left))
        .op(Op::infix(Rule::and, Assoc::Left))
        .op(Op::infix(Rule::until, Assoc::Right) | Op::infix(Rule::dual_until, Assoc::Right))
        .op(Op::prefix(Rule::not))
        .op(Op::prefix(Rule::finally_op) | Op::prefix(Rule::globally_op));
}

/// Parse an interval suffix such as `[0, 2]` or `(1, inf)`
fn parse_interval(pair: Pair<Rule>) -> Result<TimeInterval, Error> {
    let mut lower_kind = BoundKind::Weak;
    let mut upper_kind = BoundKind::Weak;
    let mut bounds = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::open_lower => {
                if inner.as_str() == "(" {
                    lower_kind = BoundKind::Strict;
                }
            }
            Rule::close_upper => {
                if inner.as_str() == ")" {
                    upper_kind = BoundKind::Strict;
                }
            }
            Rule::bound => bounds.push(inner.as_str().to_string()),
            _ => {}
        }
    }
    let [lower, upper] = bounds.as_slice() else {
        bail!("an interval needs exactly two bounds");
    };
    let (lower, lower_kind) = if lower == "inf" {
        (0, BoundKind::Infinite)
    } else {
        (lower.parse().with_context(|| "malformed lower bound")?, lower_kind)
    };
    let (upper, upper_kind) = if upper == "inf" {
        (0, BoundKind::Infinite)
    } else {
        (upper.parse().with_context(|| "malformed upper bound")?, upper_kind)
    };
    let interval = TimeInterval::new_with_bounds(lower, lower_kind, upper, upper_kind);
    if interval.is_empty() {
        bail!("the interval is empty");
    }
    Ok(interval)
}

/// The interval of a temporal operator pair, defaulting to unbounded
fn operator_interval(pair: Pair<Rule>) -> Result<TimeInterval, Error> {
    match pair.into_inner().find(|p| p.as_rule() == Rule::interval) {
        Some(interval) => parse_interval(interval),
        None => Ok(TimeInterval::unbounded()),
    }
}

fn parse_expr(pairs: Pairs<Rule>) -> Result<MtlFormula, Error> {
    PRATT_PARSER
        .map_primary(|primary| match primary.as_rule() {
            Rule::true_lit => Ok(MtlFormula::True),
            Rule::false_lit => Ok(MtlFormula::False),
            Rule::ident => Ok(MtlFormula::ap(primary.as_str())),
            Rule::expr => parse_expr(primary.into_inner()),
            rule => Err(anyhow!("unexpected token {rule:?} in formula")),
        })
        .map_prefix(|op, rhs| match op.as_rule() {
            Rule::not => Ok(!rhs?),
            Rule::finally_op => Ok(finally(rhs?, operator_interval(op)?)),
            Rule::globally_op => Ok(globally(rhs?, operator_interval(op)?)),
            rule => Err(anyhow!("unexpected prefix operator {rule:?}")),
        })
        .map_infix(|lhs, op, rhs| match op.as_rule() {
            Rule::and => Ok(lhs? & rhs?),
            Rule::or => Ok(lhs? | rhs?),
            Rule::until => Ok(lhs?.until(rhs?, operator_interval(op)?)),
            Rule::dual_until => Ok(lhs?.dual_until(rhs?, operator_interval(op)?)),
            rule => Err(anyhow!("unexpected infix operator {rule:?}")),
        })
        .parse(pairs)
}

/// Parse an MTL formula from its textual representation
pub fn parse_mtl(input: &str) -> Result<MtlFormula, Error> {
    let mut pairs = PestMtlParser::parse(Rule::formula_input, input)
        .with_context(|| format!("failed to parse the MTL formula '{input}'"))?;
    let root = pairs
        .next()
        .ok_or_else(|| anyhow!("empty MTL formula"))?;
    let expr = root
        .into_inner()
        .find(|pair| pair.as_rule() == Rule::expr)
        .ok_or_else(|| anyhow!("empty MTL formula"))?;
    parse_expr(expr.into_inner())
}
