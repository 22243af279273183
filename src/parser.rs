//! Filter expression parser using nom.
//!
//! A filter expression is one OR-group written inline:
//!
//! ```text
//! orders.status = 'open' | amount > 100 | region in ('EU', 'US')
//! ─────┬─────── ─┬ ──┬───   ──┬── ───────────────┬──────────────
//!      │         │   │        │                  └── `in` = several values
//!      │         │   │        └── `|` or `or` between terms
//!      │         │   └── quoted string ('' escapes a quote) or number
//!      │         └── = <> < <= > >= like, not like, in
//!      └── optional table qualifier
//! ```

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while1},
    character::complete::{char, digit1, multispace0, multispace1},
    combinator::{map, opt, recognize, value},
    error::{Error, ErrorKind},
    multi::separated_list1,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::ast::Operator;
use crate::config::{FilterTerm, Literal};
use crate::error::{WexError, WexResult};

/// Parse a filter expression into the terms of one OR-group.
pub fn parse_filter_group(input: &str) -> WexResult<Vec<FilterTerm>> {
    let input = input.trim();

    match parse_group(input) {
        Ok(("", terms)) => Ok(terms),
        Ok((remaining, _)) => Err(WexError::parse(
            input.len() - remaining.len(),
            format!("Unexpected trailing content: '{}'", remaining),
        )),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(WexError::parse(
            input.len() - e.input.len(),
            format!("Parse failed in '{}': {:?}", input, e.code),
        )),
        Err(nom::Err::Incomplete(_)) => Err(WexError::parse(input.len(), "Unexpected end of input")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Cmp(Operator),
    In,
}

fn parse_group(input: &str) -> IResult<&str, Vec<FilterTerm>> {
    separated_list1(parse_separator, parse_term)(input)
}

/// `|` or the keyword `or`.
fn parse_separator(input: &str) -> IResult<&str, ()> {
    alt((
        value((), delimited(multispace0, char('|'), multispace0)),
        value((), delimited(multispace1, tag_no_case("or"), multispace1)),
    ))(input)
}

fn parse_term(input: &str) -> IResult<&str, FilterTerm> {
    let (input, (first, second)) =
        pair(parse_identifier, opt(preceded(char('.'), parse_identifier)))(input)?;
    let (table, column) = match second {
        Some(column) => (Some(first.to_string()), column),
        None => (None, first),
    };
    let (input, _) = multispace0(input)?;
    let (input, op) = parse_operator(input)?;
    let (input, _) = multispace0(input)?;
    let (input, values) = parse_values(input)?;

    let operator = match op {
        Op::Cmp(operator) => operator,
        Op::In => Operator::Eq,
    };

    Ok((
        input,
        FilterTerm {
            table,
            column: column.to_string(),
            operator,
            values,
            kind: None,
        },
    ))
}

fn parse_identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}

fn parse_operator(input: &str) -> IResult<&str, Op> {
    alt((
        value(Op::Cmp(Operator::Ne), tag("<>")),
        value(Op::Cmp(Operator::Ne), tag("!=")),
        value(Op::Cmp(Operator::Lte), tag("<=")),
        value(Op::Cmp(Operator::Gte), tag(">=")),
        value(Op::Cmp(Operator::Eq), tag("=")),
        value(Op::Cmp(Operator::Lt), tag("<")),
        value(Op::Cmp(Operator::Gt), tag(">")),
        value(
            Op::Cmp(Operator::NotLike),
            tuple((tag_no_case("not"), multispace1, tag_no_case("like"))),
        ),
        value(Op::Cmp(Operator::Like), tag_no_case("like")),
        value(Op::In, tag_no_case("in")),
    ))(input)
}

fn parse_values(input: &str) -> IResult<&str, Vec<Literal>> {
    alt((
        delimited(
            pair(char('('), multispace0),
            separated_list1(delimited(multispace0, char(','), multispace0), parse_literal),
            pair(multispace0, char(')')),
        ),
        map(parse_literal, |l| vec![l]),
    ))(input)
}

fn parse_literal(input: &str) -> IResult<&str, Literal> {
    alt((map(parse_quoted, Literal::Text), parse_number))(input)
}

fn parse_number(input: &str) -> IResult<&str, Literal> {
    let (rest, text) = recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
    )))(input)?;
    Ok((rest, Literal::number(text)))
}

/// Single-quoted string; `''` stands for one quote.
fn parse_quoted(input: &str) -> IResult<&str, String> {
    let (mut rest, _) = char('\'')(input)?;
    let mut out = String::new();
    loop {
        let Some(end) = rest.find('\'') else {
            return Err(nom::Err::Error(Error::new(rest, ErrorKind::Char)));
        };
        out.push_str(&rest[..end]);
        let after = &rest[end + 1..];
        match after.strip_prefix('\'') {
            Some(stripped) => {
                out.push('\'');
                rest = stripped;
            }
            None => return Ok((after, out)),
        }
    }
}
