//! Lexical elements of the rule language.

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, tag},
    character::complete::{
        alpha1, alphanumeric1, char, digit1, hex_digit1, multispace1, none_of, not_line_ending,
    },
    combinator::{map, map_res, recognize, value},
    multi::{many0, many0_count, many1},
    sequence::{delimited, pair, preceded, terminated},
    IResult, Parser,
};

use crate::Symbol;

fn comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(char('%'), not_line_ending))(input)
}

/// Whitespace and `%` line comments.
pub(crate) fn space(input: &str) -> IResult<&str, usize> {
    many0_count(alt((multispace1, comment)))(input)
}

/// Skip leading space, then apply `parser`.
pub(crate) fn ws<'a, O, F>(parser: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: Parser<&'a str, O, nom::error::Error<&'a str>>,
{
    preceded(space, parser)
}

pub(crate) fn symbol(input: &str) -> IResult<&str, Symbol> {
    let (input, name) = recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)?;
    Ok((input, Symbol::new(name.to_owned())))
}

// TODO: remove when escaped_transform handles opt(..).
// Needs investigation, probably related to nom#{1118,1336}.
fn empty_string(input: &str) -> IResult<&str, String> {
    map(tag(r#""""#), |_| String::new())(input)
}

fn quoted_string(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        escaped_transform(
            none_of(r#"\""#),
            '\\',
            alt((
                value("\\", tag("\\")),
                value("\"", tag("\"")),
                value("\n", tag("n")),
                value("\r", tag("r")),
                value("\t", tag("t")),
            )),
        ),
        char('"'),
    )(input)
}

pub(crate) fn string(input: &str) -> IResult<&str, String> {
    alt((empty_string, quoted_string))(input)
}

#[allow(clippy::from_str_radix_10)]
fn decimal(input: &str) -> IResult<&str, i64> {
    map_res(
        recognize(many1(terminated(digit1, many0(char('_'))))),
        |digits: &str| i64::from_str_radix(&digits.replace('_', ""), 10),
    )(input)
}

fn hexadecimal(input: &str) -> IResult<&str, i64> {
    map_res(
        preceded(
            alt((tag("0x"), tag("0X"))),
            recognize(many1(terminated(hex_digit1, many0(char('_'))))),
        ),
        |digits: &str| i64::from_str_radix(&digits.replace('_', ""), 16),
    )(input)
}

pub(crate) fn integer(input: &str) -> IResult<&str, i64> {
    alt((hexadecimal, decimal))(input)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn space() {
        assert_eq!(super::space(""), Ok(("", 0)));
        assert_eq!(super::space("  % comment\n  p"), Ok(("p", 3)));
        assert_eq!(super::space("%% only"), Ok(("", 1)));
    }

    #[test]
    fn symbol() {
        assert!(super::symbol("").is_err(), "empty");
        assert!(super::symbol("123").is_err(), "symbol starts with a digit");
        assert_eq!(
            super::symbol("_123"),
            Ok(("", Symbol::new(String::from("_123")))),
            "symbol starts with an underscore"
        );
        assert_eq!(
            super::symbol("foo_123(a)"),
            Ok(("(a)", Symbol::new(String::from("foo_123")))),
            "symbol includes an underscore"
        );
    }

    #[test]
    fn string() {
        assert!(super::string(r#""#).is_err(), "empty");
        assert!(super::string(r#""foo"#).is_err(), "unterminated string");
        assert_eq!(
            super::string(r#""""#),
            Ok(("", String::new())),
            "empty string"
        );
        assert_eq!(
            super::string(r#""data/edges.csv""#),
            Ok(("", String::from("data/edges.csv"))),
            "path"
        );
        assert_eq!(
            super::string(r#""a\"b\\c""#),
            Ok(("", String::from("a\"b\\c"))),
            "backslash escapes"
        );
    }

    #[test]
    fn integer() {
        assert!(super::integer("").is_err(), "empty");
        assert!(super::integer("X").is_err(), "invalid");
        assert!(super::integer("12_345_678_901_234_567_890").is_err(), "big");
        assert_eq!(super::integer("0"), Ok(("", 0)), "decimal zero");
        assert_eq!(super::integer("123_456"), Ok(("", 123_456)), "decimal");
        assert_eq!(super::integer("0x1234_abcd"), Ok(("", 0x1234_abcd)), "hex");
    }
}
