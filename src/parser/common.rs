use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::char,
    combinator::recognize,
    multi::{many0_count, separated_list1},
    sequence::delimited,
    IResult,
};

/// Characters allowed in an unquoted identifier (any non-ASCII char included)
pub const fn is_token_char(c: char) -> bool {
    !c.is_ascii() || c.is_ascii_alphanumeric() || c == '_'
}

pub fn bare_identifier(input: &str) -> IResult<&str, &str> {
    take_while1(is_token_char)(input)
}

/// `"..."` with `""` as an escaped quote; returns the span including the quotes
pub fn quoted_identifier(input: &str) -> IResult<&str, &str> {
    recognize(delimited(
        char('"'),
        many0_count(alt((take_while1(|c| c != '"'), tag("\"\"")))),
        char('"'),
    ))(input)
}

pub fn identifier(input: &str) -> IResult<&str, &str> {
    alt((quoted_identifier, bare_identifier))(input)
}

/// `ident[.ident...]`, returned as one span
pub fn qualified_identifier(input: &str) -> IResult<&str, &str> {
    recognize(separated_list1(char('.'), identifier))(input)
}

/// Opening quote or parenthesis without its partner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unbalanced;

/// Finds the first byte offset outside any quoted string and at parenthesis
/// depth zero where `matches` accepts the remaining input.
///
/// `Ok(None)` means the whole input was scanned and is balanced.
pub fn find_top_level(
    input: &str,
    mut matches: impl FnMut(&str) -> bool,
) -> Result<Option<usize>, Unbalanced> {
    let bytes = input.as_bytes();
    let mut quote: Option<u8> = None;
    let mut depth: i32 = 0;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if let Some(q) = quote {
            if c == q {
                if bytes.get(i + 1) == Some(&q) {
                    i += 1;
                } else {
                    quote = None;
                }
            } else if c == b'\\' {
                i += 1;
            }
        } else {
            if depth == 0 && input.is_char_boundary(i) && matches(&input[i..]) {
                return Ok(Some(i));
            }
            match c {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(Unbalanced);
                    }
                }
                b'\'' | b'"' => quote = Some(c),
                _ => {}
            }
        }
        i += 1;
    }

    if quote.is_none() && depth == 0 {
        Ok(None)
    } else {
        Err(Unbalanced)
    }
}

/// Splits on `sep` at depth zero outside quotes. Pieces are not trimmed.
pub fn split_top_level(input: &str, sep: char) -> Result<Vec<&str>, Unbalanced> {
    let mut pieces = Vec::new();
    let mut rest = input;
    while let Some(pos) = find_top_level(rest, |s| s.starts_with(sep))? {
        pieces.push(&rest[..pos]);
        rest = &rest[pos + sep.len_utf8()..];
    }
    pieces.push(rest);
    Ok(pieces)
}

// Reserved words that always need quoting when used as identifiers
const RESERVED_KEYWORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric",
    "both", "case", "cast", "check", "collate", "column", "constraint", "create",
    "current_catalog", "current_date", "current_role", "current_time",
    "current_timestamp", "current_user", "default", "deferrable", "desc",
    "distinct", "do", "else", "end", "except", "false", "fetch", "for", "foreign",
    "from", "grant", "group", "having", "in", "initially", "intersect", "into",
    "lateral", "leading", "limit", "localtime", "localtimestamp", "not", "null",
    "offset", "on", "only", "or", "order", "placing", "primary", "references",
    "returning", "select", "session_user", "some", "symmetric", "table", "then",
    "to", "trailing", "true", "union", "unique", "user", "using", "variadic",
    "when", "where", "window", "with",
];

/// Quotes an identifier when it would not survive unquoted
#[must_use]
pub fn quote_identifier(ident: &str) -> String {
    let safe = ident
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && ident
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !RESERVED_KEYWORDS.contains(&ident);

    if safe {
        ident.to_string()
    } else {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}

/// `schema.name`, each part quoted as needed
#[must_use]
pub fn quote_qualified_identifier(schema: Option<&str>, ident: &str) -> String {
    match schema {
        Some(schema) => format!("{}.{}", quote_identifier(schema), quote_identifier(ident)),
        None => quote_identifier(ident),
    }
}
