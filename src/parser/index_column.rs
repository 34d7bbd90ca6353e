//! Column list items of an index definition
//!
//! Each item looks like `<expr> [COLLATE <collation>] [<opclass>] [DESC] [NULLS {FIRST | LAST}]`.
//! Qualifiers are taken off from the right, which avoids parsing the expression itself.

use crate::core::MigrateError;
use super::common::{find_top_level, qualified_identifier, split_top_level};
use nom::{
    bytes::complete::tag,
    character::complete::{multispace0, multispace1},
    combinator::{eof, recognize},
    sequence::{terminated, tuple},
    IResult,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumn<'a> {
    /// Column reference or parenthesized expression
    pub expr: &'a str,
    /// `COLLATE <collation>`
    pub collate: Option<&'a str>,
    /// Explicit operator class name
    pub opclass: Option<&'a str>,
    /// `DESC`
    pub desc: Option<&'a str>,
    /// `NULLS FIRST` / `NULLS LAST`
    pub nulls: Option<&'a str>,
}

impl IndexColumn<'_> {
    /// ORDER BY term for this column; `operator` replaces the operator class
    #[must_use]
    pub fn order_by_term(&self, operator: Option<&str>) -> String {
        let mut term = self.expr.to_string();
        if let Some(collate) = self.collate {
            term.push(' ');
            term.push_str(collate);
        }
        if let Some(desc) = self.desc {
            term.push(' ');
            term.push_str(desc);
        }
        if let Some(op) = operator {
            term.push_str(" USING ");
            term.push_str(op);
        }
        if let Some(nulls) = self.nulls {
            term.push(' ');
            term.push_str(nulls);
        }
        term
    }
}

/// Splits a column list on top-level commas
pub fn split_index_columns(columns: &str) -> Result<Vec<&str>, MigrateError> {
    let pieces = split_top_level(columns, ',')
        .map_err(|_| MigrateError::UnsupportedIndexDefinition(columns.to_string()))?;
    let pieces: Vec<&str> = pieces.into_iter().map(str::trim).collect();
    if pieces.iter().any(|p| p.is_empty()) {
        return Err(MigrateError::UnsupportedIndexDefinition(columns.to_string()));
    }
    Ok(pieces)
}

/// `rest` ends with ` <qualifier>`: returns the head and the qualifier span
fn strip_qualifier<'a>(rest: &'a str, qualifier: &str) -> Option<(&'a str, &'a str)> {
    let head = rest.strip_suffix(qualifier)?.strip_suffix(' ')?;
    Some((head, &rest[head.len() + 1..]))
}

fn collate_clause(input: &str) -> IResult<&str, &str> {
    terminated(
        recognize(tuple((tag("COLLATE"), multispace1, qualified_identifier))),
        multispace0,
    )(input)
}

fn opclass_name(input: &str) -> Result<&str, MigrateError> {
    let parsed: IResult<&str, &str> = terminated(qualified_identifier, eof)(input);
    parsed
        .map(|(_, name)| name)
        .map_err(|_| MigrateError::UnsupportedIndexDefinition(input.to_string()))
}

pub fn parse_index_column(token: &str) -> Result<IndexColumn<'_>, MigrateError> {
    let unsupported = || MigrateError::UnsupportedIndexDefinition(token.to_string());
    let mut rest = token.trim();

    let mut nulls = None;
    for qualifier in ["NULLS FIRST", "NULLS LAST"] {
        if let Some((head, q)) = strip_qualifier(rest, qualifier) {
            rest = head;
            nulls = Some(q);
            break;
        }
    }

    let mut desc = None;
    if let Some((head, q)) = strip_qualifier(rest, "DESC") {
        rest = head;
        desc = Some(q);
    }

    let collate_pos = find_top_level(rest, |s| s.starts_with(" COLLATE ")).map_err(|_| unsupported())?;
    let (expr, collate, opclass) = match collate_pos {
        Some(pos) => {
            let (after, collate) = collate_clause(&rest[pos + 1..]).map_err(|_| unsupported())?;
            let opclass = if after.is_empty() { None } else { Some(opclass_name(after)?) };
            (&rest[..pos], Some(collate), opclass)
        }
        None => match find_top_level(rest, |s| s.starts_with(' ')).map_err(|_| unsupported())? {
            Some(pos) => (&rest[..pos], None, Some(opclass_name(rest[pos + 1..].trim())?)),
            None => (rest, None, None),
        },
    };

    if expr.is_empty() {
        return Err(unsupported());
    }

    Ok(IndexColumn { expr, collate, opclass, desc, nulls })
}
