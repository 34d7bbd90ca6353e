//! Decomposition of canonical `CREATE INDEX` text
//!
//! Only the shape produced by the catalog's index definition reconstruction
//! is accepted:
//!
//! ```text
//! CREATE [UNIQUE] INDEX <index> ON <table> USING <am> (<columns>)<options>
//!     [TABLESPACE <tablespace>] [WHERE <predicate>]
//! ```
//!
//! Every part is a span of the input; nothing is copied or rewritten.

use crate::core::MigrateError;
use super::common::{find_top_level, identifier, Unbalanced};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, multispace0, multispace1},
    combinator::{eof, opt},
    sequence::{terminated, tuple},
    IResult,
};

/// Access method assumed when the definition carries no `USING` clause
pub const DEFAULT_ACCESS_METHOD: &str = "btree";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition<'a> {
    /// `CREATE INDEX` or `CREATE UNIQUE INDEX`
    pub create: &'a str,
    pub unique: bool,
    pub index: &'a str,
    pub table: &'a str,
    pub access_method: &'a str,
    /// Text between the parentheses of the column list
    pub columns: &'a str,
    /// Whatever follows the column list (e.g. ` WITH (fillfactor='70')`), may be empty
    pub options: &'a str,
    pub tablespace: Option<&'a str>,
    pub predicate: Option<&'a str>,
}

/// Head of the statement up to and including the column list
fn head<'a, 'n>(
    index_name: &'n str,
    table_name: &'n str,
) -> impl FnMut(&'a str) -> IResult<&'a str, (&'a str, &'a str, &'a str, &'a str)> {
    move |input: &'a str| {
        let (input, create) = alt((tag("CREATE UNIQUE INDEX"), tag("CREATE INDEX")))(input)?;
        let (input, _) = multispace1(input)?;
        let (input, index) = terminated(tag(index_name), multispace1)(input)?;
        let (input, _) = terminated(tag("ON"), multispace1)(input)?;
        let (input, table) = terminated(tag(table_name), multispace0)(input)?;
        let (input, access_method) = opt(tuple((
            terminated(tag("USING"), multispace1),
            terminated(identifier, multispace0),
        )))(input)?;
        let access_method = access_method.map_or(DEFAULT_ACCESS_METHOD, |(_, am)| am);
        let (input, _) = char('(')(input)?;
        Ok((input, (create, index, table, access_method)))
    }
}

/// Splits `TABLESPACE <ident>` off the trailing text
fn tablespace_clause(input: &str) -> IResult<&str, &str> {
    let (input, _) = tuple((multispace0, tag("TABLESPACE"), multispace1))(input)?;
    let (input, name) = identifier(input)?;
    let (input, _) = tuple((multispace0, eof))(input)?;
    Ok((input, name))
}

/// Decomposes `sql`; `index_name` and `table_name` must be the exact
/// (quoted / qualified) names the reconstruction uses.
pub fn parse_index_definition<'a>(
    sql: &'a str,
    index_name: &str,
    table_name: &str,
) -> Result<IndexDefinition<'a>, MigrateError> {
    let unsupported = || MigrateError::UnsupportedIndexDefinition(sql.to_string());

    let (rest, (create, index, table, access_method)) =
        head(index_name, table_name)(sql).map_err(|_| unsupported())?;

    let close = find_top_level(rest, |s| s.starts_with(')'))
        .map_err(|Unbalanced| unsupported())?
        .ok_or_else(unsupported)?;
    let columns = &rest[..close];
    let tail = &rest[close + 1..];

    // WHERE is the only clause allowed after TABLESPACE
    let where_pos = find_top_level(tail, |s| starts_with_keyword(s, "WHERE"))
        .map_err(|Unbalanced| unsupported())?;
    let (before_where, predicate) = match where_pos {
        Some(pos) => {
            // `pos` is at the space before the keyword
            let predicate = tail[pos + " WHERE".len()..].trim();
            if predicate.is_empty() || find_top_level(predicate, |_| false).is_err() {
                return Err(unsupported());
            }
            (&tail[..pos], Some(predicate))
        }
        None => (tail, None),
    };

    let tablespace_pos = find_top_level(before_where, |s| starts_with_keyword(s, "TABLESPACE"))
        .map_err(|Unbalanced| unsupported())?;
    let (options, tablespace) = match tablespace_pos {
        Some(pos) => {
            let (_, name) = tablespace_clause(&before_where[pos..]).map_err(|_| unsupported())?;
            (&before_where[..pos], Some(name))
        }
        None => (before_where, None),
    };

    let definition = IndexDefinition {
        create,
        unique: create.contains("UNIQUE"),
        index,
        table,
        access_method,
        columns,
        options: options.trim_end(),
        tablespace,
        predicate,
    };

    tracing::debug!(
        create = definition.create,
        index = definition.index,
        table = definition.table,
        access_method = definition.access_method,
        columns = definition.columns,
        options = definition.options,
        tablespace = ?definition.tablespace,
        predicate = ?definition.predicate,
        "decomposed index definition"
    );

    Ok(definition)
}

/// A keyword preceded by a space and followed by whitespace
fn starts_with_keyword(s: &str, keyword: &str) -> bool {
    s.strip_prefix(' ')
        .and_then(|s| s.strip_prefix(keyword))
        .is_some_and(|after| after.starts_with(char::is_whitespace))
}
