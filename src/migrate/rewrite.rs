use crate::catalog::{Catalog, BTREE_AM, BT_LESS_STRATEGY};
use crate::core::{MigrateConfig, MigrateError, Oid, Result};
use crate::parser::{
    parse_index_column, parse_index_definition, quote_identifier, split_index_columns,
    IndexDefinition,
};
use sha2::{Digest, Sha256};
use std::fmt;

/// Opaque suffix that keeps a rebuilt index name from colliding with the original
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameToken(String);

impl NameToken {
    const LEN: usize = 8;

    /// Token derived from the table and index oids
    #[must_use]
    pub fn derive(table: Oid, index: Oid) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(table.0.to_be_bytes());
        hasher.update(index.0.to_be_bytes());
        let digest = hex::encode(hasher.finalize());
        Self(digest[..Self::LEN].to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NameToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl fmt::Display for NameToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Regenerates index statements and sort expressions for the shadow table
pub struct IndexRewriter;

impl IndexRewriter {
    /// Decomposed canonical definition of `index` on `table`
    fn definition<'s, C: Catalog + ?Sized>(
        catalog: &C,
        index: Oid,
        table: Oid,
        sql: &'s str,
    ) -> Result<IndexDefinition<'s>> {
        let index_name = catalog.quoted_relation_name(index)?;
        let table_name = catalog.qualified_relation_name(table)?;
        parse_index_definition(sql, &index_name, &table_name)
    }

    /// `CREATE INDEX` statement building the equivalent of `index` for the shadow table
    ///
    /// The new index is called `<name>_<token>`. With `concurrent` it is built
    /// concurrently on `table` itself, otherwise on the migration's shadow table.
    /// `tablespace` overrides the original index's tablespace.
    pub fn build_index_ddl<C: Catalog + ?Sized>(
        catalog: &C,
        config: &MigrateConfig,
        index: Oid,
        table: Oid,
        tablespace: Option<&str>,
        concurrent: bool,
        token: &NameToken,
    ) -> Result<String> {
        let sql = catalog.index_definition(index)?;
        let def = Self::definition(catalog, index, table, &sql)?;
        let name = quote_identifier(&format!("{}_{token}", catalog.relation(index)?.name));

        let mut ddl = if concurrent {
            format!("{} CONCURRENTLY {name} ON {}", def.create, def.table)
        } else {
            format!(
                "{} {name} ON {}.{}",
                def.create,
                quote_identifier(&config.schema),
                config.shadow_table_name(table)
            )
        };
        ddl.push_str(&format!(" USING {} ({}){}", def.access_method, def.columns, def.options));

        match (tablespace, def.tablespace) {
            (Some(override_ts), _) => ddl.push_str(&format!(" TABLESPACE {}", quote_identifier(override_ts))),
            (None, Some(original)) => ddl.push_str(&format!(" TABLESPACE {original}")),
            (None, None) => {}
        }
        if let Some(predicate) = def.predicate {
            ddl.push_str(&format!(" WHERE {predicate}"));
        }

        tracing::debug!(%index, %table, concurrent, ddl = %ddl, "rewrote index definition");
        Ok(ddl)
    }

    /// ORDER BY list sorting rows the way `index` orders them
    ///
    /// Explicit operator classes are replaced by `USING <op>`, where `op` is
    /// the class's btree "less than" operator.
    pub fn build_order_by<C: Catalog + ?Sized>(catalog: &C, index: Oid, table: Oid) -> Result<String> {
        let sql = catalog.index_definition(index)?;
        let def = Self::definition(catalog, index, table, &sql)?;

        let mut terms = Vec::new();
        for (position, token) in split_index_columns(def.columns)?.into_iter().enumerate() {
            let column = parse_index_column(token)?;
            let operator = match column.opclass {
                Some(opclass) => Some(Self::ordering_operator(catalog, index, position, opclass)?),
                None => None,
            };
            terms.push(column.order_by_term(operator.as_deref()));
        }
        Ok(terms.join(", "))
    }

    /// Strategy 1 operator of `opclass` for its input type (the index
    /// attribute type when the class declares none)
    fn ordering_operator<C: Catalog + ?Sized>(
        catalog: &C,
        index: Oid,
        position: usize,
        opclass: &str,
    ) -> Result<String> {
        let opclass = catalog.opclass_by_name(BTREE_AM, &unqualified_name(opclass))?;
        let input = match opclass.input_type.valid() {
            Some(input) => input,
            None => catalog.index_attribute_type(index, position)?,
        };
        catalog
            .opfamily_member(opclass.family, input, input, BT_LESS_STRATEGY)
            .map(|op| op.name)
            .ok_or(MigrateError::MissingOperator {
                strategy: BT_LESS_STRATEGY,
                left: input,
                right: input,
                family: opclass.family,
            })
    }
}

/// Last component of a possibly qualified, possibly quoted name, unquoted
fn unqualified_name(name: &str) -> String {
    let Some(body) = name.strip_suffix('"') else {
        return name.rsplit('.').next().unwrap_or(name).to_string();
    };
    // Walk back to the opening quote, skipping doubled quotes
    let mut chars = body.char_indices().rev().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '"' {
            continue;
        }
        if chars.peek().is_some_and(|(_, p)| *p == '"') {
            chars.next();
            continue;
        }
        return body[i + 1..].replace("\"\"", "\"");
    }
    body.replace("\"\"", "\"")
}
