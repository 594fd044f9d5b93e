//! Filter expression builders.
//!
//! Each jurisdiction turns its routed identifier entries into canonical id
//! strings, sorts and deduplicates them, then packs them into `where` clauses
//! of at most `chunk_size` ids so request URLs stay within server limits.
//! An empty id set becomes the single [`MATCH_NOTHING`] expression.

mod nsw;
mod qld;
mod sa;

use std::collections::BTreeSet;
use std::fmt;

pub use nsw::NswQueryBuilder;
pub use qld::QldQueryBuilder;
pub use sa::SaQueryBuilder;

use crate::config::JurisdictionConfig;
use crate::identifier::IdentifierEntry;
use crate::jurisdiction::Jurisdiction;

/// Predicate that matches no rows.
pub const MATCH_NOTHING: &str = "1=2";

/// One `where` clause plus the canonical ids it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpression {
    clause: String,
    ids: Vec<String>,
}

impl FilterExpression {
    /// Creates an expression covering `ids`.
    pub fn new(clause: impl Into<String>, ids: Vec<String>) -> Self {
        Self {
            clause: clause.into(),
            ids,
        }
    }

    /// The match-nothing expression.
    pub fn match_nothing() -> Self {
        Self::new(MATCH_NOTHING, Vec::new())
    }

    /// Returns the `where` clause text.
    pub fn as_str(&self) -> &str {
        &self.clause
    }

    /// Returns the canonical ids this expression covers.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Returns true for the match-nothing expression.
    pub fn is_match_nothing(&self) -> bool {
        self.clause == MATCH_NOTHING
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clause)
    }
}

/// Builds chunked filter expressions for one jurisdiction.
pub trait QueryBuilder: Send + Sync {
    /// Jurisdiction whose routing decides which entries are considered.
    fn jurisdiction(&self) -> Jurisdiction;

    /// Maximum number of ids per expression.
    fn chunk_size(&self) -> usize;

    /// Canonical id for an accepted entry, or `None` if the entry has no
    /// representation in this jurisdiction.
    fn canonical_id(&self, entry: &IdentifierEntry) -> Option<String>;

    /// Renders the `where` clause for one non-empty chunk of canonical ids.
    fn clause(&self, ids: &[String]) -> String;

    /// Sorted, deduplicated canonical ids for the routed entries.
    fn canonical_ids(&self, entries: &[IdentifierEntry]) -> Vec<String> {
        let jurisdiction = self.jurisdiction();
        entries
            .iter()
            .filter(|entry| jurisdiction.accepts(entry))
            .filter_map(|entry| self.canonical_id(entry))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Chunks canonical ids into expressions.
    fn build_from_ids(&self, ids: &[String]) -> Vec<FilterExpression> {
        if ids.is_empty() {
            return vec![FilterExpression::match_nothing()];
        }

        ids.chunks(self.chunk_size().max(1))
            .map(|chunk| FilterExpression::new(self.clause(chunk), chunk.to_vec()))
            .collect()
    }

    /// Routes, canonicalizes and chunks `entries`.
    fn build(&self, entries: &[IdentifierEntry]) -> Vec<FilterExpression> {
        self.build_from_ids(&self.canonical_ids(entries))
    }
}

/// Returns the builder for `jurisdiction` configured from `config`.
pub fn builder_for(
    jurisdiction: Jurisdiction,
    config: &JurisdictionConfig,
) -> Box<dyn QueryBuilder> {
    match jurisdiction {
        Jurisdiction::Nsw => Box::new(NswQueryBuilder::new(&config.id_field, config.chunk_size)),
        Jurisdiction::Qld => Box::new(QldQueryBuilder::new(&config.id_field, config.chunk_size)),
        Jurisdiction::Sa => Box::new(SaQueryBuilder::new(&config.id_field, config.chunk_size)),
    }
}

/// Escapes a string literal for an ArcGIS `where` clause by doubling single quotes.
///
/// ```
/// use parcelkit_core::query::escape_literal;
///
/// assert_eq!(escape_literal("O'BRIEN"), "O''BRIEN");
/// ```
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Quotes and escapes a string literal.
pub fn quote(value: &str) -> String {
    format!("'{}'", escape_literal(value))
}

/// Renders `UPPER(field) IN ('a', 'b')`.
pub(crate) fn upper_in_list(field: &str, ids: &[String]) -> String {
    let values = ids.iter().map(|id| quote(id)).collect::<Vec<_>>().join(", ");
    format!("UPPER({field}) IN ({values})")
}
