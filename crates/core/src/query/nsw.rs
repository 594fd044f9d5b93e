use crate::identifier::IdentifierEntry;
use crate::jurisdiction::Jurisdiction;

use super::{QueryBuilder, upper_in_list};

/// NSW cadastre builder: `UPPER(lotidstring) IN (...)` over `LOT/SECTION/PLAN` ids.
#[derive(Debug, Clone)]
pub struct NswQueryBuilder {
    field: String,
    chunk_size: usize,
}

impl NswQueryBuilder {
    pub fn new(field: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            field: field.into(),
            chunk_size,
        }
    }
}

impl QueryBuilder for NswQueryBuilder {
    fn jurisdiction(&self) -> Jurisdiction {
        Jurisdiction::Nsw
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn canonical_id(&self, entry: &IdentifierEntry) -> Option<String> {
        entry.lotidstring()
    }

    fn clause(&self, ids: &[String]) -> String {
        upper_in_list(&self.field, ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::parse_entries;

    #[test]
    fn test_single_lot_plan() {
        let builder = NswQueryBuilder::new("lotidstring", 150);
        let expressions = builder.build(&parse_entries("13//DP1242624, 1RP912949"));
        assert_eq!(expressions.len(), 1);
        assert_eq!(
            expressions[0].as_str(),
            "UPPER(lotidstring) IN ('13//DP1242624')"
        );
    }

    #[test]
    fn test_section_and_compact_forms() {
        let builder = NswQueryBuilder::new("lotidstring", 150);
        let ids = builder.canonical_ids(&parse_entries("13/1//DP1242624\nLOT 7 DP55\n7//DP55"));
        assert_eq!(ids, vec!["13/1/DP1242624", "7//DP55"]);
    }

    #[test]
    fn test_ignores_other_jurisdictions() {
        let builder = NswQueryBuilder::new("lotidstring", 150);
        let expressions = builder.build(&parse_entries("5100/123; 3GTP102; 1RP912949"));
        assert!(expressions[0].is_match_nothing());
    }

    #[test]
    fn test_chunk_size_respected() {
        let builder = NswQueryBuilder::new("lotidstring", 2);
        let expressions = builder.build(&parse_entries("1-5//DP9"));
        assert_eq!(expressions.len(), 3);
        assert_eq!(
            expressions[2].as_str(),
            "UPPER(lotidstring) IN ('5//DP9')"
        );
    }
}
