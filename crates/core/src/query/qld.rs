use crate::identifier::IdentifierEntry;
use crate::jurisdiction::Jurisdiction;

use super::{QueryBuilder, upper_in_list};

/// Queensland LPPF builder. Ids are concatenated lotplans (`1RP912949`).
#[derive(Debug, Clone)]
pub struct QldQueryBuilder {
    field: String,
    chunk_size: usize,
}

impl QldQueryBuilder {
    pub fn new(field: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            field: field.into(),
            chunk_size,
        }
    }
}

impl QueryBuilder for QldQueryBuilder {
    fn jurisdiction(&self) -> Jurisdiction {
        Jurisdiction::Qld
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn canonical_id(&self, entry: &IdentifierEntry) -> Option<String> {
        entry.lotplan()
    }

    fn clause(&self, ids: &[String]) -> String {
        upper_in_list(&self.field, ids)
    }
}
