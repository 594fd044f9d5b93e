use crate::identifier::IdentifierEntry;
use crate::jurisdiction::Jurisdiction;

use super::{QueryBuilder, quote};

/// South Australian DAP parcels builder.
///
/// Lot/plan entries become `PARCEL//PLAN` ids and title references become
/// `VOLUME/FOLIO` ids. Each id renders as one parenthesised term and the
/// terms of a chunk are joined with `OR`. Sections are not part of the SA
/// parcel key and are dropped.
#[derive(Debug, Clone)]
pub struct SaQueryBuilder {
    parcel_field: String,
    chunk_size: usize,
}

impl SaQueryBuilder {
    pub fn new(parcel_field: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            parcel_field: parcel_field.into(),
            chunk_size,
        }
    }

    fn term(&self, id: &str) -> String {
        if let Some((parcel, plan)) = id.split_once("//") {
            format!(
                "(UPPER(plan)={} AND UPPER({})={})",
                quote(plan),
                self.parcel_field,
                quote(parcel)
            )
        } else if let Some((volume, folio)) = id.split_once('/') {
            format!("(volume={} AND folio={})", quote(volume), quote(folio))
        } else {
            format!("(UPPER(plan)={})", quote(id))
        }
    }
}

impl QueryBuilder for SaQueryBuilder {
    fn jurisdiction(&self) -> Jurisdiction {
        Jurisdiction::Sa
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn canonical_id(&self, entry: &IdentifierEntry) -> Option<String> {
        match entry {
            IdentifierEntry::LotPlan { lot, plan }
            | IdentifierEntry::LotSectionPlan { lot, plan, .. } => Some(format!("{lot}//{plan}")),
            IdentifierEntry::VolumeFolio { volume, folio } => Some(format!("{volume}/{folio}")),
            _ => None,
        }
    }

    fn clause(&self, ids: &[String]) -> String {
        ids.iter()
            .map(|id| self.term(id))
            .collect::<Vec<_>>()
            .join(" OR ")
    }
}
