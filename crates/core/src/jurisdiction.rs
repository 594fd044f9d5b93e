//! Jurisdictions, entry routing and provenance tags.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identifier::IdentifierEntry;

/// NSW plan types understood by the Spatial Services cadastre.
pub const NSW_PLAN_TYPES: &[&str] = &["DP", "SP", "CP"];

/// Queensland plan types understood by the Land Parcel Property Framework.
pub const QLD_PLAN_TYPES: &[&str] = &["RP", "SP", "CP", "BUP", "GTP", "AP", "MPH", "SL"];

/// A state land registry with its own feature service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Jurisdiction {
    Nsw,
    Qld,
    Sa,
}

impl Jurisdiction {
    /// All jurisdictions, in result merge order.
    pub const ALL: [Jurisdiction; 3] = [Jurisdiction::Nsw, Jurisdiction::Qld, Jurisdiction::Sa];

    /// Short state code, also written to the `state` property.
    pub fn as_str(&self) -> &'static str {
        match self {
            Jurisdiction::Nsw => "NSW",
            Jurisdiction::Qld => "QLD",
            Jurisdiction::Sa => "SA",
        }
    }

    /// Dataset name written to the `source` property.
    pub fn source_tag(&self) -> &'static str {
        match self {
            Jurisdiction::Nsw => "NSW_Cadastre",
            Jurisdiction::Qld => "QLD_LPPF",
            Jurisdiction::Sa => "SA_DAP_Parcels",
        }
    }

    /// Default public query endpoint for this jurisdiction's parcel layer.
    pub fn default_layer_url(&self) -> &'static str {
        match self {
            Jurisdiction::Nsw => {
                "https://maps.six.nsw.gov.au/arcgis/rest/services/public/NSW_Cadastre/MapServer/9/query"
            }
            Jurisdiction::Qld => {
                "https://spatial-gis.information.qld.gov.au/arcgis/rest/services/PlanningCadastre/LandParcelPropertyFramework/MapServer/4/query"
            }
            Jurisdiction::Sa => {
                "https://lsa2.geohub.sa.gov.au/server/rest/services/ePlanning/DAP_Parcels/MapServer/1/query"
            }
        }
    }

    /// Returns true if this jurisdiction's builder can use the entry.
    pub fn accepts(&self, entry: &IdentifierEntry) -> bool {
        match (self, entry) {
            (_, IdentifierEntry::Unknown { .. }) => false,

            (Jurisdiction::Nsw, IdentifierEntry::LotPlan { .. })
            | (Jurisdiction::Nsw, IdentifierEntry::LotSectionPlan { .. }) => true,
            (Jurisdiction::Nsw, IdentifierEntry::CompactLotPlan { .. }) => {
                has_plan_type(entry, NSW_PLAN_TYPES)
            }
            (Jurisdiction::Nsw, _) => false,

            (Jurisdiction::Qld, IdentifierEntry::LotIdString { .. }) => true,
            (Jurisdiction::Qld, IdentifierEntry::LotPlan { .. })
            | (Jurisdiction::Qld, IdentifierEntry::CompactLotPlan { .. }) => {
                has_plan_type(entry, QLD_PLAN_TYPES)
            }
            (Jurisdiction::Qld, _) => false,

            (Jurisdiction::Sa, IdentifierEntry::LotPlan { .. })
            | (Jurisdiction::Sa, IdentifierEntry::LotSectionPlan { .. })
            | (Jurisdiction::Sa, IdentifierEntry::VolumeFolio { .. }) => true,
            (Jurisdiction::Sa, _) => false,
        }
    }

    /// Filters `entries` down to those this jurisdiction accepts, keeping order.
    pub fn route<'a>(&self, entries: &'a [IdentifierEntry]) -> Vec<&'a IdentifierEntry> {
        entries.iter().filter(|entry| self.accepts(entry)).collect()
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn has_plan_type(entry: &IdentifierEntry, types: &[&str]) -> bool {
    entry
        .plan_type()
        .is_some_and(|plan_type| types.contains(&plan_type))
}
