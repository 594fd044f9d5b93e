//! Parcel identifier model, parsing and normalization.
//!
//! Users paste identifiers in whatever shape their source document uses. The
//! [`parse_entries`] function turns that text into typed [`IdentifierEntry`]
//! values which the jurisdiction query builders consume.
//!
//! # Supported forms
//!
//! | Input | Entry |
//! |-------|-------|
//! | `13/1//DP1242624` | [`IdentifierEntry::LotSectionPlan`] |
//! | `13//DP1242624`, `13/DP1242624` | [`IdentifierEntry::LotPlan`] |
//! | `1-3//DP1242624` | three [`IdentifierEntry::LotPlan`] entries |
//! | `1RP912949`, `LOT 13 DP1242624` | [`IdentifierEntry::CompactLotPlan`] |
//! | `3GTP102` | [`IdentifierEntry::LotIdString`] |
//! | `5100/123` | [`IdentifierEntry::VolumeFolio`] |
//! | anything else | [`IdentifierEntry::Unknown`] |

mod normalize;
mod parser;

use std::fmt;

use serde::Serialize;

pub use normalize::{MAX_LOT_RANGE, expand_lot_range, normalize_lot, normalize_plan, plan_prefix};
pub use parser::{classify_token, parse_entries, tokenize};

/// Plan prefixes recognised in the compact `<lot><prefix><number>` form.
pub const COMPACT_PLAN_PREFIXES: &[&str] = &["DP", "SP", "CP", "RP", "BUP"];

/// One identifier extracted from user input.
///
/// Lot, section and plan values are canonical: uppercase alphanumerics, with
/// lot ranges already expanded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdentifierEntry {
    /// `LOT//PLAN`.
    LotPlan { lot: String, plan: String },

    /// `LOT/SECTION//PLAN`.
    LotSectionPlan {
        lot: String,
        section: String,
        plan: String,
    },

    /// A lot/plan string kept verbatim, e.g. a Queensland `lotplan` with an
    /// uncommon plan type.
    #[serde(rename = "lotidstring")]
    LotIdString { value: String },

    /// South Australian certificate of title reference.
    VolumeFolio { volume: String, folio: String },

    /// `<lot><prefix><number>` written without separators, e.g. `1RP912949`.
    #[serde(rename = "lotplan")]
    CompactLotPlan { lot: String, plan: String },

    /// A token that matched no known form. Kept for diagnostics.
    Unknown { raw: String },
}

impl IdentifierEntry {
    /// Returns the snake_case kind name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            IdentifierEntry::LotPlan { .. } => "lot_plan",
            IdentifierEntry::LotSectionPlan { .. } => "lot_section_plan",
            IdentifierEntry::LotIdString { .. } => "lotidstring",
            IdentifierEntry::VolumeFolio { .. } => "volume_folio",
            IdentifierEntry::CompactLotPlan { .. } => "lotplan",
            IdentifierEntry::Unknown { .. } => "unknown",
        }
    }

    /// Returns true for every variant except [`IdentifierEntry::Unknown`].
    pub fn is_parsable(&self) -> bool {
        !matches!(self, IdentifierEntry::Unknown { .. })
    }

    /// Returns the plan code, if this entry carries one.
    pub fn plan(&self) -> Option<&str> {
        match self {
            IdentifierEntry::LotPlan { plan, .. }
            | IdentifierEntry::LotSectionPlan { plan, .. }
            | IdentifierEntry::CompactLotPlan { plan, .. } => Some(plan),
            _ => None,
        }
    }

    /// Returns the alphabetic plan type (`DP`, `RP`, ...), if any.
    pub fn plan_type(&self) -> Option<&str> {
        self.plan().map(plan_prefix)
    }

    /// NSW `lotidstring` form: `LOT/SECTION/PLAN`, or `LOT//PLAN` without a section.
    pub fn lotidstring(&self) -> Option<String> {
        match self {
            IdentifierEntry::LotPlan { lot, plan }
            | IdentifierEntry::CompactLotPlan { lot, plan } => Some(format!("{lot}//{plan}")),
            IdentifierEntry::LotSectionPlan { lot, section, plan } => {
                Some(format!("{lot}/{section}/{plan}"))
            }
            _ => None,
        }
    }

    /// Queensland `lotplan` form: lot and plan concatenated (`1RP912949`).
    pub fn lotplan(&self) -> Option<String> {
        match self {
            IdentifierEntry::LotPlan { lot, plan }
            | IdentifierEntry::CompactLotPlan { lot, plan } => Some(format!("{lot}{plan}")),
            IdentifierEntry::LotIdString { value } => Some(value.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for IdentifierEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierEntry::LotPlan { lot, plan } => write!(f, "{lot}//{plan}"),
            IdentifierEntry::LotSectionPlan { lot, section, plan } => {
                write!(f, "{lot}/{section}//{plan}")
            }
            IdentifierEntry::LotIdString { value } => write!(f, "{value}"),
            IdentifierEntry::VolumeFolio { volume, folio } => write!(f, "{volume}/{folio}"),
            IdentifierEntry::CompactLotPlan { lot, plan } => write!(f, "{lot}{plan}"),
            IdentifierEntry::Unknown { raw } => write!(f, "{raw}"),
        }
    }
}
