//! Free-text identifier parser.
//!
//! Input is split into tokens on newlines, commas, semicolons, `&` and the word
//! `and`. Each token is stripped of whitespace, uppercased and matched against
//! a fixed, priority-ordered pattern list. The first matching pattern wins.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{COMPACT_PLAN_PREFIXES, IdentifierEntry};
use super::normalize::{expand_lot_range, normalize_lot, normalize_plan};

static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[\r\n,;&]|\band\b").expect("valid regex"));

/// `LOT/SECTION//PLAN` (also accepts the single-slash `LOT/SECTION/PLAN` lotidstring form).
static LOT_SECTION_PLAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Z0-9-]+)/([A-Z0-9-]+)//?([A-Z]+[0-9]+)$").expect("valid regex")
});

/// `LOT//PLAN` or `LOT/PLAN`.
static LOT_PLAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z0-9-]+)//?([A-Z]+[0-9]+)$").expect("valid regex"));

/// `<digits><prefix><digits>` for the plan prefixes in [`super::COMPACT_PLAN_PREFIXES`].
static COMPACT_LOT_PLAN: Lazy<Regex> = Lazy::new(|| {
    let prefixes = COMPACT_PLAN_PREFIXES.join("|");
    Regex::new(&format!(r"^([0-9]+)({prefixes})([0-9]+)$")).expect("valid regex")
});

static BARE_LOTPLAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+[A-Z]{1,4}[0-9]+$").expect("valid regex"));

static VOLUME_FOLIO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{1,5})/([0-9]{1,6})$").expect("valid regex"));

/// Splits raw input into trimmed, non-empty tokens.
pub fn tokenize(raw: &str) -> Vec<String> {
    SEPARATORS
        .split(raw)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Classifies a single token.
///
/// Usually yields one entry. A lot range such as `1-3//DP1242624` yields one
/// entry per lot. Tokens that match nothing yield a single
/// [`IdentifierEntry::Unknown`] carrying the original text.
pub fn classify_token(token: &str) -> Vec<IdentifierEntry> {
    let squashed = squash(token);
    let candidate = strip_lot_word(&squashed);

    if let Some(caps) = LOT_SECTION_PLAN.captures(candidate) {
        let section = normalize_lot(&caps[2]);
        let plan = normalize_plan(&caps[3]);
        return expand_lot_range(&normalize_lot(&caps[1]))
            .into_iter()
            .map(|lot| IdentifierEntry::LotSectionPlan {
                lot,
                section: section.clone(),
                plan: plan.clone(),
            })
            .collect();
    }

    if let Some(caps) = LOT_PLAN.captures(candidate) {
        let plan = normalize_plan(&caps[2]);
        return expand_lot_range(&normalize_lot(&caps[1]))
            .into_iter()
            .map(|lot| IdentifierEntry::LotPlan {
                lot,
                plan: plan.clone(),
            })
            .collect();
    }

    if let Some(caps) = COMPACT_LOT_PLAN.captures(candidate) {
        return vec![IdentifierEntry::CompactLotPlan {
            lot: caps[1].to_string(),
            plan: format!("{}{}", &caps[2], &caps[3]),
        }];
    }

    if BARE_LOTPLAN.is_match(candidate) {
        return vec![IdentifierEntry::LotIdString {
            value: candidate.to_string(),
        }];
    }

    if let Some(caps) = VOLUME_FOLIO.captures(candidate) {
        return vec![IdentifierEntry::VolumeFolio {
            volume: caps[1].to_string(),
            folio: caps[2].to_string(),
        }];
    }

    vec![IdentifierEntry::Unknown {
        raw: token.trim().to_string(),
    }]
}

/// Parses free text into identifier entries.
///
/// Entries keep first-seen order. Duplicates are removed after
/// normalization, so `13//dp1242624` and `13 // DP1242624` collapse into one.
pub fn parse_entries(raw: &str) -> Vec<IdentifierEntry> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for token in tokenize(raw) {
        for entry in classify_token(&token) {
            if seen.insert(dedup_key(&entry)) {
                entries.push(entry);
            }
        }
    }

    entries
}

fn squash(token: &str) -> String {
    token
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// Drops a leading `LOT` word so `LOT 13 DP1242624` reads as `13DP1242624`.
fn strip_lot_word(token: &str) -> &str {
    match token.strip_prefix("LOT") {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => token,
    }
}

fn dedup_key(entry: &IdentifierEntry) -> String {
    match entry {
        IdentifierEntry::Unknown { raw } => format!("unknown:{}", squash(raw)),
        other => format!("{}:{}", other.kind(), other),
    }
}
