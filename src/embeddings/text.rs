//! Deterministic text composition for embedding inputs
//!
//! The composed text is the cache key, so composition must be a pure
//! function of entity state: fixed field order, lowercasing after
//! composition, single-space whitespace inside parts, newline between parts.

use crate::models::CompanyProfile;
use crate::models::Tender;

/// Phrases that introduce the procurement subject in tender-notice titles,
/// most specific first. Everything before and including the first matching
/// marker is issuer boilerplate; the subject after it is what the embedding
/// should carry.
const TITLE_BOILERPLATE_MARKERS: &[&str] = &[
    "for the procurement of ",
    "for the supply of ",
    "for the purchase of ",
    "for the provision of ",
    "for the construction of ",
    "for the sale of ",
    "expressions of interest for ",
    "expression of interest for ",
    "sealed bids for ",
    "invites bids for ",
];

/// Strip issuer boilerplate from a tender title, keeping the procurement
/// subject. Markers are tried in specificity order and the first match
/// wins; titles without a recognized marker pass through unchanged.
pub fn strip_title_boilerplate(title: &str) -> &str {
    let lowered = title.to_lowercase();

    for marker in TITLE_BOILERPLATE_MARKERS {
        if let Some(pos) = lowered.find(marker) {
            let end = pos + marker.len();
            // lowercasing may shift byte offsets in non-ascii titles
            if end < title.len() && title.is_char_boundary(end) {
                return title[end..].trim();
            }
        }
    }

    title.trim()
}

/// Compose the embedding text for a tender.
///
/// title, cleaned (or truncated raw) description, highlights, organization,
/// category and region, newline-joined.
pub fn tender_text(tender: &Tender, max_description_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();

    push_part(&mut parts, strip_title_boilerplate(&tender.title));

    if let Some(clean) = &tender.clean_description {
        push_part(&mut parts, clean);
    } else if let Some(raw) = &tender.description {
        push_part(&mut parts, truncate_chars(raw, max_description_chars));
    }

    if !tender.highlights.is_empty() {
        push_part(&mut parts, &tender.highlights.join(" "));
    }
    if let Some(organization) = &tender.organization {
        push_part(&mut parts, organization);
    }
    if let Some(category) = &tender.category {
        push_part(&mut parts, category);
    }
    if let Some(region) = &tender.region {
        push_part(&mut parts, region);
    }

    parts.join("\n").to_lowercase()
}

/// Compose the embedding text for a company profile.
///
/// primary sector, active sectors, sub-sectors, keywords, preferred regions,
/// certifications and discovered interests, in the order each list is stored.
pub fn profile_text(profile: &CompanyProfile) -> String {
    let mut parts: Vec<String> = Vec::new();

    push_part(&mut parts, &profile.primary_sector);
    push_list(&mut parts, &profile.active_sectors);
    push_list(&mut parts, &profile.sub_sectors);
    push_list(&mut parts, &profile.keywords);
    push_list(&mut parts, &profile.preferred_regions);
    push_list(&mut parts, &profile.certifications);
    push_list(&mut parts, &profile.discovered_interests);

    parts.join("\n").to_lowercase()
}

fn push_part(parts: &mut Vec<String>, value: &str) {
    let normalized = normalize_whitespace(value);
    if !normalized.is_empty() {
        parts.push(normalized);
    }
}

fn push_list(parts: &mut Vec<String>, values: &[String]) {
    if !values.is_empty() {
        push_part(parts, &values.join(" "));
    }
}

/// Collapse all runs of whitespace to single spaces.
pub fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
