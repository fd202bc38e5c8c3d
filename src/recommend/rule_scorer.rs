//! Structured rule scoring with per-dimension explanations
//!
//! Each dimension owns a share of the 100-point scale. Profiles may override
//! individual shares through `scoring_weights`; the override vector is
//! re-normalized so shares always sum to 100. The keyword dimension is the
//! one place a contribution can exceed its nominal share: title hits count
//! double, capped at twice the share.

use chrono::NaiveDate;

use super::MatchReason;
use crate::models::CompanyProfile;
use crate::models::Tender;

/// Scoring dimensions in fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Sector,
    SubSector,
    Keyword,
    Region,
    Budget,
    Certification,
    Language,
    Deadline,
    Urgency,
    Popularity,
    Semantic,
}

impl Dimension {
    pub const ALL: [Self; 11] = [
        Self::Sector,
        Self::SubSector,
        Self::Keyword,
        Self::Region,
        Self::Budget,
        Self::Certification,
        Self::Language,
        Self::Deadline,
        Self::Urgency,
        Self::Popularity,
        Self::Semantic,
    ];

    /// Key used in the profile's scoring_weights JSON.
    pub fn key(self) -> &'static str {
        match self {
            Self::Sector => "active_sectors",
            Self::SubSector => "sub_sectors",
            Self::Keyword => "keywords",
            Self::Region => "region",
            Self::Budget => "budget",
            Self::Certification => "certifications",
            Self::Language => "language",
            Self::Deadline => "deadline",
            Self::Urgency => "urgency",
            Self::Popularity => "popularity",
            Self::Semantic => "semantic",
        }
    }

    pub fn default_share(self) -> f64 {
        match self {
            Self::Sector => 20.0,
            Self::SubSector => 10.0,
            Self::Keyword => 15.0,
            Self::Region => 10.0,
            Self::Budget => 10.0,
            Self::Certification => 5.0,
            Self::Language => 5.0,
            Self::Deadline => 5.0,
            Self::Urgency => 5.0,
            Self::Popularity => 5.0,
            Self::Semantic => 10.0,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Sector => "sector_match",
            Self::SubSector => "subsector_match",
            Self::Keyword => "keyword_match",
            Self::Region => "region_match",
            Self::Budget => "budget_match",
            Self::Certification => "certification_match",
            Self::Language => "language_match",
            Self::Deadline => "deadline_match",
            Self::Urgency => "urgency",
            Self::Popularity => "popularity_boost",
            Self::Semantic => "semantic_match",
        }
    }
}

/// Deadline window upper bound, days.
const DEADLINE_WINDOW_MAX: i64 = 60;

/// Deadline falloff reaches zero this many days past the window.
const DEADLINE_FALLOFF_MAX: i64 = 120;

/// Keyword context multipliers.
const KEYWORD_TITLE_MULT: f64 = 2.0;
const KEYWORD_HIGHLIGHT_MULT: f64 = 1.5;
const KEYWORD_DESCRIPTION_MULT: f64 = 1.0;

/// Detection tokens for certifications required by a tender, with the
/// canonical label matched against profile certifications.
const CERT_DETECTION: &[(&str, &str)] = &[
    ("iso 9001", "ISO 9001"),
    ("iso 14001", "ISO 14001"),
    ("iso 27001", "ISO 27001"),
    ("iso 45001", "ISO 45001"),
    ("vat registered", "VAT Registered"),
    ("vat registration", "VAT Registered"),
    ("trade license", "Trade License"),
    ("construction license", "Construction License"),
    ("professional engineer", "Professional Engineer License"),
    ("tax compliance", "Tax Compliance Certificate"),
];

/// Per-dimension shares of the 100-point scale.
#[derive(Debug, Clone)]
pub struct DimensionShares {
    shares: [f64; 11],
}

impl Default for DimensionShares {
    fn default() -> Self {
        let mut shares = [0.0; 11];
        for (i, dim) in Dimension::ALL.iter().enumerate() {
            shares[i] = dim.default_share();
        }
        Self { shares }
    }
}

impl DimensionShares {
    /// Build shares from a profile's scoring_weights override. Unknown keys
    /// are ignored; negative values are rejected; the resulting vector is
    /// re-normalized to sum to 100.
    pub fn from_profile(scoring_weights: Option<&serde_json::Value>) -> Self {
        let mut result = Self::default();

        let Some(weights) = scoring_weights.and_then(|v| v.as_object()) else {
            return result;
        };

        let mut overridden = false;
        for (i, dim) in Dimension::ALL.iter().enumerate() {
            if let Some(value) = weights.get(dim.key()).and_then(|v| v.as_f64()) {
                if value >= 0.0 {
                    result.shares[i] = value;
                    overridden = true;
                }
            }
        }

        if overridden {
            let total: f64 = result.shares.iter().sum();
            if total > 0.0 {
                for share in &mut result.shares {
                    *share *= 100.0 / total;
                }
            } else {
                result = Self::default();
            }
        }

        result
    }

    pub fn share(&self, dim: Dimension) -> f64 {
        let idx = Dimension::ALL.iter().position(|d| *d == dim).unwrap_or(0);
        self.shares[idx]
    }

    pub fn total(&self) -> f64 {
        self.shares.iter().sum()
    }
}

/// Inputs for scoring one candidate against one profile.
pub struct ScoreInput<'a> {
    pub profile: &'a CompanyProfile,
    pub tender: &'a Tender,
    /// Cosine similarity when both vectors exist.
    pub semantic: Option<f32>,
    /// Popularity normalized against the rolling 95th percentile.
    pub popularity_norm: f32,
    pub today: NaiveDate,
}

/// Scoring outcome before pagination.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub match_score: i32,
    pub reasons: Vec<MatchReason>,
    pub semantic_similarity: f32,
}

/// Raw contribution before integer point allocation.
struct Contribution {
    tag: &'static str,
    category: String,
    message: String,
    raw: f64,
}

pub struct RuleScorer;

impl RuleScorer {
    /// Score a tender against a profile. Pure: same inputs, same output.
    pub fn score(input: &ScoreInput<'_>, shares: &DimensionShares) -> ScoredCandidate {
        let mut contributions: Vec<Contribution> = Vec::new();

        Self::score_sector(input, shares, &mut contributions);
        Self::score_sub_sectors(input, shares, &mut contributions);
        Self::score_keywords(input, shares, &mut contributions);
        Self::score_region(input, shares, &mut contributions);
        Self::score_budget(input, shares, &mut contributions);
        Self::score_certifications(input, shares, &mut contributions);
        Self::score_language(input, shares, &mut contributions);
        Self::score_deadline(input, shares, &mut contributions);
        Self::score_urgency(input, shares, &mut contributions);
        Self::score_popularity(input, shares, &mut contributions);
        Self::score_semantic(input, shares, &mut contributions);

        let semantic_similarity = input.semantic.map(clip_unit).unwrap_or(0.0);
        let (match_score, reasons) = allocate_points(contributions);

        ScoredCandidate {
            match_score,
            reasons,
            semantic_similarity,
        }
    }

    fn score_sector(
        input: &ScoreInput<'_>,
        shares: &DimensionShares,
        out: &mut Vec<Contribution>,
    ) {
        let Some(category) = &input.tender.category else {
            return;
        };
        let share = shares.share(Dimension::Sector);

        if input.profile.active_sectors.iter().any(|s| s == category) {
            out.push(Contribution {
                tag: Dimension::Sector.tag(),
                category: category.clone(),
                message: format!("Matches your sector: {category}"),
                raw: share,
            });
        } else if input.profile.primary_sector == *category {
            out.push(Contribution {
                tag: Dimension::Sector.tag(),
                category: category.clone(),
                message: format!("Matches your primary sector: {category}"),
                raw: share * 0.5,
            });
        }
    }

    fn score_sub_sectors(
        input: &ScoreInput<'_>,
        shares: &DimensionShares,
        out: &mut Vec<Contribution>,
    ) {
        if input.profile.sub_sectors.is_empty() {
            return;
        }
        let share = shares.share(Dimension::SubSector);

        let title = input.tender.title.to_lowercase();
        let description = input
            .tender
            .clean_description
            .as_deref()
            .unwrap_or("")
            .to_lowercase();

        let matched: Vec<&String> = input
            .profile
            .sub_sectors
            .iter()
            .filter(|sub| {
                let token = sub.to_lowercase();
                contains_word(&title, &token) || contains_word(&description, &token)
            })
            .collect();

        if matched.is_empty() {
            return;
        }

        // 0.5 credit per matched specialization, capped at the full share
        let credit = (0.5 * matched.len() as f64).min(1.0);
        out.push(Contribution {
            tag: Dimension::SubSector.tag(),
            category: matched[0].clone(),
            message: format!(
                "Matches your specialization: {}",
                matched
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            raw: share * credit,
        });
    }

    fn score_keywords(
        input: &ScoreInput<'_>,
        shares: &DimensionShares,
        out: &mut Vec<Contribution>,
    ) {
        if input.profile.keywords.is_empty() {
            return;
        }
        let share = shares.share(Dimension::Keyword);
        let per_keyword = share / input.profile.keywords.len() as f64;

        let title = input.tender.title.to_lowercase();
        let highlights = input.tender.highlights.join(" ").to_lowercase();
        let description = input
            .tender
            .clean_description
            .as_deref()
            .or(input.tender.description.as_deref())
            .unwrap_or("")
            .to_lowercase();

        let mut keyword_contributions: Vec<Contribution> = Vec::new();
        let mut dimension_total = 0.0;

        for keyword in &input.profile.keywords {
            let needle = keyword.to_lowercase();
            if needle.is_empty() {
                continue;
            }

            let multiplier = if title.contains(&needle) {
                KEYWORD_TITLE_MULT
            } else if highlights.contains(&needle) {
                KEYWORD_HIGHLIGHT_MULT
            } else if description.contains(&needle) {
                KEYWORD_DESCRIPTION_MULT
            } else {
                continue;
            };

            let raw = per_keyword * multiplier;
            dimension_total += raw;
            keyword_contributions.push(Contribution {
                tag: Dimension::Keyword.tag(),
                category: keyword.clone(),
                message: format!("Matches keyword: {keyword}"),
                raw,
            });
        }

        // Title hits can push the dimension past its share; cap at double.
        let cap = share * KEYWORD_TITLE_MULT;
        if dimension_total > cap && dimension_total > 0.0 {
            let scale = cap / dimension_total;
            for c in &mut keyword_contributions {
                c.raw *= scale;
            }
        }

        out.extend(keyword_contributions);
    }

    fn score_region(
        input: &ScoreInput<'_>,
        shares: &DimensionShares,
        out: &mut Vec<Contribution>,
    ) {
        let Some(region) = &input.tender.region else {
            return;
        };
        let share = shares.share(Dimension::Region);

        if input.profile.preferred_regions.iter().any(|r| r == region) {
            out.push(Contribution {
                tag: Dimension::Region.tag(),
                category: region.clone(),
                message: format!("In your preferred region: {region}"),
                raw: share,
            });
        } else if region.eq_ignore_ascii_case("national") {
            out.push(Contribution {
                tag: Dimension::Region.tag(),
                category: region.clone(),
                message: "Open to bidders nationwide".to_string(),
                raw: share * 0.5,
            });
        }
    }

    fn score_budget(
        input: &ScoreInput<'_>,
        shares: &DimensionShares,
        out: &mut Vec<Contribution>,
    ) {
        let (Some(min), Some(max), Some(budget)) = (
            input.profile.budget_min,
            input.profile.budget_max,
            input.tender.budget,
        ) else {
            return;
        };
        let share = shares.share(Dimension::Budget);

        if budget >= min && budget <= max {
            out.push(Contribution {
                tag: Dimension::Budget.tag(),
                category: format!("{budget:.0}"),
                message: "Within your budget range".to_string(),
                raw: share,
            });
        } else if budget >= min * 0.8 && budget <= max * 1.2 {
            out.push(Contribution {
                tag: Dimension::Budget.tag(),
                category: format!("{budget:.0}"),
                message: "Close to your budget range".to_string(),
                raw: share * 0.5,
            });
        }
    }

    fn score_certifications(
        input: &ScoreInput<'_>,
        shares: &DimensionShares,
        out: &mut Vec<Contribution>,
    ) {
        if input.profile.certifications.is_empty() {
            return;
        }

        let description = input
            .tender
            .clean_description
            .as_deref()
            .or(input.tender.description.as_deref())
            .unwrap_or("")
            .to_lowercase();
        if description.is_empty() {
            return;
        }

        let mut required: Vec<&str> = Vec::new();
        for (token, label) in CERT_DETECTION {
            if description.contains(token) && !required.contains(label) {
                required.push(label);
            }
        }
        if required.is_empty() {
            return;
        }

        let matched: Vec<&str> = required
            .iter()
            .filter(|label| {
                let needle = label.to_lowercase();
                input
                    .profile
                    .certifications
                    .iter()
                    .any(|c| c.to_lowercase().contains(&needle))
            })
            .copied()
            .collect();
        if matched.is_empty() {
            return;
        }

        let share = shares.share(Dimension::Certification);
        let credit = matched.len() as f64 / required.len() as f64;
        out.push(Contribution {
            tag: Dimension::Certification.tag(),
            category: matched[0].to_string(),
            message: format!("You hold required certifications: {}", matched.join(", ")),
            raw: share * credit,
        });
    }

    fn score_language(
        input: &ScoreInput<'_>,
        shares: &DimensionShares,
        out: &mut Vec<Contribution>,
    ) {
        // Tenders without a language flag are english on this platform.
        let language = input.tender.language.as_deref().unwrap_or("english");

        let matches = input
            .profile
            .effective_languages()
            .iter()
            .any(|l| l.eq_ignore_ascii_case(language));
        if !matches {
            return;
        }

        out.push(Contribution {
            tag: Dimension::Language.tag(),
            category: language.to_string(),
            message: format!("Published in {language}"),
            raw: shares.share(Dimension::Language),
        });
    }

    fn score_deadline(
        input: &ScoreInput<'_>,
        shares: &DimensionShares,
        out: &mut Vec<Contribution>,
    ) {
        let Some(days) = input.tender.days_until_deadline(input.today) else {
            return;
        };
        if days < 0 {
            return;
        }

        let min_days = i64::from(input.profile.min_deadline_days.unwrap_or(0)).max(0);

        let credit = if days >= min_days && days <= DEADLINE_WINDOW_MAX {
            1.0
        } else if days < min_days && min_days > 0 {
            days as f64 / min_days as f64
        } else if days > DEADLINE_WINDOW_MAX {
            let over = (days - DEADLINE_WINDOW_MAX) as f64;
            (1.0 - over / (DEADLINE_FALLOFF_MAX - DEADLINE_WINDOW_MAX) as f64).max(0.0)
        } else {
            0.0
        };

        if credit <= 0.0 {
            return;
        }

        out.push(Contribution {
            tag: Dimension::Deadline.tag(),
            category: format!("{days} days"),
            message: format!("Deadline in {days} days fits your preparation window"),
            raw: shares.share(Dimension::Deadline) * credit,
        });
    }

    fn score_urgency(
        input: &ScoreInput<'_>,
        shares: &DimensionShares,
        out: &mut Vec<Contribution>,
    ) {
        let Some(days) = input.tender.days_until_deadline(input.today) else {
            return;
        };
        if !(1..=7).contains(&days) {
            return;
        }

        out.push(Contribution {
            tag: Dimension::Urgency.tag(),
            category: format!("{days} days"),
            message: format!("Deadline in {days} days"),
            raw: shares.share(Dimension::Urgency),
        });
    }

    fn score_popularity(
        input: &ScoreInput<'_>,
        shares: &DimensionShares,
        out: &mut Vec<Contribution>,
    ) {
        let norm = clip_unit(input.popularity_norm);
        if norm <= 0.0 {
            return;
        }

        out.push(Contribution {
            tag: Dimension::Popularity.tag(),
            category: "popularity".to_string(),
            message: "Popular with similar companies".to_string(),
            raw: shares.share(Dimension::Popularity) * f64::from(norm),
        });
    }

    fn score_semantic(
        input: &ScoreInput<'_>,
        shares: &DimensionShares,
        out: &mut Vec<Contribution>,
    ) {
        let Some(similarity) = input.semantic else {
            return;
        };
        let clipped = clip_unit(similarity);
        if clipped <= 0.0 {
            return;
        }

        let strength = if clipped > 0.5 {
            "Strong"
        } else if clipped > 0.3 {
            "Moderate"
        } else {
            "Weak"
        };

        out.push(Contribution {
            tag: Dimension::Semantic.tag(),
            category: "semantic".to_string(),
            message: format!("{strength} semantic match ({:.0}%)", clipped * 100.0),
            raw: shares.share(Dimension::Semantic) * f64::from(clipped),
        });
    }
}

/// Clip a similarity into [0, 1].
pub fn clip_unit(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Word-bounded substring search: the needle must not be flanked by
/// alphanumeric characters in the haystack. Both sides must be lowercased.
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(needle) {
        let abs = start + pos;
        let before_ok = abs == 0
            || !haystack[..abs]
                .chars()
                .next_back()
                .is_some_and(char::is_alphanumeric);
        let end = abs + needle.len();
        let after_ok = end >= haystack.len()
            || !haystack[end..].chars().next().is_some_and(char::is_alphanumeric);
        if before_ok && after_ok {
            return true;
        }
        start = end;
        if start >= haystack.len() {
            break;
        }
    }
    false
}

/// Turn raw contributions into an integer score and integer-weighted reasons
/// whose weights sum exactly to the score (largest-remainder allocation).
fn allocate_points(contributions: Vec<Contribution>) -> (i32, Vec<MatchReason>) {
    let contributions: Vec<Contribution> =
        contributions.into_iter().filter(|c| c.raw > 0.0).collect();
    if contributions.is_empty() {
        return (0, Vec::new());
    }

    let total: f64 = contributions.iter().map(|c| c.raw).sum();
    let score = (total.round() as i32).clamp(0, 100);
    if score == 0 {
        return (0, Vec::new());
    }

    // Scale contributions onto the integer score, floor, then hand the
    // leftover points to the largest fractional remainders.
    let scale = f64::from(score) / total;
    let mut scaled: Vec<(usize, f64)> = contributions
        .iter()
        .enumerate()
        .map(|(i, c)| (i, c.raw * scale))
        .collect();

    let mut weights: Vec<i32> = scaled.iter().map(|(_, v)| v.floor() as i32).collect();
    let mut remaining = score - weights.iter().sum::<i32>();

    scaled.sort_by(|a, b| {
        let fa = a.1 - a.1.floor();
        let fb = b.1 - b.1.floor();
        fb.total_cmp(&fa).then(a.0.cmp(&b.0))
    });
    for (idx, _) in scaled {
        if remaining == 0 {
            break;
        }
        weights[idx] += 1;
        remaining -= 1;
    }

    let mut reasons: Vec<MatchReason> = contributions
        .into_iter()
        .zip(weights)
        .map(|(c, weight)| MatchReason {
            tag: c.tag.to_string(),
            category: c.category,
            message: c.message,
            weight,
        })
        .collect();
    reasons.sort_by(|a, b| b.weight.cmp(&a.weight).then(a.tag.cmp(&b.tag)));

    (score, reasons)
}
