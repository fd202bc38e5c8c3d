use chrono::DateTime;
use chrono::NaiveDate;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Tender lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenderStatus {
    Published,
    Closed,
    Draft,
    Cancelled,
}

impl TenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Closed => "closed",
            Self::Draft => "draft",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "published" => Some(Self::Published),
            "closed" => Some(Self::Closed),
            "draft" => Some(Self::Draft),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// User interaction kinds with server-assigned weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    View,
    Save,
    Apply,
    Dismiss,
    RatePositive,
    RateNegative,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Save => "save",
            Self::Apply => "apply",
            Self::Dismiss => "dismiss",
            Self::RatePositive => "rate_positive",
            Self::RateNegative => "rate_negative",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "view" => Some(Self::View),
            "save" => Some(Self::Save),
            "apply" => Some(Self::Apply),
            "dismiss" => Some(Self::Dismiss),
            "rate_positive" => Some(Self::RatePositive),
            "rate_negative" => Some(Self::RateNegative),
            _ => None,
        }
    }

    /// Signed interaction weight. Views only count when the user actually
    /// spent time on the tender.
    pub fn weight(&self, time_spent_seconds: Option<i32>, min_view_seconds: i32) -> i32 {
        match self {
            Self::View => match time_spent_seconds {
                Some(secs) if secs >= min_view_seconds => 1,
                _ => 0,
            },
            Self::Save => 5,
            Self::Apply => 10,
            Self::Dismiss => -5,
            Self::RatePositive => 7,
            Self::RateNegative => -7,
        }
    }

    /// Positive signals feed interest discovery.
    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Save | Self::Apply | Self::RatePositive)
    }
}

/// Structured fields pre-extracted from tender documents. Unknown keys are
/// preserved on round-trip but never scored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financial: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specifications: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addresses: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_flag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tender_type: Option<String>,
    #[serde(flatten)]
    pub extra: std::collections::BTreeMap<String, serde_json::Value>,
}

/// A published procurement opportunity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tender {
    pub id: Uuid,
    pub external_id: Option<String>,
    pub source_url: String,
    pub title: String,
    pub description: Option<String>,
    pub clean_description: Option<String>,
    pub summary: Option<String>,
    pub highlights: Vec<String>,
    pub organization: Option<String>,
    pub category: Option<String>,
    pub region: Option<String>,
    pub budget: Option<f64>,
    pub budget_currency: Option<String>,
    pub language: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub status: String,
    pub published_at: Option<DateTime<Utc>>,
    pub extracted_data: Option<serde_json::Value>,
    pub view_count: i32,
    pub save_count: i32,
    pub apply_count: i32,
    pub dismiss_count: i32,
    pub rate_positive_count: i32,
    pub rate_negative_count: i32,
    pub popularity_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tender {
    /// Status with the read-side invariant applied: a published tender whose
    /// deadline has passed is closed.
    pub fn effective_status(&self, today: NaiveDate) -> TenderStatus {
        let status = TenderStatus::parse(&self.status).unwrap_or(TenderStatus::Draft);
        if status == TenderStatus::Published {
            if let Some(deadline) = self.deadline {
                if deadline < today {
                    return TenderStatus::Closed;
                }
            }
        }
        status
    }

    pub fn days_until_deadline(&self, today: NaiveDate) -> Option<i64> {
        self.deadline.map(|d| (d - today).num_days())
    }

    pub fn extracted(&self) -> ExtractedData {
        self.extracted_data
            .clone()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }
}

/// Company tender profile for personalized recommendations.
///
/// Tier 1 fields are collected during onboarding, tier 2 is optional, and
/// tier 3 is learned from interaction behavior.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompanyProfile {
    pub id: Uuid,
    pub company_id: Uuid,

    // Tier 1
    pub primary_sector: String,
    pub active_sectors: Vec<String>,
    pub sub_sectors: Vec<String>,
    pub preferred_regions: Vec<String>,
    pub keywords: Vec<String>,

    // Tier 2
    pub company_size: Option<String>,
    pub years_in_operation: Option<String>,
    pub certifications: Vec<String>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub budget_currency: String,

    // Tier 3 (learned)
    pub discovered_interests: Vec<String>,
    pub preferred_sources: Vec<String>,
    pub preferred_languages: Vec<String>,
    pub min_deadline_days: Option<i32>,

    // Matching configuration
    pub min_match_threshold: f64,
    pub scoring_weights: Option<serde_json::Value>,

    // Embedding state
    pub embedding_updated_at: Option<DateTime<Utc>>,
    pub embedding_dirty: bool,

    // Counters
    pub onboarding_step: i32,
    pub interaction_count: i32,
    pub interactions_since_embed: i32,
    pub last_interaction_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CompanyProfile {
    pub fn is_tier1_complete(&self) -> bool {
        !self.primary_sector.is_empty()
            && !self.active_sectors.is_empty()
            && !self.preferred_regions.is_empty()
            && self.keywords.len() >= 3
    }

    pub fn is_tier2_complete(&self) -> bool {
        self.company_size.is_some()
            && self.years_in_operation.is_some()
            && !self.certifications.is_empty()
    }

    /// Completion over the 11 tier-1 + tier-2 fields.
    pub fn completion_percentage(&self) -> i32 {
        let mut completed = 0;

        if !self.primary_sector.is_empty() {
            completed += 1;
        }
        if !self.active_sectors.is_empty() {
            completed += 1;
        }
        if !self.sub_sectors.is_empty() {
            completed += 1;
        }
        if !self.preferred_regions.is_empty() {
            completed += 1;
        }
        if self.keywords.len() >= 3 {
            completed += 1;
        }

        if self.company_size.is_some() {
            completed += 1;
        }
        if self.years_in_operation.is_some() {
            completed += 1;
        }
        if !self.certifications.is_empty() {
            completed += 1;
        }
        if self.budget_min.is_some() {
            completed += 1;
        }
        if self.budget_max.is_some() {
            completed += 1;
        }
        if !self.budget_currency.is_empty() {
            completed += 1;
        }

        completed * 100 / 11
    }

    /// Preferred languages, defaulting to english when none learned.
    pub fn effective_languages(&self) -> Vec<String> {
        if self.preferred_languages.is_empty() {
            vec!["english".to_string()]
        } else {
            self.preferred_languages.clone()
        }
    }
}

/// Onboarding step 1 payload
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProfileRequest {
    pub primary_sector: String,
    pub active_sectors: Vec<String>,
    #[serde(default)]
    pub sub_sectors: Vec<String>,
    pub preferred_regions: Vec<String>,
    pub keywords: Vec<String>,
    pub company_size: Option<String>,
    pub years_in_operation: Option<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub budget_currency: Option<String>,
}

impl CreateProfileRequest {
    pub fn validate(&self) -> crate::Result<()> {
        if self.primary_sector.trim().is_empty() {
            return Err(crate::TenderMatchError::Validation(
                "primary_sector is required".to_string(),
            ));
        }
        if self.active_sectors.is_empty() || self.active_sectors.len() > 5 {
            return Err(crate::TenderMatchError::Validation(
                "active_sectors must contain 1-5 entries".to_string(),
            ));
        }
        if self.preferred_regions.is_empty() || self.preferred_regions.len() > 5 {
            return Err(crate::TenderMatchError::Validation(
                "preferred_regions must contain 1-5 entries".to_string(),
            ));
        }
        if self.keywords.len() < 3 || self.keywords.len() > 10 {
            return Err(crate::TenderMatchError::Validation(
                "keywords must contain 3-10 entries".to_string(),
            ));
        }
        if let (Some(min), Some(max)) = (self.budget_min, self.budget_max) {
            if min > max {
                return Err(crate::TenderMatchError::Validation(
                    "budget_min must not exceed budget_max".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Partial profile update (PUT /company-profile)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub primary_sector: Option<String>,
    pub active_sectors: Option<Vec<String>>,
    pub sub_sectors: Option<Vec<String>>,
    pub preferred_regions: Option<Vec<String>>,
    pub keywords: Option<Vec<String>>,
    pub company_size: Option<String>,
    pub years_in_operation: Option<String>,
    pub certifications: Option<Vec<String>>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub budget_currency: Option<String>,
    pub min_match_threshold: Option<f64>,
    pub scoring_weights: Option<serde_json::Value>,
}

impl UpdateProfileRequest {
    /// Does this update touch a field that feeds the profile embedding?
    pub fn touches_embedding_inputs(&self) -> bool {
        self.primary_sector.is_some()
            || self.active_sectors.is_some()
            || self.sub_sectors.is_some()
            || self.preferred_regions.is_some()
            || self.keywords.is_some()
            || self.certifications.is_some()
    }

    pub fn validate(&self) -> crate::Result<()> {
        if let Some(sectors) = &self.active_sectors {
            if sectors.is_empty() || sectors.len() > 5 {
                return Err(crate::TenderMatchError::Validation(
                    "active_sectors must contain 1-5 entries".to_string(),
                ));
            }
        }
        if let Some(regions) = &self.preferred_regions {
            if regions.is_empty() || regions.len() > 5 {
                return Err(crate::TenderMatchError::Validation(
                    "preferred_regions must contain 1-5 entries".to_string(),
                ));
            }
        }
        if let Some(keywords) = &self.keywords {
            if keywords.len() < 3 || keywords.len() > 10 {
                return Err(crate::TenderMatchError::Validation(
                    "keywords must contain 3-10 entries".to_string(),
                ));
            }
        }
        if let Some(threshold) = self.min_match_threshold {
            if !(0.0..=100.0).contains(&threshold) {
                return Err(crate::TenderMatchError::Validation(
                    "min_match_threshold must be within 0-100".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Static dropdown options for profile onboarding
#[derive(Debug, Clone, Serialize)]
pub struct ProfileOptions {
    pub sectors: Vec<&'static str>,
    pub regions: Vec<&'static str>,
    pub certifications: Vec<&'static str>,
    pub company_sizes: Vec<&'static str>,
    pub years_options: Vec<&'static str>,
    pub keyword_suggestions: std::collections::BTreeMap<&'static str, Vec<&'static str>>,
}

pub const SECTORS: &[&str] = &[
    "IT and Infrastructure",
    "Construction and Engineering",
    "Healthcare and Pharmaceuticals",
    "Agriculture and Food Processing",
    "Manufacturing",
    "Education and Training",
    "Financial Services",
    "Transportation and Logistics",
    "Energy and Utilities",
    "Telecommunications",
    "Consulting and Professional Services",
    "Hospitality and Tourism",
    "Retail and Distribution",
    "Media and Entertainment",
    "Real Estate and Property",
    "Environmental Services",
    "Mining and Natural Resources",
    "Security Services",
    "Legal Services",
    "Other Services",
];

pub const REGIONS: &[&str] = &[
    "Addis Ababa",
    "Oromia",
    "Amhara",
    "Tigray",
    "Somali",
    "Afar",
    "SNNPR",
    "Sidama",
    "Benishangul-Gumuz",
    "Gambela",
    "Harari",
    "Dire Dawa",
];

pub const CERTIFICATIONS: &[&str] = &[
    "ISO 9001 (Quality Management)",
    "ISO 14001 (Environmental Management)",
    "ISO 27001 (Information Security)",
    "ISO 45001 (Occupational Health & Safety)",
    "VAT Registered",
    "Trade License",
    "Professional Engineer License",
    "Construction License",
    "Tax Compliance Certificate",
    "Business Registration Certificate",
];

/// Starter keywords suggested per sector during onboarding.
pub const KEYWORD_SUGGESTIONS: &[(&str, &[&str])] = &[
    (
        "IT and Infrastructure",
        &[
            "software development",
            "web development",
            "cloud computing",
            "cybersecurity",
            "network infrastructure",
            "database management",
            "system integration",
            "ERP",
            "IT support",
            "ICT equipment",
        ],
    ),
    (
        "Construction and Engineering",
        &[
            "building construction",
            "road construction",
            "civil engineering",
            "electrical engineering",
            "structural design",
            "HVAC systems",
            "plumbing",
            "construction materials",
            "renovation",
            "site supervision",
        ],
    ),
    (
        "Healthcare and Pharmaceuticals",
        &[
            "medical equipment",
            "pharmaceuticals",
            "laboratory services",
            "medical supplies",
            "hospital services",
            "diagnostic equipment",
            "medical consumables",
            "pharmaceutical distribution",
        ],
    ),
    (
        "Agriculture and Food Processing",
        &[
            "crop production",
            "livestock",
            "irrigation",
            "agricultural equipment",
            "food processing",
            "cold chain",
            "fertilizers",
            "food safety",
        ],
    ),
    (
        "Manufacturing",
        &[
            "production",
            "fabrication",
            "quality control",
            "industrial equipment",
            "metal fabrication",
            "packaging materials",
            "raw materials",
        ],
    ),
    (
        "Financial Services",
        &[
            "accounting",
            "audit",
            "tax consulting",
            "financial advisory",
            "payroll services",
            "accounting software",
            "regulatory compliance",
        ],
    ),
    (
        "Consulting and Professional Services",
        &[
            "business consulting",
            "strategic planning",
            "project management",
            "market research",
            "feasibility studies",
            "monitoring and evaluation",
        ],
    ),
];

pub fn profile_options() -> ProfileOptions {
    ProfileOptions {
        sectors: SECTORS.to_vec(),
        regions: REGIONS.to_vec(),
        certifications: CERTIFICATIONS.to_vec(),
        company_sizes: vec!["startup", "small", "medium", "large"],
        years_options: vec!["<1", "1-3", "3-5", "5-10", "10+"],
        keyword_suggestions: KEYWORD_SUGGESTIONS
            .iter()
            .map(|(sector, keywords)| (*sector, keywords.to_vec()))
            .collect(),
    }
}
