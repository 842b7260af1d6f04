use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod advisory;
pub mod audit;
pub mod config;
pub mod error;

pub use advisory::{try_advisory_override, AdvisoryModel};
pub use error::{GuardError, GuardResult};

pub const POLICY_FRAMEWORK: &str = "remove_reduce_inform";
pub const MODEL_VERSION: &str = "starter-v1";

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A post submitted for analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostInput {
    #[serde(default = "default_platform")]
    pub platform: String,
    pub title: String,
    pub description: String,
    /// Carried through to the audit record; not scored.
    #[serde(default = "default_transcript")]
    pub transcript: Option<String>,
    #[serde(default)]
    pub links: Vec<String>,
}

fn default_platform() -> String {
    "facebook".to_string()
}

fn default_transcript() -> Option<String> {
    Some(String::new())
}

impl PostInput {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            platform: default_platform(),
            title: title.into(),
            description: description.into(),
            transcript: default_transcript(),
            links: Vec::new(),
        }
    }

    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.links = links.into_iter().map(Into::into).collect();
        self
    }

    /// Parse and validate a JSON payload. Missing `title` or `description`
    /// is a validation error, not a JSON error.
    pub fn from_json(text: &str) -> GuardResult<Self> {
        let post: PostInput =
            serde_json::from_str(text).map_err(|e| GuardError::Validation(e.to_string()))?;
        post.validate()?;
        Ok(post)
    }

    pub fn validate(&self) -> GuardResult<()> {
        let title_len = self.title.chars().count();
        if !(HP.title_min_chars..=HP.title_max_chars).contains(&title_len) {
            return Err(GuardError::Validation(format!(
                "title must be {}-{} characters, got {title_len}",
                HP.title_min_chars, HP.title_max_chars
            )));
        }
        let desc_len = self.description.chars().count();
        if desc_len > HP.description_max_chars {
            return Err(GuardError::Validation(format!(
                "description must be at most {} characters, got {desc_len}",
                HP.description_max_chars
            )));
        }
        Ok(())
    }
}

/// Normalized risk signals, each in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalVector {
    pub clickbait: f64,
    pub engagement_bait: f64,
    /// Always 0.0: no thumbnail analysis is performed.
    pub misleading_thumb: f64,
    pub low_quality_landing: f64,
    /// Always 0.0: no per-author history is kept.
    pub repeat_offender_hint: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreVector {
    pub risk_remove: f64,
    pub risk_reduce: f64,
}

/// `inform_block` is non-empty if and only if `needs_inform` is true.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionDecision {
    pub needs_inform: bool,
    pub inform_block: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixSet {
    pub title: String,
    pub description: String,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditStamp {
    pub policy_framework: String,
    pub model_version: String,
}

impl Default for AuditStamp {
    fn default() -> Self {
        Self {
            policy_framework: POLICY_FRAMEWORK.to_string(),
            model_version: MODEL_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub signals: SignalVector,
    pub scores: ScoreVector,
    pub actions: ActionDecision,
    pub fixes: FixSet,
    pub audit: AuditStamp,
}

// ---------------------------------------------------------------------------
// Hyperparameters
// ---------------------------------------------------------------------------

struct Hyperparameters {
    clickbait_weight: f64,
    misleading_weight: f64,
    // Already scaled before `misleading_weight` is applied.
    misleading_value: f64,
    landing_weight: f64,
    engagement_weight: f64,
    low_quality_landing_value: f64,
    title_min_chars: usize,
    title_max_chars: usize,
    description_max_chars: usize,
    fix_title_max_chars: usize,
    fix_title_keep_chars: usize,
    fix_description_max_chars: usize,
    inform_max_sources: usize,
}

static HP: Hyperparameters = Hyperparameters {
    clickbait_weight: 0.2,
    misleading_weight: 0.4,
    misleading_value: 0.3,
    landing_weight: 0.4,
    engagement_weight: 0.2,
    low_quality_landing_value: 0.6,
    title_min_chars: 3,
    title_max_chars: 160,
    description_max_chars: 1000,
    fix_title_max_chars: 80,
    fix_title_keep_chars: 78,
    fix_description_max_chars: 220,
    inform_max_sources: 3,
};

const ELLIPSIS: char = '\u{2026}';
const NO_SOURCES: &str = "sources to be specified";

// ---------------------------------------------------------------------------
// Compiled patterns
// ---------------------------------------------------------------------------

static CLICKBAIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:you['\u{2019}]ll never guess|incredible|never|shocking|shocking !|impossible|top \d+|secret|revealed)",
    )
    .unwrap()
});

static ENGAGEMENT_BAIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:share|tag|comment|comment\s+yes|like if)").unwrap());

static MISLEADING_HEADLINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:\?|!!!)\n?\z").unwrap());

static LOW_QUALITY_LANDING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bbit\.ly\b|\btinyurl\b|\b(?:ad|ads|popup)\b").unwrap());

static HARD_VIOLATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:hate|doxxing|dox|scam|threat|violence)").unwrap());

static FACTUAL_CLAIM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:fact|figure|statistic|according to|study|source|news|breaking)")
        .unwrap()
});

static SYNTHETIC_MEDIA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:deepfake|ai|generated|synthetic)").unwrap());

// Longer phrases precede the shorter ones they contain.
static TITLE_REPLACEMENTS: &[(&str, &str)] = &[
    ("You'll never guess", "Here's what we learned"),
    ("You\u{2019}ll never guess", "Here's what we learned"),
    ("You'll never", "Here's what we learned"),
    ("You\u{2019}ll never", "Here's what we learned"),
    ("Incredible", "Concrete"),
    ("Secret", "Method"),
];

static DESCRIPTION_REPLACEMENTS: &[(&str, &str)] = &[
    ("Comment YES if you want more", "Tell me what you think"),
    ("Share now", "Worth keeping handy"),
];

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn joined(title: &str, description: &str) -> String {
    format!("{title} {description}")
}

fn presence(fired: bool) -> f64 {
    if fired {
        1.0
    } else {
        0.0
    }
}

pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn replace_all(text: &str, table: &[(&str, &str)]) -> String {
    table
        .iter()
        .fold(text.to_string(), |acc, (from, to)| acc.replace(from, to))
}

/// Cap a title at the fix length, marking truncation with an ellipsis.
pub(crate) fn cap_title(title: String) -> String {
    if title.chars().count() > HP.fix_title_max_chars {
        let mut capped = truncate_chars(&title, HP.fix_title_keep_chars);
        capped.push(ELLIPSIS);
        capped
    } else {
        title
    }
}

pub(crate) fn cap_description(description: &str) -> String {
    truncate_chars(description, HP.fix_description_max_chars)
}

// ---------------------------------------------------------------------------
// Signal extraction
// ---------------------------------------------------------------------------

pub fn is_misleading_headline(title: &str) -> bool {
    MISLEADING_HEADLINE_RE.is_match(title)
}

pub fn is_low_quality_link(link: &str) -> bool {
    LOW_QUALITY_LANDING_RE.is_match(link)
}

pub fn is_hard_violation(title: &str, description: &str) -> bool {
    HARD_VIOLATION_RE.is_match(&joined(title, description))
}

pub fn is_factual_claim(title: &str, description: &str) -> bool {
    FACTUAL_CLAIM_RE.is_match(&joined(title, description))
}

pub fn is_synthetic_media(title: &str, description: &str) -> bool {
    SYNTHETIC_MEDIA_RE.is_match(&joined(title, description))
}

pub fn extract_signals(title: &str, description: &str, links: &[String]) -> SignalVector {
    let clickbait = presence(CLICKBAIT_RE.is_match(&joined(title, description)));
    let engagement_bait = presence(ENGAGEMENT_BAIT_RE.is_match(description));
    let low_quality_landing = if links.iter().any(|l| is_low_quality_link(l)) {
        HP.low_quality_landing_value
    } else {
        0.0
    };

    SignalVector {
        clickbait,
        engagement_bait,
        misleading_thumb: 0.0,
        low_quality_landing,
        repeat_offender_hint: 0.0,
    }
}

// ---------------------------------------------------------------------------
// Risk aggregation
// ---------------------------------------------------------------------------

/// Combine signals into Remove/Reduce scores and the Inform decision.
///
/// The misleading headline term enters the Reduce sum as a pre-scaled 0.3
/// and is then weighted again by 0.4, so a firing headline adds 0.12.
pub fn aggregate_risk(
    signals: &SignalVector,
    title: &str,
    description: &str,
) -> (ScoreVector, bool) {
    let misleading = if is_misleading_headline(title) {
        HP.misleading_value
    } else {
        0.0
    };

    let risk_reduce = (HP.clickbait_weight * signals.clickbait
        + HP.misleading_weight * misleading
        + HP.landing_weight * signals.low_quality_landing
        + HP.engagement_weight * signals.engagement_bait)
        .min(1.0);
    let risk_remove = presence(is_hard_violation(title, description));
    let needs_inform =
        is_factual_claim(title, description) || is_synthetic_media(title, description);

    let scores = ScoreVector {
        risk_remove: clamp_unit(risk_remove),
        risk_reduce: clamp_unit(risk_reduce),
    };
    (scores, needs_inform)
}

// ---------------------------------------------------------------------------
// Rewrites
// ---------------------------------------------------------------------------

pub fn rewrite_title(title: &str) -> String {
    cap_title(replace_all(title, TITLE_REPLACEMENTS))
}

pub fn rewrite_description(description: &str) -> String {
    cap_description(&replace_all(description, DESCRIPTION_REPLACEMENTS))
}

pub fn build_inform_block(needs_inform: bool, links: &[String]) -> String {
    if !needs_inform {
        return String::new();
    }
    let sources = if links.is_empty() {
        NO_SOURCES.to_string()
    } else {
        links
            .iter()
            .take(HP.inform_max_sources)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" | ")
    };
    format!("Context & sources: {sources}. Transparency: content edited and manually verified.")
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Validate and score a post with local rules only.
pub fn analyze(post: &PostInput) -> GuardResult<AnalysisResult> {
    analyze_with_advisory(post, None)
}

/// Validate and score a post, letting the advisory model replace the local
/// verdict when it answers. Any advisory failure falls back silently.
pub fn analyze_with_advisory(
    post: &PostInput,
    advisory: Option<&dyn AdvisoryModel>,
) -> GuardResult<AnalysisResult> {
    post.validate()?;

    if let Some(model) = advisory {
        if let Some(result) = try_advisory_override(post, model) {
            return Ok(result);
        }
    }
    Ok(analyze_locally(post))
}

fn analyze_locally(post: &PostInput) -> AnalysisResult {
    let signals = extract_signals(&post.title, &post.description, &post.links);
    let (scores, needs_inform) = aggregate_risk(&signals, &post.title, &post.description);
    debug!(
        platform = %post.platform,
        risk_remove = scores.risk_remove,
        risk_reduce = scores.risk_reduce,
        needs_inform,
        "scored post"
    );

    AnalysisResult {
        signals,
        scores,
        actions: ActionDecision {
            needs_inform,
            inform_block: build_inform_block(needs_inform, &post.links),
        },
        fixes: FixSet {
            title: rewrite_title(&post.title),
            description: rewrite_description(&post.description),
            notes: Vec::new(),
        },
        audit: AuditStamp::default(),
    }
}
