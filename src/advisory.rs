//! Optional remote-model override for the local verdict.
//!
//! The model is asked for six `KEY=value` lines. Parsing is lenient: unknown
//! lines are ignored and bad numbers become `0.0`. Transport failures and
//! replies with no recognizable line make the override unavailable, and the
//! caller keeps its local result.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::AdvisoryConfig;
use crate::{
    build_inform_block, cap_description, cap_title, clamp_unit, extract_signals,
    rewrite_description, rewrite_title, ActionDecision, AnalysisResult, AuditStamp, FixSet,
    PostInput, ScoreVector, POLICY_FRAMEWORK,
};

pub const KEY_RISK_REMOVE: &str = "RISK_REMOVE";
pub const KEY_RISK_REDUCE: &str = "RISK_REDUCE";
pub const KEY_NEEDS_INFORM: &str = "NEEDS_INFORM";
pub const KEY_INFORM_BLOCK: &str = "INFORM_BLOCK";
pub const KEY_FIX_TITLE: &str = "FIX_TITLE";
pub const KEY_FIX_DESC: &str = "FIX_DESC";

static REPLY_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(?P<key>[A-Z_]+)=(?P<value>.*)$").unwrap());

/// A text-generation backend that answers one prompt with one reply.
pub trait AdvisoryModel {
    /// Recorded as `model_version` on results this model produced.
    fn name(&self) -> &str;

    fn complete(&self, prompt: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Prompt and reply
// ---------------------------------------------------------------------------

pub fn build_prompt(post: &PostInput) -> String {
    let links = if post.links.is_empty() {
        "none".to_string()
    } else {
        post.links.join(", ")
    };
    format!(
        "Assess this {platform} post under Remove/Reduce/Inform.\n\
         Title: {title}\n\
         Description: {description}\n\
         Links: {links}\n\n\
         Reply with EXACTLY these 6 lines and nothing else:\n\
         {KEY_RISK_REMOVE}=0..1\n\
         {KEY_RISK_REDUCE}=0..1\n\
         {KEY_NEEDS_INFORM}=true/false\n\
         {KEY_INFORM_BLOCK}=short text\n\
         {KEY_FIX_TITLE}=at most 80 characters\n\
         {KEY_FIX_DESC}=at most 220 characters\n",
        platform = post.platform,
        title = post.title,
        description = post.description,
    )
}

/// Collect every `KEY=value` line. Values are trimmed; a repeated key keeps
/// its last value.
pub fn parse_reply(text: &str) -> HashMap<String, String> {
    REPLY_LINE_RE
        .captures_iter(text)
        .map(|caps| (caps["key"].to_string(), caps["value"].trim().to_string()))
        .collect()
}

/// Typed view of a parsed reply. Never fails.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdvisoryVerdict {
    pub risk_remove: f64,
    pub risk_reduce: f64,
    pub needs_inform: bool,
    pub inform_block: String,
    pub fix_title: String,
    pub fix_description: String,
}

impl AdvisoryVerdict {
    pub fn from_reply(fields: &HashMap<String, String>) -> Self {
        let text = |key: &str| fields.get(key).cloned().unwrap_or_default();
        Self {
            risk_remove: unit_field(fields.get(KEY_RISK_REMOVE)),
            risk_reduce: unit_field(fields.get(KEY_RISK_REDUCE)),
            needs_inform: fields
                .get(KEY_NEEDS_INFORM)
                .is_some_and(|v| v.eq_ignore_ascii_case("true")),
            inform_block: text(KEY_INFORM_BLOCK),
            fix_title: text(KEY_FIX_TITLE),
            fix_description: text(KEY_FIX_DESC),
        }
    }
}

fn unit_field(raw: Option<&String>) -> f64 {
    raw.and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(clamp_unit)
        .unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Override
// ---------------------------------------------------------------------------

/// Ask `model` for a verdict on `post`. Returns `None` on any failure.
pub fn try_advisory_override(post: &PostInput, model: &dyn AdvisoryModel) -> Option<AnalysisResult> {
    let reply = match model.complete(&build_prompt(post)) {
        Ok(reply) => reply,
        Err(err) => {
            warn!(model = model.name(), error = %err, "advisory unavailable, using local verdict");
            return None;
        }
    };

    let fields = parse_reply(&reply);
    if fields.is_empty() {
        warn!(model = model.name(), "advisory reply had no KEY=value lines, using local verdict");
        return None;
    }
    debug!(model = model.name(), keys = fields.len(), "advisory reply parsed");

    Some(assemble(post, model.name(), AdvisoryVerdict::from_reply(&fields)))
}

fn assemble(post: &PostInput, model_name: &str, verdict: AdvisoryVerdict) -> AnalysisResult {
    let inform_block = match (verdict.needs_inform, verdict.inform_block.is_empty()) {
        (false, _) => String::new(),
        (true, true) => build_inform_block(true, &post.links),
        (true, false) => verdict.inform_block,
    };
    let title = if verdict.fix_title.is_empty() {
        rewrite_title(&post.title)
    } else {
        cap_title(verdict.fix_title)
    };
    let description = if verdict.fix_description.is_empty() {
        rewrite_description(&post.description)
    } else {
        cap_description(&verdict.fix_description)
    };

    AnalysisResult {
        signals: extract_signals(&post.title, &post.description, &post.links),
        scores: ScoreVector {
            risk_remove: verdict.risk_remove,
            risk_reduce: verdict.risk_reduce,
        },
        actions: ActionDecision {
            needs_inform: verdict.needs_inform,
            inform_block,
        },
        fixes: FixSet {
            title,
            description,
            notes: Vec::new(),
        },
        audit: AuditStamp {
            policy_framework: POLICY_FRAMEWORK.to_string(),
            model_version: model_name.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Gemini backend
// ---------------------------------------------------------------------------

/// `generateContent` client. One attempt per call, bounded by the configured timeout.
pub struct GeminiClient {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    /// `None` unless the config enables the gemini provider with a key.
    pub fn from_config(config: &AdvisoryConfig) -> Option<Self> {
        if !config.is_enabled() {
            debug!(provider = %config.provider, "advisory override disabled");
            return None;
        }
        let api_key = config.api_key.clone()?;
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Some(Self {
            agent,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

impl AdvisoryModel for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        let url = self.url();
        let payload = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
        });
        let response = self
            .agent
            .post(&url)
            .query("key", &self.api_key)
            .send_json(payload)
            .with_context(|| format!("POST {} failed", url))?;
        let text = response
            .into_string()
            .map_err(|e| anyhow!("read response body failed: {}", e))?;
        let value: Value =
            serde_json::from_str(&text).map_err(|e| anyhow!("parse json failed: {}", e))?;
        reply_text(&value).ok_or_else(|| anyhow!("response carried no candidate text"))
    }
}

/// Concatenate the text parts of the first candidate.
fn reply_text(value: &Value) -> Option<String> {
    let parts = value.pointer("/candidates/0/content/parts")?.as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
