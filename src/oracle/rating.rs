//! Review summary lookup over HTTP.
//!
//! The rating source is optional and independent of version resolution: any
//! failure here degrades to an all-`None` summary and never affects the
//! build id or its timestamp.
use crate::catalog::RatingSummary;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::time::Duration;

use super::client::ID_PLACEHOLDER;

/// Anything that can produce a rating summary for one id.
pub trait RatingSource: Sync {
    fn fetch(&self, id: &str) -> Result<RatingSummary>;
}

/// Review endpoint queried with a GET per id.
pub struct HttpRatingSource {
    agent: ureq::Agent,
    url_template: String,
}

impl HttpRatingSource {
    pub fn new(url_template: &str, timeout: Duration) -> Result<Self> {
        if !url_template.contains(ID_PLACEHOLDER) {
            return Err(anyhow!(
                "rating URL must contain an {ID_PLACEHOLDER} placeholder: {url_template}"
            ));
        }
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Ok(Self {
            agent: config.into(),
            url_template: url_template.to_string(),
        })
    }
}

impl RatingSource for HttpRatingSource {
    fn fetch(&self, id: &str) -> Result<RatingSummary> {
        let url = self.url_template.replace(ID_PLACEHOLDER, id);
        let mut response = self
            .agent
            .get(&url)
            .call()
            .with_context(|| format!("GET {url}"))?;
        let payload: ReviewPayload = response
            .body_mut()
            .read_json()
            .with_context(|| format!("parse review JSON from {url}"))?;
        summary_from_payload(payload)
    }
}

/// Fetch a rating, degrading every failure to the empty summary.
pub fn fetch_or_empty(source: &dyn RatingSource, id: &str) -> RatingSummary {
    match source.fetch(id) {
        Ok(summary) => summary,
        Err(err) => {
            tracing::warn!(id, error = %format!("{err:#}"), "rating lookup degraded");
            RatingSummary::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReviewPayload {
    success: Option<i64>,
    query_summary: Option<ReviewCounts>,
}

#[derive(Debug, Deserialize)]
struct ReviewCounts {
    review_score_desc: Option<String>,
    total_reviews: Option<u64>,
    total_positive: Option<u64>,
    total_negative: Option<u64>,
}

fn summary_from_payload(payload: ReviewPayload) -> Result<RatingSummary> {
    if payload.success.is_some_and(|flag| flag != 1) {
        return Err(anyhow!("review endpoint reported success={:?}", payload.success));
    }
    let counts = payload
        .query_summary
        .ok_or_else(|| anyhow!("review payload missing query_summary"))?;
    let total = counts.total_reviews.or(match (counts.total_positive, counts.total_negative) {
        (Some(positive), Some(negative)) => Some(positive.saturating_add(negative)),
        _ => None,
    });
    Ok(RatingSummary {
        percent: percent_positive(counts.total_positive, total),
        total,
        positive: counts.total_positive,
        negative: counts.total_negative,
        descriptor: counts
            .review_score_desc
            .map(|desc| desc.trim().to_string())
            .filter(|desc| !desc.is_empty()),
    })
}

fn percent_positive(positive: Option<u64>, total: Option<u64>) -> Option<u8> {
    let (positive, total) = (positive?, total?);
    if total == 0 || positive > total {
        return None;
    }
    let percent = (positive as f64 * 100.0 / total as f64).round();
    Some(percent as u8)
}
