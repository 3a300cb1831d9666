//! Ensemble combiner: confidence-weighted voting across algorithms.
//!
//! Sums confidence per signal tag, normalizes to weights, and picks the
//! heaviest tag (ties break by encounter order). A close buy/sell race is
//! overridden to hold, and a heavy buy consensus upgrades to a limit order
//! at the mean of the contributing limit prices.

use thiserror::Error;

use crate::algos::AlgorithmResult;
use crate::domain::{OrderKind, Signal};

/// Fraction of total confidence under which a buy/sell race reads as
/// disagreement.
const DISAGREEMENT_BAND: f64 = 0.2;

/// Buy weight above which the combiner places a limit order.
const LIMIT_UPGRADE_WEIGHT: f64 = 0.7;

#[derive(Debug, Error, PartialEq)]
pub enum EnsembleError {
    #[error("no results to combine")]
    NoResults,
}

/// One constituent vote, tagged with the producing algorithm's name.
#[derive(Debug, Clone)]
pub struct ScoredResult {
    pub algorithm: String,
    pub result: AlgorithmResult,
}

impl ScoredResult {
    pub fn new(algorithm: impl Into<String>, result: AlgorithmResult) -> Self {
        Self { algorithm: algorithm.into(), result }
    }
}

/// Fuse independent per-algorithm results into a single decision.
pub fn combine_results(results: &[ScoredResult]) -> Result<AlgorithmResult, EnsembleError> {
    if results.is_empty() {
        return Err(EnsembleError::NoResults);
    }
    if results.len() == 1 {
        return Ok(results[0].result.clone());
    }

    // Confidence-weighted tally per signal tag, in encounter order.
    let mut tags: Vec<Signal> = Vec::new();
    let mut tag_weights: Vec<f64> = Vec::new();
    let mut total_buy = 0.0;
    let mut total_sell = 0.0;
    let mut total_confidence = 0.0;

    for scored in results {
        let r = &scored.result;
        match r.signal {
            Signal::Buy => total_buy += r.confidence,
            Signal::Sell => total_sell += r.confidence,
            _ => {}
        }
        total_confidence += r.confidence;

        match tags.iter().position(|&t| t == r.signal) {
            Some(i) => tag_weights[i] += r.confidence,
            None => {
                tags.push(r.signal);
                tag_weights.push(r.confidence);
            }
        }
    }

    if total_confidence > 0.0 {
        for w in &mut tag_weights {
            *w /= total_confidence;
        }
    }

    // Heaviest tag wins; encounter order breaks ties.
    let (mut combined, mut weight) = (tags[0], tag_weights[0]);
    for (&tag, &w) in tags.iter().zip(&tag_weights).skip(1) {
        if w > weight {
            combined = tag;
            weight = w;
        }
    }

    // Near-tied buy/sell pressure reads as disagreement: stand down.
    if (total_buy - total_sell).abs() < DISAGREEMENT_BAND * total_confidence
        && combined.is_directional()
    {
        combined = Signal::Hold;
        weight = ((total_buy + total_sell) / 2.0).min(1.0);
    }

    // A heavy buy consensus gets a limit order at the mean proposed price.
    let mut order_kind = OrderKind::Market;
    let mut limit_price = None;
    if combined == Signal::Buy && weight > LIMIT_UPGRADE_WEIGHT {
        let buy_limits: Vec<f64> = results
            .iter()
            .filter(|s| s.result.signal == Signal::Buy)
            .filter_map(|s| s.result.limit_price)
            .collect();
        if !buy_limits.is_empty() {
            order_kind = OrderKind::Limit;
            limit_price = Some(buy_limits.iter().sum::<f64>() / buy_limits.len() as f64);
        }
    }

    let mut explanation = format!("Combined analysis from {} algorithms:\n", results.len());
    for scored in results {
        explanation.push_str(&format!(
            "- {} ({:.0}% confidence): {}\n",
            scored.algorithm,
            scored.result.confidence * 100.0,
            scored.result.signal
        ));
    }
    explanation.push_str(&format!(
        "\nFinal recommendation: {combined} with {:.0}% confidence.\n",
        weight * 100.0
    ));
    explanation.push_str(match combined {
        Signal::Buy => {
            "The algorithms suggest a potential upside based on favorable risk-adjusted \
             returns and market conditions."
        }
        Signal::Sell => {
            "The algorithms indicate negative momentum and unfavorable risk-return profile, \
             suggesting a downside risk."
        }
        _ => {
            "The algorithms show mixed or neutral signals, suggesting maintaining current \
             positions."
        }
    });

    Ok(AlgorithmResult {
        signal: combined,
        order_kind,
        limit_price,
        weights: None,
        confidence: weight,
        explanation,
    })
}
