// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Information-criterion order selection over a bounded (p, d, q) grid.
//!
//! The stepwise strategy follows Hyndman & Khandakar (2008): start from a
//! small set of models, then move to the best neighbour until no neighbour
//! improves the criterion. The white-noise-with-mean baseline ARIMA(0,0,0)
//! is always scored, so the selected model never scores worse than it.
//!
//! Every candidate, the baseline included, conditions on the same leading
//! `max_d + max_p` observations, so criteria are sums over one common set of
//! time points. Candidates with different `d` still model differently
//! transformed data; their likelihoods share a sample but not a scale, so
//! ranking across `d` (including against the undifferenced baseline) is a
//! heuristic.

use crate::model::{ArimaFit, ArimaOrder, Criterion, FitConfig, fit_arima};
use civstat_core::StatError;
use std::collections::BTreeMap;

const BASELINE: ArimaOrder = ArimaOrder::new(0, 0, 0);
const MAX_STEPWISE_MOVES: usize = 100;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SearchStrategy {
    Exhaustive,
    #[default]
    Stepwise,
}

impl SearchStrategy {
    pub fn label(self) -> &'static str {
        match self {
            Self::Exhaustive => "exhaustive",
            Self::Stepwise => "stepwise",
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrderSearchConfig {
    pub strategy: SearchStrategy,
    pub criterion: Criterion,
    pub max_p: usize,
    pub max_q: usize,
    /// Upper bound on `p + q`.
    pub max_order: usize,
    /// Upper bound on `d` when the search also chooses the differencing.
    pub max_d: usize,
    pub fit: FitConfig,
}

impl Default for OrderSearchConfig {
    fn default() -> Self {
        Self {
            strategy: SearchStrategy::Stepwise,
            criterion: Criterion::Aic,
            max_p: 5,
            max_q: 5,
            max_order: 5,
            max_d: 2,
            fit: FitConfig::default(),
        }
    }
}

impl OrderSearchConfig {
    fn admits(&self, p: usize, q: usize) -> bool {
        p <= self.max_p && q <= self.max_q && p + q <= self.max_order
    }
}

/// Score of one evaluated candidate; failed fits score `+∞` and keep the
/// failure message.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateScore {
    pub order: ArimaOrder,
    pub score: f64,
    pub converged: bool,
    pub error: Option<String>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct OrderSearchOutcome {
    pub strategy: SearchStrategy,
    pub criterion: Criterion,
    pub best: ArimaFit,
    pub baseline: CandidateScore,
    /// Every evaluated candidate in (p, d, q) order.
    pub candidates: Vec<CandidateScore>,
}

struct Evaluator<'a> {
    x: &'a [f64],
    config: &'a OrderSearchConfig,
    /// Shared by every candidate so their criteria are comparable.
    fit: FitConfig,
    fits: BTreeMap<ArimaOrder, Result<ArimaFit, StatError>>,
}

impl Evaluator<'_> {
    fn score(&mut self, order: ArimaOrder) -> f64 {
        let criterion = self.config.criterion;
        let x = self.x;
        let fit_config = self.fit;
        let entry = self
            .fits
            .entry(order)
            .or_insert_with(|| fit_arima(x, order, &fit_config));
        match entry {
            Ok(fit) => {
                let score = fit.criterion(criterion);
                tracing::debug!(%order, criterion = criterion.label(), score, "scored candidate");
                score
            }
            Err(err) => {
                tracing::debug!(%order, error = %err, "candidate fit failed");
                f64::INFINITY
            }
        }
    }
}

/// Selects an ARIMA order for `x` by the configured criterion.
///
/// `d = Some(_)` fixes the differencing order (typically from
/// [`crate::stationarize`]); `None` searches `0..=max_d`. Each fit skips the
/// first `d + max_p` observations (`max_d + max_p` when `d` is free), so
/// `best.n_used` is the same whichever order wins.
pub fn search_orders(
    x: &[f64],
    config: &OrderSearchConfig,
    d: Option<usize>,
) -> Result<OrderSearchOutcome, StatError> {
    let differencing: Vec<usize> = match d {
        Some(d) => vec![d],
        None => (0..=config.max_d).collect(),
    };
    let max_d = differencing.iter().copied().max().unwrap_or(0);
    let common_skip = max_d + config.max_p;
    let condition_on = config
        .fit
        .condition_on
        .map_or(common_skip, |skip| skip.max(common_skip));
    let fit = FitConfig {
        condition_on: Some(condition_on),
        ..config.fit
    };
    let mut evaluator = Evaluator {
        x,
        config,
        fit,
        fits: BTreeMap::new(),
    };

    let baseline_score = evaluator.score(BASELINE);
    if let Some(Err(err)) = evaluator.fits.get(&BASELINE) {
        return Err(err.clone());
    }

    for &d in &differencing {
        match config.strategy {
            SearchStrategy::Exhaustive => {
                for p in 0..=config.max_p {
                    for q in 0..=config.max_q {
                        if config.admits(p, q) {
                            evaluator.score(ArimaOrder::new(p, d, q));
                        }
                    }
                }
            }
            SearchStrategy::Stepwise => stepwise(&mut evaluator, d),
        }
    }

    let mut candidates = Vec::with_capacity(evaluator.fits.len());
    let mut best: Option<(f64, ArimaOrder)> = None;
    for (order, result) in &evaluator.fits {
        let candidate = match result {
            Ok(fit) => CandidateScore {
                order: *order,
                score: fit.criterion(config.criterion),
                converged: fit.converged,
                error: None,
            },
            Err(err) => CandidateScore {
                order: *order,
                score: f64::INFINITY,
                converged: false,
                error: Some(err.to_string()),
            },
        };
        if result.is_ok() && best.is_none_or(|(score, _)| candidate.score < score) {
            best = Some((candidate.score, *order));
        }
        candidates.push(candidate);
    }

    let best_order = best.map(|(_, order)| order).unwrap_or(BASELINE);
    let best_fit = match evaluator.fits.remove(&best_order) {
        Some(Ok(fit)) => fit,
        _ => {
            return Err(StatError::numerical_issue(
                "order search produced no usable candidate",
            ));
        }
    };
    let baseline = CandidateScore {
        order: BASELINE,
        score: baseline_score,
        converged: candidates
            .iter()
            .find(|c| c.order == BASELINE)
            .is_some_and(|c| c.converged),
        error: None,
    };

    tracing::info!(
        strategy = config.strategy.label(),
        criterion = config.criterion.label(),
        evaluated = candidates.len(),
        selected = %best_order,
        score = best_fit.criterion(config.criterion),
        baseline = baseline_score,
        "order search complete"
    );

    Ok(OrderSearchOutcome {
        strategy: config.strategy,
        criterion: config.criterion,
        best: best_fit,
        baseline,
        candidates,
    })
}

fn stepwise(evaluator: &mut Evaluator<'_>, d: usize) {
    let config = evaluator.config;
    let starts = [(2, 2), (0, 0), (1, 0), (0, 1)];

    let mut current: Option<(f64, usize, usize)> = None;
    for (p, q) in starts {
        if !config.admits(p, q) {
            continue;
        }
        let score = evaluator.score(ArimaOrder::new(p, d, q));
        if current.is_none_or(|(best, _, _)| score < best) {
            current = Some((score, p, q));
        }
    }
    let Some((mut best_score, mut p, mut q)) = current else {
        return;
    };

    for _ in 0..MAX_STEPWISE_MOVES {
        let mut improved = None;
        for (dp, dq) in [(-1, 0), (1, 0), (0, -1), (0, 1), (-1, -1), (1, 1)] {
            let (Some(np), Some(nq)) = (p.checked_add_signed(dp), q.checked_add_signed(dq))
            else {
                continue;
            };
            if !config.admits(np, nq) {
                continue;
            }
            let score = evaluator.score(ArimaOrder::new(np, d, nq));
            if score < improved.map_or(best_score, |(s, _, _)| s) {
                improved = Some((score, np, nq));
            }
        }
        match improved {
            Some((score, np, nq)) => {
                best_score = score;
                p = np;
                q = nq;
            }
            None => break,
        }
    }
}
