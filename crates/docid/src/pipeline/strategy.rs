use std::sync::Arc;

use regex::Regex;

use crate::processor::{CodeDetector, RegionPolicy};

/// Decides whether a decoded payload is an acceptable identifier.
#[derive(Debug, Clone)]
pub enum PayloadValidator {
    /// Ordered patterns; a payload is accepted by the first one that matches
    /// at its first character.
    Patterns(Vec<Regex>),
    AcceptAll,
}

impl PayloadValidator {
    pub fn accepts(&self, payload: &str) -> bool {
        match self {
            PayloadValidator::Patterns(patterns) => patterns
                .iter()
                .any(|re| re.find(payload).is_some_and(|m| m.start() == 0)),
            PayloadValidator::AcceptAll => true,
        }
    }
}

/// How many decoded payloads the pipeline is willing to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidatePolicy {
    /// Only the first non-empty payload is considered.
    FirstOnly,
    /// Every payload is tried in detection order until a rename succeeds.
    TryEach,
}

/// Everything that differs between the QR and the barcode flow.
#[derive(Clone)]
pub struct DetectionStrategy {
    pub name: &'static str,
    pub region: RegionPolicy,
    pub detector: Arc<dyn CodeDetector>,
    pub validator: PayloadValidator,
    pub candidates: CandidatePolicy,
}

impl DetectionStrategy {
    /// Whole page, first payload, validated against `patterns`.
    pub fn qr(detector: Arc<dyn CodeDetector>, patterns: Vec<Regex>) -> Self {
        Self {
            name: "qr",
            region: RegionPolicy::FullPage,
            detector,
            validator: PayloadValidator::Patterns(patterns),
            candidates: CandidatePolicy::FirstOnly,
        }
    }

    /// Top-right quadrant, every payload, no validation.
    pub fn barcode(detector: Arc<dyn CodeDetector>) -> Self {
        Self {
            name: "barcode",
            region: RegionPolicy::TopRightQuadrant,
            detector,
            validator: PayloadValidator::AcceptAll,
            candidates: CandidatePolicy::TryEach,
        }
    }

    /// Trims payloads, drops empty ones and applies the candidate policy.
    pub(crate) fn candidates(&self, payloads: Vec<String>) -> Vec<String> {
        let mut trimmed = payloads
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        match self.candidates {
            CandidatePolicy::FirstOnly => trimmed.next().into_iter().collect(),
            CandidatePolicy::TryEach => trimmed.collect(),
        }
    }
}

impl std::fmt::Debug for DetectionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionStrategy")
            .field("name", &self.name)
            .field("region", &self.region)
            .field("detector", &self.detector.name())
            .field("validator", &self.validator)
            .field("candidates", &self.candidates)
            .finish()
    }
}
