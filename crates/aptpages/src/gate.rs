//! Proceed-or-skip decision for one publish request.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::annotate::SUBJECT_PREFIX;
use crate::fingerprint::Fingerprint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Not on the branch yet: publish it.
    Proceed,
    /// Already on the branch: a repeated trigger, finish without changes.
    SkipNoop,
}

/// Everything the gate looks at.
#[derive(Debug, Clone, Copy)]
pub struct GateInput<'a> {
    pub current: &'a Fingerprint,
    pub recorded: &'a BTreeSet<Fingerprint>,
    /// Subject of the branch tip, `None` for an empty branch.
    pub tip_subject: Option<&'a str>,
}

impl GateInput<'_> {
    /// Whether the branch tip was written by this tool. Informational only:
    /// back-to-back automation commits for different packages are normal.
    pub fn tip_is_automation(&self) -> bool {
        self.tip_subject
            .is_some_and(|s| s.starts_with(SUBJECT_PREFIX))
    }
}

/// Skip exactly when the fingerprint is already recorded.
pub fn decide(input: &GateInput<'_>) -> Decision {
    if input.recorded.contains(input.current) {
        Decision::SkipNoop
    } else {
        Decision::Proceed
    }
}
