//! Drift detection between applied and observed attributes.
//!
//! Free-text attributes go through the semantic comparator; ids and other
//! scalars compare exactly. An attribute the host never declared is not
//! tracked and never reported as drift, even if the platform fills it with
//! a default.

use crate::compare::ManagedValue;
use crate::domain::DriftRecord;
use crate::obs;

/// Accumulates drift while building the observed attribute set.
#[derive(Debug, Default)]
pub struct DriftCheck {
    record: DriftRecord,
}

impl DriftCheck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare a free-text attribute.
    ///
    /// Returns the value to keep in state: the applied text when the two
    /// are semantically equal (so formatting changes made by the platform
    /// do not show up as a diff), the observed text otherwise.
    pub fn text(
        &mut self,
        attribute: &str,
        applied: Option<&ManagedValue>,
        observed: Option<&str>,
    ) -> Option<ManagedValue> {
        let applied = applied?;
        let observed = observed.unwrap_or_default();
        if applied.semantic_eq(&ManagedValue::new(observed)) {
            Some(applied.clone())
        } else {
            self.record.push(attribute);
            Some(ManagedValue::new(observed))
        }
    }

    /// Compare a required scalar attribute.
    pub fn exact<T: PartialEq>(&mut self, attribute: &str, applied: &T, observed: T) -> T {
        if *applied != observed {
            self.record.push(attribute);
        }
        observed
    }

    /// Compare an optional scalar attribute; untracked when not applied.
    pub fn exact_opt<T: PartialEq>(
        &mut self,
        attribute: &str,
        applied: Option<&T>,
        observed: Option<T>,
    ) -> Option<T> {
        let applied = applied?;
        if observed.as_ref() != Some(applied) {
            self.record.push(attribute);
        }
        observed
    }

    /// Finish the check, logging drift if any was found.
    pub fn finish(self, kind: &str, id: i64) -> DriftRecord {
        if !self.record.is_empty() {
            obs::emit_drift_detected(kind, id, &self.record.attributes);
        }
        self.record
    }
}
