//! Behavior parameter validation.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;

use tracing::debug;

use super::metrics::MetricValue;
use super::{check_cancelled, require_identifier, SelfEvalError};

/// Check that an observed behavior bundle is well-formed.
///
/// Valid means: at least one parameter, no nulls, no empty or
/// whitespace-only text, and no non-finite numbers. Booleans of either value
/// are fine; a `false` flag is a legitimate observation, not a defect.
pub fn validate_behavior(
    component: &str,
    observed: &HashMap<String, MetricValue>,
    cancel: Option<&AtomicBool>,
) -> Result<bool, SelfEvalError> {
    check_cancelled(cancel)?;
    require_identifier("component", component)?;

    if observed.is_empty() {
        debug!(component, "empty behavior bundle fails validation");
        return Ok(false);
    }

    for (key, value) in observed {
        let valid = match value {
            MetricValue::Null => false,
            MetricValue::Text(s) => !s.trim().is_empty(),
            MetricValue::Float(v) => v.is_finite(),
            MetricValue::Int(_) | MetricValue::Flag(_) => true,
        };
        if !valid {
            debug!(component, key, "behavior parameter failed validation");
            return Ok(false);
        }
    }

    Ok(true)
}
