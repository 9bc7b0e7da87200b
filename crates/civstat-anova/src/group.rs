// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use civstat_core::StatError;
use std::collections::BTreeSet;

/// A labelled sample; one level of the grouping factor.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct SampleGroup {
    pub label: String,
    pub values: Vec<f64>,
}

impl SampleGroup {
    pub fn new(label: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Shared precondition check for the group-comparison tests.
///
/// Requires at least two groups, unique labels, finite values and at least
/// `min_n` observations per group.
pub(crate) fn validate_groups(
    groups: &[SampleGroup],
    min_n: usize,
    context: &str,
) -> Result<(), StatError> {
    if groups.len() < 2 {
        return Err(StatError::invalid_input(format!(
            "{context} requires at least 2 groups, got {}",
            groups.len()
        )));
    }

    let mut seen = BTreeSet::new();
    for group in groups {
        if !seen.insert(group.label.as_str()) {
            return Err(StatError::invalid_input(format!(
                "{context}: duplicate group label '{}'",
                group.label
            )));
        }
        if group.len() < min_n {
            return Err(StatError::invalid_input(format!(
                "{context}: group '{}' has {} observations, need at least {min_n}",
                group.label,
                group.len()
            )));
        }
        if let Some((idx, value)) = group
            .values
            .iter()
            .copied()
            .enumerate()
            .find(|(_, v)| !v.is_finite())
        {
            return Err(StatError::invalid_input(format!(
                "{context}: group '{}' index {idx} is not finite: {value}",
                group.label
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{SampleGroup, validate_groups};

    #[test]
    fn validate_groups_rejects_each_precondition() {
        let single = vec![SampleGroup::new("a", vec![1.0, 2.0])];
        assert!(
            validate_groups(&single, 2, "test")
                .expect_err("one group should fail")
                .to_string()
                .contains("at least 2 groups")
        );

        let duplicate = vec![
            SampleGroup::new("a", vec![1.0, 2.0]),
            SampleGroup::new("a", vec![3.0, 4.0]),
        ];
        assert!(
            validate_groups(&duplicate, 2, "test")
                .expect_err("duplicate labels should fail")
                .to_string()
                .contains("duplicate")
        );

        let short = vec![
            SampleGroup::new("a", vec![1.0]),
            SampleGroup::new("b", vec![3.0, 4.0]),
        ];
        assert!(validate_groups(&short, 2, "test").is_err());

        let nan = vec![
            SampleGroup::new("a", vec![1.0, f64::NAN]),
            SampleGroup::new("b", vec![3.0, 4.0]),
        ];
        assert!(validate_groups(&nan, 2, "test").is_err());

        let ok = vec![
            SampleGroup::new("a", vec![1.0, 2.0]),
            SampleGroup::new("b", vec![3.0, 4.0]),
        ];
        assert!(validate_groups(&ok, 2, "test").is_ok());
    }
}
