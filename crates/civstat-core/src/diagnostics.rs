// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::borrow::Cow;

/// Diagnostics schema version for report run metadata.
pub const DIAGNOSTICS_SCHEMA_VERSION: u32 = 1;

/// A data-set-literal fix-up applied to the raw input.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataCorrection {
    pub dataset: Cow<'static, str>,
    pub description: String,
    pub affected_rows: usize,
}

/// Structured diagnostics captured from a pipeline run.
///
/// Notes, warnings and corrections are mirrored to `tracing` as they are
/// recorded so the log stream and the embedded report metadata agree.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostics {
    pub schema_version: u32,
    pub engine_version: Option<String>,
    pub pipeline: Cow<'static, str>,
    pub runtime_ms: Option<u64>,
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
    pub corrections: Vec<DataCorrection>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            schema_version: DIAGNOSTICS_SCHEMA_VERSION,
            engine_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            pipeline: Cow::Borrowed(""),
            runtime_ms: None,
            notes: vec![],
            warnings: vec![],
            corrections: vec![],
        }
    }
}

impl Diagnostics {
    pub fn for_pipeline(pipeline: &'static str) -> Self {
        Self {
            pipeline: Cow::Borrowed(pipeline),
            ..Self::default()
        }
    }

    pub fn note(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        tracing::debug!(pipeline = %self.pipeline, "{msg}");
        self.notes.push(msg);
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        tracing::warn!(pipeline = %self.pipeline, "{msg}");
        self.warnings.push(msg);
    }

    pub fn correction(
        &mut self,
        dataset: &'static str,
        description: impl Into<String>,
        affected_rows: usize,
    ) {
        let description = description.into();
        tracing::info!(
            pipeline = %self.pipeline,
            dataset,
            affected_rows,
            "applied data correction: {description}"
        );
        self.corrections.push(DataCorrection {
            dataset: Cow::Borrowed(dataset),
            description,
            affected_rows,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{DIAGNOSTICS_SCHEMA_VERSION, Diagnostics};
    use std::borrow::Cow;

    #[test]
    fn diagnostics_default_sets_schema_and_engine_version() {
        let diagnostics = Diagnostics::default();
        assert_eq!(diagnostics.schema_version, DIAGNOSTICS_SCHEMA_VERSION);
        assert_eq!(
            diagnostics.engine_version,
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
        assert!(diagnostics.runtime_ms.is_none());
        assert!(diagnostics.notes.is_empty());
        assert!(diagnostics.warnings.is_empty());
        assert!(diagnostics.corrections.is_empty());
    }

    #[test]
    fn recorders_append_in_order() {
        let mut diagnostics = Diagnostics::for_pipeline("covid");
        diagnostics.note("dropped first daily row");
        diagnostics.warn("3 negative daily differences");
        diagnostics.correction("jhu_deaths", "split week ending 2021-03-07", 2);

        assert_eq!(diagnostics.pipeline, Cow::Borrowed("covid"));
        assert_eq!(diagnostics.notes, vec!["dropped first daily row".to_string()]);
        assert_eq!(
            diagnostics.warnings,
            vec!["3 negative daily differences".to_string()]
        );
        assert_eq!(diagnostics.corrections.len(), 1);
        assert_eq!(diagnostics.corrections[0].affected_rows, 2);
        assert_eq!(diagnostics.corrections[0].dataset, "jhu_deaths");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn diagnostics_serde_roundtrip_preserves_all_fields() {
        let mut diagnostics = Diagnostics::for_pipeline("shootings");
        diagnostics.runtime_ms = Some(12);
        diagnostics.note("gap-filled 4 borough-months");
        diagnostics.correction("nypd_shootings", "VIC_AGE_GROUP '1022' -> 'UNKNOWN'", 1);

        let encoded = serde_json::to_string(&diagnostics).expect("diagnostics should serialize");
        let decoded: Diagnostics =
            serde_json::from_str(&encoded).expect("diagnostics should deserialize");
        assert_eq!(decoded, diagnostics);
    }
}
