//! Research pipeline types

use delve_core::ResearchQuery;
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Kind of report the synthesizer writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub enum ReportType {
    /// Long-form scholarly report
    #[default]
    #[serde(rename = "Research Report")]
    Research,
    /// Annotated bibliography of the sources
    #[serde(rename = "Resource Report")]
    Resource,
    /// Hierarchical outline for a later report
    #[serde(rename = "Outline Report")]
    Outline,
    /// Multi-perspective critical analysis
    #[serde(rename = "Deep Research")]
    Deep,
}

impl ReportType {
    pub const ALL: [ReportType; 4] = [
        ReportType::Research,
        ReportType::Resource,
        ReportType::Outline,
        ReportType::Deep,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ReportType::Research => "Research Report",
            ReportType::Resource => "Resource Report",
            ReportType::Outline => "Outline Report",
            ReportType::Deep => "Deep Research",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ReportType::Research => "Comprehensive scholarly report with full section structure",
            ReportType::Resource => "Bibliographic analysis of the gathered sources",
            ReportType::Outline => "Detailed hierarchical outline for a research paper",
            ReportType::Deep => "Critical, multi-perspective analysis of the evidence",
        }
    }

    /// Look up a report type by display name; unknown names map to the
    /// research report
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
            .unwrap_or_default()
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one research run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchReport {
    pub question: String,
    pub report_type: ReportType,
    /// Queries the corpus was built from, in planner order
    pub queries: Vec<ResearchQuery>,
    pub corpus_chars: usize,
    pub report: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_type_lookup() {
        assert_eq!(ReportType::from_name("Outline Report"), ReportType::Outline);
        assert_eq!(ReportType::from_name("deep research"), ReportType::Deep);
        assert_eq!(ReportType::from_name("Poem"), ReportType::Research);
        assert_eq!(ReportType::from_name(""), ReportType::Research);
    }

    #[test]
    fn test_report_type_serializes_display_name() {
        let json = serde_json::to_string(&ReportType::Resource).unwrap();
        assert_eq!(json, "\"Resource Report\"");
    }
}
