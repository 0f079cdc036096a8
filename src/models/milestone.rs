use std::fmt;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

/// Category of a dated project event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    Estimate,
    InternalAssessment,
    DevStart,
    DevEnd,
    Uat,
    BusinessSimulation,
    TestRelease,
    ProdRelease,
    EstimateDeadline,
    SystemConfiguration,
}

impl MilestoneKind {
    /// Every category, in the order events are flattened for the calendar
    pub const ALL: [MilestoneKind; 10] = [
        MilestoneKind::Estimate,
        MilestoneKind::InternalAssessment,
        MilestoneKind::DevStart,
        MilestoneKind::DevEnd,
        MilestoneKind::Uat,
        MilestoneKind::BusinessSimulation,
        MilestoneKind::TestRelease,
        MilestoneKind::ProdRelease,
        MilestoneKind::EstimateDeadline,
        MilestoneKind::SystemConfiguration,
    ];

    /// Categories drawn on the timeline, in marker order
    pub const TIMELINE: [MilestoneKind; 7] = [
        MilestoneKind::InternalAssessment,
        MilestoneKind::DevStart,
        MilestoneKind::DevEnd,
        MilestoneKind::Uat,
        MilestoneKind::BusinessSimulation,
        MilestoneKind::TestRelease,
        MilestoneKind::ProdRelease,
    ];

    /// The mandatory dates, in the order they must be weakly increasing
    pub const SEQUENCE: [MilestoneKind; 6] = [
        MilestoneKind::Estimate,
        MilestoneKind::InternalAssessment,
        MilestoneKind::DevStart,
        MilestoneKind::DevEnd,
        MilestoneKind::TestRelease,
        MilestoneKind::ProdRelease,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MilestoneKind::Estimate => "Estimate",
            MilestoneKind::InternalAssessment => "IA delivery",
            MilestoneKind::DevStart => "Dev start",
            MilestoneKind::DevEnd => "Dev end",
            MilestoneKind::Uat => "UAT",
            MilestoneKind::BusinessSimulation => "Business simulation",
            MilestoneKind::TestRelease => "Test release",
            MilestoneKind::ProdRelease => "Prod release",
            MilestoneKind::EstimateDeadline => "Supplier estimate deadline",
            MilestoneKind::SystemConfiguration => "System configuration",
        }
    }

    /// Single-character marker used by the terminal timeline
    pub fn glyph(self) -> char {
        match self {
            MilestoneKind::Estimate => 'E',
            MilestoneKind::InternalAssessment => 'A',
            MilestoneKind::DevStart => '>',
            MilestoneKind::DevEnd => '|',
            MilestoneKind::Uat => 'U',
            MilestoneKind::BusinessSimulation => 'B',
            MilestoneKind::TestRelease => 'T',
            MilestoneKind::ProdRelease => 'P',
            MilestoneKind::EstimateDeadline => 'D',
            MilestoneKind::SystemConfiguration => 'C',
        }
    }

    /// UAT and business simulation may be absent from a project
    pub fn is_optional(self) -> bool {
        !matches!(
            self,
            MilestoneKind::Estimate
                | MilestoneKind::InternalAssessment
                | MilestoneKind::DevStart
                | MilestoneKind::DevEnd
                | MilestoneKind::TestRelease
                | MilestoneKind::ProdRelease
        )
    }
}

impl fmt::Display for MilestoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single dated event flattened out of a project. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct MilestoneEvent {
    pub date: Date,
    pub kind: MilestoneKind,
    pub project_id: String,
    pub project_name: String,
    pub suppliers: Vec<String>,
}

impl MilestoneEvent {
    pub fn label(&self) -> &'static str {
        self.kind.label()
    }
}
