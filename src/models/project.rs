use jiff::civil::Date;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::milestone::{MilestoneEvent, MilestoneKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(
        "Dates are out of sequence: {later} ({later_date}) comes before {earlier} ({earlier_date})"
    )]
    InvalidDateSequence {
        earlier: MilestoneKind,
        earlier_date: Date,
        later: MilestoneKind,
        later_date: Date,
    },

    #[error("{0} date is required")]
    MissingDate(MilestoneKind),
}

/// A delivery project as stored in the shared document.
///
/// The serialized key names are those of the existing documents and must not
/// change; field order here is the order fields are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Opaque identifier, assigned once at creation
    pub id: String,
    /// Name of the project
    #[serde(rename = "nome")]
    pub name: String,
    /// Suppliers working on the project; order is not significant
    #[serde(rename = "fornitori", default)]
    pub suppliers: Vec<String>,
    #[serde(rename = "dataStima", default, deserialize_with = "lenient_date")]
    pub estimate: Option<Date>,
    #[serde(rename = "dataIA", default, deserialize_with = "lenient_date")]
    pub internal_assessment: Option<Date>,
    #[serde(rename = "devStart", default, deserialize_with = "lenient_date")]
    pub dev_start: Option<Date>,
    #[serde(rename = "devEnd", default, deserialize_with = "lenient_date")]
    pub dev_end: Option<Date>,
    #[serde(rename = "dataTest", default, deserialize_with = "lenient_date")]
    pub test_release: Option<Date>,
    #[serde(rename = "dataProd", default, deserialize_with = "lenient_date")]
    pub prod_release: Option<Date>,
    #[serde(rename = "dataUAT", default, deserialize_with = "lenient_date")]
    pub uat: Option<Date>,
    #[serde(rename = "dataBS", default, deserialize_with = "lenient_date")]
    pub business_simulation: Option<Date>,
    /// Link to the ticket tracker, not validated
    #[serde(rename = "jira", default)]
    pub ticket_url: String,
    /// Deadline for the supplier to hand in its estimate
    #[serde(rename = "dataScadenzaStima", default, deserialize_with = "lenient_date")]
    pub estimate_deadline: Option<Date>,
    #[serde(rename = "dataConfigSistema", default, deserialize_with = "lenient_date")]
    pub system_configuration: Option<Date>,
    /// Estimated effort in person-days
    #[serde(rename = "stimaGgu", default)]
    pub effort_days: Option<f64>,
    /// Supplier daily rate
    #[serde(rename = "rcFornitore", default)]
    pub daily_rate: Option<f64>,
    /// Effort times rate, kept in the document for readers that don't derive it
    #[serde(rename = "stimaCosto", default)]
    pub estimated_cost: Option<f64>,
}

/// Missing, null, empty and unreadable dates all mean "not set".
///
/// One damaged record must not make the rest of the document unreadable.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(text)) => text.trim().parse::<Date>().ok(),
        _ => None,
    })
}

impl Project {
    pub fn date_of(&self, kind: MilestoneKind) -> Option<Date> {
        match kind {
            MilestoneKind::Estimate => self.estimate,
            MilestoneKind::InternalAssessment => self.internal_assessment,
            MilestoneKind::DevStart => self.dev_start,
            MilestoneKind::DevEnd => self.dev_end,
            MilestoneKind::Uat => self.uat,
            MilestoneKind::BusinessSimulation => self.business_simulation,
            MilestoneKind::TestRelease => self.test_release,
            MilestoneKind::ProdRelease => self.prod_release,
            MilestoneKind::EstimateDeadline => self.estimate_deadline,
            MilestoneKind::SystemConfiguration => self.system_configuration,
        }
    }

    /// Defined dates among `kinds`, in the order given
    pub fn dates_among<'a>(
        &'a self,
        kinds: &'a [MilestoneKind],
    ) -> impl Iterator<Item = (MilestoneKind, Date)> + 'a {
        kinds
            .iter()
            .filter_map(move |kind| self.date_of(*kind).map(|date| (*kind, date)))
    }

    /// Every defined date of the project as a flattened event
    pub fn events(&self) -> impl Iterator<Item = MilestoneEvent> + '_ {
        self.dates_among(&MilestoneKind::ALL)
            .map(|(kind, date)| MilestoneEvent {
                date,
                kind,
                project_id: self.id.clone(),
                project_name: self.name.clone(),
                suppliers: self.suppliers.clone(),
            })
    }

    /// Checks that all six mandatory dates are set and that
    /// estimate <= IA <= dev start <= dev end <= test <= prod
    pub fn validate_dates(&self) -> Result<(), ValidationError> {
        let mut sequence = Vec::with_capacity(MilestoneKind::SEQUENCE.len());
        for kind in MilestoneKind::SEQUENCE {
            let date = self
                .date_of(kind)
                .ok_or(ValidationError::MissingDate(kind))?;
            sequence.push((kind, date));
        }

        for pair in sequence.windows(2) {
            if let [(earlier, earlier_date), (later, later_date)] = *pair
                && earlier_date > later_date
            {
                return Err(ValidationError::InvalidDateSequence {
                    earlier,
                    earlier_date,
                    later,
                    later_date,
                });
            }
        }

        Ok(())
    }

    pub fn derived_cost(&self) -> Option<f64> {
        self.effort_days
            .zip(self.daily_rate)
            .map(|(effort, rate)| effort * rate)
    }

    pub fn has_supplier(&self, supplier: &str) -> bool {
        self.suppliers.iter().any(|s| s == supplier)
    }
}
