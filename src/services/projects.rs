use jiff::civil::Date;
use thiserror::Error;

use crate::models::{
    project::{Project, ValidationError},
    repository::{ProjectRepository, Upserted},
};

#[derive(Debug, Error)]
pub enum SaveProjectError {
    #[error("Project name must not be empty")]
    EmptyName,

    #[error("{0}")]
    Validation(#[from] ValidationError),
}

/// What the editor collects for a project
pub struct SaveProjectParameters {
    /// Set when editing an existing project
    pub id: Option<String>,
    pub name: String,
    /// Comma-separated supplier names
    pub suppliers: String,
    pub estimate: Date,
    pub internal_assessment: Date,
    pub dev_start: Date,
    pub dev_end: Date,
    pub test_release: Date,
    pub prod_release: Date,
    pub uat: Option<Date>,
    pub business_simulation: Option<Date>,
    pub estimate_deadline: Option<Date>,
    pub system_configuration: Option<Date>,
    pub effort_days: Option<f64>,
    pub daily_rate: Option<f64>,
    pub ticket_url: String,
}

pub struct SaveProjectResult {
    pub project: Project,
    pub outcome: Upserted,
}

/// Splits `"Acme, Globex ,"` into `["Acme", "Globex"]`
pub fn parse_suppliers(text: &str) -> Vec<String> {
    let mut suppliers: Vec<String> = Vec::new();
    for supplier in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !suppliers.iter().any(|s| s == supplier) {
            suppliers.push(supplier.to_string());
        }
    }
    suppliers
}

/// Builds the record from the editor fields and upserts it.
///
/// Nothing in the repository changes when the dates are out of sequence.
pub fn save_project(
    repository: &mut ProjectRepository,
    parameters: SaveProjectParameters,
) -> Result<SaveProjectResult, SaveProjectError> {
    let name = parameters.name.trim().to_string();
    if name.is_empty() {
        return Err(SaveProjectError::EmptyName);
    }

    let id = match parameters.id {
        Some(id) if !id.trim().is_empty() => id,
        _ => repository.next_id(jiff::Timestamp::now()),
    };

    // Negative numbers are treated as not filled in
    let effort_days = parameters.effort_days.filter(|v| v.is_finite() && *v >= 0.0);
    let daily_rate = parameters.daily_rate.filter(|v| v.is_finite() && *v >= 0.0);

    let mut project = Project {
        id,
        name,
        suppliers: parse_suppliers(&parameters.suppliers),
        estimate: Some(parameters.estimate),
        internal_assessment: Some(parameters.internal_assessment),
        dev_start: Some(parameters.dev_start),
        dev_end: Some(parameters.dev_end),
        test_release: Some(parameters.test_release),
        prod_release: Some(parameters.prod_release),
        uat: parameters.uat,
        business_simulation: parameters.business_simulation,
        ticket_url: parameters.ticket_url.trim().to_string(),
        estimate_deadline: parameters.estimate_deadline,
        system_configuration: parameters.system_configuration,
        effort_days,
        daily_rate,
        estimated_cost: None,
    };
    project.estimated_cost = project.derived_cost();

    let outcome = repository.upsert(project.clone())?;

    Ok(SaveProjectResult { project, outcome })
}

/// Removes the project; deleting an unknown id does nothing
pub fn delete_project(repository: &mut ProjectRepository, id: &str) -> Option<Project> {
    repository.remove(id)
}
