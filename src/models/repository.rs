use std::collections::BTreeSet;

use crate::models::project::{Project, ValidationError};

/// Whether an upsert replaced an existing record or appended a new one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Inserted,
    Replaced,
}

/// Search criteria shared by the table and the timeline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFilter {
    /// Case-insensitive substring of the project name; empty matches all
    pub name: String,
    /// Exact supplier name the project must include
    pub supplier: Option<String>,
}

impl ProjectFilter {
    pub fn matches(&self, project: &Project) -> bool {
        let name_matches = self.name.is_empty()
            || project
                .name
                .to_lowercase()
                .contains(&self.name.to_lowercase());

        let supplier_matches = match self.supplier.as_deref() {
            None | Some("") => true,
            Some(supplier) => project.has_supplier(supplier),
        };

        name_matches && supplier_matches
    }
}

/// The in-memory, ordered list of projects
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectRepository {
    projects: Vec<Project>,
}

impl ProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_projects(projects: Vec<Project>) -> Self {
        Self { projects }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// Swaps in a freshly loaded list. Stored records are not re-validated.
    pub fn replace_all(&mut self, projects: Vec<Project>) {
        self.projects = projects;
    }

    /// Replaces the record with the same id in place, or appends it
    pub fn upsert(&mut self, project: Project) -> Result<Upserted, ValidationError> {
        project.validate_dates()?;

        match self.projects.iter_mut().find(|p| p.id == project.id) {
            Some(existing) => {
                *existing = project;
                Ok(Upserted::Replaced)
            }
            None => {
                self.projects.push(project);
                Ok(Upserted::Inserted)
            }
        }
    }

    /// Removing an unknown id is a no-op
    pub fn remove(&mut self, id: &str) -> Option<Project> {
        let position = self.projects.iter().position(|p| p.id == id)?;
        Some(self.projects.remove(position))
    }

    /// Matching projects ordered by prod release; ties keep insertion order
    /// and records without a prod release come last
    pub fn filter(&self, filter: &ProjectFilter) -> impl Iterator<Item = &Project> {
        let mut matching: Vec<&Project> =
            self.projects.iter().filter(|p| filter.matches(p)).collect();
        // sort_by_key is stable
        matching.sort_by_key(|p| (p.prod_release.is_none(), p.prod_release));
        matching.into_iter()
    }

    /// Every supplier name, deduplicated and sorted
    pub fn distinct_suppliers(&self) -> Vec<String> {
        self.projects
            .iter()
            .flat_map(|p| p.suppliers.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// A timestamp-derived id that no current record uses
    pub fn next_id(&self, now: jiff::Timestamp) -> String {
        let mut candidate = now.as_millisecond();
        while self.get(&candidate.to_string()).is_some() {
            candidate += 1;
        }
        candidate.to_string()
    }
}
