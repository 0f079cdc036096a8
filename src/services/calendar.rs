use std::collections::BTreeMap;

use jiff::civil::Date;

use crate::models::{milestone::MilestoneEvent, project::Project};

/// All events of one calendar month, in date order
#[derive(Debug, Clone, PartialEq)]
pub struct MonthGroup {
    /// `YYYY-MM`
    pub key: String,
    /// e.g. `March 2024`
    pub label: String,
    pub events: Vec<MilestoneEvent>,
}

/// Every dated event of a set of projects, grouped by month
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Calendar {
    groups: Vec<MonthGroup>,
}

impl Calendar {
    pub fn from_projects<'a>(projects: impl IntoIterator<Item = &'a Project>) -> Self {
        let mut by_month: BTreeMap<(i16, i8), Vec<MilestoneEvent>> = BTreeMap::new();

        for event in projects.into_iter().flat_map(Project::events) {
            by_month
                .entry((event.date.year(), event.date.month()))
                .or_default()
                .push(event);
        }

        let groups = by_month
            .into_values()
            .map(|mut events| {
                // Stable, so same-day events keep flattening order
                events.sort_by_key(|e| e.date);
                let first: Date = events[0].date;
                MonthGroup {
                    key: first.strftime("%Y-%m").to_string(),
                    label: first.strftime("%B %Y").to_string(),
                    events,
                }
            })
            .collect();

        Self { groups }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MonthGroup> {
        self.groups.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }
}

impl<'a> IntoIterator for &'a Calendar {
    type Item = &'a MonthGroup;
    type IntoIter = std::slice::Iter<'a, MonthGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{milestone::MilestoneKind, project::tests::sample_project};
    use jiff::civil::date;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_calendar() {
        let calendar = Calendar::from_projects(&[]);
        assert!(calendar.is_empty());
        assert_eq!(calendar.iter().count(), 0);
    }

    #[test]
    fn test_groups_are_chronological() {
        let calendar = Calendar::from_projects(&[sample_project("1", "Billing")]);

        let keys: Vec<_> = calendar.iter().map(|g| g.key.as_str()).collect();
        // estimate jan, IA + dev start feb, dev end apr, test may, prod jun
        assert_eq!(keys, vec!["2024-01", "2024-02", "2024-04", "2024-05", "2024-06"]);
        assert_eq!(calendar.iter().next().unwrap().label, "January 2024");
    }

    #[test]
    fn test_events_sorted_within_month_and_ties_stable() {
        let mut billing = sample_project("1", "Billing");
        billing.business_simulation = Some(date(2024, 2, 1));
        let mut payroll = sample_project("2", "Payroll");
        payroll.internal_assessment = Some(date(2024, 2, 20));
        payroll.dev_start = Some(date(2024, 2, 25));
        payroll.system_configuration = Some(date(2024, 2, 3));

        let calendar = Calendar::from_projects(&[billing, payroll]);
        let february = calendar.iter().find(|g| g.key == "2024-02").unwrap();

        let events: Vec<_> = february
            .events
            .iter()
            .map(|e| (e.date, e.project_id.as_str(), e.kind))
            .collect();
        assert_eq!(
            events,
            vec![
                (date(2024, 2, 1), "1", MilestoneKind::InternalAssessment),
                (date(2024, 2, 1), "1", MilestoneKind::BusinessSimulation),
                (date(2024, 2, 3), "2", MilestoneKind::SystemConfiguration),
                (date(2024, 2, 15), "1", MilestoneKind::DevStart),
                (date(2024, 2, 20), "2", MilestoneKind::InternalAssessment),
                (date(2024, 2, 25), "2", MilestoneKind::DevStart),
            ]
        );
    }

    #[test]
    fn test_iteration_is_restartable() {
        let calendar = Calendar::from_projects(&[sample_project("1", "Billing")]);

        let first: Vec<_> = calendar.iter().cloned().collect();
        let second: Vec<_> = (&calendar).into_iter().cloned().collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_every_defined_date_becomes_an_event() {
        let mut project = sample_project("1", "Billing");
        project.uat = Some(date(2024, 5, 25));
        project.estimate_deadline = Some(date(2024, 1, 5));

        let calendar = Calendar::from_projects(&[project]);
        let total: usize = calendar.iter().map(|g| g.events.len()).sum();

        assert_eq!(total, 8);
    }

    #[test]
    fn test_missing_dates_are_skipped() {
        let mut damaged = sample_project("1", "Damaged");
        damaged.estimate = None;
        damaged.prod_release = None;

        let calendar = Calendar::from_projects(&[damaged]);
        let keys: Vec<_> = calendar.iter().map(|g| g.key.as_str()).collect();
        let total: usize = calendar.iter().map(|g| g.events.len()).sum();

        assert_eq!(keys, vec!["2024-02", "2024-04", "2024-05"]);
        assert_eq!(total, 4);
    }
}
