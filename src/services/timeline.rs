//! Gantt layout: month bands, development bars and milestone markers, all
//! positioned as percentages of a date range snapped to whole months.
//!
//! Markers that share a date inside one project row get a symmetric pixel
//! offset so they fan out around the date instead of stacking.

use jiff::{ToSpan, civil::Date};

use crate::models::{milestone::MilestoneKind, project::Project};

/// Horizontal distance between co-dated markers
pub const MARKER_SPACING_PX: f64 = 20.0;
/// Bars never get narrower than this, so zero-length phases stay visible
pub const MIN_BAR_WIDTH_PCT: f64 = 0.5;

pub const EMPTY_MESSAGE: &str = "No projects to display for the selected supplier.";

#[derive(Debug, Clone, PartialEq)]
pub enum Timeline {
    /// Nothing to lay out
    Empty,
    Chart(TimelineChart),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineChart {
    pub scale: Scale,
    pub months: Vec<MonthBand>,
    pub rows: Vec<ProjectRow>,
    /// Marker categories worth explaining, in marker order
    pub legend: Vec<MilestoneKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthBand {
    /// First day of the month
    pub month: Date,
    pub label: String,
    pub width_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRow {
    pub project_id: String,
    pub name: String,
    pub suppliers: Vec<String>,
    /// Absent when the record lacks its dev start or dev end
    pub bar: Option<Bar>,
    pub markers: Vec<Marker>,
}

/// The development phase, dev start through dev end inclusive
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub start: Date,
    pub end: Date,
    pub left_pct: f64,
    pub width_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub kind: MilestoneKind,
    pub date: Date,
    pub position_pct: f64,
    /// Rendering-space nudge applied on top of `position_pct`
    pub offset_px: f64,
    /// Short `DD/MM` date label
    pub label: String,
}

/// Maps dates onto [0, 100] over a month-aligned range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scale {
    pub start: Date,
    pub end: Date,
    pub total_days: i64,
}

fn days_between(from: Date, to: Date) -> i64 {
    from.duration_until(to).as_secs() / 86_400
}

/// Last day of the month after the one containing `date`
fn end_of_next_month(date: Date) -> Date {
    date.first_of_month()
        .checked_add(1.month())
        .map(|next| next.last_of_month())
        .unwrap_or_else(|_| date.last_of_month())
}

impl Scale {
    /// Snaps `[min, max]` outwards to whole months.
    ///
    /// The range always covers at least two months, and a `max` falling on a
    /// month's last day pulls in the following month as well.
    pub fn spanning(min: Date, max: Date) -> Self {
        let start = min.first_of_month();
        let mut end = max.last_of_month();

        if end.first_of_month() == start {
            end = end_of_next_month(start);
        }
        if max == max.last_of_month() {
            end = end.max(end_of_next_month(max));
        }

        Self {
            start,
            end,
            total_days: days_between(start, end).max(1),
        }
    }

    pub fn position(&self, date: Date) -> f64 {
        let days = days_between(self.start, date) as f64;
        (100.0 * days / self.total_days as f64).clamp(0.0, 100.0)
    }

    /// One band per calendar month from `start` through `end`
    pub fn months(&self) -> Vec<MonthBand> {
        let mut bands = Vec::new();
        let mut month = self.start;

        while month <= self.end {
            bands.push(MonthBand {
                month,
                label: month.strftime("%b %Y").to_string(),
                width_pct: 100.0 * f64::from(month.days_in_month()) / self.total_days as f64,
            });
            match month.checked_add(1.month()) {
                Ok(next) => month = next,
                Err(_) => break,
            }
        }

        bands
    }
}

/// Markers of one project with co-dated markers fanned out symmetrically
fn markers(project: &Project, scale: &Scale) -> Vec<Marker> {
    let dated: Vec<(MilestoneKind, Date)> =
        project.dates_among(&MilestoneKind::TIMELINE).collect();

    dated
        .iter()
        .enumerate()
        .map(|(i, &(kind, date))| {
            let group_size = dated.iter().filter(|(_, d)| *d == date).count();
            let index = dated[..i].iter().filter(|(_, d)| *d == date).count();
            let offset = index as f64 - (group_size - 1) as f64 / 2.0;

            Marker {
                kind,
                date,
                position_pct: scale.position(date),
                offset_px: offset * MARKER_SPACING_PX,
                label: date.strftime("%d/%m").to_string(),
            }
        })
        .collect()
}

fn bar(project: &Project, scale: &Scale) -> Option<Bar> {
    let (start, end) = project.dev_start.zip(project.dev_end)?;
    let left_pct = scale.position(start);
    // The bar runs to the end of the dev end day
    let after_end = end.tomorrow().unwrap_or(end);
    let width_pct = (scale.position(after_end) - left_pct).max(MIN_BAR_WIDTH_PCT);

    Some(Bar {
        start,
        end,
        left_pct,
        width_pct,
    })
}

/// Lays out `projects` in the order given
pub fn layout<'a>(projects: impl IntoIterator<Item = &'a Project>) -> Timeline {
    let projects: Vec<&Project> = projects.into_iter().collect();

    let mut dates = projects
        .iter()
        .flat_map(|p| p.dates_among(&MilestoneKind::TIMELINE).map(|(_, date)| date));
    let Some(first) = dates.next() else {
        return Timeline::Empty;
    };
    let (min, max) = dates.fold((first, first), |(min, max), date| {
        (min.min(date), max.max(date))
    });

    let scale = Scale::spanning(min, max);

    let rows = projects
        .iter()
        .map(|project| ProjectRow {
            project_id: project.id.clone(),
            name: project.name.clone(),
            suppliers: project.suppliers.clone(),
            bar: bar(project, &scale),
            markers: markers(project, &scale),
        })
        .collect();

    let legend = MilestoneKind::TIMELINE
        .into_iter()
        .filter(|kind| !kind.is_optional() || projects.iter().any(|p| p.date_of(*kind).is_some()))
        .collect();

    Timeline::Chart(TimelineChart {
        scale,
        months: scale.months(),
        rows,
        legend,
    })
}
