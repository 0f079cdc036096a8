use colored::*;
use jiff::civil::Date;

use crate::{
    models::project::Project,
    services::{
        calendar::Calendar,
        sync::{Notice, NoticeLevel},
        timeline::{self, MARKER_SPACING_PX, ProjectRow, Timeline, TimelineChart},
    },
};

/// Width of the project-name column of the timeline
const NAME_WIDTH: usize = 24;

/// Get the terminal width, defaulting to 80 if unavailable
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

/// Format a date for tables (e.g., "03/06/24")
pub fn format_date(date: Date) -> String {
    date.strftime("%d/%m/%y").to_string()
}

/// A missing date is shown as a dash
pub fn format_optional_date(date: Option<Date>) -> String {
    date.map(format_date).unwrap_or_else(|| "-".to_string())
}

pub fn format_cost(cost: f64) -> String {
    format!("€ {:.2}", cost)
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        format!("{:<width$}", text)
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

/// Render a view header with title and count
pub fn render_view_header(title: &str, count: usize) {
    let project_word = if count == 1 { "project" } else { "projects" };
    println!("\n  {} ({} {})\n", title.cyan().bold(), count, project_word);
}

/// Render a section header (e.g., "March 2024")
pub fn render_section_header(title: &str) {
    println!("\n  ─── {} ───\n", title.bold());
}

pub fn render_notice(notice: &Notice) {
    let message = match notice.level {
        NoticeLevel::Info => notice.message.cyan(),
        NoticeLevel::Success => notice.message.green(),
        NoticeLevel::Warning => notice.message.yellow(),
        NoticeLevel::Error => notice.message.red(),
    };
    eprintln!("{}", message);
}

/// Optional facts shown under a project name, only when present
fn project_extras(project: &Project) -> Vec<String> {
    let mut extras = vec![];
    if let Some(deadline) = project.estimate_deadline {
        extras.push(format!("Estimate due {}", format_date(deadline)));
    }
    if let Some(configured) = project.system_configuration {
        extras.push(format!("Config {}", format_date(configured)));
    }
    if let Some(effort) = project.effort_days {
        extras.push(format!("{} days", effort));
    }
    if let Some(cost) = project.estimated_cost {
        extras.push(format_cost(cost));
    }
    extras
}

/// Render the project table, one block per project
pub fn render_project_table<'a>(projects: impl IntoIterator<Item = &'a Project>) {
    let projects: Vec<_> = projects.into_iter().collect();

    if projects.is_empty() {
        println!("No projects");
        return;
    }

    render_view_header("Projects", projects.len());

    for project in projects {
        println!(
            "  {}  {}",
            project.name.bold(),
            format!("#{}", project.id).dimmed()
        );

        let mut meta = vec![];
        if !project.suppliers.is_empty() {
            meta.push(project.suppliers.join(", ").blue().to_string());
        }
        if !project.ticket_url.is_empty() {
            meta.push(project.ticket_url.dimmed().to_string());
        }
        if !meta.is_empty() {
            println!("    {}", meta.join(&format!(" {} ", "•".dimmed())));
        }

        println!(
            "    Est {}  IA {}  Dev {} → {}  {}  {}",
            format_optional_date(project.estimate).dimmed(),
            format_optional_date(project.internal_assessment).dimmed(),
            format_optional_date(project.dev_start),
            format_optional_date(project.dev_end),
            format!("Test {}", format_optional_date(project.test_release)).yellow(),
            format!("Prod {}", format_optional_date(project.prod_release)).green().bold(),
        );

        let extras = project_extras(project);
        if !extras.is_empty() {
            println!("    {}", extras.join("  ").dimmed());
        }

        println!("    {}", "─".repeat(30).dimmed());
    }
}

pub fn render_suppliers(suppliers: &[String]) {
    if suppliers.is_empty() {
        println!("No suppliers");
        return;
    }
    for supplier in suppliers {
        println!("  {}", supplier);
    }
}

/// Column of a percentage position on a chart `columns` wide
fn column(pct: f64, columns: usize) -> usize {
    let last = columns.saturating_sub(1) as f64;
    (pct / 100.0 * last).round().clamp(0.0, last) as usize
}

/// Month labels laid out over `columns` characters
pub fn draw_month_header(chart: &TimelineChart, columns: usize) -> String {
    let mut header = String::new();
    let mut used = 0;

    for band in &chart.months {
        let width = ((band.width_pct / 100.0) * columns as f64).round() as usize;
        let width = width.min(columns.saturating_sub(used));
        if width == 0 {
            continue;
        }
        let label = truncate(&band.label, width.saturating_sub(1));
        header.push('|');
        header.push_str(&label);
        used += width;
    }

    header
}

/// One project row: `=` for the development bar, a glyph per milestone.
///
/// Each marker-spacing step of pixel offset moves a glyph by one column.
pub fn draw_row(row: &ProjectRow, columns: usize) -> String {
    let mut cells = vec![' '; columns];
    if columns == 0 {
        return String::new();
    }

    if let Some(bar) = &row.bar {
        let bar_start = column(bar.left_pct, columns);
        let bar_end = column(bar.left_pct + bar.width_pct, columns).max(bar_start);
        for cell in &mut cells[bar_start..=bar_end] {
            *cell = '=';
        }
    }

    for marker in &row.markers {
        let shift = (marker.offset_px / MARKER_SPACING_PX).round() as isize;
        let at = column(marker.position_pct, columns) as isize + shift;
        let at = at.clamp(0, columns as isize - 1) as usize;
        cells[at] = marker.kind.glyph();
    }

    cells.into_iter().collect()
}

pub fn render_timeline(timeline: &Timeline) {
    let chart = match timeline {
        Timeline::Empty => {
            println!("{}", timeline::EMPTY_MESSAGE.dimmed());
            return;
        }
        Timeline::Chart(chart) => chart,
    };

    let columns = get_terminal_width()
        .saturating_sub(NAME_WIDTH + 4)
        .max(20);

    render_view_header("Timeline", chart.rows.len());
    println!(
        "  {} {}",
        truncate("Project", NAME_WIDTH).bold(),
        draw_month_header(chart, columns).dimmed()
    );

    for row in &chart.rows {
        println!(
            "  {} {}",
            truncate(&row.name, NAME_WIDTH),
            draw_row(row, columns).cyan()
        );
        if !row.suppliers.is_empty() {
            println!("    {}", row.suppliers.join(", ").dimmed());
        }
    }

    let legend: Vec<String> = std::iter::once("= Development".to_string())
        .chain(
            chart
                .legend
                .iter()
                .map(|kind| format!("{} {}", kind.glyph(), kind.label())),
        )
        .collect();
    println!("\n  {}", legend.join("   ").dimmed());
}

pub fn render_calendar(calendar: &Calendar) {
    if calendar.is_empty() {
        println!("No events to display");
        return;
    }

    for group in calendar {
        render_section_header(&group.label);
        for event in &group.events {
            let suppliers = if event.suppliers.is_empty() {
                String::new()
            } else {
                format!("[{}]", event.suppliers.join(", "))
            };
            println!(
                "  {}  {:<26} {}  {}",
                event.date.strftime("%d/%m").to_string().dimmed(),
                event.label(),
                event.project_name.bold(),
                suppliers.dimmed()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{milestone::MilestoneKind, project::tests::sample_project};
    use crate::services::timeline::{Bar, Marker, layout};
    use jiff::civil::date;
    use pretty_assertions::assert_eq;

    fn row(markers: Vec<Marker>) -> ProjectRow {
        ProjectRow {
            project_id: "1".to_string(),
            name: "Billing".to_string(),
            suppliers: vec![],
            bar: Some(Bar {
                start: date(2024, 1, 1),
                end: date(2024, 1, 1),
                left_pct: 0.0,
                width_pct: 50.0,
            }),
            markers,
        }
    }

    fn marker(kind: MilestoneKind, position_pct: f64, offset_px: f64) -> Marker {
        Marker {
            kind,
            date: date(2024, 1, 1),
            position_pct,
            offset_px,
            label: "01/01".to_string(),
        }
    }

    #[test]
    fn test_draw_row_places_bar_and_markers() {
        let drawn = draw_row(
            &row(vec![marker(MilestoneKind::ProdRelease, 100.0, 0.0)]),
            11,
        );
        assert_eq!(drawn, "======    P");
    }

    #[test]
    fn test_draw_row_fans_out_co_dated_markers() {
        let drawn = draw_row(
            &row(vec![
                marker(MilestoneKind::TestRelease, 80.0, -10.0),
                marker(MilestoneKind::ProdRelease, 80.0, 10.0),
            ]),
            11,
        );
        // -0.5 and +0.5 steps round away from zero
        assert_eq!(drawn.chars().nth(7), Some('T'));
        assert_eq!(drawn.chars().nth(9), Some('P'));
    }

    #[test]
    fn test_draw_row_without_bar() {
        let mut bare = row(vec![marker(MilestoneKind::DevStart, 50.0, 0.0)]);
        bare.bar = None;

        assert_eq!(draw_row(&bare, 11), "     >     ");
    }

    #[test]
    fn test_month_header_fits_columns() {
        let Timeline::Chart(chart) = layout(&[sample_project("1", "Billing")]) else {
            panic!("Expected a chart");
        };

        let header = draw_month_header(&chart, 60);

        assert!(header.chars().count() <= 60);
        assert!(header.starts_with("|Feb"));
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_date(date(2024, 6, 3)), "03/06/24");
        assert_eq!(format_optional_date(None), "-");
        assert_eq!(format_cost(9000.0), "€ 9000.00");
        assert_eq!(truncate("Billing", 4), "Bil…");
        assert_eq!(truncate("Bill", 6), "Bill  ");
    }
}
