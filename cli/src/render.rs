//! Stdout rendering for listings.

use std::io;
use std::io::Write;

use coursefetch_client::Course;
use coursefetch_client::PortalOptions;
use coursefetch_client::courses;
use owo_colors::OwoColorize;
use owo_colors::Style;

use crate::args::CourseFormat;

const COURSE_HEADERS: [&str; 8] = [
    "Code",
    "Sec",
    "Course Name",
    "Seats(T/C)",
    "Left",
    "Days",
    "Time",
    "Room",
];

/// Column index of "Left", colour-coded in the table.
const SEATS_LEFT_COLUMN: usize = 4;

pub fn write_courses<W: Write>(
    out: &mut W,
    selected: &[&Course],
    total: usize,
    format: CourseFormat,
    ansi: bool,
) -> anyhow::Result<()> {
    match format {
        CourseFormat::Json => {
            courses::write_json(selected, &mut *out)?;
            writeln!(out)?;
        }
        CourseFormat::Csv => courses::write_csv(selected, &mut *out)?,
        CourseFormat::Table => write_course_table(out, selected, total, ansi)?,
    }
    Ok(())
}

fn seats_style(seats_left: i64, ansi: bool) -> Style {
    match (ansi, seats_left) {
        (false, _) => Style::new(),
        (true, 0) => Style::new().red().bold(),
        (true, 1..=4) => Style::new().yellow().bold(),
        (true, _) => Style::new().green().bold(),
    }
}

fn write_course_table<W: Write>(
    out: &mut W,
    selected: &[&Course],
    total: usize,
    ansi: bool,
) -> io::Result<()> {
    if selected.is_empty() {
        writeln!(out, "No courses found matching your filters.")?;
        return writeln!(out, "Showing 0 of {total} courses");
    }

    let rows: Vec<[String; 8]> = selected
        .iter()
        .map(|course| {
            let schedule = course.schedule();
            [
                course.clean_code().to_string(),
                course.section.clone(),
                course.short_name.clone(),
                format!("{}/{}", course.seat_taken, course.seat_capacity),
                course.seats_left.to_string(),
                schedule.days,
                schedule.time,
                course.room().to_string(),
            ]
        })
        .collect();

    let mut widths = COURSE_HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header_style = if ansi { Style::new().bold() } else { Style::new() };
    let header: Vec<String> = COURSE_HEADERS
        .iter()
        .zip(widths)
        .map(|(h, w)| format!("{h:<w$}"))
        .collect();
    writeln!(out, "{}", header.join("  ").trim_end().style(header_style))?;

    for (row, course) in rows.iter().zip(selected) {
        let cells: Vec<String> = row
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(i, (cell, w))| {
                let padded = format!("{cell:<w$}");
                if i == SEATS_LEFT_COLUMN {
                    format!("{}", padded.style(seats_style(course.seats_left, ansi)))
                } else {
                    padded
                }
            })
            .collect();
        writeln!(out, "{}", cells.join("  ").trim_end())?;
    }

    writeln!(out)?;
    writeln!(out, "Showing {} of {total} courses", selected.len())
}

pub fn write_options_table<W: Write>(out: &mut W, options: &PortalOptions) -> io::Result<()> {
    writeln!(out, "Departments:")?;
    if options.departments.is_empty() {
        writeln!(out, "  (none available)")?;
    }
    for dept in &options.departments {
        writeln!(out, "  {:>6}  {}", dept.id, dept.display_name())?;
    }
    writeln!(out)?;
    writeln!(out, "Semesters:")?;
    if options.semesters.is_empty() {
        writeln!(out, "  (none available)")?;
    }
    for semester in &options.semesters {
        writeln!(out, "  {:>6}  {}", semester.id, semester.name)?;
    }
    Ok(())
}

pub fn write_options_json<W: Write>(out: &mut W, options: &PortalOptions) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, options)?;
    writeln!(out)?;
    Ok(())
}
