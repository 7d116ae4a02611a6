//! Plain-text table rendering for the CLI.

use chrono::{DateTime, Local};
use rollcall_core::{AttendanceRecord, Identity};
use serde::Deserialize;

/// Daemon status as returned by `Attendance1.Status()`.
#[derive(Debug, Deserialize)]
pub struct Status {
    pub version: String,
    pub state: String,
    pub ready: bool,
    pub camera: String,
    pub identities: usize,
    pub present: usize,
}

pub fn status(status: &Status) -> String {
    let state = if status.ready {
        "ready".to_string()
    } else {
        format!("{} (face recognition models not ready)", status.state)
    };
    format!(
        "rollcalld {}\n  state:      {}\n  camera:     {}\n  identities: {}\n  present:    {}\n",
        status.version, state, status.camera, status.identities, status.present
    )
}

pub fn roster(records: &[AttendanceRecord]) -> String {
    if records.is_empty() {
        return "No attendance recorded yet\n".to_string();
    }
    let rows: Vec<Vec<String>> = records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let local: DateTime<Local> = r.timestamp.with_timezone(&Local);
            vec![
                (i + 1).to_string(),
                r.identity.clone(),
                local.format("%Y-%m-%d %H:%M:%S").to_string(),
            ]
        })
        .collect();
    table(&["#", "Name", "Marked at"], &rows)
}

pub fn users(identities: &[Identity]) -> String {
    if identities.is_empty() {
        return "No identities configured\n".to_string();
    }
    let rows: Vec<Vec<String>> = identities
        .iter()
        .map(|u| {
            vec![
                u.name.clone(),
                u.id.clone(),
                u.department.clone(),
                u.email.clone(),
                u.phone.clone(),
                u.address.clone(),
            ]
        })
        .collect();
    table(&["Name", "ID", "Department", "Email", "Phone", "Address"], &rows)
}

fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = render_line(headers.iter().copied(), &widths);
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    out.push_str(&render_line(rule.iter().map(String::as_str), &widths));
    for row in rows {
        out.push_str(&render_line(row.iter().map(String::as_str), &widths));
    }
    out
}

fn render_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(cell, &w)| format!("{cell:<w$}"))
        .collect();
    format!("{}\n", padded.join("  ").trim_end())
}
