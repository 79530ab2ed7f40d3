//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `chore_core` linkage.
//! - Print a text month grid for a quick look at stored chores.
//!
//! Usage: `chore_cli [YYYY-MM-DD]`. When `CHORE_DB_PATH` is set, each day
//! shows how many chores occur on it.

use chore_core::db::open_db;
use chore_core::{month_agenda, month_year_label, AppStore, Chore, SqliteSnapshotRepository};
use chrono::{Datelike, Local, NaiveDate};
use std::process::ExitCode;

const DB_PATH_ENV: &str = "CHORE_DB_PATH";

fn main() -> ExitCode {
    println!("chore_core ping={}", chore_core::ping());
    println!("chore_core version={}", chore_core::core_version());

    let anchor = match std::env::args().nth(1) {
        Some(raw) => match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
            Ok(date) => date,
            Err(err) => {
                eprintln!("invalid date `{raw}`, expected YYYY-MM-DD: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => Local::now().date_naive(),
    };

    let chores = match load_chores() {
        Ok(chores) => chores,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    print!("{}", render_month(&chores, anchor));
    ExitCode::SUCCESS
}

fn load_chores() -> Result<Vec<Chore>, String> {
    let Some(path) = std::env::var_os(DB_PATH_ENV) else {
        return Ok(Vec::new());
    };
    let conn = open_db(&path).map_err(|err| format!("DB open failed: {err}"))?;
    let repo = SqliteSnapshotRepository::try_new(&conn).map_err(|err| err.to_string())?;
    let store = AppStore::open(repo).map_err(|err| err.to_string())?;
    Ok(store.chores().to_vec())
}

/// Sunday-first grid; padding days are bracketed, counts follow `+`.
fn render_month(chores: &[Chore], anchor: NaiveDate) -> String {
    let mut out = format!("\n{}\n", month_year_label(anchor));
    out.push_str(" Sun   Mon   Tue   Wed   Thu   Fri   Sat\n");
    for week in month_agenda(chores, anchor).chunks(7) {
        for cell in week {
            let day = if cell.in_month {
                format!(" {:>2}", cell.day.day())
            } else {
                format!("[{:>2}]", cell.day.day())
            };
            let count = match cell.chores.len() {
                0 => "  ".to_string(),
                n if n > 9 => "+9".to_string(),
                n => format!("+{n}"),
            };
            out.push_str(&format!("{day:<4}{count}"));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::render_month;
    use chore_core::{Chore, ChoreDraft};
    use chrono::NaiveDate;

    #[test]
    fn render_month_marks_padding_and_counts() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        let chores = vec![Chore::from_draft(ChoreDraft::one_time("Dentist", date)).unwrap()];

        let grid = render_month(&chores, date);
        assert!(grid.contains("May 2024"));
        assert!(grid.contains("[28]"));
        assert!(grid.contains(" 15 +1"));
        // Header plus five week rows.
        assert_eq!(grid.trim().lines().count(), 7);
    }
}
