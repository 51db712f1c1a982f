use rusqlite::Connection;
use std::path::Path;

use crate::clock::{CanonicalTime, DisplayTime, Hour12, Meridiem, Minute};

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("campus.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS classes(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS shifts(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    // Existing workspaces may predate the updated_at column.
    ensure_shifts_updated_at(&conn)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS routine_periods(
            id TEXT PRIMARY KEY,
            class_id TEXT NOT NULL,
            weekday INTEGER NOT NULL,
            subject TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            FOREIGN KEY(class_id) REFERENCES classes(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_routine_periods_class ON routine_periods(class_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_routine_periods_class_day
         ON routine_periods(class_id, weekday, sort_order)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS timetable_slots(
            class_id TEXT NOT NULL,
            weekday INTEGER NOT NULL,
            period_no INTEGER NOT NULL,
            subject TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            PRIMARY KEY(class_id, weekday, period_no),
            FOREIGN KEY(class_id) REFERENCES classes(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_timetable_slots_class ON timetable_slots(class_id)",
        [],
    )?;

    // Older workspaces stored 12-hour display strings ("hh:mm AM") in the
    // time columns. Rewrite those to the canonical 24-hour form so every
    // stored time is byte-comparable and sorts correctly as text.
    migrate_display_times(&conn)?;

    Ok(conn)
}

fn ensure_shifts_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "shifts", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE shifts ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

/// Parse the pre-migration stored form: `"hh:mm AM"` / `"hh:mm PM"`, hour
/// 1..12. Returns None for anything else, including values that are already
/// canonical.
fn parse_legacy_display_time(raw: &str) -> Option<CanonicalTime> {
    let (clock_part, meridiem_part) = raw.trim().split_once(' ')?;
    let meridiem = Meridiem::parse(meridiem_part)?;
    let (h, m) = clock_part.split_once(':')?;
    let hour12 = Hour12::new(h.parse::<u8>().ok()?)?;
    let minute = Minute::new(m.parse::<u8>().ok()?)?;
    Some(
        DisplayTime {
            hour12,
            minute,
            meridiem,
        }
        .to_canonical(),
    )
}

fn migrate_display_times(conn: &Connection) -> anyhow::Result<()> {
    for (table, key_col) in [
        ("shifts", "id"),
        ("routine_periods", "id"),
        ("timetable_slots", "rowid"),
    ] {
        for col in ["start_time", "end_time"] {
            let sql = format!(
                "SELECT {key}, {col} FROM {table} WHERE {col} LIKE '% AM' OR {col} LIKE '% PM'",
                key = key_col,
                col = col,
                table = table
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], |r| {
                    Ok((
                        r.get::<_, rusqlite::types::Value>(0)?,
                        r.get::<_, String>(1)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            for (key, raw) in rows {
                let Some(canonical) = parse_legacy_display_time(&raw) else {
                    continue;
                };
                let update = format!(
                    "UPDATE {table} SET {col} = ? WHERE {key} = ?",
                    table = table,
                    col = col,
                    key = key_col
                );
                conn.execute(&update, (canonical.to_string(), key))?;
            }
        }
    }
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_display_strings_convert_to_canonical() {
        assert_eq!(
            parse_legacy_display_time("02:30 PM").map(|t| t.to_string()),
            Some("14:30".to_string())
        );
        assert_eq!(
            parse_legacy_display_time("12:00 AM").map(|t| t.to_string()),
            Some("00:00".to_string())
        );
        assert_eq!(
            parse_legacy_display_time("12:05 pm").map(|t| t.to_string()),
            Some("12:05".to_string())
        );
        assert_eq!(parse_legacy_display_time("14:30"), None);
        assert_eq!(parse_legacy_display_time("13:00 PM"), None);
    }

    #[test]
    fn migration_rewrites_only_display_style_values() {
        let workspace = std::env::temp_dir().join(format!(
            "campusd-db-migration-{}",
            std::process::id()
        ));
        let conn = open_db(&workspace).expect("open workspace db");
        conn.execute(
            "INSERT INTO shifts(id, name, start_time, end_time) VALUES(?, ?, ?, ?)",
            ("s1", "Morning", "08:15 AM", "02:30 PM"),
        )
        .expect("insert shift");
        conn.execute(
            "INSERT INTO shifts(id, name, start_time, end_time) VALUES(?, ?, ?, ?)",
            ("s2", "Evening", "16:00", "22:00"),
        )
        .expect("insert shift");
        migrate_display_times(&conn).expect("migrate");

        let (start, end): (String, String) = conn
            .query_row(
                "SELECT start_time, end_time FROM shifts WHERE id = 's1'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .expect("read s1");
        assert_eq!(start, "08:15");
        assert_eq!(end, "14:30");

        let (start, end): (String, String) = conn
            .query_row(
                "SELECT start_time, end_time FROM shifts WHERE id = 's2'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .expect("read s2");
        assert_eq!(start, "16:00");
        assert_eq!(end, "22:00");

        drop(conn);
        let _ = std::fs::remove_dir_all(workspace);
    }
}
