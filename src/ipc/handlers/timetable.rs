use chrono::{Datelike, NaiveDate};

use crate::clock::format_display;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    class_exists, get_required_i64, get_required_str, get_required_time, get_required_weekday,
    HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

#[derive(Debug, Clone)]
struct SlotRow {
    weekday: i64,
    period_no: i64,
    subject: String,
    start_time: String,
    end_time: String,
}

impl SlotRow {
    fn to_json(&self) -> serde_json::Value {
        json!({
            "weekday": self.weekday,
            "periodNo": self.period_no,
            "subject": self.subject,
            "startTime": self.start_time,
            "endTime": self.end_time,
            "startDisplay": format_display(Some(&self.start_time)),
            "endDisplay": format_display(Some(&self.end_time)),
        })
    }
}

/// Resolve an optional YYYY-MM-DD date param to its 1..7 weekday column
/// (Monday=1), so the front-end can highlight "today" in the grid.
fn resolve_date_weekday(params: &serde_json::Value) -> Result<Option<i64>, HandlerErr> {
    let Some(raw) = params.get("date").and_then(|v| v.as_str()) else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        HandlerErr::bad_params("date must be YYYY-MM-DD")
    })?;
    Ok(Some(date.weekday().number_from_monday() as i64))
}

fn timetable_open(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    if !class_exists(conn, &class_id)? {
        return Err(HandlerErr::not_found("class not found"));
    }
    let marked_weekday = resolve_date_weekday(params)?;

    let mut stmt = conn
        .prepare(
            "SELECT weekday, period_no, subject, start_time, end_time
             FROM timetable_slots
             WHERE class_id = ?
             ORDER BY weekday, period_no",
        )
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;
    let slots = stmt
        .query_map([&class_id], |r| {
            Ok(SlotRow {
                weekday: r.get(0)?,
                period_no: r.get(1)?,
                subject: r.get(2)?,
                start_time: r.get(3)?,
                end_time: r.get(4)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;

    let slots_json: Vec<serde_json::Value> = slots.iter().map(SlotRow::to_json).collect();
    Ok(json!({
        "classId": class_id,
        "markedWeekday": marked_weekday,
        "slots": slots_json,
    }))
}

fn timetable_slot_set(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    if !class_exists(conn, &class_id)? {
        return Err(HandlerErr::not_found("class not found"));
    }
    let weekday = get_required_weekday(params, "weekday")?;
    let period_no = get_required_i64(params, "periodNo")?;
    if period_no < 1 {
        return Err(HandlerErr::bad_params("periodNo must be >= 1"));
    }
    let subject = get_required_str(params, "subject")?;
    let start = get_required_time(params, "startTime")?;
    let end = get_required_time(params, "endTime")?;

    conn.execute(
        "INSERT INTO timetable_slots(class_id, weekday, period_no, subject, start_time, end_time)
         VALUES(?, ?, ?, ?, ?, ?)
         ON CONFLICT(class_id, weekday, period_no) DO UPDATE SET
           subject = excluded.subject,
           start_time = excluded.start_time,
           end_time = excluded.end_time",
        (
            &class_id,
            weekday,
            period_no,
            &subject,
            start.to_string(),
            end.to_string(),
        ),
    )
    .map_err(|e| HandlerErr {
        code: "db_update_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "timetable_slots" })),
    })?;

    Ok(json!({
        "classId": class_id,
        "weekday": weekday,
        "periodNo": period_no,
        "startTime": start.to_string(),
        "endTime": end.to_string(),
        "startDisplay": format_display(Some(&start.to_string())),
        "endDisplay": format_display(Some(&end.to_string())),
    }))
}

fn timetable_slot_clear(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let weekday = get_required_weekday(params, "weekday")?;
    let period_no = get_required_i64(params, "periodNo")?;
    let affected = conn
        .execute(
            "DELETE FROM timetable_slots WHERE class_id = ? AND weekday = ? AND period_no = ?",
            (&class_id, weekday, period_no),
        )
        .map_err(|e| HandlerErr::db("db_update_failed", e))?;
    if affected == 0 {
        return Err(HandlerErr::not_found("timetable slot not found"));
    }
    Ok(json!({ "ok": true }))
}

fn handle(
    state: &mut AppState,
    req: &Request,
    f: fn(&Connection, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>,
) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match f(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "timetable.open" => Some(handle(state, req, timetable_open)),
        "timetable.slotSet" => Some(handle(state, req, timetable_slot_set)),
        "timetable.slotClear" => Some(handle(state, req, timetable_slot_clear)),
        _ => None,
    }
}
