use crate::clock::{format_display, CanonicalTime, Hour12, Meridiem, Minute};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    get_optional_str, get_optional_time, get_required_str, now_ts, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::picker::TimeField;
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct ShiftRow {
    id: String,
    name: String,
    start_time: String,
    end_time: String,
    updated_at: Option<String>,
}

impl ShiftRow {
    fn to_json(&self) -> serde_json::Value {
        json!({
            "id": self.id,
            "name": self.name,
            "startTime": self.start_time,
            "endTime": self.end_time,
            "startDisplay": format_display(Some(&self.start_time)),
            "endDisplay": format_display(Some(&self.end_time)),
            "updatedAt": self.updated_at,
        })
    }
}

fn load_shift(conn: &Connection, shift_id: &str) -> Result<ShiftRow, HandlerErr> {
    conn.query_row(
        "SELECT id, name, start_time, end_time, updated_at FROM shifts WHERE id = ?",
        [shift_id],
        |r| {
            Ok(ShiftRow {
                id: r.get(0)?,
                name: r.get(1)?,
                start_time: r.get(2)?,
                end_time: r.get(3)?,
                updated_at: r.get(4)?,
            })
        },
    )
    .optional()
    .map_err(|e| HandlerErr::db("db_query_failed", e))?
    .ok_or_else(|| HandlerErr::not_found("shift not found"))
}

fn shifts_list(conn: &Connection, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, start_time, end_time, updated_at
             FROM shifts
             ORDER BY start_time, name",
        )
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;
    let rows = stmt
        .query_map([], |r| {
            Ok(ShiftRow {
                id: r.get(0)?,
                name: r.get(1)?,
                start_time: r.get(2)?,
                end_time: r.get(3)?,
                updated_at: r.get(4)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;

    let shifts: Vec<serde_json::Value> = rows.iter().map(ShiftRow::to_json).collect();
    Ok(json!({ "shifts": shifts }))
}

fn shifts_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    // Omitted times start from the picker default, midnight.
    let start = get_optional_time(params, "startTime")?.unwrap_or(CanonicalTime::MIDNIGHT);
    let end = get_optional_time(params, "endTime")?.unwrap_or(CanonicalTime::MIDNIGHT);

    let shift_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO shifts(id, name, start_time, end_time, updated_at)
         VALUES(?, ?, ?, ?, ?)",
        (
            &shift_id,
            &name,
            start.to_string(),
            end.to_string(),
            now_ts(),
        ),
    )
    .map_err(|e| HandlerErr {
        code: "db_update_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "shifts" })),
    })?;

    Ok(json!({
        "shiftId": shift_id,
        "startTime": start.to_string(),
        "endTime": end.to_string(),
    }))
}

fn shifts_update(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let shift_id = get_required_str(params, "shiftId")?;
    let shift = load_shift(conn, &shift_id)?;
    let patch = params
        .get("patch")
        .and_then(|v| v.as_object())
        .ok_or_else(|| HandlerErr::bad_params("missing patch"))?;
    let patch_value = serde_json::Value::Object(patch.clone());

    let name = get_optional_str(&patch_value, "name")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or(shift.name);
    let start = get_optional_time(&patch_value, "startTime")?
        .map(|t| t.to_string())
        .unwrap_or(shift.start_time);
    let end = get_optional_time(&patch_value, "endTime")?
        .map(|t| t.to_string())
        .unwrap_or(shift.end_time);

    conn.execute(
        "UPDATE shifts SET name = ?, start_time = ?, end_time = ?, updated_at = ? WHERE id = ?",
        (&name, &start, &end, now_ts(), &shift_id),
    )
    .map_err(|e| HandlerErr {
        code: "db_update_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "shifts" })),
    })?;

    load_shift(conn, &shift_id).map(|row| row.to_json())
}

fn shifts_delete(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let shift_id = get_required_str(params, "shiftId")?;
    let affected = conn
        .execute("DELETE FROM shifts WHERE id = ?", [&shift_id])
        .map_err(|e| HandlerErr::db("db_update_failed", e))?;
    if affected == 0 {
        return Err(HandlerErr::not_found("shift not found"));
    }
    Ok(json!({ "ok": true }))
}

/// One picker interaction over a stored time: derive the 12-hour triple from
/// the current value, apply the single selected part, persist the emitted
/// canonical value. `field` picks which of the shift's two times is edited.
pub fn apply_time_part(
    stored: &str,
    part: &str,
    value: &str,
) -> Result<CanonicalTime, HandlerErr> {
    let mut field = TimeField::new(Some(stored));
    let emitted = match part {
        "hour" => {
            let hour = value
                .trim()
                .parse::<u8>()
                .ok()
                .and_then(Hour12::new)
                .ok_or_else(|| HandlerErr::bad_params("hour must be 01..12"))?;
            field.select_hour(hour)
        }
        "minute" => {
            let minute = value
                .trim()
                .parse::<u8>()
                .ok()
                .and_then(Minute::new)
                .ok_or_else(|| HandlerErr::bad_params("minute must be 00..59"))?;
            field.select_minute(minute)
        }
        "meridiem" => {
            let meridiem = Meridiem::parse(value)
                .ok_or_else(|| HandlerErr::bad_params("meridiem must be AM or PM"))?;
            field.set_meridiem(meridiem)
        }
        other => {
            return Err(HandlerErr::bad_params(format!(
                "unknown time part: {}",
                other
            )))
        }
    };
    Ok(emitted)
}

fn time_column_for_field(field: &str) -> Result<&'static str, HandlerErr> {
    match field {
        "start" => Ok("start_time"),
        "end" => Ok("end_time"),
        other => Err(HandlerErr::bad_params(format!(
            "field must be start or end, got {}",
            other
        ))),
    }
}

fn shifts_set_time_part(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let shift_id = get_required_str(params, "shiftId")?;
    let field = get_required_str(params, "field")?;
    let part = get_required_str(params, "part")?;
    let value = get_required_str(params, "value")?;

    let column = time_column_for_field(&field)?;
    let shift = load_shift(conn, &shift_id)?;
    let stored = match column {
        "start_time" => &shift.start_time,
        _ => &shift.end_time,
    };
    let emitted = apply_time_part(stored, &part, &value)?;

    let sql = format!(
        "UPDATE shifts SET {} = ?, updated_at = ? WHERE id = ?",
        column
    );
    conn.execute(&sql, (emitted.to_string(), now_ts(), &shift_id))
        .map_err(|e| HandlerErr {
            code: "db_update_failed",
            message: e.to_string(),
            details: Some(json!({ "table": "shifts" })),
        })?;

    Ok(json!({
        "shiftId": shift_id,
        "field": field,
        "time": emitted.to_string(),
        "display": format_display(Some(&emitted.to_string())),
    }))
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
        "shifts.list" => Some(handle(state, req, shifts_list)),
        "shifts.create" => Some(handle(state, req, shifts_create)),
        "shifts.update" => Some(handle(state, req, shifts_update)),
        "shifts.delete" => Some(handle(state, req, shifts_delete)),
        "shifts.setTimePart" => Some(handle(state, req, shifts_set_time_part)),
        _ => None,
    }
}
