use crate::clock::format_display;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    class_exists, get_optional_str, get_required_str, get_required_time, get_required_weekday,
    HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

use super::shifts::apply_time_part;

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, Clone)]
struct PeriodRow {
    id: String,
    weekday: i64,
    subject: String,
    start_time: String,
    end_time: String,
    sort_order: i64,
}

impl PeriodRow {
    fn to_json(&self) -> serde_json::Value {
        json!({
            "id": self.id,
            "weekday": self.weekday,
            "subject": self.subject,
            "startTime": self.start_time,
            "endTime": self.end_time,
            "startDisplay": format_display(Some(&self.start_time)),
            "endDisplay": format_display(Some(&self.end_time)),
            "sortOrder": self.sort_order,
        })
    }
}

fn classes_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let class_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO classes(id, name) VALUES(?, ?)",
        (&class_id, &name),
    )
    .map_err(|e| HandlerErr::db("db_update_failed", e))?;
    Ok(json!({ "classId": class_id }))
}

fn classes_list(conn: &Connection, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn
        .prepare("SELECT id, name FROM classes ORDER BY name")
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;
    let classes = stmt
        .query_map([], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "name": r.get::<_, String>(1)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;
    Ok(json!({ "classes": classes }))
}

fn classes_delete(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::db("db_tx_failed", e))?;
    tx.execute(
        "DELETE FROM routine_periods WHERE class_id = ?",
        [&class_id],
    )
    .map_err(|e| HandlerErr::db("db_update_failed", e))?;
    tx.execute(
        "DELETE FROM timetable_slots WHERE class_id = ?",
        [&class_id],
    )
    .map_err(|e| HandlerErr::db("db_update_failed", e))?;
    let affected = tx
        .execute("DELETE FROM classes WHERE id = ?", [&class_id])
        .map_err(|e| HandlerErr::db("db_update_failed", e))?;
    tx.commit().map_err(|e| HandlerErr::db("db_commit_failed", e))?;
    if affected == 0 {
        return Err(HandlerErr::not_found("class not found"));
    }
    Ok(json!({ "ok": true }))
}

fn list_periods(conn: &Connection, class_id: &str) -> Result<Vec<PeriodRow>, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT id, weekday, subject, start_time, end_time, sort_order
             FROM routine_periods
             WHERE class_id = ?
             ORDER BY weekday, sort_order, start_time",
        )
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;
    stmt.query_map([class_id], |r| {
        Ok(PeriodRow {
            id: r.get(0)?,
            weekday: r.get(1)?,
            subject: r.get(2)?,
            start_time: r.get(3)?,
            end_time: r.get(4)?,
            sort_order: r.get(5)?,
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(|e| HandlerErr::db("db_query_failed", e))
}

fn routine_week_open(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    if !class_exists(conn, &class_id)? {
        return Err(HandlerErr::not_found("class not found"));
    }
    let periods = list_periods(conn, &class_id)?;

    let days: Vec<serde_json::Value> = (1..=7)
        .map(|weekday| {
            let rows: Vec<serde_json::Value> = periods
                .iter()
                .filter(|p| p.weekday == weekday)
                .map(PeriodRow::to_json)
                .collect();
            json!({
                "weekday": weekday,
                "name": WEEKDAY_NAMES[(weekday - 1) as usize],
                "periods": rows,
            })
        })
        .collect();

    Ok(json!({ "classId": class_id, "days": days }))
}

fn routine_period_upsert(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    if !class_exists(conn, &class_id)? {
        return Err(HandlerErr::not_found("class not found"));
    }
    let weekday = get_required_weekday(params, "weekday")?;
    let subject = get_required_str(params, "subject")?;
    let start = get_required_time(params, "startTime")?;
    let end = get_required_time(params, "endTime")?;
    let sort_order = params
        .get("sortOrder")
        .and_then(|v| v.as_i64())
        .unwrap_or(0);

    let period_id = match get_optional_str(params, "periodId").filter(|s| !s.is_empty()) {
        Some(existing_id) => {
            let affected = conn
                .execute(
                    "UPDATE routine_periods
                     SET weekday = ?, subject = ?, start_time = ?, end_time = ?, sort_order = ?
                     WHERE class_id = ? AND id = ?",
                    (
                        weekday,
                        &subject,
                        start.to_string(),
                        end.to_string(),
                        sort_order,
                        &class_id,
                        &existing_id,
                    ),
                )
                .map_err(|e| HandlerErr::db("db_update_failed", e))?;
            if affected == 0 {
                return Err(HandlerErr::not_found("routine period not found"));
            }
            existing_id
        }
        None => {
            let new_id = Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO routine_periods(id, class_id, weekday, subject, start_time, end_time, sort_order)
                 VALUES(?, ?, ?, ?, ?, ?, ?)",
                (
                    &new_id,
                    &class_id,
                    weekday,
                    &subject,
                    start.to_string(),
                    end.to_string(),
                    sort_order,
                ),
            )
            .map_err(|e| HandlerErr::db("db_update_failed", e))?;
            new_id
        }
    };

    Ok(json!({
        "periodId": period_id,
        "startTime": start.to_string(),
        "endTime": end.to_string(),
        "startDisplay": format_display(Some(&start.to_string())),
        "endDisplay": format_display(Some(&end.to_string())),
    }))
}

fn routine_period_delete(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let period_id = get_required_str(params, "periodId")?;
    let affected = conn
        .execute(
            "DELETE FROM routine_periods WHERE class_id = ? AND id = ?",
            (&class_id, &period_id),
        )
        .map_err(|e| HandlerErr::db("db_update_failed", e))?;
    if affected == 0 {
        return Err(HandlerErr::not_found("routine period not found"));
    }
    Ok(json!({ "ok": true }))
}

fn routine_period_set_time_part(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let period_id = get_required_str(params, "periodId")?;
    let field = get_required_str(params, "field")?;
    let part = get_required_str(params, "part")?;
    let value = get_required_str(params, "value")?;

    let column = match field.as_str() {
        "start" => "start_time",
        "end" => "end_time",
        other => {
            return Err(HandlerErr::bad_params(format!(
                "field must be start or end, got {}",
                other
            )))
        }
    };
    let sql = format!(
        "SELECT {} FROM routine_periods WHERE class_id = ? AND id = ?",
        column
    );
    let stored: String = conn
        .query_row(&sql, (&class_id, &period_id), |r| r.get(0))
        .optional()
        .map_err(|e| HandlerErr::db("db_query_failed", e))?
        .ok_or_else(|| HandlerErr::not_found("routine period not found"))?;

    let emitted = apply_time_part(&stored, &part, &value)?;
    let update = format!(
        "UPDATE routine_periods SET {} = ? WHERE class_id = ? AND id = ?",
        column
    );
    conn.execute(&update, (emitted.to_string(), &class_id, &period_id))
        .map_err(|e| HandlerErr::db("db_update_failed", e))?;

    Ok(json!({
        "periodId": period_id,
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
        "classes.create" => Some(handle(state, req, classes_create)),
        "classes.list" => Some(handle(state, req, classes_list)),
        "classes.delete" => Some(handle(state, req, classes_delete)),
        "routine.weekOpen" => Some(handle(state, req, routine_week_open)),
        "routine.periodUpsert" => Some(handle(state, req, routine_period_upsert)),
        "routine.periodDelete" => Some(handle(state, req, routine_period_delete)),
        "routine.periodSetTimePart" => Some(handle(state, req, routine_period_set_time_part)),
        _ => None,
    }
}
