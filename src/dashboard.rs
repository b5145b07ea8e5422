//! Dashboard aggregations.
//!
//! Every query that depends on "now" takes it as a parameter; nothing
//! here reads the clock.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDateTime};
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::db::{self, enum_column, DatabaseError, DATE_FORMAT};
use crate::models::Priority;

/// Number of procedures shown in the average-stay table.
const AVERAGE_STAY_TOP: i64 = 5;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub inpatients: i64,
    pub discharges_last_7_days: i64,
    pub low_stock_items: i64,
    pub vital_checks_last_24h: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthMovement {
    pub month: u32,
    pub admissions: i64,
    pub discharges: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearMovement {
    pub year: i32,
    pub admissions: i64,
    pub discharges: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorityCount {
    pub priority: Priority,
    pub count: i64,
}

/// Admissions in one month split by priority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PriorityTrend {
    pub month: u32,
    pub green: i64,
    pub yellow: i64,
    pub red: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcedureStay {
    pub procedure: String,
    pub patients: i64,
    pub average_days: f64,
}

/// Everything the dashboard view shows.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub year: i32,
    pub summary: Summary,
    pub monthly_movement: Vec<MonthMovement>,
    pub annual_movement: Vec<YearMovement>,
    pub priority_distribution: Vec<PriorityCount>,
    pub priority_trend: Vec<PriorityTrend>,
    pub average_stay: Vec<ProcedureStay>,
}

// ═══════════════════════════════════════════════════════════
// Queries
// ═══════════════════════════════════════════════════════════

/// Build the full dashboard. `year` defaults to the year of `now`.
pub fn build(
    conn: &Connection,
    now: NaiveDateTime,
    year: Option<i32>,
    low_stock_threshold: i64,
) -> Result<Dashboard, DatabaseError> {
    let year = year.unwrap_or_else(|| now.year());
    Ok(Dashboard {
        year,
        summary: summary(conn, now, low_stock_threshold)?,
        monthly_movement: monthly_movement(conn, year)?,
        annual_movement: annual_movement(conn)?,
        priority_distribution: priority_distribution(conn)?,
        priority_trend: priority_trend(conn, year)?,
        average_stay: average_stay(conn)?,
    })
}

pub fn summary(
    conn: &Connection,
    now: NaiveDateTime,
    low_stock_threshold: i64,
) -> Result<Summary, DatabaseError> {
    let inpatients = conn.query_row(
        "SELECT COUNT(*) FROM patients WHERE status = 'inpatient'",
        [],
        |row| row.get(0),
    )?;

    let week_ago = (now.date() - Duration::days(7)).format(DATE_FORMAT).to_string();
    let discharges_last_7_days = conn.query_row(
        "SELECT COUNT(*) FROM patients WHERE status = 'discharged' AND discharged_on >= ?1",
        params![week_ago],
        |row| row.get(0),
    )?;

    Ok(Summary {
        inpatients,
        discharges_last_7_days,
        low_stock_items: db::count_low_stock(conn, low_stock_threshold)?,
        vital_checks_last_24h: db::count_vital_checks_since(conn, &(now - Duration::hours(24)))?,
    })
}

/// Admissions and discharges for each month of `year`, zero-filled.
pub fn monthly_movement(conn: &Connection, year: i32) -> Result<Vec<MonthMovement>, DatabaseError> {
    let year_str = format!("{year:04}");
    let admissions = month_counts(
        conn,
        "SELECT CAST(strftime('%m', admitted_at) AS INTEGER), COUNT(*)
         FROM patients WHERE strftime('%Y', admitted_at) = ?1 GROUP BY 1",
        &year_str,
    )?;
    let discharges = month_counts(
        conn,
        "SELECT CAST(strftime('%m', discharged_on) AS INTEGER), COUNT(*)
         FROM patients
         WHERE discharged_on IS NOT NULL AND strftime('%Y', discharged_on) = ?1
         GROUP BY 1",
        &year_str,
    )?;

    Ok((1..=12)
        .map(|month| MonthMovement {
            month,
            admissions: admissions.get(&month).copied().unwrap_or(0),
            discharges: discharges.get(&month).copied().unwrap_or(0),
        })
        .collect())
}

/// Admissions and discharges per year present in the data, oldest first.
pub fn annual_movement(conn: &Connection) -> Result<Vec<YearMovement>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT y, SUM(a), SUM(d) FROM (
             SELECT CAST(strftime('%Y', admitted_at) AS INTEGER) AS y, 1 AS a, 0 AS d FROM patients
             UNION ALL
             SELECT CAST(strftime('%Y', discharged_on) AS INTEGER), 0, 1
             FROM patients WHERE discharged_on IS NOT NULL
         )
         WHERE y IS NOT NULL
         GROUP BY y ORDER BY y",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(YearMovement {
            year: row.get(0)?,
            admissions: row.get(1)?,
            discharges: row.get(2)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Current inpatients per priority, every priority present.
pub fn priority_distribution(conn: &Connection) -> Result<Vec<PriorityCount>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT priority, COUNT(*) FROM patients WHERE status = 'inpatient' GROUP BY priority",
    )?;
    let counts: HashMap<Priority, i64> = stmt
        .query_map([], |row| {
            let raw: String = row.get(0)?;
            Ok((enum_column::<Priority>(0, &raw)?, row.get(1)?))
        })?
        .collect::<Result<_, _>>()?;

    Ok(Priority::all()
        .iter()
        .map(|p| PriorityCount {
            priority: *p,
            count: counts.get(p).copied().unwrap_or(0),
        })
        .collect())
}

/// Admissions per month of `year` split by priority, zero-filled.
pub fn priority_trend(conn: &Connection, year: i32) -> Result<Vec<PriorityTrend>, DatabaseError> {
    let mut trend: Vec<PriorityTrend> = (1..=12)
        .map(|month| PriorityTrend {
            month,
            ..Default::default()
        })
        .collect();

    let mut stmt = conn.prepare(
        "SELECT CAST(strftime('%m', admitted_at) AS INTEGER), priority, COUNT(*)
         FROM patients WHERE strftime('%Y', admitted_at) = ?1
         GROUP BY 1, 2",
    )?;
    let rows = stmt.query_map(params![format!("{year:04}")], |row| {
        let raw: String = row.get(1)?;
        Ok((
            row.get::<_, u32>(0)?,
            enum_column::<Priority>(1, &raw)?,
            row.get::<_, i64>(2)?,
        ))
    })?;

    for row in rows {
        let (month, priority, count) = row?;
        let Some(slot) = trend.get_mut(month.saturating_sub(1) as usize) else {
            continue;
        };
        match priority {
            Priority::Green => slot.green = count,
            Priority::Yellow => slot.yellow = count,
            Priority::Red => slot.red = count,
        }
    }
    Ok(trend)
}

/// Average stay in days per procedure for discharged patients, busiest first.
pub fn average_stay(conn: &Connection) -> Result<Vec<ProcedureStay>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT procedure, COUNT(*),
                AVG(julianday(discharged_on) - julianday(date(admitted_at)))
         FROM patients
         WHERE status = 'discharged' AND discharged_on IS NOT NULL
           AND procedure IS NOT NULL AND procedure <> ''
         GROUP BY procedure
         ORDER BY COUNT(*) DESC, procedure
         LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![AVERAGE_STAY_TOP], |row| {
        let avg: f64 = row.get(2)?;
        Ok(ProcedureStay {
            procedure: row.get(0)?,
            patients: row.get(1)?,
            average_days: (avg * 10.0).round() / 10.0,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

fn month_counts(conn: &Connection, sql: &str, year: &str) -> Result<HashMap<u32, i64>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![year], |row| Ok((row.get::<_, u32>(0)?, row.get::<_, i64>(1)?)))?;
    rows.collect::<Result<HashMap<_, _>, _>>().map_err(DatabaseError::from)
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::{admit, discharge, AdmissionForm};
    use crate::db::{open_memory_database, DATETIME_FORMAT};
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2024-06-15 12:00:00", DATETIME_FORMAT).unwrap()
    }

    fn admit_at(conn: &Connection, at: &str, priority: Priority, procedure: &str) -> i64 {
        admit(
            conn,
            &AdmissionForm {
                name: format!("Paciente {at}"),
                admitted_at: at.into(),
                priority: Some(priority),
                procedure: Some(procedure.into()),
                ..Default::default()
            },
            "maria",
        )
        .unwrap()
        .patient_id
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seed(conn: &Connection) {
        let a = admit_at(conn, "2023-12-20T10:00", Priority::Green, "Cesarea");
        discharge(conn, a, "joao", day(2024, 1, 2)).unwrap();

        let b = admit_at(conn, "2024-01-10T10:00", Priority::Red, "Cesarea");
        discharge(conn, b, "joao", day(2024, 1, 14)).unwrap();

        let c = admit_at(conn, "2024-06-01T08:00", Priority::Yellow, "Apendicectomia");
        discharge(conn, c, "joao", day(2024, 6, 10)).unwrap();

        admit_at(conn, "2024-06-12T09:00", Priority::Red, "Apendicectomia");
        admit_at(conn, "2024-06-14T09:00", Priority::Red, "Fratura");
    }

    #[test]
    fn summary_counts_relative_to_now() {
        let conn = open_memory_database().unwrap();
        seed(&conn);
        conn.execute(
            "INSERT INTO inventory (medication_name, quantity, unit) VALUES ('Dipirona', 3, 'UN'), ('Soro', 50, 'UN')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO vital_checks (patient_id, recorded_at) VALUES (4, '2024-06-15 08:00:00'), (4, '2024-06-13 08:00:00')",
            [],
        )
        .unwrap();

        let s = summary(&conn, now(), 10).unwrap();
        assert_eq!(
            s,
            Summary {
                inpatients: 2,
                discharges_last_7_days: 1,
                low_stock_items: 1,
                vital_checks_last_24h: 1,
            }
        );
    }

    #[test]
    fn monthly_movement_is_zero_filled() {
        let conn = open_memory_database().unwrap();
        seed(&conn);
        let months = monthly_movement(&conn, 2024).unwrap();
        assert_eq!(months.len(), 12);
        assert_eq!(months[0], MonthMovement { month: 1, admissions: 1, discharges: 2 });
        assert_eq!(months[5], MonthMovement { month: 6, admissions: 3, discharges: 1 });
        assert_eq!(months[11].admissions, 0);
    }

    #[test]
    fn annual_movement_per_year() {
        let conn = open_memory_database().unwrap();
        seed(&conn);
        let years = annual_movement(&conn).unwrap();
        assert_eq!(
            years,
            vec![
                YearMovement { year: 2023, admissions: 1, discharges: 0 },
                YearMovement { year: 2024, admissions: 4, discharges: 3 },
            ]
        );
    }

    #[test]
    fn priority_distribution_covers_all_priorities() {
        let conn = open_memory_database().unwrap();
        seed(&conn);
        let dist = priority_distribution(&conn).unwrap();
        assert_eq!(dist.len(), 3);
        assert_eq!(dist[0], PriorityCount { priority: Priority::Green, count: 0 });
        assert_eq!(dist[2], PriorityCount { priority: Priority::Red, count: 2 });
    }

    #[test]
    fn priority_trend_by_month() {
        let conn = open_memory_database().unwrap();
        seed(&conn);
        let trend = priority_trend(&conn, 2024).unwrap();
        assert_eq!(trend[0], PriorityTrend { month: 1, green: 0, yellow: 0, red: 1 });
        assert_eq!(trend[5], PriorityTrend { month: 6, green: 0, yellow: 1, red: 2 });
    }

    #[test]
    fn average_stay_per_procedure() {
        let conn = open_memory_database().unwrap();
        seed(&conn);
        let stays = average_stay(&conn).unwrap();
        assert_eq!(stays.len(), 2);
        // Cesarea: 13 days and 4 days
        assert_eq!(stays[0].procedure, "Cesarea");
        assert_eq!(stays[0].patients, 2);
        assert_eq!(stays[0].average_days, 8.5);
        assert_eq!(stays[1].procedure, "Apendicectomia");
        assert_eq!(stays[1].average_days, 9.0);
    }

    #[test]
    fn average_stay_keeps_five_busiest_procedures() {
        let conn = open_memory_database().unwrap();
        let volumes = [
            ("Artroscopia", 1),
            ("Biopsia", 2),
            ("Cesarea", 6),
            ("Drenagem", 3),
            ("Enxerto", 5),
            ("Fratura", 4),
            ("Gastrostomia", 1),
        ];
        for (procedure, count) in volumes {
            for i in 0..count {
                let id = admit_at(&conn, &format!("2024-03-{:02}T08:00", i + 1), Priority::Green, procedure);
                discharge(&conn, id, "joao", day(2024, 3, i + 3)).unwrap();
            }
        }

        let stays = average_stay(&conn).unwrap();
        let order: Vec<(&str, i64)> = stays.iter().map(|s| (s.procedure.as_str(), s.patients)).collect();
        assert_eq!(
            order,
            vec![("Cesarea", 6), ("Enxerto", 5), ("Fratura", 4), ("Drenagem", 3), ("Biopsia", 2)]
        );
        assert!(stays.iter().all(|s| s.average_days == 2.0));
    }

    #[test]
    fn build_defaults_to_current_year() {
        let conn = open_memory_database().unwrap();
        let dash = build(&conn, now(), None, 10).unwrap();
        assert_eq!(dash.year, 2024);
        assert!(dash.annual_movement.is_empty());
        assert_eq!(dash.summary.inpatients, 0);
    }
}
