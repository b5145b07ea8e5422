use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

use crate::db::{DatabaseError, DATETIME_FORMAT};

/// Insert a batch of audit entries into the audit_log table.
pub fn insert_audit_entries(
    conn: &Connection,
    entries: &[(String, String, String, String)], // (timestamp, actor, action, outcome)
) -> Result<(), DatabaseError> {
    let mut stmt = conn.prepare(
        "INSERT INTO audit_log (timestamp, actor, action, outcome) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (timestamp, actor, action, outcome) in entries {
        stmt.execute(params![timestamp, actor, action, outcome])?;
    }
    Ok(())
}

/// Prune audit entries recorded before `cutoff`.
pub fn prune_audit_log(conn: &Connection, cutoff: &NaiveDateTime) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM audit_log WHERE timestamp < ?1",
        params![cutoff.format(DATETIME_FORMAT).to_string()],
    )?;
    Ok(deleted)
}

/// Entries for one actor, newest first. Returns (timestamp, action, outcome) tuples.
#[cfg(test)]
pub fn query_audit_by_actor(
    conn: &Connection,
    actor: &str,
) -> Result<Vec<(String, String, String)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT timestamp, action, outcome FROM audit_log
         WHERE actor = ?1
         ORDER BY timestamp DESC, id DESC",
    )?;
    let rows = stmt
        .query_map(params![actor], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    fn entry(ts: &str, actor: &str) -> (String, String, String, String) {
        (ts.into(), actor.into(), "GET /api/stock".into(), "status:200".into())
    }

    #[test]
    fn insert_query_and_prune() {
        let conn = open_memory_database().unwrap();
        insert_audit_entries(
            &conn,
            &[
                entry("2024-01-01 10:00:00", "maria"),
                entry("2024-06-01 10:00:00", "maria"),
                entry("2024-06-01 11:00:00", "anonymous"),
            ],
        )
        .unwrap();

        let maria = query_audit_by_actor(&conn, "maria").unwrap();
        assert_eq!(maria.len(), 2);
        assert_eq!(maria[0].0, "2024-06-01 10:00:00");

        let cutoff = NaiveDateTime::parse_from_str("2024-03-01 00:00:00", DATETIME_FORMAT).unwrap();
        assert_eq!(prune_audit_log(&conn, &cutoff).unwrap(), 1);
        assert_eq!(query_audit_by_actor(&conn, "maria").unwrap().len(), 1);
    }
}
