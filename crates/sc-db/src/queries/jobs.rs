//! Transcoding job records.

use chrono::Utc;
use rusqlite::Connection;
use sc_core::{AssembledData, Error, JobId, Result};

use crate::models::Job;

const COLS: &str = "id, source_id, width, height, framerate, bitrate, codec,
    codec_settings, chunks, finished, assembled_data, created_at";

/// Create a new, unfinished job.
pub fn create_job(
    conn: &Connection,
    codec: &str,
    codec_settings: Option<&str>,
    chunks: i64,
) -> Result<Job> {
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO jobs (codec, codec_settings, chunks, finished, created_at)
         VALUES (?1, ?2, ?3, 0, ?4)",
        rusqlite::params![codec, codec_settings, chunks, &now],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    let id = JobId::new(conn.last_insert_rowid());

    Ok(Job {
        id,
        source_id: None,
        width: None,
        height: None,
        framerate: None,
        bitrate: None,
        codec: codec.to_string(),
        codec_settings: codec_settings.map(String::from),
        chunks: Some(chunks),
        finished: false,
        assembled_data: None,
        created_at: now,
    })
}

/// Get a job by ID.
pub fn get_job(conn: &Connection, id: JobId) -> Result<Option<Job>> {
    let q = format!("SELECT {COLS} FROM jobs WHERE id = ?1");
    let result = conn.query_row(&q, [id.get()], Job::from_row);
    match result {
        Ok(j) => Ok(Some(j)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Record a job's assembled output and mark it finished.
pub fn set_assembled_data(conn: &Connection, id: JobId, data: &AssembledData) -> Result<bool> {
    let text = data.to_json()?;
    let n = conn
        .execute(
            "UPDATE jobs SET assembled_data = ?1, finished = 1 WHERE id = ?2",
            rusqlite::params![text, id.get()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Set a job's finished flag without touching its assembled data.
pub fn set_finished(conn: &Connection, id: JobId, finished: bool) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE jobs SET finished = ?1 WHERE id = ?2",
            rusqlite::params![finished as i64, id.get()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// List finished jobs, newest first.
pub fn list_finished_jobs(conn: &Connection, offset: i64, limit: i64) -> Result<Vec<Job>> {
    let q = format!(
        "SELECT {COLS} FROM jobs WHERE finished = 1
         ORDER BY id DESC LIMIT ?1 OFFSET ?2"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([limit, offset], Job::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}
