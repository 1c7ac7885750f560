// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Row codec for the job table
//!
//! The table is a line-oriented CSV with a fixed header and stable column
//! order `id,parent_id,description,performance,status`. Readers tolerate
//! short rows (missing trailing columns are empty); writers never reorder
//! or extend columns in place. Schema evolution requires an explicit
//! migration.

use evoq_core::{Job, JobId, StatusParseError};
use thiserror::Error;

/// Fixed header line; also used to recognize headers on load
pub const HEADER: &str = "id,parent_id,description,performance,status";

const COLUMNS: usize = 5;

/// Errors parsing a single row
#[derive(Debug, Error, PartialEq)]
pub enum RowError {
    #[error("row has no id")]
    MissingId,

    #[error("expected at most {COLUMNS} columns, got {0}")]
    TooManyColumns(usize),

    #[error("unterminated quoted field")]
    UnterminatedQuote,

    #[error("bad performance value {0:?}")]
    BadPerformance(String),

    #[error(transparent)]
    BadStatus(#[from] StatusParseError),
}

/// Parse one data row into a job
pub fn parse_row(line: &str) -> Result<Job, RowError> {
    let mut fields = split_fields(line)?;
    if fields.len() > COLUMNS {
        return Err(RowError::TooManyColumns(fields.len()));
    }
    // Short rows imply empty trailing columns
    fields.resize(COLUMNS, String::new());

    let id = fields[0].trim();
    if id.is_empty() {
        return Err(RowError::MissingId);
    }

    let parent = match fields[1].trim() {
        "" => None,
        parent => Some(JobId::new(parent)),
    };

    let performance = match fields[3].trim() {
        "" => None,
        raw => Some(
            raw.parse::<f64>()
                .map_err(|_| RowError::BadPerformance(raw.to_string()))?,
        ),
    };

    Ok(Job {
        id: JobId::new(id),
        parent,
        description: fields[2].clone(),
        performance,
        status: fields[4].parse()?,
    })
}

/// Format a job as one data row
pub fn format_row(job: &Job) -> String {
    let columns = [
        quote_field(job.id.as_str()),
        quote_field(job.parent.as_ref().map(JobId::as_str).unwrap_or("")),
        quote_field(&job.description),
        job.performance.map(|v| v.to_string()).unwrap_or_default(),
        job.status.to_string(),
    ];
    columns.join(",")
}

/// Quote a field when it contains a delimiter or quote.
///
/// The table is line-oriented, so embedded newlines are flattened to
/// spaces rather than quoted across lines.
fn quote_field(value: &str) -> String {
    let value = if value.contains(['\n', '\r']) {
        value.replace(['\n', '\r'], " ")
    } else {
        value.to_string()
    };

    if value.contains(',') || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value
    }
}

/// Split a row into fields, honoring double-quote escaping
fn split_fields(line: &str) -> Result<Vec<String>, RowError> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    current.push('"');
                }
                '"' => in_quotes = false,
                other => current.push(other),
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut current)),
                other => current.push(other),
            }
        }
    }

    if in_quotes {
        return Err(RowError::UnterminatedQuote);
    }

    fields.push(current);
    Ok(fields)
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
