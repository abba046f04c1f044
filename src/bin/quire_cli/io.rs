#![deny(clippy::all, clippy::pedantic)]

use std::fs;
use std::path::PathBuf;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::client::CliError;

/// File contents win over the inline value.
pub fn read_opt_value(
    val: Option<String>,
    file: Option<PathBuf>,
) -> Result<Option<String>, CliError> {
    if let Some(path) = file {
        let data = fs::read_to_string(&path).map_err(|source| CliError::InputFile {
            path: path.display().to_string(),
            source,
        })?;
        return Ok(Some(data));
    }
    Ok(val)
}

pub fn parse_time_opt(val: Option<String>) -> Result<Option<OffsetDateTime>, CliError> {
    val.map(|v| {
        OffsetDateTime::parse(v.trim(), &Rfc3339)
            .map_err(|e| CliError::InvalidInput(format!("invalid RFC 3339 time `{v}`: {e}")))
    })
    .transpose()
}
