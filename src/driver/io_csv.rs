// Primitives for reading candidate lists from CSV files.

use csv::StringRecord;

use crate::driver::*;

/// A candidate as listed in the import file.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedCandidate {
    pub name: String,
    pub enabled: bool,
}

/// Reads a file with a `name` column and an optional `enabled` column.
pub fn read_candidates_csv(path: &str) -> CliResult<Vec<ParsedCandidate>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let headers = rdr.headers().context(CsvOpenSnafu { path })?.clone();
    let name_idx = column(&headers, "name").context(CsvMissingColumnSnafu {
        path,
        column: "name",
    })?;
    let enabled_idx = column(&headers, "enabled");

    let mut res: Vec<ParsedCandidate> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        debug!("read_candidates_csv: lineno: {:?} row: {:?}", lineno, line);
        let name = line.get(name_idx).unwrap_or("").to_string();
        if name.is_empty() {
            warn!("read_candidates_csv: line {}: no name, skipping", lineno);
            continue;
        }
        let enabled_s = enabled_idx.and_then(|i| line.get(i)).unwrap_or("");
        let enabled = parse_flag(enabled_s).context(CsvBadFlagSnafu {
            lineno,
            value: enabled_s,
        })?;
        res.push(ParsedCandidate { name, enabled });
    }
    Ok(res)
}

fn column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.eq_ignore_ascii_case(name))
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "" | "true" | "yes" | "1" | "x" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}
