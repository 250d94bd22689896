//! Loading probability tables from delimited text.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use eyre::WrapErr;

use crate::{DiscreteSampler, TableEntry};

/// Reads a `value,probability` table and constructs a sampler out of it.
///
/// Fields are trimmed, and blank rows or rows with fewer than two fields are skipped. Any fields
/// past the second are ignored. The first non-blank row is treated as a header and skipped if it
/// mentions `time` or `prob`.
///
/// # Errors
///
/// Returns an error if the input cannot be read, a value or probability fails to parse, or the
/// resulting table is rejected by [`DiscreteSampler::new`].
pub fn read_table<R: Read>(reader: R) -> eyre::Result<DiscreteSampler> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut entries = Vec::new();
    let mut seen_first_row = false;
    for record in reader.records() {
        let record = record.wrap_err("unable to read table row")?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map_or(0, csv::Position::line);
        if !seen_first_row {
            seen_first_row = true;
            if record
                .iter()
                .any(|field| field.contains("time") || field.contains("prob"))
            {
                log::debug!("Skipping table header at line {}", line);
                continue;
            }
        }
        if record.len() < 2 {
            log::warn!("Skipping table row at line {}: expected two fields", line);
            continue;
        }
        let value = record[0]
            .parse::<i64>()
            .wrap_err_with(|| format!("invalid value `{}` at line {}", &record[0], line))?;
        let probability = record[1]
            .parse::<f64>()
            .wrap_err_with(|| format!("invalid probability `{}` at line {}", &record[1], line))?;
        entries.push(TableEntry { value, probability });
    }
    Ok(DiscreteSampler::new(entries)?)
}

/// Loads a sampler from the table file at `path`. See [`read_table`] for the format.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or its contents are invalid.
pub fn load_table<P: AsRef<Path>>(path: P) -> eyre::Result<DiscreteSampler> {
    let path = path.as_ref();
    let file = File::open(path)
        .wrap_err_with(|| format!("unable to open table file: {}", path.display()))?;
    let sampler = read_table(file)
        .wrap_err_with(|| format!("invalid table file: {}", path.display()))?;
    log::info!("Loaded table {}: {}", path.display(), sampler);
    Ok(sampler)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ConfigError;
    use rstest::rstest;

    fn values(sampler: &DiscreteSampler) -> Vec<(i64, f64)> {
        sampler
            .entries()
            .iter()
            .map(|e| (e.value, e.probability))
            .collect()
    }

    #[rstest(
        input,
        case("1,0.25\n2,0.75\n"),
        case("time,prob\n1,0.25\n2,0.75\n"),
        case("\n\n  minutes , probability \n 1 , 0.25\n\n2,0.75"),
        case("1,0.25,ignored\n2,0.75\n"),
        case("1,1\nbroken\n2,3\n")
    )]
    fn test_read_table(input: &str) {
        let sampler = read_table(input.as_bytes()).unwrap();
        assert_eq!(values(&sampler), vec![(1, 0.25), (2, 0.75)]);
    }

    #[test]
    fn test_header_only_checked_on_first_row() {
        let err = read_table("1,0.5\ntime,prob\n".as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"), "{:#}", err);
    }

    #[test]
    fn test_first_row_without_keywords_is_data() {
        let err = read_table("value,weight\n1,1\n".as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid value `value`"));
    }

    #[test]
    fn test_empty_table() {
        let err = read_table("time,prob\n\n".as_bytes()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::EmptyTable)
        );
    }

    #[test]
    fn test_zero_sum() {
        let err = read_table("1,0\n2,0.0\n".as_bytes()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::NonPositiveSum(0.0))
        );
    }

    #[test]
    fn test_overflowing_sum() {
        let err = read_table("1,1e308\n2,1e308\n".as_bytes()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::NonFiniteSum(f64::INFINITY))
        );
    }

    #[test]
    fn test_invalid_probability() {
        let err = read_table("1,0.5\n2,abc\n".as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid probability `abc` at line 2"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_table("this/file/does/not/exist.csv").unwrap_err();
        assert!(format!("{}", err).contains("unable to open table file"));
    }
}
