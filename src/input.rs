use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use csv::StringRecord;
use flate2::read::GzDecoder;
use glob::glob;
use tracing::{info, warn};

use crate::error::{GraphError, Result};

pub const AUTHORS_COLUMN: &str = "Authors";
pub const AFFILIATIONS_COLUMN: &str = "Authors with affiliations";

/// Cell values pandas' `read_csv` reads as NaN by default; matched exactly, untrimmed.
pub const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

// Macro for extracting optional cells from CSV rows (absent cells and missing markers are None)
macro_rules! extract_cell {
    ($record:expr, $index:expr) => {
        $record
            .get($index)
            .filter(|s| !MISSING_MARKERS.contains(s))
            .map(|s| s.to_string())
    };
}

/// One row of a bibliographic export, reduced to the two columns the graph needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Publication {
    pub authors: Option<String>,
    pub authors_with_affiliations: Option<String>,
}

/// Expands each pattern in order; matches of a single pattern are sorted so
/// split exports (`export_1.csv`, `export_2.csv`, ...) concatenate reproducibly.
pub fn find_input_files(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for pattern in patterns {
        info!("Searching for input files with pattern: {}", pattern);

        let mut matched = Vec::new();
        for entry in glob(pattern)? {
            match entry {
                Ok(path) => {
                    if !path.is_file() {
                        continue;
                    }
                    if path.metadata()?.len() > 0 {
                        matched.push(path);
                    } else {
                        warn!("Skipping empty input file: {}", path.display());
                    }
                }
                Err(e) => warn!("Error reading glob entry: {}", e),
            }
        }

        matched.sort();
        files.extend(matched);
    }

    if files.is_empty() {
        return Err(GraphError::NoInputFiles(patterns.to_vec()));
    }

    info!("Found {} input files", files.len());
    Ok(files)
}

pub fn read_publications(path: &Path, delimiter: u8) -> Result<Vec<Publication>> {
    let file = File::open(path)?;
    let source: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    let reader = BufReader::with_capacity(1024 * 1024, source);

    let publications = parse_publications(reader, delimiter, path)?;
    info!(
        "Read {} publications from {}",
        publications.len(),
        path.display()
    );
    Ok(publications)
}

/// `source` is only used to label errors.
pub fn parse_publications<R: Read>(
    reader: R,
    delimiter: u8,
    source: &Path,
) -> Result<Vec<Publication>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let authors_idx = column_index(&headers, AUTHORS_COLUMN, source)?;
    let affiliations_idx = column_index(&headers, AFFILIATIONS_COLUMN, source)?;

    let mut publications = Vec::new();
    for result in rdr.records() {
        let record = result?;

        // Short rows are tolerated, overlong ones mean the quoting is broken
        if record.len() > headers.len() {
            return Err(GraphError::MalformedRow {
                line: record.position().map(|p| p.line()).unwrap_or(0),
                fields: record.len(),
                expected: headers.len(),
                path: source.to_path_buf(),
            });
        }

        publications.push(Publication {
            authors: extract_cell!(record, authors_idx),
            authors_with_affiliations: extract_cell!(record, affiliations_idx),
        });
    }

    Ok(publications)
}

fn column_index(headers: &StringRecord, column: &str, source: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}') == column)
        .ok_or_else(|| GraphError::MissingColumn {
            column: column.to_string(),
            path: source.to_path_buf(),
        })
}
