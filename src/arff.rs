//! ARFF dataset store.
//!
//! The persisted table is a Weka ARFF file with one numeric attribute per
//! feature and a nominal `activity` attribute declaring the full label set:
//!
//! ```text
//! @relation activity
//!
//! @attribute min numeric
//! @attribute max numeric
//! @attribute mean numeric
//! @attribute stdDev numeric
//! @attribute activity {walking,running,stationary,stairs}
//!
//! @data
//! 1,4,2.5,1.118033988749895,walking
//! ```
//!
//! Reading is tolerant of what other ARFF writers emit (comments, keyword
//! case, quoted values, a narrower label declaration), but the columns
//! themselves must match the schema exactly. Anything else is a
//! [`StoreError::Format`] pointing at the offending line.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::dataset::Dataset;
use crate::error::StoreError;
use crate::store::{ensure_writable_dir, read_existing, write_atomically, DatasetStore};
use crate::types::{ActivityLabel, LabeledRecord, WindowFeatures};

/// Relation name written into new files.
pub const RELATION_NAME: &str = "activity";

/// Persisted column names, in order.
pub const COLUMNS: [&str; 5] = ["min", "max", "mean", "stdDev", "activity"];

/// File-backed ARFF store.
#[derive(Debug, Clone)]
pub struct ArffStore {
    path: PathBuf,
}

impl ArffStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DatasetStore for ArffStore {
    fn load(&self) -> Result<Dataset, StoreError> {
        let text = read_existing(&self.path)?;
        let dataset = parse(&text)?;
        log::debug!("Loaded {} records from {}", dataset.len(), self.path.display());
        Ok(dataset)
    }

    fn save(&mut self, dataset: &Dataset) -> Result<(), StoreError> {
        ensure_writable_dir(&self.path)?;
        write_atomically(&self.path, |w| write_arff(w, dataset))
    }

    fn check_available(&self) -> Result<(), StoreError> {
        ensure_writable_dir(&self.path)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ============================================================================
// WRITING
// ============================================================================

/// Write the header and every record.
pub fn write_arff(w: &mut dyn Write, dataset: &Dataset) -> Result<(), StoreError> {
    writeln!(w, "@relation {}", RELATION_NAME)?;
    writeln!(w)?;
    for column in &COLUMNS[..4] {
        writeln!(w, "@attribute {} numeric", column)?;
    }
    let labels: Vec<&str> = ActivityLabel::all().iter().map(|l| l.as_str()).collect();
    writeln!(w, "@attribute {} {{{}}}", COLUMNS[4], labels.join(","))?;
    writeln!(w)?;
    writeln!(w, "@data")?;

    for record in dataset {
        let f = &record.features;
        writeln!(
            w,
            "{},{},{},{},{}",
            f.min, f.max, f.mean, f.std_dev, record.activity
        )?;
    }
    Ok(())
}

/// Render a dataset as ARFF text.
pub fn to_arff_string(dataset: &Dataset) -> Result<String, StoreError> {
    let mut buf = Vec::new();
    write_arff(&mut buf, dataset)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

// ============================================================================
// READING
// ============================================================================

#[derive(Debug)]
enum AttributeKind {
    Numeric,
    Nominal,
}

/// Parse ARFF text into a dataset.
pub fn parse(text: &str) -> Result<Dataset, StoreError> {
    let mut attributes: Vec<(String, AttributeKind)> = Vec::new();
    let mut in_data = false;
    let mut dataset = Dataset::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }

        if in_data {
            dataset.push(parse_row(line, line_no)?);
            continue;
        }

        let (keyword, rest) = split_keyword(line);
        match keyword.to_ascii_lowercase().as_str() {
            "@relation" => {}
            "@attribute" => attributes.push(parse_attribute(rest, line_no)?),
            "@data" => {
                check_columns(&attributes, line_no)?;
                in_data = true;
            }
            _ => {
                return Err(StoreError::format(
                    line_no,
                    format!("unexpected header line '{}'", line),
                ))
            }
        }
    }

    if !in_data {
        return Err(StoreError::format(text.lines().count().max(1), "missing @data section"));
    }
    Ok(dataset)
}

fn split_keyword(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (line, ""),
    }
}

fn parse_attribute(decl: &str, line_no: usize) -> Result<(String, AttributeKind), StoreError> {
    let (name, kind) = split_keyword(decl);
    let name = unquote(name);
    if name.is_empty() || kind.is_empty() {
        return Err(StoreError::format(line_no, "incomplete @attribute declaration"));
    }

    if let Some(body) = kind.strip_prefix('{') {
        let body = body
            .strip_suffix('}')
            .ok_or_else(|| StoreError::format(line_no, "unterminated nominal declaration"))?;
        for value in body.split(',') {
            let value = unquote(value.trim());
            value
                .parse::<ActivityLabel>()
                .map_err(|e| StoreError::format(line_no, e.to_string()))?;
        }
        return Ok((name.to_string(), AttributeKind::Nominal));
    }

    match kind.to_ascii_lowercase().as_str() {
        "numeric" | "real" | "integer" => Ok((name.to_string(), AttributeKind::Numeric)),
        other => Err(StoreError::format(
            line_no,
            format!("unsupported attribute type '{}'", other),
        )),
    }
}

fn check_columns(attributes: &[(String, AttributeKind)], line_no: usize) -> Result<(), StoreError> {
    let names: Vec<&str> = attributes.iter().map(|(n, _)| n.as_str()).collect();
    let matches = names.len() == COLUMNS.len()
        && names
            .iter()
            .zip(COLUMNS.iter())
            .all(|(a, b)| a.eq_ignore_ascii_case(b));
    if !matches {
        return Err(StoreError::format(
            line_no,
            format!("expected columns {:?}, found {:?}", COLUMNS, names),
        ));
    }

    for (i, (name, kind)) in attributes.iter().enumerate() {
        let ok = match kind {
            AttributeKind::Numeric => i < 4,
            AttributeKind::Nominal => i == 4,
        };
        if !ok {
            return Err(StoreError::format(
                line_no,
                format!("column '{}' has the wrong type", name),
            ));
        }
    }
    Ok(())
}

fn parse_row(line: &str, line_no: usize) -> Result<LabeledRecord, StoreError> {
    if line.starts_with('{') {
        return Err(StoreError::format(line_no, "sparse rows are not supported"));
    }

    let fields: Vec<&str> = line.split(',').map(|f| unquote(f.trim())).collect();
    if fields.len() != COLUMNS.len() {
        return Err(StoreError::format(
            line_no,
            format!("expected {} values, found {}", COLUMNS.len(), fields.len()),
        ));
    }
    if let Some(pos) = fields.iter().position(|f| *f == "?") {
        return Err(StoreError::format(
            line_no,
            format!("missing value for '{}'", COLUMNS[pos]),
        ));
    }

    let number = |i: usize| -> Result<f64, StoreError> {
        fields[i].parse::<f64>().map_err(|_| {
            StoreError::format(
                line_no,
                format!("'{}' is not a number for '{}'", fields[i], COLUMNS[i]),
            )
        })
    };

    let features = WindowFeatures {
        min: number(0)?,
        max: number(1)?,
        mean: number(2)?,
        std_dev: number(3)?,
    };
    let activity = fields[4]
        .parse::<ActivityLabel>()
        .map_err(|e| StoreError::format(line_no, e.to_string()))?;

    Ok(LabeledRecord::new(features, activity))
}

fn unquote(s: &str) -> &str {
    for q in ['\'', '"'] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dataset() -> Dataset {
        vec![
            LabeledRecord::new(
                WindowFeatures {
                    min: 1.0,
                    max: 4.0,
                    mean: 2.5,
                    std_dev: 1.25f64.sqrt(),
                },
                ActivityLabel::Walking,
            ),
            LabeledRecord::new(
                WindowFeatures {
                    min: 3.0,
                    max: 6.0,
                    mean: 4.5,
                    std_dev: 1.25f64.sqrt(),
                },
                ActivityLabel::Running,
            ),
        ]
        .into()
    }

    #[test]
    fn test_written_header() {
        let text = to_arff_string(&Dataset::new()).unwrap();
        assert!(text.starts_with("@relation activity\n"));
        assert!(text.contains("@attribute stdDev numeric\n"));
        assert!(text.contains("@attribute activity {walking,running,stationary,stairs}\n"));
        assert!(text.trim_end().ends_with("@data"));
    }

    #[test]
    fn test_written_rows_parse_back_exactly() {
        let dataset = sample_dataset();
        let text = to_arff_string(&dataset).unwrap();
        assert!(text.contains("\n1,4,2.5,1.118033988749895,walking\n"));
        assert_eq!(parse(&text).unwrap(), dataset);
    }

    #[test]
    fn test_parse_foreign_dialect() {
        let text = "% written elsewhere\n\
                    @RELATION MyRelation\n\
                    @ATTRIBUTE 'min' NUMERIC\n\
                    @attribute max real\n\
                    @attribute mean numeric\n\
                    @attribute stdDev numeric\n\
                    @attribute activity {walking,running}\n\
                    \n\
                    @DATA\n\
                    1.0, 5.0, 3.0, 3.3, 'walking'\n";
        let dataset = parse(text).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.records()[0].features.max, 5.0);
        assert_eq!(dataset.records()[0].activity, ActivityLabel::Walking);
    }

    #[test]
    fn test_parse_rejects_schema_mismatch() {
        // The legacy layout without a mean column.
        let text = "@relation r\n\
                    @attribute min numeric\n\
                    @attribute max numeric\n\
                    @attribute stdDev numeric\n\
                    @attribute activity {walking,running}\n\
                    @data\n";
        let err = parse(text).unwrap_err();
        assert!(matches!(err, StoreError::Format { line: 6, .. }));
    }

    #[test]
    fn test_parse_rejects_bad_rows() {
        let header = to_arff_string(&Dataset::new()).unwrap();
        let header_lines = header.lines().count();

        for row in [
            "1,2,3,walking",
            "1,2,x,4,walking",
            "1,?,3,4,walking",
            "1,2,3,4,swimming",
            "{0 1.0}",
        ] {
            let text = format!("{}{}\n", header, row);
            match parse(&text) {
                Err(StoreError::Format { line, .. }) => assert_eq!(line, header_lines + 1, "row {row}"),
                other => panic!("row {row} should fail, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_requires_data_section() {
        assert!(matches!(parse(""), Err(StoreError::Format { .. })));
        assert!(matches!(
            parse("@relation activity\n"),
            Err(StoreError::Format { .. })
        ));
    }

    #[test]
    fn test_store_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArffStore::new(dir.path().join("data.arff"));
        assert!(matches!(store.load(), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_store_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ArffStore::new(dir.path().join("data.arff"));
        let dataset = sample_dataset();

        store.save(&dataset).unwrap();
        assert_eq!(store.load().unwrap(), dataset);

        // save(load()) twice leaves the table unchanged.
        for _ in 0..2 {
            let loaded = store.load().unwrap();
            store.save(&loaded).unwrap();
        }
        assert_eq!(store.load().unwrap(), dataset);
    }

    #[test]
    fn test_store_unavailable_when_directory_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ArffStore::new(dir.path().join("unmounted").join("data.arff"));
        assert!(matches!(
            store.check_available(),
            Err(StoreError::StorageUnavailable { .. })
        ));
        assert!(matches!(
            store.save(&sample_dataset()),
            Err(StoreError::StorageUnavailable { .. })
        ));
    }
}
