use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
    error::AppResult,
    report::{Series, format_value},
};

/// Writes `<dir>/<slug>.csv` with a `label,value` header.
pub fn write_csv(dir: &Path, series: &Series) -> AppResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.csv", series.slug));

    let mut wtr = csv::Writer::from_path(&path)?;
    wtr.write_record(["label", "value"])?;
    for (label, value) in series.rows() {
        wtr.write_record([label, format_value(value).as_str()])?;
    }
    wtr.flush()?;

    debug!(path = %path.display(), rows = series.labels.len(), "wrote csv");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::rating_histogram;

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let series = rating_histogram(&[7.5, 7.1, 3.0]);

        let path = write_csv(dir.path(), &series).unwrap();
        assert_eq!(path.file_name().unwrap(), "omdb_rating_histogram.csv");

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        assert_eq!(rdr.headers().unwrap().iter().collect::<Vec<_>>(), vec!["label", "value"]);
        let records: Vec<csv::StringRecord> = rdr.records().map(Result::unwrap).collect();
        assert_eq!(records.len(), 10);
        assert_eq!(&records[7][0], "7-8");
        assert_eq!(&records[7][1], "2");
    }

    #[test]
    fn labels_with_commas_are_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let mut series = rating_histogram(&[1.0]);
        series.labels[0] = "Love, Actually".to_string();

        let path = write_csv(dir.path(), &series).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("\"Love, Actually\",0\n"));
    }

    #[test]
    fn large_values_are_written_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let mut series = rating_histogram(&[1.0]);
        series.slug = "box_office_top";
        series.labels = vec!["#1 Inside Out 2".to_string()];
        series.values = vec![1_698_863_816.0];
        series.chart_scale = 1_000_000.0;

        let path = write_csv(dir.path(), &series).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(text, "label,value\n#1 Inside Out 2,1698863816\n");
    }

    #[test]
    fn creates_missing_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("reports").join("today");
        write_csv(&nested, &rating_histogram(&[])).unwrap();
        assert!(nested.join("omdb_rating_histogram.csv").exists());
    }
}
