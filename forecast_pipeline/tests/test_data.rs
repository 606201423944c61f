use forecast_pipeline::data::{ColumnData, DataLoader, TimeSeriesFrame};
use forecast_pipeline::utils::parse_timestamp;
use forecast_pipeline::{ForecastError, ForecastSeries};
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_csv(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

#[test]
fn test_data_loader_from_csv() {
    // Rows out of order on purpose
    let file = write_csv(&[
        "WeekStarting,Store,Brand,Quantity,Advert,Price,Revenue",
        "1990-06-21,1000,dominicks,11712,1,2.4,28108.8",
        "1990-06-14,1000,dominicks,10560,1,2.1,22176.0",
        "1990-06-28,1000,dominicks,,0,2.6,",
    ]);

    let frame = DataLoader::from_csv(file.path(), "WeekStarting").unwrap();

    assert_eq!(frame.len(), 3);
    assert_eq!(frame.time_column(), "WeekStarting");
    assert_eq!(
        frame.index(),
        &[
            parse_timestamp("1990-06-14").unwrap(),
            parse_timestamp("1990-06-21").unwrap(),
            parse_timestamp("1990-06-28").unwrap(),
        ]
    );
    assert_eq!(
        frame.column_names(),
        vec!["Store", "Brand", "Quantity", "Advert", "Price", "Revenue"]
    );
    assert_eq!(
        frame.numeric("Quantity").unwrap(),
        &[Some(10560.0), Some(11712.0), None]
    );
    assert!(matches!(
        frame.column("Brand").unwrap().data(),
        ColumnData::Text(_)
    ));
    assert_eq!(frame.non_numeric_columns(), vec!["Brand".to_string()]);
    assert_eq!(frame.dataframe().width(), 7);
    assert!(!frame.has_column("WeekStarting"));
}

#[test]
fn test_data_loader_missing_time_column() {
    let file = write_csv(&["Date,Quantity", "2020-01-01,1"]);

    assert!(matches!(
        DataLoader::from_csv(file.path(), "WeekStarting"),
        Err(ForecastError::ConfigurationError(_))
    ));
}

#[test]
fn test_data_loader_rejects_duplicate_timestamps() {
    let file = write_csv(&["Date,Quantity", "2020-01-01,1", "2020-01-01,2"]);

    assert!(matches!(
        DataLoader::from_csv(file.path(), "Date"),
        Err(ForecastError::DataError(_))
    ));
}

#[test]
fn test_data_loader_error_handling() {
    assert!(matches!(
        DataLoader::from_csv("nonexistent_file.csv", "Date"),
        Err(ForecastError::IoError(_))
    ));

    let file = write_csv(&["Date,Quantity", "yesterday,1"]);
    assert!(DataLoader::from_csv(file.path(), "Date").is_err());
}

#[test]
fn test_frame_operations() {
    let index = ["2023-01-01", "2023-01-02", "2023-01-03", "2023-01-04"]
        .iter()
        .map(|s| parse_timestamp(s).unwrap())
        .collect::<Vec<_>>();
    let frame = TimeSeriesFrame::from_numeric(
        "date",
        index.clone(),
        vec![("y", vec![1.0, 2.0, 3.0, 4.0]), ("x", vec![0.5, 0.5, 0.5, 0.5])],
    )
    .unwrap();

    assert_eq!(frame.head(2).index(), &index[..2]);
    assert_eq!(frame.tail(1).index(), &index[3..]);
    assert_eq!(frame.rows_from(index[2]).len(), 2);
    assert_eq!(frame.position(index[1]), Some(1));

    let selected = frame.select(&["x", "y"]).unwrap();
    assert_eq!(selected.column_names(), vec!["x", "y"]);
    assert!(matches!(
        frame.select(&["z"]),
        Err(ForecastError::ColumnMismatchError { .. })
    ));

    let mut edited = frame.clone();
    edited.set_numeric("y", 3, None).unwrap();
    assert_eq!(edited.drop_missing_rows().unwrap().len(), 3);
    assert!(edited.set_numeric("y", 4, Some(1.0)).is_err());

    let series = ForecastSeries::from_frame_column(&frame, "y").unwrap();
    assert_eq!(series.get(index[2]), Some(3.0));
    assert_eq!(series.len(), 4);
}

#[test]
fn test_frame_serialization() {
    let index = vec![parse_timestamp("2023-01-01").unwrap()];
    let frame = TimeSeriesFrame::from_numeric("date", index, vec![("y", vec![0.1])]).unwrap();

    let json = serde_json::to_string(&frame).unwrap();
    let restored: TimeSeriesFrame = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, frame);
}
