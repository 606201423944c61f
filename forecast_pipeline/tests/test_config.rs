use forecast_pipeline::{
    AnyRegressor, CalendarFeature, EstimatorConfig, ForecastError, PipelineConfig, TransformStep,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_defaults_from_minimal_json() {
    let config =
        PipelineConfig::from_json_str(r#"{"target_column": "Quantity", "time_column": "WeekStarting"}"#)
            .unwrap();

    assert_eq!(config, PipelineConfig::new("Quantity", "WeekStarting"));
    assert_eq!(config.lag_orders, vec![1, 2, 3, 4]);
    assert_eq!(config.calendar_feature, CalendarFeature::WeekOfYear);
    assert_eq!(
        config.estimator,
        EstimatorConfig::LinearRegression { fit_intercept: true }
    );
}

#[test]
fn test_full_config_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "target_column": "Quantity",
            "time_column": "WeekStarting",
            "drop_columns": ["Revenue", "Store", "Brand"],
            "lag_orders": [1, 52],
            "calendar_feature": "month",
            "estimator": {{"kind": "ridge", "alpha": 0.1}}
        }}"#
    )
    .unwrap();

    let config = PipelineConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.drop_columns, vec!["Revenue", "Store", "Brand"]);
    assert_eq!(
        config.estimator,
        EstimatorConfig::Ridge {
            alpha: 0.1,
            fit_intercept: true
        }
    );

    let forecaster = config.build_forecaster().unwrap();
    assert!(matches!(forecaster.estimator().regressor(), AnyRegressor::Ridge(_)));
    match &forecaster.steps()[2].step {
        TransformStep::Lagger(lagger) => assert_eq!(lagger.lag_orders(), &[1, 52]),
        other => panic!("expected lagger, got {:?}", other),
    }
    assert!(!forecaster.is_fitted());
}

#[rstest]
#[case(r#"{"target_column": "", "time_column": "t"}"#)]
#[case(r#"{"target_column": "t", "time_column": "t"}"#)]
#[case(r#"{"target_column": "y", "time_column": "t", "lag_orders": []}"#)]
#[case(r#"{"target_column": "y", "time_column": "t", "lag_orders": [0, 1]}"#)]
#[case(r#"{"target_column": "y", "time_column": "t", "lag_orders": [2, 2]}"#)]
#[case(r#"{"target_column": "y", "time_column": "t", "drop_columns": ["y"]}"#)]
#[case(r#"{"target_column": "y", "time_column": "t", "estimator": {"kind": "ridge", "alpha": -1.0}}"#)]
fn test_invalid_configs(#[case] json: &str) {
    assert!(PipelineConfig::from_json_str(json).is_err());
}

#[test]
fn test_unknown_estimator_kind() {
    let result = PipelineConfig::from_json_str(
        r#"{"target_column": "y", "time_column": "t", "estimator": {"kind": "forest"}}"#,
    );
    assert!(matches!(result, Err(ForecastError::JsonError(_))));
}
