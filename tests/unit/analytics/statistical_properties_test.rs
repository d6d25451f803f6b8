use chrono::{Duration, NaiveDate};

use exec_analytics::services::core::analytics::correlation_analyzer::CorrelationAnalyzer;
use exec_analytics::services::core::analytics::statistics::{
    correlation_p_value, linear_regression, pearson,
};
use exec_analytics::services::core::analytics::trend_analyzer::{
    AnomalyBaseline, TrendAnalyzer, TrendAnalyzerConfig,
};
use exec_analytics::{
    aggregate, analyze_trend, classify, correlate, growth, AggregationLevel, DataSource,
    ErrorKind, MetricCategory, MetricObservation, MetricSeries, MetricUnit, SeriesPoint,
    TrendDirection,
};

// Helper functions for testing

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(offset)
}

fn daily_series(name: &str, values: &[f64]) -> MetricSeries {
    MetricSeries::from_points(
        name,
        values.iter().enumerate().map(|(i, v)| SeriesPoint {
            date: day(i as i64),
            value: *v,
        }),
    )
}

/// Deterministic pseudo-random values so the property loops stay reproducible.
fn lcg_values(seed: u64, count: usize) -> Vec<f64> {
    let mut state = seed;
    (0..count)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((state >> 33) % 10_000) as f64 / 10.0
        })
        .collect()
}

#[test]
fn test_growth_formula_for_positive_baselines() {
    let baselines: [f64; 6] = [0.5, 1.0, 3.0, 120.0, 999.9, 12_345.0];
    let currents: [f64; 7] = [0.0, 0.25, 1.0, 90.0, 150.0, 1_000.0, 20_000.0];

    for previous in baselines {
        for current in currents {
            let expected = ((((current - previous) / previous) * 100.0) * 10.0).round() / 10.0;
            assert_eq!(
                growth(current, previous),
                expected,
                "growth({}, {})",
                current,
                previous
            );
        }
    }

    assert_eq!(growth(1200.0, 1000.0), 20.0);
    assert_eq!(growth(90.0, 120.0), -25.0);
}

#[test]
fn test_growth_with_zero_baseline() {
    assert_eq!(growth(100.0, 0.0), 100.0);
    assert_eq!(growth(0.0, 0.0), 0.0);
    assert_eq!(growth(-5.0, 0.0), -100.0);
}

#[test]
fn test_classification_thresholds() {
    assert_eq!(classify(5.0), TrendDirection::Stable);
    assert_eq!(classify(-5.0), TrendDirection::Stable);
    assert_eq!(classify(5.1), TrendDirection::Increasing);
    assert_eq!(classify(-5.1), TrendDirection::Decreasing);

    let mut g = -20.0;
    while g <= 20.0 {
        let expected = if g > 5.0 {
            TrendDirection::Increasing
        } else if g < -5.0 {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };
        assert_eq!(classify(g), expected, "classify({})", g);
        g += 0.1;
    }
}

#[test]
fn test_correlation_is_symmetric_and_bounded() {
    for seed in 1..=20u64 {
        let a = daily_series("a", &lcg_values(seed, 12));
        let b = daily_series("b", &lcg_values(seed * 7919, 12));

        let ab = correlate(&a, &b).unwrap();
        let ba = correlate(&b, &a).unwrap();

        assert_eq!(ab.coefficient, ba.coefficient, "seed {}", seed);
        assert!((-1.0..=1.0).contains(&ab.coefficient), "seed {}", seed);
        assert!((0.0..=1.0).contains(&ab.significance), "seed {}", seed);
        assert_eq!(ab.sample_size, 12);
    }
}

#[test]
fn test_perfect_correlation_bounds() {
    let a = daily_series("a", &[1.0, 2.0, 3.0, 4.0, 5.0]);
    let up = daily_series("up", &[10.0, 20.0, 30.0, 40.0, 50.0]);
    let down = daily_series("down", &[50.0, 40.0, 30.0, 20.0, 10.0]);

    let positive = correlate(&a, &up).unwrap();
    assert!((positive.coefficient - 1.0).abs() < 1e-12);
    assert_eq!(positive.significance, 0.0);

    let negative = correlate(&a, &down).unwrap();
    assert!((negative.coefficient + 1.0).abs() < 1e-12);
}

#[test]
fn test_correlation_needs_two_aligned_points() {
    let a = daily_series("a", &[1.0]);
    let b = daily_series("b", &[2.0]);
    assert_eq!(correlate(&a, &b).unwrap_err().kind, ErrorKind::InsufficientData);

    let empty = MetricSeries::new("empty");
    assert_eq!(correlate(&empty, &b).unwrap_err().kind, ErrorKind::InsufficientData);
}

#[test]
fn test_two_point_correlation_is_never_significant() {
    let a = daily_series("a", &[1.0, 2.0]);
    let b = daily_series("b", &[3.0, 7.0]);
    let result = correlate(&a, &b).unwrap();
    assert!((result.coefficient - 1.0).abs() < 1e-12);
    assert_eq!(result.significance, 1.0);
}

#[test]
fn test_large_samples_use_normal_approximation() {
    let analyzer = CorrelationAnalyzer::default();
    let xs: Vec<f64> = (0..40).map(|i| i as f64).collect();
    let ys: Vec<f64> = lcg_values(42, 40);

    let result = analyzer.correlate_values(&xs, &ys).unwrap();
    let r = pearson(&xs, &ys).unwrap().unwrap();
    assert_eq!(result.coefficient, r);
    assert_eq!(result.significance, correlation_p_value(r, 40, 30));
}

#[test]
fn test_trend_on_perfect_line() {
    let report = analyze_trend(&[10.0, 20.0, 30.0, 40.0, 50.0]).unwrap();
    assert_eq!(report.direction, TrendDirection::Increasing);
    assert!((report.strength - 1.0).abs() < 1e-9);
    assert!((report.slope - 10.0).abs() < 1e-9);
    assert!((report.intercept - 10.0).abs() < 1e-9);
    assert!(report.anomalies.is_empty());
}

#[test]
fn test_trend_needs_three_points() {
    for values in [vec![], vec![1.0], vec![1.0, 2.0]] {
        let err = analyze_trend(&values).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InsufficientData);
    }
    assert!(analyze_trend(&[1.0, 2.0, 3.0]).is_ok());
}

#[test]
fn test_final_spike_is_the_only_anomaly() {
    let report = analyze_trend(&[100.0, 102.0, 98.0, 101.0, 99.0, 500.0]).unwrap();

    assert_eq!(report.anomalies.len(), 1);
    assert_eq!(report.anomalies[0].index, 5);
    assert!(report.anomalies[0].deviation_score > 2.0);
}

#[test]
fn test_regression_baseline_scores_against_fitted_line() {
    let values = [10.0, 11.0, 12.0, 13.0, 80.0, 15.0, 16.0, 17.0, 18.0, 19.0];
    let fit = linear_regression(&values).unwrap();
    let analyzer = TrendAnalyzer::new(TrendAnalyzerConfig {
        anomaly_baseline: AnomalyBaseline::RegressionFit,
        ..Default::default()
    })
    .unwrap();

    let report = analyzer.analyze(&values).unwrap();
    assert_eq!(report.anomalies.len(), 1);
    assert_eq!(report.anomalies[0].expected, fit.fitted[4]);
}

#[test]
fn test_aggregation_of_nothing_is_zeroed() {
    let outcome = aggregate(
        &[],
        &[MetricCategory::Sales],
        AggregationLevel::Daily,
        day(0),
        day(30),
    )
    .unwrap();

    for summary in [outcome.revenue, outcome.orders, outcome.customers] {
        assert_eq!(summary.total, 0.0);
        assert_eq!(summary.growth, 0.0);
        assert_eq!(summary.trend, TrendDirection::Stable);
    }
    assert_eq!(outcome.source, DataSource::Unavailable);
}

#[test]
fn test_two_day_revenue_scenario() {
    let observations = vec![
        MetricObservation::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            MetricCategory::Sales,
            "total_revenue",
            1000.0,
            MetricUnit::Currency,
            AggregationLevel::Daily,
        ),
        MetricObservation::new(
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            MetricCategory::Sales,
            "total_revenue",
            1200.0,
            MetricUnit::Currency,
            AggregationLevel::Daily,
        ),
    ];

    let outcome = aggregate(
        &observations,
        &[MetricCategory::Sales],
        AggregationLevel::Daily,
        day(0),
        day(1),
    )
    .unwrap();

    assert_eq!(outcome.revenue.total, 2200.0);
    assert_eq!(outcome.revenue.growth, 20.0);
    assert_eq!(outcome.revenue.trend, TrendDirection::Increasing);
}
