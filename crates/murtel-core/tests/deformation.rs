use chrono::{Duration, NaiveDate, NaiveDateTime};
use murtel_parser::{NodeMatrix, SaaRecord};
use polars::prelude::DataFrame;

use murtel_core::deformation::{
    clip_one_year, concat_periods, default_reference_time, mean_depths, reduce_deformation,
    reference_index, relative_components, resample_daily_last, rolling_mean_centered,
    total_horizontal, DeformationOptions,
};
use murtel_core::frame::{date_values, datetime_column, datetime_values, float_column, float_values};
use murtel_core::PipelineError;

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

/// Two nodes sampled every 8 hours from the default reference time. Node 0
/// moves 3 mm east and 4 mm north per sample, node 1 stays put.
fn record(samples: usize) -> SaaRecord {
    let start = default_reference_time();
    let time: Vec<NaiveDateTime> = (0..samples)
        .map(|idx| start + Duration::hours(8 * idx as i64))
        .collect();
    let moving = |step: f64| (0..samples).map(|idx| Some(step * idx as f64)).collect();
    let still = |value: f64| vec![Some(value); samples];

    SaaRecord {
        file_hash: String::new(),
        time,
        x: NodeMatrix::new(vec![moving(3.0), still(1.0)]),
        y: NodeMatrix::new(vec![moving(4.0), still(2.0)]),
        z: NodeMatrix::new(vec![still(-45.0), still(-47.5)]),
        temperature: None,
    }
}

#[test]
fn reference_time_must_match_exactly() {
    let record = record(4);
    assert_eq!(
        reference_index(&record.time, at(2016, 1, 6, 20, 5)).unwrap(),
        1
    );

    let missing = at(2016, 1, 6, 12, 6);
    let err = relative_components(&record, missing).unwrap_err();
    assert!(matches!(err, PipelineError::ReferenceTimeNotFound(time) if time == missing));
}

#[test]
fn components_are_relative_to_the_reference_sample() {
    let record = record(4);
    let components = relative_components(&record, at(2016, 1, 6, 20, 5)).unwrap();

    assert_eq!(
        components.x1.node(0).unwrap(),
        &[Some(-3.0), Some(0.0), Some(3.0), Some(6.0)]
    );
    assert_eq!(components.y1.node(1).unwrap(), &[Some(0.0); 4]);
    assert_eq!(components.z1.node(0).unwrap(), &[Some(0.0); 4]);
}

#[test]
fn total_is_the_horizontal_magnitude() {
    let record = record(3);
    let total = total_horizontal(&record, default_reference_time()).unwrap();
    assert_eq!(total.node(0).unwrap(), &[Some(0.0), Some(5.0), Some(10.0)]);
    assert_eq!(total.node(1).unwrap(), &[Some(0.0); 3]);
}

#[test]
fn centered_rolling_mean_shrinks_at_the_edges() {
    let values = [Some(1.0), Some(2.0), None, Some(4.0), Some(5.0)];
    assert_eq!(
        rolling_mean_centered(&values, 3, 1),
        vec![Some(1.5), Some(1.5), Some(3.0), Some(4.5), Some(4.5)]
    );

    // even windows reach one further back than forward
    assert_eq!(
        rolling_mean_centered(&[Some(1.0), Some(2.0), Some(3.0)], 2, 1),
        vec![Some(1.0), Some(1.5), Some(2.5)]
    );

    let sparse = [None, None, Some(3.0)];
    assert_eq!(
        rolling_mean_centered(&sparse, 3, 2),
        vec![None, None, None]
    );
}

#[test]
fn daily_resampling_keeps_the_last_value_of_each_day() {
    let times = vec![
        at(2016, 1, 6, 4, 5),
        at(2016, 1, 6, 12, 5),
        at(2016, 1, 6, 20, 5),
        at(2016, 1, 8, 4, 5),
    ];
    let values = NodeMatrix::new(vec![vec![Some(1.0), Some(2.0), None, Some(4.0)]]);

    let daily = resample_daily_last(&times, &values);

    assert_eq!(daily.days.len(), 3);
    assert_eq!(
        daily.time,
        vec![Some(at(2016, 1, 6, 20, 5)), None, Some(at(2016, 1, 8, 4, 5))]
    );
    assert_eq!(daily.values.node(0).unwrap(), &[Some(2.0), None, Some(4.0)]);
}

#[test]
fn periods_concatenate_in_order() {
    let first = record(3);
    let mut second = record(2);
    second.time = vec![at(2016, 1, 7, 12, 5), at(2016, 1, 7, 20, 5)];

    let combined = concat_periods(vec![first, second]).unwrap();
    assert_eq!(combined.len(), 5);
    assert_eq!(combined.x.sample_count(), 5);
    assert_eq!(combined.time[3], at(2016, 1, 7, 12, 5));

    let mut narrow = record(2);
    narrow.x = NodeMatrix::new(vec![vec![Some(0.0); 2]]);
    assert!(matches!(
        concat_periods(vec![record(2), narrow]).unwrap_err(),
        PipelineError::Validation(_)
    ));
    assert!(concat_periods(Vec::new()).is_err());
}

#[test]
fn mean_depths_are_absolute() {
    let z = NodeMatrix::new(vec![
        vec![Some(-45.0), Some(-45.5), None],
        vec![None, None, None],
    ]);
    assert_eq!(mean_depths(&z), vec![Some(45.25), None]);
}

#[test]
fn default_reduction_produces_daily_smoothed_totals() {
    // three 8-hour samples per day for four days
    let record = record(12);
    let output = reduce_deformation(&record, &DeformationOptions::default()).unwrap();

    let total = &output.total;
    assert_eq!(total.get_column_names(), ["date", "0", "1", "time"]);
    assert_eq!(total.height(), 5);

    let days = date_values(total, "date").unwrap();
    assert_eq!(days[0], NaiveDate::from_ymd_opt(2016, 1, 6));

    // node 1 never moves
    assert!(float_values(total, "1")
        .unwrap()
        .iter()
        .all(|value| *value == Some(0.0)));

    // the window spans the whole record, so the middle days share one mean
    let node0: Vec<f64> = float_values(total, "0").unwrap().into_iter().flatten().collect();
    assert_eq!(node0.len(), 5);
    assert!(node0.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!((node0[1] - 27.5).abs() < 1e-9);
    assert!((node0[2] - 27.5).abs() < 1e-9);

    let times = datetime_values(total, "time").unwrap();
    assert_eq!(times[0], Some(at(2016, 1, 6, 20, 5)));

    let axes: Vec<String> = output
        .components
        .iter()
        .map(|(axis, _)| axis.to_string())
        .collect();
    assert_eq!(axes, ["x", "y", "z"]);
    assert_eq!(output.components[0].1.height(), 12);
}

#[test]
fn raw_reduction_clips_to_one_year_and_window() {
    let record = record(12);
    let options = DeformationOptions {
        smooth: false,
        daily: false,
        one_year: true,
        clip_after: Some(at(2016, 1, 7, 0, 0)),
        clip_before: Some(at(2016, 1, 8, 0, 0)),
        ..DeformationOptions::default()
    };

    let output = reduce_deformation(&record, &options).unwrap();

    assert_eq!(output.total.get_column_names(), ["0", "1", "time"]);
    assert_eq!(output.total.height(), 3);
    assert_eq!(
        float_values(&output.total, "0").unwrap(),
        vec![Some(10.0), Some(15.0), Some(20.0)]
    );
    for (_, frame) in &output.components {
        assert_eq!(frame.height(), 3);
    }
}

fn timed_frame(times: &[NaiveDateTime]) -> DataFrame {
    let times: Vec<Option<NaiveDateTime>> = times.iter().copied().map(Some).collect();
    let values = (0..times.len()).map(|idx| Some(idx as f64)).collect();
    DataFrame::new(vec![
        float_column("0", values),
        datetime_column("time", &times).unwrap(),
    ])
    .unwrap()
}

#[test]
fn one_year_clip_excludes_the_anniversary() {
    let start = default_reference_time();
    let anniversary = at(2017, 1, 6, 12, 5);
    let df = timed_frame(&[
        start - Duration::seconds(1),
        start,
        anniversary - Duration::seconds(1),
        anniversary,
    ]);

    let clipped = clip_one_year(df, start).unwrap();

    assert_eq!(
        datetime_values(&clipped, "time").unwrap(),
        vec![Some(start), Some(anniversary - Duration::seconds(1))]
    );
    assert_eq!(
        float_values(&clipped, "0").unwrap(),
        vec![Some(1.0), Some(2.0)]
    );
}

#[test]
fn one_year_clip_from_leap_day_ends_on_february_28() {
    let start = at(2016, 2, 29, 0, 0);
    let end = at(2017, 2, 28, 0, 0);
    let df = timed_frame(&[
        start,
        end - Duration::seconds(1),
        end,
        at(2017, 3, 1, 0, 0),
    ]);

    let clipped = clip_one_year(df, start).unwrap();

    assert_eq!(
        datetime_values(&clipped, "time").unwrap(),
        vec![Some(start), Some(end - Duration::seconds(1))]
    );
}
