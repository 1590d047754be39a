use chrono::{Duration, NaiveDate, NaiveDateTime};
use polars::prelude::*;

use murtel_core::frame::{date_values, datetime_column, float_column, float_values};
use murtel_core::meteo::{
    clean_precipitation, corvatsch87_as_permos, perma_xt_daily, permos_daily, MeteoOptions,
};

fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn hourly(start: NaiveDateTime, hours: usize) -> Vec<Option<NaiveDateTime>> {
    (0..hours)
        .map(|hour| Some(start + Duration::hours(hour as i64)))
        .collect()
}

fn constant(value: f64, len: usize) -> Vec<Option<f64>> {
    vec![Some(value); len]
}

fn permos_frame(start: NaiveDateTime, hours: usize) -> DataFrame {
    DataFrame::new(vec![
        datetime_column("date", &hourly(start, hours)).unwrap(),
        float_column("airtemp", constant(2.0, hours)),
        float_column("surftemp", constant(1.0, hours)),
        float_column("snowh", constant(0.5, hours)),
        float_column("longout", constant(300.0, hours)),
    ])
    .unwrap()
}

fn corvatsch87_frame(start: NaiveDateTime, hours: usize) -> DataFrame {
    DataFrame::new(vec![
        datetime_column("date", &hourly(start, hours)).unwrap(),
        float_column("airtemp", constant(-1.0, hours)),
        float_column("RH", constant(80.0, hours)),
        float_column("LWRdown", constant(310.0, hours)),
        float_column("snowh", constant(50.0, hours)),
        float_column("surftemp", constant(0.5, hours)),
    ])
    .unwrap()
}

#[test]
fn corvatsch87_is_mapped_onto_the_permos_layout() {
    let mapped = corvatsch87_as_permos(corvatsch87_frame(at(2019, 10, 1, 0), 2)).unwrap();
    assert_eq!(
        mapped.get_column_names(),
        ["date", "airtemp", "surftemp", "snowh", "longout"]
    );
    assert_eq!(
        float_values(&mapped, "snowh").unwrap(),
        vec![Some(0.5), Some(0.5)]
    );
    assert_eq!(
        float_values(&mapped, "longout").unwrap(),
        vec![Some(310.0), Some(310.0)]
    );
}

#[test]
fn permos_record_is_merged_cut_and_gap_restored() {
    let options = MeteoOptions {
        permos_gap_start: NaiveDate::from_ymd_opt(2019, 4, 1).unwrap(),
        permos_gap_end: NaiveDate::from_ymd_opt(2019, 4, 2).unwrap(),
        ..MeteoOptions::default()
    };
    let permos = permos_frame(at(2019, 3, 31, 0), 24);
    // two days straddling the cutoff at 2023-09-20 00:00
    let recent = corvatsch87_frame(at(2023, 9, 19, 0), 48);

    let daily = permos_daily(permos, recent, &options).unwrap();

    assert_eq!(
        daily.get_column_names(),
        ["date", "airtemp", "surftemp", "snowh", "longout"]
    );
    let days: Vec<NaiveDate> = date_values(&daily, "date")
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(
        days,
        vec![
            NaiveDate::from_ymd_opt(2019, 3, 31).unwrap(),
            NaiveDate::from_ymd_opt(2019, 4, 1).unwrap(),
            NaiveDate::from_ymd_opt(2019, 4, 2).unwrap(),
            NaiveDate::from_ymd_opt(2023, 9, 19).unwrap(),
        ]
    );
    assert_eq!(
        float_values(&daily, "airtemp").unwrap(),
        vec![Some(2.0), None, None, Some(-1.0)]
    );
    assert_eq!(
        float_values(&daily, "snowh").unwrap(),
        vec![Some(0.5), None, None, Some(0.5)]
    );
}

#[test]
fn perma_xt_daily_means_carry_precipitation_totals() {
    let hours = 48;
    let pluvio: Vec<Option<f64>> = (0..hours)
        .map(|hour| if hour < 24 { Some(0.25) } else { None })
        .collect();
    let df = DataFrame::new(vec![
        datetime_column("date", &hourly(at(2024, 1, 1, 0), hours)).unwrap(),
        float_column("AirT", constant(-8.0, hours)),
        float_column("Pluvio", pluvio),
    ])
    .unwrap();

    let daily = perma_xt_daily(&df, &MeteoOptions::default()).unwrap();

    assert_eq!(
        daily.get_column_names(),
        ["date", "AirT", "Pluvio", "Pluvio_sum"]
    );
    assert_eq!(
        float_values(&daily, "Pluvio_sum").unwrap(),
        vec![Some(6.0), Some(0.0)]
    );
    assert_eq!(
        float_values(&daily, "Pluvio").unwrap(),
        vec![Some(0.25), None]
    );
}

#[test]
fn implausible_precipitation_is_removed() {
    let days = vec![
        Some(at(2020, 1, 1, 0)),
        Some(at(2020, 1, 2, 0)),
        Some(at(2020, 1, 3, 0)),
        Some(at(2020, 1, 4, 0)),
    ];
    let df = DataFrame::new(vec![
        datetime_column("date", &days).unwrap(),
        float_column("precip", vec![Some(2.4), Some(750.0), None, Some(500.0)]),
    ])
    .unwrap();

    let cleaned = clean_precipitation(df, "precip", 500.0).unwrap();
    assert_eq!(
        float_values(&cleaned, "precip").unwrap(),
        vec![Some(2.4), Some(500.0)]
    );
}
