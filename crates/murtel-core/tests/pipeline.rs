use std::fs;
use std::path::{Path, PathBuf};

use murtel_core::{inspect_file, run_all, run_job, Job, MurtelConfig, PipelineError};
use murtel_parser::formats::{BoreholeTemperatureParser, MeteoSwissParser};
use tempfile::TempDir;

fn parser_fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../murtel-parser/tests/data")
        .join(name)
}

fn copy_fixture(name: &str, dest: &Path) {
    fs::create_dir_all(dest.parent().unwrap()).unwrap();
    fs::copy(parser_fixture(name), dest)
        .unwrap_or_else(|err| panic!("failed to copy fixture {name}: {err}"));
}

/// Second SAA period continuing the fixture export by one day.
const SAA_SECOND_PERIOD: &str = "\
ms,x_0,x_1,y_0,y_1,z_0,z_1,tempc_0,tempc_1
1136635500000,2.0,2.5,1.0,1.5,-5006,-10003,-0.4,-0.3
1136664300000,2.5,3.0,1.5,2.0,-5008,-10004,-0.4,-0.3
1136693100000,3.0,3.0,2.0,2.0,-5010,-10005,-0.4,-0.3
";

fn staged_data_root() -> TempDir {
    let root = tempfile::tempdir().unwrap();
    let base = root.path();

    copy_fixture("COR_0287_temp.csv", &base.join("CORtemp_data/COR_0287_temp.csv"));
    copy_fixture("COR_0287_temp.csv", &base.join("CORtemp_data/COR_0315_temp.csv"));

    copy_fixture(
        "saa_cartesian.csv",
        &base.join("SAA_data/multi_saa_allcart_16_17.csv"),
    );
    fs::write(
        base.join("SAA_data/multi_saa_allcart_17_18.csv"),
        SAA_SECOND_PERIOD,
    )
    .unwrap();

    for name in [
        "murtel_level_2_hourly.csv",
        "Corvatsch87_met.csv",
        "MetCR6__L2.csv",
        "permaxt_data_dom.csv",
        "corvatsch_precip.txt",
        "corvatsch_temp.txt",
    ] {
        copy_fixture(name, &base.join("Meteo_data").join(name));
    }

    root
}

fn config_for(root: &TempDir) -> MurtelConfig {
    let mut config = MurtelConfig::default().with_data_root(root.path());
    config.displacement.periods.clear();
    config.meteo.options.min_samples_per_day = 1;
    config
}

#[test]
fn temperature_job_fills_and_clips_both_boreholes() {
    let root = staged_data_root();
    let outputs = run_job(Job::Temperature, &config_for(&root)).unwrap();

    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[0].rows, 2);
    assert_eq!(outputs[1].rows, 4);
    assert_eq!(outputs[0].columns, 6);

    let written = fs::read_to_string(root.path().join("CORtemp_data/temp_hole_87.csv")).unwrap();
    let mut lines = written.lines();
    assert_eq!(lines.next(), Some("time,0.5,2.5,4.55,10.0,hydro_year"));
    let first = lines.next().unwrap();
    assert!(first.starts_with("1994-01-01 00:00:00,-1.4,"), "{first}");
    assert!(first.ends_with(",1993"), "{first}");
}

#[test]
fn displacement_job_globs_periods_and_writes_every_product() {
    let root = staged_data_root();
    let outputs = run_job(Job::Displacement, &config_for(&root)).unwrap();

    let names: Vec<String> = outputs
        .iter()
        .map(|summary| {
            summary
                .path
                .file_name()
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    assert_eq!(
        names,
        [
            "SAA_16_24_tot.csv",
            "SAA_16_24_x1.csv",
            "SAA_16_24_y1.csv",
            "SAA_16_24_z1.csv",
            "SAA_mean_depths.csv",
        ]
    );

    // six 8-hourly samples over three days
    assert_eq!(outputs[0].rows, 3);
    assert_eq!(outputs[1].rows, 6);
    assert_eq!(outputs[4].rows, 2);

    let total = fs::read_to_string(root.path().join("SAA_data/SAA_16_24_tot.csv")).unwrap();
    assert_eq!(total.lines().next(), Some("date,0,1,time"));
    assert!(total.lines().nth(1).unwrap().starts_with("2016-01-06,"));

    let depths = fs::read_to_string(root.path().join("SAA_data/SAA_mean_depths.csv")).unwrap();
    let mut lines = depths.lines();
    assert_eq!(lines.next(), Some("node,depth_m"));
    let (node, depth) = lines.next().unwrap().split_once(',').unwrap();
    assert_eq!(node, "0");
    assert!((depth.parse::<f64>().unwrap() - 45.008).abs() < 1e-9);
}

#[test]
fn displacement_job_requires_the_reference_sample() {
    let root = staged_data_root();
    let mut config = config_for(&root);
    config.displacement.options.start = chrono::NaiveDate::from_ymd_opt(2016, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();

    let err = run_job(Job::Displacement, &config).unwrap_err();
    assert!(matches!(err, PipelineError::ReferenceTimeNotFound(_)));
}

#[test]
fn meteo_job_writes_all_station_products() {
    let root = staged_data_root();
    let outputs = run_job(Job::Meteo, &config_for(&root)).unwrap();

    assert_eq!(outputs.len(), 5);
    // two observed days plus 2019-04-01..=2019-09-30
    assert_eq!(outputs[0].rows, 185);
    assert_eq!(outputs[1].rows, 1);
    assert_eq!(outputs[2].rows, 1);
    // the 750 mm reading is dropped
    assert_eq!(outputs[3].rows, 2);
    assert_eq!(outputs[4].rows, 3);

    let perma_xt =
        fs::read_to_string(root.path().join("Meteo_data/daily_means_perma_xt.csv")).unwrap();
    let mut lines = perma_xt.lines();
    assert_eq!(lines.next(), Some("date,AirT,Pluvio,Station,Pluvio_sum"));
    let fields: Vec<&str> = lines.next().unwrap().split(',').collect();
    assert_eq!(fields.len(), 5);
    assert_eq!(fields[0], "2024-01-01");
    // the station code is text and averages to nothing
    assert_eq!(fields[3], "");
    assert!((fields[4].parse::<f64>().unwrap() - 0.6).abs() < 1e-9);

    let temp = fs::read_to_string(root.path().join("Meteo_data/corvatsch_temp.csv")).unwrap();
    assert_eq!(temp.lines().next(), Some("date,JAHR,MO,TG,temp"));
}

#[test]
fn run_all_chains_every_job() {
    let root = staged_data_root();
    let outputs = run_all(&config_for(&root)).unwrap();
    assert_eq!(outputs.len(), 2 + 5 + 5);
    assert!(outputs.iter().all(|summary| summary.path.is_file()));
}

#[test]
fn missing_inputs_surface_as_parser_io_errors() {
    let root = tempfile::tempdir().unwrap();
    let config = MurtelConfig::default().with_data_root(root.path());
    let err = run_job(Job::Temperature, &config).unwrap_err();
    assert!(matches!(err, PipelineError::Parser(_)));
}

#[test]
fn inspect_detects_formats() {
    let borehole = inspect_file(&parser_fixture("COR_0287_temp.csv")).unwrap();
    assert_eq!(borehole.format, BoreholeTemperatureParser::NAME);
    assert_eq!(borehole.rows, 4);

    let temp = inspect_file(&parser_fixture("corvatsch_temp.txt")).unwrap();
    assert_eq!(temp.format, MeteoSwissParser::NAME);
    assert!(temp.latin1);
    assert_eq!(temp.station.as_deref(), Some("COV"));
}
