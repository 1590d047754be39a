use std::fmt;
use std::path::{Path, PathBuf};

use murtel_parser::formats::{
    BoreholeTemperatureParser, Corvatsch87Parser, MeteoSwissParser, PermaXtCr6Parser,
    PermaXtExportParser, PermosHourlyParser, SaaCartesianParser,
};
use murtel_parser::{detect_table, read_source, ParsedTable, SaaRecord, TableParser};
use serde::Serialize;
use tracing::{info, warn};

use crate::borehole::process_borehole;
use crate::config::MurtelConfig;
use crate::daily::aggregate_to_daily;
use crate::deformation::{concat_periods, mean_depths, mean_depths_frame, reduce_deformation};
use crate::error::{PipelineError, Result};
use crate::meteo::{clean_precipitation, perma_xt_daily, permos_daily};
use crate::output::{write_csv, OutputSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Job {
    Temperature,
    Displacement,
    Meteo,
}

impl Job {
    pub const ALL: [Job; 3] = [Job::Temperature, Job::Displacement, Job::Meteo];

    pub fn code(&self) -> &'static str {
        match self {
            Job::Temperature => "temperature",
            Job::Displacement => "displacement",
            Job::Meteo => "meteo",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Job::Temperature => "Borehole temperature gap filling and year clipping",
            Job::Displacement => "SAA deformation vectors, smoothing and daily resampling",
            Job::Meteo => "Station feeds merged and reduced to daily means",
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

pub fn run_job(job: Job, config: &MurtelConfig) -> Result<Vec<OutputSummary>> {
    info!(job = job.code(), data_root = %config.data_root.display(), "starting job");
    let outputs = match job {
        Job::Temperature => run_temperature(config)?,
        Job::Displacement => run_displacement(config)?,
        Job::Meteo => run_meteo(config)?,
    };
    info!(job = job.code(), outputs = outputs.len(), "job finished");
    Ok(outputs)
}

/// Runs every job in order and stops at the first failure.
pub fn run_all(config: &MurtelConfig) -> Result<Vec<OutputSummary>> {
    let mut outputs = Vec::new();
    for job in Job::ALL {
        outputs.extend(run_job(job, config)?);
    }
    Ok(outputs)
}

fn read_table(path: &Path, parser: &dyn TableParser) -> Result<ParsedTable> {
    let source = read_source(path)?;
    let mut parsed = parser.parse(&source.text)?;
    parsed.file_hash = source.file_hash;
    info!(
        path = %path.display(),
        format = parsed.format,
        file_hash = %parsed.file_hash,
        rows = parsed.df.height(),
        latin1 = source.latin1,
        "parsed input"
    );
    Ok(parsed)
}

pub fn run_temperature(config: &MurtelConfig) -> Result<Vec<OutputSummary>> {
    let dir = config.temperature_dir();
    let mut outputs = Vec::with_capacity(config.temperature.boreholes.len());

    for borehole in &config.temperature.boreholes {
        let parsed = read_table(&dir.join(&borehole.input), &BoreholeTemperatureParser)?;
        let mut processed = process_borehole(
            &parsed.df,
            &config.temperature.gap_policy,
            borehole.min_year,
            borehole.max_year,
        )?;
        outputs.push(write_csv(
            Job::Temperature.code(),
            &mut processed.df,
            &dir.join(&borehole.output),
        )?);
    }

    Ok(outputs)
}

/// Configured period files, or every file matching the pattern in name order.
pub fn displacement_inputs(config: &MurtelConfig) -> Result<Vec<PathBuf>> {
    let dir = config.displacement_dir();
    let settings = &config.displacement;
    if !settings.periods.is_empty() {
        return Ok(settings.periods.iter().map(|name| dir.join(name)).collect());
    }

    let pattern = dir.join(&settings.pattern);
    let mut paths: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(err) => {
                warn!("could not read path from glob pattern: {err}");
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(PipelineError::Validation(format!(
            "no SAA exports match {}",
            pattern.display()
        )));
    }
    Ok(paths)
}

fn read_saa(path: &Path) -> Result<SaaRecord> {
    let source = read_source(path)?;
    let mut record = SaaCartesianParser.parse(&source.text)?;
    record.file_hash = source.file_hash;
    info!(
        path = %path.display(),
        file_hash = %record.file_hash,
        samples = record.len(),
        nodes = record.node_count(),
        "parsed SAA export"
    );
    Ok(record)
}

pub fn run_displacement(config: &MurtelConfig) -> Result<Vec<OutputSummary>> {
    let settings = &config.displacement;
    let dir = config.displacement_dir();
    let job = Job::Displacement.code();

    let periods = displacement_inputs(config)?
        .iter()
        .map(|path| read_saa(path))
        .collect::<Result<Vec<_>>>()?;

    // depths come from the most recent installation period
    let depths = periods
        .last()
        .map(|record| mean_depths(&record.z))
        .unwrap_or_default();
    let combined = concat_periods(periods)?;
    let output = reduce_deformation(&combined, &settings.options)?;

    let mut outputs = Vec::new();
    let mut total = output.total;
    outputs.push(write_csv(job, &mut total, &dir.join(&settings.total_output))?);

    if settings.write_components {
        for (axis, mut frame) in output.components {
            let name = format!("{}_{axis}1.csv", settings.component_prefix);
            outputs.push(write_csv(job, &mut frame, &dir.join(name))?);
        }
    }

    let mut depths_df = mean_depths_frame(&depths)?;
    outputs.push(write_csv(
        job,
        &mut depths_df,
        &dir.join(&settings.mean_depths_output),
    )?);

    Ok(outputs)
}

pub fn run_meteo(config: &MurtelConfig) -> Result<Vec<OutputSummary>> {
    let settings = &config.meteo;
    let options = &settings.options;
    let dir = config.meteo_dir();
    let job = Job::Meteo.code();
    let mut outputs = Vec::new();

    let permos = read_table(&dir.join(&settings.permos_hourly), &PermosHourlyParser)?;
    let corvatsch87 = read_table(&dir.join(&settings.corvatsch87), &Corvatsch87Parser)?;
    let mut permos = permos_daily(permos.df, corvatsch87.df, options)?;
    outputs.push(write_csv(job, &mut permos, &dir.join(&settings.permos_output))?);

    let export = read_table(&dir.join(&settings.perma_xt_export), &PermaXtExportParser)?;
    let mut perma_xt = perma_xt_daily(&export.df, options)?;
    outputs.push(write_csv(job, &mut perma_xt, &dir.join(&settings.perma_xt_output))?);

    let cr6 = read_table(&dir.join(&settings.perma_xt_cr6), &PermaXtCr6Parser)?;
    let mut cr6_daily = aggregate_to_daily(&cr6.df, options.min_samples_per_day)?;
    outputs.push(write_csv(
        job,
        &mut cr6_daily,
        &dir.join(&settings.perma_xt_cr6_output),
    )?);

    let precip = read_table(
        &dir.join(&settings.piz_precip),
        &MeteoSwissParser::with_value_name("precip"),
    )?;
    let mut precip = clean_precipitation(precip.df, "precip", options.precip_ceiling_mm)?;
    outputs.push(write_csv(job, &mut precip, &dir.join(&settings.precip_output))?);

    let temp = read_table(
        &dir.join(&settings.piz_temp),
        &MeteoSwissParser::with_value_name("temp"),
    )?;
    let mut temp = temp.df;
    outputs.push(write_csv(job, &mut temp, &dir.join(&settings.temp_output))?);

    Ok(outputs)
}

/// What an unknown file turned out to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInspection {
    pub path: PathBuf,
    pub format: &'static str,
    pub file_hash: String,
    pub latin1: bool,
    pub station: Option<String>,
    pub rows: usize,
    pub columns: Vec<String>,
}

/// Detects the format of a single tabular input file.
pub fn inspect_file(path: &Path) -> Result<FileInspection> {
    let source = read_source(path)?;
    let parsed = detect_table(&source.text)?;
    Ok(FileInspection {
        path: path.to_path_buf(),
        format: parsed.format,
        file_hash: source.file_hash,
        latin1: source.latin1,
        station: parsed.station,
        rows: parsed.df.height(),
        columns: parsed
            .df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect(),
    })
}
