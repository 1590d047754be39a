use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::deformation::DeformationOptions;
use crate::error::Result;
use crate::gap_fill::GapPolicy;
use crate::meteo::MeteoOptions;

pub const CONFIG_FILE_NAME: &str = "murtel.toml";
pub const DATA_ROOT_ENV: &str = "MURTEL_DATA_ROOT";

/// Job configuration. Every field defaults to the field workflow's layout, so
/// an empty `murtel.toml` (or none at all) runs the standard jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MurtelConfig {
    pub data_root: PathBuf,
    pub temperature: TemperatureConfig,
    pub displacement: DisplacementConfig,
    pub meteo: MeteoConfig,
}

impl Default for MurtelConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("."),
            temperature: TemperatureConfig::default(),
            displacement: DisplacementConfig::default(),
            meteo: MeteoConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureConfig {
    pub dir: PathBuf,
    pub gap_policy: GapPolicy,
    pub boreholes: Vec<BoreholeConfig>,
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("CORtemp_data"),
            gap_policy: GapPolicy::default(),
            boreholes: vec![
                BoreholeConfig {
                    input: "COR_0287_temp.csv".to_string(),
                    output: "temp_hole_87.csv".to_string(),
                    min_year: Some(1994),
                    max_year: None,
                },
                BoreholeConfig {
                    input: "COR_0315_temp.csv".to_string(),
                    output: "temp_hole_15.csv".to_string(),
                    min_year: None,
                    max_year: Some(2023),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoreholeConfig {
    pub input: String,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplacementConfig {
    pub dir: PathBuf,
    /// Export periods in chronological order. When empty, files matching
    /// `pattern` are used in name order.
    pub periods: Vec<String>,
    pub pattern: String,
    pub total_output: String,
    /// Component files are written as `<prefix>_x1.csv` etc.
    pub component_prefix: String,
    pub write_components: bool,
    pub mean_depths_output: String,
    pub options: DeformationOptions,
}

impl Default for DisplacementConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("SAA_data"),
            periods: vec![
                "multi_saa_allcart_16_17.csv".to_string(),
                "multi_saa_allcart_17_18.csv".to_string(),
                "multi_saa_allcart_18_23.csv".to_string(),
            ],
            pattern: "multi_saa_allcart_*.csv".to_string(),
            total_output: "SAA_16_24_tot.csv".to_string(),
            component_prefix: "SAA_16_24".to_string(),
            write_components: true,
            mean_depths_output: "SAA_mean_depths.csv".to_string(),
            options: DeformationOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeteoConfig {
    pub dir: PathBuf,
    pub permos_hourly: String,
    pub corvatsch87: String,
    pub perma_xt_cr6: String,
    pub perma_xt_export: String,
    pub piz_precip: String,
    pub piz_temp: String,
    pub permos_output: String,
    pub perma_xt_output: String,
    pub perma_xt_cr6_output: String,
    pub precip_output: String,
    pub temp_output: String,
    pub options: MeteoOptions,
}

impl Default for MeteoConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("Meteo_data"),
            permos_hourly: "murtel_level_2_hourly.csv".to_string(),
            corvatsch87: "Corvatsch87_met.csv".to_string(),
            perma_xt_cr6: "MetCR6__L2.csv".to_string(),
            perma_xt_export: "permaxt_data_dom.csv".to_string(),
            piz_precip: "corvatsch_precip.txt".to_string(),
            piz_temp: "corvatsch_temp.txt".to_string(),
            permos_output: "daily_means_permos.csv".to_string(),
            perma_xt_output: "daily_means_perma_xt.csv".to_string(),
            perma_xt_cr6_output: "daily_means_perma_xt_cr6.csv".to_string(),
            precip_output: "corvatsch_precip.csv".to_string(),
            temp_output: "corvatsch_temp.csv".to_string(),
            options: MeteoOptions::default(),
        }
    }
}

impl MurtelConfig {
    /// Reads `path`, or `murtel.toml` in the working directory when no path
    /// is given and the file exists, then applies `MURTEL_DATA_ROOT`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_str(&fs::read_to_string(path)?)?,
            None => {
                let default_path = Path::new(CONFIG_FILE_NAME);
                if default_path.is_file() {
                    Self::from_toml_str(&fs::read_to_string(default_path)?)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn apply_env(&mut self) {
        if let Ok(root) = env::var(DATA_ROOT_ENV) {
            if !root.trim().is_empty() {
                debug!(root = %root, "data root taken from {DATA_ROOT_ENV}");
                self.data_root = PathBuf::from(root);
            }
        }
    }

    pub fn with_data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.data_root = root.into();
        self
    }

    pub fn temperature_dir(&self) -> PathBuf {
        self.data_root.join(&self.temperature.dir)
    }

    pub fn displacement_dir(&self) -> PathBuf {
        self.data_root.join(&self.displacement.dir)
    }

    pub fn meteo_dir(&self) -> PathBuf {
        self.data_root.join(&self.meteo.dir)
    }
}

/// `NaiveDateTime` as `YYYY-MM-DD HH:MM:SS`; the ISO `T` separator is
/// accepted on input.
pub(crate) mod datetime_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(
        value: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
        let raw = raw.trim();
        NaiveDateTime::parse_from_str(raw, FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
    }
}

pub(crate) mod optional_datetime_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::datetime_format::{parse, FORMAT};

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_str(&value.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| parse(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}
