mod borehole;
mod common;
mod corvatsch87;
mod meteoswiss;
mod perma_xt;
mod permos;
mod saa;

pub use borehole::BoreholeTemperatureParser;
pub use corvatsch87::{Corvatsch87Parser, CORVATSCH87_COLUMNS};
pub use meteoswiss::MeteoSwissParser;
pub use perma_xt::{PermaXtCr6Parser, PermaXtExportParser, PERMA_XT_CR6_COLUMNS};
pub use permos::{PermosHourlyParser, PERMOS_COLUMNS};
pub use saa::{saa_epoch, SaaCartesianParser, SAA_DEPTH_OFFSET_M};
