pub mod errors;
pub mod formats;
pub mod model;
mod registry;
mod source;

pub use errors::{ParserAttempt, ParserError};
pub use model::{Axis, NodeMatrix, ParsedTable, SaaRecord};
pub use registry::{detect_table, parse_meteo_file, parse_with_parsers, TableParser};
pub use source::{decode_text, read_source, SourceText};
