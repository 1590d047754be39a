use crate::errors::{ParserAttempt, ParserError};
use crate::formats::{
    BoreholeTemperatureParser, Corvatsch87Parser, MeteoSwissParser, PermaXtCr6Parser,
    PermaXtExportParser, PermosHourlyParser,
};
use crate::model::ParsedTable;

pub trait TableParser {
    fn name(&self) -> &'static str;
    fn parse(&self, content: &str) -> Result<ParsedTable, ParserError>;
}

/// Tries every meteorological station reader in turn.
pub fn parse_meteo_file(content: &str) -> Result<ParsedTable, ParserError> {
    let meteo = meteo_parsers();
    let parsers: Vec<&dyn TableParser> = meteo.iter().map(|parser| parser.as_ref()).collect();
    parse_with_parsers(content, &parsers)
}

/// Borehole temperature logs first, then the station readers.
pub fn detect_table(content: &str) -> Result<ParsedTable, ParserError> {
    let borehole = BoreholeTemperatureParser;
    let meteo = meteo_parsers();
    let mut parsers: Vec<&dyn TableParser> = vec![&borehole];
    parsers.extend(meteo.iter().map(|parser| parser.as_ref()));
    parse_with_parsers(content, &parsers)
}

fn meteo_parsers() -> Vec<Box<dyn TableParser>> {
    vec![
        Box::new(PermosHourlyParser),
        Box::new(PermaXtExportParser),
        Box::new(Corvatsch87Parser),
        Box::new(PermaXtCr6Parser),
        Box::new(MeteoSwissParser::default()),
    ]
}

pub fn parse_with_parsers(
    content: &str,
    parsers: &[&dyn TableParser],
) -> Result<ParsedTable, ParserError> {
    let mut attempts = Vec::new();

    for parser in parsers {
        match parser.parse(content) {
            Ok(parsed) => return Ok(parsed),
            Err(ParserError::FormatMismatch { reason, .. }) => {
                attempts.push(ParserAttempt::new(parser.name(), reason));
            }
            Err(err) => return Err(err),
        }
    }

    Err(ParserError::NoMatchingParser { attempts })
}
