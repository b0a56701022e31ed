use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("failed to read config file")]
    ReadFile,
    #[display("failed to parse config: {reason}")]
    Parse { reason: String },
    #[display("invalid config: {field}")]
    Validation { field: String },
}

#[derive(Debug, Display, Error)]
pub enum SourceError {
    #[display("request to {source} failed")]
    Request {
        #[error(not(source))]
        source: String,
    },
    #[display("failed to parse response from {source}")]
    ResponseParse {
        #[error(not(source))]
        source: String,
    },
    #[display("no data available for {symbol}")]
    DataUnavailable { symbol: String },
}

#[derive(Debug, Display, Error)]
pub enum SeriesError {
    #[display("series contains no rows")]
    EmptySeries,
    #[display("required field missing: {field}")]
    MissingField { field: &'static str },
}

#[derive(Debug, Display, Error)]
pub enum IndicatorError {
    #[display("invalid parameter: {name}")]
    InvalidParameter { name: String },
}

#[derive(Debug, Display, Error)]
pub enum ExportError {
    #[display("failed to create output file")]
    Create,
    #[display("failed to write row")]
    Write,
}

#[derive(Debug, Display, Error)]
pub enum ChartError {
    #[display("failed to render chart")]
    Render,
}
