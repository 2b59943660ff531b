/// Problems with the configuration or with the configuration-like parts of the input
/// (track type tags, colour-by tags, coordinate getters, records that cannot be placed).
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: f64 },
    #[error("Field name {0} must not be empty")]
    EmptyFieldName(&'static str),
    #[error("Unknown track type {0:?}")]
    UnknownTrackType(String),
    #[error("Unknown color_by type {0:?}")]
    UnknownColorByType(String),
    #[error("color_by type log10naggr requires max_samples")]
    MissingMaxSamples,
    #[error("Invalid coordinate getter {0:?}")]
    InvalidCoordinateGetter(String),
    #[error("Track {track:?}: discarded {count} records without a coordinate on the protein")]
    DiscardedRecords { track: String, count: usize },
    #[error("Duplicate track label {0:?}")]
    DuplicateTrackLabel(String),
}
