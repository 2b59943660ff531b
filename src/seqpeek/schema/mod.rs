//! Serde data model for SeqPeek input data and configuration.

pub mod config;
pub mod data;

pub use config::{Config, FieldNames, MutationLayout};
pub use data::{
    ColorByInput, DataPoint, Protein, TrackInput, TrackLayoutInput, VisualizationData,
};
