//! Configuration of the SeqPeek visualization.
//!
//! All sections carry `#[serde(default)]` so that a partial JSON configuration only needs
//! to list the values that differ from the defaults.

use indexmap::IndexMap;

use crate::err::ConfigError;
use crate::seqpeek::schema::data::ProteinDomain;

/// Whether clusters are computed per track or once across all tracks.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MutationLayout {
    /// Each track packs its own clusters.
    #[default]
    BySubtype,
    /// All tracks share the clusters built from the union of their mutations.
    AllSubtypes,
}

/// Names of the record fields used by the layout.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FieldNames {
    /// Discrete coordinate (amino acid or chromosome position).
    pub coordinate: String,
    /// Sample/source identifier; cleared on merged records.
    pub sample_id: String,
    /// Key used to consolidate records at one coordinate.
    pub mutation_id: String,
    /// Mutation-type classifier ranked by `mutation_order`.
    pub mutation_type: String,
    /// Subtype of the record, ranked by the track order.
    pub subtype: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            coordinate: String::from("location"),
            sample_id: String::from("sample_id"),
            mutation_id: String::from("mutation_id"),
            mutation_type: String::from("mutation_type"),
            subtype: String::from("cancer_subtype"),
        }
    }
}

/// Stem settings.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Stems {
    pub enabled: bool,
    pub height: f64,
    pub stroke_width: f64,
}

impl Default for Stems {
    fn default() -> Self {
        Self {
            enabled: true,
            height: 30.0,
            stroke_width: 1.0,
        }
    }
}

/// Settings of the mutation clusters.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MutationGroups {
    /// Gap between adjacent clusters, in pixels.
    pub padding: f64,
    pub stems: Stems,
}

impl Default for MutationGroups {
    fn default() -> Self {
        Self {
            padding: 5.0,
            stems: Default::default(),
        }
    }
}

/// Horizontal protein scale.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ProteinScale {
    /// Width of the viewport in pixels; the reference scale maps `[0, length]` onto
    /// `[0, width]`.
    pub width: f64,
    /// Vertical padding added below each track in the size computations.
    pub vertical_padding: f64,
}

impl Default for ProteinScale {
    fn default() -> Self {
        Self {
            width: 1000.0,
            vertical_padding: 10.0,
        }
    }
}

/// Field of a protein domain used to place it on its own row.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DomainKey {
    #[default]
    Dbname,
    Id,
    Name,
}

impl DomainKey {
    /// Row key of `domain`.
    pub fn of<'a>(&self, domain: &'a ProteinDomain) -> &'a str {
        match self {
            DomainKey::Dbname => &domain.dbname,
            DomainKey::Id => &domain.id,
            DomainKey::Name => &domain.name,
        }
    }
}

/// Protein domain track.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ProteinDomains {
    /// Space below the domain rows.
    pub padding: f64,
    /// Row key.
    pub key: DomainKey,
}

impl Default for ProteinDomains {
    fn default() -> Self {
        Self {
            padding: 5.0,
            key: DomainKey::Dbname,
        }
    }
}

/// Padding around the whole plot.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PlotPadding {
    pub horizontal_padding: f64,
    pub vertical_padding: f64,
}

impl Default for PlotPadding {
    fn default() -> Self {
        Self {
            horizontal_padding: 10.0,
            vertical_padding: 10.0,
        }
    }
}

/// One row of the text shown on stems (`"<label> - <record[name]>"`).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LabelRow {
    pub label: String,
    pub name: String,
}

/// Configuration of the visualization.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Width of one sample glyph (and of one mutation-id column in a cluster).
    pub mutation_shape_width: f64,
    /// Ranking of mutation-type classifiers; unranked classifiers sort as ties.
    pub mutation_order: Vec<String>,
    pub mutation_groups: MutationGroups,
    pub mutation_layout: MutationLayout,
    pub protein_scale: ProteinScale,
    pub protein_domains: ProteinDomains,
    /// Height of one protein domain row.
    pub signature_height: f64,
    /// Height reserved for the scale tick labels.
    pub location_tick_height: f64,
    /// Width of the track label column.
    pub band_label_width: f64,
    pub plot: PlotPadding,
    /// Stack height of uncoloured `location` tracks.
    pub location_track_height: f64,
    pub enable_transitions: bool,
    pub fields: FieldNames,
    /// Fill colour by value of `mutation_color_field`.
    pub mutation_colors: IndexMap<String, String>,
    pub mutation_color_field: String,
    pub mutation_label_rows: Vec<LabelRow>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mutation_shape_width: 10.0,
            mutation_order: Vec::new(),
            mutation_groups: Default::default(),
            mutation_layout: Default::default(),
            protein_scale: Default::default(),
            protein_domains: Default::default(),
            signature_height: 10.0,
            location_tick_height: 25.0,
            band_label_width: 100.0,
            plot: Default::default(),
            location_track_height: 150.0,
            enable_transitions: true,
            fields: Default::default(),
            mutation_colors: IndexMap::new(),
            mutation_color_field: String::from("mutation_type"),
            mutation_label_rows: Vec::new(),
        }
    }
}

impl Config {
    /// Check that all numeric settings are finite and non-negative and that the layout
    /// fields are named.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&'static str, f64); 11] = [
            ("mutation_shape_width", self.mutation_shape_width),
            ("mutation_groups.padding", self.mutation_groups.padding),
            ("mutation_groups.stems.height", self.mutation_groups.stems.height),
            (
                "mutation_groups.stems.stroke_width",
                self.mutation_groups.stems.stroke_width,
            ),
            ("protein_scale.width", self.protein_scale.width),
            (
                "protein_scale.vertical_padding",
                self.protein_scale.vertical_padding,
            ),
            ("protein_domains.padding", self.protein_domains.padding),
            ("signature_height", self.signature_height),
            ("location_tick_height", self.location_tick_height),
            ("band_label_width", self.band_label_width),
            ("location_track_height", self.location_track_height),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue { name, value });
            }
        }
        for (name, value) in [
            ("plot.horizontal_padding", self.plot.horizontal_padding),
            ("plot.vertical_padding", self.plot.vertical_padding),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidValue { name, value });
            }
        }

        let fields = &self.fields;
        for (name, value) in [
            ("fields.coordinate", &fields.coordinate),
            ("fields.sample_id", &fields.sample_id),
            ("fields.mutation_id", &fields.mutation_id),
        ] {
            if value.is_empty() {
                return Err(ConfigError::EmptyFieldName(name));
            }
        }

        Ok(())
    }
}
