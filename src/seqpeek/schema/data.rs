//! Input data: mutation records, tracks, and the protein annotation.

use indexmap::IndexMap;
use serde_json::Value;

use crate::seqpeek::category::CategoryKey;

/// One mutation observation.
///
/// Records are free-form JSON objects.  The fields used for the layout (coordinate,
/// sample id, mutation id, ...) are looked up by the names configured in
/// [`super::config::FieldNames`].
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct DataPoint {
    pub fields: IndexMap<String, Value>,
}

impl DataPoint {
    /// Raw access to a field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// String representation of a scalar field; `null`, arrays and objects yield `None`.
    pub fn get_str(&self, name: &str) -> Option<String> {
        match self.fields.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Integer value of a field.
    ///
    /// Integral JSON numbers and strings holding integers are accepted.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.fields.get(name)? {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Clear a field to `null`, marking that it no longer applies to a single record.
    pub fn set_null(&mut self, name: &str) {
        self.fields.insert(name.to_owned(), Value::Null);
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for DataPoint {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Location of one protein domain match, in coordinate units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DomainLocation {
    pub start: i64,
    pub end: i64,
}

/// A protein domain signature (e.g., an InterPro match).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProteinDomain {
    /// Identifier of the signature.
    pub id: String,
    /// Name of the source database.
    #[serde(default)]
    pub dbname: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Matched locations on the protein.
    #[serde(default)]
    pub locations: Vec<DomainLocation>,
}

/// The protein (or genomic window) the coordinate axis spans.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Protein {
    /// Length of the axis; the reference scale domain is `[0, length]`.
    pub length: i64,
    /// Domain annotation drawn in the domain track.
    #[serde(default)]
    pub domains: Vec<ProteinDomain>,
}

/// Colour-by settings of a track as given in the input.
///
/// The `type` tag stays a string here so that an unknown tag can be reported and the
/// track drawn uncoloured instead of failing the whole input.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ColorByInput {
    /// One of `none`, `fract`, `log10n`, `log10naggr`, `log10nnorm`.
    #[serde(rename = "type")]
    pub color_by_type: String,
    /// Categories in stacking order; categories not listed are not drawn.
    #[serde(default)]
    pub group_names: Vec<String>,
    /// Maximal height of one bar stack.
    #[serde(default = "default_max_height")]
    pub max_height: f64,
    /// Colour per category.
    #[serde(default)]
    pub colors: IndexMap<String, String>,
    /// How the category of a sample is derived from its record.
    #[serde(default)]
    pub category: CategoryKey,
    /// Global size of each category (`log10nnorm`).
    #[serde(default)]
    pub category_sizes: IndexMap<String, f64>,
    /// Sum of all category sizes (`log10nnorm`); defaults to the sum of `category_sizes`.
    #[serde(default)]
    pub category_sum: Option<f64>,
    /// Dataset-wide maximum of samples in one location (`log10naggr`); computed from the
    /// tracks when absent.
    #[serde(default)]
    pub max_samples: Option<usize>,
}

fn default_max_height() -> f64 {
    150.0
}

/// Per-track switches for the optional vertical parts of a track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TrackLayoutInput {
    /// Draw stems; defaults to `mutation_groups.stems.enabled`.
    #[serde(default)]
    pub mutation_stems: Option<bool>,
    #[serde(default)]
    pub protein_scale_line: Option<bool>,
    #[serde(default)]
    pub protein_scale_ticks: Option<bool>,
    #[serde(default)]
    pub protein_domains: Option<bool>,
}

/// One track of the input.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrackInput {
    /// Track label, also the reconciliation key of the track.
    pub label: String,
    /// One of `samples` or `location`.
    #[serde(rename = "type")]
    pub track_type: String,
    /// The mutation records of the track.
    #[serde(default)]
    pub mutations: Vec<DataPoint>,
    /// Tooltip definitions, passed through to the host untouched.
    #[serde(default)]
    pub tooltips: Option<Value>,
    #[serde(default)]
    pub color_by: Option<ColorByInput>,
    #[serde(default)]
    pub layout: Option<TrackLayoutInput>,
}

/// Everything `draw()` consumes besides the configuration.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VisualizationData {
    pub protein: Protein,
    #[serde(default)]
    pub tracks: Vec<TrackInput>,
}
