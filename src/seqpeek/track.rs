//! Validated tracks and their per-track statistics.

use std::rc::Rc;

use serde_json::Value;

use crate::err::ConfigError;
use crate::seqpeek::cluster::{Extent, LocationCluster};
use crate::seqpeek::color_by::ColorBy;
use crate::seqpeek::grouping::MutationsByLocation;
use crate::seqpeek::schema::{Config, DataPoint, TrackInput, TrackLayoutInput};
use crate::seqpeek::track_layout::TrackLayout;

/// Kind of a track, from the `type` tag of the input.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrackKind {
    /// One glyph per sample.
    Samples,
    /// One entry per location, usually drawn as bars.
    Location,
}

/// Which optional vertical parts a track draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct LayoutToggles {
    pub mutation_stems: bool,
    pub protein_scale_line: bool,
    pub protein_scale_ticks: bool,
    pub protein_domains: bool,
}

impl LayoutToggles {
    /// Resolve the per-track switches; unset switches are on, stems follow the config.
    pub fn resolve(input: Option<&TrackLayoutInput>, config: &Config) -> Self {
        let input = input.copied().unwrap_or_default();
        Self {
            mutation_stems: input
                .mutation_stems
                .unwrap_or(config.mutation_groups.stems.enabled),
            protein_scale_line: input.protein_scale_line.unwrap_or(true),
            protein_scale_ticks: input.protein_scale_ticks.unwrap_or(true),
            protein_domains: input.protein_domains.unwrap_or(true),
        }
    }

    /// Scale line, ticks and domains all shown or all hidden, stems unchanged.
    pub fn with_panels(self, enabled: bool) -> Self {
        Self {
            protein_scale_line: enabled,
            protein_scale_ticks: enabled,
            protein_domains: enabled,
            ..self
        }
    }
}

/// Sample counts over the merged mutations of a track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct TrackStatistics {
    pub min_samples_in_location: usize,
    pub max_samples_in_location: usize,
}

impl TrackStatistics {
    pub fn of(mutations: &MutationsByLocation) -> Self {
        let counts = || mutations.values().flatten().map(|m| m.samples.len());
        Self {
            min_samples_in_location: counts().min().unwrap_or(0),
            max_samples_in_location: counts().max().unwrap_or(0),
        }
    }
}

/// Dataset-wide maximum of samples of one merged mutation, `None` without any mutation.
pub fn dataset_max_samples<'a, I>(tracks: I) -> Option<usize>
where
    I: IntoIterator<Item = &'a Track>,
{
    tracks
        .into_iter()
        .filter(|track| !track.mutations.is_empty())
        .map(|track| track.statistics.max_samples_in_location)
        .max()
}

/// One row of the visualization.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub label: String,
    pub kind: TrackKind,
    pub toggles: LayoutToggles,
    /// Passed through for the host's hovercards.
    pub tooltips: Option<Value>,
    pub points: Vec<Rc<DataPoint>>,
    /// Colour-by settings, `None` when the track is drawn with per-sample glyphs.
    pub color_by: Option<ColorBy>,
    pub mutations: MutationsByLocation,
    pub statistics: TrackStatistics,
    pub clusters: Vec<LocationCluster>,
    pub extent: Option<Extent>,
    pub layout: TrackLayout,
}

impl Track {
    /// Validate the type tag and toggles of `input`; grouping happens later.
    pub fn from_input(input: &TrackInput, config: &Config) -> Result<Self, ConfigError> {
        let kind = input
            .track_type
            .parse::<TrackKind>()
            .map_err(|_| ConfigError::UnknownTrackType(input.track_type.clone()))?;

        Ok(Self {
            label: input.label.clone(),
            kind,
            toggles: LayoutToggles::resolve(input.layout.as_ref(), config),
            tooltips: input.tooltips.clone(),
            points: input.mutations.iter().cloned().map(Rc::new).collect(),
            color_by: None,
            mutations: MutationsByLocation::new(),
            statistics: TrackStatistics::default(),
            clusters: Vec::new(),
            extent: None,
            layout: TrackLayout::default(),
        })
    }

    /// Cluster of `location`; clusters are sorted by coordinate.
    pub fn cluster_at(&self, location: i64) -> Option<&LocationCluster> {
        self.clusters
            .binary_search_by_key(&location, |c| c.location)
            .ok()
            .map(|i| &self.clusters[i])
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::seqpeek::grouping::test::record;
    use crate::seqpeek::grouping::MutationGrouper;

    #[rstest::rstest]
    #[case("samples", Ok(TrackKind::Samples))]
    #[case("location", Ok(TrackKind::Location))]
    #[case("heatmap", Err(ConfigError::UnknownTrackType("heatmap".into())))]
    fn track_kind(#[case] tag: &str, #[case] expected: Result<TrackKind, ConfigError>) {
        let input = TrackInput {
            label: "A".into(),
            track_type: tag.into(),
            ..Default::default()
        };

        let res = Track::from_input(&input, &Config::default()).map(|track| track.kind);

        assert_eq!(res, expected);
    }

    #[test]
    fn toggles_default_and_override() -> Result<(), anyhow::Error> {
        let config = Config::default();
        assert_eq!(
            LayoutToggles::resolve(None, &config),
            LayoutToggles {
                mutation_stems: true,
                protein_scale_line: true,
                protein_scale_ticks: true,
                protein_domains: true,
            }
        );

        let input: TrackLayoutInput = serde_json::from_value(json!({
            "mutation_stems": false,
            "protein_domains": false
        }))?;
        let toggles = LayoutToggles::resolve(Some(&input), &config);
        assert!(!toggles.mutation_stems);
        assert!(!toggles.protein_domains);
        assert!(toggles.protein_scale_ticks);
        assert!(toggles.with_panels(true).protein_domains);
        assert!(!toggles.with_panels(true).mutation_stems);

        Ok(())
    }

    #[test]
    fn statistics() {
        let config = Config::default();
        let grouper = MutationGrouper::new(&config, ["A"]);
        let (by_location, _) = grouper.group(
            &[
                record(1, "S1", "x", "T"),
                record(1, "S2", "x", "T"),
                record(1, "S3", "y", "T"),
                record(9, "S4", "z", "T"),
            ],
            None,
        );

        assert_eq!(
            TrackStatistics::of(&by_location),
            TrackStatistics {
                min_samples_in_location: 1,
                max_samples_in_location: 2,
            }
        );
        assert_eq!(
            TrackStatistics::of(&MutationsByLocation::new()),
            TrackStatistics::default()
        );
    }
}
