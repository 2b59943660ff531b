//! Vertical layout of tracks.

use crate::seqpeek::scale::OrdinalBands;
use crate::seqpeek::schema::Config;
use crate::seqpeek::track::{LayoutToggles, Track, TrackKind};

/// Offset of the track label below the middle of the mutation stack.
pub const LABEL_OFFSET: f64 = 7.0;
/// Extra gap below a track without domain track or without scale ticks.
pub const TRACK_GAP: f64 = 5.0;

/// An optional part of a track and its vertical position.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct Placement {
    pub enabled: bool,
    pub y: f64,
}

/// Vertical span of the background reference lines, relative to the mutation baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct TickSpan {
    pub y1: f64,
    pub y2: f64,
}

/// Vertical layout of one track; all `y` values but `y` itself are track-relative.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct TrackLayout {
    /// Top of the track in the visualization.
    pub y: f64,
    pub height: f64,
    pub label_y: f64,
    /// Height of the glyph or bar stack, without stems.
    pub stack_height: f64,
    pub mutation_stems: bool,
    /// Baseline of the mutation glyphs.
    pub mutations_y: f64,
    pub protein_scale_line: Placement,
    pub protein_scale_ticks: Placement,
    pub protein_domains: Placement,
    pub background_ticks: TickSpan,
}

/// Width and height of a drawing.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, derive_new::new)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Computes track heights and cumulative offsets.
#[derive(Debug, Clone, Copy)]
pub struct TrackHeightResolver<'a> {
    config: &'a Config,
    domains_height: f64,
}

impl<'a> TrackHeightResolver<'a> {
    /// `domain_scale` places the protein domains vertically inside the domain track.
    pub fn new(config: &'a Config, domain_scale: &OrdinalBands) -> Self {
        Self {
            config,
            domains_height: domain_scale.range_extent() + config.protein_domains.padding,
        }
    }

    /// Height of the tallest glyph column or bar stack of `track`.
    pub fn stack_height(&self, track: &Track) -> f64 {
        let mutations = || track.mutations.values().flatten();
        let height = if track.color_by.is_some() {
            mutations()
                .map(|m| m.bars.as_ref().map(|bars| bars.total_height).unwrap_or(0.0))
                .fold(0.0, f64::max)
        } else if track.kind == TrackKind::Location {
            self.config.location_track_height
        } else {
            mutations()
                .map(|m| m.samples.len() as f64 * self.config.mutation_shape_width)
                .fold(0.0, f64::max)
        };
        if height.is_finite() {
            height
        } else {
            0.0
        }
    }

    /// Layout of `track` with the given parts switched on; `y` is left at zero.
    pub fn compute_layout(&self, track: &Track, toggles: LayoutToggles) -> TrackLayout {
        let config = self.config;
        let stack_height = self.stack_height(track);
        let mut mutations_height = stack_height;
        if toggles.mutation_stems {
            mutations_height += config.mutation_groups.stems.height;
        }
        let scale_height = if toggles.protein_scale_ticks {
            config.location_tick_height
        } else {
            0.0
        };
        let domains_height = if toggles.protein_domains {
            self.domains_height
        } else {
            0.0
        };

        let mut scale_line_y = mutations_height;
        if !toggles.mutation_stems {
            scale_line_y += config.mutation_shape_width / 2.0;
        }
        let ticks_y = scale_line_y + scale_height;

        let background_ticks = TickSpan {
            y1: -mutations_height,
            y2: if toggles.protein_domains {
                0.0
            } else if toggles.protein_scale_ticks {
                config.location_tick_height / 2.0
            } else {
                config.mutation_shape_width / 2.0
            },
        };

        TrackLayout {
            y: 0.0,
            height: mutations_height + scale_height + domains_height,
            label_y: mutations_height / 2.0 + LABEL_OFFSET,
            stack_height,
            mutation_stems: toggles.mutation_stems,
            mutations_y: mutations_height,
            protein_scale_line: Placement {
                enabled: toggles.protein_scale_line,
                y: scale_line_y,
            },
            protein_scale_ticks: Placement {
                enabled: toggles.protein_scale_ticks,
                y: ticks_y,
            },
            protein_domains: Placement {
                enabled: toggles.protein_domains,
                y: ticks_y + domains_height,
            },
            background_ticks,
        }
    }

    /// Lay out all `tracks` with their own toggles, stacking them top to bottom.
    ///
    /// Returns the total height.
    pub fn cascade(&self, tracks: &mut [Track]) -> f64 {
        let mut current_y = 0.0;
        for track in tracks.iter_mut() {
            let mut layout = self.compute_layout(track, track.toggles);
            layout.y = current_y;
            current_y += layout.height;
            if !layout.protein_domains.enabled || !layout.protein_scale_ticks.enabled {
                current_y += TRACK_GAP;
            }
            track.layout = layout;
        }
        current_y
    }

    fn width(&self) -> f64 {
        self.config.band_label_width + self.config.protein_scale.width
    }

    /// Size with scale and domains drawn only below the last track.
    pub fn default_size(&self, tracks: &[Track]) -> Size {
        let padding = self.config.protein_scale.vertical_padding;
        let height = match tracks.split_last() {
            Some((last, initial)) => {
                let initial_height: f64 = initial
                    .iter()
                    .map(|t| self.compute_layout(t, t.toggles.with_panels(false)).height + padding)
                    .sum();
                initial_height + self.compute_layout(last, last.toggles.with_panels(true)).height
            }
            None => 0.0,
        };
        Size::new(self.width(), height)
    }

    /// Size with scale and domains drawn below every track.
    pub fn max_size(&self, tracks: &[Track]) -> Size {
        let padding = self.config.protein_scale.vertical_padding;
        let height = tracks
            .iter()
            .map(|t| self.compute_layout(t, t.toggles.with_panels(true)).height + padding)
            .sum();
        Size::new(self.width(), height)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::seqpeek::color_by::BarStack;
    use crate::seqpeek::grouping::test::record;
    use crate::seqpeek::grouping::MutationGrouper;
    use crate::seqpeek::schema::TrackInput;

    fn track(config: &Config, kind: &str, sample_counts: &[usize]) -> Result<Track, anyhow::Error> {
        let mut points = Vec::new();
        for (i, n) in sample_counts.iter().enumerate() {
            for s in 0..*n {
                points.push(record(100 * (i as i64 + 1), &format!("S{}", s), &format!("m{}", i), "T"));
            }
        }
        let input = TrackInput {
            label: String::from("A"),
            track_type: kind.into(),
            ..Default::default()
        };
        let mut track = Track::from_input(&input, config)?;
        let (mutations, _) = MutationGrouper::new(config, ["A"]).group(&points, None);
        track.points = points;
        track.mutations = mutations;
        Ok(track)
    }

    fn two_domains() -> OrdinalBands {
        OrdinalBands::new(["PF1", "PF2"], 10.0)
    }

    #[test]
    fn layout_all_enabled() -> Result<(), anyhow::Error> {
        let config = Config::default();
        let resolver = TrackHeightResolver::new(&config, &two_domains());
        let track = track(&config, "samples", &[3, 1])?;

        let layout = resolver.compute_layout(&track, track.toggles);

        assert_eq!(
            layout,
            TrackLayout {
                y: 0.0,
                height: 110.0,
                label_y: 37.0,
                stack_height: 30.0,
                mutation_stems: true,
                mutations_y: 60.0,
                protein_scale_line: Placement {
                    enabled: true,
                    y: 60.0
                },
                protein_scale_ticks: Placement {
                    enabled: true,
                    y: 85.0
                },
                protein_domains: Placement {
                    enabled: true,
                    y: 110.0
                },
                background_ticks: TickSpan { y1: -60.0, y2: 0.0 },
            }
        );

        Ok(())
    }

    #[test]
    fn layout_without_stems() -> Result<(), anyhow::Error> {
        let config = Config::default();
        let resolver = TrackHeightResolver::new(&config, &two_domains());
        let track = track(&config, "samples", &[3])?;
        let toggles = LayoutToggles {
            mutation_stems: false,
            ..track.toggles
        };

        let layout = resolver.compute_layout(&track, toggles);

        assert_eq!(layout.mutations_y, 30.0);
        assert_eq!(layout.protein_scale_line.y, 35.0);
        assert_eq!(layout.protein_scale_ticks.y, 60.0);
        assert_eq!(layout.protein_domains.y, 85.0);
        assert_eq!(layout.height, 80.0);
        assert_eq!(layout.label_y, 22.0);

        Ok(())
    }

    #[rstest::rstest]
    #[case(true, false, 12.5)]
    #[case(false, false, 5.0)]
    #[case(true, true, 0.0)]
    #[case(false, true, 0.0)]
    fn background_tick_anchor(
        #[case] ticks: bool,
        #[case] domains: bool,
        #[case] expected_y2: f64,
    ) -> Result<(), anyhow::Error> {
        let config = Config::default();
        let resolver = TrackHeightResolver::new(&config, &two_domains());
        let track = track(&config, "samples", &[2])?;
        let toggles = LayoutToggles {
            protein_scale_ticks: ticks,
            protein_domains: domains,
            ..track.toggles
        };

        let layout = resolver.compute_layout(&track, toggles);

        assert_eq!(layout.background_ticks, TickSpan { y1: -50.0, y2: expected_y2 });

        Ok(())
    }

    #[test]
    fn location_track_has_fixed_stack() -> Result<(), anyhow::Error> {
        let config = Config::default();
        let resolver = TrackHeightResolver::new(&config, &two_domains());
        let track = track(&config, "location", &[40])?;

        assert_eq!(resolver.stack_height(&track), 150.0);

        Ok(())
    }

    #[test]
    fn coloured_track_uses_bar_totals() -> Result<(), anyhow::Error> {
        let config = Config::default();
        let resolver = TrackHeightResolver::new(&config, &two_domains());
        let mut track = track(&config, "samples", &[4, 1])?;
        track.color_by = Some(crate::seqpeek::color_by::ColorBy {
            mode: crate::seqpeek::color_by::BarMode::Fract,
            group_names: Vec::new(),
            max_height: 80.0,
            colors: Default::default(),
            category: Default::default(),
            category_sizes: Default::default(),
            category_sum: 0.0,
            max_samples: None,
        });
        for (i, m) in track.mutations.values_mut().flatten().enumerate() {
            m.bars = Some(BarStack {
                total_height: 20.0 + i as f64,
                ..Default::default()
            });
        }

        assert_eq!(resolver.stack_height(&track), 21.0);

        Ok(())
    }

    #[test]
    fn empty_track_has_zero_stack() -> Result<(), anyhow::Error> {
        let config = Config::default();
        let resolver = TrackHeightResolver::new(&config, &two_domains());
        let track = track(&config, "samples", &[])?;

        assert_eq!(resolver.stack_height(&track), 0.0);

        Ok(())
    }

    #[test]
    fn cascade_adds_gap() -> Result<(), anyhow::Error> {
        let config = Config::default();
        let resolver = TrackHeightResolver::new(&config, &two_domains());
        let first = track(&config, "samples", &[3])?;
        let mut second = track(&config, "samples", &[3])?;
        second.toggles.protein_domains = false;
        let third = track(&config, "samples", &[1])?;
        let mut tracks = vec![first, second, third];

        let total = resolver.cascade(&mut tracks);

        assert_eq!(
            tracks.iter().map(|t| t.layout.y).collect::<Vec<_>>(),
            vec![0.0, 110.0, 200.0]
        );
        assert_eq!(total, 290.0);

        Ok(())
    }

    #[test]
    fn sizes() -> Result<(), anyhow::Error> {
        let config = Config::default();
        let resolver = TrackHeightResolver::new(&config, &two_domains());
        let tracks = vec![
            track(&config, "samples", &[3])?,
            track(&config, "samples", &[1])?,
        ];

        // stacks 60 and 40 with stems; all panels add 50, padding 10
        assert_eq!(resolver.default_size(&tracks), Size::new(1100.0, 60.0 + 10.0 + 90.0));
        assert_eq!(resolver.max_size(&tracks), Size::new(1100.0, 120.0 + 100.0));
        assert_eq!(resolver.default_size(&[]), Size::new(1100.0, 0.0));

        Ok(())
    }
}
