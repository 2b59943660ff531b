//! Scene graph of the drawn visualization and keyed reconciliation between redraws.
//!
//! A [`Scene`] is built from the laid-out tracks and the viewport.  Every element carries
//! a stable [`ElementKey`] so that [`SceneRenderer`] can tell a drawing backend which
//! elements enter, which are updated in place, and which exit.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexSet;

use crate::seqpeek::cluster::LocationCluster;
use crate::seqpeek::grouping::MergedMutation;
use crate::seqpeek::scale::{LinearScale, OrdinalBands};
use crate::seqpeek::schema::{Config, DataPoint, Protein};
use crate::seqpeek::track::Track;
use crate::seqpeek::track_layout::{Size, TickSpan};
use crate::seqpeek::viewport::{ViewportController, ViewportState};

/// Duration of enter, update, and exit transitions.
pub const TRANSITION_MS: u64 = 500;
/// Opacity of entering elements before and exiting elements after a transition.
pub const HIDDEN_OPACITY: f64 = 1e-6;
/// Fill of mutation types without a configured colour.
pub const DEFAULT_MUTATION_FILL: &str = "lightgray";
/// Stroke of stems.
pub const STEM_STROKE: &str = "gray";
/// Stroke of background reference lines.
pub const REFERENCE_LINE_STROKE: &str = "#ccc";

/// SVG-style transform: translation followed by scaling.
#[derive(Debug, Clone, Copy, PartialEq, serde_with::SerializeDisplay)]
pub struct Transform {
    pub translate_x: f64,
    pub translate_y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Transform {
    pub fn translate(x: f64, y: f64) -> Self {
        Self {
            translate_x: x,
            translate_y: y,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    pub fn with_scale(self, scale_x: f64, scale_y: f64) -> Self {
        Self {
            scale_x,
            scale_y,
            ..self
        }
    }

    /// Transform of data elements: viewport translation at `y`, horizontally scaled by
    /// the viewport zoom times `x_factor`, flipped vertically.
    pub fn data(viewport: ViewportState, y: f64, x_factor: f64) -> Self {
        Self::translate(viewport.translate_x, y).with_scale(viewport.scale * x_factor, -1.0)
    }

    /// Map a point of the local coordinate system into the parent's.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.translate_x + self.scale_x * x,
            self.translate_y + self.scale_y * y,
        )
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "translate({},{})", self.translate_x, self.translate_y)?;
        if self.scale_x != 1.0 || self.scale_y != 1.0 {
            write!(f, " scale({},{})", self.scale_x, self.scale_y)?;
        }
        Ok(())
    }
}

/// Kind of a keyed scene element.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, strum::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ElementKind {
    Track,
    BackgroundTick,
    Scale,
    ScaleLine,
    ScaleTick,
    Domains,
    DomainRect,
    MutationGroup,
    MutationType,
    Glyph,
    Stem,
}

/// Identity of a scene element across redraws.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct ElementKey {
    pub kind: ElementKind,
    /// Keys of the enclosing elements followed by the element's own key.
    pub path: Vec<String>,
}

impl ElementKey {
    pub fn new<I, S>(kind: ElementKind, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            path: path.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.path.join("/"))
    }
}

/// A reference tick; keyed by its value.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TickNode {
    pub value: f64,
    /// Position in viewport pixels.
    pub x: f64,
}

impl TickNode {
    pub fn key(&self) -> String {
        self.value.to_string()
    }
}

/// Vertical reference lines behind the mutations.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BackgroundTicks {
    pub transform: Transform,
    pub span: TickSpan,
    pub ticks: Vec<TickNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ScaleLine {
    pub y: f64,
    pub x1: f64,
    pub x2: f64,
}

/// Scale line and tick labels below the mutations.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ScaleNode {
    pub transform: Transform,
    pub line: Option<ScaleLine>,
    /// Whether tick labels are drawn.
    pub show_ticks: bool,
    pub ticks: Vec<TickNode>,
}

/// One location of a protein domain match, in coordinate units.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DomainRect {
    pub key: String,
    pub id: String,
    pub name: String,
    pub dbname: String,
    /// Row offset from the domain scale.
    pub y: f64,
    pub x: f64,
    pub width: f64,
    pub height: f64,
}

/// The protein domain track.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DomainsNode {
    pub transform: Transform,
    pub rects: Vec<DomainRect>,
}

/// One drawn mark of a mutation type.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Glyph {
    /// One sample; keyed by sample id and its occurrence in the column.
    Circle { sample_id: String, cy: f64, r: f64 },
    /// One colour-by category; keyed by category.
    Bar {
        category: String,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: String,
    },
}

impl Glyph {
    pub fn key(&self) -> &str {
        match self {
            Glyph::Circle { sample_id, .. } => sample_id,
            Glyph::Bar { category, .. } => category,
        }
    }
}

/// Keys of the glyphs of one column; repeated keys get `#<occurrence>` appended.
fn glyph_keys(glyphs: &[Glyph]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    glyphs
        .iter()
        .map(|glyph| {
            let occurrence = seen.entry(glyph.key()).or_default();
            let key = match *occurrence {
                0 => glyph.key().to_owned(),
                n => format!("{}#{}", glyph.key(), n),
            };
            *occurrence += 1;
            key
        })
        .collect()
}

/// One mutation id column of a cluster; keyed by mutation id.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MutationNode {
    pub mutation_id: String,
    /// Offset within the cluster.
    pub x: f64,
    /// Lift above the baseline (the stem height when stems are drawn).
    pub y: f64,
    pub fill: String,
    pub glyphs: Vec<Glyph>,
}

/// One packed cluster; keyed by coordinate.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct GroupNode {
    pub location: i64,
    /// Assigned start of the cluster.
    pub x: f64,
    pub mutations: Vec<MutationNode>,
}

/// Cubic stem from a coordinate on the scale line to its mutation column.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StemNode {
    pub location: i64,
    pub mutation_id: String,
    pub path: String,
    pub title: String,
    pub stroke_width: f64,
}

/// All data elements of a track, drawn under one viewport transform.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MutationsNode {
    pub transform: Transform,
    pub groups: Vec<GroupNode>,
    pub stems: Vec<StemNode>,
}

/// One track; keyed by label.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TrackNode {
    pub label: String,
    pub transform: Transform,
    pub height: f64,
    pub label_y: f64,
    pub background_ticks: BackgroundTicks,
    pub scale: Option<ScaleNode>,
    pub domains: Option<DomainsNode>,
    pub mutations: MutationsNode,
}

/// Position and size of an area of the drawing.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Area {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// The complete drawing.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Scene {
    /// Total size including the plot paddings.
    pub size: Size,
    /// Track labels.
    pub label_area: Area,
    /// Reference lines, scale lines and tick labels.
    pub panel_area: Area,
    /// Mutations and domains, clipped to the viewport.
    pub data_area: Area,
    pub viewport: ViewportState,
    pub tracks: Vec<TrackNode>,
}

impl Scene {
    /// Keys of all elements, parents before children.
    pub fn element_keys(&self) -> IndexSet<ElementKey> {
        let mut keys = IndexSet::new();
        for track in &self.tracks {
            let label = track.label.as_str();
            keys.insert(ElementKey::new(ElementKind::Track, [label]));
            for tick in &track.background_ticks.ticks {
                keys.insert(ElementKey::new(
                    ElementKind::BackgroundTick,
                    [label.to_owned(), tick.key()],
                ));
            }
            if let Some(scale) = &track.scale {
                keys.insert(ElementKey::new(ElementKind::Scale, [label]));
                if scale.line.is_some() {
                    keys.insert(ElementKey::new(ElementKind::ScaleLine, [label]));
                }
                for tick in &scale.ticks {
                    keys.insert(ElementKey::new(
                        ElementKind::ScaleTick,
                        [label.to_owned(), tick.key()],
                    ));
                }
            }
            if let Some(domains) = &track.domains {
                keys.insert(ElementKey::new(ElementKind::Domains, [label]));
                for rect in &domains.rects {
                    keys.insert(ElementKey::new(ElementKind::DomainRect, [label, rect.key.as_str()]));
                }
            }
            for group in &track.mutations.groups {
                let location = group.location.to_string();
                keys.insert(ElementKey::new(
                    ElementKind::MutationGroup,
                    [label, location.as_str()],
                ));
                for mutation in &group.mutations {
                    let id = mutation.mutation_id.as_str();
                    keys.insert(ElementKey::new(
                        ElementKind::MutationType,
                        [label, location.as_str(), id],
                    ));
                    for glyph_key in glyph_keys(&mutation.glyphs) {
                        keys.insert(ElementKey::new(
                            ElementKind::Glyph,
                            [label, location.as_str(), id, glyph_key.as_str()],
                        ));
                    }
                }
            }
            for stem in &track.mutations.stems {
                keys.insert(ElementKey::new(
                    ElementKind::Stem,
                    [label.to_owned(), stem.location.to_string(), stem.mutation_id.clone()],
                ));
            }
        }
        keys
    }

    pub fn track(&self, label: &str) -> Option<&TrackNode> {
        self.tracks.iter().find(|t| t.label == label)
    }
}

/// Everything besides the tracks that a scene depends on.
#[derive(Debug, Clone, Copy)]
pub struct SceneContext<'a> {
    pub config: &'a Config,
    pub protein: &'a Protein,
    pub domain_scale: &'a OrdinalBands,
    pub viewport: &'a ViewportController,
    /// Size of the drawing without plot paddings.
    pub size: Size,
}

impl SceneContext<'_> {
    fn ref_scale(&self) -> &LinearScale {
        self.viewport.ref_scale()
    }

    fn viewport_width(&self) -> f64 {
        self.ref_scale().range.1
    }

    /// Factor mapping coordinate units onto the unzoomed viewport.
    fn domain_rect_scale_factor(&self) -> f64 {
        let (start, end) = self.ref_scale().domain;
        let length = end - start;
        if length > 0.0 && length.is_finite() {
            self.viewport_width() / length
        } else {
            0.0
        }
    }

    fn tick_nodes(&self, ticks: &[f64]) -> Vec<TickNode> {
        let tick_scale = self.viewport.tick_scale();
        ticks
            .iter()
            .map(|&value| TickNode {
                value,
                x: tick_scale.apply(value),
            })
            .collect()
    }

    /// Build the scene of `tracks`, which must be laid out.
    pub fn build(&self, tracks: &[Track]) -> Scene {
        let config = self.config;
        let plot = config.plot;
        let ticks = self.viewport.visible_ticks();

        Scene {
            size: Size::new(
                self.size.width + 2.0 * plot.horizontal_padding,
                self.size.height + 2.0 * plot.vertical_padding,
            ),
            label_area: Area {
                x: plot.horizontal_padding,
                y: plot.vertical_padding,
                width: config.band_label_width,
                height: self.size.height,
            },
            panel_area: Area {
                x: plot.horizontal_padding + config.band_label_width,
                y: plot.vertical_padding,
                width: self.viewport_width(),
                height: self.size.height,
            },
            data_area: Area {
                x: plot.horizontal_padding + config.band_label_width,
                y: plot.vertical_padding,
                width: self.viewport_width(),
                height: self.size.height,
            },
            viewport: self.viewport.state(),
            tracks: tracks
                .iter()
                .map(|track| self.track_node(track, &ticks))
                .collect(),
        }
    }

    fn track_node(&self, track: &Track, ticks: &[f64]) -> TrackNode {
        let config = self.config;
        let layout = &track.layout;
        let viewport = self.viewport.state();

        let scale = (layout.protein_scale_ticks.enabled || layout.protein_scale_line.enabled).then(|| {
            ScaleNode {
                transform: Transform::translate(0.0, layout.protein_scale_ticks.y),
                line: layout.protein_scale_line.enabled.then(|| ScaleLine {
                    y: if layout.protein_scale_ticks.enabled {
                        -config.location_tick_height
                    } else {
                        0.0
                    },
                    x1: 0.0,
                    x2: self.viewport_width(),
                }),
                show_ticks: layout.protein_scale_ticks.enabled,
                ticks: if layout.protein_scale_ticks.enabled {
                    self.tick_nodes(ticks)
                } else {
                    Vec::new()
                },
            }
        });

        let domains = layout.protein_domains.enabled.then(|| DomainsNode {
            transform: Transform::data(
                viewport,
                layout.protein_domains.y,
                self.domain_rect_scale_factor(),
            ),
            rects: self.domain_rects(),
        });

        TrackNode {
            label: track.label.clone(),
            transform: Transform::translate(0.0, layout.y),
            height: layout.height,
            label_y: layout.label_y,
            background_ticks: BackgroundTicks {
                transform: Transform::translate(0.0, layout.mutations_y),
                span: layout.background_ticks,
                ticks: self.tick_nodes(ticks),
            },
            scale,
            domains,
            mutations: MutationsNode {
                transform: Transform::data(viewport, layout.mutations_y, 1.0),
                groups: self.group_nodes(track),
                stems: if layout.mutation_stems {
                    self.stem_nodes(track)
                } else {
                    Vec::new()
                },
            },
        }
    }

    fn domain_rects(&self) -> Vec<DomainRect> {
        let key = self.config.protein_domains.key;
        let mut rects = Vec::new();
        for domain in &self.protein.domains {
            let y = self.domain_scale.offset(key.of(domain)).unwrap_or(0.0);
            for location in &domain.locations {
                rects.push(DomainRect {
                    key: format!("{}+{}+{}", domain.id, location.start, location.end),
                    id: domain.id.clone(),
                    name: domain.name.clone(),
                    dbname: domain.dbname.clone(),
                    y,
                    x: location.start as f64,
                    width: (location.end - location.start) as f64,
                    height: self.config.signature_height,
                });
            }
        }
        rects
    }

    fn mutation_fill(&self, record: &DataPoint) -> String {
        record
            .get_str(&self.config.mutation_color_field)
            .and_then(|value| self.config.mutation_colors.get(&value).cloned())
            .unwrap_or_else(|| DEFAULT_MUTATION_FILL.to_owned())
    }

    fn group_nodes(&self, track: &Track) -> Vec<GroupNode> {
        let config = self.config;
        let shape_width = config.mutation_shape_width;
        let lift = if track.layout.mutation_stems {
            config.mutation_groups.stems.height
        } else {
            0.0
        };

        track
            .mutations
            .iter()
            .filter_map(|(&location, mutations)| {
                let cluster = track.cluster_at(location)?;
                let mutations = mutations
                    .iter()
                    .map(|m| MutationNode {
                        mutation_id: m.mutation_id.clone(),
                        x: cluster.scale.offset(&m.mutation_id).unwrap_or(0.0) + shape_width / 2.0,
                        y: lift,
                        fill: self.mutation_fill(&m.record),
                        glyphs: if track.color_by.is_some() {
                            bar_glyphs(m, shape_width)
                        } else {
                            circle_glyphs(m, shape_width)
                        },
                    })
                    .collect();
                Some(GroupNode {
                    location,
                    x: cluster.start_loc,
                    mutations,
                })
            })
            .collect()
    }

    fn stem_nodes(&self, track: &Track) -> Vec<StemNode> {
        let config = self.config;
        track
            .mutations
            .iter()
            .filter_map(|(&location, mutations)| {
                track.cluster_at(location).map(|cluster| (cluster, mutations))
            })
            .flat_map(|(cluster, mutations)| {
                mutations.iter().map(move |m| StemNode {
                    location: cluster.location,
                    mutation_id: m.mutation_id.clone(),
                    path: stem_path(config, self.ref_scale(), cluster, &m.mutation_id),
                    title: label_rows(config, &m.record).join("\n"),
                    stroke_width: config.mutation_groups.stems.stroke_width,
                })
            })
            .collect()
    }

    /// Retarget the viewport-dependent parts of `scene`: data transforms and ticks.
    ///
    /// Cluster positions and track layouts are not touched.
    pub fn apply_viewport(&self, scene: &mut Scene) {
        let viewport = self.viewport.state();
        let ticks = self.viewport.visible_ticks();
        let factor = self.domain_rect_scale_factor();

        scene.viewport = viewport;
        for track in scene.tracks.iter_mut() {
            let mutations_y = track.mutations.transform.translate_y;
            track.mutations.transform = Transform::data(viewport, mutations_y, 1.0);
            if let Some(domains) = track.domains.as_mut() {
                let domains_y = domains.transform.translate_y;
                domains.transform = Transform::data(viewport, domains_y, factor);
            }
            track.background_ticks.ticks = self.tick_nodes(&ticks);
            if let Some(scale) = track.scale.as_mut() {
                if scale.show_ticks {
                    scale.ticks = self.tick_nodes(&ticks);
                }
            }
        }
    }
}

fn circle_glyphs(mutation: &MergedMutation, shape_width: f64) -> Vec<Glyph> {
    mutation
        .samples
        .iter()
        .enumerate()
        .map(|(i, sample)| Glyph::Circle {
            sample_id: sample.id.clone(),
            cy: i as f64 * shape_width,
            r: shape_width / 2.0,
        })
        .collect()
}

fn bar_glyphs(mutation: &MergedMutation, shape_width: f64) -> Vec<Glyph> {
    mutation
        .bars
        .iter()
        .flat_map(|stack| stack.bars.iter())
        .map(|bar| Glyph::Bar {
            category: bar.category.clone(),
            x: -shape_width / 2.0,
            y: bar.y,
            width: shape_width,
            height: bar.height,
            fill: bar.color.clone(),
        })
        .collect()
}

/// `"<label> - <value>"` per configured label row.
pub fn label_rows(config: &Config, record: &DataPoint) -> Vec<String> {
    config
        .mutation_label_rows
        .iter()
        .map(|row| format!("{} - {}", row.label, record.get_str(&row.name).unwrap_or_default()))
        .collect()
}

/// Cubic path from the coordinate on the scale line to the bottom of the mutation column.
pub fn stem_path(
    config: &Config,
    ref_scale: &LinearScale,
    cluster: &LocationCluster,
    mutation_id: &str,
) -> String {
    let shape_width = config.mutation_shape_width;
    let (sx, sy) = (ref_scale.apply(cluster.location as f64), 0.0);
    let tx = cluster.start_loc
        + shape_width / 2.0
        + cluster.scale.offset(mutation_id).unwrap_or(0.0);
    let ty = config.mutation_groups.stems.height - shape_width + 1.0;
    let my = (sy + ty) / 2.0;
    format!("M{},{}C{},{} {},{} {},{}", sx, sy, sx, my, tx, my, tx, ty)
}

/// Fade-in/fade-out parameters of a redraw.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Transition {
    pub duration_ms: u64,
    /// Opacity of entering elements, from and to.
    pub enter_opacity: (f64, f64),
    /// Opacity of exiting elements, from and to.
    pub exit_opacity: (f64, f64),
}

impl Transition {
    pub fn new(enabled: bool) -> Self {
        Self {
            duration_ms: if enabled { TRANSITION_MS } else { 0 },
            enter_opacity: (HIDDEN_OPACITY, 1.0),
            exit_opacity: (1.0, HIDDEN_OPACITY),
        }
    }
}

impl Default for Transition {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Elements to add, retarget, and remove to go from one scene to the next.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct RenderDiff {
    pub enter: Vec<ElementKey>,
    pub update: Vec<ElementKey>,
    pub exit: Vec<ElementKey>,
    pub transition: Transition,
}

impl RenderDiff {
    pub fn is_empty(&self) -> bool {
        self.enter.is_empty() && self.update.is_empty() && self.exit.is_empty()
    }
}

/// Diff between the keys of two scenes.
pub fn reconcile(
    previous: &IndexSet<ElementKey>,
    current: &IndexSet<ElementKey>,
    transition: Transition,
) -> RenderDiff {
    let mut diff = RenderDiff {
        transition,
        ..Default::default()
    };
    for key in current {
        if previous.contains(key) {
            diff.update.push(key.clone());
        } else {
            diff.enter.push(key.clone());
        }
    }
    diff.exit = previous
        .iter()
        .filter(|key| !current.contains(*key))
        .cloned()
        .collect();
    diff
}

/// Remembers the keys of the last rendered scene.
#[derive(Debug, Clone, Default)]
pub struct SceneRenderer {
    previous: IndexSet<ElementKey>,
    transition: Transition,
}

impl SceneRenderer {
    pub fn new(enable_transitions: bool) -> Self {
        Self {
            previous: IndexSet::new(),
            transition: Transition::new(enable_transitions),
        }
    }

    /// Switch animations on or off; the rendered keys are kept.
    pub fn set_transitions(&mut self, enabled: bool) {
        self.transition = Transition::new(enabled);
    }

    /// Diff `scene` against the previously rendered one and remember it.
    pub fn render(&mut self, scene: &Scene) -> RenderDiff {
        let current = scene.element_keys();
        let diff = reconcile(&self.previous, &current, self.transition);
        tracing::debug!(
            "render: {} entering, {} updated, {} exiting",
            diff.enter.len(),
            diff.update.len(),
            diff.exit.len()
        );
        self.previous = current;
        diff
    }

    pub fn rendered_keys(&self) -> &IndexSet<ElementKey> {
        &self.previous
    }
}
