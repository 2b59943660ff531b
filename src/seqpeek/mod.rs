//! SeqPeek mutation map layout.
//!
//! [`SeqPeek`] owns the data, the configuration and all derived layout state.  A draw or a
//! track change runs the whole pipeline (grouping, colouring, cluster packing, track heights,
//! scene building) before anything is committed; zoom and pan only touch the viewport and the
//! viewport-dependent parts of the scene.

pub mod category;
pub mod cluster;
pub mod color_by;
pub mod grouping;
pub mod regions;
pub mod render;
pub mod scale;
pub mod schema;
pub mod svg;
pub mod track;
pub mod track_layout;
pub mod viewport;

use std::rc::Rc;
use std::time::Instant;

use clap::Parser;
use indexmap::IndexSet;
use itertools::Itertools;
use thousands::Separable;

use crate::err::ConfigError;

use self::cluster::{build_location_clusters, ClusterLayoutEngine, ClusterMemo, MemoKey};
use self::color_by::ColorBy;
use self::grouping::{merge_locations, MutationGrouper};
use self::regions::{build_regions_with_non_coding, fill_data_into_regions, CoordinateGetter, Span};
use self::render::{RenderDiff, Scene, SceneContext, SceneRenderer};
use self::scale::{LinearScale, OrdinalBands};
use self::schema::{Config, DataPoint, MutationLayout, Protein, TrackInput, VisualizationData};
use self::track::{dataset_max_samples, LayoutToggles, Track, TrackStatistics};
use self::track_layout::{Size, TrackHeightResolver};
use self::viewport::{ViewportController, ViewportEvent, ViewportState, ZoomGesture};

/// Emitted when a mutation is selected.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SelectionEvent {
    pub track: String,
    pub location: i64,
    pub mutation_id: String,
    pub sample_ids: Vec<String>,
    /// Merged record, with the sample id cleared.
    pub record: DataPoint,
}

type ViewportListener = Box<dyn FnMut(&ViewportEvent)>;
type SelectionListener = Box<dyn FnMut(&SelectionEvent)>;

/// Result of one run of the layout pipeline, committed as a whole.
struct Layout {
    tracks: Vec<Track>,
    ref_scale: LinearScale,
    domain_scale: OrdinalBands,
    size: Size,
    diagnostics: Vec<ConfigError>,
}

/// Run grouping, colouring and packing for `inputs`; vertical layout is left to the caller.
fn build_layout(
    config: &Config,
    protein: &Protein,
    inputs: &[TrackInput],
    memo: &mut ClusterMemo,
    revision: u64,
) -> Result<Layout, ConfigError> {
    let mut diagnostics = Vec::new();

    // Validate type tags and labels; broken tracks are skipped.
    let mut labels = IndexSet::new();
    let mut tracks: Vec<(Track, &TrackInput)> = Vec::new();
    for input in inputs {
        match Track::from_input(input, config) {
            Ok(_) if labels.contains(input.label.as_str()) => {
                tracing::warn!("skipping track {:?}: duplicate label", &input.label);
                diagnostics.push(ConfigError::DuplicateTrackLabel(input.label.clone()));
            }
            Ok(track) => {
                labels.insert(input.label.as_str());
                tracks.push((track, input));
            }
            Err(e) => {
                tracing::warn!("skipping track {:?}: {}", &input.label, &e);
                diagnostics.push(e);
            }
        }
    }

    // Keep only records on the protein.
    let spans = [Span {
        start: 0,
        end: protein.length,
    }];
    let getter = CoordinateGetter::Field(config.fields.coordinate.as_str());
    for (track, _) in tracks.iter_mut() {
        let mut regions = build_regions_with_non_coding::<Rc<DataPoint>>(&spans);
        let report = fill_data_into_regions(&mut regions, &track.points, &getter)?;
        tracing::debug!(
            "track {:?}: {} records on the protein, {} discarded",
            &track.label,
            report.assigned.separate_with_commas(),
            report.discarded.separate_with_commas()
        );
        if report.discarded > 0 {
            diagnostics.push(ConfigError::DiscardedRecords {
                track: track.label.clone(),
                count: report.discarded,
            });
        }
        track.points = regions.into_iter().flat_map(|region| region.data).collect();
    }

    let grouper = MutationGrouper::new(config, labels.iter().copied());
    for (track, input) in tracks.iter_mut() {
        let category = input.color_by.as_ref().map(|color_by| &color_by.category);
        let (mutations, report) = grouper.group(&track.points, category);
        tracing::debug!(
            "track {:?}: {} merged mutations at {} locations",
            &track.label,
            report.merged.separate_with_commas(),
            mutations.len().separate_with_commas()
        );
        track.statistics = TrackStatistics::of(&mutations);
        track.mutations = mutations;
    }

    let max_samples = dataset_max_samples(tracks.iter().map(|(track, _)| track));
    for (track, input) in tracks.iter_mut() {
        let Some(color_by_input) = input.color_by.as_ref() else {
            continue;
        };
        match ColorBy::from_input(color_by_input, max_samples) {
            Ok(Some(color_by)) => {
                for mutation in track.mutations.values_mut().flatten() {
                    mutation.bars = Some(color_by.bars(&mutation.samples));
                }
                track.color_by = Some(color_by);
            }
            Ok(None) => (),
            Err(e) => {
                tracing::warn!("drawing track {:?} uncoloured: {}", &track.label, &e);
                diagnostics.push(e);
            }
        }
    }
    let mut tracks = tracks.into_iter().map(|(track, _)| track).collect_vec();

    let ref_scale = LinearScale::new(
        (0.0, protein.length.max(0) as f64),
        (0.0, config.protein_scale.width),
    );
    let domain_scale = OrdinalBands::new(
        protein
            .domains
            .iter()
            .map(|domain| config.protein_domains.key.of(domain)),
        config.signature_height,
    );

    let shape_width = config.mutation_shape_width;
    match config.mutation_layout {
        MutationLayout::BySubtype => {
            for track in tracks.iter_mut() {
                track.clusters = build_location_clusters(&track.mutations, shape_width);
            }
        }
        MutationLayout::AllSubtypes => {
            let key = MemoKey {
                revision,
                labels: tracks.iter().map(|track| track.label.clone()).collect(),
            };
            let shared = memo
                .get_or_build(key, || {
                    let mut merged = merge_locations(tracks.iter().map(|track| &track.mutations));
                    for mutations in merged.values_mut() {
                        grouper.sort(mutations);
                    }
                    build_location_clusters(&merged, shape_width)
                })
                .to_vec();
            for track in tracks.iter_mut() {
                track.clusters = shared.clone();
            }
        }
    }

    let engine = ClusterLayoutEngine::new(config.mutation_groups.padding);
    for track in tracks.iter_mut() {
        track.extent = engine.layout(&mut track.clusters, &ref_scale);
    }

    let resolver = TrackHeightResolver::new(config, &domain_scale);
    let total_height = resolver.cascade(&mut tracks);
    let size = resolver.default_size(&tracks);
    tracing::debug!(
        "{} tracks stacked to {:.1} px, default size {:.1} x {:.1}",
        tracks.len(),
        total_height,
        size.width,
        size.height
    );

    Ok(Layout {
        tracks,
        ref_scale,
        domain_scale,
        size,
        diagnostics,
    })
}

/// The mutation map: data, configuration and everything derived from them.
pub struct SeqPeek {
    config: Config,
    protein: Protein,
    inputs: Vec<TrackInput>,
    tracks: Vec<Track>,
    domain_scale: OrdinalBands,
    viewport: ViewportController,
    size: Size,
    memo: ClusterMemo,
    /// Bumped whenever track data is replaced or added.
    revision: u64,
    renderer: SceneRenderer,
    scene: Option<Scene>,
    diagnostics: Vec<ConfigError>,
    viewport_listeners: Vec<ViewportListener>,
    selection_listeners: Vec<SelectionListener>,
}

impl Default for SeqPeek {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SeqPeek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeqPeek")
            .field("revision", &self.revision)
            .field("tracks", &self.tracks.len())
            .field("viewport", &self.viewport.state())
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl SeqPeek {
    pub fn new() -> Self {
        let config = Config::default();
        Self {
            renderer: SceneRenderer::new(config.enable_transitions),
            config,
            protein: Protein::default(),
            inputs: Vec::new(),
            tracks: Vec::new(),
            domain_scale: OrdinalBands::default(),
            viewport: ViewportController::new(LinearScale::new((0.0, 0.0), (0.0, 0.0))),
            size: Size::default(),
            memo: ClusterMemo::default(),
            revision: 0,
            scene: None,
            diagnostics: Vec::new(),
            viewport_listeners: Vec::new(),
            selection_listeners: Vec::new(),
        }
    }

    /// Replace data and configuration and lay everything out.
    ///
    /// On error, the previous state is kept unchanged.  Tracks with unknown type tags,
    /// unusable colour-by settings and records that cannot be placed on the protein do not
    /// fail the call; they end up in [`Self::diagnostics`].
    pub fn draw(
        &mut self,
        data: VisualizationData,
        config: Config,
    ) -> Result<RenderDiff, ConfigError> {
        let before_draw = Instant::now();
        config.validate()?;

        let revision = self.revision + 1;
        let layout = build_layout(
            &config,
            &data.protein,
            &data.tracks,
            &mut self.memo,
            revision,
        )?;

        let mut viewport = ViewportController::new(layout.ref_scale);
        viewport.set_initial_viewport(layout.tracks.iter().filter_map(|track| track.extent));

        self.renderer.set_transitions(config.enable_transitions);
        self.revision = revision;
        self.config = config;
        self.protein = data.protein;
        self.inputs = data.tracks;
        self.viewport = viewport;
        let diff = self.commit(layout);

        tracing::info!(
            "drew {} tracks in {:?}",
            self.tracks.len(),
            before_draw.elapsed()
        );
        self.notify_viewport();
        Ok(diff)
    }

    /// Add `new_tracks` whose labels are not shown yet, keep only the tracks named in
    /// `order`, sort them by `order` and lay everything out again.
    ///
    /// The viewport is kept.
    pub fn change_tracks(
        &mut self,
        new_tracks: Vec<TrackInput>,
        order: &[String],
    ) -> Result<RenderDiff, ConfigError> {
        let before_change = Instant::now();

        let mut inputs = self.inputs.clone();
        let mut added = false;
        for track in new_tracks {
            if !inputs.iter().any(|known| known.label == track.label) {
                inputs.push(track);
                added = true;
            }
        }
        let position = |label: &str| order.iter().position(|name| name == label);
        inputs.retain(|track| position(&track.label).is_some());
        inputs.sort_by_key(|track| position(&track.label));

        let revision = if added {
            self.revision + 1
        } else {
            self.revision
        };
        let layout = build_layout(
            &self.config,
            &self.protein,
            &inputs,
            &mut self.memo,
            revision,
        )?;

        self.revision = revision;
        self.inputs = inputs;
        let diff = self.commit(layout);
        tracing::info!(
            "changed tracks to [{}] in {:?}",
            self.tracks.iter().map(|track| &track.label).join(", "),
            before_change.elapsed()
        );
        Ok(diff)
    }

    /// Switch mutation stems on or off for all tracks without their own setting.
    ///
    /// Clusters are kept; only the vertical layout and the scene are rebuilt.
    pub fn set_stems(&mut self, enabled: bool) -> RenderDiff {
        self.config.mutation_groups.stems.enabled = enabled;
        for track in self.tracks.iter_mut() {
            let layout = self
                .inputs
                .iter()
                .find(|input| input.label == track.label)
                .and_then(|input| input.layout.as_ref());
            track.toggles = LayoutToggles::resolve(layout, &self.config);
        }

        let resolver = TrackHeightResolver::new(&self.config, &self.domain_scale);
        resolver.cascade(&mut self.tracks);
        self.size = resolver.default_size(&self.tracks);
        self.rebuild_scene()
    }

    /// Size of the drawing including plot paddings.
    pub fn get_size(&self) -> Size {
        self.scene
            .as_ref()
            .map(|scene| scene.size)
            .unwrap_or_default()
    }

    /// Apply a pan or zoom gesture.
    ///
    /// No layout is recomputed: only data transforms and ticks of the scene follow the
    /// new viewport.
    pub fn zoom(&mut self, gesture: ZoomGesture) -> RenderDiff {
        let before = self.viewport.state();
        let after = self.viewport.apply(gesture);

        let Some(scene) = self.scene.as_mut() else {
            return RenderDiff::default();
        };
        let context = SceneContext {
            config: &self.config,
            protein: &self.protein,
            domain_scale: &self.domain_scale,
            viewport: &self.viewport,
            size: self.size,
        };
        context.apply_viewport(scene);
        let diff = self.renderer.render(scene);

        if after != before {
            self.notify_viewport();
        }
        diff
    }

    /// Register a listener for viewport changes.
    pub fn on_viewport_change<F>(&mut self, listener: F)
    where
        F: FnMut(&ViewportEvent) + 'static,
    {
        self.viewport_listeners.push(Box::new(listener));
    }

    /// Register a listener for mutation selection.
    pub fn on_selection<F>(&mut self, listener: F)
    where
        F: FnMut(&SelectionEvent) + 'static,
    {
        self.selection_listeners.push(Box::new(listener));
    }

    /// Select the mutation `mutation_id` at `location` of track `label` and notify the
    /// selection listeners.
    pub fn select_mutation(
        &mut self,
        label: &str,
        location: i64,
        mutation_id: &str,
    ) -> Option<SelectionEvent> {
        let track = self.tracks.iter().find(|track| track.label == label)?;
        let mutation = track
            .mutations
            .get(&location)?
            .iter()
            .find(|mutation| mutation.mutation_id == mutation_id)?;
        let event = SelectionEvent {
            track: track.label.clone(),
            location,
            mutation_id: mutation.mutation_id.clone(),
            sample_ids: mutation.samples.iter().map(|s| s.id.clone()).collect(),
            record: mutation.record.clone(),
        };

        for listener in self.selection_listeners.iter_mut() {
            listener(&event);
        }
        Some(event)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn viewport(&self) -> ViewportState {
        self.viewport.state()
    }

    /// Problems found by the last draw or track change that did not fail it.
    pub fn diagnostics(&self) -> &[ConfigError] {
        &self.diagnostics
    }

    /// Number of times the clusters shared by all tracks were built.
    pub fn shared_cluster_builds(&self) -> usize {
        self.memo.builds()
    }

    fn commit(&mut self, layout: Layout) -> RenderDiff {
        let Layout {
            tracks,
            ref_scale: _,
            domain_scale,
            size,
            diagnostics,
        } = layout;
        self.tracks = tracks;
        self.domain_scale = domain_scale;
        self.size = size;
        self.diagnostics = diagnostics;
        self.rebuild_scene()
    }

    fn rebuild_scene(&mut self) -> RenderDiff {
        let context = SceneContext {
            config: &self.config,
            protein: &self.protein,
            domain_scale: &self.domain_scale,
            viewport: &self.viewport,
            size: self.size,
        };
        let scene = context.build(&self.tracks);
        let diff = self.renderer.render(&scene);
        self.scene = Some(scene);
        diff
    }

    fn notify_viewport(&mut self) {
        if self.viewport_listeners.is_empty() {
            return;
        }
        let event = self.viewport.event();
        for listener in self.viewport_listeners.iter_mut() {
            listener(&event);
        }
    }
}

/// Command line arguments for `layout` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Lay out a SeqPeek mutation map", long_about = None)]
pub struct Args {
    /// Path to the JSON file with protein and tracks.
    #[arg(long)]
    pub path_data: String,
    /// Path to the JSON configuration; defaults are used if not given.
    #[arg(long)]
    pub path_config: Option<String>,
    /// Path to the output JSON file with the laid out scene.
    #[arg(long)]
    pub path_output: String,
    /// Optional path to write an SVG drawing to.
    #[arg(long)]
    pub path_svg: Option<String>,
    /// Zoom factor to set after the initial viewport.
    #[arg(long)]
    pub zoom_scale: Option<f64>,
    /// Horizontal translation to set together with `--zoom-scale`.
    #[arg(long, default_value_t = 0.0)]
    pub zoom_translate: f64,
}

/// What the `layout` sub command writes.
#[serde_with::skip_serializing_none]
#[derive(Debug, serde::Serialize)]
struct Output<'a> {
    size: Size,
    viewport: Option<ViewportEvent>,
    diagnostics: Vec<String>,
    render: &'a RenderDiff,
    scene: Option<&'a Scene>,
}

/// Main entry point for `layout` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    tracing::info!("Loading data...");
    let data: VisualizationData =
        serde_json::from_reader(std::fs::File::open(&args.path_data).map_err(|e| {
            anyhow::anyhow!("could not open data file {}: {}", &args.path_data, e)
        })?)?;
    let config: Config = match &args.path_config {
        Some(path) => serde_json::from_reader(
            std::fs::File::open(path)
                .map_err(|e| anyhow::anyhow!("could not open config file {}: {}", path, e))?,
        )?,
        None => Config::default(),
    };
    tracing::info!(
        "... done loading {} tracks with {} records",
        data.tracks.len().separate_with_commas(),
        data.tracks
            .iter()
            .map(|track| track.mutations.len())
            .sum::<usize>()
            .separate_with_commas()
    );

    let mut seqpeek = SeqPeek::new();
    let viewport_events = Rc::new(std::cell::RefCell::new(Vec::new()));
    {
        let viewport_events = Rc::clone(&viewport_events);
        seqpeek.on_viewport_change(move |event| viewport_events.borrow_mut().push(event.clone()));
    }

    let mut diff = seqpeek.draw(data, config)?;
    tracing::info!(
        "... laid out {} tracks, {} problems",
        seqpeek.tracks().len(),
        seqpeek.diagnostics().len()
    );
    if let Some(scale) = args.zoom_scale {
        diff = seqpeek.zoom(ZoomGesture::Transform {
            scale,
            translate_x: args.zoom_translate,
        });
    }

    tracing::info!("Writing output...");
    let viewport = viewport_events.borrow().last().cloned();
    let output = Output {
        size: seqpeek.get_size(),
        viewport,
        diagnostics: seqpeek.diagnostics().iter().map(|e| e.to_string()).collect(),
        render: &diff,
        scene: seqpeek.scene(),
    };
    let writer = std::fs::File::create(&args.path_output).map_err(|e| {
        anyhow::anyhow!("could not create output file {}: {}", &args.path_output, e)
    })?;
    serde_json::to_writer_pretty(writer, &output)?;

    if let (Some(path_svg), Some(scene)) = (&args.path_svg, seqpeek.scene()) {
        std::fs::write(path_svg, svg::to_svg(scene)?)
            .map_err(|e| anyhow::anyhow!("could not write SVG file {}: {}", path_svg, e))?;
    }

    tracing::info!(
        "All of `layout` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}
