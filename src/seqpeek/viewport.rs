//! Pan and zoom state of the visualization.

use crate::seqpeek::cluster::Extent;
use crate::seqpeek::scale::LinearScale;

/// Number of reference ticks requested from the tick scale.
pub const TICK_COUNT: usize = 20;

/// Horizontal zoom factor and translation applied to all data elements.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ViewportState {
    pub scale: f64,
    pub translate_x: f64,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate_x: 0.0,
        }
    }
}

/// A pan or zoom interaction.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ZoomGesture {
    /// Absolute transform, as reported by a zoom behaviour.
    Transform { scale: f64, translate_x: f64 },
    /// Relative pan by `dx` pixels.
    Pan { dx: f64 },
    /// Relative zoom by `factor` keeping the pixel `anchor_x` fixed.
    Zoom { factor: f64, anchor_x: f64 },
}

/// What viewport-change listeners receive.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ViewportEvent {
    pub state: ViewportState,
    /// Visible coordinate window, clamped to the axis.
    pub visible_start: f64,
    pub visible_end: f64,
}

/// Owns the [`ViewportState`]; the only writer of it.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportController {
    ref_scale: LinearScale,
    protein_length: f64,
    state: ViewportState,
}

impl ViewportController {
    /// `ref_scale` maps coordinates `[0, length]` onto the viewport `[0, width]`.
    pub fn new(ref_scale: LinearScale) -> Self {
        Self {
            ref_scale,
            protein_length: ref_scale.domain.1,
            state: ViewportState::default(),
        }
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn ref_scale(&self) -> &LinearScale {
        &self.ref_scale
    }

    fn width(&self) -> f64 {
        self.ref_scale.range.1
    }

    /// Fit the union of the packed `extents` into the viewport.
    pub fn set_initial_viewport<I>(&mut self, extents: I) -> ViewportState
    where
        I: IntoIterator<Item = Extent>,
    {
        let mut left = 0.0f64;
        let mut right = f64::NEG_INFINITY;
        for extent in extents {
            left = left.min(extent.left);
            right = right.max(extent.right);
        }

        let width = self.width();
        let translate_x = left.min(0.0).abs();
        let viewport_width = translate_x + width.max(right);
        let scale = if viewport_width > 0.0 && viewport_width.is_finite() {
            width / viewport_width
        } else {
            1.0
        };

        self.state = ViewportState { scale, translate_x };
        tracing::debug!(
            "initial viewport: scale {:.4}, translate {:.2}",
            scale,
            translate_x
        );
        self.state
    }

    /// Apply `gesture`; gestures that would produce a non-positive or non-finite scale
    /// are ignored.
    pub fn apply(&mut self, gesture: ZoomGesture) -> ViewportState {
        match gesture {
            ZoomGesture::Transform { scale, translate_x } => self.set_transform(scale, translate_x),
            ZoomGesture::Pan { dx } => self.pan_by(dx),
            ZoomGesture::Zoom { factor, anchor_x } => self.zoom_by(factor, anchor_x),
        }
    }

    pub fn set_transform(&mut self, scale: f64, translate_x: f64) -> ViewportState {
        if scale > 0.0 && scale.is_finite() && translate_x.is_finite() {
            self.state = ViewportState { scale, translate_x };
        } else {
            tracing::warn!("ignoring invalid viewport scale {} / translation {}", scale, translate_x);
        }
        self.state
    }

    pub fn pan_by(&mut self, dx: f64) -> ViewportState {
        let ViewportState { scale, translate_x } = self.state;
        self.set_transform(scale, translate_x + dx)
    }

    pub fn zoom_by(&mut self, factor: f64, anchor_x: f64) -> ViewportState {
        let ViewportState { scale, translate_x } = self.state;
        self.set_transform(scale * factor, anchor_x - (anchor_x - translate_x) * factor)
    }

    /// Scale from visible coordinates to viewport pixels under the current transform.
    pub fn tick_scale(&self) -> LinearScale {
        let ViewportState { scale, translate_x } = self.state;
        let width = self.width();
        let to_coordinate = |x: f64| self.ref_scale.invert((x - translate_x) / scale);
        LinearScale::new(
            (to_coordinate(self.ref_scale.range.0), to_coordinate(width)),
            (0.0, width),
        )
    }

    /// Ticks of the tick scale that lie on the axis.
    pub fn visible_ticks(&self) -> Vec<f64> {
        let length = self.protein_length;
        self.tick_scale()
            .ticks(TICK_COUNT)
            .into_iter()
            .filter(|&tick| (0.0..=length).contains(&tick))
            .collect()
    }

    /// Visible coordinate window clamped to `[0, length]`.
    pub fn visible_coordinates(&self) -> (f64, f64) {
        let (start, end) = self.tick_scale().domain;
        let clamp = |x: f64| x.clamp(0.0, self.protein_length.max(0.0));
        (clamp(start), clamp(end))
    }

    pub fn event(&self) -> ViewportEvent {
        let (visible_start, visible_end) = self.visible_coordinates();
        ViewportEvent {
            state: self.state,
            visible_start,
            visible_end,
        }
    }
}

#[cfg(test)]
mod test {
    use float_cmp::approx_eq;
    use pretty_assertions::assert_eq;

    use super::*;

    fn controller() -> ViewportController {
        ViewportController::new(LinearScale::new((0.0, 100.0), (0.0, 1000.0)))
    }

    #[test]
    fn initial_viewport_fits_everything() {
        let mut vc = controller();

        let state = vc.set_initial_viewport([
            Extent {
                left: -20.0,
                right: 500.0,
            },
            Extent {
                left: 10.0,
                right: 1080.0,
            },
        ]);

        assert_eq!(state.translate_x, 20.0);
        assert!(approx_eq!(f64, state.scale, 1000.0 / 1100.0, ulps = 2));
    }

    #[test]
    fn initial_viewport_inside_axis() {
        let mut vc = controller();

        let state = vc.set_initial_viewport([Extent {
            left: 90.0,
            right: 305.0,
        }]);

        assert_eq!(state, ViewportState::default());
        assert_eq!(vc.set_initial_viewport([]), ViewportState::default());
    }

    #[test]
    fn zero_width_viewport() {
        let mut vc = ViewportController::new(LinearScale::new((0.0, 0.0), (0.0, 0.0)));

        let state = vc.set_initial_viewport([]);

        assert_eq!(state.scale, 1.0);
        assert!(vc.visible_ticks().is_empty());
    }

    #[test]
    fn gestures() {
        let mut vc = controller();

        vc.apply(ZoomGesture::Transform {
            scale: 2.0,
            translate_x: -100.0,
        });
        assert_eq!(
            vc.state(),
            ViewportState {
                scale: 2.0,
                translate_x: -100.0
            }
        );

        vc.apply(ZoomGesture::Pan { dx: 50.0 });
        assert_eq!(vc.state().translate_x, -50.0);

        // zooming around the anchor keeps its coordinate in place
        let before = vc.tick_scale().invert(300.0);
        vc.apply(ZoomGesture::Zoom {
            factor: 2.0,
            anchor_x: 300.0,
        });
        assert_eq!(vc.state().scale, 4.0);
        assert!(approx_eq!(f64, vc.tick_scale().invert(300.0), before, epsilon = 1e-9));
    }

    #[rstest::rstest]
    #[case(0.0, 0.0)]
    #[case(-1.0, 0.0)]
    #[case(f64::NAN, 0.0)]
    #[case(1.0, f64::INFINITY)]
    fn invalid_transform_ignored(#[case] scale: f64, #[case] translate_x: f64) {
        let mut vc = controller();
        vc.set_transform(3.0, 7.0);

        let state = vc.set_transform(scale, translate_x);

        assert_eq!(
            state,
            ViewportState {
                scale: 3.0,
                translate_x: 7.0
            }
        );
    }

    #[test]
    fn gesture_tokens() {
        serde_test::assert_tokens(
            &ZoomGesture::Pan { dx: 2.5 },
            &[
                serde_test::Token::Struct {
                    name: "ZoomGesture",
                    len: 2,
                },
                serde_test::Token::Str("kind"),
                serde_test::Token::Str("pan"),
                serde_test::Token::Str("dx"),
                serde_test::Token::F64(2.5),
                serde_test::Token::StructEnd,
            ],
        );
    }

    #[test]
    fn tick_scale_under_zoom() {
        let mut vc = controller();
        vc.set_transform(2.0, -500.0);

        let ticks = vc.visible_ticks();

        assert_eq!(vc.tick_scale().domain, (25.0, 75.0));
        assert_eq!(ticks.len(), 25);
        assert_eq!(ticks.first(), Some(&26.0));
        assert_eq!(ticks.last(), Some(&74.0));
        assert_eq!(vc.visible_coordinates(), (25.0, 75.0));
    }

    #[test]
    fn ticks_clamped_to_axis() {
        let mut vc = controller();
        vc.set_transform(0.5, 0.0);

        let ticks = vc.visible_ticks();

        assert_eq!(vc.tick_scale().domain, (0.0, 200.0));
        assert_eq!(ticks.first(), Some(&0.0));
        assert_eq!(ticks.last(), Some(&100.0));
        assert_eq!(vc.event().visible_end, 100.0);
    }
}
