//! Colour-by bar stacks for aggregate track rendering.

use indexmap::IndexMap;

use crate::err::ConfigError;
use crate::seqpeek::category::CategoryKey;
use crate::seqpeek::grouping::SampleRef;
use crate::seqpeek::scale::LogScale;
use crate::seqpeek::schema::ColorByInput;

/// Lower end of the pixel range of the log scales.
const LOG_RANGE_START: f64 = 5.0;
/// Minimal height of one unscaled bar in the stacked log modes.
const MIN_BAR_HEIGHT: f64 = 1.0;

/// How the bar heights of one stack are derived from the category counts.
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
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BarMode {
    /// Proportional stack: `count / total * max_height`.
    Fract,
    /// Proportional stack, rescaled so its total follows `log10(1..total)`.
    Log10n,
    /// Each bar follows `log10(1..max_samples)` of the dataset.
    Log10naggr,
    /// Like `Log10n` with per-category denominators.
    Log10nnorm,
}

/// Parse a `color_by.type` tag; `none` yields `Ok(None)`.
pub fn parse_color_by_type(tag: &str) -> Result<Option<BarMode>, ConfigError> {
    if tag == "none" {
        return Ok(None);
    }
    tag.parse::<BarMode>()
        .map(Some)
        .map_err(|_| ConfigError::UnknownColorByType(tag.to_owned()))
}

/// Validated colour-by settings of one track.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ColorBy {
    pub mode: BarMode,
    pub group_names: Vec<String>,
    pub max_height: f64,
    pub colors: IndexMap<String, String>,
    pub category: CategoryKey,
    pub category_sizes: IndexMap<String, f64>,
    pub category_sum: f64,
    pub max_samples: Option<usize>,
}

impl ColorBy {
    /// Validate `input`.
    ///
    /// `fallback_max_samples` is used for `log10naggr` when the input does not carry
    /// `max_samples` itself.  Returns `Ok(None)` for the `none` type.
    pub fn from_input(
        input: &ColorByInput,
        fallback_max_samples: Option<usize>,
    ) -> Result<Option<Self>, ConfigError> {
        let Some(mode) = parse_color_by_type(&input.color_by_type)? else {
            return Ok(None);
        };
        if !input.max_height.is_finite() || input.max_height < 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "color_by.max_height",
                value: input.max_height,
            });
        }
        let max_samples = input.max_samples.or(fallback_max_samples);
        if mode == BarMode::Log10naggr && max_samples.is_none() {
            return Err(ConfigError::MissingMaxSamples);
        }

        Ok(Some(Self {
            mode,
            group_names: input.group_names.clone(),
            max_height: input.max_height,
            colors: input.colors.clone(),
            category: input.category.clone(),
            category_sizes: input.category_sizes.clone(),
            category_sum: input
                .category_sum
                .unwrap_or_else(|| input.category_sizes.values().sum()),
            max_samples,
        }))
    }

    fn color_of(&self, category: &str) -> String {
        self.colors
            .get(category)
            .cloned()
            .unwrap_or_else(|| self.category.default_color(category).to_owned())
    }

    /// Compute the bar stack of one merged mutation.
    ///
    /// Bars follow the order of `group_names`; categories not listed there are counted but
    /// not drawn.  An empty sample list yields an empty stack of height zero.
    pub fn bars(&self, samples: &[SampleRef]) -> BarStack {
        let counts = count_categories(samples);
        let total: usize = counts.values().sum();
        if total == 0 {
            return BarStack {
                counts,
                ..Default::default()
            };
        }

        let present = || {
            self.group_names.iter().filter_map(|name| {
                counts
                    .get(name)
                    .copied()
                    .filter(|&n| n > 0)
                    .map(|n| (name, n))
            })
        };
        let max_height = self.max_height;
        let total_f = total as f64;

        let heights: Vec<(&String, f64)> = match self.mode {
            BarMode::Fract => present()
                .map(|(name, n)| (name, n as f64 / total_f * max_height))
                .collect(),
            BarMode::Log10n => {
                let category_max_height = max_height / counts.len() as f64;
                let raw = present()
                    .map(|(name, n)| {
                        let height = (category_max_height * (n as f64 / total_f)).max(MIN_BAR_HEIGHT);
                        (name, height)
                    })
                    .collect();
                rescale_to_log_total(raw, LogScale::new((1.0, total_f), (LOG_RANGE_START, max_height)))
            }
            BarMode::Log10naggr => {
                let max_samples = self.max_samples.unwrap_or(total) as f64;
                let scale = LogScale::new((1.0, max_samples), (LOG_RANGE_START, max_height));
                present()
                    .map(|(name, n)| (name, scale.apply(n as f64)))
                    .collect()
            }
            BarMode::Log10nnorm => {
                let category_max_height = if self.category_sizes.is_empty() {
                    0.0
                } else {
                    max_height / self.category_sizes.len() as f64
                };
                let raw = present()
                    .map(|(name, n)| {
                        let ratio = match self.category_sizes.get(name) {
                            Some(&size) if size > 0.0 && size.is_finite() => n as f64 / size,
                            _ => 0.0,
                        };
                        (name, (category_max_height * ratio).max(MIN_BAR_HEIGHT))
                    })
                    .collect();
                rescale_to_log_total(
                    raw,
                    LogScale::new((1.0, self.category_sum), (LOG_RANGE_START, max_height)),
                )
            }
        };

        let mut stack = BarStack {
            counts,
            ..Default::default()
        };
        for (name, height) in heights {
            stack.bars.push(Bar {
                category: name.clone(),
                color: self.color_of(name),
                y: stack.total_height,
                height,
            });
            stack.total_height += height;
        }
        stack
    }
}

/// Scale all heights by `log_scale(sum) / sum`; empty or zero stacks stay empty.
fn rescale_to_log_total(raw: Vec<(&String, f64)>, log_scale: LogScale) -> Vec<(&String, f64)> {
    let sum: f64 = raw.iter().map(|(_, h)| h).sum();
    if sum <= 0.0 || !sum.is_finite() {
        return Vec::new();
    }
    let k = log_scale.apply(sum) / sum;
    raw.into_iter().map(|(name, h)| (name, k * h)).collect()
}

/// Number of samples per category, in first-seen order; samples without a category are
/// not counted.
pub fn count_categories(samples: &[SampleRef]) -> IndexMap<String, usize> {
    let mut counts = IndexMap::new();
    for category in samples.iter().filter_map(|s| s.category.as_ref()) {
        *counts.entry(category.clone()).or_insert(0) += 1;
    }
    counts
}

/// One bar of a stack, in the track's data space (`y` grows away from the baseline).
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Bar {
    pub category: String,
    pub color: String,
    pub y: f64,
    pub height: f64,
}

/// The bars of one merged mutation.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct BarStack {
    pub bars: Vec<Bar>,
    /// Sum of the bar heights.
    pub total_height: f64,
    /// Samples per category.
    pub counts: IndexMap<String, usize>,
}

#[cfg(test)]
mod test {
    use float_cmp::approx_eq;
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    use super::*;

    fn input(color_by_type: &str) -> ColorByInput {
        ColorByInput {
            color_by_type: color_by_type.into(),
            group_names: vec!["A".into(), "B".into()],
            max_height: 100.0,
            colors: [("A".to_string(), "red".to_string())].into_iter().collect(),
            category: CategoryKey::default(),
            category_sizes: IndexMap::new(),
            category_sum: None,
            max_samples: None,
        }
    }

    fn samples(counts: &[(&str, usize)]) -> Vec<SampleRef> {
        let mut result = Vec::new();
        for (category, n) in counts {
            for i in 0..*n {
                result.push(SampleRef {
                    id: format!("{}-{}", category, i),
                    category: Some(category.to_string()),
                });
            }
        }
        result
    }

    fn stacked_correctly(stack: &BarStack) -> bool {
        let mut y = 0.0;
        for bar in &stack.bars {
            if !approx_eq!(f64, bar.y, y, epsilon = 1e-9) {
                return false;
            }
            y += bar.height;
        }
        approx_eq!(f64, y, stack.total_height, epsilon = 1e-9)
    }

    #[rstest::rstest]
    #[case("none", None)]
    #[case("fract", Some(BarMode::Fract))]
    #[case("log10n", Some(BarMode::Log10n))]
    #[case("log10naggr", Some(BarMode::Log10naggr))]
    #[case("log10nnorm", Some(BarMode::Log10nnorm))]
    fn parse_types(#[case] tag: &str, #[case] expected: Option<BarMode>) -> Result<(), anyhow::Error> {
        assert_eq!(parse_color_by_type(tag)?, expected);

        Ok(())
    }

    #[test]
    fn unknown_type_rejected() {
        assert_eq!(
            ColorBy::from_input(&input("log2n"), None),
            Err(ConfigError::UnknownColorByType("log2n".into()))
        );
    }

    #[test]
    fn aggregate_requires_max_samples() -> Result<(), anyhow::Error> {
        assert_eq!(
            ColorBy::from_input(&input("log10naggr"), None),
            Err(ConfigError::MissingMaxSamples)
        );
        let color_by = ColorBy::from_input(&input("log10naggr"), Some(12))?;
        assert_eq!(color_by.and_then(|c| c.max_samples), Some(12));

        Ok(())
    }

    #[test]
    fn fract() -> Result<(), anyhow::Error> {
        let color_by = ColorBy::from_input(&input("fract"), None)?.ok_or(anyhow::anyhow!("none"))?;
        let stack = color_by.bars(&samples(&[("B", 1), ("A", 3), ("C", 4)]));

        assert_eq!(
            stack.bars,
            vec![
                Bar {
                    category: "A".into(),
                    color: "red".into(),
                    y: 0.0,
                    height: 37.5,
                },
                Bar {
                    category: "B".into(),
                    color: crate::seqpeek::category::UNKNOWN_CATEGORY_COLOR.into(),
                    y: 37.5,
                    height: 12.5,
                },
            ]
        );
        assert_eq!(stack.total_height, 50.0);
        assert_eq!(stack.counts.get("C"), Some(&4));

        Ok(())
    }

    #[test]
    fn log10n() -> Result<(), anyhow::Error> {
        let color_by = ColorBy::from_input(&input("log10n"), None)?.ok_or(anyhow::anyhow!("none"))?;
        let stack = color_by.bars(&samples(&[("A", 9), ("B", 1)]));

        // raw heights 45 and 5, total 50 rescaled through log10 over (1, 10)
        let expected_total = 5.0 + 95.0 * 50f64.log10();
        assert!(approx_eq!(f64, stack.total_height, expected_total, epsilon = 1e-9));
        assert!(approx_eq!(f64, stack.bars[0].height, expected_total * 0.9, epsilon = 1e-9));
        assert!(stacked_correctly(&stack));

        Ok(())
    }

    #[test]
    fn log10n_small_bars_get_minimum_height() -> Result<(), anyhow::Error> {
        let color_by = ColorBy::from_input(&input("log10n"), None)?.ok_or(anyhow::anyhow!("none"))?;
        let stack = color_by.bars(&samples(&[("A", 999), ("B", 1)]));

        // 50 * 1/1000 is below the minimum of one pixel
        let raw_total = 50.0 * 0.999 + 1.0;
        let k = stack.total_height / raw_total;
        assert!(approx_eq!(f64, stack.bars[1].height, k, epsilon = 1e-9));

        Ok(())
    }

    #[test]
    fn log10naggr() -> Result<(), anyhow::Error> {
        let mut raw = input("log10naggr");
        raw.max_height = 105.0;
        raw.max_samples = Some(100);
        let color_by = ColorBy::from_input(&raw, None)?.ok_or(anyhow::anyhow!("none"))?;
        let stack = color_by.bars(&samples(&[("A", 10), ("B", 1)]));

        assert!(approx_eq!(f64, stack.bars[0].height, 55.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, stack.bars[1].height, 5.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, stack.total_height, 60.0, epsilon = 1e-9));

        Ok(())
    }

    #[test]
    fn log10nnorm() -> Result<(), anyhow::Error> {
        let mut raw = input("log10nnorm");
        raw.category_sizes = [("A".to_string(), 100.0), ("B".to_string(), 10.0)]
            .into_iter()
            .collect();
        let color_by = ColorBy::from_input(&raw, None)?.ok_or(anyhow::anyhow!("none"))?;
        assert_eq!(color_by.category_sum, 110.0);
        let stack = color_by.bars(&samples(&[("A", 10), ("B", 5)]));

        // raw heights 5 and 25
        let expected_total = 5.0 + 95.0 * 30f64.log10() / 110f64.log10();
        assert!(approx_eq!(f64, stack.total_height, expected_total, epsilon = 1e-9));
        assert!(approx_eq!(
            f64,
            stack.bars[1].height / stack.bars[0].height,
            5.0,
            epsilon = 1e-9
        ));
        assert!(stacked_correctly(&stack));

        Ok(())
    }

    #[test]
    fn zero_samples_yield_empty_stack() -> Result<(), anyhow::Error> {
        for mode in BarMode::iter() {
            let mut raw = input(&mode.to_string());
            raw.max_samples = Some(10);
            let color_by = ColorBy::from_input(&raw, None)?.ok_or(anyhow::anyhow!("none"))?;

            let stack = color_by.bars(&[]);

            assert!(stack.bars.is_empty(), "{}", mode);
            assert_eq!(stack.total_height, 0.0, "{}", mode);
        }

        Ok(())
    }

    #[test]
    fn uncategorized_samples_only_yield_empty_stack() -> Result<(), anyhow::Error> {
        let samples = vec![SampleRef {
            id: "S1".into(),
            category: None,
        }];
        for mode in BarMode::iter() {
            let mut raw = input(&mode.to_string());
            raw.max_samples = Some(10);
            let color_by = ColorBy::from_input(&raw, None)?.ok_or(anyhow::anyhow!("none"))?;

            let stack = color_by.bars(&samples);

            assert!(stack.bars.is_empty());
            assert!(stack.total_height.is_finite());
        }

        Ok(())
    }

    #[test]
    fn degenerate_normalisation_is_finite() -> Result<(), anyhow::Error> {
        let mut raw = input("log10nnorm");
        raw.category_sizes = [("A".to_string(), 0.0)].into_iter().collect();
        let color_by = ColorBy::from_input(&raw, None)?.ok_or(anyhow::anyhow!("none"))?;

        let stack = color_by.bars(&samples(&[("A", 3)]));

        assert!(stack.bars.iter().all(|bar| bar.height.is_finite()));
        assert!(stack.total_height.is_finite());

        Ok(())
    }
}
