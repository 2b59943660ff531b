//! Coding/non-coding region spans along the coordinate axis.

use crate::err::ConfigError;
use crate::seqpeek::schema::DataPoint;

/// Kind of a region span.
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
pub enum RegionKind {
    Exon,
    Noncoding,
}

/// Inclusive coordinate span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Span {
    pub start: i64,
    pub end: i64,
}

/// Explicitly typed span; `None` bounds make the span half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RegionInput {
    #[serde(rename = "type")]
    pub kind: RegionKind,
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub end: Option<i64>,
}

/// One contiguous region together with the data points that fell into it.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSpan<T> {
    pub kind: RegionKind,
    /// First coordinate (inclusive); `None` for a region unbounded to the left.
    pub start: Option<i64>,
    /// Last coordinate (inclusive); `None` for a region unbounded to the right.
    pub end: Option<i64>,
    pub data: Vec<T>,
}

impl<T> RegionSpan<T> {
    pub fn new(kind: RegionKind, start: Option<i64>, end: Option<i64>) -> Self {
        Self {
            kind,
            start,
            end,
            data: Vec::new(),
        }
    }

    /// Whether `coordinate` lies in the region; missing bounds compare one-sided.
    pub fn belongs(&self, coordinate: i64) -> bool {
        match (self.start, self.end) {
            (None, None) => true,
            (None, Some(end)) => coordinate <= end,
            (Some(start), None) => coordinate >= start,
            (Some(start), Some(end)) => start <= coordinate && coordinate <= end,
        }
    }
}

/// Build exon spans from ascending, non-overlapping `spans`, inserting a non-coding span
/// into every gap of at least one coordinate.
pub fn build_regions_with_non_coding<T>(spans: &[Span]) -> Vec<RegionSpan<T>> {
    let mut result = Vec::with_capacity(spans.len() * 2);
    let mut last_end: Option<i64> = None;

    for span in spans {
        if let Some(last_end) = last_end {
            if span.start - last_end > 1 {
                result.push(RegionSpan::new(
                    RegionKind::Noncoding,
                    Some(last_end + 1),
                    Some(span.start - 1),
                ));
            }
        }
        result.push(RegionSpan::new(
            RegionKind::Exon,
            Some(span.start),
            Some(span.end),
        ));
        last_end = Some(span.end);
    }

    result
}

/// Build spans of explicitly given kinds.
pub fn build_regions_from_array<T>(regions: &[RegionInput]) -> Vec<RegionSpan<T>> {
    regions
        .iter()
        .map(|region| RegionSpan::new(region.kind, region.start, region.end))
        .collect()
}

/// Make the first region unbounded to the left and the last unbounded to the right.
pub fn with_open_boundaries<T>(mut regions: Vec<RegionSpan<T>>) -> Vec<RegionSpan<T>> {
    if let Some(first) = regions.first_mut() {
        first.start = None;
    }
    if let Some(last) = regions.last_mut() {
        last.end = None;
    }
    regions
}

/// Obtain the coordinate of a data point.
pub enum CoordinateGetter<'a, T> {
    /// Name of an integer field.
    Field(&'a str),
    /// Arbitrary accessor.
    Func(&'a dyn Fn(&T) -> Option<i64>),
}

impl<T> std::fmt::Debug for CoordinateGetter<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinateGetter::Field(name) => f.debug_tuple("Field").field(name).finish(),
            CoordinateGetter::Func(_) => f.write_str("Func(..)"),
        }
    }
}

/// Records whose fields a [`CoordinateGetter::Field`] can read.
pub trait HasFields {
    fn field_i64(&self, name: &str) -> Option<i64>;
}

impl HasFields for DataPoint {
    fn field_i64(&self, name: &str) -> Option<i64> {
        self.get_i64(name)
    }
}

impl<T: HasFields> HasFields for std::rc::Rc<T> {
    fn field_i64(&self, name: &str) -> Option<i64> {
        self.as_ref().field_i64(name)
    }
}

impl<T: HasFields> CoordinateGetter<'_, T> {
    fn coordinate(&self, point: &T) -> Option<i64> {
        match self {
            CoordinateGetter::Field(name) => point.field_i64(name),
            CoordinateGetter::Func(func) => func(point),
        }
    }

    fn describe(&self) -> String {
        match self {
            CoordinateGetter::Field(name) => (*name).to_owned(),
            CoordinateGetter::Func(_) => String::from("<function>"),
        }
    }
}

/// Outcome of [`fill_data_into_regions`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillReport {
    pub assigned: usize,
    pub discarded: usize,
}

/// Assign each point to the first region it belongs to.
///
/// Points outside of all regions and points for which the getter yields no coordinate are
/// counted as discarded.  An empty field name is rejected before `regions` is touched.
pub fn fill_data_into_regions<T: HasFields + Clone>(
    regions: &mut [RegionSpan<T>],
    points: &[T],
    getter: &CoordinateGetter<'_, T>,
) -> Result<FillReport, ConfigError> {
    if matches!(getter, CoordinateGetter::Field(name) if name.is_empty()) {
        return Err(ConfigError::InvalidCoordinateGetter(getter.describe()));
    }

    let mut report = FillReport::default();
    let mut missing = 0;
    for point in points {
        let Some(coordinate) = getter.coordinate(point) else {
            missing += 1;
            continue;
        };
        match regions.iter_mut().find(|region| region.belongs(coordinate)) {
            Some(region) => {
                region.data.push(point.clone());
                report.assigned += 1;
            }
            None => report.discarded += 1,
        }
    }

    if missing > 0 {
        tracing::warn!(
            "{} data points have no integer coordinate {:?}",
            missing,
            getter.describe()
        );
    }
    report.discarded += missing;
    if report.discarded > 0 {
        tracing::warn!(
            "{} data points do not match into any region",
            report.discarded
        );
    }

    Ok(report)
}
