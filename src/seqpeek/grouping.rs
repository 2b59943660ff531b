//! Grouping of mutation records by coordinate and consolidation into mutation ids.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::seqpeek::category::CategoryKey;
use crate::seqpeek::color_by::BarStack;
use crate::seqpeek::schema::{Config, DataPoint, FieldNames};

/// A sample exhibiting a merged mutation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SampleRef {
    pub id: String,
    /// Colour-by category of the contributing record.
    pub category: Option<String>,
}

/// All records with the same coordinate and mutation id, merged into one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedMutation {
    pub mutation_id: String,
    pub location: i64,
    pub mutation_type: Option<String>,
    pub subtype: Option<String>,
    /// Copy of the first contributing record with the sample id cleared to `null`.
    pub record: DataPoint,
    /// Samples in input order.
    pub samples: Vec<SampleRef>,
    /// The contributing records.
    pub sources: Vec<Rc<DataPoint>>,
    /// Colour-by bars, when the owning track is coloured.
    pub bars: Option<BarStack>,
}

/// Merged mutations by coordinate, coordinates ascending.
pub type MutationsByLocation = BTreeMap<i64, Vec<MergedMutation>>;

/// Outcome counters of one grouping call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupingReport {
    pub merged: usize,
    /// Records without an integer coordinate or without a classifying key.
    pub skipped: usize,
}

/// Groups records by coordinate and merges them by a classifying key.
pub struct MutationGrouper<'a> {
    fields: &'a FieldNames,
    mutation_rank: IndexMap<&'a str, usize>,
    subtype_rank: IndexMap<String, usize>,
    key_fn: Option<&'a dyn Fn(&DataPoint) -> Option<String>>,
}

impl<'a> MutationGrouper<'a> {
    /// Grouper ranking subtypes by the order of `track_labels`.
    pub fn new<I, S>(config: &'a Config, track_labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut mutation_rank = IndexMap::new();
        for (i, mutation_type) in config.mutation_order.iter().enumerate() {
            mutation_rank.entry(mutation_type.as_str()).or_insert(i);
        }
        let mut subtype_rank = IndexMap::new();
        for (i, label) in track_labels.into_iter().enumerate() {
            subtype_rank.entry(label.into()).or_insert(i);
        }

        Self {
            fields: &config.fields,
            mutation_rank,
            subtype_rank,
            key_fn: None,
        }
    }

    /// Use `key_fn` instead of the mutation id field as the classifying key.
    pub fn with_key(mut self, key_fn: &'a dyn Fn(&DataPoint) -> Option<String>) -> Self {
        self.key_fn = Some(key_fn);
        self
    }

    fn key_of(&self, point: &DataPoint) -> Option<String> {
        match self.key_fn {
            Some(key_fn) => key_fn(point),
            None => point.get_str(&self.fields.mutation_id),
        }
    }

    /// Group `points` by coordinate and merge by classifying key.
    ///
    /// Within a coordinate, entries are ordered by [`Self::compare`]; ties keep their
    /// first-seen order.
    pub fn group(
        &self,
        points: &[Rc<DataPoint>],
        category: Option<&CategoryKey>,
    ) -> (MutationsByLocation, GroupingReport) {
        let mut report = GroupingReport::default();
        let mut merged: IndexMap<(i64, String), MergedMutation> = IndexMap::new();

        for point in points {
            let location = point.get_i64(&self.fields.coordinate);
            let key = self.key_of(point);
            let (Some(location), Some(key)) = (location, key) else {
                report.skipped += 1;
                continue;
            };

            let sample = SampleRef {
                id: point.get_str(&self.fields.sample_id).unwrap_or_default(),
                category: category.and_then(|category| category.classify(point)),
            };
            let entry = merged.entry((location, key.clone())).or_insert_with(|| {
                let mut record = point.as_ref().clone();
                record.set_null(&self.fields.sample_id);
                MergedMutation {
                    mutation_id: key,
                    location,
                    mutation_type: point.get_str(&self.fields.mutation_type),
                    subtype: point.get_str(&self.fields.subtype),
                    record,
                    samples: Vec::new(),
                    sources: Vec::new(),
                    bars: None,
                }
            });
            entry.samples.push(sample);
            entry.sources.push(Rc::clone(point));
        }

        report.merged = merged.len();
        if report.skipped > 0 {
            tracing::warn!(
                "{} records without coordinate or mutation id were skipped",
                report.skipped
            );
        }

        let mut result = MutationsByLocation::new();
        for ((location, _), mutation) in merged {
            result.entry(location).or_default().push(mutation);
        }
        for mutations in result.values_mut() {
            self.sort(mutations);
        }

        (result, report)
    }

    /// Order two entries of one coordinate.
    ///
    /// The primary key is the rank of the mutation type in `mutation_order`, the secondary
    /// key the rank of the subtype in the track order.  If either entry has an unranked
    /// mutation type, the two compare equal.
    pub fn compare(&self, a: &MergedMutation, b: &MergedMutation) -> Ordering {
        let rank = |m: &MergedMutation| {
            m.mutation_type
                .as_deref()
                .and_then(|t| self.mutation_rank.get(t).copied())
        };
        let (Some(rank_a), Some(rank_b)) = (rank(a), rank(b)) else {
            return Ordering::Equal;
        };

        rank_a.cmp(&rank_b).then_with(|| {
            let subtype = |m: &MergedMutation| {
                m.subtype
                    .as_deref()
                    .and_then(|s| self.subtype_rank.get(s).copied())
            };
            match (subtype(a), subtype(b)) {
                (Some(sa), Some(sb)) => sa.cmp(&sb),
                _ => Ordering::Equal,
            }
        })
    }

    /// Sort the entries of one coordinate with [`Self::compare`].
    pub fn sort(&self, mutations: &mut [MergedMutation]) {
        insertion_sort_by(mutations, |a, b| self.compare(a, b));
    }
}

/// Stable insertion sort; `compare` need not be a total order.
fn insertion_sort_by<T, F>(items: &mut [T], mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    for i in 1..items.len() {
        let mut j = i;
        while j > 0 && compare(&items[j - 1], &items[j]) == Ordering::Greater {
            items.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// Concatenate the groups of several tracks per coordinate, in track order.
pub fn merge_locations<'b, I>(tracks: I) -> MutationsByLocation
where
    I: IntoIterator<Item = &'b MutationsByLocation>,
{
    let mut result = MutationsByLocation::new();
    for by_location in tracks {
        for (location, mutations) in by_location {
            result
                .entry(*location)
                .or_default()
                .extend(mutations.iter().cloned());
        }
    }
    result
}

#[cfg(test)]
pub(crate) mod test {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    pub fn record(location: i64, sample: &str, mutation_id: &str, mutation_type: &str) -> Rc<DataPoint> {
        Rc::new(
            [
                ("location", json!(location)),
                ("sample_id", json!(sample)),
                ("mutation_id", json!(mutation_id)),
                ("mutation_type", json!(mutation_type)),
            ]
            .into_iter()
            .collect(),
        )
    }

    fn with_subtype(point: Rc<DataPoint>, subtype: &str) -> Rc<DataPoint> {
        let mut point = point.as_ref().clone();
        point
            .fields
            .insert("cancer_subtype".into(), json!(subtype));
        Rc::new(point)
    }

    #[test]
    fn group_and_merge() {
        let config = Config::default();
        let grouper = MutationGrouper::new(&config, ["B"]);
        let points = vec![
            record(100, "S1", "m1", "Missense"),
            record(100, "S2", "m1", "Missense"),
            record(100, "S3", "m2", "Silent"),
            record(300, "S4", "m3", "Missense"),
            record(100, "S5", "m1", "Missense"),
        ];

        let (by_location, report) = grouper.group(&points, None);

        assert_eq!(report, GroupingReport { merged: 3, skipped: 0 });
        assert_eq!(by_location.keys().copied().collect::<Vec<_>>(), vec![100, 300]);
        let at_100 = &by_location[&100];
        assert_eq!(
            at_100.iter().map(|m| m.mutation_id.as_str()).collect::<Vec<_>>(),
            vec!["m1", "m2"]
        );
        assert_eq!(
            at_100[0].samples.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            vec!["S1", "S2", "S5"]
        );
        assert_eq!(at_100[0].record.get("sample_id"), Some(&serde_json::Value::Null));
        assert_eq!(at_100[0].record.get_str("mutation_type"), Some("Missense".into()));
        assert_eq!(at_100[0].sources.len(), 3);
        assert!(Rc::ptr_eq(&at_100[0].sources[0], &points[0]));
    }

    #[test]
    fn grouping_is_deterministic() {
        let config = Config::default();
        let grouper = MutationGrouper::new(&config, ["B"]);
        let points = vec![
            record(7, "S1", "a", "X"),
            record(7, "S2", "b", "Y"),
            record(7, "S3", "a", "X"),
            record(2, "S1", "c", "X"),
        ];

        let (first, _) = grouper.group(&points, None);
        let (second, _) = grouper.group(&points, None);

        assert_eq!(first, second);
    }

    #[test]
    fn skips_records_without_coordinate() {
        let config = Config::default();
        let grouper = MutationGrouper::new(&config, Vec::<String>::new());
        let broken: Rc<DataPoint> = Rc::new(
            [("sample_id", json!("S1")), ("mutation_id", json!("m"))]
                .into_iter()
                .collect(),
        );

        let (by_location, report) = grouper.group(&[broken, record(1, "S2", "m", "T")], None);

        assert_eq!(report, GroupingReport { merged: 1, skipped: 1 });
        assert_eq!(by_location.len(), 1);
    }

    #[test]
    fn custom_key_merges_by_type() {
        let config = Config::default();
        let key_fn = |p: &DataPoint| p.get_str("mutation_type");
        let grouper = MutationGrouper::new(&config, ["B"]).with_key(&key_fn);
        let points = vec![
            record(100, "S1", "m1", "Missense"),
            record(100, "S2", "m2", "Missense"),
        ];

        let (by_location, _) = grouper.group(&points, None);

        assert_eq!(by_location[&100].len(), 1);
        assert_eq!(by_location[&100][0].mutation_id, "Missense");
        assert_eq!(by_location[&100][0].samples.len(), 2);
    }

    #[test]
    fn sort_by_mutation_order_then_subtype() {
        let config = Config {
            mutation_order: vec!["Nonsense".into(), "Missense".into(), "Silent".into()],
            ..Default::default()
        };
        let grouper = MutationGrouper::new(&config, ["LUAD", "BRCA"]);
        let points = vec![
            record(5, "S1", "silent", "Silent"),
            with_subtype(record(5, "S2", "mis-brca", "Missense"), "BRCA"),
            with_subtype(record(5, "S3", "mis-luad", "Missense"), "LUAD"),
            record(5, "S4", "nonsense", "Nonsense"),
        ];

        let (by_location, _) = grouper.group(&points, None);

        assert_eq!(
            by_location[&5]
                .iter()
                .map(|m| m.mutation_id.as_str())
                .collect::<Vec<_>>(),
            vec!["nonsense", "mis-luad", "mis-brca", "silent"]
        );
    }

    #[test]
    fn unranked_types_are_ties() {
        let config = Config {
            mutation_order: vec!["Missense".into()],
            ..Default::default()
        };
        let grouper = MutationGrouper::new(&config, ["B"]);
        let points = vec![
            record(5, "S1", "u1", "Unknown"),
            record(5, "S2", "m1", "Missense"),
            record(5, "S3", "u2", "Other"),
        ];

        let (by_location, _) = grouper.group(&points, None);

        assert_eq!(
            by_location[&5]
                .iter()
                .map(|m| m.mutation_id.as_str())
                .collect::<Vec<_>>(),
            vec!["u1", "m1", "u2"]
        );
    }

    #[test]
    fn samples_carry_categories() {
        let config = Config::default();
        let grouper = MutationGrouper::new(&config, ["B"]);
        let mut point = record(1, "S1", "m", "T").as_ref().clone();
        point.fields.insert("value".into(), json!("female"));

        let (by_location, _) = grouper.group(&[Rc::new(point)], Some(&CategoryKey::default()));

        assert_eq!(
            by_location[&1][0].samples,
            vec![SampleRef {
                id: "S1".into(),
                category: Some("female".into())
            }]
        );
    }

    #[test]
    fn merge_locations_concatenates() {
        let config = Config::default();
        let grouper = MutationGrouper::new(&config, ["A", "B"]);
        let (a, _) = grouper.group(&[record(1, "S1", "x", "T"), record(2, "S2", "y", "T")], None);
        let (b, _) = grouper.group(&[record(2, "S3", "z", "T")], None);

        let merged = merge_locations([&a, &b]);

        assert_eq!(merged[&1].len(), 1);
        assert_eq!(
            merged[&2]
                .iter()
                .map(|m| m.mutation_id.as_str())
                .collect::<Vec<_>>(),
            vec!["y", "z"]
        );
    }
}
