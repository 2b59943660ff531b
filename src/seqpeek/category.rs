//! Classification of mutation records into colour-by categories.

use crate::seqpeek::schema::DataPoint;

/// Field holding the DNA change (`"<ref>-><alt>"`).
pub const DNA_CHANGE_FIELD: &str = "dna_change";
/// Field holding the mutated amino acid.
pub const AMINO_ACID_MUTATION_FIELD: &str = "amino_acid_mutation";
/// Field holding the wild-type amino acid.
pub const AMINO_ACID_WILDTYPE_FIELD: &str = "amino_acid_wildtype";

/// Colour used for categories without a configured colour.
pub const UNKNOWN_CATEGORY_COLOR: &str = "rgba(170,170,170,1.0)";

/// How the colour-by category of a record is derived.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "field", rename_all = "snake_case")]
pub enum CategoryKey {
    /// Value of a record field.
    Field(String),
    /// Class of the DNA change, see [`dna_change_class`].
    DnaChange,
    /// `"<mutated>-<wildtype>"` amino acids.
    ProteinChange,
    /// Lesk group of the mutated amino acid, see [`LeskGroup`].
    LeskAminoAcid,
}

impl Default for CategoryKey {
    fn default() -> Self {
        CategoryKey::Field(String::from("value"))
    }
}

impl CategoryKey {
    /// Category of `point`, if it has one.
    pub fn classify(&self, point: &DataPoint) -> Option<String> {
        match self {
            CategoryKey::Field(name) => point.get_str(name),
            CategoryKey::DnaChange => point
                .get_str(DNA_CHANGE_FIELD)
                .map(|change| dna_change_class(&change)),
            CategoryKey::ProteinChange => {
                let mutation = point.get_str(AMINO_ACID_MUTATION_FIELD)?;
                let wildtype = point.get_str(AMINO_ACID_WILDTYPE_FIELD)?;
                Some(format!("{}-{}", mutation, wildtype))
            }
            CategoryKey::LeskAminoAcid => {
                let aa = point.get_str(AMINO_ACID_MUTATION_FIELD)?;
                Some(match LeskGroup::of(&aa) {
                    Some(group) => group.to_string(),
                    None => aa,
                })
            }
        }
    }

    /// Colour of `category` when the colour-by configuration does not name one.
    pub fn default_color(&self, category: &str) -> &'static str {
        match self {
            CategoryKey::LeskAminoAcid => category
                .parse::<LeskGroup>()
                .map(|group| group.color())
                .unwrap_or(UNKNOWN_CATEGORY_COLOR),
            _ => UNKNOWN_CATEGORY_COLOR,
        }
    }
}

/// Classify a DNA change of the form `"<ref>-><alt>"`.
///
/// Single base to single base is a substitution, anything to `-` a deletion, `-` to one
/// base an insertion, and `-` to several bases `INSERTION+`.
pub fn dna_change_class(change: &str) -> String {
    let Some((reference, alternative)) = change.split_once("->") else {
        return format!("UNKNOWN {}", change);
    };

    if reference != "-"
        && reference.chars().count() == 1
        && alternative != "-"
        && alternative.chars().count() == 1
    {
        String::from("SUBSTITUTION")
    } else if alternative == "-" {
        String::from("DELETION")
    } else if reference == "-" && alternative.chars().count() == 1 {
        String::from("INSERTION")
    } else if reference == "-" && alternative.chars().count() > 1 {
        String::from("INSERTION+")
    } else {
        format!("UNKNOWN {}", change)
    }
}

/// Amino acid groups after Lesk, "Introduction to Bioinformatics".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LeskGroup {
    /// G, A, S, T
    SmallNonpolar,
    /// C, V, I, L, P, F, Y, M, W
    Hydrophobic,
    /// N, Q, H
    Polar,
    /// D, E
    NegativelyCharged,
    /// K, R
    PositivelyCharged,
}

impl LeskGroup {
    /// Group of a one-letter amino acid code.
    pub fn of(aa: &str) -> Option<Self> {
        Some(match aa {
            "G" | "A" | "S" | "T" => LeskGroup::SmallNonpolar,
            "C" | "V" | "I" | "L" | "P" | "F" | "Y" | "M" | "W" => LeskGroup::Hydrophobic,
            "N" | "Q" | "H" => LeskGroup::Polar,
            "D" | "E" => LeskGroup::NegativelyCharged,
            "K" | "R" => LeskGroup::PositivelyCharged,
            _ => return None,
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            LeskGroup::SmallNonpolar => "Small Nonpolar",
            LeskGroup::Hydrophobic => "Hydrophobic",
            LeskGroup::Polar => "Polar",
            LeskGroup::NegativelyCharged => "Negatively Charged",
            LeskGroup::PositivelyCharged => "Positively Charged",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            LeskGroup::SmallNonpolar => "orange",
            LeskGroup::Hydrophobic => "green",
            LeskGroup::Polar => "magenta",
            LeskGroup::NegativelyCharged => "red",
            LeskGroup::PositivelyCharged => "blue",
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use strum::IntoEnumIterator;

    use super::*;

    #[rstest::rstest]
    #[case("A->G", "SUBSTITUTION")]
    #[case("AT->-", "DELETION")]
    #[case("A->-", "DELETION")]
    #[case("-->T", "INSERTION")]
    #[case("-->TT", "INSERTION+")]
    #[case("AT->GC", "UNKNOWN AT->GC")]
    #[case("garbage", "UNKNOWN garbage")]
    fn dna_change(#[case] change: &str, #[case] expected: &str) {
        assert_eq!(dna_change_class(change), expected);
    }

    #[test]
    fn classify() {
        let point: DataPoint = [
            ("value", json!("BRCA")),
            ("dna_change", json!("C->T")),
            ("amino_acid_mutation", json!("K")),
            ("amino_acid_wildtype", json!("E")),
        ]
        .into_iter()
        .collect();

        assert_eq!(CategoryKey::default().classify(&point), Some("BRCA".into()));
        assert_eq!(
            CategoryKey::DnaChange.classify(&point),
            Some("SUBSTITUTION".into())
        );
        assert_eq!(
            CategoryKey::ProteinChange.classify(&point),
            Some("K-E".into())
        );
        assert_eq!(
            CategoryKey::LeskAminoAcid.classify(&point),
            Some("POSITIVELY_CHARGED".into())
        );
        assert_eq!(
            CategoryKey::Field("missing".into()).classify(&point),
            None
        );
    }

    #[test]
    fn lesk_unknown_amino_acid_keeps_code() {
        let point: DataPoint = [("amino_acid_mutation", json!("*"))].into_iter().collect();

        assert_eq!(CategoryKey::LeskAminoAcid.classify(&point), Some("*".into()));
        assert_eq!(
            CategoryKey::LeskAminoAcid.default_color("*"),
            UNKNOWN_CATEGORY_COLOR
        );
    }

    #[test]
    fn lesk_groups_round_trip_names() -> Result<(), anyhow::Error> {
        for group in LeskGroup::iter() {
            let parsed: LeskGroup = group.to_string().parse()?;
            assert_eq!(parsed, group);
            assert_eq!(
                CategoryKey::LeskAminoAcid.default_color(&group.to_string()),
                group.color()
            );
        }

        Ok(())
    }

    #[test]
    fn category_key_serde() -> Result<(), anyhow::Error> {
        let key: CategoryKey = serde_json::from_value(json!({"kind": "field", "field": "x"}))?;
        assert_eq!(key, CategoryKey::Field("x".into()));
        let key: CategoryKey = serde_json::from_value(json!({"kind": "dna_change"}))?;
        assert_eq!(key, CategoryKey::DnaChange);

        Ok(())
    }
}
