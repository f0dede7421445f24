//! Citation quality checklist: a fixed, deterministic policy over the support
//! score and the bibliography entry.

use crate::models::{Checklist, ReferenceEntry};

/// Minimum score for the cited section to count as supporting the claim.
pub const SUPPORTS_CLAIM_THRESHOLD: f64 = 0.25;
/// Minimum score below which the claim is assumed to overstate the source.
pub const FAIR_REPRESENTATION_THRESHOLD: f64 = 0.20;
/// Sources published before this year are flagged as dated.
pub const MIN_CURRENT_YEAR: i32 = 2018;

/// Evaluate the checklist for one citation use. Without a bibliography entry
/// every flag is false.
pub fn checklist_verdict(support_score: f64, reference: Option<&ReferenceEntry>) -> Checklist {
    let rounded = round3(support_score);
    let reference = match reference {
        Some(r) => r,
        None => {
            return Checklist {
                supports_claim: false,
                source_credible: false,
                fair_representation: false,
                proper_formatting: false,
                current_and_accessible: false,
                support_score: rounded,
                year: None,
                arxiv_id: None,
                doi: None,
                title: None,
            }
        }
    };

    let has_arxiv = reference.arxiv_id.is_some();
    let is_recent = reference.year.map_or(true, |y| y >= MIN_CURRENT_YEAR);

    Checklist {
        supports_claim: support_score >= SUPPORTS_CLAIM_THRESHOLD,
        source_credible: has_arxiv,
        fair_representation: support_score >= FAIR_REPRESENTATION_THRESHOLD,
        // No formatting rules are checked yet; any parsed entry passes.
        proper_formatting: true,
        current_and_accessible: is_recent && has_arxiv,
        support_score: rounded,
        year: reference.year,
        arxiv_id: reference.arxiv_id.clone(),
        doi: reference.doi.clone(),
        title: reference.title.clone(),
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(arxiv_id: Option<&str>, year: Option<i32>) -> ReferenceEntry {
        ReferenceEntry {
            number: 4,
            text: "A. Author, \"Title\", 2020.".to_string(),
            arxiv_id: arxiv_id.map(str::to_string),
            doi: Some("10.1000/xyz".to_string()),
            title: Some("Title".to_string()),
            year,
            authors: vec!["author".to_string()],
        }
    }

    #[test]
    fn test_thresholds() {
        let r = reference(Some("2101.12345"), Some(2021));
        let strong = checklist_verdict(0.25, Some(&r));
        assert!(strong.supports_claim && strong.fair_representation);

        let middling = checklist_verdict(0.22, Some(&r));
        assert!(!middling.supports_claim);
        assert!(middling.fair_representation);

        let weak = checklist_verdict(0.199, Some(&r));
        assert!(!weak.supports_claim && !weak.fair_representation);
    }

    #[test]
    fn test_credibility_and_currency() {
        let with_id = checklist_verdict(0.5, Some(&reference(Some("2101.12345"), Some(2021))));
        assert!(with_id.source_credible && with_id.current_and_accessible);

        let old = checklist_verdict(0.5, Some(&reference(Some("1706.03762"), Some(2017))));
        assert!(old.source_credible);
        assert!(!old.current_and_accessible);

        let cutoff = checklist_verdict(0.5, Some(&reference(Some("1810.04805"), Some(MIN_CURRENT_YEAR))));
        assert_eq!(MIN_CURRENT_YEAR, 2018);
        assert!(cutoff.current_and_accessible);

        let undated = checklist_verdict(0.5, Some(&reference(Some("1706.03762"), None)));
        assert!(undated.current_and_accessible);

        let no_id = checklist_verdict(0.5, Some(&reference(None, Some(2022))));
        assert!(!no_id.source_credible && !no_id.current_and_accessible);
        assert!(no_id.proper_formatting);
    }

    #[test]
    fn test_echoes_metadata() {
        let c = checklist_verdict(0.123456, Some(&reference(Some("2101.12345"), Some(2021))));
        assert_eq!(c.support_score, 0.123);
        assert_eq!(c.year, Some(2021));
        assert_eq!(c.arxiv_id.as_deref(), Some("2101.12345"));
        assert_eq!(c.doi.as_deref(), Some("10.1000/xyz"));
        assert_eq!(c.title.as_deref(), Some("Title"));
    }

    #[test]
    fn test_missing_reference_is_all_false() {
        let c = checklist_verdict(0.9, None);
        assert!(!c.supports_claim && !c.source_credible && !c.fair_representation);
        assert!(!c.proper_formatting && !c.current_and_accessible);
        assert_eq!(c.support_score, 0.9);
    }

    #[test]
    fn test_deterministic() {
        let r = reference(Some("2101.12345"), Some(2019));
        for score in [0.0, 0.2, 0.2499, 0.31, 1.0] {
            assert_eq!(checklist_verdict(score, Some(&r)), checklist_verdict(score, Some(&r)));
        }
    }

    #[test]
    fn test_serializes_as_flat_map() {
        let c = checklist_verdict(0.3, Some(&reference(Some("2101.12345"), Some(2021))));
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["supports_claim"], true);
        assert_eq!(json["arxiv_id"], "2101.12345");
        assert_eq!(json["support_score"], 0.3);
    }
}
