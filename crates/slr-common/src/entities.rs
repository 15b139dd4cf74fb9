/// Core entity types flowing through the screening workflow.
/// Articles are immutable once fetched; criteria are fixed for the lifetime of a job.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SlrError};

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

/// A candidate study returned by an article source. Identity key is `identifier`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub identifier: String,          // PMID for PubMed records
    pub title: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub journal: Option<String>,
    /// Publication types as reported by the source, e.g. "Randomized Controlled Trial".
    #[serde(default)]
    pub publication_types: Vec<String>,
}

impl Article {
    pub fn new(identifier: impl Into<String>, title: impl Into<String>, abstract_text: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            title: title.into(),
            abstract_text: abstract_text.into(),
            year: None,
            journal: None,
            publication_types: Vec::new(),
        }
    }

    /// Title and abstract joined by a single space; the text that models see.
    pub fn text(&self) -> String {
        match (self.title.is_empty(), self.abstract_text.is_empty()) {
            (false, false) => format!("{} {}", self.title, self.abstract_text),
            (false, true)  => self.title.clone(),
            (true, _)      => self.abstract_text.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Criteria
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

/// Inclusion criteria for one screening job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    pub disease: String,
    #[serde(default)]
    pub population: Option<String>,
    #[serde(default)]
    pub intervention: Option<String>,
    #[serde(default)]
    pub study_type: Option<String>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub year_range: Option<YearRange>,
}

fn default_max_results() -> usize { 5000 }

impl Criteria {
    pub fn for_disease(disease: impl Into<String>) -> Self {
        Self {
            disease: disease.into(),
            population: None,
            intervention: None,
            study_type: None,
            max_results: default_max_results(),
            year_range: None,
        }
    }

    /// Reject criteria that can never produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        if self.disease.trim().is_empty() {
            return Err(SlrError::InvalidCriteria("disease must not be empty".to_string()));
        }
        if self.max_results == 0 {
            return Err(SlrError::InvalidCriteria("max_results must be positive".to_string()));
        }
        if let Some(range) = self.year_range {
            if range.min > range.max {
                return Err(SlrError::InvalidCriteria(format!(
                    "year range is inverted: {} > {}",
                    range.min, range.max
                )));
            }
        }
        Ok(())
    }

    /// Study type with blank strings treated as absent.
    pub fn study_type(&self) -> Option<&str> {
        self.study_type.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_disease_is_rejected() {
        let c = Criteria::for_disease("   ");
        assert!(matches!(c.validate(), Err(SlrError::InvalidCriteria(_))));
    }

    #[test]
    fn test_zero_max_results_is_rejected() {
        let c = Criteria { max_results: 0, ..Criteria::for_disease("PCOS") };
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_inverted_year_range_is_rejected() {
        let c = Criteria {
            year_range: Some(YearRange { min: 2020, max: 2010 }),
            ..Criteria::for_disease("PCOS")
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_criteria_deserialize_defaults() {
        let c: Criteria = serde_json::from_str(r#"{"disease": "PCOS"}"#).unwrap();
        assert_eq!(c.max_results, 5000);
        assert!(c.study_type().is_none());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_article_text_joins_title_and_abstract() {
        let a = Article::new("1", "Metformin in PCOS", "A randomized trial.");
        assert_eq!(a.text(), "Metformin in PCOS A randomized trial.");
        let b = Article::new("2", "Title only", "");
        assert_eq!(b.text(), "Title only");
    }
}
