//! PubMed query construction from screening criteria.
//!
//! Shape of the generated query:
//!   (disease synonyms in [Title/Abstract])
//!   AND (study type as [Publication Type] or [Title/Abstract])
//!   AND (population / intervention terms)
//!   AND (year range as [dp])

use slr_common::vocabulary::{disease_terms, study_type_terms};
use slr_common::Criteria;

/// Build an E-utilities search term for the given criteria.
pub fn build_query(criteria: &Criteria) -> String {
    let mut clauses = Vec::new();

    let disease = disease_terms(&criteria.disease)
        .iter()
        .map(|t| format!("\"{}\"[Title/Abstract]", escape(t)))
        .collect::<Vec<_>>();
    if !disease.is_empty() {
        clauses.push(format!("({})", disease.join(" OR ")));
    }

    if let Some(study_type) = criteria.study_type() {
        let terms = study_type_terms(study_type)
            .into_iter()
            .filter(|t| t.len() > 3) // "rct" and similar abbreviations are too noisy as query terms
            .flat_map(|t| {
                let t = escape(&t);
                [format!("\"{t}\"[Publication Type]"), format!("\"{t}\"[Title/Abstract]")]
            })
            .collect::<Vec<_>>();
        if !terms.is_empty() {
            clauses.push(format!("({})", terms.join(" OR ")));
        }
    }

    for extra in [&criteria.population, &criteria.intervention].into_iter().flatten() {
        let extra = extra.trim();
        if !extra.is_empty() {
            clauses.push(format!("\"{}\"[Title/Abstract]", escape(extra)));
        }
    }

    if let Some(range) = criteria.year_range {
        clauses.push(format!("(\"{}\"[dp] : \"{}\"[dp])", range.min, range.max));
    }

    clauses.join(" AND ")
}

fn escape(term: &str) -> String {
    term.replace('"', "")
}
