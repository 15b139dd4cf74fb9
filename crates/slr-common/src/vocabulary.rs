//! Curated synonym lists for diseases and study designs.
//! Used to build PubMed queries and by the rule screening layer.

/// Disease name → synonyms (all lowercase). The key itself is always a synonym.
const DISEASE_SYNONYMS: &[(&str, &[&str])] = &[
    ("type 2 diabetes", &[
        "type 2 diabetes", "type ii diabetes", "t2dm", "t2d", "niddm",
        "non-insulin-dependent diabetes", "adult-onset diabetes", "diabetes mellitus type 2",
        "diabetes mellitus, type 2",
    ]),
    ("pcos", &["pcos", "polycystic ovary syndrome", "polycystic ovarian syndrome", "stein-leventhal"]),
    ("polycystic ovary syndrome", &["pcos", "polycystic ovary syndrome", "polycystic ovarian syndrome"]),
    ("type 1 diabetes", &["type 1 diabetes", "type i diabetes", "t1dm", "t1d", "iddm", "juvenile diabetes"]),
    ("hypertension", &["hypertension", "high blood pressure", "elevated blood pressure"]),
    ("copd", &["copd", "chronic obstructive pulmonary disease", "emphysema", "chronic bronchitis"]),
    ("nafld", &["nafld", "non-alcoholic fatty liver disease", "nonalcoholic fatty liver disease", "masld"]),
];

/// Study design → synonyms (all lowercase).
const STUDY_TYPE_SYNONYMS: &[(&str, &[&str])] = &[
    ("randomized controlled trial", &[
        "randomized controlled trial", "randomised controlled trial", "rct", "randomized", "randomised",
    ]),
    ("clinical trial", &[
        "clinical trial", "controlled clinical trial", "adaptive clinical trial", "trial phase",
        "clinical trial, phase ii", "clinical trial, phase iii", "clinical trial, phase iv",
    ]),
    ("systematic review", &["systematic review", "meta-analysis"]),
    ("cohort study", &["cohort study", "cohort studies", "prospective study", "longitudinal study"]),
    ("observational study", &["observational study", "cross-sectional study", "case-control study"]),
];

fn lookup(table: &[(&str, &[&str])], term: &str) -> Vec<String> {
    let key = term.trim().to_lowercase();
    if key.is_empty() {
        return Vec::new();
    }
    let mut out = vec![key.clone()];
    for (name, synonyms) in table {
        if *name == key || synonyms.contains(&key.as_str()) {
            for s in *synonyms {
                if !out.iter().any(|o| o == s) {
                    out.push(s.to_string());
                }
            }
        }
    }
    out
}

/// Lowercase match terms for a disease, starting with the disease name itself.
pub fn disease_terms(disease: &str) -> Vec<String> {
    lookup(DISEASE_SYNONYMS, disease)
}

/// Lowercase match terms for a study design, starting with the name itself.
pub fn study_type_terms(study_type: &str) -> Vec<String> {
    lookup(STUDY_TYPE_SYNONYMS, study_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcos_expands_to_full_name() {
        let terms = disease_terms("PCOS");
        assert_eq!(terms[0], "pcos");
        assert!(terms.contains(&"polycystic ovary syndrome".to_string()));
    }

    #[test]
    fn test_synonym_lookup_works_from_alias() {
        let terms = disease_terms("T2DM");
        assert!(terms.contains(&"type 2 diabetes".to_string()));
    }

    #[test]
    fn test_unknown_disease_is_just_itself() {
        assert_eq!(disease_terms("  Gout "), vec!["gout".to_string()]);
        assert!(disease_terms("").is_empty());
    }

    #[test]
    fn test_rct_terms() {
        let terms = study_type_terms("Randomized Controlled Trial");
        assert!(terms.contains(&"rct".to_string()));
        assert!(terms.contains(&"randomised".to_string()));
    }
}
