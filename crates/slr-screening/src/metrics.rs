//! Run-level statistics over screening decisions.
//!
//! `summarize` needs nothing but the decisions. `compute` scores them against
//! reviewer ground truth and returns `None` when there is none; predictions
//! are never used as their own truth.

use std::collections::{BTreeMap, HashMap};

use slr_common::{ArticleDecision, MetricsSummary, ScreeningCounts};

/// Confusion-matrix metrics against `ground_truth` (identifier → relevant).
pub fn compute(decisions: &[ArticleDecision], ground_truth: Option<&HashMap<String, bool>>) -> Option<MetricsSummary> {
    let truth = ground_truth?;
    let mut m = MetricsSummary::default();

    for d in decisions {
        let predicted = d.final_outcome.is_include();
        match truth.get(&d.article.identifier) {
            None                  => m.unlabeled += 1,
            Some(true)  if predicted  => m.true_positive += 1,
            Some(false) if predicted  => m.false_positive += 1,
            Some(false)           => m.true_negative += 1,
            Some(true)            => m.false_negative += 1,
        }
    }

    let (tp, fp, tn, fn_) = (
        m.true_positive as f64,
        m.false_positive as f64,
        m.true_negative as f64,
        m.false_negative as f64,
    );
    m.precision = ratio(tp, tp + fp);
    m.recall    = ratio(tp, tp + fn_);
    m.f1        = ratio(2.0 * m.precision * m.recall, m.precision + m.recall);
    m.accuracy  = ratio(tp + tn, tp + fp + tn + fn_);
    Some(m)
}

/// Outcome counts, per-layer attribution and mean final confidence.
pub fn summarize(decisions: &[ArticleDecision]) -> ScreeningCounts {
    let mut decided_by_layer = BTreeMap::new();
    let mut included = 0;
    let mut confidence_sum = 0.0;

    for d in decisions {
        if d.final_outcome.is_include() {
            included += 1;
        }
        *decided_by_layer.entry(d.final_layer).or_insert(0) += 1;
        confidence_sum += d.final_confidence();
    }

    let total = decisions.len();
    ScreeningCounts {
        total,
        included,
        excluded: total - included,
        decided_by_layer,
        mean_confidence: ratio(confidence_sum, total as f64),
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slr_common::{Article, LayerDecision, LayerKind, Outcome};

    fn decided(id: &str, outcome: Outcome, layer: LayerKind, confidence: f64) -> ArticleDecision {
        ArticleDecision::from_trail(
            Article::new(id, "t", ""),
            vec![LayerDecision::new(layer, outcome, confidence, "test")],
            0,
        )
        .unwrap()
    }

    fn truth(pairs: &[(&str, bool)]) -> HashMap<String, bool> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_no_ground_truth_means_no_metrics() {
        let ds = vec![decided("1", Outcome::Include, LayerKind::Rule, 0.95)];
        assert!(compute(&ds, None).is_none());
    }

    #[test]
    fn test_confusion_matrix() {
        let ds = vec![
            decided("1", Outcome::Include, LayerKind::Rule, 0.95), // TP
            decided("2", Outcome::Include, LayerKind::Ml, 0.80),   // FP
            decided("3", Outcome::Exclude, LayerKind::Rule, 0.90), // TN
            decided("4", Outcome::Exclude, LayerKind::Rule, 0.90), // FN
            decided("5", Outcome::Include, LayerKind::Rule, 0.95), // unlabeled
        ];
        let gt = truth(&[("1", true), ("2", false), ("3", false), ("4", true)]);
        let m = compute(&ds, Some(&gt)).unwrap();

        assert_eq!((m.true_positive, m.false_positive, m.true_negative, m.false_negative), (1, 1, 1, 1));
        assert_eq!(m.unlabeled, 1);
        assert_eq!(m.precision, 0.5);
        assert_eq!(m.recall, 0.5);
        assert_eq!(m.f1, 0.5);
        assert_eq!(m.accuracy, 0.5);
    }

    #[test]
    fn test_all_excluded_against_all_relevant_is_zero() {
        let ds = vec![
            decided("1", Outcome::Exclude, LayerKind::Rule, 0.9),
            decided("2", Outcome::Exclude, LayerKind::Rule, 0.9),
        ];
        let m = compute(&ds, Some(&truth(&[("1", true), ("2", true)]))).unwrap();
        assert_eq!((m.precision, m.recall, m.f1, m.accuracy), (0.0, 0.0, 0.0, 0.0));
        assert_eq!(m.false_negative, 2);
    }

    #[test]
    fn test_empty_inputs_do_not_divide_by_zero() {
        let m = compute(&[], Some(&HashMap::new())).unwrap();
        assert_eq!(m, MetricsSummary::default());
        assert_eq!(summarize(&[]).mean_confidence, 0.0);
    }

    #[test]
    fn test_summarize_counts_layers() {
        let ds = vec![
            decided("1", Outcome::Include, LayerKind::Rule, 1.0),
            decided("2", Outcome::Exclude, LayerKind::Rule, 0.5),
            decided("3", Outcome::Include, LayerKind::Human, 0.0),
        ];
        let c = summarize(&ds);
        assert_eq!((c.total, c.included, c.excluded), (3, 2, 1));
        assert_eq!(c.decided_by_layer[&LayerKind::Rule], 2);
        assert_eq!(c.decided_by_layer[&LayerKind::Human], 1);
        assert_eq!(c.mean_confidence, 0.5);
    }
}
