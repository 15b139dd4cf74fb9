#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_default_thresholds_match_cascade_defaults() {
        let t = Thresholds::default();
        assert_eq!(default_rule_threshold(), t.rule);
        assert_eq!(default_ml_threshold(), t.ml);
        assert_eq!(default_semantic_threshold(), t.semantic);
    }

    #[test]
    fn test_empty_file_gives_default_layer_order() {
        let config = Config::parse("").unwrap();
        assert_eq!(
            config.layer_order().unwrap(),
            vec![LayerKind::Human, LayerKind::Rule, LayerKind::Ml, LayerKind::Semantic]
        );
        assert!(config.classifier.is_none());
        assert!(config.embedding.is_none());
        assert_eq!(config.bind_addr(), "127.0.0.1:3001");
        assert_eq!(config.server.max_finished_jobs, 500);
    }

    #[test]
    fn test_sections_are_read() {
        let config = Config::parse(
            r#"
            [server]
            port = 8080

            [pubmed]
            email = "reviewer@example.org"
            batch_size = 50

            [screening]
            rule_threshold = 0.9
            layers = ["rule", "human"]

            [embedding]
            backend = "openai_compatible"
            base_url = "http://vllm:8000"

            [dedup]
            enabled = false

            [export]
            output_dir = "/tmp/slr"
            "#,
        )
        .unwrap();

        let run = config.run_config().unwrap();
        assert_eq!(run.layers, vec![LayerKind::Rule, LayerKind::Human]);
        assert_eq!(run.thresholds.rule, 0.9);
        assert_eq!(run.retrieval.batch_size, 50);
        assert!(!run.dedup.near_duplicate);

        let embed = config.embedding_config().unwrap();
        assert_eq!(embed.backend, EmbeddingBackend::OpenAiCompatible);
        assert_eq!(embed.model, "nomic-embed-text");
        assert_eq!(config.pubmed_config().email.as_deref(), Some("reviewer@example.org"));
        assert_eq!(config.export.output_dir, "/tmp/slr");
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_unknown_layer_is_rejected() {
        let err = Config::parse("[screening]\nlayers = [\"rule\", \"oracle\"]").unwrap_err();
        assert!(err.to_string().contains("oracle"));
    }

    #[test]
    fn test_env_fills_only_empty_secrets() {
        let mut config = Config::parse(
            r#"
            [pubmed]
            api_key = "from-file"

            [classifier]
            api_key = ""
            "#,
        )
        .unwrap();

        config.apply_env(|key| match key {
            "PUBMED_API_KEY" => Some("from-env".to_string()),
            "SLR_CLASSIFIER_API_KEY" => Some("hf_token".to_string()),
            _ => None,
        });

        assert_eq!(config.pubmed.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.classifier_config().unwrap().api_key.as_deref(), Some("hf_token"));
        assert!(config.embedding.is_none());
    }
}
