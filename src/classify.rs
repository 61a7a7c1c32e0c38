//! Classification adapter.
//!
//! Asks the classification oracle for a (main, sub) pair and re-validates
//! the answer against the active taxonomy. A pair that does not validate,
//! including a real subcategory filed under the wrong main category, is a
//! rejection rather than an error. Classification is never retried.

use timeline_curator_core::models::CandidateEvent;
use timeline_curator_core::oracle::ClassificationOracle;
use timeline_curator_core::taxonomy::{Classification, Taxonomy};

/// Result of one classification attempt.
#[derive(Debug)]
pub enum ClassifyOutcome {
    Accepted(Classification),
    /// The oracle answered with a pair outside the taxonomy.
    Rejected {
        main_category: String,
        subcategory: String,
    },
    /// The oracle call itself failed.
    Failed(anyhow::Error),
}

pub async fn classify_candidate(
    oracle: &dyn ClassificationOracle,
    candidate: &CandidateEvent,
    taxonomy: &Taxonomy,
) -> ClassifyOutcome {
    let response = match oracle.classify(candidate, taxonomy).await {
        Ok(response) => response,
        Err(e) => return ClassifyOutcome::Failed(e),
    };

    match taxonomy.validate(&response.main_category, &response.subcategory) {
        Some(classification) => {
            tracing::debug!(
                main_category = %classification.main_category,
                subcategory = %classification.subcategory,
                "classified"
            );
            ClassifyOutcome::Accepted(classification)
        }
        None => ClassifyOutcome::Rejected {
            main_category: response.main_category,
            subcategory: response.subcategory,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use timeline_curator_core::models::TimelinePoint;
    use timeline_curator_core::oracle::ClassificationResponse;

    struct Answer(&'static str, &'static str);

    #[async_trait]
    impl ClassificationOracle for Answer {
        async fn classify(
            &self,
            _: &CandidateEvent,
            _: &Taxonomy,
        ) -> Result<ClassificationResponse> {
            Ok(ClassificationResponse {
                main_category: self.0.to_string(),
                subcategory: self.1.to_string(),
            })
        }
    }

    struct Down;

    #[async_trait]
    impl ClassificationOracle for Down {
        async fn classify(
            &self,
            _: &CandidateEvent,
            _: &Taxonomy,
        ) -> Result<ClassificationResponse> {
            bail!("timeout")
        }
    }

    fn candidate() -> CandidateEvent {
        CandidateEvent {
            event_title: "Wins award".to_string(),
            event_summary: "Wins award".to_string(),
            timeline_points: vec![TimelinePoint::new("2024", "Wins award", "S1")],
        }
    }

    #[tokio::test]
    async fn test_valid_pair_accepted() {
        let oracle = Answer("Creative Works", " Awards & Honors ");
        match classify_candidate(&oracle, &candidate(), &Taxonomy::builtin()).await {
            ClassifyOutcome::Accepted(c) => {
                assert_eq!(c.main_category, "Creative Works");
                assert_eq!(c.subcategory, "Awards & Honors");
            }
            other => panic!("expected acceptance, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cross_category_pair_rejected() {
        let oracle = Answer("Creative Works", "Accidents & Emergencies");
        assert!(matches!(
            classify_candidate(&oracle, &candidate(), &Taxonomy::builtin()).await,
            ClassifyOutcome::Rejected { .. }
        ));
    }

    #[tokio::test]
    async fn test_unknown_main_rejected() {
        let oracle = Answer("Sports", "Awards & Honors");
        assert!(matches!(
            classify_candidate(&oracle, &candidate(), &Taxonomy::builtin()).await,
            ClassifyOutcome::Rejected { .. }
        ));
    }

    #[tokio::test]
    async fn test_oracle_error_is_failure() {
        assert!(matches!(
            classify_candidate(&Down, &candidate(), &Taxonomy::builtin()).await,
            ClassifyOutcome::Failed(_)
        ));
    }
}
