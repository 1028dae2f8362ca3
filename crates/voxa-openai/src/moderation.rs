// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification capability over the moderations endpoint.

use async_trait::async_trait;
use voxa_core::types::Classification;
use voxa_core::{CallCtx, Classifier, VoxaError};

use crate::client::OpenAiClient;
use crate::types::{ApiModerationRequest, ApiModerationResponse};

const MODERATION_PATH: &str = "/v1/moderations";

/// Rate-limit bucket name for classification requests.
pub const CLASSIFY_BUCKET: &str = "moderations";

/// Classification adapter over an [`OpenAiClient`].
#[derive(Clone)]
pub struct OpenAiClassifier {
    client: OpenAiClient,
}

impl OpenAiClassifier {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    async fn classify(
        &self,
        ctx: &CallCtx,
        text: &str,
        locale: &str,
    ) -> Result<Classification, VoxaError> {
        let api = ApiModerationRequest {
            input: text.to_string(),
            locale: (!locale.is_empty()).then(|| locale.to_string()),
        };
        let url = self.client.url(MODERATION_PATH);
        let response = self
            .client
            .send(ctx, CLASSIFY_BUCKET, |http| http.post(&url).json(&api))
            .await?;

        let body = ctx
            .run(response.text())
            .await?
            .map_err(|e| VoxaError::connection(format!("failed to read response body: {e}")))?;
        let parsed: ApiModerationResponse = serde_json::from_str(&body).map_err(|e| {
            VoxaError::connection(format!("failed to parse moderation response: {e}"))
        })?;

        let result = parsed
            .results
            .into_iter()
            .next()
            .ok_or_else(|| VoxaError::Unprocessable("moderation response had no results".into()))?;

        Ok(Classification {
            categories: result.categories,
            scores: result.category_scores,
            analysis: result.analysis,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxa_core::RateLimiter;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn classifier(base: &str) -> OpenAiClassifier {
        OpenAiClassifier::new(
            OpenAiClient::new("sk-test", RateLimiter::new())
                .unwrap()
                .with_base_url(base),
        )
    }

    #[tokio::test]
    async fn classify_maps_categories_scores_and_analysis() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "results": [{
                "categories": {"violence": true, "sexual/minors": false},
                "category_scores": {"violence": 0.92, "sexual/minors": 0.01},
                "analysis": {
                    "assessment_age": 13,
                    "assessment_translation": "violent themes",
                    "movie_rating": "PG-13",
                    "tv_rating": "TV-14",
                    "esrb_rating": "T",
                    "pegi_rating": "16",
                    "toxic": true
                }
            }]
        });
        Mock::given(method("POST"))
            .and(path("/v1/moderations"))
            .and(body_partial_json(serde_json::json!({
                "input": "some text", "locale": "en-US"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let ctx = CallCtx::unbounded();
        let c = classifier(&server.uri())
            .classify(&ctx, "some text", "en-US")
            .await
            .unwrap();
        assert!(c.categories["violence"]);
        assert!(!c.categories["sexual/minors"]);
        assert!((c.scores["violence"] - 0.92).abs() < 1e-9);
        assert_eq!(c.analysis.assessment_age, 13);
        assert!(c.analysis.toxic);
    }

    #[tokio::test]
    async fn empty_results_are_unprocessable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": []})),
            )
            .mount(&server)
            .await;

        let ctx = CallCtx::unbounded();
        let err = classifier(&server.uri())
            .classify(&ctx, "text", "en-US")
            .await
            .unwrap_err();
        assert!(matches!(err, VoxaError::Unprocessable(_)));
    }
}
