use std::time::Instant;

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::brief::errors::{BriefGenerationFailed, Stage};
use crate::brief::models::Brief;
use crate::brief::render::render_markdown;
use crate::documents::fetch::fetch_document;
use crate::documents::{DocumentFormat, DocumentRole, RawDocument};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BriefResponse {
    pub request_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub brief: Brief,
    pub markdown: String,
}

struct Upload {
    bytes: Bytes,
    file_name: Option<String>,
}

/// Multipart fields accepted by `POST /api/v1/briefs`. Unknown fields are skipped.
#[derive(Default)]
struct BriefForm {
    jd: Option<Upload>,
    jd_url: Option<String>,
    jd_format: Option<String>,
    cv: Option<Upload>,
    cv_format: Option<String>,
}

impl BriefForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, AppError> {
        let mut form = BriefForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "jd" | "cv" => {
                    let file_name = field.file_name().map(str::to_string);
                    let bytes = field.bytes().await?;
                    let upload = Some(Upload { bytes, file_name });
                    if name == "jd" {
                        form.jd = upload;
                    } else {
                        form.cv = upload;
                    }
                }
                "jd_url" => form.jd_url = non_blank(field.text().await?),
                "jd_format" => form.jd_format = non_blank(field.text().await?),
                "cv_format" => form.cv_format = non_blank(field.text().await?),
                other => debug!("Ignoring unknown multipart field '{other}'"),
            }
        }
        Ok(form)
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// A declared tag wins. Otherwise the format comes from the upload's file extension.
fn into_document(
    upload: Upload,
    declared: Option<&str>,
    role: DocumentRole,
    field: &str,
) -> Result<RawDocument, AppError> {
    if let Some(tag) = declared {
        return RawDocument::from_tag(upload.bytes, tag)
            .map_err(|e| BriefGenerationFailed::new(Stage::Extraction(role), e).into());
    }

    let format = upload
        .file_name
        .as_deref()
        .and_then(DocumentFormat::from_file_name)
        .ok_or_else(|| {
            AppError::Validation(format!(
                "`{field}_format` is required when the `{field}` file name has no .pdf/.html/.txt extension"
            ))
        })?;
    Ok(RawDocument::new(upload.bytes, format))
}

// ──────────────────────────────────────────────
// POST /api/v1/briefs
// ──────────────────────────────────────────────

/// POST /api/v1/briefs
/// Multipart upload of a job description (`jd` file or `jd_url`) and a CV (`cv` file).
pub async fn handle_generate_brief(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BriefResponse>, AppError> {
    let form = BriefForm::read(&mut multipart).await?;
    let request_id = Uuid::new_v4();

    let cv_upload = form
        .cv
        .ok_or_else(|| AppError::Validation("a `cv` file is required".to_string()))?;
    let cv = into_document(cv_upload, form.cv_format.as_deref(), DocumentRole::Cv, "cv")?;

    let jd = match (form.jd, form.jd_url) {
        (Some(upload), None) => into_document(
            upload,
            form.jd_format.as_deref(),
            DocumentRole::JobDescription,
            "jd",
        )?,
        (None, Some(url)) => {
            info!("Brief request {request_id}: fetching job description from {url}");
            fetch_document(&state.http, &url).await.map_err(|e| {
                BriefGenerationFailed::new(Stage::Fetch(DocumentRole::JobDescription), e)
            })?
        }
        (Some(_), Some(_)) => {
            return Err(AppError::Validation(
                "send either a `jd` file or a `jd_url`, not both".to_string(),
            ))
        }
        (None, None) => {
            return Err(AppError::Validation(
                "a `jd` file or a `jd_url` is required".to_string(),
            ))
        }
    };

    info!(
        "Brief request {request_id}: jd={} ({} bytes), cv={} ({} bytes)",
        jd.format(),
        jd.bytes().len(),
        cv.format(),
        cv.bytes().len()
    );

    let started = Instant::now();
    let brief = state
        .pipeline
        .generate_brief_with_timeout(&jd, &cv, state.config.pipeline_timeout)
        .await
        .inspect_err(|e| warn!("Brief request {request_id} failed: {e}"))?;

    info!(
        "Brief request {request_id} completed in {:?} (partial: {})",
        started.elapsed(),
        brief.partial
    );

    let markdown = render_markdown(&brief);
    Ok(Json(BriefResponse {
        request_id,
        generated_at: Utc::now(),
        brief,
        markdown,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{header::CONTENT_TYPE, Request, StatusCode},
        response::Response,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::brief::pipeline::Pipeline;
    use crate::config::Config;
    use crate::llm_client::{CompletionClient, CompletionConfig, CompletionError, CompletionPrompt};
    use crate::routes::build_router;
    use crate::state::AppState;

    const BOUNDARY: &str = "prep-test-boundary";

    const BRIEF_OUTPUT: &str = "SKILL GAPS:\n- Go\n\n\
                                PREDICTED QUESTIONS:\n- How have you used Kafka?\n\n\
                                TALKING POINTS:\n- Built REST APIs in Python\n";

    struct FixedClient(&'static str);

    #[async_trait]
    impl CompletionClient for FixedClient {
        async fn complete(
            &self,
            _prompt: CompletionPrompt<'_>,
            _config: &CompletionConfig,
        ) -> Result<String, CompletionError> {
            Ok(self.0.to_string())
        }
    }

    enum Part {
        File(&'static str, &'static str, &'static [u8]),
        Text(&'static str, &'static str),
    }

    fn test_state(output: &'static str) -> AppState {
        let config = Config::from_lookup(|key| {
            (key == "ANTHROPIC_API_KEY").then(|| "sk-test".to_string())
        })
        .unwrap();
        AppState {
            pipeline: Pipeline::new(Arc::new(FixedClient(output)), config.completion_config()),
            http: reqwest::Client::new(),
            config,
        }
    }

    fn multipart_body(parts: &[Part]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::File(name, file_name, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                             Content-Type: application/octet-stream\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                            .as_bytes(),
                    );
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn post_brief(state: AppState, parts: &[Part]) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/briefs")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        build_router(state).oneshot(request).await.unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_generates_brief_from_declared_formats() {
        let response = post_brief(
            test_state(BRIEF_OUTPUT),
            &[
                Part::File("jd", "jd.bin", b"Backend Engineer. Go, Kafka."),
                Part::Text("jd_format", "text"),
                Part::File("cv", "cv.bin", b"Python developer, REST APIs."),
                Part::Text("cv_format", "TEXT"),
            ],
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["brief"]["skill_gaps"][0], "Go");
        assert_eq!(body["brief"]["partial"], false);
        assert!(body["request_id"].is_string());
        assert!(body["generated_at"].is_string());
        assert!(body["markdown"]
            .as_str()
            .unwrap()
            .contains("## Skill Gaps\n\n- Go"));
    }

    #[tokio::test]
    async fn test_format_is_inferred_from_file_name() {
        let response = post_brief(
            test_state(BRIEF_OUTPUT),
            &[
                Part::File("jd", "posting.html", b"<h1>Go Engineer</h1><p>Kafka</p>"),
                Part::File("cv", "cv.txt", b"Python developer"),
            ],
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_partial_brief_is_still_ok() {
        let response = post_brief(
            test_state("SKILL GAPS:\n- Go\n"),
            &[
                Part::File("jd", "jd.txt", b"Go"),
                Part::File("cv", "cv.txt", b"Python"),
            ],
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["brief"]["partial"], true);
        assert!(body["markdown"].as_str().unwrap().contains("Partial brief"));
    }

    #[tokio::test]
    async fn test_missing_cv_is_validation_error() {
        let response = post_brief(
            test_state(BRIEF_OUTPUT),
            &[Part::File("jd", "jd.txt", b"Go engineer")],
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_jd_file_and_url_are_mutually_exclusive() {
        let response = post_brief(
            test_state(BRIEF_OUTPUT),
            &[
                Part::File("jd", "jd.txt", b"Go engineer"),
                Part::Text("jd_url", "https://jobs.example.com/1"),
                Part::File("cv", "cv.txt", b"Python"),
            ],
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_extension_without_tag_is_validation_error() {
        let response = post_brief(
            test_state(BRIEF_OUTPUT),
            &[
                Part::File("jd", "jd.txt", b"Go engineer"),
                Part::File("cv", "cv.docx", b"PK\x03\x04"),
            ],
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("cv_format"));
    }

    #[tokio::test]
    async fn test_unsupported_declared_format_is_415() {
        let response = post_brief(
            test_state(BRIEF_OUTPUT),
            &[
                Part::File("jd", "jd.txt", b"Go engineer"),
                Part::File("cv", "cv.docx", b"PK\x03\x04"),
                Part::Text("cv_format", "docx"),
            ],
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "UNSUPPORTED_FORMAT");
        assert_eq!(body["error"]["stage"], "extraction");
    }

    #[tokio::test]
    async fn test_blank_cv_is_422() {
        let response = post_brief(
            test_state(BRIEF_OUTPUT),
            &[
                Part::File("jd", "jd.txt", b"Go engineer"),
                Part::File("cv", "cv.txt", b"  \r\n\t "),
            ],
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "EMPTY_INPUT");
        assert_eq!(body["error"]["stage"], "request_build");
    }

    #[tokio::test]
    async fn test_non_http_jd_url_is_rejected_before_fetching() {
        let response = post_brief(
            test_state(BRIEF_OUTPUT),
            &[
                Part::Text("jd_url", "ftp://jobs.example.com/1"),
                Part::File("cv", "cv.txt", b"Python"),
            ],
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "INVALID_URL");
        assert_eq!(body["error"]["stage"], "fetch");
    }

    #[tokio::test]
    async fn test_unreadable_completion_output_is_502() {
        let response = post_brief(
            test_state("I'm sorry, I can't help with that."),
            &[
                Part::File("jd", "jd.txt", b"Go engineer"),
                Part::File("cv", "cv.txt", b"Python"),
            ],
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "UNPARSABLE_RESPONSE");
        assert_eq!(body["error"]["stage"], "parsing");
    }

    #[tokio::test]
    async fn test_health_reports_service_and_model() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = build_router(test_state(BRIEF_OUTPUT))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "prep-api");
        assert_eq!(body["model"], crate::llm_client::DEFAULT_MODEL);
    }
}
