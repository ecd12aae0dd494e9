use std::env;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use quiz_core::model::{
    Answer, AnswerId, CategoryId, DifficultyId, Question, QuestionId, QuizId,
};

use crate::error::{FetchError, SaveError};

//
// ─── COLLABORATOR CONTRACTS ───────────────────────────────────────────────────
//

/// Source of question sets for a category/difficulty pair.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Fetches up to `limit` questions.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::NotFound` when the combination yields zero
    /// questions and a transport variant on network or server failure.
    async fn fetch_questions(
        &self,
        category: CategoryId,
        difficulty: DifficultyId,
        limit: u32,
    ) -> Result<Vec<Question>, FetchError>;
}

/// Endpoint that persists a completed quiz result.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Saves a result for the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `SaveError::Unauthorized` for a 401-equivalent response and
    /// a transport variant otherwise.
    async fn save_result(&self, submission: &ResultSubmission) -> Result<SavedResult, SaveError>;
}

/// Payload of a result save, mirroring the backend's quiz-result record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSubmission {
    #[serde(rename = "quiz")]
    pub quiz_id: QuizId,
    pub score: u32,
    pub total_possible: u32,
    pub percentage: f64,
    #[serde(rename = "time_taken")]
    pub time_taken_seconds: u64,
}

/// What the backend reports after storing a result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SavedResult {
    pub id: u64,
    #[serde(default)]
    pub passed: bool,
    #[serde(default)]
    pub percentage: f64,
}

//
// ─── HTTP CLIENT ──────────────────────────────────────────────────────────────
//

#[derive(Clone, Debug)]
pub struct QuizApiConfig {
    pub base_url: String,
    pub bearer_token: Option<String>,
}

impl QuizApiConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bearer_token: None,
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Reads `QUIZ_API_BASE_URL` and `QUIZ_API_TOKEN` from the environment.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("QUIZ_API_BASE_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        let bearer_token = env::var("QUIZ_API_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());
        Some(Self {
            base_url,
            bearer_token,
        })
    }
}

/// REST client for the quiz backend.
///
/// Questions arrive without their choices; choices are fetched per question
/// from the answers endpoint and merged, sorted by display order. Both
/// endpoints may wrap their payload in a pagination envelope.
#[derive(Clone)]
pub struct HttpQuizApi {
    client: Client,
    config: QuizApiConfig,
}

impl HttpQuizApi {
    #[must_use]
    pub fn new(config: QuizApiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn fetch_answers(&self, question: QuestionId) -> Result<Vec<WireAnswer>, FetchError> {
        let response = self
            .authorize(self.client.get(self.url("quiz/answers/")))
            .query(&[("question", question.value())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }
        let page: Page<WireAnswer> = response.json().await?;
        Ok(page.into_items())
    }
}

#[async_trait]
impl QuestionSource for HttpQuizApi {
    async fn fetch_questions(
        &self,
        category: CategoryId,
        difficulty: DifficultyId,
        limit: u32,
    ) -> Result<Vec<Question>, FetchError> {
        let response = self
            .authorize(self.client.get(self.url("quiz/questions/")))
            .query(&[
                ("category", category.value()),
                ("difficulty", difficulty.value()),
                ("limit", u64::from(limit)),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(FetchError::NotFound),
            status if !status.is_success() => return Err(FetchError::Status(status)),
            _ => {}
        }

        let page: Page<WireQuestion> = response.json().await?;
        let wire_questions = page.into_items();
        if wire_questions.is_empty() {
            return Err(FetchError::NotFound);
        }

        let mut questions = Vec::with_capacity(wire_questions.len());
        for wire in wire_questions {
            let answers = self.fetch_answers(QuestionId::new(wire.id)).await?;
            questions.push(wire.into_question(answers)?);
        }
        Ok(questions)
    }
}

#[async_trait]
impl ResultSink for HttpQuizApi {
    async fn save_result(&self, submission: &ResultSubmission) -> Result<SavedResult, SaveError> {
        let response = self
            .authorize(self.client.post(self.url("quiz/quiz-results/")))
            .json(submission)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SaveError::Unauthorized),
            status if !status.is_success() => Err(SaveError::Status(status)),
            _ => Ok(response.json().await?),
        }
    }
}

//
// ─── WIRE SHAPES ──────────────────────────────────────────────────────────────
//

/// Either a bare list or a DRF-style pagination envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Page<T> {
    Envelope { results: Vec<T> },
    Bare(Vec<T>),
}

impl<T> Page<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            Page::Envelope { results } => results,
            Page::Bare(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireQuestion {
    id: u64,
    #[serde(default)]
    quiz: Option<u64>,
    question_text: String,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default = "default_points")]
    points: u32,
    #[serde(default)]
    display_order: u32,
}

fn default_points() -> u32 {
    10
}

impl WireQuestion {
    fn into_question(self, answers: Vec<WireAnswer>) -> Result<Question, FetchError> {
        let answers: Vec<Answer> = answers.into_iter().map(WireAnswer::into_answer).collect();
        let explanation = self.explanation.filter(|text| !text.trim().is_empty());
        let question = Question::new(
            QuestionId::new(self.id),
            self.question_text,
            explanation,
            self.points,
            self.display_order,
            answers,
        )
        // a question the backend serves without choices is unusable content
        .map_err(|_| FetchError::NotFound)?;

        Ok(match self.quiz {
            Some(quiz) => question.with_quiz(QuizId::new(quiz)),
            None => question,
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireAnswer {
    id: u64,
    answer_text: String,
    #[serde(default)]
    is_correct: bool,
    #[serde(default)]
    display_order: u32,
}

impl WireAnswer {
    fn into_answer(self) -> Answer {
        Answer::new(
            AnswerId::new(self.id),
            self.answer_text,
            self.is_correct,
            self.display_order,
        )
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_envelope_and_bare_list_both_parse() {
        let envelope: Page<WireAnswer> = serde_json::from_str(
            r#"{"count": 1, "next": null, "previous": null,
                "results": [{"id": 1, "answer_text": "a", "is_correct": true, "display_order": 0}]}"#,
        )
        .unwrap();
        assert_eq!(envelope.into_items().len(), 1);

        let bare: Page<WireAnswer> = serde_json::from_str(
            r#"[{"id": 1, "answer_text": "a", "is_correct": false, "display_order": 2}]"#,
        )
        .unwrap();
        assert_eq!(bare.into_items().len(), 1);
    }

    #[test]
    fn wire_question_merges_answers_sorted() {
        let wire = WireQuestion {
            id: 3,
            quiz: Some(7),
            question_text: "borrow checker?".into(),
            explanation: Some("".into()),
            points: 10,
            display_order: 1,
        };
        let answers = vec![
            WireAnswer {
                id: 2,
                answer_text: "later".into(),
                is_correct: false,
                display_order: 5,
            },
            WireAnswer {
                id: 1,
                answer_text: "first".into(),
                is_correct: true,
                display_order: 1,
            },
        ];

        let question = wire.into_question(answers).unwrap();
        assert_eq!(question.quiz_id(), Some(QuizId::new(7)));
        assert_eq!(question.explanation(), None);
        assert_eq!(question.answers()[0].id, AnswerId::new(1));
    }

    #[test]
    fn submission_serializes_backend_field_names() {
        let submission = ResultSubmission {
            quiz_id: QuizId::new(4),
            score: 20,
            total_possible: 30,
            percentage: 66.67,
            time_taken_seconds: 95,
        };
        let value = serde_json::to_value(&submission).unwrap();
        assert_eq!(value["quiz"], 4);
        assert_eq!(value["total_possible"], 30);
        assert_eq!(value["time_taken"], 95);
    }
}
