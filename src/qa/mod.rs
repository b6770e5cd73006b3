pub mod client;
pub mod crosscheck;

pub use client::LlmClient;
pub use crosscheck::{render_crosschecks, run_crosschecks, standard_checks};

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

/// Anything that can answer a natural-language question about the tidy CSV.
#[async_trait]
pub trait QaBackend: Send + Sync {
    /// Free-text answer; no structure is imposed on the reply.
    async fn ask(&self, csv: &str, question: &str) -> Result<String>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

#[derive(Debug)]
pub struct Answer {
    pub question: String,
    pub reply: std::result::Result<String, String>,
}

/// Ask each question in turn. A failed question is recorded, not fatal.
pub async fn ask_questions(
    backend: &dyn QaBackend,
    csv: &str,
    questions: &[String],
) -> Vec<Answer> {
    let mut answers = Vec::with_capacity(questions.len());
    for q in questions {
        let reply = match backend.ask(csv, q).await {
            Ok(text) => {
                info!("[{}] Q: {}\nA: {}", backend.name(), q, text);
                Ok(text)
            }
            Err(e) => {
                warn!("[{}] question failed: {:#}", backend.name(), e);
                Err(format!("{:#}", e))
            }
        };
        answers.push(Answer {
            question: q.clone(),
            reply,
        });
    }
    answers
}

pub fn render_answers(answers: &[Answer]) -> String {
    answers
        .iter()
        .map(|a| match &a.reply {
            Ok(text) => format!("Q: {}\nA: {}\n\n", a.question, text.trim_end()),
            Err(e) => format!("Q: {}\nERROR: {}\n\n", a.question, e),
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use anyhow::anyhow;

    /// Replies with the first scripted answer whose key occurs in the question.
    pub struct Scripted(pub Vec<(&'static str, &'static str)>);

    #[async_trait]
    impl QaBackend for Scripted {
        async fn ask(&self, _csv: &str, question: &str) -> Result<String> {
            self.0
                .iter()
                .find(|(key, _)| question.contains(key))
                .map(|(_, reply)| reply.to_string())
                .ok_or_else(|| anyhow!("no scripted reply"))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::Scripted;
    use super::*;

    #[tokio::test]
    async fn failures_are_kept_alongside_answers() {
        let backend = Scripted(vec![("record", "They went 10-9.")]);
        let questions = vec![
            "What was the record?".to_string(),
            "Who won most?".to_string(),
        ];
        let answers = ask_questions(&backend, "date\n", &questions).await;
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0].reply.as_deref(), Ok("They went 10-9."));
        assert!(answers[1].reply.is_err());

        let text = render_answers(&answers);
        assert!(text.contains("A: They went 10-9."));
        assert!(text.contains("ERROR: no scripted reply"));
    }
}
