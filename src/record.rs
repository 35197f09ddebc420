use crate::error::PrepBookError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn label(self) -> &'static str {
        match self {
            Confidence::Low => "Low",
            Confidence::Medium => "Medium",
            Confidence::High => "High",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningBrief {
    /// Percentage, 0..=100.
    pub match_score: u8,
    pub prep_time: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionTopic {
    pub title: String,
    pub confidence: Confidence,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    /// Must equal one entry of `options` exactly.
    pub answer: String,
    #[serde(default)]
    pub explanation: String,
}

impl Question {
    pub fn answer_index(&self) -> Option<usize> {
        self.options.iter().position(|option| *option == self.answer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepRecord {
    pub job_title: String,
    pub company: String,
    #[serde(default)]
    pub brief: Option<OpeningBrief>,
    #[serde(default)]
    pub topics: Vec<RevisionTopic>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub qa_pairs: Vec<QaPair>,
}

impl PrepRecord {
    /// Rejects questions whose answer is not one of their options.
    pub fn validate_questions(&self) -> Result<(), PrepBookError> {
        answer_indices(&self.questions).map(|_| ())
    }
}

/// Option index of each question's answer, failing on the first unmatched one.
pub fn answer_indices(questions: &[Question]) -> Result<Vec<usize>, PrepBookError> {
    questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            question
                .answer_index()
                .ok_or_else(|| PrepBookError::UnmatchedAnswer {
                    question: index + 1,
                    answer: question.answer.clone(),
                })
        })
        .collect()
}

/// Which sections make it into the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionOptions {
    pub include_brief: bool,
    pub include_topics: bool,
    pub include_questions: bool,
    pub include_qa: bool,
}

impl Default for SectionOptions {
    fn default() -> Self {
        Self::all()
    }
}

impl SectionOptions {
    pub fn all() -> Self {
        Self {
            include_brief: true,
            include_topics: true,
            include_questions: true,
            include_qa: true,
        }
    }

    pub fn none() -> Self {
        Self {
            include_brief: false,
            include_topics: false,
            include_questions: false,
            include_qa: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_json() {
        let json = r#"{
            "jobTitle": "Backend Engineer",
            "company": "Acme",
            "brief": {"matchScore": 82, "prepTime": "3 hours", "skills": ["Rust"], "body": "Hi"},
            "topics": [{"title": "Caching", "confidence": "medium", "reason": "gap", "body": "x"}],
            "questions": [{"question": "Q?", "options": ["a", "b"], "answer": "b", "explanation": "e"}],
            "qaPairs": [{"question": "Why?", "answer": "Because"}]
        }"#;
        let record: PrepRecord = serde_json::from_str(json).expect("record");
        assert_eq!(record.job_title, "Backend Engineer");
        assert_eq!(record.brief.as_ref().map(|b| b.match_score), Some(82));
        assert_eq!(record.topics[0].confidence, Confidence::Medium);
        assert_eq!(record.questions[0].answer_index(), Some(1));
        assert_eq!(record.qa_pairs.len(), 1);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let record: PrepRecord =
            serde_json::from_str(r#"{"jobTitle": "Dev", "company": "X"}"#).expect("record");
        assert!(record.brief.is_none());
        assert!(record.topics.is_empty());
        assert!(record.questions.is_empty());
        assert!(record.qa_pairs.is_empty());
    }

    #[test]
    fn unmatched_answer_is_rejected_with_its_position() {
        let record = PrepRecord {
            questions: vec![
                Question {
                    question: "ok".into(),
                    options: vec!["a".into(), "b".into()],
                    answer: "a".into(),
                    explanation: String::new(),
                },
                Question {
                    question: "bad".into(),
                    options: vec!["a".into(), "b".into()],
                    answer: "c".into(),
                    explanation: String::new(),
                },
            ],
            ..PrepRecord::default()
        };
        match record.validate_questions() {
            Err(PrepBookError::UnmatchedAnswer { question, answer }) => {
                assert_eq!(question, 2);
                assert_eq!(answer, "c");
            }
            other => panic!("expected unmatched answer, got {other:?}"),
        }
    }

    #[test]
    fn answer_match_is_exact() {
        let question = Question {
            question: "q".into(),
            options: vec!["Paris".into()],
            answer: "paris".into(),
            explanation: String::new(),
        };
        assert_eq!(question.answer_index(), None);
    }
}
