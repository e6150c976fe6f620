//! Topic loaders for the course's well-known JSON documents.
//!
//! These sit on top of [`DataLoader`] and own the fallback policy: a document
//! that cannot be loaded is replaced by a small built-in default so the page
//! stays usable. The loader itself never substitutes data.

use crate::loader::DataLoader;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub const QUIZ_QUESTIONS_KEY: &str = "/data/quiz-questions.json";
pub const SETTINGS_KEY: &str = "/data/config.json";
pub const CONTENT_EXAMPLES_KEY: &str = "/data/content-examples.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`
    pub correct: usize,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl QuizQuestion {
    pub fn is_correct(&self, answer: usize) -> bool {
        answer == self.correct
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizBank {
    pub questions: Vec<QuizQuestion>,
}

impl Default for QuizBank {
    fn default() -> Self {
        Self {
            questions: vec![
                QuizQuestion {
                    question: "What does HTML stand for?".to_string(),
                    options: vec![
                        "Hyper Text Markup Language".to_string(),
                        "High Tech Modern Language".to_string(),
                        "Hyperlink Text Management Language".to_string(),
                    ],
                    correct: 0,
                    explanation: None,
                },
                QuizQuestion {
                    question: "Which CSS property changes the text color?".to_string(),
                    options: vec![
                        "font-color".to_string(),
                        "color".to_string(),
                        "text-color".to_string(),
                    ],
                    correct: 1,
                    explanation: Some("`color` sets the foreground color of text.".to_string()),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub theme: String,
    pub language: String,
    pub show_hints: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            language: "en".to_string(),
            show_hints: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentExample {
    pub title: String,
    pub code: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentExamples {
    pub examples: Vec<ContentExample>,
}

impl Default for ContentExamples {
    fn default() -> Self {
        Self {
            examples: vec![ContentExample {
                title: "Hello, world".to_string(),
                code: "<p>Hello, world!</p>".to_string(),
                language: Some("html".to_string()),
            }],
        }
    }
}

pub async fn load_quiz_questions(loader: &DataLoader) -> QuizBank {
    load_or_default(loader, QUIZ_QUESTIONS_KEY).await
}

pub async fn load_settings(loader: &DataLoader) -> Settings {
    load_or_default(loader, SETTINGS_KEY).await
}

pub async fn load_content_examples(loader: &DataLoader) -> ContentExamples {
    load_or_default(loader, CONTENT_EXAMPLES_KEY).await
}

async fn load_or_default<T>(loader: &DataLoader, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match loader.get_or_fetch_as(key).await {
        Ok(document) => document,
        Err(err) => {
            log::warn!(
                "Using built-in fallback for {} ({}): {}",
                key,
                err.kind(),
                err
            );
            T::default()
        }
    }
}
