use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ClientError, Result};

pub const QUERY_TOP_K_MAX: u32 = 30;
pub const GENERATION_TOP_K_MAX: u32 = 20;

/// Models and content source chosen in the setup flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub chat_model: String,
    pub embed_model: String,
    pub content_source_path: String,
}

impl SessionConfig {
    pub fn new(
        chat_model: impl Into<String>,
        embed_model: impl Into<String>,
        content_source_path: impl Into<String>,
    ) -> Self {
        Self {
            chat_model: chat_model.into(),
            embed_model: embed_model.into(),
            content_source_path: content_source_path.into(),
        }
    }

    /// All three fields must be non-empty after trimming.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("chat_model", &self.chat_model),
            ("embed_model", &self.embed_model),
            ("content_source_path", &self.content_source_path),
        ] {
            if value.trim().is_empty() {
                return Err(ClientError::validation(field, "Please provide all inputs."));
            }
        }
        Ok(())
    }
}

// Wire format for POST /setup
#[derive(Debug, Serialize)]
pub struct SetupPayload<'a> {
    #[serde(rename = "modelChat")]
    pub model_chat: &'a str,
    #[serde(rename = "modelEmbed")]
    pub model_embed: &'a str,
    #[serde(rename = "mdSource")]
    pub md_source: &'a str,
}

impl<'a> From<&'a SessionConfig> for SetupPayload<'a> {
    fn from(config: &'a SessionConfig) -> Self {
        Self {
            model_chat: &config.chat_model,
            model_embed: &config.embed_model,
            md_source: &config.content_source_path,
        }
    }
}

/// A natural-language question for the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub text: String,
    pub result_count: u32,
}

impl QueryRequest {
    /// Build a request, rejecting a result count outside `1..=30`.
    ///
    /// The text is checked when the request is asked, not here.
    pub fn new(text: impl Into<String>, result_count: u32) -> Result<Self> {
        check_top_k(result_count, QUERY_TOP_K_MAX)?;
        Ok(Self {
            text: text.into(),
            result_count,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(ClientError::validation("query", "Please enter a query."));
        }
        check_top_k(self.result_count, QUERY_TOP_K_MAX)
    }
}

// Wire format for POST /ask
#[derive(Debug, Serialize)]
pub struct QueryPayload<'a> {
    pub query: &'a str,
    pub top_k: u32,
}

/// Answer plus the reference snippets it was drawn from. Both are markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    #[serde(default)]
    pub references: Vec<String>,
}

/// Generation kinds offered by the backend under `/gen/{category}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Npc,
    Location,
    Puzzle,
    Item,
    Rumour,
    Name,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Npc,
        Category::Location,
        Category::Puzzle,
        Category::Item,
        Category::Rumour,
        Category::Name,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Npc => "npc",
            Category::Location => "location",
            Category::Puzzle => "puzzle",
            Category::Item => "item",
            Category::Rumour => "rumour",
            Category::Name => "name",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Npc => "NPC",
            Category::Location => "Location",
            Category::Puzzle => "Puzzle",
            Category::Item => "Item",
            Category::Rumour => "Rumour",
            Category::Name => "Name",
        }
    }

    pub fn endpoint(&self) -> String {
        format!("/gen/{}", self.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| {
                ClientError::validation(
                    "category",
                    format!(
                        "Unknown category '{s}'. Choose one of: npc, location, puzzle, item, rumour, name"
                    ),
                )
            })
    }
}

/// A content-generation request. The prompt may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub category: Category,
    pub result_count: u32,
    pub prompt: String,
}

impl GenerationRequest {
    pub fn new(category: Category, result_count: u32, prompt: impl Into<String>) -> Result<Self> {
        check_top_k(result_count, GENERATION_TOP_K_MAX)?;
        Ok(Self {
            category,
            result_count,
            prompt: prompt.into(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        check_top_k(self.result_count, GENERATION_TOP_K_MAX)
    }
}

// Wire format for POST /gen/{category}
#[derive(Debug, Serialize)]
pub struct GenerationBody<'a> {
    pub top_k: u32,
    pub query: &'a str,
}

fn check_top_k(value: u32, max: u32) -> Result<()> {
    if (1..=max).contains(&value) {
        Ok(())
    } else {
        Err(ClientError::validation(
            "top_k",
            format!("Result count must be between 1 and {max}, got {value}."),
        ))
    }
}
