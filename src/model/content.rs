use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use serde::{Deserialize, Serialize};

use uuid::Uuid;

/// Kind of published content a queue item points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    BlogPost,
    Project,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BlogPost => "blog_post",
            Self::Project => "project",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "blog_post" => Ok(Self::BlogPost),
            "project" => Ok(Self::Project),
            other => Err(format!("{} is not a valid content type", other)),
        }
    }
}

/// Displayable fields of a published blog post.
/// The full post body lives in the content store and is never emailed,
/// only the excerpt is.
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
}

/// Displayable fields of a published project
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub repo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
