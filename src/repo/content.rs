use chrono::{DateTime, Utc};

use sqlx::PgPool;

use uuid::Uuid;

use crate::model::{Post, Project};

use super::RepoResult;

/// Read-only access to published content.
/// Only the displayable fields are loaded; the pipeline never writes here.
#[async_trait::async_trait]
pub trait ContentRepo: Send + Sync {
    async fn find_post(&self, id: Uuid) -> RepoResult<Option<Post>>;

    async fn find_project(&self, id: Uuid) -> RepoResult<Option<Project>>;

    /// Most recently published post, used by the preview endpoint
    async fn latest_post(&self) -> RepoResult<Option<Post>>;

    /// Most recently created project, used by the preview endpoint
    async fn latest_project(&self) -> RepoResult<Option<Project>>;
}

#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    title: String,
    slug: String,
    excerpt: Option<String>,
    tags: Vec<String>,
    image_url: Option<String>,
    published_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            excerpt: row.excerpt,
            tags: row.tags,
            image_url: row.image_url,
            published_at: row.published_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    title: String,
    description: String,
    tags: Vec<String>,
    image_url: Option<String>,
    repo_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            tags: row.tags,
            image_url: row.image_url,
            repo_url: row.repo_url,
            created_at: row.created_at,
        }
    }
}

const POST_COLUMNS: &str = "id, title, slug, excerpt, tags, image_url, published_at";
const PROJECT_COLUMNS: &str = "id, title, description, tags, image_url, repo_url, created_at";

/// Postgres content repository
#[derive(Debug, Clone)]
pub struct PgContentRepo {
    pool: PgPool,
}

impl PgContentRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ContentRepo for PgContentRepo {
    #[tracing::instrument(name = "Find post by id", skip(self))]
    async fn find_post(&self, id: Uuid) -> RepoResult<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "select {} from posts where id = $1",
            POST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Post::from))
    }

    #[tracing::instrument(name = "Find project by id", skip(self))]
    async fn find_project(&self, id: Uuid) -> RepoResult<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "select {} from projects where id = $1",
            PROJECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Project::from))
    }

    #[tracing::instrument(name = "Fetch latest post", skip(self))]
    async fn latest_post(&self) -> RepoResult<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "select {} from posts order by published_at desc limit 1",
            POST_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Post::from))
    }

    #[tracing::instrument(name = "Fetch latest project", skip(self))]
    async fn latest_project(&self) -> RepoResult<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "select {} from projects order by created_at desc limit 1",
            PROJECT_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Project::from))
    }
}
