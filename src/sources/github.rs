use std::process::Command;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::{Reaction, ReactionKind, ReviewSource, ReviewThread, ThreadComment, ThreadKey};

/// Login GitHub reports for deleted accounts.
const GHOST_LOGIN: &str = "ghost";

const REVIEW_THREADS_QUERY: &str = r#"
    query($owner: String!, $name: String!, $number: Int!) {
      repository(owner: $owner, name: $name) {
        pullRequest(number: $number) {
          reviewThreads(first: 100) {
            nodes {
              isResolved
              comments(first: 50) {
                nodes {
                  id body url
                  author { login }
                  reactions(first: 50) {
                    nodes { content user { login } }
                  }
                }
              }
            }
          }
        }
      }
    }
"#;

/// Abstraction over `gh` CLI execution for testability.
pub trait GhClient: Send + Sync {
    fn run(&self, args: &[&str]) -> Result<String>;
}

/// Real `gh` CLI client. Authentication is whatever `gh` is logged in as.
struct DefaultGhClient;

impl GhClient for DefaultGhClient {
    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("gh")
            .args(args)
            .output()
            .map_err(|e| Error::Source(format!("failed to run gh: {e}")))?;

        if output.status.success() {
            String::from_utf8(output.stdout)
                .map_err(|e| Error::Source(format!("invalid utf8 from gh: {e}")))
        } else {
            Err(classify_gh_failure(&String::from_utf8_lossy(&output.stderr)))
        }
    }
}

/// Map `gh` stderr to an error, singling out rate limiting (primary and
/// secondary limits, or a bare HTTP 429).
pub fn classify_gh_failure(stderr: &str) -> Error {
    let stderr = stderr.trim();
    let lower = stderr.to_ascii_lowercase();
    if lower.contains("rate limit") || lower.contains("http 429") {
        Error::RateLimited(stderr.to_string())
    } else {
        Error::Source(format!("gh failed: {stderr}"))
    }
}

pub struct GitHubSource {
    client: Box<dyn GhClient>,
}

impl Default for GitHubSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GitHubSource {
    pub fn new() -> Self {
        Self {
            client: Box::new(DefaultGhClient),
        }
    }

    pub fn with_client(client: Box<dyn GhClient>) -> Self {
        Self { client }
    }

    fn convert_comment(gql: GqlComment) -> ThreadComment {
        let url = gql.url;
        let reactions = gql
            .reactions
            .nodes
            .into_iter()
            .map(|r| {
                let user = r.user.map(|u| u.login).unwrap_or_else(|| GHOST_LOGIN.into());
                let kind = ReactionKind::from_content(&r.content).unwrap_or_else(|| {
                    warn!(content = %r.content, user = %user, url = %url, "unexpected reaction");
                    ReactionKind::Ignored
                });
                Reaction { kind, user }
            })
            .collect();

        ThreadComment {
            id: gql.id,
            body: gql.body,
            author: gql
                .author
                .map(|a| a.login)
                .unwrap_or_else(|| GHOST_LOGIN.into()),
            url,
            reactions,
        }
    }

    pub fn parse_threads(json: &str) -> Result<Vec<ReviewThread>> {
        let parsed: GqlResponse = serde_json::from_str(json)
            .map_err(|e| Error::Source(format!("failed to parse GraphQL response: {e}")))?;

        if let Some(err) = parsed.errors.first() {
            let message = err.message.clone();
            return Err(match err.kind.as_deref() {
                Some("RATE_LIMITED") => Error::RateLimited(message),
                _ => Error::Source(format!("GraphQL error: {message}")),
            });
        }

        let pull_request = parsed
            .data
            .and_then(|d| d.repository)
            .and_then(|r| r.pull_request)
            .ok_or_else(|| Error::Source("pull request not found".to_string()))?;

        Ok(pull_request
            .review_threads
            .nodes
            .into_iter()
            .map(|t| ReviewThread {
                resolved: t.is_resolved,
                comments: t
                    .comments
                    .nodes
                    .into_iter()
                    .map(Self::convert_comment)
                    .collect(),
            })
            .filter(|t| !t.comments.is_empty())
            .collect())
    }
}

impl ReviewSource for GitHubSource {
    fn fetch_threads(&self, key: &ThreadKey) -> Result<Vec<ReviewThread>> {
        let query = format!("query={REVIEW_THREADS_QUERY}");
        let owner = format!("owner={}", key.owner);
        let name = format!("name={}", key.repo);
        let number = format!("number={}", key.number);
        let json = self.client.run(&[
            "api", "graphql", "-f", &query, "-f", &owner, "-f", &name, "-F", &number,
        ])?;

        let threads = Self::parse_threads(&json)?;
        debug!(key = %key, count = threads.len(), "fetched review threads");
        Ok(threads)
    }
}

// --- GraphQL response types ---

#[derive(Debug, Deserialize)]
struct GqlResponse {
    data: Option<GqlData>,
    #[serde(default)]
    errors: Vec<GqlError>,
}

#[derive(Debug, Deserialize)]
struct GqlError {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct GqlData {
    repository: Option<GqlRepository>,
}

#[derive(Debug, Deserialize)]
struct GqlRepository {
    #[serde(rename = "pullRequest")]
    pull_request: Option<GqlPullRequest>,
}

#[derive(Debug, Deserialize)]
struct GqlPullRequest {
    #[serde(rename = "reviewThreads")]
    review_threads: GqlConnection<GqlThread>,
}

#[derive(Debug, Deserialize)]
struct GqlConnection<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct GqlThread {
    #[serde(rename = "isResolved")]
    is_resolved: bool,
    comments: GqlConnection<GqlComment>,
}

#[derive(Debug, Deserialize)]
struct GqlComment {
    id: String,
    #[serde(default)]
    body: String,
    url: String,
    author: Option<GqlActor>,
    reactions: GqlConnection<GqlReaction>,
}

#[derive(Debug, Deserialize)]
struct GqlActor {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GqlReaction {
    content: String,
    user: Option<GqlActor>,
}
