use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::{DEFAULT_API_URL, Repository};
use crate::error::{Error, Result};

/// REST API version pinned on every request.
pub const API_VERSION: &str = "2022-11-28";

/// Page size for tag listing; GitHub caps it at 100.
const TAGS_PER_PAGE: usize = 100;

/// Body of `POST /repos/{owner}/{repo}/git/tags`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewTag {
    pub tag: String,
    pub message: String,
    /// SHA of the object being tagged.
    pub object: String,
    #[serde(rename = "type")]
    pub object_type: String,
}

/// Tag object returned by the platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatedTag {
    pub tag: String,
    pub sha: String,
}

/// Body of `POST /repos/{owner}/{repo}/releases`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewRelease {
    pub tag_name: String,
    pub name: String,
    pub body: String,
    pub draft: bool,
    pub prerelease: bool,
    pub target_commitish: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatedRelease {
    pub id: u64,
    #[serde(default)]
    pub html_url: String,
}

/// The hosting-platform operations a run depends on.
#[async_trait]
pub trait TagPlatform: Send + Sync {
    /// Names of every tag in the repository.
    async fn list_tags(&self, repo: &Repository) -> Result<Vec<String>>;

    /// Create an annotated tag object. This does not make it reachable.
    async fn create_tag(&self, repo: &Repository, tag: &NewTag) -> Result<CreatedTag>;

    /// Create a reference such as `refs/tags/v1.20240307.0` pointing at `sha`.
    async fn create_ref(&self, repo: &Repository, ref_name: &str, sha: &str) -> Result<()>;

    /// Create a release. The platform creates the tag if it does not exist.
    async fn create_release(
        &self,
        repo: &Repository,
        release: &NewRelease,
    ) -> Result<CreatedRelease>;
}

/// GitHub REST client.
pub struct GitHub {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl GitHub {
    /// Create a client against the public GitHub API.
    pub fn new(token: Option<String>) -> Result<Self> {
        Self::with_base_url(DEFAULT_API_URL, token)
    }

    /// Create a client with a custom API root (GitHub Enterprise, tests).
    pub fn with_base_url(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("datever/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn repo_url(&self, repo: &Repository, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.base_url, repo.owner, repo.name, path
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let req = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send_json<T: DeserializeOwned>(req: RequestBuilder, what: &str) -> Result<T> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        debug!(status = %status, body_len = body.len(), call = what, "GitHub response");
        trace!(body = %body, "GitHub response body");

        if !status.is_success() {
            return Err(Error::Api(format!(
                "{} returned {}: {}",
                what,
                status,
                api_message(&body)
            )));
        }

        serde_json::from_str(&body).map_err(|e| Error::Parse(format!("{what} response: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

#[derive(Debug, Serialize)]
struct NewRef<'a> {
    #[serde(rename = "ref")]
    ref_name: &'a str,
    sha: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Pull GitHub's `message` field out of an error body, falling back to the raw text.
fn api_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.message;
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "empty response body".to_string()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl TagPlatform for GitHub {
    async fn list_tags(&self, repo: &Repository) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut page = 1usize;

        loop {
            let url = format!(
                "{}?per_page={}&page={}",
                self.repo_url(repo, "tags"),
                TAGS_PER_PAGE,
                page
            );
            debug!(url = %url, "listing tags");

            let entries: Vec<TagEntry> =
                Self::send_json(self.request(Method::GET, &url), "list tags").await?;
            let count = entries.len();
            names.extend(entries.into_iter().map(|entry| entry.name));

            if count < TAGS_PER_PAGE {
                break;
            }
            page += 1;
        }

        debug!(repo = %repo, count = names.len(), "listed tags");
        Ok(names)
    }

    async fn create_tag(&self, repo: &Repository, tag: &NewTag) -> Result<CreatedTag> {
        let url = self.repo_url(repo, "git/tags");
        debug!(url = %url, tag = %tag.tag, object = %tag.object, "creating tag object");

        Self::send_json(self.request(Method::POST, &url).json(tag), "create tag").await
    }

    async fn create_ref(&self, repo: &Repository, ref_name: &str, sha: &str) -> Result<()> {
        let url = self.repo_url(repo, "git/refs");
        debug!(url = %url, ref_name = %ref_name, sha = %sha, "creating reference");

        let body = NewRef { ref_name, sha };
        let _: serde_json::Value =
            Self::send_json(self.request(Method::POST, &url).json(&body), "create ref").await?;
        Ok(())
    }

    async fn create_release(
        &self,
        repo: &Repository,
        release: &NewRelease,
    ) -> Result<CreatedRelease> {
        let url = self.repo_url(repo, "releases");
        debug!(url = %url, tag = %release.tag_name, "creating release");

        Self::send_json(self.request(Method::POST, &url).json(release), "create release").await
    }
}
