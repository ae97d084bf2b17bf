//! GitHub REST transport for [`ReleaseHost`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::{
    CommitRef, HostError, HostResult, PublishedRelease, ReleaseHost, ReleaseRef, ReleaseRequest,
    RepoRef, TagRef, pages,
};

/// Public GitHub API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const PER_PAGE: u32 = 100;
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("drafty/", env!("CARGO_PKG_VERSION"));
const TIMEOUT: Duration = Duration::from_secs(30);

/// Annotated tags can point at other tags; stop peeling after this many hops.
const MAX_PEEL_DEPTH: usize = 8;

// ──────────────────────────────────────────────
// Wire types
// ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GhTag {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GhCommit {
    sha: String,
    commit: GhCommitDetail,
}

#[derive(Debug, Deserialize)]
struct GhCommitDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GhRef {
    object: GhObject,
}

#[derive(Debug, Deserialize)]
struct GhObject {
    sha: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct GhRelease {
    id: u64,
    tag_name: String,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct GhError {
    message: String,
}

impl From<GhRelease> for ReleaseRef {
    fn from(r: GhRelease) -> Self {
        Self {
            id: r.id,
            tag_name: r.tag_name,
            draft: r.draft,
            url: r.html_url,
        }
    }
}

impl From<GhRelease> for PublishedRelease {
    fn from(r: GhRelease) -> Self {
        Self {
            id: r.id,
            url: r.html_url,
            tag_name: r.tag_name,
        }
    }
}

// ──────────────────────────────────────────────
// Client
// ──────────────────────────────────────────────

/// A [`ReleaseHost`] backed by the GitHub REST API, bound to one repository.
pub struct GitHubHost {
    client: Client,
    base_url: String,
    repo: RepoRef,
    token: Option<String>,
}

impl fmt::Debug for GitHubHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubHost")
            .field("base_url", &self.base_url)
            .field("repo", &self.repo)
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl GitHubHost {
    /// Create a host for `repo` against the public API.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Http`] if the HTTP client cannot be built.
    pub fn new(repo: RepoRef, token: Option<String>) -> HostResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, repo, token))
    }

    /// Create a host around an existing client.
    pub fn with_client(client: Client, repo: RepoRef, token: Option<String>) -> Self {
        Self {
            client,
            base_url: DEFAULT_API_URL.to_string(),
            repo,
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Point at a different API root, e.g. GitHub Enterprise or a test server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The repository this host is bound to.
    pub const fn repo(&self) -> &RepoRef {
        &self.repo
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.base_url, self.repo.owner, self.repo.repo, path
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, self.url(path))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_json<T: DeserializeOwned>(
        operation: &str,
        request: RequestBuilder,
    ) -> HostResult<T> {
        let response = Self::check(operation, request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn check(operation: &str, response: Response) -> HostResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<GhError>(&body).map_or(body, |e| e.message);
        Err(HostError::Api {
            operation: operation.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    async fn releases_page(&self, page: u32) -> HostResult<Vec<ReleaseRef>> {
        let request = self
            .request(Method::GET, "releases")
            .query(&[("per_page", PER_PAGE), ("page", page)]);
        let releases: Vec<GhRelease> = Self::send_json("list releases", request).await?;
        Ok(releases.into_iter().map(ReleaseRef::from).collect())
    }

    async fn peel_tag(&self, mut object: GhObject) -> HostResult<String> {
        for _ in 0..MAX_PEEL_DEPTH {
            if object.kind != "tag" {
                return Ok(object.sha);
            }
            debug!(sha = %object.sha, "peeling annotated tag");
            let request = self.request(Method::GET, &format!("git/tags/{}", object.sha));
            let tag: GhRef = Self::send_json("get tag object", request).await?;
            object = tag.object;
        }
        if object.kind == "tag" {
            return Err(HostError::TagChainTooDeep {
                sha: object.sha,
                hops: MAX_PEEL_DEPTH,
            });
        }
        Ok(object.sha)
    }
}

#[async_trait]
impl ReleaseHost for GitHubHost {
    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn list_tags(&self, page: u32) -> HostResult<Vec<TagRef>> {
        let request = self
            .request(Method::GET, "tags")
            .query(&[("per_page", PER_PAGE), ("page", page)]);
        let tags: Vec<GhTag> = Self::send_json("list tags", request).await?;
        Ok(tags.into_iter().map(|t| TagRef { name: t.name }).collect())
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn list_commits(&self, head: &str, page: u32) -> HostResult<Vec<CommitRef>> {
        let request = self.request(Method::GET, "commits").query(&[
            ("sha", head.to_string()),
            ("per_page", PER_PAGE.to_string()),
            ("page", page.to_string()),
        ]);
        let commits: Vec<GhCommit> = Self::send_json("list commits", request).await?;
        Ok(commits
            .into_iter()
            .map(|c| CommitRef {
                sha: c.sha,
                message: c.commit.message,
            })
            .collect())
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn get_ref(&self, ref_name: &str) -> HostResult<String> {
        let request = self.request(Method::GET, &format!("git/ref/{ref_name}"));
        let found: GhRef = Self::send_json("get ref", request).await?;
        self.peel_tag(found.object).await
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn list_releases(&self) -> HostResult<Vec<ReleaseRef>> {
        pages::drain(move |page| self.releases_page(page)).await
    }

    #[instrument(skip(self, request), fields(repo = %self.repo, tag = %request.tag_name))]
    async fn create_release(&self, request: &ReleaseRequest) -> HostResult<PublishedRelease> {
        let builder = self.request(Method::POST, "releases").json(request);
        let release: GhRelease = Self::send_json("create release", builder).await?;
        Ok(release.into())
    }

    #[instrument(skip(self, request), fields(repo = %self.repo, tag = %request.tag_name))]
    async fn update_release(
        &self,
        id: u64,
        request: &ReleaseRequest,
    ) -> HostResult<PublishedRelease> {
        let builder = self
            .request(Method::PATCH, &format!("releases/{id}"))
            .json(request);
        let release: GhRelease = Self::send_json("update release", builder).await?;
        Ok(release.into())
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn delete_release(&self, id: u64) -> HostResult<()> {
        let request = self.request(Method::DELETE, &format!("releases/{id}"));
        Self::check("delete release", request.send().await?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn host(server: &MockServer) -> GitHubHost {
        let repo: RepoRef = "octo/widgets".parse().unwrap();
        GitHubHost::new(repo, Some("t0ken".into()))
            .unwrap()
            .with_base_url(server.uri())
    }

    fn request() -> ReleaseRequest {
        ReleaseRequest {
            tag_name: "v1.1.0".into(),
            name: "1.1.0".into(),
            body: "### Features".into(),
            draft: true,
            target_commitish: Some("main".into()),
        }
    }

    #[tokio::test]
    async fn list_tags_sends_paging_and_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/tags"))
            .and(query_param("per_page", "100"))
            .and(query_param("page", "2"))
            .and(header("Authorization", "Bearer t0ken"))
            .and(header("Accept", "application/vnd.github+json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{ "name": "v1.0.0" }, { "name": "v0.9.0" }])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let tags = host(&server).await.list_tags(2).await.unwrap();
        assert_eq!(
            tags,
            [
                TagRef { name: "v1.0.0".into() },
                TagRef { name: "v0.9.0".into() }
            ]
        );
    }

    #[tokio::test]
    async fn anonymous_requests_omit_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let repo: RepoRef = "octo/widgets".parse().unwrap();
        let host = GitHubHost::new(repo, Some("  ".into()))
            .unwrap()
            .with_base_url(format!("{}/", server.uri()));
        assert!(host.list_tags(1).await.unwrap().is_empty());

        let received = server.received_requests().await.unwrap();
        assert!(received[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn list_commits_maps_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/commits"))
            .and(query_param("sha", "abc123"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "sha": "abc123", "commit": { "message": "feat: new\n\nbody" } },
                { "sha": "def456", "commit": { "message": "fix: old" } }
            ])))
            .mount(&server)
            .await;

        let commits = host(&server).await.list_commits("abc123", 1).await.unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].sha, "abc123");
        assert_eq!(commits[0].message, "feat: new\n\nbody");
        assert_eq!(commits[1].message, "fix: old");
    }

    #[tokio::test]
    async fn get_ref_lightweight_tag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/git/ref/heads/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ref": "refs/heads/main",
                "object": { "sha": "head-sha", "type": "commit" }
            })))
            .mount(&server)
            .await;

        let sha = host(&server).await.get_ref("heads/main").await.unwrap();
        assert_eq!(sha, "head-sha");
    }

    #[tokio::test]
    async fn get_ref_peels_annotated_tag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/git/ref/tags/v1.0.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ref": "refs/tags/v1.0.0",
                "object": { "sha": "tag-object", "type": "tag" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/git/tags/tag-object"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": "tag-object",
                "object": { "sha": "commit-sha", "type": "commit" }
            })))
            .mount(&server)
            .await;

        let sha = host(&server).await.get_ref("tags/v1.0.0").await.unwrap();
        assert_eq!(sha, "commit-sha");
    }

    #[tokio::test]
    async fn get_ref_rejects_endless_tag_chain() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/git/ref/tags/v1.0.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": { "sha": "loop", "type": "tag" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/git/tags/loop"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": "loop",
                "object": { "sha": "loop", "type": "tag" }
            })))
            .expect(MAX_PEEL_DEPTH as u64)
            .mount(&server)
            .await;

        let err = host(&server).await.get_ref("tags/v1.0.0").await.unwrap_err();
        assert!(
            matches!(&err, HostError::TagChainTooDeep { sha, hops } if sha == "loop" && *hops == MAX_PEEL_DEPTH),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn list_releases_drains_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/releases"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 1, "tag_name": "v1.0.0", "draft": false, "html_url": "https://x/1" },
                { "id": 2, "tag_name": "v1.1.0", "draft": true, "html_url": "https://x/2" }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/releases"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 3, "tag_name": "v0.9.0", "draft": true, "html_url": "https://x/3" }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/releases"))
            .and(query_param("page", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let releases = host(&server).await.list_releases().await.unwrap();
        let ids: Vec<u64> = releases.iter().map(|r| r.id).collect();
        assert_eq!(ids, [1, 2, 3]);
        assert!(releases[1].draft);
        assert_eq!(releases[2].url, "https://x/3");
    }

    #[tokio::test]
    async fn create_release_posts_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/widgets/releases"))
            .and(body_json(json!({
                "tag_name": "v1.1.0",
                "name": "1.1.0",
                "body": "### Features",
                "draft": true,
                "target_commitish": "main"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 77, "tag_name": "v1.1.0", "draft": true,
                "html_url": "https://github.com/octo/widgets/releases/tag/untagged-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let release = host(&server).await.create_release(&request()).await.unwrap();
        assert_eq!(release.id, 77);
        assert_eq!(release.tag_name, "v1.1.0");
        assert!(release.url.ends_with("untagged-1"));
    }

    #[tokio::test]
    async fn update_release_patches_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/repos/octo/widgets/releases/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 42, "tag_name": "v1.1.0", "draft": true, "html_url": "https://x/42"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let release = host(&server).await.update_release(42, &request()).await.unwrap();
        assert_eq!(release.id, 42);
        assert_eq!(release.url, "https://x/42");
    }

    #[tokio::test]
    async fn delete_release_accepts_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/repos/octo/widgets/releases/9"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        host(&server).await.delete_release(9).await.unwrap();
    }

    #[tokio::test]
    async fn api_errors_carry_status_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/git/ref/tags/v9.9.9"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
            .mount(&server)
            .await;

        let err = host(&server).await.get_ref("tags/v9.9.9").await.unwrap_err();
        match err {
            HostError::Api {
                operation,
                status,
                message,
            } => {
                assert_eq!(operation, "get ref");
                assert_eq!(status, 404);
                assert_eq!(message, "Not Found");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_error_body_is_kept_raw() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/repos/octo/widgets/releases/1"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = host(&server).await.delete_release(1).await.unwrap_err();
        assert!(matches!(
            err,
            HostError::Api { status: 502, ref message, .. } if message == "bad gateway"
        ));
    }

    #[test]
    fn debug_hides_token() {
        let repo: RepoRef = "octo/widgets".parse().unwrap();
        let host = GitHubHost::with_client(Client::new(), repo, Some("secret".into()));
        let dbg = format!("{host:?}");
        assert!(!dbg.contains("secret"));
        assert!(dbg.contains("authenticated: true"));
    }
}
