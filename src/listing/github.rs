use crate::listing::{next_link, ListerContext, ListingPage, PageProcessor};
use crate::CrawlerError;
use async_trait::async_trait;
use serde::Deserialize;

const RAW_BASE: &str = "https://raw.githubusercontent.com";

#[derive(Debug, Deserialize)]
struct GithubRepo {
    full_name: String,
    default_branch: Option<String>,
    #[serde(default)]
    archived: bool,
}

/// Lister for `GET /orgs/{org}/repos`-style GitHub endpoints
pub struct GithubLister {
    context: ListerContext,
    raw_base: String,
}

impl GithubLister {
    pub(crate) fn new(context: ListerContext) -> Self {
        Self {
            context,
            raw_base: RAW_BASE.to_string(),
        }
    }

    /// Overrides the host raw files are served from (GitHub Enterprise, tests)
    pub fn with_raw_base(mut self, raw_base: impl Into<String>) -> Self {
        self.raw_base = raw_base.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl PageProcessor for GithubLister {
    async fn process_page(&self, url: &str) -> Result<ListingPage, CrawlerError> {
        let response = self.context.fetch(url).await?;
        let repos: Vec<GithubRepo> = self.context.decode(url, &response)?;

        let repositories = repos
            .into_iter()
            .filter(|repo| !repo.archived)
            .filter_map(|repo| {
                let branch = repo.default_branch?;
                let raw = format!(
                    "{}/{}/{}/{}",
                    self.raw_base, repo.full_name, branch, self.context.file_name
                );
                Some(self.context.repository(repo.full_name, raw))
            })
            .collect();

        Ok(ListingPage {
            repositories,
            next_url: response.header("link").and_then(next_link),
        })
    }
}
