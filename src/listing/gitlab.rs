use crate::listing::{next_link, ListerContext, ListingPage, PageProcessor};
use crate::CrawlerError;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct GitlabProject {
    path_with_namespace: String,
    web_url: String,
    default_branch: Option<String>,
}

/// Lister for GitLab `/api/v4/.../projects` endpoints
pub struct GitlabLister {
    context: ListerContext,
}

impl GitlabLister {
    pub(crate) fn new(context: ListerContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl PageProcessor for GitlabLister {
    async fn process_page(&self, url: &str) -> Result<ListingPage, CrawlerError> {
        let response = self.context.fetch(url).await?;
        let projects: Vec<GitlabProject> = self.context.decode(url, &response)?;

        let repositories = projects
            .into_iter()
            .filter_map(|project| {
                // Empty projects have no default branch and nothing to fetch
                let branch = project.default_branch?;
                let raw = format!(
                    "{}/raw/{}/{}",
                    project.web_url.trim_end_matches('/'),
                    branch,
                    self.context.file_name
                );
                Some(self.context.repository(project.path_with_namespace, raw))
            })
            .collect();

        Ok(ListingPage {
            repositories,
            next_url: response.header("link").and_then(next_link),
        })
    }
}
