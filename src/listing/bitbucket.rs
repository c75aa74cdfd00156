use crate::listing::{ListerContext, ListingPage, PageProcessor};
use crate::CrawlerError;
use async_trait::async_trait;
use serde::Deserialize;

const WEB_BASE: &str = "https://bitbucket.org";

#[derive(Debug, Deserialize)]
struct BitbucketPage {
    #[serde(default)]
    values: Vec<BitbucketRepo>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BitbucketRepo {
    full_name: String,
    mainbranch: Option<BitbucketBranch>,
}

#[derive(Debug, Deserialize)]
struct BitbucketBranch {
    name: String,
}

/// Lister for Bitbucket Cloud `/2.0/repositories/{workspace}` endpoints
pub struct BitbucketLister {
    context: ListerContext,
}

impl BitbucketLister {
    pub(crate) fn new(context: ListerContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl PageProcessor for BitbucketLister {
    async fn process_page(&self, url: &str) -> Result<ListingPage, CrawlerError> {
        let response = self.context.fetch(url).await?;
        let page: BitbucketPage = self.context.decode(url, &response)?;

        let repositories = page
            .values
            .into_iter()
            .filter_map(|repo| {
                let branch = repo.mainbranch?.name;
                let raw = format!(
                    "{}/{}/raw/{}/{}",
                    WEB_BASE, repo.full_name, branch, self.context.file_name
                );
                Some(self.context.repository(repo.full_name, raw))
            })
            .collect();

        Ok(ListingPage {
            repositories,
            next_url: page.next.filter(|next| !next.is_empty()),
        })
    }
}
