//! Repository listing delegates
//!
//! Each code-hosting API is walked one page at a time. A delegate fetches the page at
//! a URL, turns it into [`Repository`] records and tells the crawler where the next
//! page is. Pagination state itself stays with the domain crawler.

mod bitbucket;
mod github;
mod gitlab;
mod link;

pub use bitbucket::BitbucketLister;
pub use github::GithubLister;
pub use gitlab::GitlabLister;
pub use link::next_link;

use crate::config::{ClientApi, DomainConfig};
use crate::crawler::{FetchClient, FetchResponse, Repository};
use crate::CrawlerError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// One parsed page of a repository listing
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub repositories: Vec<Repository>,
    /// Address of the following page, `None` on the last one
    pub next_url: Option<String>,
}

/// Fetches and parses one listing page
#[async_trait]
pub trait PageProcessor: Send + Sync {
    async fn process_page(&self, url: &str) -> Result<ListingPage, CrawlerError>;
}

/// Settings shared by every lister of a domain
#[derive(Clone)]
pub(crate) struct ListerContext {
    pub domain_id: String,
    pub headers: HashMap<String, String>,
    pub file_name: String,
    pub client: Arc<dyn FetchClient>,
}

impl ListerContext {
    /// Fetches a listing page, treating any non-2xx status as a pagination error
    pub async fn fetch(&self, url: &str) -> Result<FetchResponse, CrawlerError> {
        let response = self.client.get(url, &self.headers).await?;
        if !response.is_success() {
            return Err(CrawlerError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }
        Ok(response)
    }

    pub fn decode<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        response: &FetchResponse,
    ) -> Result<T, CrawlerError> {
        serde_json::from_slice(&response.body).map_err(|e| CrawlerError::Listing {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    pub fn repository(&self, name: String, file_raw_url: String) -> Repository {
        Repository {
            name,
            file_raw_url,
            domain: self.domain_id.clone(),
            headers: self.headers.clone(),
        }
    }
}

/// Picks the listing delegate matching a domain's API
pub fn processor_for(
    domain: &DomainConfig,
    client: Arc<dyn FetchClient>,
    file_name: &str,
) -> Arc<dyn PageProcessor> {
    let context = ListerContext {
        domain_id: domain.id.clone(),
        headers: domain
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        file_name: file_name.to_string(),
        client,
    };

    match domain.client_api {
        ClientApi::Github => Arc::new(GithubLister::new(context)),
        ClientApi::Gitlab => Arc::new(GitlabLister::new(context)),
        ClientApi::Bitbucket => Arc::new(BitbucketLister::new(context)),
    }
}
