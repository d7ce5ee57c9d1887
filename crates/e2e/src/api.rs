//! REST client for backend setup and verification calls
//!
//! All calls carry the bearer token captured from the browser session
//! after UI login. Paths and query parameters follow the backend's wire
//! contract (Portuguese resource names).

use std::time::Duration;
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::model::{Group, GroupStatus, GroupStatusUpdate, Installment, Page, Quota};

pub struct ApiClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, token: &str) -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(endpoint: &str, response: reqwest::Response) -> E2eResult<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            return Err(E2eError::Api {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    /// `GET /grupos?status=…&limit=…&page=1`
    pub async fn groups_by_status(
        &self,
        status: &GroupStatus,
        limit: u32,
    ) -> E2eResult<Page<Group>> {
        let endpoint = format!("/grupos?status={}&limit={}&page=1", status.as_str(), limit);
        debug!(%endpoint, "listing groups");
        let response = self
            .client
            .get(self.url(&endpoint))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(Self::check(&endpoint, response).await?.json().await?)
    }

    /// `PUT /grupos/{id}/status`
    pub async fn set_group_status(&self, group_id: i64, status: GroupStatus) -> E2eResult<()> {
        let endpoint = format!("/grupos/{}/status", group_id);
        debug!(%endpoint, status = %status, "updating group status");
        let response = self
            .client
            .put(self.url(&endpoint))
            .bearer_auth(&self.token)
            .json(&GroupStatusUpdate { group_id, status })
            .send()
            .await?;
        Self::check(&endpoint, response).await?;
        Ok(())
    }

    /// `GET /cotas/grupo/{groupId}`
    pub async fn quotas_by_group(&self, group_id: i64) -> E2eResult<Vec<Quota>> {
        let endpoint = format!("/cotas/grupo/{}", group_id);
        debug!(%endpoint, "listing group quotas");
        let response = self
            .client
            .get(self.url(&endpoint))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(Self::check(&endpoint, response).await?.json().await?)
    }

    /// `GET /cotas/{id}`
    pub async fn quota(&self, quota_id: i64) -> E2eResult<Quota> {
        let endpoint = format!("/cotas/{}", quota_id);
        let response = self
            .client
            .get(self.url(&endpoint))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(Self::check(&endpoint, response).await?.json().await?)
    }

    /// `GET /cotas/{id}/parcelas?page=1&limit=10`
    pub async fn installments(&self, quota_id: i64) -> E2eResult<Page<Installment>> {
        let endpoint = format!("/cotas/{}/parcelas?page=1&limit=10", quota_id);
        debug!(%endpoint, "listing installments");
        let response = self
            .client
            .get(self.url(&endpoint))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(Self::check(&endpoint, response).await?.json().await?)
    }

    /// `PATCH /parcelas/{id}/pagar`
    pub async fn pay_installment(&self, installment_id: i64) -> E2eResult<()> {
        let endpoint = format!("/parcelas/{}/pagar", installment_id);
        debug!(%endpoint, "paying installment");
        let response = self
            .client
            .patch(self.url(&endpoint))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        Self::check(&endpoint, response).await?;
        Ok(())
    }
}

/// Find the single item matching `predicate`, by its generated unique
/// attribute. UI-created entities never expose their backend ids, so the
/// scenario correlates them through names generated uniquely per run.
pub fn resolve_by<'a, T>(
    items: &'a [T],
    what: &str,
    predicate: impl Fn(&T) -> bool,
) -> E2eResult<&'a T> {
    items
        .iter()
        .find(|item| predicate(item))
        .ok_or_else(|| E2eError::NotResolved {
            what: what.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GroupStatus;

    #[test]
    fn test_resolve_by_finds_match() {
        let groups = vec![
            Group {
                id: 1,
                name: "Grupo QA aaa".to_string(),
                status: GroupStatus::Operating,
            },
            Group {
                id: 2,
                name: "Grupo QA bbb".to_string(),
                status: GroupStatus::Operating,
            },
        ];
        let found = resolve_by(&groups, "grupo", |g| g.name == "Grupo QA bbb").unwrap();
        assert_eq!(found.id, 2);
    }

    #[test]
    fn test_resolve_by_names_missing_entity() {
        let groups: Vec<Group> = Vec::new();
        let err = resolve_by(&groups, "grupo recem-criado", |_| true).unwrap_err();
        match err {
            E2eError::NotResolved { what } => assert_eq!(what, "grupo recem-criado"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = ApiClient::new("http://api.local/", "token").unwrap();
        assert_eq!(client.url("/grupos"), "http://api.local/grupos");
    }
}
