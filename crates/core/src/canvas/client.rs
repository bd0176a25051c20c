//! Canvas REST API client.

use std::collections::BTreeSet;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, LINK, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::pagination::next_link;
use crate::config::LocalIdField;
use crate::errors::{CanvasError, SourceError};
use crate::models::{ListedGroup, LocalId, RemoteId, StudentRecord};
use crate::sources::{GroupSource, StudentSource};

const PER_PAGE: &str = "100";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasUser {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub login_id: Option<String>,
    #[serde(default)]
    pub sis_user_id: Option<String>,
}

impl CanvasUser {
    fn local_id(&self, field: LocalIdField) -> Option<&str> {
        let value = match field {
            LocalIdField::LoginId => self.login_id.as_deref(),
            LocalIdField::SisUserId => self.sis_user_id.as_deref(),
        };
        value.filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasGroup {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub group_category_id: Option<u64>,
    #[serde(default)]
    pub members_count: Option<u64>,
}

/// Asynchronous Canvas REST API client.
#[derive(Clone)]
pub struct CanvasClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
    local_id_field: LocalIdField,
}

impl std::fmt::Debug for CanvasClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasClient")
            .field("api_url", &self.api_url)
            .field("local_id_field", &self.local_id_field)
            .finish()
    }
}

impl CanvasClient {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Result<Self, CanvasError> {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        let token = token.into();
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("groupsync/", env!("CARGO_PKG_VERSION"))),
        );
        let http = reqwest::Client::builder().default_headers(headers).build()?;
        info!(api_url = %api_url, "created CanvasClient");
        Ok(Self {
            http,
            api_url,
            token,
            local_id_field: LocalIdField::default(),
        })
    }

    /// Choose which user field becomes the local id.
    pub fn with_local_id_field(mut self, field: LocalIdField) -> Self {
        self.local_id_field = field;
        self
    }

    /// Students enrolled in a course.
    #[instrument(skip(self))]
    pub async fn list_students(&self, course_id: u64) -> Result<Vec<CanvasUser>, CanvasError> {
        let url = format!("{}/api/v1/courses/{}/users", self.api_url, course_id);
        let users: Vec<CanvasUser> = self
            .get_paginated(&url, &[("enrollment_type[]", "student")])
            .await?;
        debug!(count = users.len(), "fetched students");
        Ok(users)
    }

    /// All groups of a course, across every group category.
    #[instrument(skip(self))]
    pub async fn list_groups(&self, course_id: u64) -> Result<Vec<CanvasGroup>, CanvasError> {
        let url = format!("{}/api/v1/courses/{}/groups", self.api_url, course_id);
        let groups: Vec<CanvasGroup> = self.get_paginated(&url, &[]).await?;
        debug!(count = groups.len(), "fetched groups");
        Ok(groups)
    }

    /// Members of a single group.
    #[instrument(skip(self))]
    pub async fn list_group_members(&self, group_id: u64) -> Result<Vec<CanvasUser>, CanvasError> {
        let url = format!("{}/api/v1/groups/{}/users", self.api_url, group_id);
        let users: Vec<CanvasUser> = self.get_paginated(&url, &[]).await?;
        debug!(count = users.len(), group_id, "fetched group members");
        Ok(users)
    }

    /// GET every page of a list endpoint, following `Link: rel="next"`.
    async fn get_paginated<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, CanvasError> {
        let mut items = Vec::new();
        let mut req = self
            .http
            .get(url)
            .query(query)
            .query(&[("per_page", PER_PAGE)]);
        let mut page = 1usize;

        loop {
            let resp = req.bearer_auth(&self.token).send().await?;
            let resp = check_response(resp).await?;
            let next = resp
                .headers()
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(next_link);

            let body = resp.text().await?;
            let batch: Vec<T> =
                serde_json::from_str(&body).map_err(|e| CanvasError::ParseError(e.to_string()))?;
            debug!(page, count = batch.len(), "fetched page");
            items.extend(batch);

            match next {
                Some(next_url) => {
                    // The token is only ever sent to the configured instance.
                    if !self.is_own_url(&next_url) {
                        return Err(CanvasError::ForeignNextLink {
                            api_url: self.api_url.clone(),
                            url: next_url,
                        });
                    }
                    // The next link already carries the query string.
                    req = self.http.get(next_url);
                    page += 1;
                }
                None => break,
            }
        }

        Ok(items)
    }

    fn is_own_url(&self, url: &str) -> bool {
        match url.strip_prefix(&self.api_url) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'),
            None => false,
        }
    }
}

async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, CanvasError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(CanvasError::AuthenticationFailed(format!("HTTP {}", status)));
    }
    if status.as_u16() == 429 {
        let remaining = resp
            .headers()
            .get("x-rate-limit-remaining")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        return Err(CanvasError::RateLimited { remaining });
    }
    let body = resp.text().await.unwrap_or_default();
    Err(CanvasError::ApiError {
        status: status.as_u16(),
        body: if body.is_empty() {
            format!("HTTP {}", status)
        } else {
            body
        },
    })
}

/// Turn Canvas users into id pairs, skipping users without a local id.
pub fn student_records(users: &[CanvasUser], field: LocalIdField) -> Vec<StudentRecord> {
    users
        .iter()
        .filter_map(|user| match user.local_id(field) {
            Some(local) => Some(StudentRecord {
                local_id: LocalId::new(local),
                remote_id: RemoteId::new(user.id),
            }),
            None => {
                warn!(
                    user_id = user.id,
                    name = user.name.as_deref().unwrap_or(""),
                    field = ?field,
                    "skipping student without a local id"
                );
                None
            }
        })
        .collect()
}

/// Keep the groups of one category, without members.
pub fn groups_in_category(groups: Vec<CanvasGroup>, category_id: u64) -> Vec<ListedGroup> {
    groups
        .into_iter()
        .filter(|g| g.group_category_id == Some(category_id))
        .map(|g| ListedGroup::without_members(g.id, g.name))
        .collect()
}

#[async_trait]
impl StudentSource for CanvasClient {
    async fn fetch_all(&self, course_id: u64) -> Result<Vec<StudentRecord>, SourceError> {
        let users = self.list_students(course_id).await?;
        Ok(student_records(&users, self.local_id_field))
    }
}

#[async_trait]
impl GroupSource for CanvasClient {
    async fn fetch_groups_by_category(
        &self,
        course_id: u64,
        category_id: u64,
    ) -> Result<Vec<ListedGroup>, SourceError> {
        let groups = self.list_groups(course_id).await?;
        Ok(groups_in_category(groups, category_id))
    }

    async fn fetch_group_members(
        &self,
        group_id: RemoteId,
    ) -> Result<BTreeSet<RemoteId>, SourceError> {
        let users = self.list_group_members(group_id.get()).await?;
        Ok(users.into_iter().map(|u| RemoteId::new(u.id)).collect())
    }
}
