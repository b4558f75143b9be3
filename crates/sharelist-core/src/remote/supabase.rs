//! `PostgREST` client for the hosted Supabase project.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_RANGE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::json;

use super::{ListBackend, TodoBackend, LISTS_TABLE, TODOS_TABLE};
use crate::config::ClientConfig;
use crate::error::{Error, RemoteError, Result};
use crate::models::{ListId, NewTask, Task, TaskId, TaskPatch, TaskStatus};
use crate::util::{compact_text, is_http_url};

const SINGLE_OBJECT_MEDIA_TYPE: &str = "application/vnd.pgrst.object+json";
const CLIENT_INFO: &str = "sharelist";

/// Table API client authenticated with the project's public anon key
#[derive(Clone)]
pub struct SupabaseClient {
    rest_url: String,
    anon_key: String,
    client: Client,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SupabaseClient")
            .field("rest_url", &self.rest_url)
            .field("anon_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    pub fn new(url: impl AsRef<str>, anon_key: impl Into<String>) -> Result<Self> {
        let rest_url = normalize_rest_url(url.as_ref())?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(Error::Config(
                "Supabase anon key must not be empty".to_string(),
            ));
        }

        Ok(Self {
            rest_url,
            anon_key,
            client: Client::builder().build()?,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(&config.supabase_url, config.supabase_anon_key.clone())
    }

    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{table}", self.rest_url)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .header("X-Client-Info", CLIENT_INFO)
    }

    async fn send(request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(parse_api_error(status, &body).into())
    }

    /// Single-object select: `Ok(None)` when no row matched.
    async fn select_single<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Option<T>> {
        match Self::send(request.header(ACCEPT, SINGLE_OBJECT_MEDIA_TYPE)).await {
            Ok(response) => Ok(Some(response.json::<T>().await?)),
            Err(error) if error.is_no_rows() => Ok(None),
            Err(error) => Err(error),
        }
    }
}

impl TodoBackend for SupabaseClient {
    async fn fetch_tasks(&self, list_id: &ListId) -> Result<Vec<Task>> {
        let request = self.request(Method::GET, TODOS_TABLE).query(&[
            ("select", "*".to_string()),
            ("list_id", eq(list_id.as_str())),
            ("order", "order.asc".to_string()),
        ]);
        let response = Self::send(request).await?;
        Ok(response.json::<Vec<Task>>().await?)
    }

    async fn fetch_task(&self, list_id: &ListId, task_id: &TaskId) -> Result<Option<Task>> {
        let request = self.request(Method::GET, TODOS_TABLE).query(&[
            ("select", "*".to_string()),
            ("id", eq(task_id.as_str())),
            ("list_id", eq(list_id.as_str())),
        ]);
        self.select_single(request).await
    }

    async fn count_tasks(&self, list_id: Option<&ListId>) -> Result<usize> {
        let mut query = vec![("select", "id".to_string())];
        if let Some(list_id) = list_id {
            query.push(("list_id", eq(list_id.as_str())));
        }
        let request = self
            .request(Method::HEAD, TODOS_TABLE)
            .query(&query)
            .header("Prefer", "count=exact");
        let response = Self::send(request).await?;
        Ok(parse_content_range_total(response.headers()).unwrap_or(0))
    }

    async fn insert_task(&self, task: &NewTask) -> Result<Task> {
        let request = self
            .request(Method::POST, TODOS_TABLE)
            .header("Prefer", "return=representation")
            .json(&[task]);
        let response = Self::send(request).await?;
        let rows = response.json::<Vec<Task>>().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RemoteError::new(None, "insert returned no rows").into())
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<()> {
        let request = self
            .request(Method::PATCH, TODOS_TABLE)
            .query(&[("id", eq(id.as_str()))])
            .json(patch);
        Self::send(request).await?;
        Ok(())
    }

    async fn upsert_tasks(&self, tasks: &[Task]) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }
        let request = self
            .request(Method::POST, TODOS_TABLE)
            .header("Prefer", "resolution=merge-duplicates")
            .json(tasks);
        Self::send(request).await?;
        Ok(())
    }

    async fn delete_task(&self, id: &TaskId) -> Result<()> {
        let request = self
            .request(Method::DELETE, TODOS_TABLE)
            .query(&[("id", eq(id.as_str()))]);
        Self::send(request).await?;
        Ok(())
    }

    async fn delete_completed(&self, list_id: &ListId) -> Result<()> {
        let request = self.request(Method::DELETE, TODOS_TABLE).query(&[
            ("list_id", eq(list_id.as_str())),
            ("status", eq(TaskStatus::Done.as_str())),
        ]);
        Self::send(request).await?;
        Ok(())
    }
}

#[derive(serde::Deserialize)]
struct TitleRow {
    title: Option<String>,
}

impl ListBackend for SupabaseClient {
    async fn fetch_list_title(&self, id: &ListId) -> Result<Option<String>> {
        let request = self
            .request(Method::GET, LISTS_TABLE)
            .query(&[("select", "title".to_string()), ("id", eq(id.as_str()))]);
        let row = self.select_single::<TitleRow>(request).await?;
        Ok(row.and_then(|row| row.title))
    }

    async fn insert_list(&self, id: &ListId, title: &str) -> Result<()> {
        let request = self
            .request(Method::POST, LISTS_TABLE)
            .json(&[json!({ "id": id, "title": title })]);
        Self::send(request).await?;
        Ok(())
    }

    async fn update_list_title(&self, id: &ListId, title: &str) -> Result<()> {
        let request = self
            .request(Method::PATCH, LISTS_TABLE)
            .query(&[("id", eq(id.as_str()))])
            .json(&json!({ "title": title }));
        Self::send(request).await?;
        Ok(())
    }

    async fn probe_lists(&self) -> Result<()> {
        let request = self
            .request(Method::GET, LISTS_TABLE)
            .query(&[("select", "id"), ("limit", "1")]);
        Self::send(request).await?;
        Ok(())
    }

    async fn execute_sql(&self, sql: &str) -> Result<()> {
        let request = self
            .request(Method::POST, "rpc/execute_sql")
            .json(&json!({ "sql_query": sql }));
        Self::send(request).await?;
        Ok(())
    }
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

fn normalize_rest_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::Config("Supabase URL must not be empty".to_string()));
    }
    if !is_http_url(trimmed) {
        return Err(Error::Config(
            "Supabase URL must include http:// or https://".to_string(),
        ));
    }
    if trimmed.ends_with("/rest/v1") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/rest/v1"))
    }
}

fn parse_api_error(status: StatusCode, body: &str) -> RemoteError {
    if let Ok(mut error) = serde_json::from_str::<RemoteError>(body) {
        if error.message.trim().is_empty() {
            error.message = format!("HTTP {}", status.as_u16());
        }
        return error;
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        RemoteError::new(None, format!("HTTP {}", status.as_u16()))
    } else {
        RemoteError::new(None, format!("{trimmed} ({})", status.as_u16()))
    }
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`
fn parse_content_range_total(headers: &HeaderMap<HeaderValue>) -> Option<usize> {
    headers
        .get(CONTENT_RANGE)?
        .to_str()
        .ok()?
        .rsplit('/')
        .next()?
        .trim()
        .parse()
        .ok()
}
