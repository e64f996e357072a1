//! reqwest implementation of [`TableStore`] against the Baserow rows API.
//!
//! Every call targets `{base}/api/database/rows/table/{table_id}/` with a
//! `Token` authorization header and `user_field_names=true`, so responses are
//! keyed by human-readable field names rather than internal field ids.
//! Filters are expressed as `filter__<field>__<operator>=<value>` query
//! parameters.

use crate::store::{RowPage, RowQuery, StoreError, TableStore};
use async_trait::async_trait;
use batchrow_core::{Settings, TableId};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::{Map, Value};

/// HTTP client for a single Baserow instance.
#[derive(Clone)]
pub struct BaserowClient {
    http: Client,
    base_url: String,
    api_token: String,
}

impl BaserowClient {
    /// Build a client from settings. The underlying reqwest client is shared
    /// and holds no per-request state.
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: Client::new(),
            base_url: settings.base_url.clone(),
            api_token: settings.api_token.clone(),
        }
    }

    fn rows_url(&self, table: TableId) -> String {
        format!("{}/api/database/rows/table/{}/", self.base_url, table)
    }

    fn row_url(&self, table: TableId, row_id: u64) -> String {
        format!(
            "{}/api/database/rows/table/{}/{}/",
            self.base_url, table, row_id
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("Authorization", format!("Token {}", self.api_token))
            .query(&[("user_field_names", "true")])
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request.send().await.map_err(StoreError::Connection)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), "Baserow returned an error status");
        Err(StoreError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn json_body(&self, response: Response) -> Result<Value, StoreError> {
        let status = response.status().as_u16();
        match response.json::<Value>().await {
            Ok(value) => Ok(value),
            // A 2xx whose body is not JSON is still a remote-side fault.
            Err(e) if e.is_decode() => Err(StoreError::Api {
                status,
                body: format!("undecodable response body: {e}"),
            }),
            Err(e) => Err(StoreError::Connection(e)),
        }
    }
}

#[async_trait]
impl TableStore for BaserowClient {
    async fn list_rows(&self, table: TableId, query: RowQuery) -> Result<RowPage, StoreError> {
        let mut request = self
            .request(Method::GET, &self.rows_url(table))
            .query(&[("page", query.page.to_string()), ("size", query.size.to_string())]);
        for filter in &query.filters {
            let key = format!("filter__{}__{}", filter.field, filter.mode.operator());
            request = request.query(&[(key, filter.value.clone())]);
        }

        let response = self.send(request).await?;
        let status = response.status().as_u16();
        let body = self.json_body(response).await?;
        serde_json::from_value(body).map_err(|e| StoreError::Api {
            status,
            body: format!("unexpected list payload: {e}"),
        })
    }

    async fn get_row(&self, table: TableId, row_id: u64) -> Result<Value, StoreError> {
        let response = self
            .send(self.request(Method::GET, &self.row_url(table, row_id)))
            .await?;
        self.json_body(response).await
    }

    async fn create_row(
        &self,
        table: TableId,
        fields: Map<String, Value>,
    ) -> Result<Value, StoreError> {
        let response = self
            .send(
                self.request(Method::POST, &self.rows_url(table))
                    .json(&Value::Object(fields)),
            )
            .await?;
        self.json_body(response).await
    }

    async fn update_row(
        &self,
        table: TableId,
        row_id: u64,
        fields: Map<String, Value>,
    ) -> Result<Value, StoreError> {
        let response = self
            .send(
                self.request(Method::PATCH, &self.row_url(table, row_id))
                    .json(&Value::Object(fields)),
            )
            .await?;
        self.json_body(response).await
    }

    async fn delete_row(&self, table: TableId, row_id: u64) -> Result<(), StoreError> {
        // The rows API answers deletes with 204 and no body.
        self.send(self.request(Method::DELETE, &self.row_url(table, row_id)))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchrow_core::TableName;
    use std::collections::HashMap;

    fn settings() -> Settings {
        let mut vars = HashMap::new();
        vars.insert("BASEROW_API_TOKEN".to_string(), "tok_test".to_string());
        vars.insert("BASEROW_TABLE_PARTS".to_string(), "601".to_string());
        Settings::from_lookup(|k| vars.get(k).cloned()).unwrap()
    }

    #[test]
    fn urls_follow_the_rows_api_shape() {
        let client = BaserowClient::new(&settings());
        let table = settings().tables.id_of(TableName::Parts).unwrap();
        assert_eq!(
            client.rows_url(table),
            "https://api.baserow.io/api/database/rows/table/601/"
        );
        assert_eq!(
            client.row_url(table, 7),
            "https://api.baserow.io/api/database/rows/table/601/7/"
        );
    }

    #[test]
    fn row_page_deserializes_from_api_payload() {
        let payload = serde_json::json!({
            "count": 1,
            "next": null,
            "previous": null,
            "results": [{"id": 3, "order": "1.0", "BOM ID": "RM-PWD-Stevia"}]
        });
        let page: RowPage = serde_json::from_value(payload).unwrap();
        assert_eq!(page.count, 1);
        assert!(page.next.is_none());
        assert_eq!(page.results.len(), 1);
    }
}
