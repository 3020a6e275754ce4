use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::core::mirror::{RowAppender, SheetsDestination};

/// Appends rows through the spreadsheet values API.
pub struct SheetsClient {
    base_url: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl SheetsClient {
    pub fn new(base_url: &str, access_token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("expense-sync/1.0")
            .build()?;
        Ok(SheetsClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
            client,
        })
    }

    fn append_url(&self, destination: &SheetsDestination) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .with_context(|| format!("Invalid sheets base URL: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Sheets base URL cannot have a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", destination.sheet_id.as_str(), "values"])
            .push(&format!("{}:append", destination.range()));
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");
        Ok(url)
    }
}

#[async_trait]
impl RowAppender for SheetsClient {
    #[instrument(
        name = "SheetsAppend",
        skip(self, row),
        fields(sheet_id = %destination.sheet_id)
    )]
    async fn append_row(&self, destination: &SheetsDestination, row: Vec<Value>) -> Result<()> {
        let url = self.append_url(destination)?;
        debug!("Appending row to {}", url);

        let mut request = self.client.post(url).json(&json!({ "values": [row] }));
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for sheet: {}", e, destination.sheet_id))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "HTTP error: {} for sheet: {}: {}",
                status,
                destination.sheet_id,
                body
            ));
        }

        debug!("Row appended successfully");
        Ok(())
    }
}
