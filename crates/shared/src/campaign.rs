use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::{Config, MailchimpConfig};
use crate::error::{Error, Result};

/// Everything needed to create a campaign besides its content.
#[derive(Debug, Clone)]
pub struct CampaignSettings {
    pub list_id: String,
    pub subject: String,
    pub from_name: String,
    pub reply_to: String,
}

impl CampaignSettings {
    pub fn new(mailchimp: &MailchimpConfig, subject: impl Into<String>) -> Self {
        Self {
            list_id: mailchimp.list_id.clone(),
            subject: subject.into(),
            from_name: mailchimp.from_name.clone(),
            reply_to: mailchimp.from_email.clone(),
        }
    }
}

/// The three calls an email campaign service must answer.
#[async_trait]
pub trait CampaignApi: Send + Sync {
    async fn create_campaign(&self, settings: &CampaignSettings) -> Result<String>;
    async fn set_content(&self, campaign_id: &str, html: &str) -> Result<()>;
    async fn send(&self, campaign_id: &str) -> Result<()>;
}

#[derive(Debug, PartialEq, Eq)]
pub enum SendOutcome {
    Sent { campaign_id: String },
    /// Nothing was sent; the reason is meant for the operator.
    Skipped(String),
}

#[derive(Serialize)]
struct CreateCampaignRequest<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    recipients: Recipients<'a>,
    settings: Settings<'a>,
}

#[derive(Serialize)]
struct Recipients<'a> {
    list_id: &'a str,
}

#[derive(Serialize)]
struct Settings<'a> {
    subject_line: &'a str,
    from_name: &'a str,
    reply_to: &'a str,
}

#[derive(Serialize)]
struct ContentRequest<'a> {
    html: &'a str,
}

#[derive(Deserialize)]
struct CampaignResponse {
    id: Option<String>,
}

pub struct MailchimpClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl MailchimpClient {
    pub fn new(server_prefix: &str, api_key: String, timeout: Duration) -> Result<Self> {
        let base_url = format!("https://{}.api.mailchimp.com/3.0", server_prefix);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| Error::Retrieval {
                url: base_url.clone(),
                source,
            })?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    async fn execute(&self, url: String, request: RequestBuilder) -> Result<Response> {
        let response = request
            .basic_auth("anystring", Some(&self.api_key))
            .send()
            .await
            .map_err(|source| Error::Retrieval {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(Error::HttpStatus { url, status, body });
        }

        Ok(response)
    }
}

#[async_trait]
impl CampaignApi for MailchimpClient {
    async fn create_campaign(&self, settings: &CampaignSettings) -> Result<String> {
        let url = format!("{}/campaigns", self.base_url);
        let body = CreateCampaignRequest {
            kind: "regular",
            recipients: Recipients {
                list_id: &settings.list_id,
            },
            settings: Settings {
                subject_line: &settings.subject,
                from_name: &settings.from_name,
                reply_to: &settings.reply_to,
            },
        };

        let response = self
            .execute(url.clone(), self.client.post(&url).json(&body))
            .await?;

        let parsed = response
            .json::<CampaignResponse>()
            .await
            .map_err(|source| Error::Retrieval {
                url: url.clone(),
                source,
            })?;

        campaign_id(url, parsed)
    }

    async fn set_content(&self, campaign_id: &str, html: &str) -> Result<()> {
        let url = format!("{}/campaigns/{}/content", self.base_url, campaign_id);
        self.execute(url.clone(), self.client.put(&url).json(&ContentRequest { html }))
            .await?;
        Ok(())
    }

    async fn send(&self, campaign_id: &str) -> Result<()> {
        let url = format!("{}/campaigns/{}/actions/send", self.base_url, campaign_id);
        self.execute(url.clone(), self.client.post(&url)).await?;
        Ok(())
    }
}

fn campaign_id(url: String, response: CampaignResponse) -> Result<String> {
    response
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::UnexpectedResponse {
            url,
            message: "campaign id missing from response".to_string(),
        })
}

/// Create, fill, then send a campaign. Each step runs only if the previous
/// one succeeded; a created campaign is not cleaned up on later failure.
pub async fn send_campaign<A: CampaignApi + ?Sized>(
    api: &A,
    settings: &CampaignSettings,
    html: &str,
) -> Result<String> {
    let campaign_id = api.create_campaign(settings).await?;
    debug!(campaign_id = %campaign_id, "campaign created");

    api.set_content(&campaign_id, html).await?;
    debug!(campaign_id = %campaign_id, "campaign content set");

    api.send(&campaign_id).await?;
    Ok(campaign_id)
}

/// Send `html` through Mailchimp, or skip when mail settings are incomplete.
pub async fn send_newsletter(config: &Config, subject: &str, html: &str) -> Result<SendOutcome> {
    let mailchimp = match config.mailchimp() {
        Ok(mailchimp) => mailchimp,
        Err(e @ Error::ConfigurationMissing(_)) => return Ok(SendOutcome::Skipped(e.to_string())),
        Err(e) => return Err(e),
    };

    let client = MailchimpClient::new(
        &mailchimp.server_prefix,
        mailchimp.api_key.clone(),
        config.http_timeout,
    )?;
    let settings = CampaignSettings::new(mailchimp, subject);

    let campaign_id = send_campaign(&client, &settings, html).await?;
    Ok(SendOutcome::Sent { campaign_id })
}

/// `"{prefix} - YYYY-MM-DD"` for the given moment.
pub fn default_subject(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{} - {}", prefix, now.format("%Y-%m-%d"))
}
