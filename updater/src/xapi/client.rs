//! HTTPS client for the device XML API

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error};
use url::Url;

use crate::errors::TransportError;
use crate::models::device::Device;
use crate::xapi::command::op_command_xml;

/// Device XML API operations, as a trait for testability
#[async_trait]
pub trait DeviceApi: Send + Sync {
    /// Run an operational command given in XML form, returning the raw response
    async fn op(&self, cmd_xml: &str) -> Result<String, TransportError>;

    /// Upload a package to the import endpoint, returning the raw response
    async fn import(
        &self,
        category: &str,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<String, TransportError>;

    /// Run a CLI-style operational command such as `show system info`
    async fn op_cli(&self, cmd: &str) -> Result<String, TransportError> {
        let cmd_xml = op_command_xml(cmd).map_err(TransportError::Other)?;
        self.op(&cmd_xml).await
    }
}

/// XML API client bound to one device
pub struct XapiClient {
    client: Client,
    base_url: Url,
    api_key: SecretString,
}

impl XapiClient {
    /// Create a client using the device's address, key, timeout and TLS policy
    pub fn new(device: &Device) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(device.timeout)
            .danger_accept_invalid_certs(!device.verify_tls)
            .build()?;

        let base_url = Url::parse(&format!("https://{}/api/", device.hostname))?;

        Ok(Self {
            client,
            base_url,
            api_key: device.api_key.clone(),
        })
    }

    fn url(&self, params: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .extend_pairs(params)
            .append_pair("key", self.api_key.expose_secret());
        url
    }

    async fn read_body(response: Response, what: &str) -> Result<String, TransportError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!("XML API {} failed: {} - {}", what, status, body);
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl DeviceApi for XapiClient {
    async fn op(&self, cmd_xml: &str) -> Result<String, TransportError> {
        debug!("GET {}?type=op cmd={}", self.base_url, cmd_xml);

        let url = self.url(&[("type", "op"), ("cmd", cmd_xml)]);
        let response = self.client.get(url).send().await?;
        Self::read_body(response, "op").await
    }

    async fn import(
        &self,
        category: &str,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<String, TransportError> {
        debug!(
            "POST {}?type=import category={} file-name={}",
            self.base_url, category, file_name
        );

        let part = Part::bytes(contents)
            .file_name(file_name.to_string())
            .mime_str("application/octet-stream")?;
        let form = Form::new().part("file", part);

        let url = self.url(&[
            ("type", "import"),
            ("category", category),
            ("file-name", file_name),
        ]);
        let response = self.client.post(url).multipart(form).send().await?;
        Self::read_body(response, "import").await
    }
}
