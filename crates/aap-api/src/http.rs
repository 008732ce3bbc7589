//! `reqwest` implementation of [`RemoteFacade`].

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::config::{Auth, ConnectionConfig};
use crate::error::FacadeError;
use crate::facade::RemoteFacade;
use crate::layout::ApiLayout;
use crate::lookup::Lookup;
use crate::models::{
    InventoryRecord, InventoryRequest, JobKind, JobRecord, LaunchConfig, LaunchRequest,
    OrganizationRecord, TemplateRecord,
};
use crate::FacadeResult;

/// HTTP client for the platform API
#[derive(Debug, Clone)]
pub struct HttpFacade {
    http_client: reqwest::Client,
    host: Url,
    auth: Auth,
    layout: ApiLayout,
}

impl HttpFacade {
    /// Validate the config, build the client and detect the API layout.
    ///
    /// This is the only place the layout is decided.
    pub async fn connect(config: &ConnectionConfig) -> FacadeResult<Self> {
        let mut facade = Self::with_layout(config, ApiLayout::Legacy)?;

        let discovery_url = facade.host.join("api/")?;
        let discovery: serde_json::Value = facade
            .request(Method::GET, discovery_url, None::<&()>, &[StatusCode::OK])
            .await?;
        facade.layout = ApiLayout::from_discovery(&discovery);

        info!(host = %facade.host, layout = ?facade.layout, "Connected to platform API");
        Ok(facade)
    }

    /// Build a client for a known layout without contacting the server.
    pub fn with_layout(config: &ConnectionConfig, layout: ApiLayout) -> FacadeResult<Self> {
        let host = config.validate()?;

        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent())
            .danger_accept_invalid_certs(config.insecure_skip_verify);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| FacadeError::InvalidConfig(e.to_string()))?;

        Ok(HttpFacade {
            http_client,
            host,
            auth: config.auth.clone(),
            layout,
        })
    }

    /// The layout detected at connect time.
    pub fn layout(&self) -> ApiLayout {
        self.layout
    }

    fn endpoint(&self, relative: &str) -> FacadeResult<Url> {
        Ok(self.host.join(&self.layout.resolve(relative))?)
    }

    async fn request<B, T>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        expected: &[StatusCode],
    ) -> FacadeResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let text = self.send(method, url, body, expected).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Send a request and return the body text of an expected response.
    async fn send<B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        expected: &[StatusCode],
    ) -> FacadeResult<String>
    where
        B: Serialize + ?Sized,
    {
        let path = url.path().to_string();
        debug!(method = %method, url = %url, "Sending request");

        let mut request = self
            .http_client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        request = match &self.auth {
            Auth::None => request,
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
            Auth::Token { token } => request.bearer_auth(token),
        };
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(FacadeError::NotFound { path });
        }
        if !expected.contains(&status) {
            return Err(FacadeError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    async fn get<T: DeserializeOwned>(&self, relative: &str) -> FacadeResult<T> {
        let url = self.endpoint(relative)?;
        self.request(Method::GET, url, None::<&()>, &[StatusCode::OK])
            .await
    }
}

#[async_trait]
impl RemoteFacade for HttpFacade {
    async fn get_organization(&self, lookup: &Lookup) -> FacadeResult<OrganizationRecord> {
        self.get(&lookup.path("organizations")?).await
    }

    async fn get_inventory(&self, lookup: &Lookup) -> FacadeResult<InventoryRecord> {
        self.get(&lookup.path("inventories")?).await
    }

    async fn create_inventory(&self, request: &InventoryRequest) -> FacadeResult<InventoryRecord> {
        let url = self.endpoint("inventories/")?;
        self.request(Method::POST, url, Some(request), &[StatusCode::CREATED])
            .await
    }

    async fn update_inventory(
        &self,
        id: i64,
        request: &InventoryRequest,
    ) -> FacadeResult<InventoryRecord> {
        let url = self.endpoint(&Lookup::id(id).path("inventories")?)?;
        self.request(Method::PUT, url, Some(request), &[StatusCode::OK])
            .await
    }

    async fn delete_inventory(&self, id: i64) -> FacadeResult<()> {
        let url = self.endpoint(&Lookup::id(id).path("inventories")?)?;
        self.send(
            Method::DELETE,
            url,
            None::<&()>,
            &[StatusCode::ACCEPTED, StatusCode::NO_CONTENT],
        )
        .await
        .map(|_| ())
    }

    async fn get_template(&self, kind: JobKind, lookup: &Lookup) -> FacadeResult<TemplateRecord> {
        self.get(&lookup.path(kind.template_collection())?).await
    }

    async fn launch_config(&self, kind: JobKind, template_id: i64) -> FacadeResult<LaunchConfig> {
        let template = Lookup::id(template_id).path(kind.template_collection())?;
        self.get(&format!("{template}launch/")).await
    }

    async fn launch(
        &self,
        kind: JobKind,
        template_id: i64,
        request: &LaunchRequest,
    ) -> FacadeResult<JobRecord> {
        let template = Lookup::id(template_id).path(kind.template_collection())?;
        let url = self.endpoint(&format!("{template}launch/"))?;
        self.request(Method::POST, url, Some(request), &[StatusCode::CREATED])
            .await
    }

    async fn get_job(&self, kind: JobKind, id: i64) -> FacadeResult<JobRecord> {
        self.get(&Lookup::id(id).path(kind.job_collection())?).await
    }
}
