use std::time::Duration;

use log::{debug, info, warn};
use reqwest::{header, Client, Url};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    request::HeatRiskRequest,
    response::{HeatRiskResponse, Outcome},
};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// One way of reaching the analysis service. Tried in configured order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Endpoint {
    /// POST the JSON body
    Post { url: String },
    /// GET with the request flattened into query parameters
    Get { url: String },
    /// GET through a relay that takes the target in a `url` parameter and
    /// answers `{"contents": "<body>"}`
    WrappedGet { url: String, target: String },
}

impl Endpoint {
    pub fn url(&self) -> &str {
        match self {
            Endpoint::Post { url } | Endpoint::Get { url } | Endpoint::WrappedGet { url, .. } => {
                url
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct WrappedBody {
    contents: Option<String>,
}

pub struct HeatRiskClient {
    http: Client,
    endpoints: Vec<Endpoint>,
}

impl HeatRiskClient {
    pub fn new(endpoints: Vec<Endpoint>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { http, endpoints })
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Tries every endpoint in order and settles on exactly one outcome.
    ///
    /// The first endpoint that answers with a success status and a parseable
    /// body decides the outcome. When all of them fail the outcome is the
    /// synthetic connection failure payload.
    pub async fn submit(&self, request: &HeatRiskRequest) -> Outcome {
        for (attempt, endpoint) in self.endpoints.iter().enumerate() {
            debug!("Attempt {}: {:?}", attempt + 1, endpoint);
            match self.send(endpoint, request).await {
                Ok(response) => {
                    info!("Attempt {} succeeded via {}", attempt + 1, endpoint.url());
                    check_station(request, &response);
                    return Outcome::from_response(response);
                }
                Err(err) => warn!("Attempt {} via {} failed: {err}", attempt + 1, endpoint.url()),
            }
        }

        warn!("All {} endpoints failed", self.endpoints.len());
        Outcome::Failure(HeatRiskResponse::connection_failure())
    }

    pub async fn send(&self, endpoint: &Endpoint, request: &HeatRiskRequest) -> Result<HeatRiskResponse> {
        match endpoint {
            Endpoint::Post { url } => {
                let response = self
                    .http
                    .post(url)
                    .header(header::ACCEPT, "application/json")
                    .json(request)
                    .send()
                    .await?;
                let body = success_body(url, response).await?;
                HeatRiskResponse::from_json(&body)
            }
            Endpoint::Get { url } => {
                let response = self
                    .http
                    .get(url)
                    .header(header::ACCEPT, "application/json")
                    .query(&request.query_params())
                    .send()
                    .await?;
                let body = success_body(url, response).await?;
                HeatRiskResponse::from_json(&body)
            }
            Endpoint::WrappedGet { url, target } => {
                let target = Url::parse_with_params(target, request.query_params())
                    .map_err(|err| Error::InvalidEndpoint(format!("{target}: {err}")))?;
                let response = self
                    .http
                    .get(url)
                    .query(&[("url", target.as_str())])
                    .send()
                    .await?;
                let body = success_body(url, response).await?;
                let wrapped: WrappedBody = serde_json::from_str(&body)?;
                match wrapped.contents {
                    Some(contents) if !contents.is_empty() => HeatRiskResponse::from_json(&contents),
                    _ => Err(Error::MissingContents(url.clone())),
                }
            }
        }
    }
}

async fn success_body(url: &str, response: reqwest::Response) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        return Err(Error::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.text().await?)
}

fn check_station(request: &HeatRiskRequest, response: &HeatRiskResponse) {
    if let (Some(sent), Some(received)) = (request.station_id.as_deref(), response.observed_station_id()) {
        if sent != received {
            warn!("Requested station {sent} but the response is for station {received}");
        }
    }
}
