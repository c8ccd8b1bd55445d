use async_trait::async_trait;
use serde::Serialize;
use serde_json::{from_str, json};
use url::{ParseError, Url};

use super::server_interface::{
    AbstractServer, ErrorDetails, ErrorLayer, FileListing, Result, ServerError,
};
use crate::file_format::template::{CalcRequest, CalcResult};

/// reqwest won't return an error for an unhappy status code itself; someone
/// would need to call `Response::error_from_status`, so for now we'll generally
/// assume everything is some kind of transient problem.
impl From<reqwest::Error> for ServerError {
    fn from(err: reqwest::Error) -> ServerError {
        ServerError::TransientProblem(ErrorDetails {
            layer: ErrorLayer::ServerLayer,
            message: err.to_string(),
        })
    }
}

impl From<ParseError> for ServerError {
    fn from(err: ParseError) -> ServerError {
        ServerError::StickyProblem(ErrorDetails {
            layer: ErrorLayer::BadInput,
            message: err.to_string(),
        })
    }
}

#[derive(Debug)]
struct RemoteServer {
    client: reqwest::Client,
    metadata_url: Url,
    calc_url: Url,
}

async fn post_json<T: Serialize>(client: &reqwest::Client, url: Url, body: &T) -> Result<String> {
    let res = client
        .post(url)
        .header("Accept", "application/json")
        .header("Content-Type", "application/json")
        .body(serde_json::to_string(body)?)
        .send()
        .await?;

    if !res.status().is_success() {
        if res.status().is_server_error() {
            return Err(ServerError::TransientProblem(ErrorDetails {
                layer: ErrorLayer::ServerLayer,
                message: format!("Server status of {}", res.status()),
            }));
        } else {
            return Err(ServerError::StickyProblem(ErrorDetails {
                layer: ErrorLayer::DataLayer,
                message: format!("Server status of {}", res.status()),
            }));
        }
    }

    Ok(res.text().await?)
}

#[async_trait]
impl AbstractServer for RemoteServer {
    async fn get_file_metadata(&self, source: &str, pathlist: &[String]) -> Result<FileListing> {
        let body = json!({ "source": source, "pathlist": pathlist });
        let raw_str = post_json(&self.client, self.metadata_url.clone(), &body).await?;
        Ok(from_str(&raw_str)?)
    }

    async fn calculate(&self, request: &CalcRequest) -> Result<Vec<CalcResult>> {
        let raw_str = post_json(&self.client, self.calc_url.clone(), request).await?;
        // A malformed answer to a well-formed calculation is the server's
        // fault rather than the data's.
        match from_str(&raw_str) {
            Ok(results) => Ok(results),
            Err(err) => Err(ServerError::StickyProblem(ErrorDetails {
                layer: ErrorLayer::ServerLayer,
                message: err.to_string(),
            })),
        }
    }
}

pub fn make_remote_server(server_base_url: Url) -> Result<Box<dyn AbstractServer + Send + Sync>> {
    let metadata_url = server_base_url.join("get_file_metadata")?;
    let calc_url = server_base_url.join("calc_terminal")?;

    Ok(Box::new(RemoteServer {
        client: reqwest::Client::new(),
        metadata_url,
        calc_url,
    }))
}
