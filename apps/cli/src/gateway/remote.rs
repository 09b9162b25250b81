//! Remote row-store gateway over HTTP.
//!
//! Expected API:
//! - `GET  {base}/rows/{user}`  -> 200 `{"row": n, "cells": [...]}` or 404
//! - `GET  {base}/rows/id/{n}`  -> 200 `{"cells": [...]}`
//! - `PUT  {base}/rows/{user}`  body `{"row": n?, "cells": [...]}` -> 200 `{"row": n}`
//!
//! All calls are synchronous; the session treats failures as recoverable.

use quizdrill_core::error::GatewayError;
use quizdrill_core::gateway::{PersistenceGateway, ProgressRecord, RowHandle};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct RowResponse {
    row: u64,
    #[serde(default)]
    #[allow(dead_code)]
    cells: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CellsResponse {
    cells: Vec<String>,
}

#[derive(Debug, Serialize)]
struct WriteRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    row: Option<u64>,
    cells: &'a [String],
}

pub struct RemoteGateway {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl RemoteGateway {
    pub fn new(base_url: String, token: Option<String>) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| GatewayError::Io(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let response = self
            .authed(request)
            .send()
            .map_err(|e| GatewayError::Io(e.to_string()))?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(response)
        } else {
            let message = response.text().unwrap_or_default();
            Err(GatewayError::Backend {
                status: status.as_u16(),
                message,
            })
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        response
            .json()
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

impl PersistenceGateway for RemoteGateway {
    fn find(&mut self, user_id: &str) -> Result<Option<RowHandle>, GatewayError> {
        let url = format!("{}/rows/{}", self.base_url, user_id);
        let response = self.send(self.client.get(url))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: RowResponse = Self::decode(response)?;
        Ok(Some(RowHandle(body.row)))
    }

    fn read(&mut self, handle: &RowHandle) -> Result<ProgressRecord, GatewayError> {
        let url = format!("{}/rows/id/{}", self.base_url, handle.0);
        let response = self.send(self.client.get(url))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(GatewayError::Io(format!("no row {}", handle.0)));
        }
        let body: CellsResponse = Self::decode(response)?;
        ProgressRecord::from_cells(&body.cells)
    }

    fn write(
        &mut self,
        user_id: &str,
        record: &ProgressRecord,
        handle: Option<&RowHandle>,
    ) -> Result<RowHandle, GatewayError> {
        let url = format!("{}/rows/{}", self.base_url, user_id);
        let cells = record.to_cells();
        let body = WriteRequest {
            row: handle.map(|h| h.0),
            cells: &cells,
        };
        let response = self.send(self.client.put(url).json(&body))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(GatewayError::Io(format!(
                "row for {user_id} disappeared"
            )));
        }
        let body: RowResponse = Self::decode(response)?;
        Ok(RowHandle(body.row))
    }
}
