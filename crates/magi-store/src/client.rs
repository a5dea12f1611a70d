// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The document-store sidecar (spec §1: "document insert/find/delete
//! against a remote document store... a leaf module exposed to user code
//! but not part of the dispatch core").
//!
//! `original_source/magiCLib/Database.h` specifies this interface
//! (`operationType_t {INSERT, FIND, FIND_ALL, DELETE, DELETE_ALL}`,
//! `dataType_t {INT, CHAR, STRING, DOUBLE}`) against a MongoDB backend; this
//! implementation keeps the same four operations and typed key/value model
//! but talks JSON-over-HTTP to `db_location:db_port`, matching how the rest
//! of this corpus's remote-service adapters are built (`reqwest` +
//! `serde_json`), rather than adding a MongoDB driver dependency nothing
//! else here needs.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::StoreError;

/// `dataType_t` (spec-adjacent, from `Database.h`): the typed value carried
/// by a key in an insert/find/delete operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Int(i64),
    Char(char),
    Str(String),
    Double(f64),
}

/// A client for the document-store sidecar. Opaque to the dispatch core —
/// user-registered callables may hold one and call it directly; C1–C6 never
/// reference this type.
#[derive(Debug, Clone)]
pub struct DocumentStoreClient {
    base_url: String,
    http: reqwest::Client,
}

impl DocumentStoreClient {
    pub fn new(db_location: &str, db_port: u16) -> Self {
        Self {
            base_url: format!("http://{db_location}:{db_port}"),
            http: reqwest::Client::new(),
        }
    }

    /// `OPER_INSERT`: insert a document (a flat set of key/value pairs)
    /// into `collection`.
    pub async fn insert(
        &self,
        collection: &str,
        fields: &[(String, FieldValue)],
    ) -> Result<(), StoreError> {
        tracing::debug!(collection, "document store: insert");
        let body = json!({ "fields": fields });
        let resp = self
            .http
            .post(format!("{}/{}/insert", self.base_url, collection))
            .json(&body)
            .send()
            .await?;
        Self::check_status(resp.status())
    }

    /// `OPER_FIND`: find the first document where `key == value`.
    pub async fn find(
        &self,
        collection: &str,
        key: &str,
        value: &FieldValue,
    ) -> Result<Option<serde_json::Value>, StoreError> {
        tracing::debug!(collection, key, "document store: find");
        let resp = self
            .http
            .post(format!("{}/{}/find", self.base_url, collection))
            .json(&json!({ "key": key, "value": value }))
            .send()
            .await?;
        Self::check_status(resp.status())?;
        Ok(resp.json::<Option<serde_json::Value>>().await.unwrap_or(None))
    }

    /// `OPER_FIND_ALL`: return every document in `collection`.
    pub async fn find_all(&self, collection: &str) -> Result<Vec<serde_json::Value>, StoreError> {
        tracing::debug!(collection, "document store: find_all");
        let resp = self
            .http
            .get(format!("{}/{}", self.base_url, collection))
            .send()
            .await?;
        Self::check_status(resp.status())?;
        Ok(resp.json::<Vec<serde_json::Value>>().await.unwrap_or_default())
    }

    /// `OPER_DELETE`: delete documents where `key == value`.
    pub async fn delete(&self, collection: &str, key: &str, value: &FieldValue) -> Result<(), StoreError> {
        tracing::debug!(collection, key, "document store: delete");
        let resp = self
            .http
            .post(format!("{}/{}/delete", self.base_url, collection))
            .json(&json!({ "key": key, "value": value }))
            .send()
            .await?;
        Self::check_status(resp.status())
    }

    /// `OPER_DELETE_ALL`: delete every document in `collection`.
    pub async fn delete_all(&self, collection: &str) -> Result<(), StoreError> {
        tracing::debug!(collection, "document store: delete_all");
        let resp = self
            .http
            .delete(format!("{}/{}", self.base_url, collection))
            .send()
            .await?;
        Self::check_status(resp.status())
    }

    fn check_status(status: reqwest::StatusCode) -> Result<(), StoreError> {
        if status.is_success() {
            Ok(())
        } else {
            tracing::error!(status = status.as_u16(), "document store: request failed");
            Err(StoreError::Status(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_value_serializes_tagged() {
        let v = FieldValue::Int(42);
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["type"], "int");
        assert_eq!(json["value"], 42);
    }

    #[test]
    fn base_url_built_from_location_and_port() {
        let client = DocumentStoreClient::new("127.0.0.1", 27017);
        assert_eq!(client.base_url, "http://127.0.0.1:27017");
    }
}
