//! Cloud Firestore over its REST v1 API.
//!
//! Firestore does not store plain JSON: every field is a tagged value
//! (`{"stringValue": "…"}`, `{"doubleValue": 1.5}`, `{"integerValue": "3"}`,
//! …). [`encode_fields`] and [`decode_fields`] translate between that wire
//! form and the untyped [`Document`] the rest of the crate works with.
//!
//! Authentication is either a web API key (sent as `?key=`, evaluated against
//! security rules) or an OAuth bearer token, whichever the config carries.

use super::{Document, DocumentStore, StoreError, StoredDocument};
use crate::config::FirestoreConfig;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

/// Firestore-backed [`DocumentStore`].
#[derive(Debug, Clone)]
pub struct FirestoreStore {
    client: reqwest::Client,
    config: FirestoreConfig,
}

impl FirestoreStore {
    /// Build a store client. Fails only if the HTTP client cannot be created.
    pub fn new(config: FirestoreConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.config.base_url.trim_end_matches('/'),
            self.config.project_id
        )
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let req = match self.config.api_key {
            Some(ref key) => req.query(&[("key", key)]),
            None => req,
        };
        match self.config.bearer_token {
            Some(ref token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let response = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Rejected {
            status,
            message: error_message(&body),
        })
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn create(&self, collection: &str, doc: Document) -> Result<String, StoreError> {
        let url = format!("{}/{}", self.documents_root(), collection);
        let body = json!({ "fields": encode_fields(&doc) });
        let response = self.send(self.client.post(&url).json(&body)).await?;
        let created: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))?;

        let name = created
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Malformed("created document has no name".into()))?;
        let id = doc_id_from_name(name).to_string();
        debug!("Created {}/{}", collection, id);
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, StoreError> {
        let url = format!("{}/{}/{}", self.documents_root(), collection, id);
        let response = match self.send(self.client.get(&url)).await {
            Ok(r) => r,
            Err(StoreError::Rejected { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let raw: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        parse_document(&raw).map(Some)
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let url = format!("{}:runQuery", self.documents_root());
        let body = equality_query(collection, field, value);
        let response = self.send(self.client.post(&url).json(&body)).await?;
        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))?;

        // Rows without a `document` only carry read metadata.
        rows.iter()
            .filter_map(|row| row.get("document"))
            .map(parse_document)
            .collect()
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let url = format!("{}/{}/{}", self.documents_root(), collection, id);
        self.send(self.client.delete(&url)).await?;
        debug!("Deleted {}/{}", collection, id);
        Ok(())
    }
}

// ── Wire format ──────────────────────────────────────────────────────────

/// Encode a document body into Firestore's `fields` map.
pub fn encode_fields(doc: &Document) -> Value {
    Value::Object(
        doc.iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect(),
    )
}

/// Encode one JSON value as a Firestore typed value.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // Firestore wants 64-bit integers as decimal strings.
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or(0.0) }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({
            "mapValue": { "fields": encode_fields(map) }
        }),
    }
}

/// Decode Firestore's `fields` map back into a document body.
pub fn decode_fields(fields: &Value) -> Result<Document, StoreError> {
    let Some(map) = fields.as_object() else {
        return Ok(Map::new());
    };
    map.iter()
        .map(|(k, v)| decode_value(v).map(|d| (k.clone(), d)))
        .collect()
}

/// Decode one Firestore typed value.
pub fn decode_value(value: &Value) -> Result<Value, StoreError> {
    let Some((tag, inner)) = value.as_object().and_then(|m| m.iter().next()) else {
        return Err(StoreError::Malformed(format!("untagged value: {value}")));
    };

    match tag.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => Ok(inner.clone()),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                other => other.as_i64(),
            };
            parsed
                .map(Value::from)
                .ok_or_else(|| StoreError::Malformed(format!("bad integerValue: {inner}")))
        }
        "doubleValue" => inner
            .as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| StoreError::Malformed(format!("bad doubleValue: {inner}"))),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => Ok(inner.clone()),
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => inner
            .get("values")
            .and_then(Value::as_array)
            .map(|vals| vals.iter().map(decode_value).collect::<Result<Vec<_>, _>>())
            .unwrap_or_else(|| Ok(Vec::new()))
            .map(Value::Array),
        "mapValue" => decode_fields(inner.get("fields").unwrap_or(&Value::Null)).map(Value::Object),
        other => Err(StoreError::Malformed(format!("unknown value type '{other}'"))),
    }
}

/// Body for a single-field equality `runQuery`.
pub fn equality_query(collection: &str, field: &str, value: &Value) -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": collection }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": field },
                    "op": "EQUAL",
                    "value": encode_value(value),
                }
            }
        }
    })
}

/// Last path segment of a resource name (`projects/…/documents/products/ID`).
pub fn doc_id_from_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn parse_document(raw: &Value) -> Result<StoredDocument, StoreError> {
    let name = raw
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Malformed("document has no name".into()))?;
    Ok(StoredDocument {
        id: doc_id_from_name(name).to_string(),
        fields: decode_fields(raw.get("fields").unwrap_or(&Value::Null))?,
    })
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_product_document() {
        let doc = json!({
            "storeId": "s1",
            "price": 250.5,
            "stock": 3,
            "active": true,
            "tags": ["a"],
            "meta": { "k": null }
        });
        let enc = encode_fields(doc.as_object().unwrap());
        assert_eq!(enc["storeId"], json!({ "stringValue": "s1" }));
        assert_eq!(enc["price"], json!({ "doubleValue": 250.5 }));
        assert_eq!(enc["stock"], json!({ "integerValue": "3" }));
        assert_eq!(enc["active"], json!({ "booleanValue": true }));
        assert_eq!(
            enc["tags"],
            json!({ "arrayValue": { "values": [{ "stringValue": "a" }] } })
        );
        assert_eq!(
            enc["meta"],
            json!({ "mapValue": { "fields": { "k": { "nullValue": null } } } })
        );
    }

    #[test]
    fn decode_handles_every_tag() {
        let fields = json!({
            "name": { "stringValue": "Shirt" },
            "price": { "integerValue": "200" },
            "ratio": { "doubleValue": 0.5 },
            "createdAt": { "timestampValue": "2026-10-01T00:00:00Z" },
            "empty": { "arrayValue": {} },
            "nested": { "mapValue": { "fields": { "x": { "booleanValue": false } } } },
            "nothing": { "nullValue": null }
        });
        let doc = decode_fields(&fields).unwrap();
        assert_eq!(doc["name"], "Shirt");
        assert_eq!(doc["price"], 200);
        assert_eq!(doc["ratio"], 0.5);
        assert_eq!(doc["createdAt"], "2026-10-01T00:00:00Z");
        assert_eq!(doc["empty"], json!([]));
        assert_eq!(doc["nested"], json!({ "x": false }));
        assert_eq!(doc["nothing"], Value::Null);
    }

    #[test]
    fn decode_rejects_unknown_tag() {
        let err = decode_value(&json!({ "weirdValue": 1 })).unwrap_err();
        assert!(err.to_string().contains("weirdValue"));
    }

    #[test]
    fn query_body_shape() {
        let q = equality_query("stores", "handle", &json!("acme"));
        assert_eq!(q["structuredQuery"]["from"][0]["collectionId"], "stores");
        let filter = &q["structuredQuery"]["where"]["fieldFilter"];
        assert_eq!(filter["field"]["fieldPath"], "handle");
        assert_eq!(filter["op"], "EQUAL");
        assert_eq!(filter["value"], json!({ "stringValue": "acme" }));
    }

    #[test]
    fn ids_and_error_messages() {
        assert_eq!(
            doc_id_from_name("projects/p/databases/(default)/documents/products/abc"),
            "abc"
        );
        assert_eq!(
            error_message(r#"{"error":{"code":403,"message":"Missing or insufficient permissions."}}"#),
            "Missing or insufficient permissions."
        );
        assert_eq!(error_message("gateway down"), "gateway down");
    }

    #[test]
    fn parse_document_extracts_id() {
        let raw = json!({
            "name": "projects/p/databases/(default)/documents/stores/s9",
            "fields": { "name": { "stringValue": "Acme" } }
        });
        let doc = parse_document(&raw).unwrap();
        assert_eq!(doc.id, "s9");
        assert_eq!(doc.fields["name"], "Acme");
    }
}
