/// Wire format of chunk requests and responses
///
/// A chunk request carries `offset` and `limit` (both absent for an
/// all-in-one request), as query parameters or as a urlencoded form body.
/// The response is a JSON array of records, each an object or an array.
use crate::error::{Error, Result};
use crate::ingest::ingest_json;
use crate::record::Record;
use crate::sync::ChunkRequest;
use serde::{Deserialize, Serialize};

/// Offset and limit of a chunk request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChunkQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl ChunkQuery {
    pub fn new(offset: usize, limit: usize) -> Self {
        ChunkQuery {
            offset: Some(offset),
            limit: Some(limit),
        }
    }

    pub fn from_request(request: &ChunkRequest) -> Self {
        ChunkQuery {
            offset: request.offset,
            limit: request.limit,
        }
    }

    /// `offset=..&limit=..`, empty for an all-in-one request.
    pub fn to_query_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(offset) = self.offset {
            parts.push(format!("offset={}", offset));
        }
        if let Some(limit) = self.limit {
            parts.push(format!("limit={}", limit));
        }
        parts.join("&")
    }

    /// The part of `records` this query asks for. An offset past the end
    /// yields an empty chunk, which ends a streaming load.
    pub fn slice<'a, T>(&self, records: &'a [T]) -> &'a [T] {
        let start = self.offset.unwrap_or(0).min(records.len());
        let end = match self.limit {
            Some(limit) => start.saturating_add(limit).min(records.len()),
            None => records.len(),
        };
        &records[start..end]
    }
}

/// Error body returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub fn encode_chunk(records: &[Record]) -> Result<String> {
    serde_json::to_string(records).map_err(Error::from)
}

pub fn decode_chunk(body: &str) -> Result<Vec<Record>> {
    ingest_json(body)
}
