//! Request and response envelopes of the supplier query service
//!
//! Every request shares one [`QueryTemplate`]. Workers never touch it in
//! place: [`QueryTemplate::for_page`] clones the envelope and patches only the
//! pagination attributes of the `result` block.

use crate::Record;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};

use super::{PageRequest, PageResponse};

/// Block whose rows and count make up the export
pub const RESULT_BLOCK: &str = "result";

/// Block carrying the query filter
pub const FILTER_BLOCK: &str = "inqu_status";

const SERVICE_NAME: &str = "PSRM01";
const METHOD_NAME: &str = "querySupCm";
const PROTOCOL_VERSION: &str = "2.0";

/// Filter columns of the supplier query, in position order
const FILTER_COLUMNS: [&str; 6] = [
    "supplierCode",
    "supplierName",
    "companyType",
    "offlineSupplier",
    "unifiedSocialCode",
    "aliveFlag",
];

/// Request envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payload {
    /// Target service
    #[serde(rename = "serviceName")]
    pub service_name: String,
    /// Target method
    #[serde(rename = "methodName")]
    pub method_name: String,
    /// Request context (empty for this query)
    #[serde(rename = "__context__")]
    pub context: Map<String, Value>,
    /// Caller details (empty for this query)
    #[serde(rename = "__user__")]
    pub user: Map<String, Value>,
    /// Protocol version
    #[serde(rename = "__version__")]
    pub version: String,
    /// System status section
    #[serde(rename = "__sys__")]
    pub sys: Map<String, Value>,
    /// Named data blocks
    #[serde(rename = "__blocks__")]
    pub blocks: BTreeMap<String, PayloadBlock>,
}

/// One named block of the request envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayloadBlock {
    /// Column metadata
    pub meta: BlockMeta,
    /// Block rows
    pub rows: Vec<Vec<Value>>,
    /// Block attributes (pagination lives here for the result block)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attr: Option<Map<String, Value>>,
}

/// Column metadata of a block
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BlockMeta {
    /// Block description
    #[serde(skip_serializing_if = "String::is_empty")]
    pub desc: String,
    /// Metadata attributes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attr: Option<Map<String, Value>>,
    /// Column descriptors
    pub columns: Vec<Value>,
}

/// Immutable request template shared by every fetch of a run
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTemplate {
    payload: Payload,
}

impl QueryTemplate {
    /// Template of the active-supplier listing query
    pub fn supplier_query() -> Self {
        let mut sys = Map::new();
        for key in ["name", "descName", "msg", "msgKey", "detailMsg", "traceId"] {
            sys.insert(key.to_string(), json!(""));
        }
        sys.insert("status".to_string(), json!(0));

        let mut blocks = BTreeMap::new();
        blocks.insert(
            RESULT_BLOCK.to_string(),
            PayloadBlock {
                meta: BlockMeta::default(),
                rows: vec![Vec::new()],
                attr: Some(pagination_attr(10, 10)),
            },
        );

        let columns = FILTER_COLUMNS
            .iter()
            .enumerate()
            .map(|(pos, name)| json!({ "pos": pos, "name": name }))
            .collect();
        blocks.insert(
            FILTER_BLOCK.to_string(),
            PayloadBlock {
                meta: BlockMeta {
                    desc: String::new(),
                    attr: Some(Map::new()),
                    columns,
                },
                // Empty filters, aliveFlag = "1"
                rows: vec![vec![
                    json!(""),
                    json!(""),
                    json!(""),
                    json!(""),
                    json!(""),
                    json!("1"),
                ]],
                attr: Some(Map::new()),
            },
        );

        Self {
            payload: Payload {
                service_name: SERVICE_NAME.to_string(),
                method_name: METHOD_NAME.to_string(),
                context: Map::new(),
                user: Map::new(),
                version: PROTOCOL_VERSION.to_string(),
                sys,
                blocks,
            },
        }
    }

    /// Wrap an arbitrary envelope as a template
    pub fn from_payload(payload: Payload) -> Self {
        Self { payload }
    }

    /// The unpatched envelope
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Service name of the envelope
    pub fn service_name(&self) -> &str {
        &self.payload.service_name
    }

    /// Method name of the envelope
    pub fn method_name(&self) -> &str {
        &self.payload.method_name
    }

    /// Derive the envelope for one page.
    ///
    /// The template itself is left untouched; the result block's attributes
    /// are created if the template has none.
    pub fn for_page(&self, request: PageRequest) -> Payload {
        let mut payload = self.payload.clone();
        let block = payload
            .blocks
            .entry(RESULT_BLOCK.to_string())
            .or_insert_with(|| PayloadBlock {
                meta: BlockMeta::default(),
                rows: vec![Vec::new()],
                attr: None,
            });

        let attr = block.attr.get_or_insert_with(Map::new);
        attr.extend(pagination_attr(request.limit, request.offset));
        payload
    }
}

impl Default for QueryTemplate {
    fn default() -> Self {
        Self::supplier_query()
    }
}

fn pagination_attr(limit: u64, offset: u64) -> Map<String, Value> {
    let mut attr = Map::new();
    attr.insert("limit".to_string(), json!(limit));
    attr.insert("offset".to_string(), json!(offset));
    attr.insert("showCount".to_string(), json!("true"));
    attr
}

/// Response envelope
#[derive(Debug, Default, Deserialize)]
pub struct ResponseEnvelope {
    /// Named data blocks
    #[serde(rename = "__blocks__", default)]
    pub blocks: HashMap<String, ResponseBlock>,
}

/// One named block of the response envelope
#[derive(Debug, Default, Deserialize)]
pub struct ResponseBlock {
    /// Block rows
    #[serde(default)]
    pub rows: Option<Vec<Record>>,
    /// Block attributes
    #[serde(default)]
    pub attr: Option<ResponseAttr>,
}

/// Attributes of a response block
#[derive(Debug, Default, Deserialize)]
pub struct ResponseAttr {
    /// Total record count, advertised when `showCount` was requested
    #[serde(default)]
    pub count: Option<u64>,
}

impl ResponseEnvelope {
    /// Extract the result block as a page.
    ///
    /// A response without a result block yields an empty page with no count.
    pub fn into_page(mut self) -> PageResponse {
        match self.blocks.remove(RESULT_BLOCK) {
            Some(block) => PageResponse {
                rows: block.rows.unwrap_or_default(),
                total_count: block.attr.and_then(|attr| attr.count),
            },
            None => PageResponse::default(),
        }
    }
}
