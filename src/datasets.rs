//! Static descriptors for the month-sharded datasets.
//!
//! Each [`Dataset`] names its collection prefix, the field used to pick a
//! shard, how the document `id` is built, which fields carry monetary
//! values, and the Typesense schema every shard is created with.
//!
//! | Dataset | Prefix | Routed by |
//! |---------|--------|-----------|
//! | `transaction` | `transaction_month__` | `CREATE_DATE` |
//! | `status_count_mins` | `status_count_mins_month__` | `WINDOW_START` |

use serde::Serialize;

use crate::naming::{collection_name, ShardKey};

/// One field in a Typesense collection schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facet: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
}

/// Body of a Typesense `POST /collections` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionSchema {
    pub name: String,
    pub fields: Vec<FieldSpec>,
    pub default_sorting_field: String,
}

/// A logical dataset spread over monthly shard collections.
#[derive(Debug, Clone, Copy)]
pub struct Dataset {
    pub name: &'static str,
    pub prefix: &'static str,
    /// Millisecond epoch field that selects the shard.
    pub route_field: &'static str,
    /// Fields joined with `_` to form the document `id`.
    pub id_fields: &'static [&'static str],
    /// Fields that may arrive as base64 scaled decimals.
    pub monetary_fields: &'static [&'static str],
    pub decimal_scale: u32,
    pub default_sorting_field: &'static str,
    fields: &'static [Field],
}

/// Compact static form of a [`FieldSpec`].
#[derive(Debug, Clone, Copy)]
struct Field {
    name: &'static str,
    ty: &'static str,
    facet: Option<bool>,
    index: Option<bool>,
    sort: Option<bool>,
    optional: Option<bool>,
}

const fn field(name: &'static str, ty: &'static str) -> Field {
    Field {
        name,
        ty,
        facet: None,
        index: None,
        sort: None,
        optional: None,
    }
}

impl Field {
    const fn facet(mut self, v: bool) -> Self {
        self.facet = Some(v);
        self
    }
    const fn index(mut self) -> Self {
        self.index = Some(true);
        self
    }
    const fn sort(mut self) -> Self {
        self.sort = Some(true);
        self
    }
    const fn optional(mut self, v: bool) -> Self {
        self.optional = Some(v);
        self
    }
}

impl Dataset {
    pub fn collection_name(&self, key: &ShardKey) -> String {
        collection_name(self.prefix, key)
    }

    /// The schema a shard of this dataset is created with.
    pub fn schema(&self, collection: &str) -> CollectionSchema {
        CollectionSchema {
            name: collection.to_string(),
            fields: self
                .fields
                .iter()
                .map(|f| FieldSpec {
                    name: f.name.to_string(),
                    field_type: f.ty.to_string(),
                    facet: f.facet,
                    index: f.index,
                    sort: f.sort,
                    optional: f.optional,
                })
                .collect(),
            default_sorting_field: self.default_sorting_field.to_string(),
        }
    }
}

pub const TRANSACTION: Dataset = Dataset {
    name: "transaction",
    prefix: "transaction_month__",
    route_field: "CREATE_DATE",
    id_fields: &["TRANID"],
    monetary_fields: &[
        "BILL_AMT",
        "ACTUAL_AMT",
        "REFUND_AMT",
        "DEF_AMT",
        "CUR_AMT",
        "TRANSACTION_COST",
        "CHANNEL_COST",
    ],
    decimal_scale: 2,
    default_sorting_field: "TRANID",
    fields: &[
        field("id", "string").facet(false).optional(false),
        field("TRANID", "int64").index().sort().optional(false),
        field("ORDER_ID", "string").index().sort().optional(true),
        field("BILL_AMT", "float").optional(true),
        field("CUR_ACTUAL", "string").facet(true).optional(true),
        field("ACTUAL_AMT", "float").optional(true),
        field("STATUS", "string").facet(true).optional(true),
        field("TRANKEY", "string").index().optional(true),
        field("CREATE_DATE", "int64").sort().optional(true),
        field("CHARGEBACK_DATE", "int64").sort().optional(true),
        field("PAID_DATE", "int64").sort().optional(true),
        field("CHANNEL", "string").facet(true).optional(true),
        field("MERCHANTID", "string").index().facet(true).optional(true),
        field("BILLING_NAME", "string").optional(true),
        field("BILLING_EMAIL", "string").optional(true),
        field("BILLING_MOBILE", "string").optional(true),
        field("BILLING_INFO", "string").optional(true),
        field("APP_CODE", "string").optional(true),
        field("STATUS_DESC", "string").optional(true),
        field("REFUND_AMT", "float").optional(true),
        field("HISTORY", "string").optional(true),
        field("BIN", "int32").optional(true),
        field("IP", "string").facet(true).optional(true),
        field("DEF_AMT", "float").optional(true),
    ],
};

pub const STATUS_COUNT_MINS: Dataset = Dataset {
    name: "status_count_mins",
    prefix: "status_count_mins_month__",
    route_field: "WINDOW_START",
    id_fields: &["MERCHANTID", "CHANNEL", "L_VERSION", "CURRENCY", "WINDOW_START"],
    monetary_fields: &["BILL_AMT"],
    decimal_scale: 2,
    default_sorting_field: "WINDOW_START",
    fields: &[
        field("id", "string").facet(false),
        field("MERCHANTID", "string").index().facet(true),
        field("CHANNEL", "string").index().facet(true),
        field("L_VERSION", "string").index().facet(true),
        field("UPDATE_DATE", "int64").sort().index(),
        field("WINDOW_START", "int64").sort().index(),
        field("WINDOW_END", "int64").sort(),
        field("COUNT_AUTHORIZED", "int32"),
        field("COUNT_CAPTURED", "int32"),
        field("COUNT_HOLD", "int32"),
        field("COUNT_CHARGEBACK", "int32"),
        field("COUNT_CANCELLED", "int32"),
        field("COUNT_BLOCKED", "int32"),
        field("COUNT_FAILED", "int32"),
        field("COUNT_SETTLED", "int32"),
        field("COUNT_REQCANCEL", "int32"),
        field("COUNT_UNKNOWN", "int32"),
        field("COUNT_PENDING", "int32"),
        field("COUNT_RELEASE", "int32"),
        field("COUNT_REJECT", "int32"),
        field("COUNT_TESTOK", "int32"),
        field("COUNT_REQCHARGEBACK", "int32"),
        field("BILL_AMT", "float"),
        field("CURRENCY", "string").index().facet(true),
    ],
};

/// Every dataset the lifecycle job maintains.
pub const ALL: &[Dataset] = &[TRANSACTION, STATUS_COUNT_MINS];

pub fn find(name: &str) -> Option<&'static Dataset> {
    ALL.iter().find(|d| d.name == name)
}
