//! Typed query expressions.
//!
//! The server accepts an ordered list of query steps: attribute matches,
//! text search, sorting, paging and grouping. Building them as tagged
//! variants keeps malformed operators unrepresentable; serialization
//! produces the exact wire shape the server expects
//! (`{"attr": {"$eq": v}}`, `{"$sort": {...}}`, ...).

use serde::ser::{Serialize, Serializer};
use serde_json::{json, Map, Value};

/// An ordered sequence of query steps, serialized as a JSON array.
#[derive(Debug, Clone, Default)]
pub struct Query {
    steps: Vec<QueryStep>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn step(mut self, step: QueryStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Match one attribute against an operator.
    pub fn matches(self, attr: impl Into<String>, op: QueryOp) -> Self {
        self.step(QueryStep::Match {
            attr: attr.into(),
            op,
        })
    }

    pub fn search(self, term: impl Into<String>) -> Self {
        self.step(QueryStep::Search(term.into()))
    }

    pub fn sort(self, attr: impl Into<String>, dir: SortDir) -> Self {
        self.step(QueryStep::Sort(vec![(attr.into(), dir)]))
    }

    pub fn skip(self, n: u64) -> Self {
        self.step(QueryStep::Skip(n))
    }

    pub fn limit(self, n: u64) -> Self {
        self.step(QueryStep::Limit(n))
    }

    pub fn attrs(self, attrs: Vec<String>) -> Self {
        self.step(QueryStep::Attrs(attrs))
    }

    pub fn group(self, by: impl Into<String>, count: u64) -> Self {
        self.step(QueryStep::Group {
            by: by.into(),
            count,
        })
    }

    pub fn geo_near(self, attr: impl Into<String>, point: [f64; 2], dist: u64) -> Self {
        self.step(QueryStep::GeoNear {
            attr: attr.into(),
            point,
            dist,
        })
    }
}

/// One step of a query pipeline.
#[derive(Debug, Clone)]
pub enum QueryStep {
    /// `{attr: <operator>}`
    Match { attr: String, op: QueryOp },
    /// `{"$search": term}`
    Search(String),
    /// `{"$sort": {attr: 1 | -1, ...}}`
    Sort(Vec<(String, SortDir)>),
    /// `{"$skip": n}`
    Skip(u64),
    /// `{"$limit": n}`
    Limit(u64),
    /// `{"$attrs": [..]}`
    Attrs(Vec<String>),
    /// `{"$group": [{"by": attr, "count": n}]}`
    Group { by: String, count: u64 },
    /// `{"$geo_near": {"attr": .., "val": [lng, lat], "dist": metres}}`
    GeoNear {
        attr: String,
        point: [f64; 2],
        dist: u64,
    },
}

/// Sort direction, `1` ascending and `-1` descending on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    fn as_i8(self) -> i8 {
        match self {
            SortDir::Asc => 1,
            SortDir::Desc => -1,
        }
    }
}

/// Attribute match operators.
#[derive(Debug, Clone)]
pub enum QueryOp {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    Between(Value, Value),
    In(Vec<Value>),
    All(Vec<Value>),
    Regex(String),
}

impl QueryOp {
    pub fn eq(v: impl Into<Value>) -> Self {
        QueryOp::Eq(v.into())
    }

    pub fn ne(v: impl Into<Value>) -> Self {
        QueryOp::Ne(v.into())
    }

    pub fn gt(v: impl Into<Value>) -> Self {
        QueryOp::Gt(v.into())
    }

    pub fn gte(v: impl Into<Value>) -> Self {
        QueryOp::Gte(v.into())
    }

    pub fn lt(v: impl Into<Value>) -> Self {
        QueryOp::Lt(v.into())
    }

    pub fn lte(v: impl Into<Value>) -> Self {
        QueryOp::Lte(v.into())
    }

    pub fn between(lo: impl Into<Value>, hi: impl Into<Value>) -> Self {
        QueryOp::Between(lo.into(), hi.into())
    }

    pub fn in_set(vs: Vec<Value>) -> Self {
        QueryOp::In(vs)
    }

    pub fn all(vs: Vec<Value>) -> Self {
        QueryOp::All(vs)
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        QueryOp::Regex(pattern.into())
    }

    fn to_value(&self) -> Value {
        match self {
            QueryOp::Eq(v) => json!({ "$eq": v }),
            QueryOp::Ne(v) => json!({ "$ne": v }),
            QueryOp::Gt(v) => json!({ "$gt": v }),
            QueryOp::Gte(v) => json!({ "$gte": v }),
            QueryOp::Lt(v) => json!({ "$lt": v }),
            QueryOp::Lte(v) => json!({ "$lte": v }),
            QueryOp::Between(lo, hi) => json!({ "$bet": [lo, hi] }),
            QueryOp::In(vs) => json!({ "$in": vs }),
            QueryOp::All(vs) => json!({ "$all": vs }),
            QueryOp::Regex(pattern) => json!({ "$regex": pattern }),
        }
    }
}

impl QueryStep {
    fn to_value(&self) -> Value {
        match self {
            QueryStep::Match { attr, op } => {
                let mut m = Map::new();
                m.insert(attr.clone(), op.to_value());
                Value::Object(m)
            }
            QueryStep::Search(term) => json!({ "$search": term }),
            QueryStep::Sort(keys) => {
                let mut m = Map::new();
                for (attr, dir) in keys {
                    m.insert(attr.clone(), json!(dir.as_i8()));
                }
                json!({ "$sort": m })
            }
            QueryStep::Skip(n) => json!({ "$skip": n }),
            QueryStep::Limit(n) => json!({ "$limit": n }),
            QueryStep::Attrs(attrs) => json!({ "$attrs": attrs }),
            QueryStep::Group { by, count } => {
                json!({ "$group": [{ "by": by, "count": count }] })
            }
            QueryStep::GeoNear { attr, point, dist } => {
                json!({ "$geo_near": { "attr": attr, "val": point, "dist": dist } })
            }
        }
    }
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.steps.iter().map(QueryStep::to_value))
    }
}

impl Serialize for QueryStep {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}
