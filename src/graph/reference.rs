//! References between declarations and deferred value expressions.
//!
//! A [`ResourceRef`] addresses one declaration by `(stack, id)`. An
//! [`AttrRef`] additionally names one of its computed attributes, whose value
//! only exists once the provisioning backend has created the resource. Values
//! that mix literals and attributes are modelled as [`ValueExpr`] and rendered
//! to `${stack/id.Attribute}` tokens when the plan is synthesized.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Address of a declaration inside a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Owning stack name
    pub stack: String,
    /// Declaration id, unique within the stack
    pub id: String,
}

impl ResourceRef {
    /// Create a new reference
    pub fn new(stack: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            stack: stack.into(),
            id: id.into(),
        }
    }

    /// Reference one of this declaration's computed attributes
    pub fn attr(&self, attribute: impl Into<String>) -> ValueExpr {
        ValueExpr::Attribute(AttrRef {
            target: self.clone(),
            attribute: attribute.into(),
        })
    }

    /// Fully-qualified identifier used in the plan
    pub fn qualified(&self) -> String {
        format!("{}/{}", self.stack, self.id)
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.stack, self.id)
    }
}

/// A computed attribute of a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttrRef {
    /// Declaration exposing the attribute
    pub target: ResourceRef,
    /// Attribute name (e.g. `ServiceUrl`)
    pub attribute: String,
}

impl AttrRef {
    /// Placeholder token substituted by the provisioning backend
    pub fn token(&self) -> String {
        format!("${{{}}}", self)
    }
}

impl fmt::Display for AttrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.target, self.attribute)
    }
}

/// A string value that may depend on attributes not yet known.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueExpr {
    /// A plain string
    Literal(String),
    /// A declaration attribute
    Attribute(AttrRef),
    /// Concatenation of parts
    Join(Vec<ValueExpr>),
}

impl ValueExpr {
    /// Create a literal expression
    pub fn literal(value: impl Into<String>) -> Self {
        ValueExpr::Literal(value.into())
    }

    /// Concatenate parts into one string
    pub fn join(parts: impl IntoIterator<Item = ValueExpr>) -> Self {
        ValueExpr::Join(parts.into_iter().collect())
    }

    /// Prefix an expression with the HTTPS scheme
    pub fn https(host: ValueExpr) -> Self {
        Self::join([ValueExpr::literal("https://"), host])
    }

    /// Collect every attribute the expression reads
    pub fn references(&self) -> Vec<&AttrRef> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a AttrRef>) {
        match self {
            ValueExpr::Literal(_) => {}
            ValueExpr::Attribute(attr) => out.push(attr),
            ValueExpr::Join(parts) => {
                for part in parts {
                    part.collect_references(out);
                }
            }
        }
    }

    /// Render with every attribute replaced by its token, without validation
    pub fn render(&self) -> String {
        match self {
            ValueExpr::Literal(s) => s.clone(),
            ValueExpr::Attribute(attr) => attr.token(),
            ValueExpr::Join(parts) => parts.iter().map(ValueExpr::render).collect(),
        }
    }

    /// Render, checking every attribute with `resolve` first
    pub fn resolve<F>(&self, resolve: &F) -> Result<String>
    where
        F: Fn(&AttrRef) -> Result<String>,
    {
        match self {
            ValueExpr::Literal(s) => Ok(s.clone()),
            ValueExpr::Attribute(attr) => resolve(attr),
            ValueExpr::Join(parts) => parts.iter().map(|p| p.resolve(resolve)).collect(),
        }
    }
}

impl fmt::Display for ValueExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for ValueExpr {
    fn from(value: &str) -> Self {
        ValueExpr::literal(value)
    }
}

impl From<String> for ValueExpr {
    fn from(value: String) -> Self {
        ValueExpr::Literal(value)
    }
}

/// A configuration payload entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    /// A fixed JSON value
    Scalar(serde_json::Value),
    /// A deferred string
    Expr(ValueExpr),
    /// An ordered list
    List(Vec<ConfigValue>),
    /// A nested mapping, insertion-ordered
    Map(IndexMap<String, ConfigValue>),
}

impl ConfigValue {
    /// Build a nested mapping from key/value pairs
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<ConfigValue>,
    {
        ConfigValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a list
    pub fn list<V: Into<ConfigValue>>(items: impl IntoIterator<Item = V>) -> Self {
        ConfigValue::List(items.into_iter().map(Into::into).collect())
    }

    /// Declarations this value reads attributes from
    pub fn referenced_resources(&self, out: &mut BTreeSet<ResourceRef>) {
        match self {
            ConfigValue::Scalar(_) => {}
            ConfigValue::Expr(expr) => {
                for attr in expr.references() {
                    out.insert(attr.target.clone());
                }
            }
            ConfigValue::List(items) => {
                for item in items {
                    item.referenced_resources(out);
                }
            }
            ConfigValue::Map(entries) => {
                for value in entries.values() {
                    value.referenced_resources(out);
                }
            }
        }
    }

    /// Render into plain JSON, resolving attribute references
    pub fn resolve<F>(&self, resolve: &F) -> Result<serde_json::Value>
    where
        F: Fn(&AttrRef) -> Result<String>,
    {
        Ok(match self {
            ConfigValue::Scalar(v) => v.clone(),
            ConfigValue::Expr(expr) => serde_json::Value::String(expr.resolve(resolve)?),
            ConfigValue::List(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|i| i.resolve(resolve))
                    .collect::<Result<Vec<_>>>()?,
            ),
            ConfigValue::Map(entries) => {
                let mut map = serde_json::Map::new();
                for (key, value) in entries {
                    map.insert(key.clone(), value.resolve(resolve)?);
                }
                serde_json::Value::Object(map)
            }
        })
    }

    /// Borrow as a deferred expression
    pub fn as_expr(&self) -> Option<&ValueExpr> {
        match self {
            ConfigValue::Expr(expr) => Some(expr),
            _ => None,
        }
    }

    /// Borrow as a string scalar
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Scalar(serde_json::Value::String(s)) => Some(s),
            ConfigValue::Expr(ValueExpr::Literal(s)) => Some(s),
            _ => None,
        }
    }

    /// Borrow as a boolean scalar
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Scalar(v) => v.as_bool(),
            _ => None,
        }
    }

    /// Borrow as a list
    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a key of a nested mapping
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        match self {
            ConfigValue::Map(entries) => entries.get(key),
            _ => None,
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Scalar(serde_json::Value::String(value.to_string()))
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Scalar(serde_json::Value::String(value))
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Scalar(serde_json::Value::Bool(value))
    }
}

impl From<u16> for ConfigValue {
    fn from(value: u16) -> Self {
        ConfigValue::Scalar(serde_json::Value::from(value))
    }
}

impl From<u32> for ConfigValue {
    fn from(value: u32) -> Self {
        ConfigValue::Scalar(serde_json::Value::from(value))
    }
}

impl From<usize> for ConfigValue {
    fn from(value: usize) -> Self {
        ConfigValue::Scalar(serde_json::Value::from(value))
    }
}

impl From<ValueExpr> for ConfigValue {
    fn from(value: ValueExpr) -> Self {
        ConfigValue::Expr(value)
    }
}

impl From<Vec<ConfigValue>> for ConfigValue {
    fn from(value: Vec<ConfigValue>) -> Self {
        ConfigValue::List(value)
    }
}
