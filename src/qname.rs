//! Qualified names and prefix resolution
//!
//! Both the source document and the target documents use prefixed tags.
//! Internally every name is kept in expanded form (namespace URI plus local
//! part), printed as `{uri}local`. A [`NamespaceTable`] turns a
//! `prefix:local` token into that form.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::fmt;

/// An expanded XML name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// Namespace URI, `None` for names in no namespace
    pub namespace: Option<String>,
    /// Local part of the name
    pub local: String,
}

impl QName {
    /// Create a name bound to a namespace
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local: local.into(),
        }
    }

    /// Create a name in no namespace (plain attributes such as `uom`)
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
        }
    }

    /// Check namespace and local part against the given values
    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.local == local && self.namespace.as_deref() == Some(namespace)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(uri) => write!(f, "{{{}}}{}", uri, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Ordered mapping from prefix to namespace URI
///
/// Insertion order is kept so that namespace declarations are written in a
/// stable order.
#[derive(Debug, Clone, Default)]
pub struct NamespaceTable {
    prefixes: IndexMap<String, String>,
}

impl NamespaceTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a prefix; the first URI registered for a prefix wins
    pub fn with_prefix(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.prefixes.entry(prefix.into()).or_insert_with(|| uri.into());
        self
    }

    /// Resolve a `prefix:local` token
    ///
    /// The token is split on its last colon. A token without a colon is
    /// looked up under the empty prefix.
    ///
    /// # Examples
    ///
    /// ```
    /// use citiengov_gml::qname::NamespaceTable;
    ///
    /// let table = NamespaceTable::new().with_prefix("gml", "http://www.opengis.net/gml");
    /// let name = table.resolve("gml:Polygon").unwrap();
    /// assert_eq!(name.to_string(), "{http://www.opengis.net/gml}Polygon");
    /// assert!(table.resolve("bldg:Building").is_err());
    /// ```
    pub fn resolve(&self, token: &str) -> Result<QName> {
        let (prefix, local) = token.rsplit_once(':').unwrap_or(("", token));
        match self.prefixes.get(prefix) {
            Some(uri) => Ok(QName::new(uri.as_str(), local)),
            None => Err(Error::UnknownPrefix {
                prefix: prefix.to_string(),
                token: token.to_string(),
            }),
        }
    }

    /// Resolve a `/`-separated path of tokens
    pub fn resolve_path(&self, path: &str) -> Result<Vec<QName>> {
        path.split('/').map(|step| self.resolve(step)).collect()
    }

    /// Find the prefix registered for a namespace URI
    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|(_, u)| u.as_str() == uri)
            .map(|(p, _)| p.as_str())
    }

    /// Iterate over `(prefix, uri)` pairs in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }
}
