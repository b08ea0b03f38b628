//! Typed form descriptions.
//!
//! A form is a tree of [`ViewElement`]s plus a map of field metadata. The
//! tree is independent of any markup syntax and travels as JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One node of a form layout tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewElement {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ViewElement>,
}

impl ViewElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attrs.insert(key.into(), value.to_string());
        self
    }

    pub fn child(mut self, child: ViewElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn get_attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Parent of the first descendant tagged `tag`, in depth-first order.
    pub fn parent_of_first(&self, tag: &str) -> Option<&ViewElement> {
        if self.children.iter().any(|c| c.tag == tag) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.parent_of_first(tag))
    }

    /// Mutable variant of [`ViewElement::parent_of_first`].
    pub fn parent_of_first_mut(&mut self, tag: &str) -> Option<&mut ViewElement> {
        if self.children.iter().any(|c| c.tag == tag) {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|c| c.parent_of_first_mut(tag))
    }

    pub fn append_children(&mut self, children: impl IntoIterator<Item = ViewElement>) {
        self.children.extend(children);
    }

    /// All `field` elements' `name` attributes, depth-first.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_field_names(&mut names);
        names
    }

    fn collect_field_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        if self.tag == "field" {
            if let Some(name) = self.get_attr("name") {
                out.push(name);
            }
        }
        for child in &self.children {
            child.collect_field_names(out);
        }
    }
}

/// Field widget type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Char,
    Integer,
    Many2one,
    One2many,
}

/// A domain clause, serialized as `[field, operator, value]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainClause(pub String, pub String, pub JsonValue);

impl DomainClause {
    pub fn new(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<JsonValue>,
    ) -> Self {
        Self(field.into(), operator.into(), value.into())
    }
}

/// Metadata of one form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub name: String,
    pub string: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain: Vec<DomainClause>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, JsonValue>,
    /// Reverse field for `one2many`; `None` makes the field a free list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl FieldSpec {
    pub fn many2one(
        name: impl Into<String>,
        string: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        Self {
            kind: FieldKind::Many2one,
            name: name.into(),
            string: string.into(),
            relation: Some(relation.into()),
            required: false,
            domain: Vec::new(),
            context: BTreeMap::new(),
            field: None,
        }
    }

    pub fn one2many(
        name: impl Into<String>,
        string: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        Self {
            kind: FieldKind::One2many,
            ..Self::many2one(name, string, relation)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_domain(mut self, clause: DomainClause) -> Self {
        self.domain.push(clause);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// A form layout and the metadata of the fields it shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormView {
    pub tree: ViewElement,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSpec>,
}

impl FormView {
    pub fn new(tree: ViewElement) -> Self {
        Self {
            tree,
            fields: BTreeMap::new(),
        }
    }
}
