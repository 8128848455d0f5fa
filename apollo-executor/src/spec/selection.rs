use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

use crate::json_ext::Value;

/// A node of an operation's selection tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Selection {
    // Spec: https://spec.graphql.org/draft/#Field
    Field(Field),
    // Spec: https://spec.graphql.org/draft/#InlineFragment
    InlineFragment(InlineFragment),
}

impl From<Field> for Selection {
    fn from(field: Field) -> Self {
        Selection::Field(field)
    }
}

impl From<InlineFragment> for Selection {
    fn from(fragment: InlineFragment) -> Self {
        Selection::InlineFragment(fragment)
    }
}

impl Selection {
    /// Nesting depth of this selection, a leaf field being at depth 1.
    pub(crate) fn depth(&self) -> usize {
        match self {
            Selection::Field(field) => 1 + selection_set_depth(&field.selection_set),
            // fragments do not add a level to the response
            Selection::InlineFragment(fragment) => selection_set_depth(&fragment.selection_set),
        }
    }
}

pub(crate) fn selection_set_depth(selection_set: &[Selection]) -> usize {
    selection_set
        .iter()
        .map(Selection::depth)
        .max()
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub alias: Option<String>,

    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub arguments: IndexMap<String, InputValue>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub selection_set: Vec<Selection>,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            arguments: IndexMap::new(),
            selection_set: Vec::new(),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn argument(mut self, name: impl Into<String>, value: impl Into<InputValue>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    pub fn select(mut self, selection: impl Into<Selection>) -> Self {
        self.selection_set.push(selection.into());
        self
    }

    /// The key of this field in the response object.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineFragment {
    /// Applies to every type when absent.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub type_condition: Option<String>,

    #[serde(default)]
    pub selection_set: Vec<Selection>,
}

impl InlineFragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(type_condition: impl Into<String>) -> Self {
        Self {
            type_condition: Some(type_condition.into()),
            selection_set: Vec::new(),
        }
    }

    pub fn select(mut self, selection: impl Into<Selection>) -> Self {
        self.selection_set.push(selection.into());
        self
    }
}

/// An argument value as written in the operation.
///
/// Variables can appear anywhere a value can, including inside lists and input objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputValue {
    Variable(String),
    Value(Value),
    List(Vec<InputValue>),
    Object(IndexMap<String, InputValue>),
}

impl InputValue {
    pub fn variable(name: impl Into<String>) -> Self {
        InputValue::Variable(name.into())
    }

    pub fn value(value: impl Into<Value>) -> Self {
        InputValue::Value(value.into())
    }
}

impl From<Value> for InputValue {
    fn from(value: Value) -> Self {
        InputValue::Value(value)
    }
}
