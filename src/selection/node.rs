//! Field selection trees as delivered by the GraphQL layer.
//!
//! The extractor works over anything implementing [SelectionNode]: the
//! runtime [SelectionField] from a resolver context, parser AST fields, or an
//! owned [RequestedField] captured up front.
//!
//! Every implementation expands fragment spreads and inline fragments into
//! the fields they select. The fragment entries themselves never show up.

use std::collections::HashMap;

use async_graphql::Name;
use async_graphql::context::SelectionField;
use async_graphql::parser::Positioned;
use async_graphql::parser::types::{
    ExecutableDocument, Field, FragmentDefinition, Selection, SelectionSet,
};

pub trait SelectionNode: Sized {
    fn field_name(&self) -> &str;

    /// Nested field selections, with fragments expanded in place.
    fn child_fields(&self) -> Vec<Self>;
}

impl<'a> SelectionNode for SelectionField<'a> {
    fn field_name(&self) -> &str {
        self.name()
    }

    fn child_fields(&self) -> Vec<Self> {
        self.selection_set().collect()
    }
}

type Fragments = HashMap<Name, Positioned<FragmentDefinition>>;

/// A field of a parsed document, able to expand the document's fragments.
#[derive(Debug, Clone, Copy)]
pub struct DocumentField<'a> {
    pub field: &'a Positioned<Field>,
    fragments: &'a Fragments,
}

impl<'a> SelectionNode for DocumentField<'a> {
    fn field_name(&self) -> &str {
        self.field.node.name.node.as_str()
    }

    fn child_fields(&self) -> Vec<Self> {
        let mut fields = Vec::new();
        collect_fields(
            &self.field.node.selection_set.node,
            self.fragments,
            &mut Vec::new(),
            &mut fields,
        );
        fields
    }
}

/// Flatten `set` into its fields. Spreads already being expanded are
/// skipped so a cyclic document terminates.
fn collect_fields<'a>(
    set: &'a SelectionSet,
    fragments: &'a Fragments,
    expanding: &mut Vec<&'a Name>,
    fields: &mut Vec<DocumentField<'a>>,
) {
    for selection in &set.items {
        match &selection.node {
            Selection::Field(field) => fields.push(DocumentField { field, fragments }),
            Selection::InlineFragment(fragment) => {
                collect_fields(&fragment.node.selection_set.node, fragments, expanding, fields);
            }
            Selection::FragmentSpread(spread) => {
                let name = &spread.node.fragment_name.node;
                if expanding.contains(&name) {
                    continue;
                }
                let Some(definition) = fragments.get(name) else {
                    continue;
                };
                expanding.push(name);
                collect_fields(&definition.node.selection_set.node, fragments, expanding, fields);
                expanding.pop();
            }
        }
    }
}

/// Owned copy of a selection tree.
///
/// Resolvers capture one before awaiting anything so no borrow of the
/// request outlives the first suspension point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedField {
    pub name: String,
    pub children: Vec<RequestedField>,
}

impl RequestedField {
    pub fn new(name: impl Into<String>, children: Vec<RequestedField>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    pub fn leaf(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn capture<N: SelectionNode>(node: &N) -> Self {
        Self {
            name: node.field_name().to_string(),
            children: node.child_fields().iter().map(Self::capture).collect(),
        }
    }
}

impl<'a> SelectionNode for &'a RequestedField {
    fn field_name(&self) -> &str {
        &self.name
    }

    fn child_fields(&self) -> Vec<Self> {
        let field: &'a RequestedField = self;
        field.children.iter().collect()
    }
}

/// Top-level field selections of the first operation in a parsed document.
pub fn operation_fields(document: &ExecutableDocument) -> Vec<DocumentField<'_>> {
    let Some((_, operation)) = document.operations.iter().next() else {
        return Vec::new();
    };
    let mut fields = Vec::new();
    collect_fields(
        &operation.node.selection_set.node,
        &document.fragments,
        &mut Vec::new(),
        &mut fields,
    );
    fields
}
