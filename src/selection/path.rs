//! Resolve path extraction and segment resolution.

use async_graphql::{QueryPathNode, QueryPathSegment};

use crate::navigation::{NavigationLink, SchemaIndex};

use super::rename::FieldRename;

/// Walk a resolve path and return its named segments, root first.
///
/// List indexes are skipped. Each name goes through `rename`, which sees the
/// already extracted ancestors.
pub fn extract_path(node: &QueryPathNode<'_>, rename: &FieldRename) -> Vec<String> {
    let mut segments = match node.parent {
        Some(parent) => extract_path(parent, rename),
        None => Vec::new(),
    };

    if let QueryPathSegment::Name(name) = &node.segment {
        let canonical = rename.apply(&segments, name);
        segments.push(canonical);
    }

    segments
}

/// A path segment annotated with what it navigates to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPathSegment {
    /// Property name as written in the query.
    pub property: String,
    /// Storage model the segment yields, after any registered override.
    pub table_name: Option<String>,
    /// Type the segment yields.
    pub model: Option<String>,
    /// Registered links matching the segment.
    pub links: Vec<NavigationLink>,
}

impl SelectionPathSegment {
    pub fn is_resolved(&self) -> bool {
        self.model.is_some()
    }
}

/// Resolve path keys against the schema index.
///
/// The first returned segment is the operation root. The root field takes its
/// type from the root-field registrations; later segments inherit the target
/// of the first link matching their property, restricted to links leaving
/// the previous segment's type when that is known.
pub fn resolve_segments(
    keys: &[String],
    schema: &SchemaIndex,
    root_type: &str,
) -> Vec<SelectionPathSegment> {
    let mut segments = Vec::with_capacity(keys.len() + 1);
    segments.push(SelectionPathSegment {
        property: root_type.to_string(),
        table_name: None,
        model: Some(root_type.to_string()),
        links: Vec::new(),
    });

    for (position, key) in keys.iter().enumerate() {
        if position == 0 {
            let model = schema.root_field_type(key);
            segments.push(SelectionPathSegment {
                property: key.clone(),
                table_name: model.as_deref().map(|model| {
                    schema
                        .table_name_of(model)
                        .unwrap_or_else(|| crate::naming::lower_camel(model))
                }),
                model,
                links: Vec::new(),
            });
            continue;
        }

        let previous = segments.last().and_then(|segment| segment.model.clone());
        let links = schema.links_by_property(key, previous.as_deref());
        let first = links.first();
        segments.push(SelectionPathSegment {
            property: key.clone(),
            table_name: first.map(|link| {
                schema
                    .table_name_of(&link.target)
                    .unwrap_or_else(|| link.target_table.clone())
            }),
            model: first.map(|link| link.target.clone()),
            links,
        });
    }

    segments
}

/// Dotted rendering of path keys for error messages.
pub fn display_path(keys: &[String]) -> String {
    keys.join(".")
}
