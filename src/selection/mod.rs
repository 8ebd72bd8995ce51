//! Selection and path extraction from GraphQL resolve info.

mod node;
mod path;
mod rename;
mod select;

pub use node::{DocumentField, RequestedField, SelectionNode, operation_fields};
pub use path::{SelectionPathSegment, display_path, extract_path, resolve_segments};
pub use rename::FieldRename;
pub use select::{NestedSelection, SelectNode, SelectTree, SelectionExtractor, extract_selection};
