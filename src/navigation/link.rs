//! Navigation links between model types

use serde::{Deserialize, Serialize};

use crate::error::NavigationError;
use crate::naming::{lower_camel, plural_camel};

/// How many target records relate to one source record, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    /// 1:1
    OneToOne,
    /// 1:*
    OneToMany,
    /// *:1
    ManyToOne,
    /// *:*
    ManyToMany,
}

impl Cardinality {
    /// Whether the source side sees a list of targets.
    pub fn is_list(&self) -> bool {
        matches!(self, Cardinality::OneToMany | Cardinality::ManyToMany)
    }

    /// Whether the target side sees a list of sources.
    pub fn reverse_is_list(&self) -> bool {
        matches!(self, Cardinality::ManyToOne | Cardinality::ManyToMany)
    }
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Cardinality::OneToOne => "1:1",
            Cardinality::OneToMany => "1:*",
            Cardinality::ManyToOne => "*:1",
            Cardinality::ManyToMany => "*:*",
        };
        write!(f, "{}", tag)
    }
}

/// A registered relationship from one model's property to another model.
///
/// Table names are storage-side names: `source_table` and `target_table` name
/// the models, `source_relation` is the relation on the source model backing
/// `source_property`, and `reverse_table` is the relation on the target model
/// pointing back at the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationLink {
    pub source: String,
    pub target: String,
    pub source_table: String,
    pub target_table: String,
    pub reverse_table: String,
    pub source_property: String,
    pub target_property: Option<String>,
    pub source_relation: String,
    pub cardinality: Cardinality,
    /// Cardinality as declared. Differs from `cardinality` for the two halves
    /// of a many-to-many declaration.
    pub declared: Cardinality,
}

impl NavigationLink {
    /// Whether resolving this link yields a list.
    pub fn is_list(&self) -> bool {
        self.cardinality.is_list()
    }

    /// Whether the relation on the target pointing back is a list.
    pub fn reverse_is_list(&self) -> bool {
        self.declared.reverse_is_list()
    }

    /// The complementary link, seen from the target side.
    pub fn mirrored(&self) -> Option<NavigationLink> {
        let target_property = self.target_property.clone()?;
        Some(NavigationLink {
            source: self.target.clone(),
            target: self.source.clone(),
            source_table: self.target_table.clone(),
            target_table: self.source_table.clone(),
            reverse_table: self.source_relation.clone(),
            source_property: target_property,
            target_property: Some(self.source_property.clone()),
            source_relation: self.reverse_table.clone(),
            cardinality: self.cardinality,
            declared: self.declared,
        })
    }
}

/// Builder for a navigation declaration.
///
/// ```
/// use graphql_navigation::navigation::NavigationDeclaration;
///
/// let decl = NavigationDeclaration::one_to_many("User", "roles", "UserRole")
///     .target_property("user");
/// let links = decl.into_links().unwrap();
/// assert_eq!(links[0].target_table, "userRole");
/// assert_eq!(links[0].reverse_table, "user");
/// ```
#[derive(Debug, Clone)]
pub struct NavigationDeclaration {
    source: String,
    target: String,
    source_property: String,
    cardinality: Cardinality,
    target_property: Option<String>,
    source_table: Option<String>,
    target_table: Option<String>,
    reverse_table: Option<String>,
    source_relation: Option<String>,
}

impl NavigationDeclaration {
    pub fn new(
        source: impl Into<String>,
        source_property: impl Into<String>,
        target: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            source_property: source_property.into(),
            cardinality,
            target_property: None,
            source_table: None,
            target_table: None,
            reverse_table: None,
            source_relation: None,
        }
    }

    pub fn one_to_one(
        source: impl Into<String>,
        property: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::new(source, property, target, Cardinality::OneToOne)
    }

    pub fn one_to_many(
        source: impl Into<String>,
        property: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::new(source, property, target, Cardinality::OneToMany)
    }

    pub fn many_to_one(
        source: impl Into<String>,
        property: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::new(source, property, target, Cardinality::ManyToOne)
    }

    pub fn many_to_many(
        source: impl Into<String>,
        property: impl Into<String>,
        target: impl Into<String>,
        target_property: impl Into<String>,
    ) -> Self {
        Self::new(source, property, target, Cardinality::ManyToMany)
            .target_property(target_property)
    }

    /// Property on the target type pointing back at the source.
    pub fn target_property(mut self, property: impl Into<String>) -> Self {
        self.target_property = Some(property.into());
        self
    }

    pub fn source_table(mut self, table: impl Into<String>) -> Self {
        self.source_table = Some(table.into());
        self
    }

    pub fn target_table(mut self, table: impl Into<String>) -> Self {
        self.target_table = Some(table.into());
        self
    }

    pub fn reverse_table(mut self, table: impl Into<String>) -> Self {
        self.reverse_table = Some(table.into());
        self
    }

    /// Storage relation backing the source property, when it differs from
    /// the property name.
    pub fn source_relation(mut self, relation: impl Into<String>) -> Self {
        self.source_relation = Some(relation.into());
        self
    }

    /// Expand the declaration into registry links, filling defaults.
    ///
    /// Many-to-many declarations yield two complementary one-to-many links.
    pub fn into_links(self) -> Result<Vec<NavigationLink>, NavigationError> {
        let source_table = self.source_table.unwrap_or_else(|| lower_camel(&self.source));
        let target_table = self.target_table.unwrap_or_else(|| lower_camel(&self.target));
        let source_relation = self
            .source_relation
            .unwrap_or_else(|| self.source_property.clone());

        if self.cardinality != Cardinality::ManyToMany {
            let reverse_table = self.reverse_table.unwrap_or_else(|| match self.cardinality {
                Cardinality::ManyToOne => plural_camel(&self.source),
                _ => source_table.clone(),
            });
            return Ok(vec![NavigationLink {
                source: self.source,
                target: self.target,
                source_table,
                target_table,
                reverse_table,
                source_property: self.source_property,
                target_property: self.target_property,
                source_relation,
                cardinality: self.cardinality,
                declared: self.cardinality,
            }]);
        }

        let Some(target_property) = self.target_property else {
            return Err(NavigationError::MissingReverseProperty {
                model: self.source,
                property: self.source_property,
            });
        };

        let forward = NavigationLink {
            reverse_table: self
                .reverse_table
                .unwrap_or_else(|| target_property.clone()),
            source: self.source,
            target: self.target,
            source_table,
            target_table,
            source_property: self.source_property,
            target_property: Some(target_property),
            source_relation,
            cardinality: Cardinality::OneToMany,
            declared: Cardinality::ManyToMany,
        };
        let Some(reverse) = forward.mirrored() else {
            return Err(NavigationError::MissingReverseProperty {
                model: forward.source,
                property: forward.source_property,
            });
        };

        Ok(vec![forward, reverse])
    }
}
