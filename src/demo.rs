//! Demo data model: users, their profile, roles and the claims roles grant.
//!
//! Declares the navigations, creates and seeds the SQLite tables, and
//! assembles a dynamic schema whose navigation fields come from generated
//! resolvers. Seeding uses INSERT OR IGNORE so re-runs are idempotent.

use std::sync::Arc;

use async_graphql::dynamic::{Object, Schema, TypeRef};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::NavigationError;
use crate::navigation::{NavigationDeclaration, ResolverRegistration};
use crate::resolver::{GeneratedResolvers, NavigationBuilder, collection_field, record_field};
use crate::storage::{SqliteModel, SqliteRelation, SqliteStorage, StorageHandle};

/// Resolver group holding every demo type.
pub const GROUP: &str = "accounts";

/// Declare the demo navigations and root fields.
pub fn declare(builder: &mut NavigationBuilder) -> Result<&mut NavigationBuilder, NavigationError> {
    builder
        .navigation(NavigationDeclaration::one_to_many("User", "roles", "UserRole"))?
        .navigation(NavigationDeclaration::one_to_one("User", "profile", "UserProfile"))?
        .navigation(
            NavigationDeclaration::many_to_one("UserRole", "user", "User").reverse_table("roles"),
        )?
        .navigation(NavigationDeclaration::many_to_many(
            "UserRole",
            "claims",
            "UserClaim",
            "roles",
        ))?;

    Ok(builder
        .root_field("allUsers", "User")
        .root_field("allClaims", "UserClaim"))
}

/// Default registrations, one per navigated type.
pub fn registrations() -> Vec<ResolverRegistration> {
    ["User", "UserRole", "UserClaim"]
        .into_iter()
        .map(|target| ResolverRegistration::new(target, GROUP))
        .collect()
}

/// Storage models matching [create_tables].
pub fn storage(pool: SqlitePool) -> SqliteStorage {
    SqliteStorage::new(
        pool,
        [
            SqliteModel::new("user", "users")
                .columns(["name", "email"])
                .relation(
                    "roles",
                    SqliteRelation::HasMany {
                        model: "userRole".into(),
                        foreign_key: "user_id".into(),
                    },
                )
                .relation(
                    "profile",
                    SqliteRelation::HasOne {
                        model: "userProfile".into(),
                        foreign_key: "user_id".into(),
                    },
                ),
            SqliteModel::new("userProfile", "user_profiles")
                .columns(["bio", "user_id"])
                .relation(
                    "user",
                    SqliteRelation::BelongsTo {
                        model: "user".into(),
                        foreign_key: "user_id".into(),
                    },
                ),
            SqliteModel::new("userRole", "user_roles")
                .columns(["name", "user_id"])
                .relation(
                    "user",
                    SqliteRelation::BelongsTo {
                        model: "user".into(),
                        foreign_key: "user_id".into(),
                    },
                )
                .relation(
                    "claims",
                    SqliteRelation::ManyToMany {
                        model: "userClaim".into(),
                        junction: "user_role_claims".into(),
                        local_key: "role_id".into(),
                        foreign_key: "claim_id".into(),
                    },
                ),
            SqliteModel::new("userClaim", "user_claims")
                .columns(["name"])
                .relation(
                    "roles",
                    SqliteRelation::ManyToMany {
                        model: "userRole".into(),
                        junction: "user_role_claims".into(),
                        local_key: "claim_id".into(),
                        foreign_key: "role_id".into(),
                    },
                ),
        ],
    )
}

const TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT
    )",
    "CREATE TABLE IF NOT EXISTS user_profiles (
        id INTEGER PRIMARY KEY,
        bio TEXT NOT NULL,
        user_id INTEGER NOT NULL UNIQUE REFERENCES users(id)
    )",
    "CREATE TABLE IF NOT EXISTS user_roles (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        user_id INTEGER NOT NULL REFERENCES users(id)
    )",
    "CREATE TABLE IF NOT EXISTS user_claims (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS user_role_claims (
        role_id INTEGER NOT NULL REFERENCES user_roles(id),
        claim_id INTEGER NOT NULL REFERENCES user_claims(id),
        PRIMARY KEY (role_id, claim_id)
    )",
];

const SEED: &[&str] = &[
    "INSERT OR IGNORE INTO users (id, name, email) VALUES
        (1, 'Ada Lovelace', 'ada@example.com'),
        (2, 'Alan Turing', 'alan@example.com'),
        (3, 'Grace Hopper', NULL)",
    "INSERT OR IGNORE INTO user_profiles (id, bio, user_id) VALUES
        (1, 'Analyst', 1)",
    "INSERT OR IGNORE INTO user_roles (id, name, user_id) VALUES
        (1, 'admin', 1),
        (2, 'editor', 1),
        (3, 'viewer', 2)",
    "INSERT OR IGNORE INTO user_claims (id, name) VALUES
        (1, 'users:read'),
        (2, 'users:write'),
        (3, 'reports:read')",
    "INSERT OR IGNORE INTO user_role_claims (role_id, claim_id) VALUES
        (1, 1), (1, 2), (2, 1), (3, 3)",
];

pub async fn create_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in TABLES {
        sqlx::query(statement).execute(pool).await?;
    }
    debug!(tables = TABLES.len(), "Demo tables created");
    Ok(())
}

pub async fn seed(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let mut inserted = 0;
    for statement in SEED {
        inserted += sqlx::query(statement).execute(pool).await?.rows_affected();
    }
    info!(rows = inserted, "Demo data seeded");
    Ok(inserted)
}

fn with_navigations(generated: &GeneratedResolvers, object: Object) -> Object {
    match generated.get(object.type_name()) {
        Some(resolvers) => resolvers.extend(object),
        None => object,
    }
}

/// Generate the demo resolvers and assemble the schema around them.
pub fn build_schema(
    builder: &mut NavigationBuilder,
    storage: StorageHandle,
) -> anyhow::Result<Schema> {
    let generated = builder.generate(GROUP);

    let user = Object::new("User")
        .field(record_field("id", TypeRef::named_nn(TypeRef::INT)))
        .field(record_field("name", TypeRef::named_nn(TypeRef::STRING)))
        .field(record_field("email", TypeRef::named(TypeRef::STRING)));
    let profile = Object::new("UserProfile")
        .field(record_field("id", TypeRef::named_nn(TypeRef::INT)))
        .field(record_field("bio", TypeRef::named_nn(TypeRef::STRING)));
    let role = Object::new("UserRole")
        .field(record_field("id", TypeRef::named_nn(TypeRef::INT)))
        .field(record_field("name", TypeRef::named_nn(TypeRef::STRING)));
    let claim = Object::new("UserClaim")
        .field(record_field("id", TypeRef::named_nn(TypeRef::INT)))
        .field(record_field("name", TypeRef::named_nn(TypeRef::STRING)));

    let query = Object::new("Query")
        .field(collection_field("allUsers", "user", "User"))
        .field(collection_field("allClaims", "userClaim", "UserClaim"));

    let schema = Schema::build(query.type_name(), None, None)
        .register(with_navigations(&generated, user))
        .register(with_navigations(&generated, profile))
        .register(with_navigations(&generated, role))
        .register(with_navigations(&generated, claim))
        .register(query)
        .data(storage)
        .finish()?;

    info!(types = generated.len(), "Demo schema built");
    Ok(schema)
}

/// Declare, register and build in one go over `pool`.
pub fn default_schema(pool: SqlitePool) -> anyhow::Result<Schema> {
    let mut builder = NavigationBuilder::new();
    declare(&mut builder)?;
    for registration in registrations() {
        builder.resolver(registration);
    }
    let storage: StorageHandle = Arc::new(storage(pool));
    build_schema(&mut builder, storage)
}
