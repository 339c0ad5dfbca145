//! Database migrations.
//!
//! Schema migrations for the social layer tables.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250601_000001_create_user_table;
mod m20250601_000002_create_follow_edge_table;
mod m20250601_000003_create_workout_session_table;
mod m20250601_000004_create_cardio_session_table;
mod m20250601_000005_create_reaction_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_user_table::Migration),
            Box::new(m20250601_000002_create_follow_edge_table::Migration),
            Box::new(m20250601_000003_create_workout_session_table::Migration),
            Box::new(m20250601_000004_create_cardio_session_table::Migration),
            Box::new(m20250601_000005_create_reaction_table::Migration),
        ]
    }
}
