mod delete_schema;
mod generate_sql;
mod ingest_schema;
mod list_schemas;
mod retrieve_fragments;
mod schema_locks;

pub use delete_schema::*;
pub use generate_sql::*;
pub use ingest_schema::*;
pub use list_schemas::*;
pub use retrieve_fragments::*;
pub use schema_locks::*;
