mod embedding;
mod fragment_match;
mod generated_sql;
mod prompt_template;
mod schema_fragment;
mod schema_record;
mod structured_schema;

pub use embedding::*;
pub use fragment_match::*;
pub use generated_sql::*;
pub use prompt_template::*;
pub use schema_fragment::*;
pub use schema_record::*;
pub use structured_schema::*;
