pub mod criteria;
pub mod errors;
pub mod extract;
pub mod include;
pub mod metadata;
pub mod models;
pub mod operators;
pub mod pagination;
pub mod plan;
pub mod query;

pub use criteria::{CompilerConfig, Operation, compile, compile_with_defaults, configure};
pub use errors::CompileError;
pub use extract::ListQuery;
pub use metadata::{ModelDescriptor, ModelRegistry, RelationDef};
pub use models::Filters;
pub use pagination::normalize;
pub use plan::{Criterion, QueryPlan};
pub use query::{QueryAccessor, QueryMap};
