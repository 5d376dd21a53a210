pub mod connection;
pub mod schema;
pub mod seed;
pub mod session;

use crate::application::use_cases::sql_compiler::CompiledQuery;
use crate::domain::error::Result;
use crate::domain::estimate::{Estimate, GeneralConstruction};
use async_trait::async_trait;

pub use connection::init_pool;
pub use session::DbSession;

/// Read-only query executor over the reference tables.
#[async_trait]
pub trait EstimateStore: Send {
    async fn fetch_estimates(&mut self, query: &CompiledQuery) -> Result<Vec<Estimate>>;
    async fn fetch_text_column(&mut self, query: &CompiledQuery) -> Result<Vec<String>>;
    async fn fetch_integer_column(&mut self, query: &CompiledQuery) -> Result<Vec<i64>>;
    /// Rows of `(group, max)` pairs produced by a `MaxPerGroup` projection.
    async fn fetch_group_maxima(&mut self, query: &CompiledQuery) -> Result<Vec<(String, i64)>>;
    async fn fetch_decisions(&mut self) -> Result<Vec<GeneralConstruction>>;
}
