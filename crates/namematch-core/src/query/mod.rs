//! Name resolution: query construction, the staged match pipeline,
//! classification fallback, homonym arbitration and auxiliary lookups.

pub mod builder;
pub mod executor;
pub mod fallback;
pub mod guards;
pub mod homonym;
pub mod lookup;
pub mod pipeline;
