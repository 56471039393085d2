pub mod aggregate;
pub mod classifier;
pub mod memory_store;
pub mod pipeline;
pub mod resolver;
pub mod sparql;
pub mod writer;

pub use aggregate::*;
pub use classifier::*;
pub use memory_store::*;
pub use pipeline::*;
pub use resolver::*;
pub use sparql::SparqlStore;
pub use writer::*;
