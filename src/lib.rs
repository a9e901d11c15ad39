//! Client for the D&D Master Interface retrieval-augmented backend.
//!
//! A session starts unconfigured; [`setup::SetupCoordinator`] binds it to
//! chat/embedding models and a content source, after which the
//! [`query::QueryClient`] and [`generate::GenerationClient`] become usable.

pub mod config;
pub mod error;
pub mod gate;
pub mod generate;
pub mod markup;
pub mod models;
pub mod normalize;
pub mod query;
pub mod setup;
pub mod shell;
pub mod tracker;
pub mod transport;
pub mod visual;

pub use error::{ClientError, Result};
pub use gate::{SessionGate, SessionState, View};
pub use generate::GenerationClient;
pub use models::{Category, GenerationRequest, QueryRequest, QueryResponse, SessionConfig};
pub use normalize::{DisplayBlock, GenerationResult};
pub use query::QueryClient;
pub use setup::SetupCoordinator;
pub use tracker::Completion;
pub use transport::{HttpTransport, Reply, Transport};
