pub mod embedding_client;
pub mod fences;
pub mod model_client;

pub use embedding_client::{pack_vector, unpack_vector, Embedding, EmbeddingClient, HttpEmbeddingClient};
pub use model_client::{GenerateResponse, HttpModelClient, ModelClient};
