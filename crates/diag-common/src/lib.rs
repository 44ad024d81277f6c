pub mod embedding;
pub mod error;
pub mod openai;
