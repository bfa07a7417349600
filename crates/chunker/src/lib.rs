pub mod model;
pub mod parser;
pub mod render;
pub mod split;

pub use model::{FileDiff, Hunk, Line, LineKind};
pub use parser::parse;
pub use split::{estimate_tokens, split, Chunk, DEFAULT_TOKEN_LIMIT};
