/// Upper bound on the estimated token count of a single chunk.
pub const DEFAULT_TOKEN_LIMIT: usize = 3_000;

/// A contiguous slice of a file's diff rendering, sized for one model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub file: String,
    pub content: String,
    pub approx_tokens: usize,
}

/// Rough ~4-chars-per-token heuristic, never below one token.
pub fn estimate_tokens(text: &str) -> usize {
    tokens_for_len(text.len())
}

fn tokens_for_len(len: usize) -> usize {
    ((len + 3) / 4).max(1)
}

/// Splits `content` into chunks whose estimated token count stays within
/// `token_limit`.
///
/// Splits happen on line boundaries only, so concatenating the chunks in
/// order reproduces `content` exactly. A single line that alone exceeds the
/// limit is kept whole in its own chunk.
pub fn split(file: &str, content: &str, token_limit: usize) -> Vec<Chunk> {
    let limit = token_limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in content.split_inclusive('\n') {
        if !current.is_empty() && tokens_for_len(current.len() + line.len()) > limit {
            push_chunk(&mut chunks, file, std::mem::take(&mut current));
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        push_chunk(&mut chunks, file, current);
    }

    chunks
}

fn push_chunk(chunks: &mut Vec<Chunk>, file: &str, content: String) {
    let approx_tokens = estimate_tokens(&content);
    chunks.push(Chunk {
        file: file.to_string(),
        content,
        approx_tokens,
    });
}
