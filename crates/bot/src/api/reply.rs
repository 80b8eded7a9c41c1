//! Splitting replies to fit Discord's message size limit.

/// Discord's maximum message length, in characters.
pub const MESSAGE_LIMIT: usize = 2000;

/// Split `text` into messages of at most `limit` characters.
///
/// Breaks on line boundaries and keeps blank lines; a single line longer
/// than the limit is cut at character boundaries. A chunk made only of
/// whitespace is dropped, since Discord refuses to send it.
pub fn chunk(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    // Text and character count of the chunk being built.
    let mut current: Option<(String, usize)> = None;

    for line in text.lines() {
        let line_len = line.chars().count();
        if let Some((_, len)) = &current {
            if len + 1 + line_len > limit {
                flush(&mut chunks, current.take());
            }
        }

        if line_len > limit {
            let chars: Vec<char> = line.chars().collect();
            chunks.extend(chars.chunks(limit).map(|piece| piece.iter().collect::<String>()));
            continue;
        }

        match &mut current {
            Some((text, len)) => {
                text.push('\n');
                text.push_str(line);
                *len += 1 + line_len;
            }
            None => current = Some((line.to_string(), line_len)),
        }
    }

    flush(&mut chunks, current);
    chunks
}

fn flush(chunks: &mut Vec<String>, current: Option<(String, usize)>) {
    if let Some((text, _)) = current {
        if !text.trim().is_empty() {
            chunks.push(text);
        }
    }
}
