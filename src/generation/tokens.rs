//! Token-bounded text chunking.

use crate::error::{Result, TldwError};
use tiktoken_rs::CoreBPE;

/// A contiguous run of tokens and the text it decodes to.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenChunk {
    pub tokens: Vec<usize>,
    pub text: String,
}

/// A sentence-aligned piece of text and the whitespace that followed it.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPiece {
    pub text: String,
    pub separator: String,
}

impl TextPiece {
    fn from_buffer(buffer: &str) -> Self {
        let text = buffer.trim_end();
        Self {
            text: text.to_string(),
            separator: buffer[text.len()..].to_string(),
        }
    }
}

/// Reference tokenizer used to size generation requests.
pub struct Tokenizer {
    bpe: CoreBPE,
}

impl Tokenizer {
    /// Load the cl100k_base encoding.
    pub fn cl100k() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| TldwError::Config(format!("Failed to load tokenizer: {}", e)))?;
        Ok(Self { bpe })
    }

    pub fn encode(&self, text: &str) -> Vec<usize> {
        self.bpe.encode_with_special_tokens(text)
    }

    /// Split `text` into chunks of at most `max_tokens` tokens.
    ///
    /// Boundaries fall on token boundaries. A boundary that would cut a
    /// multi-byte character in half is moved back until the chunk decodes,
    /// so concatenating the chunks' tokens always yields `encode(text)`.
    pub fn chunk(&self, text: &str, max_tokens: usize) -> Result<Vec<TokenChunk>> {
        let max_tokens = max_tokens.max(1);
        let tokens = self.encode(text);
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < tokens.len() {
            let hard_end = (start + max_tokens).min(tokens.len());
            let mut end = hard_end;

            let decoded = loop {
                match self.bpe.decode(tokens[start..end].to_vec()) {
                    Ok(text) => break Some(text),
                    Err(_) if end > start + 1 => end -= 1,
                    Err(_) => break None,
                }
            };

            let (end, text) = match decoded {
                Some(text) => (end, text),
                // A single token that does not decode alone; take the full window lossily
                None => {
                    let text = self.decode_lossy(&tokens[start..hard_end]);
                    (hard_end, text)
                }
            };

            chunks.push(TokenChunk {
                tokens: tokens[start..end].to_vec(),
                text,
            });
            start = end;
        }

        Ok(chunks)
    }

    /// Pack whole sentences into pieces of at most `max_tokens` tokens.
    ///
    /// Only a sentence longer than the limit is cut at token boundaries; its
    /// parts carry an empty separator. Concatenating every piece's text and
    /// separator yields `text`.
    pub fn pack_sentences(&self, text: &str, max_tokens: usize) -> Result<Vec<TextPiece>> {
        let max_tokens = max_tokens.max(1);
        let mut pieces = Vec::new();
        let mut buffer = String::new();
        let mut buffer_tokens = 0;

        for sentence in split_sentences(text) {
            let tokens = self.encode(sentence).len();

            if tokens > max_tokens {
                if !buffer.is_empty() {
                    pieces.push(TextPiece::from_buffer(&std::mem::take(&mut buffer)));
                    buffer_tokens = 0;
                }

                let body = sentence.trim_end();
                let mut parts = self.chunk(body, max_tokens)?;
                let last = parts.pop();
                pieces.extend(parts.into_iter().map(|part| TextPiece {
                    text: part.text,
                    separator: String::new(),
                }));
                if let Some(last) = last {
                    pieces.push(TextPiece {
                        text: last.text,
                        separator: sentence[body.len()..].to_string(),
                    });
                }
                continue;
            }

            if buffer_tokens + tokens > max_tokens && !buffer.is_empty() {
                pieces.push(TextPiece::from_buffer(&std::mem::take(&mut buffer)));
                buffer_tokens = 0;
            }
            buffer.push_str(sentence);
            buffer_tokens += tokens;
        }

        if !buffer.is_empty() {
            pieces.push(TextPiece::from_buffer(&buffer));
        }

        Ok(pieces)
    }

    fn decode_lossy(&self, tokens: &[usize]) -> String {
        let bytes: Vec<u8> = tokens
            .iter()
            .filter_map(|t| self.bpe.decode(vec![*t]).ok())
            .flat_map(|s| s.into_bytes())
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '…' | '。' | '！' | '？' | '\n')
}

fn is_closing(c: char) -> bool {
    (is_terminator(c) && c != '\n') || matches!(c, '"' | '\'' | ')' | ']' | '»' | '”' | '’')
}

/// Split `text` after sentence terminators, keeping each sentence's
/// trailing whitespace with it. `3.14` and `e.g.x` are not boundaries.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !is_terminator(c) {
            continue;
        }

        let mut end = i + c.len_utf8();
        while let Some(&(j, next)) = chars.peek() {
            if !is_closing(next) {
                break;
            }
            end = j + next.len_utf8();
            chars.next();
        }

        let full_width = matches!(c, '。' | '！' | '？' | '\n');
        match chars.peek() {
            Some(&(_, next)) if !next.is_whitespace() && !full_width => continue,
            _ => {}
        }

        while let Some(&(j, next)) = chars.peek() {
            if !next.is_whitespace() {
                break;
            }
            end = j + next.len_utf8();
            chars.next();
        }

        sentences.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text() -> String {
        "The quick brown fox jumps over the lazy dog. ".repeat(40)
            + "Ünïcödé tèxt with émojis 🎬🎧 and 日本語の文章 to cross byte boundaries. "
            + &"More filler sentences follow here. ".repeat(20)
    }

    #[test]
    fn test_chunks_respect_limit() {
        let tokenizer = Tokenizer::cl100k().unwrap();
        let chunks = tokenizer.chunk(&sample_text(), 17).unwrap();
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| !c.tokens.is_empty() && c.tokens.len() <= 17));
    }

    #[test]
    fn test_chunk_tokens_reconstruct_encoding() {
        let tokenizer = Tokenizer::cl100k().unwrap();
        let text = sample_text();

        for max in [1, 3, 7, 64, 10_000] {
            let chunks = tokenizer.chunk(&text, max).unwrap();
            let joined: Vec<usize> = chunks.iter().flat_map(|c| c.tokens.clone()).collect();
            assert_eq!(joined, tokenizer.encode(&text), "max_tokens = {}", max);
        }
    }

    #[test]
    fn test_chunk_texts_concatenate_to_input() {
        let tokenizer = Tokenizer::cl100k().unwrap();
        let text = sample_text();
        let chunks = tokenizer.chunk(&text, 5).unwrap();
        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(joined, text);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        let tokenizer = Tokenizer::cl100k().unwrap();
        assert!(tokenizer.chunk("", 100).unwrap().is_empty());
    }

    fn german_text() -> String {
        "Der Bericht über die Bundesverfassungsgerichtsentscheidung wurde gestern veröffentlicht. "
            .repeat(300)
    }

    fn rejoin(pieces: &[TextPiece]) -> String {
        pieces
            .iter()
            .flat_map(|p| [p.text.as_str(), p.separator.as_str()])
            .collect()
    }

    #[test]
    fn test_split_sentences() {
        assert_eq!(
            split_sentences("Pi is 3.14 today. Really?! \"Yes.\" Next\n\nPara"),
            vec!["Pi is 3.14 today. ", "Really?! ", "\"Yes.\" ", "Next\n\n", "Para"]
        );
        assert_eq!(split_sentences("日本語です。次の文。"), vec!["日本語です。", "次の文。"]);
        assert!(split_sentences("").is_empty());
    }

    #[test]
    fn test_pack_keeps_sentences_whole() {
        let tokenizer = Tokenizer::cl100k().unwrap();
        let text = german_text();
        let pieces = tokenizer.pack_sentences(&text, 100).unwrap();

        assert!(pieces.len() > 1);
        for piece in &pieces {
            assert!(piece.text.ends_with("veröffentlicht."), "{}", piece.text);
            assert_eq!(piece.separator, " ");
            assert!(tokenizer.encode(&piece.text).len() <= 100);
        }
        assert_eq!(rejoin(&pieces), text);
    }

    #[test]
    fn test_pack_cuts_only_oversize_sentences() {
        let tokenizer = Tokenizer::cl100k().unwrap();
        let long = "word ".repeat(200).trim_end().to_string() + ".";
        let text = format!("Short one.\n\n{} Tail.", long);
        let pieces = tokenizer.pack_sentences(&text, 50).unwrap();

        assert_eq!(pieces[0].text, "Short one.");
        assert_eq!(pieces[0].separator, "\n\n");
        assert_eq!(pieces.last().unwrap().text, "Tail.");
        let cut: Vec<_> = pieces[1..pieces.len() - 1].iter().collect();
        assert!(cut.len() > 1);
        assert!(cut[..cut.len() - 1].iter().all(|p| p.separator.is_empty()));
        assert!(cut.iter().all(|p| tokenizer.encode(&p.text).len() <= 50));
        assert_eq!(rejoin(&pieces), text);
    }

    #[test]
    fn test_pack_empty_text() {
        let tokenizer = Tokenizer::cl100k().unwrap();
        assert!(tokenizer.pack_sentences("", 10).unwrap().is_empty());
    }
}
