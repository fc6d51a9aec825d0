//! Tagged text reading
//!
//! Reads whitespace-separated `word/TAG` tokens, one sentence per line.
//! Blank lines are skipped. The tag is everything after the last `/`, so
//! words may themselves contain slashes (`1/2/CD`). Files ending in `.gz`
//! are decompressed on the fly.

use bstr::ByteSlice;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;
use thiserror::Error;

use crate::token::TaggedToken;

/// Error reading tagged text
#[derive(Debug, Error)]
pub enum TaggedTextError {
    #[error("I/O error at line {line}: {source}")]
    Io {
        line: usize,
        source: std::io::Error,
    },

    #[error("Tagged text error at line {line}: invalid UTF-8")]
    Utf8 { line: usize },

    #[error("Tagged text error at line {line}: {token:?} is not word/TAG")]
    MissingTag { line: usize, token: String },
}

/// Sentence reader over `word/TAG` text
pub struct TaggedReader<R: BufRead> {
    reader: R,
    buffer: Vec<u8>,
    line_num: usize,
    lowercase: bool,
}

impl TaggedReader<Box<dyn BufRead>> {
    /// Open a file, decompressing it when the name ends in `.gz`
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let reader: Box<dyn BufRead> = if path.extension().is_some_and(|ext| ext == "gz") {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        Ok(Self::new(reader))
    }
}

impl TaggedReader<Cursor<Vec<u8>>> {
    pub fn from_string(text: &str) -> Self {
        Self::new(Cursor::new(text.as_bytes().to_vec()))
    }
}

impl<R: BufRead> TaggedReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            line_num: 0,
            lowercase: false,
        }
    }

    /// Lowercase every word (tags are left alone)
    pub fn lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }
}

impl<R: BufRead> Iterator for TaggedReader<R> {
    type Item = Result<Vec<TaggedToken>, TaggedTextError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buffer.clear();
            self.line_num += 1;

            match self.reader.read_until(b'\n', &mut self.buffer) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(source) => {
                    return Some(Err(TaggedTextError::Io {
                        line: self.line_num,
                        source,
                    }));
                }
            }

            let line = self.buffer.trim();
            if line.is_empty() {
                continue;
            }
            return Some(parse_tagged_line(line, self.line_num, self.lowercase));
        }
    }
}

/// Split one line into tokens at the last `/` of each field
pub fn parse_tagged_line(
    line: &[u8],
    line_num: usize,
    lowercase: bool,
) -> Result<Vec<TaggedToken>, TaggedTextError> {
    line.fields()
        .map(|field| {
            let slash = match memchr::memrchr(b'/', field) {
                Some(i) if i > 0 && i + 1 < field.len() => i,
                _ => {
                    return Err(TaggedTextError::MissingTag {
                        line: line_num,
                        token: field.to_str_lossy().into_owned(),
                    });
                }
            };

            let word = field[..slash]
                .to_str()
                .map_err(|_| TaggedTextError::Utf8 { line: line_num })?;
            let tag = field[slash + 1..]
                .to_str()
                .map_err(|_| TaggedTextError::Utf8 { line: line_num })?;

            if lowercase {
                Ok(TaggedToken::new(&word.to_lowercase(), tag))
            } else {
                Ok(TaggedToken::new(word, tag))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::tokens;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn test_read_sentences() {
        let text = "the/DT dog/NN barked/VBD\n\n  \nthe/DT cat/NN\n";
        let sentences: Vec<_> = TaggedReader::from_string(text)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(sentences.len(), 2);
        assert_eq!(
            sentences[0],
            tokens(&[("the", "DT"), ("dog", "NN"), ("barked", "VBD")])
        );
        assert_eq!(sentences[1], tokens(&[("the", "DT"), ("cat", "NN")]));
    }

    #[test]
    fn test_last_line_without_newline() {
        let sentences: Vec<_> = TaggedReader::from_string("a/DT\tcat/NN")
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(sentences, vec![tokens(&[("a", "DT"), ("cat", "NN")])]);
    }

    #[test]
    fn test_word_with_slash() {
        let sentence = parse_tagged_line(b"1/2/CD and/CC //SYM", 1, false).unwrap();

        assert_eq!(sentence[0], TaggedToken::new("1/2", "CD"));
        assert_eq!(sentence[1], TaggedToken::new("and", "CC"));
        assert_eq!(sentence[2], TaggedToken::new("/", "SYM"));
    }

    #[test]
    fn test_missing_tag_reports_line() {
        let mut reader = TaggedReader::from_string("the/DT\n\nthe dog/NN\n");

        assert!(reader.next().unwrap().is_ok());
        match reader.next().unwrap() {
            Err(TaggedTextError::MissingTag { line, token }) => {
                assert_eq!(line, 3);
                assert_eq!(token, "the");
            }
            other => panic!("expected MissingTag, got {:?}", other),
        }

        for bad in [&b"dog/"[..], b"/NN", b"dog"] {
            assert!(parse_tagged_line(bad, 1, false).is_err());
        }
    }

    #[test]
    fn test_invalid_utf8() {
        let mut reader = TaggedReader::new(Cursor::new(b"caf\xe9/NN\n".to_vec()));
        assert!(matches!(
            reader.next(),
            Some(Err(TaggedTextError::Utf8 { line: 1 }))
        ));
    }

    #[test]
    fn test_lowercase_words_only() {
        let sentence = TaggedReader::from_string("The/DT Dog/NNP\n")
            .lowercase(true)
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(sentence, tokens(&[("the", "DT"), ("dog", "NNP")]));
    }

    #[test]
    fn test_gzip_file() {
        let path = std::env::temp_dir().join(format!("tagchunk-{}.txt.gz", std::process::id()));

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"the/DT dog/NN\nran/VBD\n").unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let sentences: Vec<_> = TaggedReader::from_file(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[1], tokens(&[("ran", "VBD")]));
    }
}
