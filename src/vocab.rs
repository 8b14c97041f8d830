//! Token vocabulary: string <-> dense ID mapping shared by the builder
//! and the matcher.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::{BuildError, MatchError};
use crate::model::VocabFile;

pub const UNK_TOKEN: &str = "<UNK>";
pub const UNK_ID: u32 = 0;

#[derive(Debug, Clone)]
pub struct Vocabulary {
    tokens: HashMap<String, u32>,
    reverse: Vec<String>,
    pub separator_id: u32,
}

impl Vocabulary {
    /// Builds a vocabulary from the distinct token set of a phrase
    /// collection. IDs are assigned 1..N in alphabetical order; 0 is
    /// reserved for `<UNK>`. Fails if any real token collides with
    /// `separator_id`.
    pub fn build<'a, I>(all_tokens: I, separator_id: u32) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut distinct: Vec<String> = all_tokens
            .into_iter()
            .map(|t| t.to_string())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        distinct.sort();

        let mut tokens = HashMap::with_capacity(distinct.len());
        let mut reverse = Vec::with_capacity(distinct.len());
        for (i, token) in distinct.into_iter().enumerate() {
            let id = (i + 1) as u32;
            if id == separator_id {
                return Err(BuildError::SeparatorCollision {
                    token,
                    separator_id,
                });
            }
            tokens.insert(token.clone(), id);
            reverse.push(token);
        }

        Ok(Vocabulary {
            tokens,
            reverse,
            separator_id,
        })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Looks up a token's ID; returns `UNK_ID` for unknown tokens. The
    /// caller is expected to have already lowercase-normalized `token`.
    pub fn lookup(&self, token: &str) -> u32 {
        self.tokens.get(token).copied().unwrap_or(UNK_ID)
    }

    pub fn token_for_id(&self, id: u32) -> Option<&str> {
        if id == UNK_ID || id == self.separator_id {
            return None;
        }
        self.reverse.get((id - 1) as usize).map(String::as_str)
    }

    pub fn encode(&self, tokens: &[String]) -> Vec<u32> {
        tokens
            .iter()
            .map(|t| self.lookup(&crate::model::normalize_token(t)))
            .collect()
    }

    pub fn to_vocab_file(&self) -> VocabFile {
        let mut special_tokens = HashMap::new();
        special_tokens.insert(UNK_TOKEN.to_string(), UNK_ID);
        VocabFile {
            tokens: self.tokens.clone(),
            special_tokens,
            vocab_size: self.tokens.len() as u32,
            separator_id: self.separator_id,
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &self.to_vocab_file())?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, MatchError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let vocab_file: VocabFile = serde_json::from_reader(reader)?;

        let mut reverse = vec![String::new(); vocab_file.tokens.len()];
        for (token, id) in &vocab_file.tokens {
            let idx = (*id as usize).wrapping_sub(1);
            if idx < reverse.len() {
                reverse[idx] = token.clone();
            }
        }

        Ok(Vocabulary {
            tokens: vocab_file.tokens,
            reverse,
            separator_id: vocab_file.separator_id,
        })
    }
}
