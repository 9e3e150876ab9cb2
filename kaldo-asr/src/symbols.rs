//! Word symbol tables, in Kaldi text form (`words.txt`) and the binary form
//! OpenFst embeds in graph files.

use crate::error::ModelError;
use crate::fst::{read_i32, read_i64, read_string, write_i32, write_i64, write_string};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

/// Magic number opening a binary symbol table.
pub const SYMBOL_TABLE_MAGIC: i32 = 2125658996;

/// Bidirectional label ↔ word mapping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SymbolTable {
    name: String,
    words: HashMap<i64, String>,
    labels: HashMap<String, i64>,
    available_key: i64,
}

impl SymbolTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Insert a symbol; a later entry for the same label replaces the earlier one.
    pub fn insert(&mut self, word: impl Into<String>, label: i64) {
        let word = word.into();
        self.labels.insert(word.clone(), label);
        self.words.insert(label, word);
        self.available_key = self.available_key.max(label + 1);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Word for `label`.
    pub fn get(&self, label: i64) -> Option<&str> {
        self.words.get(&label).map(String::as_str)
    }

    /// Label for `word`.
    pub fn find(&self, word: &str) -> Option<i64> {
        self.labels.get(word).copied()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Parse `words.txt`: one `<word> <label>` pair per line.
    pub fn parse_text(path: &Path, text: &str) -> Result<Self, ModelError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut table = Self::new(name);

        for (i, line) in text.lines().enumerate() {
            let invalid = |reason: &str| ModelError::InvalidSymbolTable {
                path: path.to_path_buf(),
                line: i + 1,
                reason: reason.to_string(),
            };

            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next(), fields.next()) {
                (None, ..) => continue,
                (Some(word), Some(label), None) => {
                    let label = label.parse().map_err(|_| invalid("label is not an integer"))?;
                    table.insert(word, label);
                }
                _ => return Err(invalid("expected `<word> <label>`")),
            }
        }

        Ok(table)
    }

    /// Read a text symbol table from disk.
    pub fn from_text_file(path: &Path) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path).map_err(|e| ModelError::io(path, e))?;
        Self::parse_text(path, &text)
    }

    /// Read the binary form embedded in FST files.
    pub fn read_binary<R: Read>(reader: &mut R, path: &Path) -> Result<Self, ModelError> {
        let invalid = |reason: String| ModelError::InvalidFst {
            path: path.to_path_buf(),
            reason,
        };
        let io = |e| ModelError::io(path, e);

        let magic = read_i32(reader).map_err(io)?;
        if magic != SYMBOL_TABLE_MAGIC {
            return Err(invalid(format!("bad symbol table magic {magic}")));
        }

        let name = read_string(reader).map_err(io)?;
        let available_key = read_i64(reader).map_err(io)?;
        let size = read_i64(reader).map_err(io)?;
        if size < 0 {
            return Err(invalid(format!("negative symbol count {size}")));
        }

        let mut table = Self::new(name);
        for _ in 0..size {
            let word = read_string(reader).map_err(io)?;
            let label = read_i64(reader).map_err(io)?;
            table.insert(word, label);
        }
        table.available_key = table.available_key.max(available_key);

        Ok(table)
    }

    /// Write the binary form, labels in ascending order.
    pub fn write_binary<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        write_i32(writer, SYMBOL_TABLE_MAGIC)?;
        write_string(writer, &self.name)?;
        write_i64(writer, self.available_key)?;
        write_i64(writer, self.words.len() as i64)?;

        let mut labels: Vec<_> = self.words.keys().copied().collect();
        labels.sort_unstable();
        for label in labels {
            write_string(writer, &self.words[&label])?;
            write_i64(writer, label)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_words_txt() {
        let text = "<eps> 0\nhello 1\nworld 2\n\n#0 3\n";
        let table = SymbolTable::parse_text(Path::new("words.txt"), text).unwrap();

        assert_eq!(table.name(), "words.txt");
        assert_eq!(table.len(), 4);
        assert_eq!(table.get(2), Some("world"));
        assert_eq!(table.find("hello"), Some(1));
        assert_eq!(table.get(9), None);
    }

    #[test]
    fn rejects_non_integer_label() {
        let result = SymbolTable::parse_text(Path::new("words.txt"), "a 0\nb x\n");

        match result {
            Err(ModelError::InvalidSymbolTable { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected invalid symbol table, got {other:?}"),
        }
    }

    #[test]
    fn binary_form_preserves_entries() {
        let mut table = SymbolTable::new("osyms");
        table.insert("<eps>", 0);
        table.insert("speech", 1);

        let mut bytes = Vec::new();
        table.write_binary(&mut bytes).unwrap();
        let read = SymbolTable::read_binary(&mut bytes.as_slice(), Path::new("mem")).unwrap();

        assert_eq!(read, table);
    }

    #[test]
    fn binary_rejects_bad_magic() {
        let bytes = [0u8; 8];
        let result = SymbolTable::read_binary(&mut bytes.as_slice(), Path::new("mem"));

        assert!(matches!(result, Err(ModelError::InvalidFst { .. })));
    }
}
