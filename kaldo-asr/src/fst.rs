//! OpenFst binary files: header and embedded symbol tables.
//!
//! The arc data itself belongs to the search engine and is kept as an opaque
//! body; the orchestration layer only needs the graph's identity and its
//! output symbols.

use crate::error::ModelError;
use crate::symbols::SymbolTable;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

/// Magic number opening an OpenFst binary.
pub const FST_MAGIC: i32 = 2125659606;

const HAS_ISYMBOLS: i32 = 0x1;
const HAS_OSYMBOLS: i32 = 0x2;

pub(crate) fn read_i32<R: Read>(reader: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

pub(crate) fn read_i64<R: Read>(reader: &mut R) -> io::Result<i64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

pub(crate) fn read_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

pub(crate) fn read_string<R: Read>(reader: &mut R) -> io::Result<String> {
    let len = read_i32(reader)?;
    let len = usize::try_from(len)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "negative string length"))?;

    let mut buf = Vec::new();
    reader.take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("string of {len} bytes truncated to {}", buf.len()),
        ));
    }
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

pub(crate) fn write_i32<W: Write>(writer: &mut W, value: i32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub(crate) fn write_i64<W: Write>(writer: &mut W, value: i64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub(crate) fn write_string<W: Write>(writer: &mut W, value: &str) -> io::Result<()> {
    let len = i32::try_from(value.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "string too long"))?;
    write_i32(writer, len)?;
    writer.write_all(value.as_bytes())
}

/// Fixed header preceding every OpenFst binary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FstHeader {
    /// e.g. `vector` or `const`
    pub fst_type: String,
    /// e.g. `standard`
    pub arc_type: String,
    pub version: i32,
    pub flags: i32,
    pub properties: u64,
    pub start: i64,
    pub num_states: i64,
    pub num_arcs: i64,
}

impl FstHeader {
    pub fn new(fst_type: impl Into<String>, arc_type: impl Into<String>) -> Self {
        Self {
            fst_type: fst_type.into(),
            arc_type: arc_type.into(),
            version: 2,
            flags: 0,
            properties: 0,
            start: -1,
            num_states: 0,
            num_arcs: 0,
        }
    }

    fn read<R: Read>(reader: &mut R, path: &Path) -> Result<Self, ModelError> {
        let io = |e| ModelError::io(path, e);

        let magic = read_i32(reader).map_err(io)?;
        if magic != FST_MAGIC {
            return Err(ModelError::InvalidFst {
                path: path.to_path_buf(),
                reason: format!("bad magic number {magic}"),
            });
        }

        Ok(Self {
            fst_type: read_string(reader).map_err(io)?,
            arc_type: read_string(reader).map_err(io)?,
            version: read_i32(reader).map_err(io)?,
            flags: read_i32(reader).map_err(io)?,
            properties: read_u64(reader).map_err(io)?,
            start: read_i64(reader).map_err(io)?,
            num_states: read_i64(reader).map_err(io)?,
            num_arcs: read_i64(reader).map_err(io)?,
        })
    }

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_i32(writer, FST_MAGIC)?;
        write_string(writer, &self.fst_type)?;
        write_string(writer, &self.arc_type)?;
        write_i32(writer, self.version)?;
        write_i32(writer, self.flags)?;
        writer.write_all(&self.properties.to_le_bytes())?;
        write_i64(writer, self.start)?;
        write_i64(writer, self.num_states)?;
        write_i64(writer, self.num_arcs)
    }
}

/// A loaded graph file.
#[derive(Clone, Debug)]
pub struct Fst {
    pub header: FstHeader,
    pub input_symbols: Option<SymbolTable>,
    /// Shared with the model when it becomes the word table
    pub output_symbols: Option<Arc<SymbolTable>>,
    /// Engine-specific arc data following the header
    pub body: Vec<u8>,
}

impl Fst {
    /// Graph with no embedded symbols and an empty body.
    pub fn new(header: FstHeader) -> Self {
        Self {
            header,
            input_symbols: None,
            output_symbols: None,
            body: Vec::new(),
        }
    }

    /// Attach output symbols; sets the header flag accordingly.
    pub fn with_output_symbols(mut self, symbols: SymbolTable) -> Self {
        self.header.flags |= HAS_OSYMBOLS;
        self.output_symbols = Some(Arc::new(symbols));
        self
    }

    pub fn read<R: Read>(reader: &mut R, path: &Path) -> Result<Self, ModelError> {
        let header = FstHeader::read(reader, path)?;

        let input_symbols = match header.flags & HAS_ISYMBOLS {
            0 => None,
            _ => Some(SymbolTable::read_binary(reader, path)?),
        };
        let output_symbols = match header.flags & HAS_OSYMBOLS {
            0 => None,
            _ => Some(Arc::new(SymbolTable::read_binary(reader, path)?)),
        };

        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .map_err(|e| ModelError::io(path, e))?;

        Ok(Self {
            header,
            input_symbols,
            output_symbols,
            body,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let file = std::fs::File::open(path).map_err(|e| ModelError::io(path, e))?;
        let fst = Self::read(&mut io::BufReader::new(file), path)?;

        tracing::debug!(
            path = %path.display(),
            fst_type = %fst.header.fst_type,
            num_states = fst.header.num_states,
            has_osyms = fst.output_symbols.is_some(),
            "loaded fst"
        );

        Ok(fst)
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.header.write(writer)?;
        if let Some(symbols) = &self.input_symbols {
            symbols.write_binary(writer)?;
        }
        if let Some(symbols) = &self.output_symbols {
            symbols.write_binary(writer)?;
        }
        writer.write_all(&self.body)
    }

    pub fn to_file(&self, path: &Path) -> io::Result<()> {
        let mut file = io::BufWriter::new(std::fs::File::create(path)?);
        self.write(&mut file)?;
        file.flush()
    }
}
