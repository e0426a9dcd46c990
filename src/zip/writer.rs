//! Minimal ZIP writer.
//!
//! Produces single-disk archives with DEFLATE entries and no ZIP64 records,
//! which comfortably covers the filtered data and asset packs.

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::Crc;
use flate2::write::DeflateEncoder;
use std::io::Write;

use crate::error::RepackError;
use anyhow::Result;

use super::structures::*;

/// Unix "version made by" host byte, so `external_attrs` carry file modes.
const HOST_UNIX: u16 = 3 << 8;

/// Regular file, rw-r--r--
const FILE_MODE: u32 = 0o100644;

/// Central Directory record kept until [`ZipWriter::finish`].
struct CentralRecord {
    name: String,
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
    lfh_offset: u32,
}

/// Streaming ZIP writer over any [`Write`] sink.
pub struct ZipWriter<W: Write> {
    out: W,
    offset: u64,
    records: Vec<CentralRecord>,
}

impl<W: Write> ZipWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            offset: 0,
            records: Vec::new(),
        }
    }

    /// Number of entries written so far
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Compress `data` and append it as entry `name`
    pub fn add_file(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data)?;
        let compressed = encoder.finish()?;

        let mut crc = Crc::new();
        crc.update(data);

        let record = CentralRecord {
            name: name.to_string(),
            crc32: crc.sum(),
            compressed_size: fit_u32(compressed.len() as u64, name)?,
            uncompressed_size: fit_u32(data.len() as u64, name)?,
            lfh_offset: fit_u32(self.offset, name)?,
        };

        let name_len = fit_u16(record.name.len(), "file name length")?;

        self.out.write_all(LFH_SIGNATURE)?;
        self.out.write_u16::<LittleEndian>(VERSION_DEFLATE)?;
        self.out.write_u16::<LittleEndian>(FLAG_UTF8)?;
        self.out
            .write_u16::<LittleEndian>(CompressionMethod::Deflate.as_u16())?;
        self.out.write_u16::<LittleEndian>(0)?; // mod time
        self.out.write_u16::<LittleEndian>(DOS_EPOCH_DATE)?;
        self.out.write_u32::<LittleEndian>(record.crc32)?;
        self.out.write_u32::<LittleEndian>(record.compressed_size)?;
        self.out.write_u32::<LittleEndian>(record.uncompressed_size)?;
        self.out.write_u16::<LittleEndian>(name_len)?;
        self.out.write_u16::<LittleEndian>(0)?; // extra field length
        self.out.write_all(record.name.as_bytes())?;
        self.out.write_all(&compressed)?;

        self.offset += (LFH_SIZE + record.name.len() + compressed.len()) as u64;
        self.records.push(record);
        Ok(())
    }

    /// Write the Central Directory and EOCD and hand back the sink
    pub fn finish(mut self) -> Result<W> {
        let entry_count = fit_u16(self.records.len(), "entry count")?;
        let cd_offset = fit_u32(self.offset, "central directory offset")?;
        let mut cd_size = 0u64;

        for record in &self.records {
            self.out.write_all(CDFH_SIGNATURE)?;
            self.out
                .write_u16::<LittleEndian>(HOST_UNIX | VERSION_DEFLATE)?;
            self.out.write_u16::<LittleEndian>(VERSION_DEFLATE)?;
            self.out.write_u16::<LittleEndian>(FLAG_UTF8)?;
            self.out
                .write_u16::<LittleEndian>(CompressionMethod::Deflate.as_u16())?;
            self.out.write_u16::<LittleEndian>(0)?;
            self.out.write_u16::<LittleEndian>(DOS_EPOCH_DATE)?;
            self.out.write_u32::<LittleEndian>(record.crc32)?;
            self.out.write_u32::<LittleEndian>(record.compressed_size)?;
            self.out.write_u32::<LittleEndian>(record.uncompressed_size)?;
            self.out
                .write_u16::<LittleEndian>(record.name.len() as u16)?;
            self.out.write_u16::<LittleEndian>(0)?; // extra field length
            self.out.write_u16::<LittleEndian>(0)?; // comment length
            self.out.write_u16::<LittleEndian>(0)?; // disk number start
            self.out.write_u16::<LittleEndian>(0)?; // internal attributes
            self.out.write_u32::<LittleEndian>(FILE_MODE << 16)?;
            self.out.write_u32::<LittleEndian>(record.lfh_offset)?;
            self.out.write_all(record.name.as_bytes())?;

            cd_size += (CDFH_MIN_SIZE + record.name.len()) as u64;
        }

        let cd_size = fit_u32(cd_size, "central directory size")?;

        self.out.write_all(EndOfCentralDirectory::SIGNATURE)?;
        self.out.write_u16::<LittleEndian>(0)?; // this disk
        self.out.write_u16::<LittleEndian>(0)?; // disk with central directory
        self.out.write_u16::<LittleEndian>(entry_count)?;
        self.out.write_u16::<LittleEndian>(entry_count)?;
        self.out.write_u32::<LittleEndian>(cd_size)?;
        self.out.write_u32::<LittleEndian>(cd_offset)?;
        self.out.write_u16::<LittleEndian>(0)?; // comment length
        self.out.flush()?;

        Ok(self.out)
    }
}

// 0xFFFF and 0xFFFFFFFF are reserved as ZIP64 markers.
fn fit_u16(value: usize, what: &str) -> Result<u16> {
    match u16::try_from(value) {
        Ok(v) if v != u16::MAX => Ok(v),
        _ => Err(RepackError::ArchiveTooLarge {
            reason: format!("{what} {value} needs ZIP64"),
        }
        .into()),
    }
}

fn fit_u32(value: u64, what: &str) -> Result<u32> {
    match u32::try_from(value) {
        Ok(v) if v != u32::MAX => Ok(v),
        _ => Err(RepackError::ArchiveTooLarge {
            reason: format!("{what}: {value} bytes needs ZIP64"),
        }
        .into()),
    }
}
