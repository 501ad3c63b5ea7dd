use std::io::{Read, Seek, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{Archive, Compression};
use crate::error::{Error, Lookup, Result};

/// Read-only archive over any [`Read`] + [`Seek`] source.
pub struct ZipReader<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl<R: Read + Seek> ZipReader<R> {
    pub fn new(reader: R) -> Result<Self> {
        Ok(Self {
            archive: ZipArchive::new(reader)?,
        })
    }

    fn read_exact_name(&mut self, path: &str) -> Result<Option<Vec<u8>>> {
        match self.archive.by_name(path) {
            Ok(mut file) => {
                let mut contents = Vec::new();
                file.read_to_end(&mut contents)?;
                Ok(Some(contents))
            }
            Err(zip::result::ZipError::FileNotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl<R: Read + Seek> Archive for ZipReader<R> {
    fn entries(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    fn read_entry(&mut self, path: &str) -> Result<Vec<u8>> {
        if let Some(data) = self.read_exact_name(path)? {
            return Ok(data);
        }

        // Fallback: try percent-decoded path (handles malformed EPUBs)
        let decoded = percent_encoding::percent_decode_str(path)
            .decode_utf8()
            .map_err(|_| Error::InvalidEpub(format!("Invalid UTF-8 in path: {}", path)))?;
        if decoded != path
            && let Some(data) = self.read_exact_name(&decoded)?
        {
            return Ok(data);
        }

        Err(Error::not_found(Lookup::Entry, path))
    }

    fn write_entry(&mut self, path: &str, _data: &[u8], _compression: Compression) -> Result<()> {
        Err(Error::usage(format!(
            "cannot write {path}: archive was opened for reading"
        )))
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Write-only archive over any [`Write`] + [`Seek`] sink.
pub struct ZipSink<W: Write + Seek> {
    zip: Option<ZipWriter<W>>,
    names: Vec<String>,
}

impl<W: Write + Seek> ZipSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            zip: Some(ZipWriter::new(writer)),
            names: Vec::new(),
        }
    }

    fn writer(&mut self) -> Result<&mut ZipWriter<W>> {
        self.zip
            .as_mut()
            .ok_or_else(|| Error::usage("archive is already closed"))
    }
}

impl<W: Write + Seek> Archive for ZipSink<W> {
    fn entries(&self) -> Vec<String> {
        self.names.clone()
    }

    fn read_entry(&mut self, path: &str) -> Result<Vec<u8>> {
        Err(Error::usage(format!(
            "cannot read {path}: archive was opened for writing"
        )))
    }

    fn write_entry(&mut self, path: &str, data: &[u8], compression: Compression) -> Result<()> {
        let method = match compression {
            Compression::Stored => CompressionMethod::Stored,
            Compression::Deflated => CompressionMethod::Deflated,
        };
        let options = SimpleFileOptions::default().compression_method(method);

        let zip = self.writer()?;
        zip.start_file(path, options)?;
        zip.write_all(data)?;
        self.names.push(path.to_string());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(zip) = self.zip.take() {
            zip.finish()?;
        }
        Ok(())
    }
}
