pub mod xz;

use crate::backup::file_ext::FileExtProvider;
use crate::backup::finish::Finish;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{AddFunctionName, AddMsg};

use derive_more::From;
use io_enum::Write;
use liblzma::write::XzEncoder;
use serde::Deserialize;
use validator::{Validate, ValidationErrors};

use std::io;
use std::io::{BufWriter, IntoInnerError, Read, Write};
use std::path::Path;
use std::result;
use std::sync::{Arc, OnceLock};

#[derive(Write, From)]
pub enum Compressor<W: Write> {
    None(W),
    XzEncoder(XzEncoder<W>),
}

/// Compression applied to archives and database dumps written into `output`.
#[derive(Clone, From, Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "compressor_type")]
#[serde(rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum CompressorConfig {
    None,
    Xz(xz::XzConfig),
}

impl Default for CompressorConfig {
    fn default() -> Self {
        CompressorConfig::Xz(xz::XzConfig::default())
    }
}

impl Validate for CompressorConfig {
    fn validate(&self) -> result::Result<(), ValidationErrors> {
        match self {
            CompressorConfig::None => Ok(()),
            CompressorConfig::Xz(xz) => xz.validate(),
        }
    }
}

pub trait CompressorBuilder<W: Write> {
    fn build_compressor(&self, writer: W) -> Result<Compressor<W>>;
}

impl<W: Write> Finish<W> for Compressor<W> {
    fn finish(self) -> io::Result<W> {
        match self {
            Compressor::None(w) => Ok(w),
            Compressor::XzEncoder(w) => w.finish(),
        }
    }
}

impl<W: Write> CompressorBuilder<W> for CompressorConfig {
    fn build_compressor(&self, writer: W) -> Result<Compressor<W>> {
        match self {
            CompressorConfig::None => Ok(Compressor::None(writer)),
            CompressorConfig::Xz(xz) => xz.build_compressor(writer),
        }
        .add_fn_name("CompressorConfig::build_compressor")
    }
}

static XZ_FILE_EXT: OnceLock<Arc<str>> = OnceLock::new();
impl FileExtProvider for CompressorConfig {
    fn file_ext(&self) -> Option<Arc<str>> {
        match self {
            CompressorConfig::None => None,
            CompressorConfig::Xz(_) => Some(XZ_FILE_EXT.get_or_init(|| "xz".into()).clone()),
        }
    }
}

/// Streams `reader` through the compressor into `output_file`.
///
/// Like archives, the data lands in a temp file next to `output_file` that
/// is renamed into place once the compressed stream is complete.
pub fn compress_into_file<R: Read>(
    mut reader: R,
    config: &CompressorConfig,
    output_file: &Path,
) -> Result<u64> {
    let output_dir = output_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut temp = tempfile::Builder::new()
        .prefix(".dist-backup-")
        .suffix(".partial")
        .tempfile_in(output_dir)
        .map_err(Error::from)
        .add_msg(format!("Create temp file in {:?} failed", output_dir))?;

    let mut writer = config
        .build_compressor(BufWriter::new(&mut temp))
        .map(BufWriter::new)?;
    let copied = io::copy(&mut reader, &mut writer)?;
    writer
        .into_inner()
        .map_err(IntoInnerError::into_error)?
        .finish()?
        .into_inner()
        .map_err(IntoInnerError::into_error)?;

    temp.persist(output_file)
        .map_err(|e| Error::from(e.error))
        .add_msg(format!("Rename onto {:?} failed", output_file))?;
    Ok(copied)
}
