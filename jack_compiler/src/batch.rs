//! Compiling files and directories of source files.
use std::{
    fs,
    io::{self, BufWriter},
    path::{Path, PathBuf},
};

use log::{info, warn};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::error::{CompileResult, FileError};

/// Batch compilation configuration.
#[derive(Debug, Clone)]
pub struct BatchConf {
    /// Continue with the remaining files after a file fails.
    pub keep_going: bool,
    /// Extension of source files picked up from a directory.
    pub source_ext: String,
    /// Extension given to compiled output files.
    pub target_ext: String,
}

impl Default for BatchConf {
    fn default() -> Self {
        Self {
            keep_going: false,
            source_ext: "jack".to_owned(),
            target_ext: "vm".to_owned(),
        }
    }
}

/// Outcome of compiling a batch of files.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Output files written, in compile order.
    pub compiled: Vec<PathBuf>,
    pub failed: Vec<FileError>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Source files designated by a path.
///
/// A file is returned as is. A directory yields the files directly inside it
/// with the configured source extension, sorted by name.
pub fn source_files(path: impl AsRef<Path>, conf: &BatchConf) -> io::Result<Vec<PathBuf>> {
    let path = path.as_ref();

    if !path.is_dir() {
        if !path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            ));
        }
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = vec![];
    for entry in WalkDir::new(path).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let has_ext = entry.path().extension().map_or(false, |ext| ext == conf.source_ext.as_str());
        if entry.file_type().is_file() && has_ext {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Output file next to the source file.
pub fn output_path(source: impl AsRef<Path>, conf: &BatchConf) -> PathBuf {
    source.as_ref().with_extension(&conf.target_ext)
}

/// Compile a single source file into its output file.
///
/// Output is written to a temporary file in the target directory which
/// only replaces the target once the whole class compiled. A failed
/// compile leaves no output behind.
pub fn compile_file(source: impl AsRef<Path>, conf: &BatchConf) -> CompileResult<PathBuf> {
    let source = source.as_ref();
    let target = output_path(source, conf);
    let text = fs::read_to_string(source)?;

    let dir = match target.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut out = BufWriter::new(NamedTempFile::new_in(dir)?);

    let class_name = crate::compile_to(&text, &mut out)?;

    let stem = source.file_stem().and_then(|stem| stem.to_str());
    if stem != Some(class_name.as_str()) {
        warn!("class {} does not match its file name {}", class_name, source.display());
    }

    let file = out.into_inner().map_err(|err| err.into_error())?;
    file.persist(&target).map_err(|err| err.error)?;

    info!("compiled {} -> {}", source.display(), target.display());
    Ok(target)
}

/// Compile one file, or every source file of a directory.
///
/// Each file gets its own compiler. Without `keep_going` the first
/// failure is returned as an error and the remaining files are skipped.
pub fn compile_path(path: impl AsRef<Path>, conf: &BatchConf) -> Result<BatchReport, FileError> {
    let path = path.as_ref();
    let files = source_files(path, conf).map_err(|err| FileError::new(path, err))?;

    if files.is_empty() {
        warn!("no .{} files found in {}", conf.source_ext, path.display());
    }

    let mut report = BatchReport::default();
    for file in files {
        match compile_file(&file, conf) {
            Ok(target) => report.compiled.push(target),
            Err(err) if conf.keep_going => {
                warn!("{}: {}", file.display(), err);
                report.failed.push(FileError::new(file, err));
            }
            Err(err) => return Err(FileError::new(file, err)),
        }
    }

    Ok(report)
}
