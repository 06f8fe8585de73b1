//! Job scripts: one job per line, from a file or stdin (`-`)

use crate::error::{SetupError, SetupResult};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// An open source of job lines
pub struct JobScript {
    path: PathBuf,
    reader: Box<dyn BufRead>,
}

impl JobScript {
    /// Open `path`, or stdin when `path` is `-`
    pub fn open(path: &Path) -> SetupResult<Self> {
        let reader: Box<dyn BufRead> = if path == Path::new("-") {
            Box::new(BufReader::new(io::stdin()))
        } else {
            let file = File::open(path).map_err(|source| SetupError::JobSource {
                path: path.to_path_buf(),
                source,
            })?;
            Box::new(BufReader::new(file))
        };

        Ok(Self {
            path: path.to_path_buf(),
            reader,
        })
    }

    /// Wrap any reader (used for tests and embedding)
    pub fn from_reader(name: impl Into<PathBuf>, reader: impl BufRead + 'static) -> Self {
        Self {
            path: name.into(),
            reader: Box::new(reader),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Iterate over raw lines; a read error is fatal
    pub fn lines(self) -> impl Iterator<Item = SetupResult<String>> {
        let path = self.path;
        self.reader.lines().map(move |line| {
            line.map_err(|source| SetupError::JobSource {
                path: path.clone(),
                source,
            })
        })
    }
}
