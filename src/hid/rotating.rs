//! # Rotating Report File
//!
//! Size-bounded JSONL output for [`super::report::JsonlReportSink`].
//!
//! The active file is `path`. Once it holds `max_records_per_file` lines, the
//! next write shifts `path` to `path.1`, `path.1` to `path.2` and so on, drops
//! the oldest, and starts a fresh `path`. At most `max_files_to_keep` files
//! exist at any time, the active one included.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Result, WheelBridgeError};

/// Line-counting writer that rotates `path` by record count.
#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    file: BufWriter<File>,
    records: usize,
}

impl RotatingFile {
    /// Opens `path` for appending.
    ///
    /// Lines already in the file count toward the first rotation.
    ///
    /// # Errors
    ///
    /// Returns error if either limit is zero or the file cannot be opened
    pub fn open<P: AsRef<Path>>(path: P, max_records_per_file: usize, max_files_to_keep: usize) -> Result<Self> {
        if max_records_per_file == 0 || max_files_to_keep == 0 {
            return Err(WheelBridgeError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "rotation limits must be greater than 0",
            )));
        }

        let path = path.as_ref().to_path_buf();
        let records = match File::open(&path) {
            Ok(existing) => BufReader::new(existing).split(b'\n').count(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };
        let file = Self::open_append(&path)?;
        debug!("Report file {} holds {} records", path.display(), records);

        Ok(Self {
            path,
            max_records_per_file,
            max_files_to_keep,
            file,
            records,
        })
    }

    /// Path of the `n`th rotated file (`path.n`); `0` is the active file.
    #[must_use]
    pub fn rotated_path(&self, n: usize) -> PathBuf {
        if n == 0 {
            return self.path.clone();
        }
        let mut name = OsString::from(self.path.as_os_str());
        name.push(format!(".{}", n));
        PathBuf::from(name)
    }

    /// Lines written to the active file.
    #[must_use]
    pub fn records(&self) -> usize {
        self.records
    }

    fn open_append(path: &Path) -> io::Result<BufWriter<File>> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(BufWriter::new(file))
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        let oldest = self.rotated_path(self.max_files_to_keep - 1);
        match fs::remove_file(&oldest) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
            _ => {}
        }
        for n in (1..self.max_files_to_keep).rev() {
            let from = self.rotated_path(n - 1);
            if from.exists() {
                fs::rename(&from, self.rotated_path(n))?;
            }
        }

        self.file = Self::open_append(&self.path)?;
        self.records = 0;
        info!("Rotated report file {}", self.path.display());
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.records >= self.max_records_per_file {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.records += buf[..n].iter().filter(|&&b| b == b'\n').count();
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::report::JsonlReportSink;
    use crate::hid::HidSink;
    use tempfile::TempDir;

    fn line_count(path: &Path) -> usize {
        fs::read_to_string(path).unwrap().lines().count()
    }

    #[test]
    fn test_rotates_after_max_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports.jsonl");
        let mut sink = JsonlReportSink::new(RotatingFile::open(&path, 3, 10).unwrap());

        for _ in 0..7 {
            sink.send_report().unwrap();
        }

        assert_eq!(line_count(&path), 1);
        assert_eq!(line_count(&dir.path().join("reports.jsonl.1")), 3);
        assert_eq!(line_count(&dir.path().join("reports.jsonl.2")), 3);
        assert!(!dir.path().join("reports.jsonl.3").exists());
    }

    #[test]
    fn test_keeps_at_most_max_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports.jsonl");
        let mut writer = RotatingFile::open(&path, 1, 3).unwrap();

        for i in 0..6 {
            writeln!(writer, "{}", i).unwrap();
        }
        writer.flush().unwrap();

        let files = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 3);
        assert_eq!(fs::read_to_string(&path).unwrap(), "5\n");
        assert_eq!(fs::read_to_string(writer.rotated_path(1)).unwrap(), "4\n");
        assert_eq!(fs::read_to_string(writer.rotated_path(2)).unwrap(), "3\n");
    }

    #[test]
    fn test_single_file_limit_truncates_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports.jsonl");
        let mut writer = RotatingFile::open(&path, 2, 1).unwrap();

        for i in 0..5 {
            writeln!(writer, "{}", i).unwrap();
        }
        writer.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "4\n");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_existing_lines_count_toward_rotation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports.jsonl");
        fs::write(&path, "a\nb\n").unwrap();

        let mut writer = RotatingFile::open(&path, 3, 2).unwrap();
        assert_eq!(writer.records(), 2);
        writeln!(writer, "c").unwrap();
        writeln!(writer, "d").unwrap();
        writer.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "d\n");
        assert_eq!(fs::read_to_string(writer.rotated_path(1)).unwrap(), "a\nb\nc\n");
    }

    #[test]
    fn test_zero_limits_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports.jsonl");
        assert!(RotatingFile::open(&path, 0, 5).is_err());
        assert!(RotatingFile::open(&path, 5, 0).is_err());
    }
}
