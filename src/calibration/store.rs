//! # Calibration Store
//!
//! Validated load and verbatim save of [`CalibrationParameters`] to a
//! byte-addressed EEPROM image.
//!
//! Loading is field-wise: every stored field outside its valid range is
//! rejected and the caller's previously held value is kept for it. Saving does
//! no validation at all; a bad value written here is caught on the next load.

use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::params::{CalibrationParameters, RejectedField, STORED_SIZE};
use crate::error::{Result, WheelBridgeError};

/// Offset of the calibration image inside the storage.
pub const CALIBRATION_OFFSET: usize = 0;

/// EEPROM size of an ATmega32U4 board.
pub const DEFAULT_EEPROM_SIZE: usize = 1024;

/// Value of an erased EEPROM byte.
pub const ERASED_BYTE: u8 = 0xFF;

/// Byte-addressed non-volatile storage.
pub trait Storage {
    /// Total number of addressable bytes.
    fn capacity(&self) -> usize;

    /// Fills `buf` from `offset`.
    ///
    /// # Errors
    ///
    /// Returns error if the range exceeds [`Storage::capacity`] or the backend fails
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<()>;

    /// Writes `data` at `offset`.
    ///
    /// # Errors
    ///
    /// Returns error if the range exceeds [`Storage::capacity`] or the backend fails
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<()>;
}

fn check_range(offset: usize, len: usize, capacity: usize) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(WheelBridgeError::Storage(format!(
            "access of {} bytes at offset {} exceeds capacity {}",
            len, offset, capacity
        ))),
    }
}

/// In-memory EEPROM, erased to `0xFF`.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    bytes: Vec<u8>,
}

impl MemoryStorage {
    /// Creates an erased storage of `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![ERASED_BYTE; capacity],
        }
    }

    /// Raw contents, for inspection.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutable raw contents, for planting corrupt images.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(DEFAULT_EEPROM_SIZE)
    }
}

impl Storage for MemoryStorage {
    fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<()> {
        check_range(offset, buf.len(), self.bytes.len())?;
        buf.copy_from_slice(&self.bytes[offset..offset + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        check_range(offset, data.len(), self.bytes.len())?;
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }
}

/// EEPROM image kept in a file.
///
/// A missing file, or bytes past the end of a short file, read as erased.
/// Writes create the file and extend it as needed.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
    capacity: usize,
}

impl FileStorage {
    /// Uses the image at `path` with the given capacity.
    #[must_use]
    pub fn new<P: AsRef<Path>>(path: P, capacity: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            capacity,
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for FileStorage {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<()> {
        check_range(offset, buf.len(), self.capacity)?;
        buf.fill(ERASED_BYTE);

        let mut file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No EEPROM image at {}, reading erased bytes", self.path.display());
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        file.seek(SeekFrom::Start(offset as u64))?;
        let mut filled = 0;
        while filled < buf.len() {
            let n = file.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        check_range(offset, data.len(), self.capacity)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;

        // Pad a short image with erased bytes so the gap reads back as erased
        let len = file.metadata()?.len() as usize;
        if len < offset {
            file.seek(SeekFrom::End(0))?;
            file.write_all(&vec![ERASED_BYTE; offset - len])?;
        }

        file.seek(SeekFrom::Start(offset as u64))?;
        file.write_all(data)?;
        file.sync_all()?;
        Ok(())
    }
}

/// Loads and saves calibration through a [`Storage`].
///
/// # Examples
///
/// ```
/// use wheel_bridge::calibration::params::CalibrationParameters;
/// use wheel_bridge::calibration::store::{CalibrationStore, MemoryStorage};
///
/// let mut store = CalibrationStore::new(MemoryStorage::default());
///
/// // Erased EEPROM: every field is rejected, defaults survive
/// let cal = store.load(&CalibrationParameters::default())?;
/// assert_eq!(cal, CalibrationParameters::default());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct CalibrationStore<S> {
    storage: S,
}

impl<S: Storage> CalibrationStore<S> {
    /// Wraps a storage backend.
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Borrows the backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Mutably borrows the backend.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Reads the stored image and decodes it without validation.
    ///
    /// # Errors
    ///
    /// Returns error if the storage cannot be read
    pub fn read_raw(&mut self) -> Result<CalibrationParameters> {
        let mut image = [0u8; STORED_SIZE];
        self.storage.read(CALIBRATION_OFFSET, &mut image)?;
        Ok(CalibrationParameters::from_bytes(&image))
    }

    /// Loads calibration, falling back to `held` field by field.
    ///
    /// # Arguments
    ///
    /// * `held` - Values currently in use (defaults on first boot)
    ///
    /// # Returns
    ///
    /// `held` with every valid stored field copied over it. Each rejected
    /// field is logged as a warning.
    ///
    /// # Errors
    ///
    /// Returns error only if the storage itself cannot be read
    pub fn load(&mut self, held: &CalibrationParameters) -> Result<CalibrationParameters> {
        let (cal, _) = self.load_with_report(held)?;
        Ok(cal)
    }

    /// Same as [`CalibrationStore::load`], also returning the rejected fields.
    ///
    /// # Errors
    ///
    /// Returns error only if the storage itself cannot be read
    pub fn load_with_report(
        &mut self,
        held: &CalibrationParameters,
    ) -> Result<(CalibrationParameters, Vec<RejectedField>)> {
        let stored = self.read_raw()?;
        let mut cal = *held;
        let rejected = cal.merge_valid(&stored);

        for r in &rejected {
            warn!("Invalid stored value for {}: {}, keeping {}", r.field, r.stored, held.get(r.field));
        }
        info!(
            "Loaded calibration ({} of {} stored fields accepted)",
            super::params::FIELD_COUNT - rejected.len(),
            super::params::FIELD_COUNT
        );

        Ok((cal, rejected))
    }

    /// Writes `cal` verbatim.
    ///
    /// # Errors
    ///
    /// Returns error if the storage cannot be written
    pub fn save(&mut self, cal: &CalibrationParameters) -> Result<()> {
        self.storage.write(CALIBRATION_OFFSET, &cal.to_bytes())?;
        info!("Saved calibration to persistent storage");
        Ok(())
    }
}
