//! Persisted registration image
//!
//! Stored with postcard at offset 0 of the byte store and validated by
//! magic, version and CRC32 before it is trusted.

use serde::{Deserialize, Serialize};
use unimod_hal::{ByteStore, StoreError};
use unimod_protocol::{NO_SENSOR_REGISTERED, SENSOR_KINDS};

/// Magic number to identify a registration image
pub const IMAGE_MAGIC: u32 = 0x554E_4952; // "UNIR"

/// Current image format version
pub const IMAGE_VERSION: u8 = 1;

/// Upper bound on the serialized image
pub const MAX_IMAGE_SIZE: usize = 48;

/// Store offset of the image
const IMAGE_OFFSET: usize = 0;

/// Registration persistence errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PersistError {
    /// Store operation failed
    Store(StoreError),
    /// Serialization failed
    Serialize,
    /// Deserialization failed (erased or foreign data)
    Deserialize,
    /// Invalid magic or version
    InvalidFormat,
    /// CRC check failed
    CrcMismatch,
    /// Built-in sensor counts differ from the running firmware
    SchemaMismatch,
}

impl From<StoreError> for PersistError {
    fn from(e: StoreError) -> Self {
        PersistError::Store(e)
    }
}

/// Registration state as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegistrationImage {
    /// Magic number for validation
    pub magic: u32,
    /// Data format version
    pub version: u8,
    /// Built-in counts at save time, the schema
    pub hardcoded: [u8; SENSOR_KINDS],
    /// Highest registered universal index per type, or [`NO_SENSOR_REGISTERED`]
    pub high_water: [u8; SENSOR_KINDS],
    pub rf_channel: u8,
    /// CRC32 checksum (calculated over magic..rf_channel)
    pub crc: u32,
}

impl RegistrationImage {
    /// Build an image with a valid CRC
    pub fn new(hardcoded: [u8; SENSOR_KINDS], high_water: [u8; SENSOR_KINDS], rf_channel: u8) -> Self {
        let mut image = Self {
            magic: IMAGE_MAGIC,
            version: IMAGE_VERSION,
            hardcoded,
            high_water,
            rf_channel,
            crc: 0,
        };
        image.update_crc();
        image
    }

    /// Check if magic and version match
    pub fn is_valid(&self) -> bool {
        self.magic == IMAGE_MAGIC && self.version == IMAGE_VERSION
    }

    /// Universal sensor counts this image describes
    ///
    /// Fails if a high-water mark lies inside the built-in range.
    pub fn uni_counts(&self) -> Result<[u8; SENSOR_KINDS], PersistError> {
        let mut counts = [0u8; SENSOR_KINDS];
        for (i, count) in counts.iter_mut().enumerate() {
            let mark = self.high_water[i];
            if mark == NO_SENSOR_REGISTERED {
                continue;
            }
            if mark < self.hardcoded[i] {
                return Err(PersistError::InvalidFormat);
            }
            *count = mark - self.hardcoded[i] + 1;
        }
        Ok(counts)
    }

    /// Calculate CRC32 (excluding the crc field itself)
    pub fn calculate_crc(&self) -> u32 {
        let mut crc: u32 = 0xFFFFFFFF;
        crc = crc32_update(crc, &self.magic.to_le_bytes());
        crc = crc32_update(crc, &[self.version]);
        crc = crc32_update(crc, &self.hardcoded);
        crc = crc32_update(crc, &self.high_water);
        crc = crc32_update(crc, &[self.rf_channel]);
        !crc
    }

    /// Update the CRC field
    pub fn update_crc(&mut self) {
        self.crc = self.calculate_crc();
    }

    /// Verify the CRC is correct
    pub fn verify_crc(&self) -> bool {
        self.crc == self.calculate_crc()
    }
}

/// Load and validate the image
///
/// Schema is not checked here; the dispatcher compares it with its own
/// built-in counts.
pub fn load_image<S: ByteStore + ?Sized>(store: &mut S) -> Result<RegistrationImage, PersistError> {
    let mut buffer = [0u8; MAX_IMAGE_SIZE];
    let len = MAX_IMAGE_SIZE.min(store.capacity().saturating_sub(IMAGE_OFFSET));
    store.read(IMAGE_OFFSET, &mut buffer[..len])?;

    let image: RegistrationImage =
        postcard::from_bytes(&buffer[..len]).map_err(|_| PersistError::Deserialize)?;

    if !image.is_valid() {
        return Err(PersistError::InvalidFormat);
    }

    if !image.verify_crc() {
        warn!("registration image CRC mismatch");
        return Err(PersistError::CrcMismatch);
    }

    Ok(image)
}

/// Save the image, updating its CRC first
pub fn save_image<S: ByteStore + ?Sized>(
    store: &mut S,
    image: &mut RegistrationImage,
) -> Result<(), PersistError> {
    image.update_crc();

    let mut buffer = [0u8; MAX_IMAGE_SIZE];
    let bytes = postcard::to_slice(image, &mut buffer).map_err(|_| PersistError::Serialize)?;

    debug!("saving {=usize} bytes of registration image", bytes.len());
    store.write(IMAGE_OFFSET, bytes)?;
    Ok(())
}

/// Simple CRC32 update function (IEEE 802.3 polynomial)
fn crc32_update(crc: u32, data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB88320;
    let mut crc = crc;

    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}
