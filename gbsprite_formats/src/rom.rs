use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use byteorder::{LittleEndian, ReadBytesExt};
use memmap2::{Mmap, MmapOptions};

/// Size of one switchable ROM bank.
pub const BANK_SIZE: usize = 0x4000;

const TITLE_RANGE: std::ops::Range<usize> = 0x134..0x144;

/// Flat file offset of a CPU address as seen with `bank` mapped into
/// 0x4000..0x8000. Addresses outside that window are returned unchanged.
pub fn absolute_address(bank: u8, address: u16) -> usize {
    let address = address as usize;
    if (BANK_SIZE..BANK_SIZE * 2).contains(&address) {
        bank as usize * BANK_SIZE + (address - BANK_SIZE)
    } else {
        address
    }
}

/// Read-only view of a cartridge dump.
#[derive(Debug)]
pub struct RomImage {
    path: PathBuf,
    mmap: Mmap,
}

impl RomImage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let file = File::open(&path_buf)
            .with_context(|| format!("opening ROM image at {}", path_buf.display()))?;
        let mmap = unsafe { MmapOptions::new().map(&file) }
            .with_context(|| format!("memory-mapping ROM image {}", path_buf.display()))?;

        Ok(RomImage {
            path: path_buf,
            mmap,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.mmap
    }

    /// Cartridge title from the header, with trailing NULs removed.
    pub fn title(&self) -> Option<String> {
        let raw = self.mmap.get(TITLE_RANGE)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        (end > 0).then(|| String::from_utf8_lossy(&raw[..end]).into_owned())
    }

    /// Everything from the banked `address` to the end of the image.
    pub fn slice_at(&self, bank: u8, address: u16) -> Result<&[u8]> {
        let offset = absolute_address(bank, address);
        ensure!(
            offset < self.mmap.len(),
            "address {bank:02x}:{address:04x} (offset {offset:#x}) is beyond the {} byte ROM",
            self.mmap.len()
        );
        Ok(&self.mmap[offset..])
    }

    /// Little-endian 16-bit pointer stored at the banked `address`.
    pub fn read_pointer(&self, bank: u8, address: u16) -> Result<u16> {
        let mut bytes = self.slice_at(bank, address)?;
        bytes
            .read_u16::<LittleEndian>()
            .with_context(|| format!("reading pointer at {bank:02x}:{address:04x}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn banked_addresses_map_into_the_file() {
        assert_eq!(absolute_address(0, 0x0150), 0x0150);
        assert_eq!(absolute_address(1, 0x4000), 0x4000);
        assert_eq!(absolute_address(0x0c, 0x4a2b), 0x0c * 0x4000 + 0x0a2b);
        assert_eq!(absolute_address(5, 0x7fff), 5 * 0x4000 + 0x3fff);
        assert_eq!(absolute_address(5, 0x8000), 0x8000);
    }

    #[test]
    fn reads_title_and_pointers() {
        let mut data = vec![0u8; BANK_SIZE * 3];
        data[0x134..0x134 + 8].copy_from_slice(b"SPRITES\0");
        // bank 2, 0x4010 -> pointer 0x5678
        let at = 2 * BANK_SIZE + 0x10;
        data[at] = 0x78;
        data[at + 1] = 0x56;
        data[2 * BANK_SIZE + 0x1678] = 0xab;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();

        let rom = RomImage::open(file.path()).unwrap();
        assert_eq!(rom.len(), data.len());
        assert_eq!(rom.title().as_deref(), Some("SPRITES"));
        let pointer = rom.read_pointer(2, 0x4010).unwrap();
        assert_eq!(pointer, 0x5678);
        assert_eq!(rom.slice_at(2, pointer).unwrap()[0], 0xab);
        assert!(rom.slice_at(3, 0x4000).is_err());
        assert!(rom.read_pointer(2, 0x7fff).is_err());
    }
}
