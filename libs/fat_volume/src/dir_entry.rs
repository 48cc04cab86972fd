//! 32-byte short-name directory records.

use core::fmt;

use bitflags::bitflags;
use byteorder::{ByteOrder, LittleEndian};
use chrono::{NaiveDate, NaiveDateTime};

pub const DIR_ENTRY_SIZE: usize = 32;
/// First name byte of a record that ends the directory.
pub const END_OF_DIR: u8 = 0x00;
/// First name byte of a deleted record.
pub const DELETED: u8 = 0xE5;
/// Stand-in for a real leading 0xE5 name byte.
const KANJI_E5: u8 = 0x05;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Attributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN = 0x02;
        const SYSTEM = 0x04;
        const VOLUME_LABEL = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE = 0x20;
        /// Exact value of a long-filename continuation record.
        const LONG_NAME = Self::READ_ONLY.bits() | Self::HIDDEN.bits() | Self::SYSTEM.bits() | Self::VOLUME_LABEL.bits();

        // The image may set any bits
        const _ = !0;
    }
}

// ─── Timestamps ────────────────────────────────────────────────────────────────

/// Packed FAT date: day in bits 0-4, month in 5-8, years since 1980 in 9-15.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl FatDate {
    /// Month is clamped to 1..=12 and day to 1..=31, so a zeroed field still
    /// yields a usable date.
    pub fn from_raw(raw: u16) -> Self {
        Self {
            year: 1980 + (raw >> 9),
            month: (((raw >> 5) & 0x0F) as u8).clamp(1, 12),
            day: ((raw & 0x1F) as u8).clamp(1, 31),
        }
    }

    pub fn to_raw(self) -> u16 {
        (self.year.saturating_sub(1980) << 9) | ((self.month as u16 & 0x0F) << 5) | (self.day as u16 & 0x1F)
    }

    /// `None` when the fields don't name a calendar day (e.g. February 31st).
    pub fn to_naive(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)
    }
}

impl fmt::Display for FatDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Packed FAT date and time plus the creation-only fine field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatDateTime {
    pub date: FatDate,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: u32,
}

impl FatDateTime {
    /// `fine` counts 10 ms units (0-199); 100 and above carry one whole second.
    pub fn from_raw(fine: u8, time: u16, date: u16) -> Self {
        let mut second = ((time & 0x1F) * 2) as u8;
        let mut fine = fine as u32;
        if fine > 99 {
            second += 1;
            fine -= 100;
        }
        Self {
            date: FatDate::from_raw(date),
            hour: ((time >> 11) & 0x1F) as u8,
            minute: ((time >> 5) & 0x3F) as u8,
            second,
            microsecond: fine * 10_000,
        }
    }

    /// `(fine, time, date)` fields for a record.
    pub fn to_raw(self) -> (u8, u16, u16) {
        let fine = (self.second % 2) as u32 * 100 + self.microsecond / 10_000;
        let time = ((self.hour as u16 & 0x1F) << 11)
            | ((self.minute as u16 & 0x3F) << 5)
            | ((self.second / 2) as u16 & 0x1F);
        (fine.min(199) as u8, time, self.date.to_raw())
    }

    pub fn to_naive(self) -> Option<NaiveDateTime> {
        self.date.to_naive()?.and_hms_micro_opt(
            self.hour as u32,
            self.minute as u32,
            self.second as u32,
            self.microsecond,
        )
    }
}

impl fmt::Display for FatDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:02}:{:02}:{:02}", self.date, self.hour, self.minute, self.second)?;
        if self.microsecond != 0 {
            write!(f, ".{:06}", self.microsecond)?;
        }
        Ok(())
    }
}

// ─── Directory entry ───────────────────────────────────────────────────────────

/// One decoded short-name record.
///
/// Built fresh on every directory read; a copy does not see later changes
/// made to the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// `NAME.EXT`, or `NAME` when the extension is blank.
    pub name: String,
    pub attributes: Attributes,
    pub created: FatDateTime,
    pub accessed: FatDate,
    pub modified: FatDateTime,
    pub cluster: u32,
    pub size: u32,
    /// Absolute byte offset of the 32-byte record in the image.
    pub offset: u64,
}

impl DirectoryEntry {
    /// Record with zeroed timestamps (1980-01-01 00:00:00), not yet placed in an image.
    pub fn new(name: &str, attributes: Attributes, cluster: u32, size: u32) -> Self {
        let epoch = FatDateTime::from_raw(0, 0, 0);
        Self {
            name: name.to_string(),
            attributes,
            created: epoch,
            accessed: epoch.date,
            modified: epoch,
            cluster,
            size,
            offset: 0,
        }
    }

    /// Decode one record found at `offset`.
    ///
    /// Long-filename records yield `None`. The high cluster word (bytes 20..22)
    /// is only meaningful on FAT32 and is combined when `wide_clusters` is set.
    pub fn decode(record: &[u8; DIR_ENTRY_SIZE], offset: u64, wide_clusters: bool) -> Option<Self> {
        let attributes = Attributes::from_bits_retain(record[11]);
        if attributes == Attributes::LONG_NAME {
            return None;
        }

        let mut cluster = LittleEndian::read_u16(&record[26..28]) as u32;
        if wide_clusters {
            cluster |= (LittleEndian::read_u16(&record[20..22]) as u32) << 16;
        }

        Some(Self {
            name: normalize_name(record[0..11].try_into().ok()?),
            attributes,
            created: FatDateTime::from_raw(
                record[13],
                LittleEndian::read_u16(&record[14..16]),
                LittleEndian::read_u16(&record[16..18]),
            ),
            accessed: FatDate::from_raw(LittleEndian::read_u16(&record[18..20])),
            modified: FatDateTime::from_raw(
                0,
                LittleEndian::read_u16(&record[22..24]),
                LittleEndian::read_u16(&record[24..26]),
            ),
            cluster,
            size: LittleEndian::read_u32(&record[28..32]),
            offset,
        })
    }

    /// Encode back into a 32-byte record. The name is upper-cased into 8.3 form.
    pub fn to_bytes(&self) -> [u8; DIR_ENTRY_SIZE] {
        let mut record = [0u8; DIR_ENTRY_SIZE];
        record[0..11].copy_from_slice(&pack_name(&self.name));
        record[11] = self.attributes.bits();

        let (fine, time, date) = self.created.to_raw();
        record[13] = fine;
        LittleEndian::write_u16(&mut record[14..16], time);
        LittleEndian::write_u16(&mut record[16..18], date);
        LittleEndian::write_u16(&mut record[18..20], self.accessed.to_raw());
        LittleEndian::write_u16(&mut record[20..22], (self.cluster >> 16) as u16);

        let (_, time, date) = self.modified.to_raw();
        LittleEndian::write_u16(&mut record[22..24], time);
        LittleEndian::write_u16(&mut record[24..26], date);
        LittleEndian::write_u16(&mut record[26..28], self.cluster as u16);
        LittleEndian::write_u32(&mut record[28..32], self.size);
        record
    }

    pub fn is_directory(&self) -> bool {
        self.attributes.contains(Attributes::DIRECTORY)
    }

    pub fn is_volume_label(&self) -> bool {
        self.attributes.contains(Attributes::VOLUME_LABEL)
    }

    /// `.` or `..`
    pub fn is_dot(&self) -> bool {
        self.name == "." || self.name == ".."
    }

    /// Case-insensitive name comparison.
    pub fn matches(&self, name: &str) -> bool {
        names_match(&self.name, name)
    }
}

// ─── Name helpers ──────────────────────────────────────────────────────────────

/// `"README  TXT"` → `"README.TXT"`, `"FOLDER     "` → `"FOLDER"`.
pub fn normalize_name(raw: &[u8; 11]) -> String {
    let mut raw = *raw;
    if raw[0] == KANJI_E5 {
        raw[0] = DELETED;
    }
    let text = |bytes: &[u8]| bytes.iter().map(|&b| char::from(b)).collect::<String>();
    let base = text(&raw[..8]);
    let base = base.trim_matches(' ');
    if raw[8..].iter().all(|&b| b == b' ') {
        return base.to_string();
    }
    let ext = text(&raw[8..]);
    format!("{base}.{}", ext.trim_matches(' '))
}

/// Pack a name into the 11-byte space-padded 8.3 form, upper-casing ASCII.
/// Longer parts are truncated.
pub fn pack_name(name: &str) -> [u8; 11] {
    let mut raw = [b' '; 11];
    if name == "." || name == ".." {
        raw[..name.len()].copy_from_slice(name.as_bytes());
        return raw;
    }
    let (base, ext) = match name.rfind('.') {
        Some(i) => (&name[..i], &name[i + 1..]),
        None => (name, ""),
    };
    let byte = |c: char| u8::try_from(c).unwrap_or(b'_').to_ascii_uppercase();
    for (slot, c) in raw[..8].iter_mut().zip(base.chars()) {
        *slot = byte(c);
    }
    for (slot, c) in raw[8..].iter_mut().zip(ext.chars()) {
        *slot = byte(c);
    }
    if raw[0] == DELETED {
        raw[0] = KANJI_E5;
    }
    raw
}

pub fn names_match(short: &str, query: &str) -> bool {
    short.len() == query.len()
        && short.chars().zip(query.chars()).all(|(a, b)| a.eq_ignore_ascii_case(&b))
}
