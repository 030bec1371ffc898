use std::collections::HashMap;

use markerpose_image::{Image, ImageSize};

use crate::error::ArucoError;

/// The predefined dictionaries, numbered like the OpenCV `PREDEFINED_DICTIONARY_NAME` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredefinedDictionary {
    /// 50 markers of 4x4 bits (`DICT_4X4_50 = 0`).
    Dict4x4_50,
    /// 100 markers of 4x4 bits (`DICT_4X4_100 = 1`).
    Dict4x4_100,
}

impl TryFrom<i32> for PredefinedDictionary {
    type Error = ArucoError;

    fn try_from(id: i32) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(Self::Dict4x4_50),
            1 => Ok(Self::Dict4x4_100),
            2..=20 => Err(ArucoError::InvalidConfig(format!(
                "dictionary id {id} is not supported, use 0 (4X4_50) or 1 (4X4_100)"
            ))),
            _ => Err(ArucoError::InvalidConfig(format!(
                "unknown dictionary id {id}"
            ))),
        }
    }
}

/// A marker codebook.
///
/// Each code stores the payload cells in row-major order, least significant
/// bit first, with a set bit for a white cell.
#[derive(Debug, Clone)]
pub struct Dictionary {
    kind: PredefinedDictionary,
    marker_size: usize,
    max_correction_bits: u32,
    codes: &'static [u64],
    // every rotation of every code, to (id, clockwise quarter turns)
    lookup: HashMap<u64, (u32, usize)>,
}

impl PartialEq for Dictionary {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Dictionary {
    /// Create one of the predefined dictionaries.
    pub fn new(kind: PredefinedDictionary) -> Self {
        let (codes, marker_size, max_correction_bits): (&'static [u64], usize, u32) = match kind {
            PredefinedDictionary::Dict4x4_50 => (&ARUCO_4X4_CODES[..50], 4, 1),
            PredefinedDictionary::Dict4x4_100 => (&ARUCO_4X4_CODES[..], 4, 1),
        };

        let mut lookup = HashMap::with_capacity(codes.len() * 4);
        for (id, &code) in codes.iter().enumerate() {
            let mut rotated = code;
            for turns in 0..4 {
                lookup.entry(rotated).or_insert((id as u32, turns));
                rotated = rotate_code_90(rotated, marker_size);
            }
        }

        Self {
            kind,
            marker_size,
            max_correction_bits,
            codes,
            lookup,
        }
    }

    /// Create a dictionary from its OpenCV numeric identifier.
    ///
    /// # Errors
    ///
    /// Fails with [`ArucoError::InvalidConfig`] for identifiers other than 0 and 1.
    pub fn from_id(id: i32) -> Result<Self, ArucoError> {
        Ok(Self::new(PredefinedDictionary::try_from(id)?))
    }

    /// The dictionary kind.
    pub fn kind(&self) -> PredefinedDictionary {
        self.kind
    }

    /// The number of payload cells per marker side.
    pub fn marker_size(&self) -> usize {
        self.marker_size
    }

    /// The number of bits that can be corrected at most.
    pub fn max_correction_bits(&self) -> u32 {
        self.max_correction_bits
    }

    /// The number of markers.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether the dictionary holds no marker.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// The code of a marker.
    pub fn code(&self, id: u32) -> Option<u64> {
        self.codes.get(id as usize).copied()
    }

    /// Identify an observed payload.
    ///
    /// # Arguments
    ///
    /// * `bits` - The observed payload, in the same layout as the codes.
    /// * `max_distance` - The maximum number of differing bits.
    ///
    /// # Returns
    ///
    /// The marker id and the number of clockwise quarter turns of the
    /// observation relative to the canonical marker.
    pub fn identify(&self, bits: u64, max_distance: u32) -> Option<(u32, usize)> {
        if let Some(&found) = self.lookup.get(&bits) {
            return Some(found);
        }
        if max_distance == 0 {
            return None;
        }

        let mut best: Option<(u32, (u32, usize))> = None;
        for (&rotated, &entry) in self.lookup.iter() {
            let distance = (rotated ^ bits).count_ones();
            if distance > max_distance {
                continue;
            }
            // ties resolve to the lowest id
            let better = match best {
                None => true,
                Some((d, (id, _))) => distance < d || (distance == d && entry.0 < id),
            };
            if better {
                best = Some((distance, entry));
            }
        }
        best.map(|(_, entry)| entry)
    }

    /// Render a marker with a one cell wide black border.
    ///
    /// # Arguments
    ///
    /// * `id` - The marker id.
    /// * `side_pixels` - The side of the output image in pixels.
    ///
    /// # Errors
    ///
    /// Fails with [`ArucoError::InvalidConfig`] if the id is out of range or the
    /// image cannot hold one pixel per cell.
    pub fn render_marker(&self, id: u32, side_pixels: usize) -> Result<Image<u8, 1>, ArucoError> {
        let code = self.code(id).ok_or_else(|| {
            ArucoError::InvalidConfig(format!(
                "marker id {id} is out of range for a dictionary of {} markers",
                self.len()
            ))
        })?;

        let cells = self.marker_size + 2;
        if side_pixels < cells {
            return Err(ArucoError::InvalidConfig(format!(
                "a marker needs at least {cells} pixels per side, got {side_pixels}"
            )));
        }

        let size = ImageSize {
            width: side_pixels,
            height: side_pixels,
        };
        let mut data = vec![0u8; size.area()];
        for (y, row) in data.chunks_exact_mut(side_pixels).enumerate() {
            let cy = y * cells / side_pixels;
            for (x, pixel) in row.iter_mut().enumerate() {
                let cx = x * cells / side_pixels;
                if cx == 0 || cy == 0 || cx == cells - 1 || cy == cells - 1 {
                    continue;
                }
                let bit = (cy - 1) * self.marker_size + (cx - 1);
                if (code >> bit) & 1 == 1 {
                    *pixel = 255;
                }
            }
        }

        Ok(Image::new(size, data)?)
    }
}

/// Rotate a square bit pattern by a clockwise quarter turn.
///
/// The cell at `(x, y)` moves to `(side - 1 - y, x)`.
pub fn rotate_code_90(code: u64, side: usize) -> u64 {
    let mut out = 0u64;
    for y in 0..side {
        for x in 0..side {
            if (code >> (y * side + x)) & 1 == 1 {
                let (nx, ny) = (side - 1 - y, x);
                out |= 1u64 << (ny * side + nx);
            }
        }
    }
    out
}

/// ArUco 4x4 codes; `DICT_4X4_50` uses the first 50 entries.
#[rustfmt::skip]
const ARUCO_4X4_CODES: [u64; 100] = [
    0x4cad, 0x59f0, 0xb4cc, 0x6299, 0x792a, 0xb39e, 0x7479, 0x4f23,
    0x5b7f, 0x6af3, 0x899f, 0xe588, 0xed70, 0xf054, 0x8d24, 0x7c64,
    0xa662, 0x0066, 0x7a36, 0xf56e, 0xd161, 0xd40d, 0xab33, 0x41bb,
    0xe27f, 0x8e29, 0x2735, 0x2aa5, 0xc484, 0xf62c, 0xa822, 0x4dea,
    0xf379, 0xd30f, 0x7510, 0x9490, 0xae18, 0xff20, 0x6fb0, 0x5a38,
    0x18e8, 0x1454, 0x314c, 0x4d1c, 0x1724, 0xd774, 0xfcb4, 0x26d2,
    0x740a, 0xc80a, 0x298a, 0x16aa, 0x82ba, 0xe9fa, 0x8016, 0xe616,
    0x2486, 0x9786, 0x48d6, 0xa7f6, 0xfbe6, 0xd87e, 0x0501, 0x22c1,
    0x45d1, 0x5ec9, 0x3621, 0x54a1, 0x39a1, 0x9139, 0x85f9, 0x3edd,
    0x203d, 0xda6d, 0x13fd, 0xd5ed, 0xf853, 0x4693, 0x1a9b, 0xabcb,
    0x1933, 0x05e3, 0xeca3, 0xba97, 0xa49f, 0xdddf, 0x5477, 0xb2ef,
    0xaeac, 0xb551, 0xe86e, 0xf350, 0xd260, 0x83b4, 0x1b92, 0x2fc2,
    0x6cf2, 0xcbf2, 0x2796, 0xe30e,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_id() -> Result<(), ArucoError> {
        assert_eq!(Dictionary::from_id(0)?.len(), 50);
        assert_eq!(Dictionary::from_id(1)?.len(), 100);
        assert!(matches!(
            Dictionary::from_id(16),
            Err(ArucoError::InvalidConfig(_))
        ));
        assert!(matches!(
            Dictionary::from_id(-1),
            Err(ArucoError::InvalidConfig(_))
        ));
        Ok(())
    }

    #[test]
    fn rotate_four_times_is_identity() {
        for &code in ARUCO_4X4_CODES.iter() {
            let mut rotated = code;
            for _ in 0..4 {
                rotated = rotate_code_90(rotated, 4);
            }
            assert_eq!(rotated, code);
        }
    }

    #[test]
    fn rotate_moves_top_left_to_top_right() {
        assert_eq!(rotate_code_90(0b1, 4), 0b1000);
    }

    #[test]
    fn identify_rotations() {
        let dict = Dictionary::new(PredefinedDictionary::Dict4x4_50);
        for id in [0u32, 7, 23, 49] {
            let mut bits = dict.code(id).unwrap_or_default();
            for turns in 0..4 {
                assert_eq!(dict.identify(bits, 0), Some((id, turns)));
                bits = rotate_code_90(bits, 4);
            }
        }
    }

    #[test]
    fn identify_with_errors() {
        let dict = Dictionary::new(PredefinedDictionary::Dict4x4_100);
        let code = dict.code(12).unwrap_or_default();
        let flipped = code ^ (1 << 5);
        assert_eq!(dict.identify(flipped, 0), None);
        assert_eq!(dict.identify(flipped, 1).map(|(_, t)| t), Some(0));
    }

    #[test]
    fn render_marker_layout() -> Result<(), ArucoError> {
        let dict = Dictionary::from_id(0)?;
        let marker = dict.render_marker(0, 60)?;
        assert_eq!(marker.width(), 60);

        // border
        assert_eq!(marker.get_pixel(0, 0, 0)?, 0);
        assert_eq!(marker.get_pixel(59, 30, 0)?, 0);

        // first payload row of id 0 is white, black, white, white
        let code = dict.code(0).unwrap_or_default();
        assert_eq!(code & 0xf, 0b1101);
        assert_eq!(marker.get_pixel(15, 15, 0)?, 255);
        assert_eq!(marker.get_pixel(25, 15, 0)?, 0);
        assert_eq!(marker.get_pixel(35, 15, 0)?, 255);
        assert_eq!(marker.get_pixel(45, 15, 0)?, 255);

        assert!(dict.render_marker(50, 60).is_err());
        assert!(dict.render_marker(0, 5).is_err());
        Ok(())
    }
}
