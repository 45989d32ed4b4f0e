/// Number of encodable ids.
///
/// The color word is `(id << 1) | 1`, so ids need 31 bits.
pub const ID_SPACE: u32 = 1 << 31;

/// Color for `id`, as little-endian RGBA8 of `(id << 1) | 1`.
///
/// The low bit marks a hit, so a cleared (all-zero) pixel never decodes to
/// an entity. `id` must be below [`ID_SPACE`].
#[inline]
pub fn encode(id: u32) -> [u8; 4] {
    debug_assert!(id < ID_SPACE, "picking id {id} out of range");
    ((id << 1) | 1).to_le_bytes()
}

/// Id encoded by a picking pixel; `None` for background.
#[inline]
pub fn decode(rgba: [u8; 4]) -> Option<u32> {
    let word = u32::from_le_bytes(rgba);
    (word & 1 == 1).then_some(word >> 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_across_id_space() {
        for id in [0, 1, 2, 255, 256, 65_535, (1 << 24) + 7, (1 << 30) - 1, 1 << 30, ID_SPACE - 1] {
            assert_eq!(decode(encode(id)), Some(id), "id {id}");
        }
    }

    #[test]
    fn background_is_no_hit() {
        assert_eq!(decode([0, 0, 0, 0]), None);
        assert_eq!(decode([2, 0, 0, 0]), None);
        assert_eq!(encode(0), [1, 0, 0, 0]);
        assert_eq!(encode(1), [3, 0, 0, 0]);
    }
}
