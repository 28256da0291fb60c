/// An embedded texture.
///
/// Two storage layouts share one struct, discriminated by `height`:
///
/// - `height == 0`: `data` holds a compressed blob (PNG, JPEG, ...) of
///   exactly `width` bytes; `format_hint` names the container.
/// - `height != 0`: `data` holds raw RGBA pixels, `width * height * 4` bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Lowercase container hint for compressed textures ("png", "jpg", ...).
    pub format_hint: String,
}

impl Texture {
    #[inline]
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.height == 0
    }

    /// Byte length `data` must have for the stored dimensions.
    #[inline]
    #[must_use]
    pub fn expected_data_len(&self) -> usize {
        if self.is_compressed() {
            self.width as usize
        } else {
            self.width as usize * self.height as usize * 4
        }
    }
}
