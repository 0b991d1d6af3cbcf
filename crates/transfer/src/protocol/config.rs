/// Default capacity reserved for each read from the transport
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Maximum size in bytes allowed for a trailer section
pub const MAX_TRAILER_BYTES: usize = 8 * 1024;

/// Maximum number of trailer fields allowed after the last chunk
pub const MAX_TRAILER_NUM: usize = 64;

/// Tunables for reading a message body.
///
/// The defaults match the limits used for the header section of a message,
/// so a trailer can never be larger than a header block.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BodyConfig {
    read_buffer_size: usize,
    max_trailer_bytes: usize,
    max_trailer_fields: usize,
}

impl BodyConfig {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    pub fn max_trailer_bytes(mut self, bytes: usize) -> Self {
        self.max_trailer_bytes = bytes;
        self
    }

    pub fn max_trailer_fields(mut self, fields: usize) -> Self {
        self.max_trailer_fields = fields;
        self
    }

    #[inline]
    pub fn get_read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    #[inline]
    pub fn get_max_trailer_bytes(&self) -> usize {
        self.max_trailer_bytes
    }

    #[inline]
    pub fn get_max_trailer_fields(&self) -> usize {
        self.max_trailer_fields
    }
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_trailer_bytes: MAX_TRAILER_BYTES,
            max_trailer_fields: MAX_TRAILER_NUM,
        }
    }
}
