use std::fmt::{Display, Formatter};

use bytes::Bytes;

/// One frame exactly as `raspiyuv` wrote it on stdout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFrame {
    data: Vec<u8>,
    partial: bool,
}

impl RawFrame {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            partial: false,
        }
    }

    /// A frame cut short by the end of the stream.
    pub(crate) fn new_partial(data: Vec<u8>) -> Self {
        Self {
            data,
            partial: true,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Set only when the capture stream closed mid-frame. The bytes are what
    /// was read before the end and must not be decoded as a full frame.
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.data)
    }
}

impl AsRef<[u8]> for RawFrame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl Display for RawFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "RawFrame {{ data: {}, partial: {} }}",
            self.data.len(),
            self.partial
        )
    }
}
