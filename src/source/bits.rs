//! Packed bit buffer produced by entropy sources.

/// A sequence of random bits with an exact bit length.
///
/// Bits are packed most-significant-first: bit 0 is the high bit of the
/// first byte. Any padding bits in the final byte are always zero.
#[derive(Clone, PartialEq, Eq)]
pub struct BitString {
    /// Packed bytes, `ceil(len / 8)` of them.
    data: Vec<u8>,
    /// Number of meaningful bits.
    len: usize,
}

impl BitString {
    /// Creates a bit string from whole bytes.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let len = data.len() * 8;
        Self { data, len }
    }

    /// Creates a bit string holding the first `len` bits of `data`.
    ///
    /// Surplus bytes are dropped and trailing padding bits are cleared.
    ///
    /// # Panics
    ///
    /// Panics if `data` holds fewer than `len` bits.
    pub fn from_bytes_truncated(mut data: Vec<u8>, len: usize) -> Self {
        assert!(data.len() * 8 >= len, "buffer too short for {} bits", len);
        data.truncate(len.div_ceil(8));
        let spare = data.len() * 8 - len;
        if spare > 0 {
            if let Some(last) = data.last_mut() {
                *last &= 0xFF << spare;
            }
        }
        Self { data, len }
    }

    /// Collects individual bits into a packed bit string.
    pub fn from_bits<I: IntoIterator<Item = bool>>(bits: I) -> Self {
        let mut data = Vec::new();
        let mut len = 0;
        for bit in bits {
            if len % 8 == 0 {
                data.push(0);
            }
            if bit {
                data[len / 8] |= 0x80 >> (len % 8);
            }
            len += 1;
        }
        Self { data, len }
    }

    /// Returns the packed bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the number of bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns bit `index`, or `None` past the end.
    #[inline]
    pub fn bit(&self, index: usize) -> Option<bool> {
        (index < self.len).then(|| self.data[index / 8] & (0x80 >> (index % 8)) != 0)
    }

    /// Iterates over the bits in order.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.data[i / 8] & (0x80 >> (i % 8)) != 0)
    }

    /// Copies out `len` bits starting at `start`.
    pub fn slice(&self, start: usize, len: usize) -> BitString {
        let start = start.min(self.len);
        let end = start.saturating_add(len).min(self.len);
        let count = end - start;
        let first = start / 8;
        let shift = start % 8;
        if shift == 0 {
            let bytes = self.data[first..end.div_ceil(8)].to_vec();
            return BitString::from_bytes_truncated(bytes, count);
        }

        // Each output byte straddles two input bytes.
        let bytes = (first..first + count.div_ceil(8))
            .map(|i| {
                let high = self.data[i] << shift;
                let low = self.data.get(i + 1).map_or(0, |b| b >> (8 - shift));
                high | low
            })
            .collect();
        BitString::from_bytes_truncated(bytes, count)
    }

    /// Splits the bits into consecutive groups of `group_len` bits.
    ///
    /// A trailing group shorter than `group_len` is dropped.
    pub fn groups(&self, group_len: usize) -> Vec<BitString> {
        if group_len == 0 {
            return Vec::new();
        }
        (0..self.len / group_len)
            .map(|i| self.slice(i * group_len, group_len))
            .collect()
    }

    /// Appends all bits of `other`.
    pub fn extend(&mut self, other: &BitString) {
        if self.len % 8 == 0 {
            self.data.extend_from_slice(&other.data);
            self.len += other.len;
            return;
        }
        for bit in other.iter() {
            if self.len % 8 == 0 {
                self.data.push(0);
            }
            if bit {
                self.data[self.len / 8] |= 0x80 >> (self.len % 8);
            }
            self.len += 1;
        }
    }

    /// Counts the number of set bits.
    pub fn popcount(&self) -> usize {
        self.data.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Calculates bit bias as deviation from 0.5.
    ///
    /// Returns a value in [-0.5, 0.5] where 0.0 is unbiased.
    pub fn bit_bias(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        (self.popcount() as f64 / self.len as f64) - 0.5
    }

    /// Encodes the bits as a lowercase hexadecimal string.
    ///
    /// The result has exactly `ceil(len / 4)` characters, most significant
    /// nibble first. When `len` is not a multiple of 4 the value is
    /// right-aligned and the leading nibble is padded with zero bits.
    pub fn to_hex(&self) -> String {
        let nibbles = self.len.div_ceil(4);
        let byte_len = self.len.div_ceil(8);
        let lead = byte_len * 8 - self.len;

        let mut aligned = vec![0u8; byte_len];
        for (i, bit) in self.iter().enumerate() {
            if bit {
                let pos = lead + i;
                aligned[pos / 8] |= 0x80 >> (pos % 8);
            }
        }

        let encoded = hex::encode(aligned);
        encoded[encoded.len() - nibbles..].to_string()
    }
}

impl std::fmt::Debug for BitString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitString")
            .field("bits", &self.len)
            .field("bit_bias", &format!("{:.4}", self.bit_bias()))
            .finish()
    }
}
