use alloy_primitives::Bytes;
use alloy_rlp::{BufMut, Decodable, Encodable, Header};

/// A complete RLP item kept in its encoded form.
///
/// Block headers, block bodies and transactions are relayed without being
/// interpreted, so they are carried as raw items and re-emitted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RawRlp(pub Bytes);

impl RawRlp {
    /// Wrap an already encoded RLP item.
    pub fn new(encoded: impl Into<Bytes>) -> Self {
        RawRlp(encoded.into())
    }

    /// Encode a value and keep the resulting bytes.
    pub fn from_value<T: Encodable>(value: &T) -> Self {
        RawRlp(Bytes::from(alloy_rlp::encode(value)))
    }

    /// The encoded item.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Encodable for RawRlp {
    fn encode(&self, out: &mut dyn BufMut) {
        out.put_slice(&self.0);
    }

    fn length(&self) -> usize {
        self.0.len()
    }
}

impl Decodable for RawRlp {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let start = *buf;
        let header = Header::decode(buf)?;
        let header_len = start.len() - buf.len();
        let total = header_len + header.payload_length;
        if start.len() < total {
            return Err(alloy_rlp::Error::InputTooShort);
        }
        *buf = &start[total..];
        Ok(RawRlp(Bytes::from(start[..total].to_vec())))
    }
}
