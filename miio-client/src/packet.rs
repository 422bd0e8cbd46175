//! miio packet framing and payload encryption
//!
//! Every packet starts with a 32-byte header:
//!
//! ```text
//!  0      2      4          8           12      16                 32
//!  +------+------+----------+-----------+-------+------------------+
//!  |2131  |len   | unknown  | device id | stamp | md5 checksum     | payload...
//!  +------+------+----------+-----------+-------+------------------+
//! ```
//!
//! The payload is AES-128-CBC encrypted JSON. The key is `md5(token)` and
//! the IV is `md5(key ++ token)`. The checksum covers the first half of the
//! header, the token and the encrypted payload.

use std::fmt;
use std::str::FromStr;

use aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;

use crate::error::MiioError;

/// Size of the fixed packet header
pub const HEADER_LEN: usize = 32;

const MAGIC: [u8; 2] = [0x21, 0x31];
const BLOCK_LEN: usize = 16;

/// Device token, with the derived AES key and IV
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    bytes: [u8; 16],
    key: [u8; 16],
    iv: [u8; 16],
}

impl Token {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        let key = md5::compute(bytes).0;
        let mut ctx = md5::Context::new();
        ctx.consume(key);
        ctx.consume(bytes);
        let iv = ctx.compute().0;
        Self { bytes, key, iv }
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.bytes
    }

    /// Encrypt a plaintext payload (PKCS#7 padded)
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let cipher = Aes128::new(GenericArray::from_slice(&self.key));
        let padding = BLOCK_LEN - plaintext.len() % BLOCK_LEN;
        let mut padded = plaintext.to_vec();
        padded.extend(std::iter::repeat(padding as u8).take(padding));

        let mut out = Vec::with_capacity(padded.len());
        let mut previous = self.iv;
        for chunk in padded.chunks(BLOCK_LEN) {
            let mut block = [0u8; BLOCK_LEN];
            for (i, byte) in block.iter_mut().enumerate() {
                *byte = chunk[i] ^ previous[i];
            }
            let mut block = GenericArray::clone_from_slice(&block);
            cipher.encrypt_block(&mut block);
            out.extend_from_slice(&block);
            previous.copy_from_slice(&block);
        }
        out
    }

    /// Decrypt an encrypted payload and strip its padding
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, MiioError> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
            return Err(MiioError::Protocol(format!(
                "ciphertext length {} is not a multiple of {}",
                ciphertext.len(),
                BLOCK_LEN
            )));
        }

        let cipher = Aes128::new(GenericArray::from_slice(&self.key));
        let mut out = Vec::with_capacity(ciphertext.len());
        let mut previous = self.iv;
        for chunk in ciphertext.chunks(BLOCK_LEN) {
            let mut block = GenericArray::clone_from_slice(chunk);
            cipher.decrypt_block(&mut block);
            for (i, byte) in block.iter().enumerate() {
                out.push(byte ^ previous[i]);
            }
            previous.copy_from_slice(chunk);
        }

        let padding = out.last().copied().unwrap_or(0) as usize;
        if padding == 0
            || padding > BLOCK_LEN
            || out[out.len() - padding..].iter().any(|&b| b as usize != padding)
        {
            return Err(MiioError::Protocol("invalid payload padding".to_string()));
        }
        out.truncate(out.len() - padding);
        Ok(out)
    }

    fn checksum(&self, header: &[u8], encrypted: &[u8]) -> [u8; 16] {
        let mut ctx = md5::Context::new();
        ctx.consume(&header[..16]);
        ctx.consume(self.bytes);
        ctx.consume(encrypted);
        ctx.compute().0
    }
}

impl FromStr for Token {
    type Err = MiioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = hex::decode(s.trim()).map_err(|e| MiioError::InvalidToken(e.to_string()))?;
        let bytes: [u8; 16] = decoded.try_into().map_err(|v: Vec<u8>| {
            MiioError::InvalidToken(format!("expected 16 bytes, got {}", v.len()))
        })?;
        Ok(Self::from_bytes(bytes))
    }
}

// Never print the secret.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(..)")
    }
}

/// Decoded header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub length: u16,
    pub unknown: u32,
    pub device_id: u32,
    pub stamp: u32,
}

/// A decoded packet: header plus decrypted payload (empty for hello replies)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: Header,
    pub payload: Vec<u8>,
}

/// The discovery/handshake packet
pub fn hello_packet() -> [u8; HEADER_LEN] {
    let mut packet = [0xFFu8; HEADER_LEN];
    packet[..2].copy_from_slice(&MAGIC);
    packet[2..4].copy_from_slice(&(HEADER_LEN as u16).to_be_bytes());
    packet
}

/// Parse the fixed header without touching the payload
pub fn parse_header(buf: &[u8]) -> Result<Header, MiioError> {
    if buf.len() < HEADER_LEN {
        return Err(MiioError::Protocol(format!(
            "packet too short: {} bytes",
            buf.len()
        )));
    }
    if buf[..2] != MAGIC {
        return Err(MiioError::Protocol(format!(
            "bad magic {:02x}{:02x}",
            buf[0], buf[1]
        )));
    }

    let length = u16::from_be_bytes([buf[2], buf[3]]);
    if length as usize != buf.len() {
        return Err(MiioError::Protocol(format!(
            "length field {} does not match packet size {}",
            length,
            buf.len()
        )));
    }

    Ok(Header {
        length,
        unknown: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
        device_id: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
        stamp: u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]),
    })
}

/// Build an encrypted packet carrying `payload`
pub fn encode(token: &Token, device_id: u32, stamp: u32, payload: &[u8]) -> Vec<u8> {
    let encrypted = token.encrypt(payload);
    let length = (HEADER_LEN + encrypted.len()) as u16;

    let mut packet = Vec::with_capacity(length as usize);
    packet.extend_from_slice(&MAGIC);
    packet.extend_from_slice(&length.to_be_bytes());
    packet.extend_from_slice(&0u32.to_be_bytes());
    packet.extend_from_slice(&device_id.to_be_bytes());
    packet.extend_from_slice(&stamp.to_be_bytes());

    let checksum = token.checksum(&packet, &encrypted);
    packet.extend_from_slice(&checksum);
    packet.extend_from_slice(&encrypted);
    packet
}

/// Verify and decrypt a received packet
pub fn decode(token: &Token, buf: &[u8]) -> Result<Packet, MiioError> {
    let header = parse_header(buf)?;
    if buf.len() == HEADER_LEN {
        return Ok(Packet {
            header,
            payload: Vec::new(),
        });
    }

    let encrypted = &buf[HEADER_LEN..];
    if token.checksum(buf, encrypted) != buf[16..HEADER_LEN] {
        return Err(MiioError::Protocol("checksum mismatch".to_string()));
    }

    let mut payload = token.decrypt(encrypted)?;
    // Some firmwares NUL-terminate the JSON.
    while payload.last() == Some(&0) {
        payload.pop();
    }

    Ok(Packet { header, payload })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const TOKEN: &str = "00112233445566778899aabbccddeeff";

    fn token() -> Token {
        TOKEN.parse().unwrap()
    }

    #[test]
    fn test_hello_packet_layout() {
        let hello = hello_packet();
        assert_eq!(&hello[..4], &[0x21, 0x31, 0x00, 0x20]);
        assert!(hello[4..].iter().all(|&b| b == 0xFF));
    }

    #[rstest]
    #[case("")]
    #[case("0011")]
    #[case("zz112233445566778899aabbccddeeff")]
    #[case("00112233445566778899aabbccddeeff00")]
    fn test_invalid_tokens_rejected(#[case] input: &str) {
        assert!(matches!(
            input.parse::<Token>(),
            Err(MiioError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_token_debug_hides_secret() {
        assert_eq!(format!("{:?}", token()), "Token(..)");
    }

    #[test]
    fn test_encrypt_pads_to_block_size() {
        let token = token();
        assert_eq!(token.encrypt(b"").len(), 16);
        assert_eq!(token.encrypt(&[1u8; 15]).len(), 16);
        assert_eq!(token.encrypt(&[1u8; 16]).len(), 32);
    }

    #[test]
    fn test_encode_then_decode_recovers_payload() {
        let token = token();
        let payload = br#"{"id":1,"method":"get_prop","params":["power"]}"#;
        let packet = encode(&token, 0x0102_0304, 77, payload);

        let decoded = decode(&token, &packet).unwrap();
        assert_eq!(decoded.header.device_id, 0x0102_0304);
        assert_eq!(decoded.header.stamp, 77);
        assert_eq!(decoded.header.length as usize, packet.len());
        assert_eq!(decoded.payload, payload.to_vec());
    }

    #[test]
    fn test_decode_rejects_tampered_payload() {
        let token = token();
        let mut packet = encode(&token, 1, 1, b"{}");
        let last = packet.len() - 1;
        packet[last] ^= 0x01;

        match decode(&token, &packet) {
            Err(MiioError::Protocol(msg)) => assert!(msg.contains("checksum")),
            other => panic!("expected checksum error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_wrong_token() {
        let packet = encode(&token(), 1, 1, b"{}");
        let other: Token = "ffeeddccbbaa99887766554433221100".parse().unwrap();
        assert!(decode(&other, &packet).is_err());
    }

    #[test]
    fn test_parse_header_checks_magic_and_length() {
        let mut hello = hello_packet();
        hello[0] = 0x00;
        assert!(matches!(parse_header(&hello), Err(MiioError::Protocol(_))));

        let hello = hello_packet();
        assert!(parse_header(&hello[..20]).is_err());

        let mut long = hello.to_vec();
        long.push(0);
        assert!(parse_header(&long).is_err());
    }

    #[test]
    fn test_decode_strips_trailing_nul() {
        let token = token();
        let packet = encode(&token, 1, 1, b"{\"id\":3}\0");
        assert_eq!(decode(&token, &packet).unwrap().payload, b"{\"id\":3}".to_vec());
    }
}
