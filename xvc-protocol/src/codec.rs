/// Read and write implementations for the protocol messages
use std::io::{self, Read, Write};

use crate::{
    error::ReadError,
    protocol::{Message, Response, Version, XvcInfo},
};

const XVC_INFO_PREFIX: &[u8] = b"xvcServer_v";
const MAX_INFO_LINE: usize = 64;

impl XvcInfo {
    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        writeln!(
            writer,
            "xvcServer_v{}:{}",
            self.version(),
            self.max_vector_len()
        )
    }

    /// Reads a single info line. Bytes following the newline are left in the reader.
    pub fn from_reader(reader: &mut impl Read) -> Result<XvcInfo, ReadError> {
        let mut line = Vec::with_capacity(32);
        let mut byte = [0u8; 1];
        while line.last() != Some(&b'\n') {
            if line.len() == MAX_INFO_LINE {
                return Err(ReadError::InvalidFormat(
                    "Info message is missing its newline".to_string(),
                ));
            }
            reader.read_exact(&mut byte)?;
            line.push(byte[0]);
        }
        XvcInfo::parse(line.trim_ascii_end())
    }

    /// Parses `xvcServer_v{version}:{max_vector_len}` without the trailing newline.
    fn parse(line: &[u8]) -> Result<XvcInfo, ReadError> {
        let line = line.strip_prefix(XVC_INFO_PREFIX).ok_or_else(|| {
            ReadError::InvalidFormat("Invalid prefix in info message".to_string())
        })?;

        let colon_index = line.iter().position(|l| *l == b':').ok_or_else(|| {
            ReadError::InvalidFormat("Missing ':' separator in info message".to_string())
        })?;

        let (version_part, rest) = line.split_at(colon_index);

        let version = match version_part {
            b"1.0" => Version::V1_0,
            _ => {
                return Err(ReadError::UnsupportedVersion(
                    String::from_utf8_lossy(version_part).to_string(),
                ));
            }
        };

        let max_vector_len = str::from_utf8(&rest[1..])?.parse::<u32>()?;

        Ok(XvcInfo::new(version, max_vector_len))
    }
}

#[test]
fn write_server_info() {
    let mut out = Vec::new();
    XvcInfo::default().write_to(&mut out).unwrap();
    assert_eq!(out, b"xvcServer_v1.0:1024\n".to_vec());
}

#[test]
fn read_server_info() {
    let data = b"xvcServer_v1.0:32\nrest";
    let mut cursor = std::io::Cursor::new(data);
    let info = XvcInfo::from_reader(&mut cursor).unwrap();
    assert_eq!(info.version(), Version::V1_0);
    assert_eq!(info.max_vector_len(), 32);
    assert_eq!(cursor.position(), 18);
}

#[test]
fn read_server_info_rejects_unknown_version() {
    let mut cursor = std::io::Cursor::new(b"xvcServer_v2.1:32\n");
    match XvcInfo::from_reader(&mut cursor) {
        Err(ReadError::UnsupportedVersion(v)) => assert_eq!(v, "2.1"),
        other => panic!("expected UnsupportedVersion, got {:?}", other),
    }
}

/// Progress of parsing a message from a buffer prefix.
#[derive(Debug, Eq, PartialEq)]
pub(crate) enum Parsed {
    /// A whole message that occupied the first `len` bytes
    Complete { message: Message, len: usize },
    /// The buffer must hold at least `needed` bytes before parsing can progress
    Incomplete { needed: usize },
}

impl Message {
    const CMD_NAME_GET_INFO: &[u8] = b"getinfo";
    const CMD_NAME_SET_TCK: &[u8] = b"settck";
    const CMD_NAME_SHIFT: &[u8] = b"shift";
    const CMD_DELIMITER: u8 = b':';
    /// Longest command name plus its delimiter
    const MAX_TOKEN_LEN: usize = Self::CMD_NAME_GET_INFO.len() + 1;

    /// Parses the message at the start of `buf`.
    pub(crate) fn parse(buf: &[u8], max_shift_bytes: usize) -> Result<Parsed, ReadError> {
        let window = &buf[..buf.len().min(Self::MAX_TOKEN_LEN)];
        let Some(colon) = window.iter().position(|b| *b == Self::CMD_DELIMITER) else {
            if window.len() == Self::MAX_TOKEN_LEN {
                return Err(ReadError::InvalidCommand(
                    String::from_utf8_lossy(window).to_string(),
                ));
            }
            return Ok(Parsed::Incomplete {
                needed: buf.len() + 1,
            });
        };
        let header_len = colon + 1;
        let payload = &buf[header_len..];

        match &buf[..colon] {
            Self::CMD_NAME_GET_INFO => Ok(Parsed::Complete {
                message: Message::GetInfo,
                len: header_len,
            }),
            Self::CMD_NAME_SET_TCK => match read_u32(payload) {
                Some(period_ns) => Ok(Parsed::Complete {
                    message: Message::SetTck { period_ns },
                    len: header_len + 4,
                }),
                None => Ok(Parsed::Incomplete {
                    needed: header_len + 4,
                }),
            },
            Self::CMD_NAME_SHIFT => {
                let Some(num_bits) = read_u32(payload) else {
                    return Ok(Parsed::Incomplete {
                        needed: header_len + 4,
                    });
                };
                let num_bytes = num_bits.div_ceil(8) as usize;
                if num_bytes > max_shift_bytes {
                    return Err(ReadError::TooManyBytes {
                        max: max_shift_bytes,
                        got: num_bytes,
                    });
                }
                let len = header_len + 4 + 2 * num_bytes;
                if buf.len() < len {
                    return Ok(Parsed::Incomplete { needed: len });
                }
                let vectors = &payload[4..4 + 2 * num_bytes];
                let (tms, tdi) = vectors.split_at(num_bytes);
                Ok(Parsed::Complete {
                    message: Message::Shift {
                        num_bits,
                        tms: tms.into(),
                        tdi: tdi.into(),
                    },
                    len,
                })
            }
            token => Err(ReadError::InvalidCommand(
                String::from_utf8_lossy(token).to_string(),
            )),
        }
    }

    /// Reads exactly one message, blocking until it has fully arrived.
    pub fn from_reader(
        reader: &mut impl Read,
        max_shift_bytes: usize,
    ) -> Result<Message, ReadError> {
        let mut buf = Vec::with_capacity(16);
        loop {
            match Message::parse(&buf, max_shift_bytes)? {
                Parsed::Complete { message, .. } => return Ok(message),
                Parsed::Incomplete { needed } => {
                    let start = buf.len();
                    buf.resize(needed, 0);
                    reader.read_exact(&mut buf[start..])?;
                }
            }
        }
    }

    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        match self {
            Message::GetInfo => {
                writer.write_all(Self::CMD_NAME_GET_INFO)?;
                writer.write_all(&[Self::CMD_DELIMITER])
            }
            Message::SetTck {
                period_ns: period_in_ns,
            } => {
                writer.write_all(Self::CMD_NAME_SET_TCK)?;
                writer.write_all(&[Self::CMD_DELIMITER])?;
                writer.write_all(&period_in_ns.to_le_bytes())
            }
            Message::Shift {
                num_bits,
                tms: tms_vector,
                tdi: tdi_vector,
            } => {
                writer.write_all(Self::CMD_NAME_SHIFT)?;
                writer.write_all(&[Self::CMD_DELIMITER])?;
                writer.write_all(&num_bits.to_le_bytes())?;
                writer.write_all(tms_vector)?;
                writer.write_all(tdi_vector)
            }
        }
    }
}

fn read_u32(buf: &[u8]) -> Option<u32> {
    let bytes: [u8; 4] = buf.get(..4)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

impl Response {
    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        match self {
            Response::Info(info) => info.write_to(writer),
            Response::TckPeriod(period_ns) => writer.write_all(&period_ns.to_le_bytes()),
            Response::Tdo(tdo) => writer.write_all(tdo),
        }
    }
}

#[cfg(test)]
mod test {
    use super::Parsed;
    use crate::error::ReadError;
    use crate::protocol::{Message, Response, XvcInfo};
    use std::io::{Cursor, ErrorKind};

    const DEFAULT_MAX_SHIFT_BYTES: usize = 1024;

    #[test]
    fn read_getinfo() {
        let data = b"getinfo:".to_vec();
        let mut cursor = Cursor::new(data);
        match Message::from_reader(&mut cursor, DEFAULT_MAX_SHIFT_BYTES).unwrap() {
            Message::GetInfo => {}
            _ => panic!("expected GetInfo"),
        }
    }

    #[test]
    fn write_getinfo() {
        let mut out = Vec::new();
        Message::GetInfo.write_to(&mut out).unwrap();
        assert_eq!(out, b"getinfo:".to_vec());
    }

    #[test]
    fn read_settck() {
        let period: u32 = 1000;
        let mut data = b"settck:".to_vec();
        data.extend_from_slice(&period.to_le_bytes());
        let mut cursor = Cursor::new(data);
        match Message::from_reader(&mut cursor, DEFAULT_MAX_SHIFT_BYTES).unwrap() {
            Message::SetTck {
                period_ns: period_in_ns,
            } => assert_eq!(period_in_ns, period),
            _ => panic!("expected SetTck"),
        }
    }

    #[test]
    fn read_shift() {
        let num_bits: u32 = 13; // 2 bytes
        let tms = [0xAAu8, 0x0A];
        let tdi = [0x55u8, 0x15];

        let mut data = b"shift:".to_vec();
        data.extend_from_slice(&num_bits.to_le_bytes());
        data.extend_from_slice(&tms);
        data.extend_from_slice(&tdi);
        data.extend_from_slice(b"getinfo:");

        let mut cursor = Cursor::new(data);
        match Message::from_reader(&mut cursor, DEFAULT_MAX_SHIFT_BYTES).unwrap() {
            Message::Shift {
                num_bits: nb,
                tms: tms_vector,
                tdi: tdi_vector,
            } => {
                assert_eq!(nb, num_bits);
                assert_eq!(&*tms_vector, &tms[..]);
                assert_eq!(&*tdi_vector, &tdi[..]);
            }
            _ => panic!("expected Shift"),
        }
        // The following command is untouched
        assert_eq!(
            Message::from_reader(&mut cursor, DEFAULT_MAX_SHIFT_BYTES).unwrap(),
            Message::GetInfo
        );
    }

    #[test]
    fn read_empty_shift() {
        let mut cursor = Cursor::new(b"shift:\x00\x00\x00\x00".to_vec());
        let message = Message::from_reader(&mut cursor, DEFAULT_MAX_SHIFT_BYTES).unwrap();
        assert_eq!(
            message,
            Message::Shift {
                num_bits: 0,
                tms: Box::default(),
                tdi: Box::default(),
            }
        );
    }

    #[test]
    fn write_shift() {
        let cmd = Message::Shift {
            num_bits: 13,
            tms: vec![0xAAu8; 2].into_boxed_slice(),
            tdi: vec![0x55u8; 2].into_boxed_slice(),
        };
        let mut out = Vec::new();
        cmd.write_to(&mut out).unwrap();
        assert_eq!(out, b"shift:\x0d\x00\x00\x00\xAA\xAA\x55\x55".to_vec());
    }

    #[test]
    fn write_responses() {
        let mut out = Vec::new();
        Response::Info(XvcInfo::default())
            .write_to(&mut out)
            .unwrap();
        Response::TckPeriod(1000).write_to(&mut out).unwrap();
        Response::Tdo(vec![0xd1, 0x03].into_boxed_slice())
            .write_to(&mut out)
            .unwrap();
        assert_eq!(out, b"xvcServer_v1.0:1024\n\xe8\x03\x00\x00\xd1\x03".to_vec());
    }

    #[test]
    fn unknown_command() {
        let mut cursor = Cursor::new(b"bogus:".to_vec());
        match Message::from_reader(&mut cursor, DEFAULT_MAX_SHIFT_BYTES) {
            Err(ReadError::InvalidCommand(c)) => assert_eq!(c, "bogus"),
            other => panic!("expected InvalidCommand, got {:?}", other),
        }
    }

    #[test]
    fn missing_delimiter() {
        let mut cursor = Cursor::new(b"getinfo!getinfo:".to_vec());
        match Message::from_reader(&mut cursor, DEFAULT_MAX_SHIFT_BYTES) {
            Err(ReadError::InvalidCommand(c)) => assert_eq!(c, "getinfo!"),
            other => panic!("expected InvalidCommand, got {:?}", other),
        }
    }

    #[test]
    fn truncated_payload() {
        let mut cursor = Cursor::new(b"settck:\xe8\x03".to_vec());
        match Message::from_reader(&mut cursor, DEFAULT_MAX_SHIFT_BYTES) {
            Err(ReadError::IoError(e)) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
            other => panic!("expected UnexpectedEof, got {:?}", other),
        }
    }

    #[test]
    fn parse_reports_needed_bytes() {
        assert_eq!(
            Message::parse(b"shi", DEFAULT_MAX_SHIFT_BYTES).unwrap(),
            Parsed::Incomplete { needed: 4 }
        );
        assert_eq!(
            Message::parse(b"shift:\x09", DEFAULT_MAX_SHIFT_BYTES).unwrap(),
            Parsed::Incomplete { needed: 10 }
        );
        assert_eq!(
            Message::parse(b"shift:\x09\x00\x00\x00\x01", DEFAULT_MAX_SHIFT_BYTES).unwrap(),
            Parsed::Incomplete { needed: 14 }
        );
    }

    #[test]
    fn too_many_bytes_shift() {
        // force number of bytes to exceed MAX_SHIFT_BYTES
        let num_bytes_exceed = 1024 + 1;
        let num_bits = (num_bytes_exceed * 8) as u32;
        let mut data = b"shift:".to_vec();
        data.extend_from_slice(&num_bits.to_le_bytes());
        let mut cursor = Cursor::new(data);
        match Message::from_reader(&mut cursor, 1024) {
            Err(ReadError::TooManyBytes { max, got }) => {
                assert_eq!(max, 1024);
                assert_eq!(got, num_bytes_exceed);
            }
            other => panic!("expected TooManyBytes, got {:?}", other),
        }
    }
}
