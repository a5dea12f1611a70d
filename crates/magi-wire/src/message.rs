// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! *MAGIMessage* — the inner message carried inside a `Message`-kind
//! `AgentRequest`.
//!
//! Wire layout (big-endian):
//!
//! ```text
//! total_len[4]  = 2 + header_len + |data|
//! header_len[2] = 6 + Σ(2 + |value|) over headers
//! id[4]
//! flags[1]
//! content_type[1]
//! headers[]     each: type[1], length[1], value[length]
//! data[...]
//! ```

use crate::error::WireError;

/// `MAGIMessage.flags` bits (spec §3). Stored as a raw bitmask; callers
/// combine with `|`.
pub mod flags {
    pub const ISACK: u8 = 1;
    pub const NOAGG: u8 = 2;
    pub const WANTACK: u8 = 4;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    None,
    Blob,
    Text,
    Image,
    Protobuf,
    Yaml,
    Xml,
    Pickle,
}

impl ContentType {
    fn to_byte(self) -> u8 {
        match self {
            ContentType::None => 0,
            ContentType::Blob => 1,
            ContentType::Text => 2,
            ContentType::Image => 3,
            ContentType::Protobuf => 4,
            ContentType::Yaml => 5,
            ContentType::Xml => 6,
            ContentType::Pickle => 7,
        }
    }

    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(ContentType::None),
            1 => Some(ContentType::Blob),
            2 => Some(ContentType::Text),
            3 => Some(ContentType::Image),
            4 => Some(ContentType::Protobuf),
            5 => Some(ContentType::Yaml),
            6 => Some(ContentType::Xml),
            7 => Some(ContentType::Pickle),
            _ => None,
        }
    }
}

/// `MAGIMessage.headers[].type` codes (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderType {
    Sequence,
    Timestamp,
    SequenceId,
    HostTime,
    Src,
    SrcDock,
    Hmac,
    DstNodes,
    DstGroups,
    DstDocks,
}

impl HeaderType {
    fn to_byte(self) -> u8 {
        match self {
            HeaderType::Sequence => 1,
            HeaderType::Timestamp => 2,
            HeaderType::SequenceId => 3,
            HeaderType::HostTime => 4,
            HeaderType::Src => 20,
            HeaderType::SrcDock => 21,
            HeaderType::Hmac => 22,
            HeaderType::DstNodes => 50,
            HeaderType::DstGroups => 51,
            HeaderType::DstDocks => 52,
        }
    }

    fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(HeaderType::Sequence),
            2 => Some(HeaderType::Timestamp),
            3 => Some(HeaderType::SequenceId),
            4 => Some(HeaderType::HostTime),
            20 => Some(HeaderType::Src),
            21 => Some(HeaderType::SrcDock),
            22 => Some(HeaderType::Hmac),
            50 => Some(HeaderType::DstNodes),
            51 => Some(HeaderType::DstGroups),
            52 => Some(HeaderType::DstDocks),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MessageHeader {
    pub header_type: HeaderType,
    pub value: Vec<u8>,
}

impl MessageHeader {
    fn encoded_len(&self) -> usize {
        2 + self.value.len()
    }
}

/// The inner message. `src`, `src_dock`, `dst_nodes`, `dst_groups`,
/// `dst_docks` are derived: populated on decode, and by
/// [`MagiMessage::create`] when building a message for sending.
#[derive(Debug, Clone, Default)]
pub struct MagiMessage {
    pub id: u32,
    pub flags: u8,
    pub content_type: ContentType,
    pub headers: Vec<MessageHeader>,
    pub data: Vec<u8>,

    pub src: Option<String>,
    pub src_dock: Option<String>,
    pub dst_nodes: Vec<String>,
    pub dst_groups: Vec<String>,
    pub dst_docks: Vec<String>,
}

impl Default for ContentType {
    fn default() -> Self {
        ContentType::None
    }
}

impl MagiMessage {
    /// `create_magi_message(src_dock?, node?, group?, dst_dock?,
    /// content_type, data)` — the sole constructor (spec §4.4). Each
    /// non-empty argument inserts the corresponding header; `data` is
    /// required and copied.
    ///
    /// The newer (authoritative, per spec §9) generation of the original
    /// inserts `DSTDOCKS` for `dst_dock`; an older draft duplicated
    /// `DSTNODES` for that slot instead, which this implementation does not
    /// reproduce.
    pub fn create(
        src_dock: Option<&str>,
        node: Option<&str>,
        group: Option<&str>,
        dst_dock: Option<&str>,
        content_type: ContentType,
        data: Vec<u8>,
    ) -> Self {
        let mut msg = MagiMessage {
            content_type,
            data,
            ..Default::default()
        };
        if let Some(d) = src_dock {
            msg.insert_header(HeaderType::SrcDock, d.as_bytes().to_vec());
        }
        if let Some(n) = node {
            msg.insert_header(HeaderType::DstNodes, n.as_bytes().to_vec());
        }
        if let Some(g) = group {
            msg.insert_header(HeaderType::DstGroups, g.as_bytes().to_vec());
        }
        if let Some(d) = dst_dock {
            msg.insert_header(HeaderType::DstDocks, d.as_bytes().to_vec());
        }
        msg
    }

    /// `insert_header(type, value)`: appends to `headers`, and additionally
    /// threads the value into the matching derived field (`src`/`src_dock`
    /// set directly, `DSTNODES`/`DSTGROUPS`/`DSTDOCKS` prepended to their
    /// list), matching `insert_header` in the original `MAGIMessage.c`.
    pub fn insert_header(&mut self, header_type: HeaderType, value: Vec<u8>) {
        let as_string = String::from_utf8_lossy(&value).into_owned();
        match header_type {
            HeaderType::Src => self.src = Some(as_string.clone()),
            HeaderType::SrcDock => self.src_dock = Some(as_string.clone()),
            HeaderType::DstNodes => self.dst_nodes.insert(0, as_string.clone()),
            HeaderType::DstGroups => self.dst_groups.insert(0, as_string.clone()),
            HeaderType::DstDocks => self.dst_docks.insert(0, as_string.clone()),
            _ => {}
        }
        self.headers.push(MessageHeader { header_type, value });
    }

    fn headers_bytes(&self) -> usize {
        self.headers.iter().map(MessageHeader::encoded_len).sum()
    }

    /// Encode to `(buffer, length)`. Fails if any header value does not fit
    /// in the 1-byte length field (spec §3 invariant: declared length must
    /// equal the true byte length).
    pub fn encode(&self) -> Result<(Vec<u8>, u32), WireError> {
        for h in &self.headers {
            if h.value.len() > u8::MAX as usize {
                return Err(WireError::ValueTooLong(h.value.len()));
            }
        }
        let header_len: u16 = 6 + self.headers_bytes() as u16;
        let total_len: u32 = 2 + header_len as u32 + self.data.len() as u32;

        let mut buf =
            Vec::with_capacity(4 + 2 + header_len as usize + self.data.len());
        buf.extend_from_slice(&total_len.to_be_bytes());
        buf.extend_from_slice(&header_len.to_be_bytes());
        buf.extend_from_slice(&self.id.to_be_bytes());
        buf.push(self.flags);
        buf.push(self.content_type.to_byte());
        for h in &self.headers {
            buf.push(h.header_type.to_byte());
            buf.push(h.value.len() as u8);
            buf.extend_from_slice(&h.value);
        }
        buf.extend_from_slice(&self.data);

        let len = buf.len() as u32;
        Ok((buf, len))
    }

    /// Decode a `MAGIMessage` from `buf` (the `AgentRequest` payload for a
    /// `Message`-kind request). Returns `UnsupportedContentType` only for a
    /// byte that maps to no known `ContentType` variant; a recognized
    /// non-YAML type still decodes, since interpreting `data` as YAML is the
    /// agent loop's concern, not the codec's.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < 6 {
            return Err(WireError::TooShort {
                need: 6,
                got: buf.len(),
            });
        }
        let total_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        let header_len = u16::from_be_bytes([buf[4], buf[5]]) as usize;
        if total_len < header_len + 2 || header_len < 6 {
            return Err(WireError::HeaderLengthMismatch {
                declared: header_len,
                available: total_len,
            });
        }
        let data_len = total_len - header_len - 2;
        let needed = 6 + (header_len - 6) + data_len;
        if buf.len() < needed {
            return Err(WireError::TooShort {
                need: needed,
                got: buf.len(),
            });
        }

        let id = u32::from_be_bytes([buf[6], buf[7], buf[8], buf[9]]);
        let flags_byte = buf[10];
        let content_type = ContentType::from_byte(buf[11])
            .ok_or(WireError::UnsupportedContentType(buf[11]))?;

        let mut msg = MagiMessage {
            id,
            flags: flags_byte,
            content_type,
            ..Default::default()
        };

        let mut cursor = 12;
        let mut headers_remaining = header_len - 6;
        while headers_remaining > 0 {
            if buf.len() < cursor + 2 {
                return Err(WireError::HeaderLengthMismatch {
                    declared: header_len,
                    available: buf.len(),
                });
            }
            let type_byte = buf[cursor];
            let len = buf[cursor + 1] as usize;
            cursor += 2;
            let value = buf[cursor..cursor + len].to_vec();
            cursor += len;
            headers_remaining = headers_remaining.saturating_sub(2 + len);
            if let Some(ht) = HeaderType::from_byte(type_byte) {
                msg.insert_header(ht, value);
            }
        }

        msg.data = buf[cursor..cursor + data_len].to_vec();
        Ok(msg)
    }
}
