//! DNS Wire Format
//!
//! The RFC 1035 subset an authoritative TXT responder needs: header and
//! question decoding for incoming queries, response encoding with TXT, NS
//! and glue A answers. Name compression is never emitted and rejected on
//! input (real resolvers do not compress question names).
//!
//! TCP transport prefixes every message with a 16-bit length; the listener
//! handles the framing, this module handles whole messages.

use std::net::Ipv4Addr;

/// Fixed DNS header size in bytes.
pub const HEADER_LEN: usize = 12;
/// Maximum encoded name length, including length octets.
pub const MAX_NAME_LEN: usize = 255;
/// Maximum label length.
pub const MAX_LABEL_LEN: usize = 63;

/// QTYPE for host addresses.
pub const TYPE_A: u16 = 1;
/// QTYPE for authoritative name servers.
pub const TYPE_NS: u16 = 2;
/// QTYPE for text records, the service's reply channel.
pub const TYPE_TXT: u16 = 16;

/// The Internet class.
pub const CLASS_IN: u16 = 1;

/// Response code: no error.
pub const RCODE_NOERROR: u8 = 0;
/// Response code: the server could not interpret the query.
pub const RCODE_FORMERR: u8 = 1;
/// Response code: the queried name does not exist in the zone.
pub const RCODE_NXDOMAIN: u8 = 3;

/// Wire decode/encode failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The packet ended before the structure it claims to carry.
    #[error("message truncated")]
    Truncated,

    /// A compression pointer appeared in a question name.
    #[error("compressed name in question")]
    CompressedName,

    /// A label exceeds 63 bytes.
    #[error("label exceeds {MAX_LABEL_LEN} bytes")]
    LabelTooLong,

    /// An encoded name exceeds 255 bytes.
    #[error("name exceeds {MAX_NAME_LEN} bytes")]
    NameTooLong,
}

/// A decoded question entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Query name as received, labels joined with dots, no trailing dot.
    pub name: String,
    /// Query type code.
    pub qtype: u16,
    /// Query class code.
    pub qclass: u16,
}

/// The parts of an incoming message the responder acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryMessage {
    /// Transaction id, echoed into the reply.
    pub id: u16,
    /// Opcode from the request flags.
    pub opcode: u8,
    /// RD bit from the request, copied into the reply.
    pub recursion_desired: bool,
    /// First question entry, if the message carried one.
    pub question: Option<Question>,
}

/// Decode the header and first question of `packet`.
///
/// Anything beyond the first question (additional questions, OPT records)
/// is ignored.
pub fn decode(packet: &[u8]) -> Result<QueryMessage, CodecError> {
    if packet.len() < HEADER_LEN {
        return Err(CodecError::Truncated);
    }
    let id = u16::from_be_bytes([packet[0], packet[1]]);
    let flags_hi = packet[2];
    let opcode = (flags_hi >> 3) & 0x0F;
    let recursion_desired = flags_hi & 0x01 != 0;
    let qdcount = u16::from_be_bytes([packet[4], packet[5]]);

    if qdcount == 0 {
        return Ok(QueryMessage {
            id,
            opcode,
            recursion_desired,
            question: None,
        });
    }

    let mut pos = HEADER_LEN;
    let mut name = String::new();
    let mut encoded_len = 1; // terminating zero octet
    loop {
        let len = *packet.get(pos).ok_or(CodecError::Truncated)? as usize;
        pos += 1;
        if len == 0 {
            break;
        }
        if len & 0xC0 != 0 {
            return Err(CodecError::CompressedName);
        }
        encoded_len += len + 1;
        if encoded_len > MAX_NAME_LEN {
            return Err(CodecError::NameTooLong);
        }
        let label = packet.get(pos..pos + len).ok_or(CodecError::Truncated)?;
        pos += len;
        if !name.is_empty() {
            name.push('.');
        }
        name.push_str(&String::from_utf8_lossy(label));
    }

    let qtype = read_u16(packet, pos)?;
    let qclass = read_u16(packet, pos + 2)?;

    Ok(QueryMessage {
        id,
        opcode,
        recursion_desired,
        question: Some(Question {
            name,
            qtype,
            qclass,
        }),
    })
}

fn read_u16(packet: &[u8], pos: usize) -> Result<u16, CodecError> {
    let bytes = packet.get(pos..pos + 2).ok_or(CodecError::Truncated)?;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Record payload variants the responder emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    /// Text payload, chunked into 255-byte character-strings on encode.
    Txt(String),
    /// Delegation to a nameserver host.
    Ns(String),
    /// IPv4 glue for the nameserver host.
    A(Ipv4Addr),
}

impl RecordData {
    fn type_code(&self) -> u16 {
        match self {
            RecordData::Txt(_) => TYPE_TXT,
            RecordData::Ns(_) => TYPE_NS,
            RecordData::A(_) => TYPE_A,
        }
    }
}

/// A resource record to serialize into a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Owner name, dotted form.
    pub name: String,
    /// Cache lifetime in seconds.
    pub ttl: u32,
    /// Typed payload.
    pub data: RecordData,
}

/// An outgoing response message.
#[derive(Debug, Clone)]
pub struct Response {
    /// Transaction id copied from the query.
    pub id: u16,
    /// Response code.
    pub rcode: u8,
    /// AA flag; this server only ever answers authoritatively.
    pub authoritative: bool,
    /// RD bit copied from the query.
    pub recursion_desired: bool,
    /// Question section echoed back to the client.
    pub question: Option<Question>,
    /// Answer section.
    pub answers: Vec<Record>,
    /// Additional section (glue).
    pub additionals: Vec<Record>,
}

impl Response {
    /// An empty response skeleton mirroring `query`.
    pub fn for_query(query: &QueryMessage) -> Self {
        Self {
            id: query.id,
            rcode: RCODE_NOERROR,
            authoritative: true,
            recursion_desired: query.recursion_desired,
            question: query.question.clone(),
            answers: Vec::new(),
            additionals: Vec::new(),
        }
    }

    /// Serialize to wire bytes.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::with_capacity(512);
        buf.extend_from_slice(&self.id.to_be_bytes());

        let mut flags_hi = 0x80; // QR = response
        if self.authoritative {
            flags_hi |= 0x04;
        }
        if self.recursion_desired {
            flags_hi |= 0x01;
        }
        buf.push(flags_hi);
        buf.push(self.rcode & 0x0F);

        let qdcount: u16 = self.question.is_some().into();
        buf.extend_from_slice(&qdcount.to_be_bytes());
        buf.extend_from_slice(&(self.answers.len() as u16).to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes()); // NSCOUNT
        buf.extend_from_slice(&(self.additionals.len() as u16).to_be_bytes());

        if let Some(q) = &self.question {
            encode_name(&mut buf, &q.name)?;
            buf.extend_from_slice(&q.qtype.to_be_bytes());
            buf.extend_from_slice(&q.qclass.to_be_bytes());
        }
        for record in self.answers.iter().chain(&self.additionals) {
            encode_record(&mut buf, record)?;
        }
        Ok(buf)
    }
}

fn encode_record(buf: &mut Vec<u8>, record: &Record) -> Result<(), CodecError> {
    encode_name(buf, &record.name)?;
    buf.extend_from_slice(&record.data.type_code().to_be_bytes());
    buf.extend_from_slice(&CLASS_IN.to_be_bytes());
    buf.extend_from_slice(&record.ttl.to_be_bytes());

    let mut rdata = Vec::new();
    match &record.data {
        RecordData::Txt(payload) => {
            let bytes = payload.as_bytes();
            if bytes.is_empty() {
                rdata.push(0);
            }
            for chunk in bytes.chunks(255) {
                rdata.push(chunk.len() as u8);
                rdata.extend_from_slice(chunk);
            }
        }
        RecordData::Ns(host) => encode_name(&mut rdata, host)?,
        RecordData::A(addr) => rdata.extend_from_slice(&addr.octets()),
    }
    buf.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
    buf.extend_from_slice(&rdata);
    Ok(())
}

/// Append the uncompressed wire form of a dotted name.
fn encode_name(buf: &mut Vec<u8>, name: &str) -> Result<(), CodecError> {
    let mut encoded_len = 1;
    for label in name.split('.').filter(|l| !l.is_empty()) {
        let bytes = label.as_bytes();
        if bytes.len() > MAX_LABEL_LEN {
            return Err(CodecError::LabelTooLong);
        }
        encoded_len += bytes.len() + 1;
        if encoded_len > MAX_NAME_LEN {
            return Err(CodecError::NameTooLong);
        }
        buf.push(bytes.len() as u8);
        buf.extend_from_slice(bytes);
    }
    buf.push(0);
    Ok(())
}

/// Build query bytes for responder tests.
#[cfg(test)]
pub(crate) fn encode_query(id: u16, name: &str, qtype: u16) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&id.to_be_bytes());
    buf.push(0x01); // RD set, as stub resolvers do
    buf.push(0x00);
    buf.extend_from_slice(&1u16.to_be_bytes()); // QDCOUNT
    buf.extend_from_slice(&[0; 6]); // AN/NS/AR counts
    encode_name(&mut buf, name).expect("test name encodes");
    buf.extend_from_slice(&qtype.to_be_bytes());
    buf.extend_from_slice(&CLASS_IN.to_be_bytes());
    buf
}
