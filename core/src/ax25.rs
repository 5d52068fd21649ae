use crate::error::{AprsError, Result};
use crate::{BitStream, MAX_CALLSIGN_LEN, MAX_DIGIPEATERS, MAX_INFO_LEN, MAX_SSID};
use std::fmt;

/// UI frame, poll/final bit clear
pub const CONTROL_UI: u8 = 0x03;

/// No layer-3 protocol
pub const PID_NO_LAYER3: u8 = 0xF0;

/// Frame delimiter octet
pub const FLAG: u8 = 0x7E;

/// 0x7E in transmission order (LSB first)
const FLAG_BITS: [bool; 8] = [false, true, true, true, true, true, true, false];

/// Reserved bits of the SSID octet, always transmitted as 1
const SSID_RESERVED: u8 = 0x60;

/// "Has been repeated" bit of the SSID octet
const SSID_REPEATED: u8 = 0x80;

const ADDRESS_LEN: usize = 7;

/// FCS as used by AX.25 (CRC-16/X.25)
///
/// Reflected polynomial 0x8408 (0x1021 bit-reversed), initial value 0xFFFF,
/// result ones-complemented. Transmitted low byte first.
pub fn fcs(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b as u16) & 1;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8408;
            }
            b >>= 1;
        }
    }
    !crc
}

/// One station address: callsign + SSID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Uppercase callsign without padding (1-6 characters)
    pub callsign: String,
    pub ssid: u8,
    /// H bit. Set by digipeaters, never by the originating station.
    pub repeated: bool,
}

impl Address {
    pub fn new(callsign: &str, ssid: u8) -> Result<Self> {
        let upper = callsign.to_ascii_uppercase();
        if upper.is_empty() {
            return Err(address_error(callsign, "callsign is empty"));
        }
        if upper.len() > MAX_CALLSIGN_LEN {
            return Err(address_error(callsign, "callsign exceeds 6 characters"));
        }
        if !upper.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(address_error(callsign, "callsign must be alphanumeric"));
        }
        if ssid > MAX_SSID {
            return Err(address_error(callsign, "SSID exceeds 15"));
        }

        Ok(Self {
            callsign: upper,
            ssid,
            repeated: false,
        })
    }

    /// Parse `CALL` or `CALL-SSID`
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        match text.split_once('-') {
            Some((call, ssid)) => {
                let ssid: u8 = ssid
                    .parse()
                    .map_err(|_| address_error(text, "SSID must be a number 0-15"))?;
                if ssid > MAX_SSID {
                    return Err(address_error(text, "SSID exceeds 15"));
                }
                Self::new(call, ssid).map_err(|e| match e {
                    AprsError::AddressError { reason, .. } => address_error(text, &reason),
                    other => other,
                })
            }
            None => Self::new(text, 0),
        }
    }

    /// Encode as the 7 address octets. `last` sets the address-extension
    /// bit that terminates the address field.
    pub fn to_bytes(&self, last: bool) -> [u8; ADDRESS_LEN] {
        let mut out = [b' ' << 1; ADDRESS_LEN];
        for (slot, b) in out.iter_mut().zip(self.callsign.bytes()) {
            *slot = b << 1;
        }

        let mut ssid = SSID_RESERVED | (self.ssid << 1);
        if self.repeated {
            ssid |= SSID_REPEATED;
        }
        if last {
            ssid |= 0x01;
        }
        out[MAX_CALLSIGN_LEN] = ssid;
        out
    }

    /// Decode 7 address octets, returning the address and its
    /// address-extension (last) bit
    pub fn from_bytes(bytes: &[u8]) -> Result<(Self, bool)> {
        if bytes.len() != ADDRESS_LEN {
            return Err(AprsError::InvalidFrame(format!(
                "address field is {} octets, expected 7",
                bytes.len()
            )));
        }
        if bytes[..MAX_CALLSIGN_LEN].iter().any(|b| b & 0x01 != 0) {
            return Err(AprsError::InvalidFrame(
                "address extension bit set inside callsign".to_string(),
            ));
        }

        let callsign: String = bytes[..MAX_CALLSIGN_LEN]
            .iter()
            .map(|b| (b >> 1) as char)
            .collect();
        let ssid_octet = bytes[MAX_CALLSIGN_LEN];

        let mut address = Self::new(callsign.trim_end(), (ssid_octet >> 1) & 0x0F)
            .map_err(|e| AprsError::InvalidFrame(e.to_string()))?;
        address.repeated = ssid_octet & SSID_REPEATED != 0;

        Ok((address, ssid_octet & 0x01 != 0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.callsign)?;
        if self.ssid != 0 {
            write!(f, "-{}", self.ssid)?;
        }
        if self.repeated {
            write!(f, "*")?;
        }
        Ok(())
    }
}

fn address_error(callsign: &str, reason: &str) -> AprsError {
    AprsError::AddressError {
        callsign: callsign.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse a comma-separated digipeater path such as `WIDE1-1,WIDE2-1`.
/// Blank entries are skipped, so an empty string is an empty path.
pub fn parse_path(path: &str) -> Result<Vec<Address>> {
    let hops: Vec<&str> = path
        .split(',')
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .collect();

    if hops.len() > MAX_DIGIPEATERS {
        return Err(AprsError::PathLengthError(hops.len()));
    }

    hops.into_iter().map(Address::parse).collect()
}

/// Leading synchronisation pattern sent ahead of the frame body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preamble {
    pub sync_zeros: usize,
    /// Opening flag octets (at least one)
    pub flags: usize,
}

impl Preamble {
    /// Exactly one opening flag
    pub fn minimal() -> Self {
        Self {
            sync_zeros: 0,
            flags: 1,
        }
    }
}

/// AX.25 UI frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub destination: Address,
    pub source: Address,
    pub digipeaters: Vec<Address>,
    pub info: Vec<u8>,
}

impl Frame {
    pub fn new(source: &str, destination: &str, path: &str, info: &[u8]) -> Result<Self> {
        let destination = Address::parse(destination)?;
        let source = Address::parse(source)?;
        let digipeaters = parse_path(path)?;
        if info.len() > MAX_INFO_LEN {
            return Err(AprsError::InfoTooLong(info.len()));
        }

        Ok(Self {
            destination,
            source,
            digipeaters,
            info: info.to_vec(),
        })
    }

    /// Addresses in wire order: destination, source, digipeaters
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        [&self.destination, &self.source]
            .into_iter()
            .chain(self.digipeaters.iter())
    }

    /// Addresses + control + PID + info (the FCS-protected region)
    fn body(&self) -> Vec<u8> {
        let count = 2 + self.digipeaters.len();
        let mut body = Vec::with_capacity(count * ADDRESS_LEN + 2 + self.info.len() + 2);
        for (i, address) in self.addresses().enumerate() {
            body.extend_from_slice(&address.to_bytes(i + 1 == count));
        }
        body.push(CONTROL_UI);
        body.push(PID_NO_LAYER3);
        body.extend_from_slice(&self.info);
        body
    }

    pub fn fcs(&self) -> u16 {
        fcs(&self.body())
    }

    /// Serialized octets from the first address through the FCS
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.body();
        let check = fcs(&bytes);
        bytes.push(check as u8);
        bytes.push((check >> 8) as u8);
        bytes
    }

    /// Parse octets produced by [`Frame::to_bytes`], verifying the FCS
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        // two addresses, control, PID, FCS
        if data.len() < 2 * ADDRESS_LEN + 4 {
            return Err(AprsError::InvalidFrame(format!(
                "{} octets is too short for a UI frame",
                data.len()
            )));
        }

        let (body, trailer) = data.split_at(data.len() - 2);
        let expected = u16::from_le_bytes([trailer[0], trailer[1]]);
        let computed = fcs(body);
        if expected != computed {
            return Err(AprsError::FcsMismatch { expected, computed });
        }

        let mut addresses = Vec::new();
        let mut offset = 0;
        loop {
            if offset + ADDRESS_LEN > body.len() {
                return Err(AprsError::InvalidFrame(
                    "address field is not terminated".to_string(),
                ));
            }
            let (address, last) = Address::from_bytes(&body[offset..offset + ADDRESS_LEN])?;
            addresses.push(address);
            offset += ADDRESS_LEN;
            if last {
                break;
            }
        }

        if addresses.len() < 2 {
            return Err(AprsError::InvalidFrame(
                "frame needs destination and source addresses".to_string(),
            ));
        }
        if addresses.len() - 2 > MAX_DIGIPEATERS {
            return Err(AprsError::PathLengthError(addresses.len() - 2));
        }
        if body.len() < offset + 2 {
            return Err(AprsError::InvalidFrame("missing control/PID".to_string()));
        }
        if body[offset] != CONTROL_UI || body[offset + 1] != PID_NO_LAYER3 {
            return Err(AprsError::InvalidFrame(format!(
                "not a UI frame (control {:#04x}, PID {:#04x})",
                body[offset],
                body[offset + 1]
            )));
        }

        let info = body[offset + 2..].to_vec();
        if info.len() > MAX_INFO_LEN {
            return Err(AprsError::InfoTooLong(info.len()));
        }

        let mut addresses = addresses.into_iter();
        let destination = addresses.next().ok_or_else(|| {
            AprsError::InvalidFrame("missing destination".to_string())
        })?;
        let source = addresses
            .next()
            .ok_or_else(|| AprsError::InvalidFrame("missing source".to_string()))?;

        Ok(Self {
            destination,
            source,
            digipeaters: addresses.collect(),
            info,
        })
    }

    /// Transmission bit order: preamble, stuffed octets, closing flag
    pub fn to_bits(&self, preamble: &Preamble) -> BitStream {
        let stuffed = bit_stuff(&self.to_bytes());
        let mut bits =
            Vec::with_capacity(preamble.sync_zeros + (preamble.flags + 1) * 8 + stuffed.len());
        bits.resize(preamble.sync_zeros, false);
        for _ in 0..preamble.flags {
            bits.extend_from_slice(&FLAG_BITS);
        }
        bits.extend_from_slice(&stuffed);
        bits.extend_from_slice(&FLAG_BITS);
        bits
    }
}

/// TNC2 monitor format: `SRC>DEST,DIGI1,DIGI2:info`
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}>{}", self.source, self.destination)?;
        for digi in &self.digipeaters {
            write!(f, ",{}", digi)?;
        }
        write!(f, ":{}", String::from_utf8_lossy(&self.info))
    }
}

/// Serialize octets LSB first, inserting a 0 after every run of five 1s
pub fn bit_stuff(data: &[u8]) -> BitStream {
    let mut bits = Vec::with_capacity(data.len() * 8 + data.len() * 8 / 5);
    let mut ones = 0;
    for &byte in data {
        for i in 0..8 {
            if (byte >> i) & 1 == 1 {
                bits.push(true);
                ones += 1;
                if ones == 5 {
                    bits.push(false);
                    ones = 0;
                }
            } else {
                bits.push(false);
                ones = 0;
            }
        }
    }
    bits
}

/// Remove the 0 that follows every run of five 1s
pub fn bit_unstuff(bits: &[bool]) -> Result<BitStream> {
    let mut out = Vec::with_capacity(bits.len());
    let mut ones = 0;
    let mut iter = bits.iter().copied();
    while let Some(bit) = iter.next() {
        out.push(bit);
        if !bit {
            ones = 0;
            continue;
        }
        ones += 1;
        if ones == 5 {
            match iter.next() {
                Some(false) | None => ones = 0,
                Some(true) => {
                    return Err(AprsError::InvalidFrame(
                        "six consecutive 1 bits inside frame".to_string(),
                    ))
                }
            }
        }
    }
    Ok(out)
}

/// Pack LSB-first bits into octets
pub fn bits_to_bytes(bits: &[bool]) -> Result<Vec<u8>> {
    if bits.len() % 8 != 0 {
        return Err(AprsError::InvalidFrame(format!(
            "{} bits is not a whole number of octets",
            bits.len()
        )));
    }
    Ok(bits
        .chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, &bit)| acc | ((bit as u8) << i))
        })
        .collect())
}

/// Build a UI frame and return its bit-stuffed, flag-delimited bit sequence
pub fn build_frame(source: &str, destination: &str, path: &str, info: &[u8]) -> Result<BitStream> {
    Ok(Frame::new(source, destination, path, info)?.to_bits(&Preamble::minimal()))
}

/// Inverse of [`Frame::to_bits`]: strip preamble and flags, unstuff, parse
pub fn decode_frame(bits: &[bool]) -> Result<Frame> {
    let is_flag = |at: usize| bits.len() >= at + 8 && bits[at..at + 8] == FLAG_BITS;

    let mut start = (0..bits.len())
        .find(|&i| is_flag(i))
        .ok_or_else(|| AprsError::InvalidFrame("no opening flag".to_string()))?;
    while is_flag(start) {
        start += 8;
    }

    let end = (start..bits.len())
        .rev()
        .find(|&i| is_flag(i))
        .ok_or_else(|| AprsError::InvalidFrame("no closing flag".to_string()))?;

    let unstuffed = bit_unstuff(&bits[start..end])?;
    Frame::from_bytes(&bits_to_bytes(&unstuffed)?)
}
