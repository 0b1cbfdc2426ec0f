//! Synthetic Level II byte generators.
//!
//! Builders here write the on-disk layout directly (big-endian, no parser
//! types) so decoder tests check the parser against an independent encoding.
//!
//! ```
//! use test_utils::{ChunkBuilder, Message31Builder, Message5Builder, RecordBuilder, VolumeHeaderBuilder};
//!
//! let record = RecordBuilder::new()
//!     .message(Message5Builder::new(212).build_message())
//!     .message(Message31Builder::new().reflectivity(&[10, 20, 30], 2.0, 0.0).build_message());
//! let chunk = ChunkBuilder::new()
//!     .volume_header(VolumeHeaderBuilder::new().build())
//!     .record(record.build())
//!     .build();
//! assert!(chunk.starts_with(b"AR2V0006."));
//! ```

use std::io::Write;

use bzip2::write::BzEncoder;
use bzip2::Compression;

use crate::fixtures::site;

/// Size of one fixed message frame.
pub const FRAME_SIZE: usize = 2432;
/// Control header ahead of each message.
pub const CTM_SIZE: usize = 12;
/// Message header length.
pub const MESSAGE_HEADER_LEN: usize = 16;

const RADIAL_HEADER_LEN: usize = 32;
const MOMENT_HEADER_LEN: usize = 28;

/// 24-byte Archive II volume header.
#[derive(Debug, Clone)]
pub struct VolumeHeaderBuilder {
    tape: [u8; 9],
    extension: [u8; 3],
    julian_date: u32,
    time_ms: u32,
    icao: [u8; 4],
}

impl Default for VolumeHeaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VolumeHeaderBuilder {
    pub fn new() -> Self {
        Self {
            tape: *b"AR2V0006.",
            extension: *b"001",
            julian_date: site::JULIAN_DATE,
            time_ms: site::TIME_MS,
            icao: fixed(site::ICAO),
        }
    }

    pub fn tape(mut self, tape: &str) -> Self {
        self.tape = fixed(tape);
        self
    }

    pub fn icao(mut self, icao: &str) -> Self {
        self.icao = fixed(icao);
        self
    }

    /// All-NUL ICAO, as written by some streaming sources.
    pub fn blank_icao(mut self) -> Self {
        self.icao = [0; 4];
        self
    }

    pub fn julian_date(mut self, julian_date: u32) -> Self {
        self.julian_date = julian_date;
        self
    }

    pub fn time_ms(mut self, time_ms: u32) -> Self {
        self.time_ms = time_ms;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(24);
        out.extend_from_slice(&self.tape);
        out.extend_from_slice(&self.extension);
        out.extend_from_slice(&self.julian_date.to_be_bytes());
        out.extend_from_slice(&self.time_ms.to_be_bytes());
        out.extend_from_slice(&self.icao);
        out
    }
}

/// One moment data block.
#[derive(Debug, Clone)]
pub struct MomentBlock {
    pub tag: [u8; 3],
    /// Raw gate bytes, already packed at `word_size`.
    pub raw: Vec<u8>,
    pub number_gates: u16,
    pub word_size: u8,
    pub scale: f32,
    pub offset: f32,
    pub first_gate_m: u16,
    pub gate_interval_m: u16,
}

impl MomentBlock {
    /// 8-bit moment with one byte per gate.
    pub fn eight_bit(tag: &str, gates: &[u8], scale: f32, offset: f32) -> Self {
        Self {
            tag: fixed(tag),
            raw: gates.to_vec(),
            number_gates: gates.len() as u16,
            word_size: 8,
            scale,
            offset,
            first_gate_m: 2125,
            gate_interval_m: 250,
        }
    }

    /// 16-bit moment with one big-endian word per gate.
    pub fn sixteen_bit(tag: &str, gates: &[u16], scale: f32, offset: f32) -> Self {
        Self {
            tag: fixed(tag),
            raw: gates.iter().flat_map(|g| g.to_be_bytes()).collect(),
            number_gates: gates.len() as u16,
            word_size: 16,
            scale,
            offset,
            first_gate_m: 2125,
            gate_interval_m: 250,
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(b'D');
        out.extend_from_slice(&self.tag);
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&self.number_gates.to_be_bytes());
        out.extend_from_slice(&self.first_gate_m.to_be_bytes());
        out.extend_from_slice(&self.gate_interval_m.to_be_bytes());
        out.extend_from_slice(&16u16.to_be_bytes()); // tover
        out.extend_from_slice(&28u16.to_be_bytes()); // snr threshold
        out.push(0);
        out.push(self.word_size);
        out.extend_from_slice(&self.scale.to_be_bytes());
        out.extend_from_slice(&self.offset.to_be_bytes());
        out.extend_from_slice(&self.raw);
    }

    fn encoded_len(&self) -> usize {
        MOMENT_HEADER_LEN + self.raw.len()
    }
}

/// One message 31 radial.
#[derive(Debug, Clone)]
pub struct Message31Builder {
    icao: [u8; 4],
    collection_time: u32,
    collection_date: u16,
    azimuth_number: u16,
    azimuth_angle: f32,
    azimuth_resolution: u8,
    radial_status: u8,
    elevation_number: u8,
    elevation_angle: f32,
    /// `(lat, lon, vcp)`; `None` leaves the VOL block out.
    volume: Option<(f32, f32, u16)>,
    volume_block_len: usize,
    radial_block_len: usize,
    elevation_block: bool,
    radial_block: bool,
    zero_pointers: usize,
    moments: Vec<MomentBlock>,
}

impl Default for Message31Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Message31Builder {
    /// NEXRAD layout radial for the fixture site: elevation 1, status 1,
    /// VOL/ELV/RAD blocks present, no moments.
    pub fn new() -> Self {
        Self {
            icao: fixed(site::ICAO),
            collection_time: site::TIME_MS,
            collection_date: site::JULIAN_DATE as u16,
            azimuth_number: 1,
            azimuth_angle: 0.0,
            azimuth_resolution: 1,
            radial_status: 1,
            elevation_number: 1,
            elevation_angle: 0.5,
            volume: Some((site::LATITUDE, site::LONGITUDE, site::VCP)),
            volume_block_len: 52,
            radial_block_len: 28,
            elevation_block: true,
            radial_block: true,
            zero_pointers: 0,
            moments: Vec::new(),
        }
    }

    /// TDWR block lengths (44-byte VOL, 8-byte RAD).
    pub fn tdwr(mut self) -> Self {
        self.volume_block_len = 44;
        self.radial_block_len = 8;
        self
    }

    pub fn icao(mut self, icao: &str) -> Self {
        self.icao = fixed(icao);
        self
    }

    pub fn blank_icao(mut self) -> Self {
        self.icao = [0; 4];
        self
    }

    pub fn collection(mut self, julian_date: u16, time_ms: u32) -> Self {
        self.collection_date = julian_date;
        self.collection_time = time_ms;
        self
    }

    pub fn azimuth(mut self, number: u16, angle: f32) -> Self {
        self.azimuth_number = number;
        self.azimuth_angle = angle;
        self
    }

    pub fn azimuth_resolution(mut self, code: u8) -> Self {
        self.azimuth_resolution = code;
        self
    }

    pub fn status(mut self, status: u8) -> Self {
        self.radial_status = status;
        self
    }

    pub fn elevation(mut self, number: u8, angle: f32) -> Self {
        self.elevation_number = number;
        self.elevation_angle = angle;
        self
    }

    pub fn site_location(mut self, latitude: f32, longitude: f32) -> Self {
        let vcp = self.volume.map(|v| v.2).unwrap_or(site::VCP);
        self.volume = Some((latitude, longitude, vcp));
        self
    }

    pub fn without_volume_block(mut self) -> Self {
        self.volume = None;
        self
    }

    pub fn without_calibration_blocks(mut self) -> Self {
        self.elevation_block = false;
        self.radial_block = false;
        self
    }

    /// Prepend `count` zero entries to the pointer table.
    pub fn zero_pointers(mut self, count: usize) -> Self {
        self.zero_pointers = count;
        self
    }

    pub fn moment(mut self, block: MomentBlock) -> Self {
        self.moments.push(block);
        self
    }

    pub fn reflectivity(self, gates: &[u8], scale: f32, offset: f32) -> Self {
        self.moment(MomentBlock::eight_bit("REF", gates, scale, offset))
    }

    pub fn velocity(self, gates: &[u8], scale: f32, offset: f32) -> Self {
        self.moment(MomentBlock::eight_bit("VEL", gates, scale, offset))
    }

    /// Radial header, pointer table and blocks; offsets are relative to byte 0.
    pub fn build_body(&self) -> Vec<u8> {
        let mut blocks: Vec<Vec<u8>> = Vec::new();

        if let Some((lat, lon, vcp)) = self.volume {
            blocks.push(self.volume_block(lat, lon, vcp));
        }
        if self.elevation_block {
            let mut b = Vec::with_capacity(12);
            b.push(b'R');
            b.extend_from_slice(b"ELV");
            b.extend_from_slice(&12u16.to_be_bytes());
            b.extend_from_slice(&0u16.to_be_bytes());
            b.extend_from_slice(&(-44.5f32).to_be_bytes());
            blocks.push(b);
        }
        if self.radial_block {
            blocks.push(self.radial_calibration_block());
        }
        for moment in &self.moments {
            let mut b = Vec::with_capacity(moment.encoded_len());
            moment.encode(&mut b);
            blocks.push(b);
        }

        let pointer_count = self.zero_pointers + blocks.len();
        let mut out = Vec::new();
        out.extend_from_slice(&self.icao);
        out.extend_from_slice(&self.collection_time.to_be_bytes());
        out.extend_from_slice(&self.collection_date.to_be_bytes());
        out.extend_from_slice(&self.azimuth_number.to_be_bytes());
        out.extend_from_slice(&self.azimuth_angle.to_be_bytes());
        out.push(0); // compression
        out.push(0); // spare
        out.extend_from_slice(&0u16.to_be_bytes()); // radial length, patched below
        out.push(self.azimuth_resolution);
        out.push(self.radial_status);
        out.push(self.elevation_number);
        out.push(1); // cut sector
        out.extend_from_slice(&self.elevation_angle.to_be_bytes());
        out.push(0); // radial blanking
        out.push(0); // azimuth indexing
        out.extend_from_slice(&(pointer_count as u16).to_be_bytes());
        debug_assert_eq!(out.len(), RADIAL_HEADER_LEN);

        let mut next = RADIAL_HEADER_LEN + pointer_count * 4;
        for _ in 0..self.zero_pointers {
            out.extend_from_slice(&0u32.to_be_bytes());
        }
        for block in &blocks {
            out.extend_from_slice(&(next as u32).to_be_bytes());
            next += block.len();
        }
        for block in blocks {
            out.extend(block);
        }

        let radial_length = out.len() as u16;
        out[18..20].copy_from_slice(&radial_length.to_be_bytes());
        out
    }

    /// CTM header, message header and body, padded to an even length.
    pub fn build_message(&self) -> Vec<u8> {
        let mut body = self.build_body();
        if body.len() % 2 == 1 {
            body.push(0);
        }
        let half_words = ((MESSAGE_HEADER_LEN + body.len()) / 2) as u16;
        let mut out = vec![0u8; CTM_SIZE];
        out.extend(message_header(31, half_words, self.collection_date, self.collection_time));
        out.extend(body);
        out
    }

    fn volume_block(&self, lat: f32, lon: f32, vcp: u16) -> Vec<u8> {
        let mut b = Vec::with_capacity(self.volume_block_len);
        b.push(b'R');
        b.extend_from_slice(b"VOL");
        b.extend_from_slice(&(self.volume_block_len as u16).to_be_bytes());
        b.push(1);
        b.push(0);
        b.extend_from_slice(&lat.to_be_bytes());
        b.extend_from_slice(&lon.to_be_bytes());
        b.extend_from_slice(&370u16.to_be_bytes()); // site height
        b.extend_from_slice(&20u16.to_be_bytes()); // feedhorn height
        b.extend_from_slice(&(-45.0f32).to_be_bytes());
        b.extend_from_slice(&700.0f32.to_be_bytes());
        b.extend_from_slice(&700.0f32.to_be_bytes());
        b.extend_from_slice(&0.25f32.to_be_bytes());
        b.extend_from_slice(&30.0f32.to_be_bytes());
        b.extend_from_slice(&vcp.to_be_bytes());
        b.extend_from_slice(&0u16.to_be_bytes());
        b.resize(self.volume_block_len, 0);
        b
    }

    fn radial_calibration_block(&self) -> Vec<u8> {
        let mut b = Vec::with_capacity(self.radial_block_len);
        b.push(b'R');
        b.extend_from_slice(b"RAD");
        b.extend_from_slice(&(self.radial_block_len as u16).to_be_bytes());
        b.extend_from_slice(&4660u16.to_be_bytes()); // unambiguous range
        if self.radial_block_len > 8 {
            b.extend_from_slice(&(-78.0f32).to_be_bytes());
            b.extend_from_slice(&(-78.5f32).to_be_bytes());
            b.extend_from_slice(&2_850u16.to_be_bytes()); // nyquist
            b.extend_from_slice(&0u16.to_be_bytes());
            b.extend_from_slice(&(-44.0f32).to_be_bytes());
            b.extend_from_slice(&(-44.0f32).to_be_bytes());
        }
        b.resize(self.radial_block_len, 0);
        b
    }
}

/// Message 5 (volume coverage pattern).
#[derive(Debug, Clone)]
pub struct Message5Builder {
    pattern_number: u16,
    /// `(coded elevation angle, waveform code)` per cut.
    cuts: Vec<(u16, u8)>,
    declared_cuts: Option<u16>,
}

impl Message5Builder {
    pub fn new(pattern_number: u16) -> Self {
        Self {
            pattern_number,
            cuts: Vec::new(),
            declared_cuts: None,
        }
    }

    /// Add a cut at `degrees`, coded the way the radar writes it.
    pub fn cut(mut self, degrees: f32, waveform: u8) -> Self {
        let code = ((degrees / 0.043_945).round() as u16) << 3;
        self.cuts.push((code, waveform));
        self
    }

    /// Declare a cut count different from the number of cuts written.
    pub fn declared_cuts(mut self, count: u16) -> Self {
        self.declared_cuts = Some(count);
        self
    }

    /// VCP header and cut records, unpadded.
    pub fn build_body(&self) -> Vec<u8> {
        let cut_count = self.declared_cuts.unwrap_or(self.cuts.len() as u16);
        let size = ((MESSAGE_HEADER_LEN + 22 + 46 * self.cuts.len()) / 2) as u16;

        let mut out = Vec::new();
        out.extend_from_slice(&size.to_be_bytes());
        out.extend_from_slice(&2u16.to_be_bytes()); // pattern type: constant elevation
        out.extend_from_slice(&self.pattern_number.to_be_bytes());
        out.extend_from_slice(&cut_count.to_be_bytes());
        out.push(1); // version
        out.push(2); // clutter map group
        out.push(2); // doppler resolution
        out.push(2); // pulse width
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&[0; 2]);

        for &(code, waveform) in &self.cuts {
            let mut cut = vec![0u8; 46];
            cut[0..2].copy_from_slice(&code.to_be_bytes());
            cut[3] = waveform;
            out.extend(cut);
        }
        out
    }

    /// Complete 2432-byte frame.
    pub fn build_message(&self) -> Vec<u8> {
        let body = self.build_body();
        let half_words = ((MESSAGE_HEADER_LEN + body.len()) / 2) as u16;
        let mut out = vec![0u8; CTM_SIZE];
        out.extend(message_header(5, half_words, site::JULIAN_DATE as u16, site::TIME_MS));
        out.extend(body);
        out.resize(FRAME_SIZE.max(out.len()), 0);
        out
    }
}

/// A fixed 2432-byte frame of a message type the decoder skips.
pub fn filler_message(message_type: u8) -> Vec<u8> {
    let mut out = vec![0u8; CTM_SIZE];
    out.extend(message_header(
        message_type,
        ((FRAME_SIZE - CTM_SIZE) / 2) as u16,
        site::JULIAN_DATE as u16,
        site::TIME_MS,
    ));
    out.resize(FRAME_SIZE, 0);
    out
}

/// One LDM record.
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    stream: Vec<u8>,
    compressed: bool,
    end_of_volume: bool,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, message: Vec<u8>) -> Self {
        self.stream.extend(message);
        self
    }

    pub fn compressed(mut self) -> Self {
        self.compressed = true;
        self
    }

    /// Write the size with the negative end-of-volume flag.
    pub fn end_of_volume(mut self) -> Self {
        self.end_of_volume = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let payload = if self.compressed {
            bzip2_compress(&self.stream)
        } else {
            self.stream.clone()
        };
        let size = if self.end_of_volume {
            -(payload.len() as i32)
        } else {
            payload.len() as i32
        };
        let mut out = size.to_be_bytes().to_vec();
        out.extend(payload);
        out
    }
}

/// Volume header (optional) followed by records.
#[derive(Debug, Clone, Default)]
pub struct ChunkBuilder {
    header: Option<Vec<u8>>,
    records: Vec<Vec<u8>>,
}

impl ChunkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn volume_header(mut self, header: Vec<u8>) -> Self {
        self.header = Some(header);
        self
    }

    pub fn record(mut self, record: Vec<u8>) -> Self {
        self.records.push(record);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = self.header.clone().unwrap_or_default();
        for record in &self.records {
            out.extend_from_slice(record);
        }
        out
    }
}

/// Compress `data` as a single bzip2 stream.
pub fn bzip2_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = BzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .expect("in-memory bzip2 write cannot fail");
    encoder.finish().expect("in-memory bzip2 finish cannot fail")
}

fn message_header(message_type: u8, half_words: u16, julian_date: u16, time_ms: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(MESSAGE_HEADER_LEN);
    out.extend_from_slice(&half_words.to_be_bytes());
    out.push(8); // channel
    out.push(message_type);
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&julian_date.to_be_bytes());
    out.extend_from_slice(&time_ms.to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes());
    out
}

/// Copy `s` into a fixed-size array, space-padded.
fn fixed<const N: usize>(s: &str) -> [u8; N] {
    let mut out = [b' '; N];
    for (dst, src) in out.iter_mut().zip(s.bytes()) {
        *dst = src;
    }
    out
}
