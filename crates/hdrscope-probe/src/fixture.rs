//! In-memory container builders for tests.
//!
//! [`Mp4Builder`] produces a minimal but well-formed ISO-BMFF file: `ftyp`, a
//! `moov` with one track, and an `mdat`. [`MkvBuilder`] produces an EBML
//! header and a Segment holding `Info` and `Tracks`. Only the elements the
//! parsers look at are emitted.

/// Builder for a single-track MP4 movie.
#[derive(Debug, Clone)]
pub struct Mp4Builder {
    handler: [u8; 4],
    width: u16,
    height: u16,
    duration_ms: u32,
    timescale: u32,
    frame_count: u32,
    frame_delta: u32,
    sample_size: u32,
    matrix: [i32; 4],
    colr: Option<Vec<u8>>,
    mdat_bytes: usize,
    moov_last: bool,
}

impl Mp4Builder {
    /// A video track with an `hvc1` sample entry of the given coded size.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            handler: *b"vide",
            width,
            height,
            duration_ms: 1_000,
            timescale: 1_000,
            frame_count: 0,
            frame_delta: 0,
            sample_size: 0,
            matrix: [0x10000, 0, 0, 0x10000],
            colr: None,
            mdat_bytes: 0,
            moov_last: false,
        }
    }

    /// A single sound track and no video.
    pub fn audio_only() -> Self {
        Self {
            handler: *b"soun",
            ..Self::new(0, 0)
        }
    }

    pub fn duration_ms(mut self, ms: u32) -> Self {
        self.duration_ms = ms;
        self
    }

    /// `count` samples of `delta` units each in a media timescale of `timescale`.
    pub fn frames(mut self, count: u32, timescale: u32, delta: u32) -> Self {
        self.frame_count = count;
        self.timescale = timescale;
        self.frame_delta = delta;
        self
    }

    /// Uniform size for every sample.
    pub fn sample_size(mut self, bytes: u32) -> Self {
        self.sample_size = bytes;
        self
    }

    /// Track matrix for a 90 degree clockwise rotation.
    pub fn rotation_90(mut self) -> Self {
        self.matrix = [0, 0x10000, -0x10000, 0];
        self
    }

    /// Arbitrary 16.16 `a, b, c, d` matrix entries.
    pub fn matrix(mut self, a: i32, b: i32, c: i32, d: i32) -> Self {
        self.matrix = [a, b, c, d];
        self
    }

    /// ISO `nclx` color box.
    pub fn nclx(mut self, primaries: u16, transfer: u16, matrix: u16, full_range: bool) -> Self {
        let mut payload = b"nclx".to_vec();
        payload.extend_from_slice(&primaries.to_be_bytes());
        payload.extend_from_slice(&transfer.to_be_bytes());
        payload.extend_from_slice(&matrix.to_be_bytes());
        payload.push(if full_range { 0x80 } else { 0x00 });
        self.colr = Some(payload);
        self
    }

    /// QuickTime `nclc` color box (no range flag).
    pub fn nclc(mut self, primaries: u16, transfer: u16, matrix: u16) -> Self {
        let mut payload = b"nclc".to_vec();
        payload.extend_from_slice(&primaries.to_be_bytes());
        payload.extend_from_slice(&transfer.to_be_bytes());
        payload.extend_from_slice(&matrix.to_be_bytes());
        self.colr = Some(payload);
        self
    }

    /// Zero-filled media payload of `bytes` in the `mdat` box.
    pub fn mdat_bytes(mut self, bytes: usize) -> Self {
        self.mdat_bytes = bytes;
        self
    }

    /// Place `moov` after `mdat`, as files written without a fast-start pass are.
    pub fn moov_last(mut self) -> Self {
        self.moov_last = true;
        self
    }

    /// Serialize the movie.
    pub fn build(&self) -> Vec<u8> {
        let mut ftyp = b"isom".to_vec();
        ftyp.extend_from_slice(&0x200u32.to_be_bytes());
        ftyp.extend_from_slice(b"isomiso2mp41");

        let moov = boxed(b"moov", &[self.mvhd(), self.trak()].concat());
        let mdat = boxed(b"mdat", &vec![0u8; self.mdat_bytes]);

        let mut out = boxed(b"ftyp", &ftyp);
        if self.moov_last {
            out.extend(mdat);
            out.extend(moov);
        } else {
            out.extend(moov);
            out.extend(mdat);
        }
        out
    }

    fn mvhd(&self) -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&[0u8; 8]); // creation, modification
        p.extend_from_slice(&1000u32.to_be_bytes());
        p.extend_from_slice(&self.duration_ms.to_be_bytes());
        p.extend_from_slice(&0x10000u32.to_be_bytes()); // rate
        p.extend_from_slice(&0x0100u16.to_be_bytes()); // volume
        p.extend_from_slice(&[0u8; 10]);
        p.extend(matrix_bytes([0x10000, 0, 0, 0x10000]));
        p.extend_from_slice(&[0u8; 24]);
        p.extend_from_slice(&2u32.to_be_bytes()); // next track id
        full_box(b"mvhd", &p)
    }

    fn trak(&self) -> Vec<u8> {
        boxed(b"trak", &[self.tkhd(), self.mdia()].concat())
    }

    fn tkhd(&self) -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&[0u8; 8]); // creation, modification
        p.extend_from_slice(&1u32.to_be_bytes()); // track id
        p.extend_from_slice(&[0u8; 4]);
        p.extend_from_slice(&self.duration_ms.to_be_bytes());
        p.extend_from_slice(&[0u8; 8]);
        p.extend_from_slice(&[0u8; 8]); // layer, alternate group, volume, reserved
        p.extend(matrix_bytes(self.matrix));
        p.extend_from_slice(&((self.width as u32) << 16).to_be_bytes());
        p.extend_from_slice(&((self.height as u32) << 16).to_be_bytes());
        full_box(b"tkhd", &p)
    }

    fn mdia(&self) -> Vec<u8> {
        let media_duration = (self.duration_ms as u64 * self.timescale as u64 / 1000) as u32;

        let mut mdhd = Vec::new();
        mdhd.extend_from_slice(&[0u8; 8]);
        mdhd.extend_from_slice(&self.timescale.to_be_bytes());
        mdhd.extend_from_slice(&media_duration.to_be_bytes());
        mdhd.extend_from_slice(&[0x55, 0xC4, 0, 0]); // language "und", pre_defined

        let mut hdlr = vec![0u8; 4];
        hdlr.extend_from_slice(&self.handler);
        hdlr.extend_from_slice(&[0u8; 12]);
        hdlr.push(0);

        let stbl = boxed(b"stbl", &[self.stsd(), self.stts(), self.stsz()].concat());
        let minf = boxed(b"minf", &stbl);

        boxed(
            b"mdia",
            &[full_box(b"mdhd", &mdhd), full_box(b"hdlr", &hdlr), minf].concat(),
        )
    }

    fn stsd(&self) -> Vec<u8> {
        if &self.handler != b"vide" {
            return full_box(b"stsd", &0u32.to_be_bytes());
        }

        let mut entry = Vec::new();
        entry.extend_from_slice(&[0u8; 6]);
        entry.extend_from_slice(&1u16.to_be_bytes()); // data reference index
        entry.extend_from_slice(&[0u8; 16]);
        entry.extend_from_slice(&self.width.to_be_bytes());
        entry.extend_from_slice(&self.height.to_be_bytes());
        entry.extend_from_slice(&0x0048_0000u32.to_be_bytes());
        entry.extend_from_slice(&0x0048_0000u32.to_be_bytes());
        entry.extend_from_slice(&[0u8; 4]);
        entry.extend_from_slice(&1u16.to_be_bytes()); // frame count
        entry.extend_from_slice(&[0u8; 32]); // compressor name
        entry.extend_from_slice(&0x0018u16.to_be_bytes());
        entry.extend_from_slice(&0xFFFFu16.to_be_bytes());
        if let Some(colr) = &self.colr {
            entry.extend(boxed(b"colr", colr));
        }

        let mut p = 1u32.to_be_bytes().to_vec();
        p.extend(boxed(b"hvc1", &entry));
        full_box(b"stsd", &p)
    }

    fn stts(&self) -> Vec<u8> {
        let mut p = Vec::new();
        if self.frame_count > 0 {
            p.extend_from_slice(&1u32.to_be_bytes());
            p.extend_from_slice(&self.frame_count.to_be_bytes());
            p.extend_from_slice(&self.frame_delta.to_be_bytes());
        } else {
            p.extend_from_slice(&0u32.to_be_bytes());
        }
        full_box(b"stts", &p)
    }

    fn stsz(&self) -> Vec<u8> {
        let mut p = self.sample_size.to_be_bytes().to_vec();
        p.extend_from_slice(&self.frame_count.to_be_bytes());
        full_box(b"stsz", &p)
    }
}

/// Builder for a Matroska file with one video track and optional audio.
#[derive(Debug, Clone)]
pub struct MkvBuilder {
    doc_type: &'static str,
    codec_id: String,
    width: u64,
    height: u64,
    duration_ms: Option<f64>,
    default_duration_ns: Option<u64>,
    audio_tracks: u32,
    payload_bytes: usize,
}

impl MkvBuilder {
    /// A `V_MPEGH/ISO/HEVC` video track of the given size.
    pub fn new(width: u64, height: u64) -> Self {
        Self {
            doc_type: "matroska",
            codec_id: "V_MPEGH/ISO/HEVC".to_string(),
            width,
            height,
            duration_ms: Some(1_000.0),
            default_duration_ns: None,
            audio_tracks: 0,
            payload_bytes: 0,
        }
    }

    /// WebM doc type with a VP9 track.
    pub fn webm(width: u64, height: u64) -> Self {
        Self {
            doc_type: "webm",
            codec_id: "V_VP9".to_string(),
            ..Self::new(width, height)
        }
    }

    /// Segment duration in milliseconds (default timecode scale); `None` omits it.
    pub fn duration_ms(mut self, ms: Option<f64>) -> Self {
        self.duration_ms = ms;
        self
    }

    /// Per-frame `DefaultDuration` in nanoseconds.
    pub fn default_duration_ns(mut self, ns: u64) -> Self {
        self.default_duration_ns = Some(ns);
        self
    }

    pub fn audio_tracks(mut self, count: u32) -> Self {
        self.audio_tracks = count;
        self
    }

    /// Zero-filled `Void` element after `Tracks`, standing in for clusters.
    pub fn payload_bytes(mut self, bytes: usize) -> Self {
        self.payload_bytes = bytes;
        self
    }

    /// Serialize the file.
    pub fn build(&self) -> Vec<u8> {
        let header = element(
            EBML,
            &[
                uint(EBML_VERSION, 1),
                uint(EBML_READ_VERSION, 1),
                element(DOC_TYPE, self.doc_type.as_bytes()),
                uint(DOC_TYPE_VERSION, 4),
            ]
            .concat(),
        );

        let mut info = uint(TIMECODE_SCALE, 1_000_000);
        if let Some(ms) = self.duration_ms {
            info.extend(element(DURATION, &ms.to_be_bytes()));
        }

        let mut video_entry = [
            uint(TRACK_NUMBER, 1),
            uint(TRACK_TYPE, 1),
            element(CODEC_ID, self.codec_id.as_bytes()),
        ]
        .concat();
        if let Some(ns) = self.default_duration_ns {
            video_entry.extend(uint(DEFAULT_DURATION, ns));
        }
        video_entry.extend(element(
            VIDEO,
            &[uint(PIXEL_WIDTH, self.width), uint(PIXEL_HEIGHT, self.height)].concat(),
        ));

        let mut tracks = element(TRACK_ENTRY, &video_entry);
        for n in 0..self.audio_tracks {
            let entry = [
                uint(TRACK_NUMBER, 2 + n as u64),
                uint(TRACK_TYPE, 2),
                element(CODEC_ID, b"A_OPUS"),
            ]
            .concat();
            tracks.extend(element(TRACK_ENTRY, &entry));
        }

        let mut segment = element(INFO, &info);
        segment.extend(element(TRACKS, &tracks));
        if self.payload_bytes > 0 {
            segment.extend(element(VOID, &vec![0u8; self.payload_bytes]));
        }

        let mut out = header;
        out.extend(element(SEGMENT, &segment));
        out
    }
}

const EBML: u32 = 0x1A45_DFA3;
const EBML_VERSION: u32 = 0x4286;
const EBML_READ_VERSION: u32 = 0x42F7;
const DOC_TYPE: u32 = 0x4282;
const DOC_TYPE_VERSION: u32 = 0x4287;
const SEGMENT: u32 = 0x1853_8067;
const INFO: u32 = 0x1549_A966;
const TIMECODE_SCALE: u32 = 0x2A_D7B1;
const DURATION: u32 = 0x4489;
const TRACKS: u32 = 0x1654_AE6B;
const TRACK_ENTRY: u32 = 0xAE;
const TRACK_NUMBER: u32 = 0xD7;
const TRACK_TYPE: u32 = 0x83;
const CODEC_ID: u32 = 0x86;
const DEFAULT_DURATION: u32 = 0x23_E383;
const VIDEO: u32 = 0xE0;
const PIXEL_WIDTH: u32 = 0xB0;
const PIXEL_HEIGHT: u32 = 0xBA;
const VOID: u32 = 0xEC;

/// EBML element with an 8-byte size field.
fn element(id: u32, payload: &[u8]) -> Vec<u8> {
    let id_bytes = id.to_be_bytes();
    let skip = id_bytes.iter().take_while(|b| **b == 0).count();
    let mut out = id_bytes[skip..].to_vec();
    out.push(0x01);
    out.extend_from_slice(&(payload.len() as u64).to_be_bytes()[1..]);
    out.extend_from_slice(payload);
    out
}

fn uint(id: u32, value: u64) -> Vec<u8> {
    element(id, &value.to_be_bytes())
}

fn boxed(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
    out.extend_from_slice(kind);
    out.extend_from_slice(payload);
    out
}

/// Box with version 0 and zero flags.
fn full_box(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    boxed(kind, &[&[0u8; 4][..], payload].concat())
}

fn matrix_bytes([a, b, c, d]: [i32; 4]) -> Vec<u8> {
    [a, b, 0, c, d, 0, 0, 0, 0x4000_0000]
        .iter()
        .flat_map(|v| v.to_be_bytes())
        .collect()
}
