//! MP4 file reader with atom parsing.

use std::io::{Read, Seek, SeekFrom};

use super::atoms::{Atom, AtomType, HandlerType, TrackInfo, VisualSampleEntry};
use super::Mp4File;
use crate::error::ProbeError;
use crate::types::{ColorDescription, ColorSource, TransformMatrix};

/// Maximum allowed atom data size (64 MB) to prevent OOM on malformed files.
const MAX_ATOM_DATA_SIZE: u64 = 64 * 1024 * 1024;

/// Offset of the first child box inside `stsd` data for a visual entry:
/// stsd header (8) + entry header (8) + SampleEntry (8) + VisualSampleEntry (70).
const VISUAL_ENTRY_CHILDREN: usize = 94;

/// MP4 file reader.
pub struct Mp4Reader<R> {
    reader: R,
    file_size: u64,
}

impl<R: Read + Seek> Mp4Reader<R> {
    /// Create a new MP4 reader.
    pub fn new(mut reader: R) -> Result<Self, ProbeError> {
        let file_size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        Ok(Self { reader, file_size })
    }

    /// Parse the MP4 file.
    pub fn parse(&mut self) -> Result<Mp4File, ProbeError> {
        let mut mp4 = Mp4File {
            file_size: self.file_size,
            duration: 0,
            timescale: 0,
            tracks: Vec::new(),
        };

        let atoms = self.read_atoms(0, self.file_size)?;
        if atoms.is_empty() {
            return Err(ProbeError::parse("no atoms found"));
        }

        let moov = atoms
            .iter()
            .find(|a| a.atom_type == AtomType::MOOV)
            .ok_or_else(|| ProbeError::parse("missing moov atom"))?;
        self.parse_moov(moov, &mut mp4)?;

        Ok(mp4)
    }

    /// Read atoms at the given level.
    fn read_atoms(&mut self, start: u64, end: u64) -> Result<Vec<Atom>, ProbeError> {
        let mut atoms = Vec::new();
        let mut pos = start;

        while end.saturating_sub(pos) >= 8 {
            self.reader.seek(SeekFrom::Start(pos))?;

            let mut header = [0u8; 8];
            if self.reader.read_exact(&mut header).is_err() {
                break;
            }

            let size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as u64;
            let atom_type = AtomType::from_bytes([header[4], header[5], header[6], header[7]]);

            let (actual_size, header_size) = if size == 1 {
                // 64-bit extended size
                let mut ext = [0u8; 8];
                if self.reader.read_exact(&mut ext).is_err() {
                    break;
                }
                (u64::from_be_bytes(ext), 16u8)
            } else if size == 0 {
                // Atom extends to end of the enclosing range
                (end - pos, 8u8)
            } else {
                (size, 8u8)
            };

            if actual_size < header_size as u64 {
                break;
            }

            let remaining = end - pos;
            atoms.push(Atom {
                atom_type,
                size: actual_size.min(remaining),
                data_offset: pos + header_size as u64,
                header_size,
            });

            // A box claiming more than its parent holds is truncated; nothing follows it
            if actual_size >= remaining {
                break;
            }
            pos += actual_size;
        }

        Ok(atoms)
    }

    /// Read and validate atom data, rejecting oversized atoms.
    fn read_atom_data(&mut self, atom: &Atom) -> Result<Vec<u8>, ProbeError> {
        let size = atom.data_size();
        if size > MAX_ATOM_DATA_SIZE {
            return Err(ProbeError::InvalidData(format!(
                "Atom {} data size {} exceeds maximum {}",
                atom.atom_type, size, MAX_ATOM_DATA_SIZE
            )));
        }
        self.reader.seek(SeekFrom::Start(atom.data_offset))?;
        let mut data = vec![0u8; size as usize];
        self.reader.read_exact(&mut data)?;
        Ok(data)
    }

    /// Parse moov atom.
    fn parse_moov(&mut self, moov: &Atom, mp4: &mut Mp4File) -> Result<(), ProbeError> {
        let children = self.read_atoms(moov.data_offset, moov.end())?;

        for child in &children {
            match child.atom_type {
                AtomType::MVHD => self.parse_mvhd(child, mp4)?,
                AtomType::TRAK => match self.parse_trak(child) {
                    Ok(track) => mp4.tracks.push(track),
                    Err(e) => {
                        tracing::debug!(error = %e, "skipping unreadable trak");
                    }
                },
                _ => {}
            }
        }

        Ok(())
    }

    /// Parse mvhd (movie header).
    fn parse_mvhd(&mut self, atom: &Atom, mp4: &mut Mp4File) -> Result<(), ProbeError> {
        let data = self.read_atom_data(atom)?;

        match data.first() {
            Some(0) => {
                if let (Some(ts), Some(dur)) = (be_u32(&data, 12), be_u32(&data, 16)) {
                    mp4.timescale = ts;
                    // All ones means "unknown"
                    mp4.duration = if dur == u32::MAX { 0 } else { dur as u64 };
                }
            }
            Some(_) => {
                if let (Some(ts), Some(dur)) = (be_u32(&data, 20), be_u64(&data, 24)) {
                    mp4.timescale = ts;
                    mp4.duration = if dur == u64::MAX { 0 } else { dur };
                }
            }
            None => {}
        }

        Ok(())
    }

    /// Parse trak (track) atom.
    fn parse_trak(&mut self, trak: &Atom) -> Result<TrackInfo, ProbeError> {
        let children = self.read_atoms(trak.data_offset, trak.end())?;

        let mut track = TrackInfo::new(0);

        for child in &children {
            match child.atom_type {
                AtomType::TKHD => self.parse_tkhd(child, &mut track)?,
                AtomType::MDIA => self.parse_mdia(child, &mut track)?,
                _ => {}
            }
        }

        Ok(track)
    }

    /// Parse tkhd (track header): track id, transform matrix and size.
    fn parse_tkhd(&mut self, atom: &Atom, track: &mut TrackInfo) -> Result<(), ProbeError> {
        let data = self.read_atom_data(atom)?;

        let (id_offset, matrix_offset) = match data.first() {
            Some(0) => (12, 40),
            Some(_) => (20, 52),
            None => return Ok(()),
        };

        if let Some(id) = be_u32(&data, id_offset) {
            track.track_id = id;
        }

        // Matrix {a, b, u, c, d, v, x, y, w}; u, v, w are 2.30 and unused
        let entry = |i: usize| be_i32(&data, matrix_offset + i * 4);
        if let (Some(a), Some(b), Some(c), Some(d), Some(x), Some(y)) =
            (entry(0), entry(1), entry(3), entry(4), entry(6), entry(7))
        {
            track.transform = Some(TransformMatrix::from_fixed(a, b, c, d, x, y));
        }

        // Width and height at fixed point 16.16, right after the matrix
        let size_offset = matrix_offset + 36;
        if let (Some(w), Some(h)) = (be_u32(&data, size_offset), be_u32(&data, size_offset + 4)) {
            track.width = Some(w >> 16);
            track.height = Some(h >> 16);
        }

        Ok(())
    }

    /// Parse mdia (media) atom.
    fn parse_mdia(&mut self, mdia: &Atom, track: &mut TrackInfo) -> Result<(), ProbeError> {
        let children = self.read_atoms(mdia.data_offset, mdia.end())?;

        // hdlr decides how stsd is read, so handle it before minf
        if let Some(hdlr) = children.iter().find(|c| c.atom_type == AtomType::HDLR) {
            self.parse_hdlr(hdlr, track)?;
        }

        for child in &children {
            match child.atom_type {
                AtomType::MDHD => self.parse_mdhd(child, track)?,
                AtomType::MINF => self.parse_minf(child, track)?,
                _ => {}
            }
        }

        Ok(())
    }

    /// Parse mdhd (media header).
    fn parse_mdhd(&mut self, atom: &Atom, track: &mut TrackInfo) -> Result<(), ProbeError> {
        let data = self.read_atom_data(atom)?;

        match data.first() {
            Some(0) => {
                if let (Some(ts), Some(dur)) = (be_u32(&data, 12), be_u32(&data, 16)) {
                    track.timescale = ts;
                    track.duration = dur as u64;
                }
            }
            Some(_) => {
                if let (Some(ts), Some(dur)) = (be_u32(&data, 20), be_u64(&data, 24)) {
                    track.timescale = ts;
                    track.duration = if dur == u64::MAX { 0 } else { dur };
                }
            }
            None => {}
        }

        Ok(())
    }

    /// Parse hdlr (handler) atom.
    fn parse_hdlr(&mut self, atom: &Atom, track: &mut TrackInfo) -> Result<(), ProbeError> {
        let data = self.read_atom_data(atom)?;

        if data.len() >= 12 {
            track.handler_type = HandlerType::from_bytes([data[8], data[9], data[10], data[11]]);
        }

        Ok(())
    }

    /// Parse minf (media info) atom.
    fn parse_minf(&mut self, minf: &Atom, track: &mut TrackInfo) -> Result<(), ProbeError> {
        let children = self.read_atoms(minf.data_offset, minf.end())?;

        for child in &children {
            if child.atom_type == AtomType::STBL {
                self.parse_stbl(child, track)?;
            }
        }

        Ok(())
    }

    /// Parse stbl (sample table) atom.
    fn parse_stbl(&mut self, stbl: &Atom, track: &mut TrackInfo) -> Result<(), ProbeError> {
        let children = self.read_atoms(stbl.data_offset, stbl.end())?;

        for child in &children {
            match child.atom_type {
                AtomType::STSD => self.parse_stsd(child, track)?,
                AtomType::STTS => self.parse_stts(child, track)?,
                AtomType::STSZ => self.parse_stsz(child, track)?,
                _ => {}
            }
        }

        Ok(())
    }

    /// Parse stts (decoding time to sample) into sample count and total duration.
    fn parse_stts(&mut self, atom: &Atom, track: &mut TrackInfo) -> Result<(), ProbeError> {
        let data = self.read_atom_data(atom)?;

        let Some(entry_count) = be_u32(&data, 4) else {
            return Ok(());
        };

        let mut sample_count = 0u64;
        let mut delta_total = 0u64;
        for i in 0..entry_count as usize {
            let offset = 8 + i * 8;
            let (Some(count), Some(delta)) = (be_u32(&data, offset), be_u32(&data, offset + 4))
            else {
                break;
            };
            sample_count += count as u64;
            delta_total = delta_total.saturating_add(count as u64 * delta as u64);
        }

        track.sample_count = sample_count;
        track.sample_delta_total = delta_total;
        Ok(())
    }

    /// Parse stsz (sample size) into the total payload size.
    fn parse_stsz(&mut self, atom: &Atom, track: &mut TrackInfo) -> Result<(), ProbeError> {
        let data = self.read_atom_data(atom)?;

        let (Some(uniform_size), Some(sample_count)) = (be_u32(&data, 4), be_u32(&data, 8)) else {
            return Ok(());
        };

        track.sample_bytes = if uniform_size != 0 {
            uniform_size as u64 * sample_count as u64
        } else {
            (0..sample_count as usize)
                .map_while(|i| be_u32(&data, 12 + i * 4))
                .map(u64::from)
                .sum()
        };

        Ok(())
    }

    /// Parse stsd (sample description): the first visual sample entry.
    fn parse_stsd(&mut self, atom: &Atom, track: &mut TrackInfo) -> Result<(), ProbeError> {
        if !track.handler_type.is_video() {
            return Ok(());
        }

        let data = self.read_atom_data(atom)?;

        // Skip version/flags (4) and entry count (4), then the first entry
        let (Some(entry_size), Some(format)) = (be_u32(&data, 8), fourcc(&data, 12)) else {
            return Ok(());
        };
        let (Some(width), Some(height)) = (be_u16(&data, 40), be_u16(&data, 42)) else {
            return Ok(());
        };

        let entry_end = (8 + entry_size as usize).min(data.len());
        let color = find_colr(&data, VISUAL_ENTRY_CHILDREN, entry_end);

        track.visual_entry = Some(VisualSampleEntry {
            format,
            width,
            height,
            color,
        });

        Ok(())
    }
}

/// Scan the child boxes of a visual sample entry for a `colr` box.
fn find_colr(data: &[u8], start: usize, end: usize) -> Option<ColorDescription> {
    let mut pos = start;
    while pos + 8 <= end {
        let box_size = be_u32(data, pos)? as usize;
        if box_size < 8 || pos + box_size > end {
            break;
        }

        if fourcc(data, pos + 4) == Some(AtomType::COLR) {
            if let Some(color) = parse_colr(&data[pos + 8..pos + box_size]) {
                return Some(color);
            }
        }

        pos += box_size;
    }
    None
}

/// Parse a `colr` payload. ICC profiles (`prof`, `rICC`) carry no codes.
fn parse_colr(payload: &[u8]) -> Option<ColorDescription> {
    let colour_type = payload.get(0..4)?;
    let source = match colour_type {
        b"nclx" => ColorSource::Nclx,
        b"nclc" => ColorSource::Nclc,
        _ => return None,
    };

    let full_range = match source {
        ColorSource::Nclx => Some(payload.get(10)? & 0x80 != 0),
        ColorSource::Nclc => None,
    };

    Some(ColorDescription {
        source,
        primaries: be_u16(payload, 4)?,
        transfer: be_u16(payload, 6)?,
        matrix: be_u16(payload, 8)?,
        full_range,
    })
}

fn fourcc(data: &[u8], offset: usize) -> Option<AtomType> {
    let bytes: [u8; 4] = data.get(offset..offset + 4)?.try_into().ok()?;
    Some(AtomType::from_bytes(bytes))
}

fn be_u16(data: &[u8], offset: usize) -> Option<u16> {
    Some(u16::from_be_bytes(data.get(offset..offset + 2)?.try_into().ok()?))
}

fn be_u32(data: &[u8], offset: usize) -> Option<u32> {
    Some(u32::from_be_bytes(data.get(offset..offset + 4)?.try_into().ok()?))
}

fn be_i32(data: &[u8], offset: usize) -> Option<i32> {
    Some(i32::from_be_bytes(data.get(offset..offset + 4)?.try_into().ok()?))
}

fn be_u64(data: &[u8], offset: usize) -> Option<u64> {
    Some(u64::from_be_bytes(data.get(offset..offset + 8)?.try_into().ok()?))
}
