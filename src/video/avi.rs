//! # MJPG AVI container
//!
//! A reader and writer for RIFF AVI files carrying a single Motion JPEG video stream, where every
//! frame is stored as a standalone JPEG image.
//!
//! The writer produces plain AVI 1.0 files with an `idx1` index. The reader also follows OpenDML
//! `AVIX` continuation segments, so long recordings from other tools can be read in full.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use log::{debug, warn};

use crate::error::*;
use crate::video::{FrameSink, FrameSource};

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// `avih` flag: the file carries an `idx1` index.
const AVIF_HASINDEX: u32 = 0x10;

/// `idx1` flag: the chunk is a key frame. Every MJPG frame is one.
const AVIIF_KEYFRAME: u32 = 0x10;

const AVIH_LEN: u32 = 56;
const STRH_LEN: u32 = 56;
const STRF_LEN: u32 = 40;

/// Id of the video chunks written by [`MjpegAviWriter`], stream 0 compressed video.
const VIDEO_CHUNK_ID: &[u8; 4] = b"00dc";

/// FourCCs accepted as Motion JPEG.
const MJPG_FOURCCS: [&[u8; 4]; 3] = [b"MJPG", b"mjpg", b"JPEG"];

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Video stream properties read from an AVI header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AviInfo {
    pub width: u32,
    pub height: u32,
    pub micro_sec_per_frame: u32,
    pub total_frames: u32,
    pub rate: u32,
    pub scale: u32,
    pub codec: [u8; 4],
    /// Index of the video stream, used as the first two characters of its chunk ids.
    pub stream: u32
}

/// Reads MJPG frames from an AVI file.
pub struct AviReader<R: Read + Seek> {
    input: R,
    info: AviInfo,
    /// Position of the next unread chunk.
    pos: u64,
    movi_end: u64,
    riff_end: u64,
    file_len: u64,
    stream_tag: [u8; 2],
    last: Option<RgbImage>
}

/// Writes frames into an MJPG AVI file.
pub struct MjpegAviWriter<W: Write + Seek> {
    out: W,
    width: u32,
    height: u32,
    quality: u8,
    pos: u64,
    movi_fourcc_pos: u64,
    patches: HeaderPatches,
    index: Vec<(u32, u32)>,
    max_chunk: u32
}

/// Header fields that are only known once all frames are written.
#[derive(Debug, Clone, Copy, Default)]
struct HeaderPatches {
    riff_size: u64,
    total_frames: u64,
    avih_buffer_size: u64,
    strh_length: u64,
    strh_buffer_size: u64,
    movi_size: u64
}

/// Little endian byte buffer used to lay out headers.
struct ChunkBuf(Vec<u8>);

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl AviInfo {
    pub fn frame_rate(&self) -> Option<f64> {
        if self.scale > 0 && self.rate > 0 {
            Some(self.rate as f64 / self.scale as f64)
        }
        else if self.micro_sec_per_frame > 0 {
            Some(1_000_000.0 / self.micro_sec_per_frame as f64)
        }
        else {
            None
        }
    }

    pub fn is_mjpg(&self) -> bool {
        MJPG_FOURCCS.iter().any(|f| **f == self.codec)
    }
}

impl AviReader<BufReader<File>> {
    /// Open an AVI file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> AviReader<R> {
    /// Parse the AVI headers, leaving the reader positioned at the first frame.
    pub fn new(mut input: R) -> Result<Self> {
        let file_len = input.seek(SeekFrom::End(0))?;
        input.seek(SeekFrom::Start(0))?;

        let (riff_id, riff_size) = read_chunk_header(&mut input)?;
        let riff_type = read_fourcc(&mut input)?;
        if &riff_id != b"RIFF" || &riff_type != b"AVI " {
            return Err(Error::Avi("missing RIFF AVI signature".into()));
        }
        let riff_end = (8 + riff_size as u64).min(file_len);

        let mut info: Option<AviInfo> = None;
        let mut movi = None;
        let mut pos = 12u64;

        while pos + 8 <= riff_end {
            input.seek(SeekFrom::Start(pos))?;
            let (id, size) = read_chunk_header(&mut input)?;
            let body = pos + 8;
            let next = body + padded(size);

            if &id == b"LIST" && size >= 4 {
                match &read_fourcc(&mut input)? {
                    b"hdrl" => {
                        if body + size as u64 > riff_end {
                            return Err(Error::Avi(format!(
                                "hdrl list of {} bytes overruns the file",
                                size
                            )));
                        }
                        let mut buf = vec![0u8; size as usize - 4];
                        input.read_exact(&mut buf)?;
                        info = Some(parse_hdrl(&buf)?);
                    },
                    b"movi" => {
                        movi = Some((body + 4, (body + size as u64).min(file_len)));
                        break;
                    },
                    _ => ()
                }
            }

            pos = next;
        }

        let info = info.ok_or_else(|| Error::Avi("no hdrl header list".into()))?;
        let (movi_start, movi_end) = movi.ok_or_else(|| Error::Avi("no movi list".into()))?;

        if info.width == 0 || info.height == 0 {
            return Err(Error::Avi("no video stream".into()));
        }
        if !info.is_mjpg() {
            return Err(Error::Avi(format!(
                "unsupported codec {:?}",
                String::from_utf8_lossy(&info.codec)
            )));
        }

        debug!("AVI stream: {:?}", info);

        let tag = format!("{:02}", info.stream % 100);
        let tag = tag.as_bytes();

        Ok(Self {
            input,
            stream_tag: [tag[0], tag[1]],
            info,
            pos: movi_start,
            movi_end,
            riff_end,
            file_len,
            last: None
        })
    }

    pub fn info(&self) -> &AviInfo {
        &self.info
    }

    /// Read the next compressed video chunk.
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            if self.pos + 8 > self.movi_end {
                if !self.next_segment()? {
                    return Ok(None);
                }
                continue;
            }

            self.input.seek(SeekFrom::Start(self.pos))?;
            let (id, size) = read_chunk_header(&mut self.input)?;
            let body = self.pos + 8;

            // Descend into `rec ` groups rather than skipping them
            if &id == b"LIST" {
                self.pos = body + 4;
                continue;
            }

            self.pos = body + padded(size);

            let is_video = id[0..2] == self.stream_tag && (&id[2..4] == b"dc" || &id[2..4] == b"db");
            if !is_video {
                continue;
            }

            if body + size as u64 > self.movi_end {
                warn!("Truncated video chunk at offset {}, stopping", body - 8);
                self.pos = self.movi_end;
                self.riff_end = self.file_len;
                return Ok(None);
            }

            let mut data = vec![0u8; size as usize];
            self.input.read_exact(&mut data)?;
            return Ok(Some(data));
        }
    }

    /// Move to the `movi` list of the following `AVIX` segment, if there is one.
    fn next_segment(&mut self) -> Result<bool> {
        let mut pos = self.riff_end + (self.riff_end & 1);
        if pos + 12 > self.file_len {
            return Ok(false);
        }

        self.input.seek(SeekFrom::Start(pos))?;
        let (id, size) = read_chunk_header(&mut self.input)?;
        let kind = read_fourcc(&mut self.input)?;
        if &id != b"RIFF" || &kind != b"AVIX" {
            return Ok(false);
        }

        let seg_end = (pos + 8 + size as u64).min(self.file_len);
        self.riff_end = seg_end;
        pos += 12;

        while pos + 12 <= seg_end {
            self.input.seek(SeekFrom::Start(pos))?;
            let (id, size) = read_chunk_header(&mut self.input)?;
            if &id == b"LIST" && &read_fourcc(&mut self.input)? == b"movi" {
                self.pos = pos + 12;
                self.movi_end = (pos + 8 + size as u64).min(seg_end);
                debug!("Continuing into AVIX segment at offset {}", pos);
                return Ok(true);
            }
            pos += 8 + padded(size);
        }

        // A segment without frames, try the one after it
        self.next_segment()
    }
}

impl<R: Read + Seek> FrameSource for AviReader<R> {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        loop {
            let data = match self.next_chunk()? {
                Some(d) => d,
                None => return Ok(None)
            };

            // Empty chunks mark dropped frames, which repeat the previous one
            if data.is_empty() {
                match &self.last {
                    Some(last) => return Ok(Some(last.clone())),
                    None => continue
                }
            }

            let frame = image::load_from_memory_with_format(&data, ImageFormat::Jpeg)?
                .into_rgb8();
            self.last = Some(frame.clone());
            return Ok(Some(frame));
        }
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn frame_rate(&self) -> Option<f64> {
        self.info.frame_rate()
    }
}

impl MjpegAviWriter<BufWriter<File>> {
    /// Create an MJPG AVI file at the given path.
    pub fn create<P: AsRef<Path>>(
        path: P,
        width: u32,
        height: u32,
        fps: u32,
        quality: u8
    ) -> Result<Self> {
        Self::new(BufWriter::new(File::create(path)?), width, height, fps, quality)
    }
}

impl<W: Write + Seek> MjpegAviWriter<W> {
    /// Start an AVI stream of fixed frame size and rate.
    pub fn new(mut out: W, width: u32, height: u32, fps: u32, quality: u8) -> Result<Self> {
        if width == 0 || height == 0 || fps == 0 {
            return Err(Error::Writer(format!(
                "invalid stream of {}x{} at {} fps",
                width, height, fps
            )));
        }

        let mut patches = HeaderPatches::default();
        let mut h = ChunkBuf(Vec::with_capacity(256));

        h.fourcc(b"RIFF");
        patches.riff_size = h.u32(0);
        h.fourcc(b"AVI ");

        h.fourcc(b"LIST");
        let hdrl_size = h.u32(0);
        h.fourcc(b"hdrl");

        h.fourcc(b"avih");
        h.u32(AVIH_LEN);
        h.u32(1_000_000 / fps);
        h.u32(0);
        h.u32(0);
        h.u32(AVIF_HASINDEX);
        patches.total_frames = h.u32(0);
        h.u32(0);
        h.u32(1);
        patches.avih_buffer_size = h.u32(0);
        h.u32(width);
        h.u32(height);
        for _ in 0..4 {
            h.u32(0);
        }

        h.fourcc(b"LIST");
        let strl_size = h.u32(0);
        h.fourcc(b"strl");

        h.fourcc(b"strh");
        h.u32(STRH_LEN);
        h.fourcc(b"vids");
        h.fourcc(b"MJPG");
        h.u32(0);
        h.u16(0);
        h.u16(0);
        h.u32(0);
        h.u32(1);
        h.u32(fps);
        h.u32(0);
        patches.strh_length = h.u32(0);
        patches.strh_buffer_size = h.u32(0);
        h.u32(u32::MAX);
        h.u32(0);
        h.u16(0);
        h.u16(0);
        h.u16(width.min(i16::MAX as u32) as u16);
        h.u16(height.min(i16::MAX as u32) as u16);

        h.fourcc(b"strf");
        h.u32(STRF_LEN);
        h.u32(STRF_LEN);
        h.u32(width);
        h.u32(height);
        h.u16(1);
        h.u16(24);
        h.fourcc(b"MJPG");
        h.u32(width.saturating_mul(height).saturating_mul(3));
        for _ in 0..4 {
            h.u32(0);
        }

        let hdrl_end = h.0.len() as u32;
        h.set_u32(hdrl_size, hdrl_end - (hdrl_size as u32 + 4));
        h.set_u32(strl_size, hdrl_end - (strl_size as u32 + 4));

        h.fourcc(b"LIST");
        patches.movi_size = h.u32(0);
        let movi_fourcc_pos = h.0.len() as u64;
        h.fourcc(b"movi");

        out.write_all(&h.0)?;

        Ok(Self {
            out,
            width,
            height,
            quality,
            pos: h.0.len() as u64,
            movi_fourcc_pos,
            patches,
            index: Vec::new(),
            max_chunk: 0
        })
    }

    pub fn frames_written(&self) -> usize {
        self.index.len()
    }

    /// Encode a frame as JPEG and append it to the stream.
    pub fn write(&mut self, frame: &RgbImage) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(Error::Writer(format!(
                "frame is {}x{} but the stream is {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.quality).encode_image(frame)?;

        let len = jpeg.len() as u64;
        if self.pos + 8 + padded_u64(len) + 16 * (self.index.len() as u64 + 1) + 8
            > u32::MAX as u64
        {
            return Err(Error::Writer("AVI files are limited to 4 GiB".into()));
        }

        self.index.push(((self.pos - self.movi_fourcc_pos) as u32, len as u32));
        self.max_chunk = self.max_chunk.max(len as u32);

        self.out.write_all(VIDEO_CHUNK_ID)?;
        self.out.write_all(&(len as u32).to_le_bytes())?;
        self.out.write_all(&jpeg)?;
        if len & 1 == 1 {
            self.out.write_all(&[0])?;
        }
        self.pos += 8 + padded_u64(len);

        Ok(())
    }

    /// Write the index, fill in the header and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        let movi_end = self.pos;

        self.out.write_all(b"idx1")?;
        self.out.write_all(&(16 * self.index.len() as u32).to_le_bytes())?;
        for &(offset, size) in &self.index {
            self.out.write_all(VIDEO_CHUNK_ID)?;
            self.out.write_all(&AVIIF_KEYFRAME.to_le_bytes())?;
            self.out.write_all(&offset.to_le_bytes())?;
            self.out.write_all(&size.to_le_bytes())?;
        }
        let end = movi_end + 8 + 16 * self.index.len() as u64;

        let frames = self.index.len() as u32;
        let patches = [
            (self.patches.riff_size, (end - 8) as u32),
            (self.patches.total_frames, frames),
            (self.patches.avih_buffer_size, self.max_chunk),
            (self.patches.strh_length, frames),
            (self.patches.strh_buffer_size, self.max_chunk),
            (self.patches.movi_size, (movi_end - self.movi_fourcc_pos) as u32)
        ];
        for (at, val) in patches {
            self.out.seek(SeekFrom::Start(at))?;
            self.out.write_all(&val.to_le_bytes())?;
        }

        self.out.seek(SeekFrom::Start(end))?;
        self.out.flush()?;

        debug!("Finished AVI with {} frames", frames);
        Ok(self.out)
    }
}

impl<W: Write + Seek> FrameSink for MjpegAviWriter<W> {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        self.write(frame)
    }
}

impl ChunkBuf {
    fn fourcc(&mut self, id: &[u8; 4]) {
        self.0.extend_from_slice(id);
    }

    /// Append a value, returning its offset for later patching.
    fn u32(&mut self, v: u32) -> u64 {
        let at = self.0.len() as u64;
        self.0.extend_from_slice(&v.to_le_bytes());
        at
    }

    fn u16(&mut self, v: u16) {
        self.0.extend_from_slice(&v.to_le_bytes());
    }

    fn set_u32(&mut self, at: u64, v: u32) {
        let at = at as usize;
        self.0[at..at + 4].copy_from_slice(&v.to_le_bytes());
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Chunk bodies are padded to an even length.
fn padded(size: u32) -> u64 {
    padded_u64(size as u64)
}

fn padded_u64(size: u64) -> u64 {
    size + (size & 1)
}

fn read_fourcc<R: Read>(input: &mut R) -> Result<[u8; 4]> {
    let mut id = [0u8; 4];
    input.read_exact(&mut id)?;
    Ok(id)
}

fn read_chunk_header<R: Read>(input: &mut R) -> Result<([u8; 4], u32)> {
    let id = read_fourcc(input)?;
    let size = u32::from_le_bytes(read_fourcc(input)?);
    Ok((id, size))
}

fn le_u32(buf: &[u8], at: usize) -> Result<u32> {
    buf.get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| Error::Avi(format!("header field at {} out of bounds", at)))
}

/// Iterate the `(id, body)` sub-chunks of a list body.
fn sub_chunks(buf: &[u8]) -> impl Iterator<Item = ([u8; 4], &[u8])> {
    let mut pos = 0usize;

    std::iter::from_fn(move || {
        if pos + 8 > buf.len() {
            return None;
        }
        let id = [buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]];
        let size = u32::from_le_bytes([buf[pos + 4], buf[pos + 5], buf[pos + 6], buf[pos + 7]])
            as usize;
        let body = &buf[pos + 8..(pos + 8 + size).min(buf.len())];
        pos += 8 + size + (size & 1);
        Some((id, body))
    })
}

/// Parse the body of the `hdrl` list, keeping the first video stream.
fn parse_hdrl(buf: &[u8]) -> Result<AviInfo> {
    let mut info = AviInfo::default();
    let mut stream = 0u32;
    let mut found = false;

    for (id, body) in sub_chunks(buf) {
        match &id {
            b"avih" => {
                info.micro_sec_per_frame = le_u32(body, 0)?;
                info.total_frames = le_u32(body, 16)?;
                info.width = le_u32(body, 32)?;
                info.height = le_u32(body, 36)?;
            },
            b"LIST" if !found && body.len() >= 4 && &body[0..4] == b"strl" => {
                found = parse_strl(&body[4..], &mut info)?;
                if found {
                    info.stream = stream;
                }
                stream += 1;
            },
            _ => ()
        }
    }

    if !found {
        return Err(Error::Avi("no video stream".into()));
    }

    Ok(info)
}

/// Parse a stream list, returning whether it describes a video stream.
fn parse_strl(buf: &[u8], info: &mut AviInfo) -> Result<bool> {
    let mut is_video = false;

    for (id, body) in sub_chunks(buf) {
        match &id {
            b"strh" => {
                if body.get(0..4) != Some(b"vids".as_slice()) {
                    return Ok(false);
                }
                if body.len() < 28 {
                    return Err(Error::Avi("short strh chunk".into()));
                }
                is_video = true;
                info.codec.copy_from_slice(&body[4..8]);
                info.scale = le_u32(body, 20)?;
                info.rate = le_u32(body, 24)?;
            },
            b"strf" if is_video => {
                let width = le_u32(body, 4)? as i32;
                let height = le_u32(body, 8)? as i32;
                info.width = width.unsigned_abs();
                info.height = height.unsigned_abs();

                // The bitmap compression is authoritative over the stream handler
                let compression = body
                    .get(16..20)
                    .ok_or_else(|| Error::Avi("short strf chunk".into()))?;
                if compression.iter().any(|&b| b != 0) {
                    info.codec.copy_from_slice(compression);
                }
            },
            _ => ()
        }
    }

    Ok(is_video)
}
