//! MJPG AVI writing and reading.

use std::fs::File;
use std::io::{Cursor, Read};

use cv_crestereo::prelude::*;
use cv_crestereo::video::avi::{AviReader, MjpegAviWriter};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};

fn solid(w: u32, h: u32, rgb: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(w, h, Rgb(rgb))
}

fn close(a: &Rgb<u8>, b: [u8; 3]) -> bool {
    a.0.iter().zip(b.iter()).all(|(&x, &y)| (x as i16 - y as i16).abs() <= 4)
}

fn le_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

#[test]
fn written_file_reads_back() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("out.avi");

    let colours = [[250, 20, 20], [20, 250, 20], [20, 20, 250], [128, 128, 128]];

    let mut writer = MjpegAviWriter::create(&path, 48, 16, 10, 95)?;
    for c in colours {
        writer.write(&solid(48, 16, c))?;
    }
    assert_eq!(writer.frames_written(), 4);
    writer.finish()?;

    let mut reader = AviReader::open(&path)?;
    assert_eq!(reader.dimensions(), (48, 16));
    assert_eq!(reader.info().total_frames, 4);
    assert_eq!(reader.frame_rate(), Some(10.0));

    for c in colours {
        let frame = reader.next_frame()?.expect("missing frame");
        assert_eq!(frame.dimensions(), (48, 16));
        assert!(close(frame.get_pixel(24, 8), c), "{:?} != {:?}", frame.get_pixel(24, 8), c);
    }
    assert!(reader.next_frame()?.is_none());

    Ok(())
}

#[test]
fn header_sizes_are_consistent() -> Result<()> {
    let mut writer = MjpegAviWriter::new(Cursor::new(Vec::new()), 32, 16, 10, 80)?;
    writer.write(&solid(32, 16, [1, 2, 3]))?;
    writer.write(&solid(32, 16, [4, 5, 6]))?;
    let buf = writer.finish()?.into_inner();

    assert_eq!(&buf[0..4], b"RIFF");
    assert_eq!(le_u32(&buf, 4) as usize, buf.len() - 8);
    assert_eq!(&buf[8..12], b"AVI ");

    // 1 second / 10 fps in microseconds, followed later by the frame count
    assert_eq!(le_u32(&buf, 32), 100_000);
    assert_eq!(le_u32(&buf, 48), 2);

    // Index at the end holds one 16 byte entry per frame
    let idx = buf.len() - 8 - 32;
    assert_eq!(&buf[idx..idx + 4], b"idx1");
    assert_eq!(le_u32(&buf, idx + 4), 32);
    assert_eq!(&buf[idx + 8..idx + 12], b"00dc");

    Ok(())
}

#[test]
fn wrong_frame_size_is_rejected() -> Result<()> {
    let mut writer = MjpegAviWriter::new(Cursor::new(Vec::new()), 32, 16, 10, 80)?;

    assert!(matches!(
        writer.write(&solid(16, 16, [0, 0, 0])),
        Err(Error::Writer(_))
    ));
    assert_eq!(writer.frames_written(), 0);

    Ok(())
}

#[test]
fn non_avi_data_is_rejected() {
    let data = b"RIFF\x04\x00\x00\x00WAVEfmt ".to_vec();
    assert!(matches!(AviReader::new(Cursor::new(data)), Err(Error::Avi(_))));
}

#[test]
fn empty_chunks_repeat_the_previous_frame() -> Result<()> {
    let mut writer = MjpegAviWriter::new(Cursor::new(Vec::new()), 16, 16, 10, 90)?;
    writer.write(&solid(16, 16, [200, 200, 200]))?;
    let mut buf = writer.finish()?.into_inner();

    // Splice a zero length frame chunk onto the end of the movi list
    let idx = buf.len() - 8 - 16;
    let movi_size_at = buf.windows(4).position(|w| w == b"movi").unwrap() - 4;
    buf.splice(idx..idx, b"00dc\x00\x00\x00\x00".iter().copied());
    let movi_size = le_u32(&buf, movi_size_at) + 8;
    buf[movi_size_at..movi_size_at + 4].copy_from_slice(&movi_size.to_le_bytes());
    let riff_size = (buf.len() - 8) as u32;
    buf[4..8].copy_from_slice(&riff_size.to_le_bytes());

    let mut reader = AviReader::new(Cursor::new(buf))?;
    let first = reader.next_frame()?.expect("missing frame");
    let repeat = reader.next_frame()?.expect("missing repeated frame");
    assert_eq!(first, repeat);
    assert!(reader.next_frame()?.is_none());

    Ok(())
}

#[test]
fn open_video_uses_native_reader_for_mjpg() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("stereo.avi");

    let mut writer = MjpegAviWriter::create(&path, 64, 16, 25, 90)?;
    writer.write(&solid(64, 16, [90, 90, 90]))?;
    writer.finish()?;

    let mut sig = [0u8; 4];
    File::open(&path)?.read_exact(&mut sig)?;
    assert_eq!(&sig, b"RIFF");

    let mut source = open_video(&path)?;
    assert_eq!(source.dimensions(), (64, 16));
    assert_eq!(source.frame_rate(), Some(25.0));
    assert!(source.next_frame()?.is_some());
    assert!(source.next_frame()?.is_none());

    Ok(())
}

#[test]
fn missing_video_is_reported() {
    assert!(matches!(
        open_video("does/not/exist.avi"),
        Err(Error::MissingPath { what: "video", .. })
    ));
}

fn chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = id.to_vec();
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    if body.len() % 2 == 1 {
        out.push(0);
    }
    out
}

fn list(kind: &[u8; 4], children: &[u8]) -> Vec<u8> {
    let mut body = kind.to_vec();
    body.extend_from_slice(children);
    chunk(b"LIST", &body)
}

#[test]
fn avix_segments_and_rec_lists_are_followed() -> Result<()> {
    let mut writer = MjpegAviWriter::new(Cursor::new(Vec::new()), 16, 16, 10, 95)?;
    writer.write(&solid(16, 16, [200, 0, 0]))?;
    let mut buf = writer.finish()?.into_inner();

    // An OpenDML continuation holding one frame inside a `rec ` group
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, 95).encode_image(&solid(16, 16, [0, 0, 200]))?;

    let movi = list(b"movi", &list(b"rec ", &chunk(b"00dc", &jpeg)));
    let mut avix = b"AVIX".to_vec();
    avix.extend_from_slice(&movi);
    buf.extend_from_slice(&chunk(b"RIFF", &avix));

    let mut reader = AviReader::new(Cursor::new(buf))?;

    let first = reader.next_frame()?.expect("missing first frame");
    assert!(close(first.get_pixel(8, 8), [200, 0, 0]), "{:?}", first.get_pixel(8, 8));

    let second = reader.next_frame()?.expect("missing continuation frame");
    assert!(close(second.get_pixel(8, 8), [0, 0, 200]), "{:?}", second.get_pixel(8, 8));

    assert!(reader.next_frame()?.is_none());

    Ok(())
}

#[test]
fn oversized_header_list_is_not_an_avi() -> Result<()> {
    let mut writer = MjpegAviWriter::new(Cursor::new(Vec::new()), 16, 16, 10, 90)?;
    writer.write(&solid(16, 16, [0, 0, 0]))?;
    let mut buf = writer.finish()?.into_inner();

    let hdrl_size_at = buf.windows(4).position(|w| w == b"hdrl").unwrap() - 4;
    buf[hdrl_size_at..hdrl_size_at + 4].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());

    assert!(matches!(AviReader::new(Cursor::new(buf)), Err(Error::Avi(_))));

    Ok(())
}
