//! MJPEG frame scanner
//!
//! Cuts complete JPEG images out of an MJPEG-over-HTTP byte stream by
//! locating start-of-image (`FF D8`) and end-of-image (`FF D9`) markers. The
//! multipart boundaries and headers around each image are never parsed; they
//! are just bytes outside a frame and get discarded.
//!
//! # Retention rules
//!
//! | Buffer contents after a push | Kept |
//! |------------------------------|------|
//! | no start marker | a trailing `FF` only (may be half a marker) |
//! | start marker, no end marker after it | everything from the start marker |
//! | start and end marker | frame emitted, scan continues after it |
//!
//! The end marker is only searched for after the start marker, so a stray
//! `FF D9` in leading garbage never produces a frame. Retained bytes are
//! bounded by `max_buffer_bytes`; a stream that never closes its frame is
//! reported as [`ScanError::BufferOverflow`].

use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

/// Start of image
pub const SOI: [u8; 2] = [0xFF, 0xD8];
/// End of image
pub const EOI: [u8; 2] = [0xFF, 0xD9];

/// Default cap on retained bytes
pub const DEFAULT_MAX_BUFFER: usize = 4 * 1024 * 1024;
/// Default read size
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// One complete JPEG image, `FF D8` through `FF D9` inclusive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JpegFrame(Vec<u8>);

impl JpegFrame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for JpegFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Scanner failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error("no complete frame within {limit} buffered bytes")]
    BufferOverflow { limit: usize },
}

/// Scanner counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub frames: u64,
    /// Bytes dropped outside any frame
    pub discarded_bytes: u64,
    pub overflows: u64,
}

fn find(haystack: &[u8], marker: &[u8; 2]) -> Option<usize> {
    haystack.windows(2).position(|w| w == marker)
}

/// Incremental SOI/EOI scanner
#[derive(Debug)]
pub struct MjpegScanner {
    buffer: Vec<u8>,
    max_buffer_bytes: usize,
    /// Offset up to which the open frame was already searched for EOI
    eoi_from: usize,
    stats: ScanStats,
}

impl MjpegScanner {
    pub fn new(max_buffer_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_buffer_bytes,
            eoi_from: SOI.len(),
            stats: ScanStats::default(),
        }
    }

    /// Append a chunk and move every complete frame into `out`, in order
    ///
    /// On overflow the retained bytes are dropped and the scanner starts
    /// over; frames completed by this same chunk are still delivered.
    pub fn push(
        &mut self,
        chunk: &[u8],
        out: &mut Vec<JpegFrame>,
    ) -> std::result::Result<(), ScanError> {
        self.buffer.extend_from_slice(chunk);

        loop {
            let Some(start) = find(&self.buffer, &SOI) else {
                let keep = usize::from(self.buffer.last() == Some(&0xFF));
                self.discard(self.buffer.len() - keep);
                break;
            };
            if start > 0 {
                self.discard(start);
            }

            let from = self.eoi_from.max(SOI.len());
            let Some(rel) = find(&self.buffer[from..], &EOI) else {
                // The last byte may be the first half of EOI
                self.eoi_from = self.buffer.len().saturating_sub(1).max(SOI.len());
                break;
            };

            let end = from + rel + EOI.len();
            let frame: Vec<u8> = self.buffer.drain(..end).collect();
            self.eoi_from = SOI.len();
            self.stats.frames += 1;
            out.push(JpegFrame(frame));
        }

        if self.buffer.len() > self.max_buffer_bytes {
            log::warn!(
                "MJPEG buffer overflow: {} bytes without end of image, resetting",
                self.buffer.len()
            );
            self.stats.overflows += 1;
            self.reset();
            return Err(ScanError::BufferOverflow {
                limit: self.max_buffer_bytes,
            });
        }
        Ok(())
    }

    fn discard(&mut self, n: usize) {
        if n > 0 {
            self.buffer.drain(..n);
            self.stats.discarded_bytes += n as u64;
            self.eoi_from = SOI.len();
        }
    }

    /// Bytes currently retained
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn reset(&mut self) {
        self.stats.discarded_bytes += self.buffer.len() as u64;
        self.buffer.clear();
        self.eoi_from = SOI.len();
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }
}

impl Default for MjpegScanner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BUFFER)
    }
}

/// Lazy frame sequence over a byte source
///
/// Reads `chunk_size` bytes at a time. Ends on EOF. An I/O error or a
/// buffer overflow is yielded once, after which the sequence ends. Not
/// restartable: reopen the source for a new sequence.
pub struct FrameReader<R> {
    reader: R,
    scanner: MjpegScanner,
    chunk: Vec<u8>,
    pending: VecDeque<JpegFrame>,
    scratch: Vec<JpegFrame>,
    deferred: Option<Error>,
    finished: bool,
    bytes_read: u64,
}

impl<R: Read> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_limits(reader, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_BUFFER)
    }

    pub fn with_limits(reader: R, chunk_size: usize, max_buffer_bytes: usize) -> Self {
        Self {
            reader,
            scanner: MjpegScanner::new(max_buffer_bytes),
            chunk: vec![0u8; chunk_size.max(1)],
            pending: VecDeque::new(),
            scratch: Vec::new(),
            deferred: None,
            finished: false,
            bytes_read: 0,
        }
    }

    /// Read one chunk, appending completed frames to `out`
    ///
    /// Returns `Ok(false)` once the source is exhausted.
    pub fn read_chunk(&mut self, out: &mut Vec<JpegFrame>) -> Result<bool> {
        if self.finished {
            return Ok(false);
        }
        loop {
            match self.reader.read(&mut self.chunk) {
                Ok(0) => {
                    self.finished = true;
                    if self.scanner.buffered() > 0 {
                        log::debug!(
                            "Stream ended with {} bytes of incomplete frame",
                            self.scanner.buffered()
                        );
                    }
                    return Ok(false);
                }
                Ok(n) => {
                    self.bytes_read += n as u64;
                    if let Err(e) = self.scanner.push(&self.chunk[..n], out) {
                        self.finished = true;
                        return Err(Error::Scan(e));
                    }
                    return Ok(true);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.finished = true;
                    return Err(Error::Io(e));
                }
            }
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn stats(&self) -> ScanStats {
        self.scanner.stats()
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<JpegFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Some(Ok(frame));
            }
            // Frames completed before a failure are yielded first
            if let Some(e) = self.deferred.take() {
                return Some(Err(e));
            }
            let mut scratch = std::mem::take(&mut self.scratch);
            let result = self.read_chunk(&mut scratch);
            self.pending.extend(scratch.drain(..));
            self.scratch = scratch;
            match result {
                Ok(true) => continue,
                Ok(false) => return self.pending.pop_front().map(Ok),
                Err(e) => self.deferred = Some(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg(payload: &[u8]) -> Vec<u8> {
        let mut out = SOI.to_vec();
        out.extend_from_slice(payload);
        out.extend_from_slice(&EOI);
        out
    }

    fn scan_all(chunks: &[&[u8]]) -> (Vec<JpegFrame>, MjpegScanner) {
        let mut scanner = MjpegScanner::default();
        let mut out = Vec::new();
        for chunk in chunks {
            scanner.push(chunk, &mut out).unwrap();
        }
        (out, scanner)
    }

    #[test]
    fn test_noise_between_frames() {
        let a = jpeg(&[1, 2, 3]);
        let b = jpeg(&[4, 5]);
        let mut stream = b"--boundary\r\nContent-Type: image/jpeg\r\n\r\n".to_vec();
        stream.extend_from_slice(&a);
        stream.extend_from_slice(b"\r\n--boundary\r\n\r\n");
        stream.extend_from_slice(&b);

        let (frames, scanner) = scan_all(&[&stream]);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_bytes(), a.as_slice());
        assert_eq!(frames[1].as_bytes(), b.as_slice());
        assert_eq!(scanner.buffered(), 0);
    }

    #[test]
    fn test_split_markers() {
        // SOI and EOI each split across chunks
        let (frames, _) = scan_all(&[&[0x00, 0xFF], &[0xD8, 0x10, 0x20, 0xFF], &[0xD9]]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), &[0xFF, 0xD8, 0x10, 0x20, 0xFF, 0xD9]);
    }

    #[test]
    fn test_chunking_independent() {
        let mut stream = vec![0x11, 0xFF, 0x00];
        stream.extend(jpeg(&[0xFF, 0x00, 0xAB]));
        stream.extend([0x22, 0xFF]);
        stream.extend(jpeg(&[]));
        let (expected, _) = scan_all(&[&stream]);
        assert_eq!(expected.len(), 2);

        for split in 0..=stream.len() {
            let (frames, _) = scan_all(&[&stream[..split], &stream[split..]]);
            assert_eq!(frames, expected, "split at {}", split);
        }
        let bytes: Vec<&[u8]> = stream.chunks(1).collect();
        assert_eq!(scan_all(&bytes).0, expected);
    }

    #[test]
    fn test_no_start_keeps_trailing_ff() {
        let (frames, scanner) = scan_all(&[&[1, 2, 3, 0xFF]]);
        assert!(frames.is_empty());
        assert_eq!(scanner.buffered(), 1);
        assert_eq!(scanner.stats().discarded_bytes, 3);

        let (_, scanner) = scan_all(&[&[1, 2, 3]]);
        assert_eq!(scanner.buffered(), 0);
    }

    #[test]
    fn test_end_before_start_ignored() {
        let frame = jpeg(&[7]);
        let mut stream = vec![0xFF, 0xD9, 0x00];
        stream.extend_from_slice(&frame);
        let (frames, _) = scan_all(&[&stream]);
        assert_eq!(frames, vec![JpegFrame(frame)]);
    }

    #[test]
    fn test_incomplete_frame_retained() {
        let (frames, scanner) = scan_all(&[&[0x00, 0xFF, 0xD8, 1, 2, 3]]);
        assert!(frames.is_empty());
        assert_eq!(scanner.buffered(), 5);
    }

    #[test]
    fn test_minimal_frame() {
        let (frames, _) = scan_all(&[&[0xFF, 0xD8, 0xFF, 0xD9]]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 4);
    }

    #[test]
    fn test_overflow_resets() {
        let mut scanner = MjpegScanner::new(16);
        let mut out = Vec::new();
        scanner.push(&SOI, &mut out).unwrap();
        let err = scanner.push(&[0u8; 32], &mut out).unwrap_err();
        assert_eq!(err, ScanError::BufferOverflow { limit: 16 });
        assert_eq!(scanner.buffered(), 0);
        assert_eq!(scanner.stats().overflows, 1);

        // Usable again afterwards
        scanner.push(&jpeg(&[1]), &mut out).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_frame_reader_sequence() {
        let mut stream = b"junk".to_vec();
        stream.extend(jpeg(&[1; 3000]));
        stream.extend(b"--b\r\n");
        stream.extend(jpeg(&[2; 10]));
        stream.extend([0xFF, 0xD8, 9, 9]); // truncated at EOF

        let frames: Vec<JpegFrame> = FrameReader::new(stream.as_slice())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].len(), 3004);
        assert_eq!(frames[1].len(), 14);
    }

    #[test]
    fn test_frame_reader_overflow_ends_sequence() {
        let mut stream = SOI.to_vec();
        stream.extend([0u8; 100]);
        let mut reader = FrameReader::with_limits(stream.as_slice(), 8, 32);
        assert!(matches!(
            reader.next(),
            Some(Err(Error::Scan(ScanError::BufferOverflow { .. })))
        ));
        assert!(reader.next().is_none());
    }
}
