//! Block requests and their decomposition into sequential transfers.

use bytes::{Bytes, BytesMut};

use super::device::Device;
use super::error::StorageError;
use super::session::SessionKey;
use crate::constants::KERNEL_SECTOR_SIZE;

/// Data direction of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// One physically contiguous piece of a request.
///
/// For writes the buffer holds the payload; for reads it is filled in place
/// when the request is dispatched.
#[derive(Debug, Clone)]
pub struct Segment {
    direction: Direction,
    session: SessionKey,
    buf: BytesMut,
}

impl Segment {
    pub fn read(len: usize, session: SessionKey) -> Self {
        Self {
            direction: Direction::Read,
            session,
            buf: BytesMut::zeroed(len),
        }
    }

    pub fn write(data: impl AsRef<[u8]>, session: SessionKey) -> Self {
        Self {
            direction: Direction::Write,
            session,
            buf: BytesMut::from(data.as_ref()),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn session(&self) -> SessionKey {
        self.session
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

/// An ordered list of segments laid out back to back from `offset`.
#[derive(Debug, Clone, Default)]
pub struct Request {
    offset: u64,
    session: SessionKey,
    segments: Vec<Segment>,
}

impl Request {
    /// Starts an empty request at byte `offset`.
    pub fn new(offset: u64) -> Self {
        Self {
            offset,
            session: SessionKey::default(),
            segments: Vec::new(),
        }
    }

    /// Starts an empty request at a 512-byte kernel sector. Sector numbers
    /// past the addressable range saturate, so the request fails its bounds
    /// check instead of wrapping.
    pub fn at_sector(sector: u64) -> Self {
        Self::new(sector.saturating_mul(KERNEL_SECTOR_SIZE as u64))
    }

    /// Sets the session key used by segments appended through
    /// [`read`](Self::read) and [`write`](Self::write) from here on.
    pub fn with_session(mut self, session: SessionKey) -> Self {
        self.session = session;
        self
    }

    pub fn read(mut self, len: usize) -> Self {
        self.segments.push(Segment::read(len, self.session));
        self
    }

    pub fn write(mut self, data: impl AsRef<[u8]>) -> Self {
        self.segments.push(Segment::write(data, self.session));
        self
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn session(&self) -> SessionKey {
        self.session
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    /// Total bytes across all segments.
    pub fn len(&self) -> u64 {
        self.segments.iter().map(|s| s.len() as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Feeds each segment of a request to the device's transfer engine.
pub struct RequestDispatcher<'a> {
    device: &'a Device,
}

impl<'a> RequestDispatcher<'a> {
    pub fn new(device: &'a Device) -> Self {
        Self { device }
    }

    /// Segments run strictly in order. The first failing segment aborts the
    /// rest and fails the request; earlier segments stay applied.
    pub fn dispatch(&self, request: &mut Request) -> Result<(), StorageError> {
        tracing::trace!(
            "{}: request at {} with {} segments ({} bytes)",
            self.device.name(),
            request.offset,
            request.segments.len(),
            request.len()
        );

        let mut offset = request.offset;
        for (index, segment) in request.segments.iter_mut().enumerate() {
            let len = segment.buf.len() as u64;
            if let Err(e) =
                self.device
                    .transfer(offset, &mut segment.buf[..], segment.direction, segment.session)
            {
                tracing::debug!(
                    "{}: segment {} at offset {} failed: {}",
                    self.device.name(),
                    index,
                    offset,
                    e
                );
                return Err(e);
            }
            offset += len;
        }

        tracing::trace!("{}: request complete", self.device.name());
        Ok(())
    }
}
