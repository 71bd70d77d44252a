//! Raw-socket packet I/O for Linux and the BSDs.
//!
//! Probes go out through an `IPPROTO_RAW` socket with `IP_HDRINCL`, so the
//! kernel transmits exactly the bytes we built. Responses come in through an
//! `IPPROTO_ICMP` raw socket, which sees every ICMP datagram delivered to the
//! host. Both sockets are non-blocking and driven by the tokio reactor.

use crate::{Received, Sink, Source, SourceSinkHandle};
use async_trait::async_trait;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::mem::MaybeUninit;
use std::net::{IpAddr, Ipv4Addr, SocketAddrV4};
use std::time::Duration;
use tokio::io::unix::AsyncFd;
use tokio::io::Interest;
use traceroute_core::TracerouteError;
use tracing::{debug, trace};

const IPPROTO_RAW: i32 = 255;

fn open_error(err: io::Error) -> TracerouteError {
    match err.kind() {
        io::ErrorKind::PermissionDenied => TracerouteError::PermissionDenied(err),
        _ => TracerouteError::SocketCreation(err),
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "socket already closed")
}

/// Raw ICMP capture socket.
pub struct RawIcmpSource {
    fd: Option<AsyncFd<Socket>>,
}

impl RawIcmpSource {
    /// Opens a new raw ICMP socket.
    pub fn new() -> Result<Self, TracerouteError> {
        let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))
            .map_err(open_error)?;
        socket
            .set_nonblocking(true)
            .map_err(TracerouteError::SocketCreation)?;
        let fd = AsyncFd::with_interest(socket, Interest::READABLE)
            .map_err(TracerouteError::SocketCreation)?;

        Ok(Self { fd: Some(fd) })
    }
}

/// Reads one datagram, retrying a single interrupted call.
async fn read_packet(fd: &AsyncFd<Socket>, buf: &mut [u8]) -> Result<Received, TracerouteError> {
    let mut interrupted = false;
    loop {
        let mut guard = fd.readable().await.map_err(TracerouteError::ReadFailed)?;
        match guard.try_io(|inner| recv_into(inner.get_ref(), &mut *buf)) {
            Ok(Ok((len, from))) => return Ok(Received::Packet { len, from }),
            Ok(Err(e)) if e.kind() == io::ErrorKind::Interrupted && !interrupted => {
                trace!("Receive interrupted, retrying once");
                interrupted = true;
            }
            Ok(Err(e)) => return Err(TracerouteError::ReadFailed(e)),
            Err(_would_block) => continue,
        }
    }
}

fn recv_into(socket: &Socket, buf: &mut [u8]) -> io::Result<(usize, IpAddr)> {
    // SAFETY: `recv_from` never de-initializes memory, and `u8` and
    // `MaybeUninit<u8>` have the same layout.
    let uninit = unsafe { &mut *(buf as *mut [u8] as *mut [MaybeUninit<u8>]) };
    let (len, addr) = socket.recv_from(uninit)?;
    let from = addr
        .as_socket()
        .map(|sa| sa.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    Ok((len, from))
}

#[async_trait]
impl Source for RawIcmpSource {
    async fn recv_from(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<Received, TracerouteError> {
        let fd = self
            .fd
            .as_ref()
            .ok_or_else(|| TracerouteError::ReadFailed(closed_error()))?;

        match tokio::time::timeout(timeout, read_packet(fd, buf)).await {
            Ok(result) => result,
            Err(_elapsed) => Ok(Received::Timeout),
        }
    }

    async fn close(&mut self) -> Result<(), TracerouteError> {
        if self.fd.take().is_some() {
            debug!("Closed ICMP source socket");
        }
        Ok(())
    }
}

/// Raw IP transmission socket.
pub struct RawIpSink {
    fd: Option<AsyncFd<Socket>>,
}

impl RawIpSink {
    /// Opens a new raw IP socket with `IP_HDRINCL` set.
    pub fn new() -> Result<Self, TracerouteError> {
        let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::from(IPPROTO_RAW)))
            .map_err(open_error)?;
        socket
            .set_header_included(true)
            .map_err(TracerouteError::SocketCreation)?;
        socket
            .set_nonblocking(true)
            .map_err(TracerouteError::SocketCreation)?;
        let fd = AsyncFd::with_interest(socket, Interest::WRITABLE)
            .map_err(TracerouteError::SocketCreation)?;

        Ok(Self { fd: Some(fd) })
    }
}

/// Converts the IPv4 total length and fragment fields to host byte order.
///
/// BSD-derived kernels expect these two fields in host order on `IP_HDRINCL`
/// sockets.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn host_order_lengths(buf: &[u8]) -> Vec<u8> {
    let mut out = buf.to_vec();
    if out.len() >= 20 {
        let total_len = u16::from_be_bytes([out[2], out[3]]);
        out[2..4].copy_from_slice(&total_len.to_ne_bytes());
        let frag = u16::from_be_bytes([out[6], out[7]]);
        out[6..8].copy_from_slice(&frag.to_ne_bytes());
    }
    out
}

#[async_trait]
impl Sink for RawIpSink {
    async fn write_to(&mut self, buf: &[u8], addr: IpAddr) -> Result<(), TracerouteError> {
        let IpAddr::V4(v4) = addr else {
            return Err(TracerouteError::InvalidAddress(addr));
        };
        let fd = self
            .fd
            .as_ref()
            .ok_or_else(|| TracerouteError::WriteFailed(closed_error()))?;
        let dest = SockAddr::from(SocketAddrV4::new(v4, 0));

        #[cfg(target_os = "macos")]
        let owned = host_order_lengths(buf);
        #[cfg(target_os = "macos")]
        let buf = owned.as_slice();

        let mut interrupted = false;
        loop {
            let mut guard = fd.writable().await.map_err(TracerouteError::WriteFailed)?;
            match guard.try_io(|inner| inner.get_ref().send_to(buf, &dest)) {
                Ok(Ok(n)) if n == buf.len() => return Ok(()),
                Ok(Ok(n)) => {
                    return Err(TracerouteError::WriteFailed(io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("short write: {} of {} bytes", n, buf.len()),
                    )))
                }
                Ok(Err(e)) if e.kind() == io::ErrorKind::Interrupted && !interrupted => {
                    trace!("Send interrupted, retrying once");
                    interrupted = true;
                }
                Ok(Err(e)) => return Err(TracerouteError::WriteFailed(e)),
                Err(_would_block) => continue,
            }
        }
    }

    async fn close(&mut self) -> Result<(), TracerouteError> {
        if self.fd.take().is_some() {
            debug!("Closed raw IP sink socket");
        }
        Ok(())
    }
}

/// Opens the raw socket pair used for one trace run.
pub fn new_source_sink() -> Result<SourceSinkHandle, TracerouteError> {
    let sink = RawIpSink::new()?;
    let source = RawIcmpSource::new()?;

    Ok(SourceSinkHandle {
        source: Box::new(source),
        sink: Box::new(sink),
    })
}
