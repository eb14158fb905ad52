//! Unidirectional byte pipes.
//!
//! One pipe per worker carries its batch; a second, one-byte pipe carries the
//! readiness token when the pipe handshake is used.
use std::{
    fs::File,
    io::{self, Read, Write},
    os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd},
    time::Duration,
};

/// Read end of a pipe.
#[derive(Debug)]
pub struct PipeReader(File);

/// Write end of a pipe. Dropping it is the end-of-stream signal for the reader.
#[derive(Debug)]
pub struct PipeWriter(File);

/// Create a pipe and return its `(read, write)` ends.
pub fn channel() -> io::Result<(PipeReader, PipeWriter)> {
    let mut fds: [libc::c_int; 2] = [-1, -1];

    #[cfg(any(target_os = "linux", target_os = "android"))]
    let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };

    if rc == -1 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: both descriptors were just returned by pipe() and are owned by nobody else.
    let (rx, tx) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    Ok((PipeReader(File::from(rx)), PipeWriter(File::from(tx))))
}

impl PipeReader {
    /// Block until data or end-of-stream is available.
    ///
    /// Returns `false` if `timeout` elapsed first; `None` waits forever.
    pub fn wait_readable(&self, timeout: Option<Duration>) -> io::Result<bool> {
        let timeout_ms: libc::c_int = match timeout {
            None => -1,
            Some(t) => t.as_millis().min(libc::c_int::MAX as u128) as libc::c_int,
        };
        let mut pfd = libc::pollfd {
            fd: self.0.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };

        loop {
            let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
            match rc {
                -1 => {
                    let err = io::Error::last_os_error();
                    if err.kind() == io::ErrorKind::Interrupted {
                        continue;
                    }
                    return Err(err);
                }
                0 => return Ok(false),
                _ => return Ok(true),
            }
        }
    }

    /// Read a single byte; `None` on end-of-stream.
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            match self.0.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl AsFd for PipeReader {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.0.as_fd()
    }
}

impl AsRawFd for PipeReader {
    fn as_raw_fd(&self) -> RawFd {
        self.0.as_raw_fd()
    }
}

impl AsFd for PipeWriter {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.0.as_fd()
    }
}

impl AsRawFd for PipeWriter {
    fn as_raw_fd(&self) -> RawFd {
        self.0.as_raw_fd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};

    #[test]
    fn bytes_flow_from_writer_to_reader() {
        let (rx, mut tx) = channel().unwrap();
        tx.write_all(b"Anna\nBela\n").unwrap();
        drop(tx);

        let lines: Vec<String> = BufReader::new(rx).lines().map(Result::unwrap).collect();
        assert_eq!(lines, vec!["Anna", "Bela"]);
    }

    #[test]
    fn read_byte_reports_end_of_stream() {
        let (mut rx, mut tx) = channel().unwrap();
        tx.write_all(&[2]).unwrap();
        drop(tx);

        assert_eq!(rx.read_byte().unwrap(), Some(2));
        assert_eq!(rx.read_byte().unwrap(), None);
    }

    #[test]
    fn wait_readable_times_out_on_silent_pipe() {
        let (rx, _tx) = channel().unwrap();
        assert!(!rx.wait_readable(Some(Duration::from_millis(20))).unwrap());
    }

    #[test]
    fn wait_readable_wakes_on_close() {
        let (rx, tx) = channel().unwrap();
        drop(tx);
        assert!(rx.wait_readable(Some(Duration::from_secs(5))).unwrap());
    }
}
