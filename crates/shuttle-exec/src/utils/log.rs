//! Raw stderr logging for a freshly forked worker.
//!
//! Only `libc::write` on stack buffers: no allocation, no locks. Used before the
//! worker has signalled readiness and when it dies abnormally, where the
//! inherited `tracing` subscriber cannot be trusted.

/// Write a raw byte message to stderr.
pub(crate) fn raw_log(msg: &[u8]) {
    unsafe {
        libc::write(
            libc::STDERR_FILENO,
            msg.as_ptr() as *const libc::c_void,
            msg.len(),
        );
    }
}

/// Write `errno=<n>\n` to stderr.
pub(crate) fn raw_log_errno(errno: i32) {
    let mut buf = [0u8; 32];
    let mut idx = buf.len();

    idx -= 1;
    buf[idx] = b'\n';

    let mut n = errno.unsigned_abs();
    loop {
        idx -= 1;
        buf[idx] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    if errno < 0 {
        idx -= 1;
        buf[idx] = b'-';
    }

    raw_log(b"errno=");
    raw_log(&buf[idx..]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_do_not_panic() {
        raw_log(b"shuttle-exec: test message\n");
        raw_log_errno(0);
        raw_log_errno(libc::EPIPE);
        raw_log_errno(-7);
        raw_log_errno(i32::MIN);
    }
}
