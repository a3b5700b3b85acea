//! Minimal SNTP (RFC 4330) client: enough to compute a clock offset, nothing
//! else. No server authentication, no stratum bookkeeping.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Result};
use tokio::net::UdpSocket;
use tokio::time::timeout;

const NTP_PACKET_SIZE: usize = 48;
/// Seconds between the NTP epoch (1900-01-01) and the Unix epoch.
const NTP_UNIX_EPOCH_DELTA: u64 = 2_208_988_800;
const QUERY_TIMEOUT: Duration = Duration::from_secs(3);

fn ntp_request_packet() -> [u8; NTP_PACKET_SIZE] {
    let mut packet = [0u8; NTP_PACKET_SIZE];
    // LI = 0 (no warning), VN = 4, Mode = 3 (client).
    packet[0] = 0b0010_0011;
    packet
}

fn ntp_timestamp_to_unix_ms(seconds: u32, fraction: u32) -> u64 {
    let secs = (seconds as u64).saturating_sub(NTP_UNIX_EPOCH_DELTA);
    let frac_ms = (fraction as u64 * 1000) >> 32;
    secs * 1000 + frac_ms
}

/// Queries `server` (`host:port`) and returns the offset, in milliseconds,
/// that should be added to the local wall clock to match the server.
pub async fn query_offset_ms(server: &str) -> Result<i64> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect(server).await?;

    let request = ntp_request_packet();
    let t0 = SystemTime::now()
        .duration_since(UNIX_EPOCH)?
        .as_millis() as u64;
    socket.send(&request).await?;

    let mut buf = [0u8; NTP_PACKET_SIZE];
    let n = timeout(QUERY_TIMEOUT, socket.recv(&mut buf)).await??;
    let t3 = SystemTime::now()
        .duration_since(UNIX_EPOCH)?
        .as_millis() as u64;

    if n < NTP_PACKET_SIZE {
        bail!("short ntp reply: {} bytes", n);
    }

    // Receive timestamp (server's t1), field offset 32.
    let recv_secs = u32::from_be_bytes(buf[32..36].try_into()?);
    let recv_frac = u32::from_be_bytes(buf[36..40].try_into()?);
    // Transmit timestamp (server's t2), field offset 40.
    let xmit_secs = u32::from_be_bytes(buf[40..44].try_into()?);
    let xmit_frac = u32::from_be_bytes(buf[44..48].try_into()?);

    let t1 = ntp_timestamp_to_unix_ms(recv_secs, recv_frac);
    let t2 = ntp_timestamp_to_unix_ms(xmit_secs, xmit_frac);

    // Standard SNTP offset formula: ((t1 - t0) + (t2 - t3)) / 2.
    let offset = ((t1 as i64 - t0 as i64) + (t2 as i64 - t3 as i64)) / 2;
    Ok(offset)
}
