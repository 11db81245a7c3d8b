// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Shared helpers for integration tests.

// Integration test helpers are `pub` so each `tests/*.rs` file can import them
// via `mod common`, but not every test file uses every helper.
#![allow(dead_code)]

use async_trait::async_trait;
use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use sntp_client::packet::{MutablePacket, Packet};
use sntp_client::protocol::Mode;
use sntp_client::{ServerAddress, Transport};

type ReplyFn = Box<dyn Fn(&Packet) -> Vec<u8> + Send + Sync>;

/// An in-memory time server implementing [`Transport`].
///
/// With no reply block configured, requests are ignored and the exchange
/// times out, like a dead server. The reply block receives the decoded
/// request and returns the raw response datagram.
pub struct TestServer {
    reply: Mutex<Option<ReplyFn>>,
    delay: Mutex<Duration>,
    exchanges: AtomicUsize,
}

impl TestServer {
    pub fn new() -> TestServer {
        TestServer {
            reply: Mutex::new(None),
            delay: Mutex::new(Duration::ZERO),
            exchanges: AtomicUsize::new(0),
        }
    }

    /// Configure how the server answers requests.
    pub fn set_reply(&self, reply: impl Fn(&Packet) -> Vec<u8> + Send + Sync + 'static) {
        *self.reply.lock().unwrap() = Some(Box::new(reply));
    }

    /// Remove the reply block: the server goes dark and requests time out.
    pub fn clear_reply(&self) {
        *self.reply.lock().unwrap() = None;
    }

    /// Delay each response by the given duration.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Number of exchanges the server has seen.
    pub fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for TestServer {
    async fn exchange(
        &self,
        request: &[u8],
        _server: &ServerAddress,
        timeout: Duration,
    ) -> io::Result<Vec<u8>> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            if delay >= timeout {
                tokio::time::sleep(timeout).await;
                return Err(io::Error::new(io::ErrorKind::TimedOut, "recv timed out"));
            }
            tokio::time::sleep(delay).await;
        }

        let request = Packet::from_bytes(request);
        let reply = {
            let guard = self.reply.lock().unwrap();
            guard.as_ref().map(|f| f(&request))
        };
        match reply {
            Some(bytes) => Ok(bytes),
            None => {
                tokio::time::sleep(timeout).await;
                Err(io::Error::new(io::ErrorKind::TimedOut, "recv timed out"))
            }
        }
    }
}

/// A well-formed stratum-1 server reply echoing the request's transmit
/// timestamp, with all server timestamps set to `now` (an interval since the
/// 1900 epoch).
pub fn default_reply(request: &Packet, now: f64) -> MutablePacket {
    let mut reply = MutablePacket::new();
    reply.set_version(4);
    reply.set_mode(Mode::Server);
    reply.set_stratum(1);
    reply.set_reference_identifier(u32::from_be_bytes(*b"DCF\0"));
    reply.set_raw_poll_interval(5);
    reply.set_raw_precision(-6);
    reply.set_reference_timestamp(now);
    reply.set_receive_timestamp(now);
    reply.set_transmit_timestamp(now);
    reply.set_originate_timestamp_raw(request.raw().transmit_timestamp);
    reply
}

/// Poll `cond` every 10 ms until it holds, panicking after 5 seconds.
pub async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for: {what}");
}
