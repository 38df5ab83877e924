use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, TrySendError};

use super::protocol::MAX_PDU_SIZE;

const RECV_TIMEOUT: Duration = Duration::from_millis(20);

#[derive(Debug, Clone)]
pub struct Datagram {
    pub data: Vec<u8>,
    pub from: SocketAddr,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransportStats {
    pub datagrams_received: u64,
    pub datagrams_sent: u64,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub queue_drops: u64,
}

#[derive(Debug, Default)]
struct SharedCounters {
    received: AtomicU64,
    bytes_received: AtomicU64,
    queue_drops: AtomicU64,
}

/// UDP socket with a receive thread that only enqueues raw datagrams.
pub struct UdpTransport {
    socket: UdpSocket,
    local_addr: SocketAddr,
    queue: Receiver<Datagram>,
    counters: Arc<SharedCounters>,
    datagrams_sent: u64,
    bytes_sent: u64,
    running: Arc<AtomicBool>,
    receiver: Option<JoinHandle<()>>,
}

impl UdpTransport {
    pub fn bind<A: ToSocketAddrs>(addr: A, queue_capacity: usize) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(RECV_TIMEOUT))?;
        let local_addr = socket.local_addr()?;

        let (tx, rx) = bounded(queue_capacity.max(1));
        let running = Arc::new(AtomicBool::new(true));
        let counters = Arc::new(SharedCounters::default());

        let recv_socket = socket.try_clone()?;
        let thread_running = Arc::clone(&running);
        let thread_counters = Arc::clone(&counters);

        let receiver = thread::Builder::new()
            .name("udp-recv".to_string())
            .spawn(move || {
                let mut buffer = [0u8; MAX_PDU_SIZE];
                while thread_running.load(Ordering::SeqCst) {
                    match recv_socket.recv_from(&mut buffer) {
                        Ok((size, from)) => {
                            thread_counters.received.fetch_add(1, Ordering::Relaxed);
                            thread_counters
                                .bytes_received
                                .fetch_add(size as u64, Ordering::Relaxed);

                            let datagram = Datagram {
                                data: buffer[..size].to_vec(),
                                from,
                            };
                            match tx.try_send(datagram) {
                                Ok(()) => {}
                                Err(TrySendError::Full(_)) => {
                                    thread_counters.queue_drops.fetch_add(1, Ordering::Relaxed);
                                }
                                Err(TrySendError::Disconnected(_)) => break,
                            }
                        }
                        Err(ref e)
                            if e.kind() == io::ErrorKind::WouldBlock
                                || e.kind() == io::ErrorKind::TimedOut => {}
                        Err(e) => {
                            log::warn!("udp receive failed: {}", e);
                            thread::sleep(RECV_TIMEOUT);
                        }
                    }
                }
                log::debug!("udp receive thread stopped");
            })?;

        log::info!("udp transport bound to {}", local_addr);

        Ok(Self {
            socket,
            local_addr,
            queue: rx,
            counters,
            datagrams_sent: 0,
            bytes_sent: 0,
            running,
            receiver: Some(receiver),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn set_broadcast(&self, broadcast: bool) -> io::Result<()> {
        self.socket.set_broadcast(broadcast)
    }

    pub fn poll(&self) -> Vec<Datagram> {
        self.queue.try_iter().collect()
    }

    pub fn send_to(&mut self, data: &[u8], addr: SocketAddr) -> io::Result<usize> {
        if data.len() > MAX_PDU_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "datagram exceeds MTU",
            ));
        }

        let bytes = self.socket.send_to(data, addr)?;
        self.datagrams_sent += 1;
        self.bytes_sent += bytes as u64;
        Ok(bytes)
    }

    pub fn stats(&self) -> TransportStats {
        TransportStats {
            datagrams_received: self.counters.received.load(Ordering::Relaxed),
            datagrams_sent: self.datagrams_sent,
            bytes_received: self.counters.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent,
            queue_drops: self.counters.queue_drops.load(Ordering::Relaxed),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.receiver.take() {
            if handle.join().is_err() {
                log::warn!("udp receive thread panicked");
            }
        }
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        self.shutdown();
    }
}
