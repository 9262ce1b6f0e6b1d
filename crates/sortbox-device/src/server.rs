use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use sortbox_channel::{Channel, VecSink};
use sortbox_frame::{
    FrameConfig, FrameError, FrameReader, FrameWriter, Reply, Request, DEFAULT_MAX_PAYLOAD,
    STATUS_OK,
};
use sortbox_transport::{DeviceNode, DeviceStream};
use tracing::{debug, info, warn};

use crate::error::{DeviceError, Result};

/// Device server behavior knobs.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Permission bits of the device node.
    pub mode: u32,
    /// Largest string a single write may carry, and largest read buffer
    /// honored. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Per-connection read timeout. `None` waits for the caller forever.
    pub read_timeout: Option<Duration>,
    /// How often the accept loop checks the stop flag.
    pub poll_interval: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            mode: DeviceNode::DEFAULT_MODE,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl DeviceConfig {
    fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.max_payload_size,
            read_timeout: self.read_timeout,
            write_timeout: None,
        }
    }
}

struct Worker {
    stream: DeviceStream,
    handle: JoinHandle<()>,
}

/// Serves one shared [`Channel`] at a device node.
///
/// Every accepted open runs on its own thread; all of them share the same
/// mailbox, so concurrent callers are serialized only by the mailbox lock.
pub struct DeviceServer {
    node: DeviceNode,
    channel: Channel,
    config: DeviceConfig,
    next_conn_id: AtomicU64,
}

impl DeviceServer {
    /// Create the device node at `path`, backed by a fresh, empty mailbox.
    ///
    /// `config.max_payload_size` must fit the wire's 32-bit length field.
    pub fn bind(path: impl AsRef<Path>, config: DeviceConfig) -> Result<Self> {
        if u32::try_from(config.max_payload_size).is_err() {
            return Err(DeviceError::InvalidConfig(format!(
                "max_payload_size {} exceeds {}",
                config.max_payload_size,
                u32::MAX
            )));
        }
        let node = DeviceNode::bind_with_mode(path, config.mode)?;
        Ok(Self {
            node,
            channel: Channel::new(),
            config,
            next_conn_id: AtomicU64::new(1),
        })
    }

    /// Serve an existing channel instead of a fresh one.
    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    /// The channel every connection dispatches to.
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Device node path.
    pub fn path(&self) -> &Path {
        self.node.path()
    }

    /// Accept and serve opens until `running` is cleared.
    ///
    /// On return every worker has been stopped and joined. Stored strings
    /// stay in the mailbox; call [`DeviceServer::shutdown`] to release them.
    pub fn serve(&self, running: &AtomicBool) -> Result<()> {
        self.node.set_nonblocking(true)?;
        let mut workers: Vec<Worker> = Vec::new();

        let result = loop {
            if !running.load(Ordering::SeqCst) {
                break Ok(());
            }
            workers.retain(|worker| !worker.handle.is_finished());

            match self.node.try_accept() {
                Ok(Some(stream)) => match self.spawn_worker(stream) {
                    Ok(worker) => workers.push(worker),
                    Err(err) => break Err(err),
                },
                Ok(None) => std::thread::sleep(self.config.poll_interval),
                Err(err) => break Err(err.into()),
            }
        };

        debug!(workers = workers.len(), "stopping connection workers");
        for worker in workers {
            let _ = worker.stream.shutdown();
            let _ = worker.handle.join();
        }
        result
    }

    fn spawn_worker(&self, stream: DeviceStream) -> Result<Worker> {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let control = stream.try_clone()?;
        let channel = self.channel.clone();
        let frame_config = self.config.frame_config();

        if let Some(creds) = stream.peer_credentials() {
            info!(conn_id, uid = creds.uid, pid = creds.pid, "device opened");
        } else {
            info!(conn_id, "device opened");
        }

        let handle = std::thread::Builder::new()
            .name(format!("sortbox-conn-{conn_id}"))
            .spawn(move || {
                if let Err(err) = handle_connection(&channel, stream, frame_config) {
                    warn!(conn_id, error = %err, "connection ended with error");
                }
                info!(conn_id, "device closed");
            })
            .map_err(DeviceError::Spawn)?;

        Ok(Worker {
            stream: control,
            handle,
        })
    }

    /// Release every string still stored. Returns how many were released.
    pub fn shutdown(&self) -> usize {
        self.channel.mailbox().shutdown()
    }
}

impl std::fmt::Debug for DeviceServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceServer")
            .field("path", &self.node.path())
            .field("config", &self.config)
            .finish()
    }
}

/// Status sent when an errno does not fit the one-byte status field.
const EIO_STATUS: u8 = libc::EIO as u8;

fn reply_status(errno: i32) -> u8 {
    u8::try_from(errno)
        .ok()
        .filter(|status| *status != STATUS_OK)
        .unwrap_or(EIO_STATUS)
}

/// Serve one opened connection until the caller closes it.
///
/// Channel errors go back to the caller as a non-zero reply status and the
/// connection stays open. A write over the payload limit is skipped and
/// answered with `EFBIG`. Other frame and transport errors end the
/// connection.
pub fn handle_connection(
    channel: &Channel,
    stream: DeviceStream,
    config: FrameConfig,
) -> Result<()> {
    let reader_stream = stream.try_clone()?;
    let max_payload = config.max_payload_size;
    let mut reader = FrameReader::with_config_device(reader_stream, config.clone())?;
    let mut writer = FrameWriter::with_config_device(stream, config)?;

    loop {
        let request: Request = match reader.read_frame() {
            Ok(request) => request,
            Err(FrameError::ConnectionClosed) => return Ok(()),
            Err(FrameError::WriteTooLarge { offset, size, max }) => {
                warn!(size, max, "write over payload limit rejected");
                reader.discard(size)?;
                writer.send(&Reply::error(reply_status(libc::EFBIG), offset))?;
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        let reply = dispatch(channel, request, max_payload);
        writer.send(&reply)?;
    }
}

/// Run one request against the channel and build its reply.
///
/// Read buffers larger than `max_payload` are clamped to it.
pub fn dispatch(channel: &Channel, request: Request, max_payload: usize) -> Reply {
    match request {
        Request::Write { offset, payload } => match channel.write(&payload[..], offset) {
            Ok(accepted) => {
                Reply::write_ok(offset, u32::try_from(accepted).unwrap_or(u32::MAX))
            }
            Err(err) => Reply::error(reply_status(err.errno()), offset),
        },
        Request::Read {
            mut offset,
            capacity,
        } => {
            let capacity = (capacity as usize).min(max_payload);
            let mut sink = VecSink::with_capacity(capacity);
            match channel.read(&mut sink, &mut offset) {
                Ok(_) => Reply::read_ok(offset, sink.into_inner()),
                Err(err) => Reply::error(reply_status(err.errno()), offset),
            }
        }
    }
}
