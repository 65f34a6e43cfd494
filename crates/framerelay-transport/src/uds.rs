use std::io::ErrorKind;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::reader::MessageReader;
use crate::traits::{Multipart, Publisher, Puller, Pusher, Subscriber};
use crate::writer::MessageWriter;

/// Listening Unix domain socket shared by the binding sides.
///
/// Removes a stale socket file before binding and cleans up the file on drop
/// as long as the path still refers to the socket this process created.
pub struct UnixDomainSocket {
    listener: UnixListener,
    path: PathBuf,
    created_inode: Option<(u64, u64)>,
}

impl UnixDomainSocket {
    /// Default permission mode for created socket paths.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;
    /// Maximum socket path length.
    /// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Bind and listen on a filesystem-path Unix domain socket.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_mode(path, Self::DEFAULT_SOCKET_MODE)
    }

    /// Bind and listen with an explicit permission mode.
    pub fn bind_with_mode(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let path_bytes = path.as_os_str().len();
        if path_bytes >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path,
                len: path_bytes,
                max: Self::MAX_PATH_LEN,
            });
        }

        let bind_err = |path: &Path, source: std::io::Error| TransportError::Bind {
            path: path.to_path_buf(),
            source,
        };

        // Remove a stale socket, but never remove non-socket files.
        if let Ok(metadata) = std::fs::symlink_metadata(&path) {
            if !metadata.file_type().is_socket() {
                return Err(bind_err(
                    &path,
                    std::io::Error::new(
                        ErrorKind::AlreadyExists,
                        "existing path is not a unix socket",
                    ),
                ));
            }
            debug!(?path, "removing stale socket");
            std::fs::remove_file(&path).map_err(|e| bind_err(&path, e))?;
        }

        let listener = UnixListener::bind(&path).map_err(|e| bind_err(&path, e))?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
            .map_err(|e| bind_err(&path, e))?;
        let created = std::fs::symlink_metadata(&path).map_err(|e| bind_err(&path, e))?;

        info!(?path, "listening on unix domain socket");

        Ok(Self {
            listener,
            path,
            created_inode: Some((created.dev(), created.ino())),
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(path = ?self.path, "accepted connection");
        Ok(stream)
    }

    /// Accept an incoming connection, waiting at most `poll`.
    ///
    /// Returns `TransportError::TimedOut` if nobody connected in time.
    pub fn accept_within(&self, poll: Duration) -> Result<UnixStream> {
        self.listener.set_nonblocking(true)?;
        let accepted = self.listener.accept();
        self.listener.set_nonblocking(false)?;

        match accepted {
            Ok((stream, _addr)) => {
                stream.set_nonblocking(false)?;
                debug!(path = ?self.path, "accepted connection");
                Ok(stream)
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                std::thread::sleep(poll);
                Err(TransportError::TimedOut)
            }
            Err(err) => Err(TransportError::Accept(err)),
        }
    }

    /// Connect to a listening Unix domain socket (blocking).
    pub fn connect(path: impl AsRef<Path>) -> Result<UnixStream> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|e| TransportError::Connect {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(?path, "connected to unix domain socket");
        Ok(stream)
    }

    /// The path this socket is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UnixDomainSocket {
    fn drop(&mut self) {
        let Some((expected_dev, expected_ino)) = self.created_inode else {
            return;
        };
        if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
            if metadata.file_type().is_socket()
                && metadata.dev() == expected_dev
                && metadata.ino() == expected_ino
            {
                debug!(path = ?self.path, "cleaning up socket file");
                let _ = std::fs::remove_file(&self.path);
            } else {
                debug!(path = ?self.path, "socket path identity changed; skipping cleanup");
            }
        }
    }
}

/// Subscriber over a Unix socket; applies the topic prefix filter locally.
pub struct UnixSubscriber {
    reader: MessageReader<UnixStream>,
    topic: Vec<u8>,
}

impl UnixSubscriber {
    /// Connect to a bound publisher and subscribe to `topic` (prefix match).
    pub fn connect(path: impl AsRef<Path>, topic: &[u8], poll: Option<Duration>) -> Result<Self> {
        let stream = UnixDomainSocket::connect(path)?;
        stream.set_read_timeout(poll)?;
        Ok(Self {
            reader: MessageReader::new(stream),
            topic: topic.to_vec(),
        })
    }
}

impl Subscriber for UnixSubscriber {
    fn recv_multipart(&mut self) -> Result<Multipart> {
        loop {
            let msg = self.reader.read_message()?;
            let matches = msg
                .topic()
                .is_some_and(|topic| topic.starts_with(&self.topic));
            if matches {
                return Ok(msg);
            }
            debug!(topic = %msg.topic_lossy(), "discarding message outside subscription");
        }
    }
}

/// Push sender over a Unix socket.
pub struct UnixPusher {
    writer: MessageWriter<UnixStream>,
}

impl UnixPusher {
    /// Connect to a bound puller.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let stream = UnixDomainSocket::connect(path)?;
        Ok(Self {
            writer: MessageWriter::new(stream),
        })
    }
}

impl Pusher for UnixPusher {
    fn send(&mut self, buf: &[u8]) -> Result<()> {
        self.writer.send_message(&[buf])
    }
}

/// Publisher bound on a Unix socket, serving one subscriber at a time.
///
/// The first publish blocks until a subscriber connects. A subscriber that
/// goes away is dropped; the message is lost, as on any pub/sub bus.
pub struct UnixPublisher {
    socket: UnixDomainSocket,
    subscriber: Option<MessageWriter<UnixStream>>,
}

impl UnixPublisher {
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            socket: UnixDomainSocket::bind(path)?,
            subscriber: None,
        })
    }

    pub fn path(&self) -> &Path {
        self.socket.path()
    }
}

impl Publisher for UnixPublisher {
    fn publish(&mut self, topic: &[u8], body: &[u8]) -> Result<()> {
        let mut writer = match self.subscriber.take() {
            Some(writer) => writer,
            None => {
                let stream = self.socket.accept()?;
                info!(path = ?self.socket.path(), "subscriber connected");
                MessageWriter::new(stream)
            }
        };

        match writer.send_message(&[topic, body]) {
            Ok(()) => {
                self.subscriber = Some(writer);
                Ok(())
            }
            Err(err) if is_disconnect(&err) => {
                warn!(error = %err, "subscriber disconnected; message dropped");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

fn is_disconnect(err: &TransportError) -> bool {
    match err {
        TransportError::ConnectionClosed => true,
        TransportError::Io(err) => matches!(
            err.kind(),
            ErrorKind::BrokenPipe | ErrorKind::ConnectionReset
        ),
        _ => false,
    }
}

/// Pull receiver bound on a Unix socket, serving one pusher at a time.
pub struct UnixPuller {
    socket: UnixDomainSocket,
    reader: Option<MessageReader<UnixStream>>,
    poll: Option<Duration>,
}

impl UnixPuller {
    pub fn bind(path: impl AsRef<Path>, poll: Option<Duration>) -> Result<Self> {
        Ok(Self {
            socket: UnixDomainSocket::bind(path)?,
            reader: None,
            poll,
        })
    }

    pub fn path(&self) -> &Path {
        self.socket.path()
    }
}

impl Puller for UnixPuller {
    fn recv(&mut self) -> Result<Bytes> {
        loop {
            let mut reader = match self.reader.take() {
                Some(reader) => reader,
                None => {
                    let stream = match self.poll {
                        Some(poll) => self.socket.accept_within(poll)?,
                        None => self.socket.accept()?,
                    };
                    stream.set_read_timeout(self.poll)?;
                    info!(path = ?self.socket.path(), "pusher connected");
                    MessageReader::new(stream)
                }
            };

            match reader.read_message() {
                Ok(msg) => {
                    self.reader = Some(reader);
                    if let Some(first) = msg.into_parts().into_iter().next() {
                        return Ok(first);
                    }
                }
                Err(TransportError::ConnectionClosed) => {
                    debug!("pusher disconnected");
                }
                Err(err) => {
                    self.reader = Some(reader);
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "framerelay-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn publish_subscribe_with_topic_filter() {
        let dir = unique_dir("pubsub");
        let sock_path = dir.join("pub.sock");
        let mut publisher = UnixPublisher::bind(&sock_path).unwrap();

        let path_clone = sock_path.clone();
        let handle = std::thread::spawn(move || {
            let mut subscriber = UnixSubscriber::connect(&path_clone, b"out", None).unwrap();
            subscriber.recv_multipart().unwrap()
        });

        publisher.publish(b"status", b"ignored").unwrap();
        publisher.publish(b"out/cam1", b"frame").unwrap();

        let msg = handle.join().unwrap();
        assert_eq!(msg.topic_lossy(), "out/cam1");
        assert_eq!(msg.body().unwrap().as_ref(), b"frame");

        drop(publisher);
        assert!(!sock_path.exists(), "socket file should be cleaned up on drop");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn push_pull_across_reconnect() {
        let dir = unique_dir("pushpull");
        let sock_path = dir.join("pull.sock");
        let mut puller = UnixPuller::bind(&sock_path, None).unwrap();

        let path_clone = sock_path.clone();
        let handle = std::thread::spawn(move || {
            let mut first = UnixPusher::connect(&path_clone).unwrap();
            first.send(b"one").unwrap();
            drop(first);
            let mut second = UnixPusher::connect(&path_clone).unwrap();
            second.send(b"two").unwrap();
        });

        assert_eq!(puller.recv().unwrap().as_ref(), b"one");
        assert_eq!(puller.recv().unwrap().as_ref(), b"two");

        handle.join().unwrap();
        drop(puller);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn puller_poll_times_out_without_pusher() {
        let dir = unique_dir("pullpoll");
        let mut puller =
            UnixPuller::bind(dir.join("idle.sock"), Some(Duration::from_millis(10))).unwrap();

        let err = puller.recv().unwrap_err();
        assert!(err.is_timeout());

        drop(puller);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn subscriber_poll_times_out_on_silent_publisher() {
        let dir = unique_dir("subpoll");
        let sock_path = dir.join("silent.sock");
        let socket = UnixDomainSocket::bind(&sock_path).unwrap();

        let mut subscriber =
            UnixSubscriber::connect(&sock_path, b"", Some(Duration::from_millis(10))).unwrap();
        let _server_side = socket.accept().unwrap();

        let err = subscriber.recv_multipart().unwrap_err();
        assert!(matches!(err, TransportError::TimedOut));

        drop(socket);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn path_too_long() {
        let long_path = "/tmp/".to_string() + &"a".repeat(200) + ".sock";
        let result = UnixDomainSocket::bind(&long_path);
        assert!(matches!(result, Err(TransportError::PathTooLong { .. })));
    }

    #[test]
    fn bind_default_permissions_hardened() {
        let dir = unique_dir("perms");
        let sock_path = dir.join("perm.sock");

        let socket = UnixDomainSocket::bind(&sock_path).unwrap();
        let mode = std::fs::metadata(&sock_path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);

        drop(socket);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bind_rejects_existing_non_socket_file() {
        let dir = unique_dir("bind-file");
        let sock_path = dir.join("not-a-socket.sock");
        std::fs::write(&sock_path, b"regular-file").unwrap();

        let result = UnixDomainSocket::bind(&sock_path);
        assert!(matches!(result, Err(TransportError::Bind { .. })));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn connect_without_listener_fails() {
        let dir = unique_dir("noconnect");
        let result = UnixPusher::connect(dir.join("missing.sock"));
        assert!(matches!(result, Err(TransportError::Connect { .. })));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
