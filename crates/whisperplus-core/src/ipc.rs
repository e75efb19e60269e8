//! IPC Toggle Server
//!
//! Unix socket that lets `whisperplus toggle` reach the running instance.
//! Bind that command to a key in the compositor when global hotkeys are not
//! available (e.g. on Wayland).

use std::env;
use std::io;
use std::path::PathBuf;

pub const SOCKET_NAME: &str = "whisperplus.sock";
const TOGGLE_MESSAGE: &str = "toggle";

/// `$XDG_RUNTIME_DIR/whisperplus.sock`, or under `/tmp` without a runtime dir
pub fn socket_path() -> PathBuf {
    let runtime_dir = env::var("XDG_RUNTIME_DIR")
        .ok()
        .filter(|dir| !dir.is_empty())
        .unwrap_or_else(|| "/tmp".into());
    PathBuf::from(runtime_dir).join(SOCKET_NAME)
}

#[cfg(unix)]
mod unix {
    use super::*;
    use std::path::Path;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{UnixListener, UnixStream};
    use tokio::task::JoinHandle;

    use crate::recording::{ActionSender, RecordingAction};

    /// Send a toggle to the instance listening on `path`
    pub async fn send_toggle_to(path: &Path) -> io::Result<()> {
        let mut stream = UnixStream::connect(path).await?;
        stream.write_all(TOGGLE_MESSAGE.as_bytes()).await?;
        stream.shutdown().await?;
        Ok(())
    }

    /// Listening socket. Dropping it stops the listener and removes the file.
    pub struct IpcServer {
        path: PathBuf,
        task: JoinHandle<()>,
    }

    impl IpcServer {
        /// Bind `path`, replacing a stale socket, and forward each `toggle`
        /// message to `actions`
        pub fn bind(path: impl Into<PathBuf>, actions: ActionSender) -> io::Result<Self> {
            let path = path.into();
            match std::fs::remove_file(&path) {
                Ok(()) => log::debug!("Removed stale IPC socket {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }

            let listener = UnixListener::bind(&path)?;
            log::info!("IPC listener started at {}", path.display());

            let task = tokio::spawn(async move {
                loop {
                    match listener.accept().await {
                        Ok((stream, _)) => {
                            let actions = actions.clone();
                            tokio::spawn(async move { handle_client(stream, actions).await });
                        }
                        Err(e) => log::error!("IPC connection error: {e}"),
                    }
                }
            });

            Ok(Self { path, task })
        }

        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    impl Drop for IpcServer {
        fn drop(&mut self) {
            self.task.abort();
            if let Err(e) = std::fs::remove_file(&self.path) {
                log::debug!("Could not remove IPC socket {}: {e}", self.path.display());
            }
        }
    }

    async fn handle_client(mut stream: UnixStream, actions: ActionSender) {
        let mut buf = [0u8; 64];
        let n = match stream.read(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                log::warn!("IPC read failed: {e}");
                return;
            }
        };
        let command = String::from_utf8_lossy(&buf[..n]);
        if command.trim() == TOGGLE_MESSAGE {
            log::info!("IPC: toggle command received");
            actions.send(RecordingAction::Toggle);
        } else {
            log::debug!("IPC: ignoring unknown command {:?}", command.trim());
        }
    }
}

#[cfg(unix)]
pub use unix::{IpcServer, send_toggle_to};

/// Send a toggle to the running instance at [`socket_path`]
#[cfg(unix)]
pub async fn send_toggle() -> io::Result<()> {
    send_toggle_to(&socket_path()).await
}

#[cfg(not(unix))]
pub async fn send_toggle() -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Unix sockets not available on this platform",
    ))
}
