use crate::surface::{Surface, SurfaceProvider};
use crate::{Error, Result, Viewport};
use log::{debug, warn};
use std::sync::mpsc::{self, Sender};
use std::thread;
use tokio::sync::oneshot;

enum Command {
    Load(String, oneshot::Sender<Result<()>>),
    Freeze(Vec<String>, oneshot::Sender<Result<()>>),
    Seek(f64, oneshot::Sender<Result<()>>),
    Capture(oneshot::Sender<Result<Vec<u8>>>),
    Close(oneshot::Sender<Result<()>>),
}

/// An async handle to a rendering surface owned by a dedicated worker thread.
///
/// The worker thread creates the surface and executes commands sent from the
/// async pipeline, so blocking browser automation never runs on the runtime
/// and the surface itself never has to be `Send`.
///
/// The surface is released exactly once: by [`SurfaceHandle::close`], or by
/// the worker when the handle is dropped without closing.
pub struct SurfaceHandle {
    cmd_tx: Option<Sender<Command>>,
}

impl SurfaceHandle {
    /// Open a surface sized to `viewport` (spawns the worker thread).
    pub async fn open<P>(provider: P, viewport: Viewport) -> Result<Self>
    where
        P: SurfaceProvider + Send + 'static,
    {
        viewport.validate()?;

        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx) = oneshot::channel::<Result<()>>();

        thread::Builder::new()
            .name(format!("surface-{}", viewport))
            .spawn(move || {
                let mut surface = match provider.open(viewport) {
                    Ok(s) => s,
                    Err(err) => {
                        let _ = init_tx.send(Err(err));
                        return;
                    }
                };
                let _ = init_tx.send(Ok(()));

                while let Ok(cmd) = cmd_rx.recv() {
                    match cmd {
                        Command::Load(url, resp) => {
                            let _ = resp.send(surface.load(&url));
                        }
                        Command::Freeze(selectors, resp) => {
                            let _ = resp.send(surface.freeze(&selectors));
                        }
                        Command::Seek(offset_ms, resp) => {
                            let _ = resp.send(surface.seek(offset_ms));
                        }
                        Command::Capture(resp) => {
                            let _ = resp.send(surface.capture_png());
                        }
                        Command::Close(resp) => {
                            let _ = resp.send(surface.close());
                            return;
                        }
                    }
                }

                // Handle dropped without an explicit close.
                debug!("surface handle dropped; releasing surface");
                if let Err(e) = surface.close() {
                    warn!("Failed to release surface: {}", e);
                }
            })
            .map_err(|e| Error::SurfaceInit(format!("Failed to spawn surface worker: {}", e)))?;

        init_rx
            .await
            .map_err(|e| Error::Other(format!("Surface worker init canceled: {}", e)))??;

        Ok(Self { cmd_tx: Some(cmd_tx) })
    }

    async fn request<T>(
        &self,
        what: &str,
        make: impl FnOnce(oneshot::Sender<Result<T>>) -> Command,
    ) -> Result<T> {
        let cmd_tx = self
            .cmd_tx
            .as_ref()
            .ok_or_else(|| Error::Other(format!("{} on a closed surface", what)))?;
        let (tx, rx) = oneshot::channel();
        cmd_tx
            .send(make(tx))
            .map_err(|_| Error::Other(format!("{} failed: surface worker has exited", what)))?;
        rx.await
            .map_err(|e| Error::Other(format!("{} canceled: {}", what, e)))?
    }

    /// Navigate to `url` and wait for network quiescence
    pub async fn load(&self, url: &str) -> Result<()> {
        self.request("Load", |tx| Command::Load(url.to_string(), tx)).await
    }

    /// Pause all animations and hide the given selectors
    pub async fn freeze(&self, hidden_selectors: &[String]) -> Result<()> {
        self.request("Freeze", |tx| Command::Freeze(hidden_selectors.to_vec(), tx))
            .await
    }

    /// Seek every animation to `offset_ms`
    pub async fn seek(&self, offset_ms: f64) -> Result<()> {
        self.request("Seek", |tx| Command::Seek(offset_ms, tx)).await
    }

    /// Capture the current frame as PNG
    pub async fn capture(&self) -> Result<Vec<u8>> {
        self.request("Capture", Command::Capture).await
    }

    /// Release the surface and stop the worker.
    pub async fn close(mut self) -> Result<()> {
        let result = self.request("Close", Command::Close).await;
        self.cmd_tx = None;
        result
    }
}

impl Drop for SurfaceHandle {
    fn drop(&mut self) {
        // Dropping the sender ends the worker loop, which releases the surface.
        self.cmd_tx.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Log(Arc<Mutex<Vec<String>>>);

    impl Log {
        fn push(&self, entry: impl Into<String>) {
            self.0.lock().unwrap().push(entry.into());
        }
        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct TestSurface(Log);

    impl Surface for TestSurface {
        fn load(&mut self, url: &str) -> Result<()> {
            self.0.push(format!("load {}", url));
            Ok(())
        }
        fn freeze(&mut self, hidden: &[String]) -> Result<()> {
            self.0.push(format!("freeze {}", hidden.join(",")));
            Ok(())
        }
        fn seek(&mut self, offset_ms: f64) -> Result<()> {
            self.0.push(format!("seek {}", offset_ms));
            Ok(())
        }
        fn capture_png(&mut self) -> Result<Vec<u8>> {
            Ok(vec![1, 2, 3])
        }
        fn close(self) -> Result<()> {
            self.0.push("close");
            Ok(())
        }
    }

    struct TestProvider {
        log: Log,
        fail: bool,
    }

    impl SurfaceProvider for TestProvider {
        type Surface = TestSurface;

        fn open(&self, viewport: Viewport) -> Result<TestSurface> {
            if self.fail {
                return Err(Error::SurfaceInit("no browser".into()));
            }
            self.log.push(format!("open {}", viewport));
            Ok(TestSurface(self.log.clone()))
        }
    }

    async fn wait_for(log: &Log, entry: &str) {
        for _ in 0..200 {
            if log.entries().iter().any(|e| e == entry) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("never saw {:?} in {:?}", entry, log.entries());
    }

    #[tokio::test]
    async fn commands_run_in_order() {
        let log = Log::default();
        let handle = SurfaceHandle::open(TestProvider { log: log.clone(), fail: false }, Viewport::new(4, 3))
            .await
            .unwrap();

        handle.load("file:///scene.html").await.unwrap();
        handle.freeze(&[".hint".to_string()]).await.unwrap();
        handle.seek(33.5).await.unwrap();
        assert_eq!(handle.capture().await.unwrap(), vec![1, 2, 3]);
        handle.close().await.unwrap();

        assert_eq!(
            log.entries(),
            vec!["open 4x3", "load file:///scene.html", "freeze .hint", "seek 33.5", "close"]
        );
    }

    #[tokio::test]
    async fn drop_releases_surface() {
        let log = Log::default();
        let handle = SurfaceHandle::open(TestProvider { log: log.clone(), fail: false }, Viewport::new(4, 3))
            .await
            .unwrap();
        drop(handle);
        wait_for(&log, "close").await;
        assert_eq!(log.entries().iter().filter(|e| *e == "close").count(), 1);
    }

    #[tokio::test]
    async fn open_failure_is_reported() {
        let err = SurfaceHandle::open(TestProvider { log: Log::default(), fail: true }, Viewport::new(4, 3))
            .await
            .err()
            .expect("open should fail");
        assert!(matches!(err, Error::SurfaceInit(_)));
    }
}
