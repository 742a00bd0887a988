use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use log::{error, info, warn};
use rusqlite::Connection;
use tokio::sync::oneshot;

use super::migrations::run_migrations;

const WORKER_THREAD_NAME: &str = "decision-wheel-db";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const MEMORY_PATH: &str = ":memory:";

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum Message {
    Run(Job),
    Stop,
}

struct Worker {
    sender: mpsc::Sender<Message>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        let mut handle = match self.handle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = handle.take() {
            if let Err(err) = self.sender.send(Message::Stop) {
                error!("Failed to stop DB worker: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB worker: {join_err:?}");
            }
        }
    }
}

/// Handle to the SQLite database. Every statement runs on one worker thread
/// that owns the connection; clones share that worker, and the last clone
/// to go away stops it.
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
    path: Arc<PathBuf>,
}

impl Database {
    /// Opens (or creates) the database file and brings its schema up to date.
    pub fn new(path: PathBuf) -> Result<Self> {
        ensure_parent_dir(&path)?;

        let open_path = path.clone();
        Self::start(path, move || {
            let conn = Connection::open(&open_path).with_context(|| {
                format!("failed to open SQLite database at {}", open_path.display())
            })?;
            if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                warn!("Failed to enable WAL mode: {err}");
            }
            Ok(conn)
        })
    }

    /// Private database that lives exactly as long as its handles.
    pub fn in_memory() -> Result<Self> {
        Self::start(PathBuf::from(MEMORY_PATH), || {
            Connection::open_in_memory().context("failed to open in-memory SQLite database")
        })
    }

    fn start<F>(path: PathBuf, open: F) -> Result<Self>
    where
        F: FnOnce() -> Result<Connection> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel::<Message>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.into())
            .spawn(move || {
                let mut conn = match open().and_then(prepare) {
                    Ok(conn) => conn,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                if ready_tx.send(Ok(())).is_err() {
                    error!("DB readiness receiver dropped");
                    return;
                }
                run_jobs(&mut conn, receiver);
            })
            .context("failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Database ready at {}", path.display());

        Ok(Self {
            worker: Arc::new(Worker {
                sender,
                handle: Mutex::new(Some(handle)),
            }),
            path: Arc::new(path),
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Runs `task` on the worker thread and waits for its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let job: Job = Box::new(move |conn| {
            if reply_tx.send(task(conn)).is_err() {
                warn!("DB caller went away before the result was ready");
            }
        });

        self.worker
            .sender
            .send(Message::Run(job))
            .map_err(|err| anyhow!("failed to hand job to DB worker: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database worker terminated unexpectedly"))?
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })
        }
        _ => Ok(()),
    }
}

fn prepare(mut conn: Connection) -> Result<Connection> {
    conn.busy_timeout(BUSY_TIMEOUT)
        .context("failed to set SQLite busy timeout")?;
    run_migrations(&mut conn).context("failed to run database migrations")?;
    Ok(conn)
}

fn run_jobs(conn: &mut Connection, receiver: mpsc::Receiver<Message>) {
    while let Ok(message) = receiver.recv() {
        match message {
            Message::Run(job) => job(conn),
            Message::Stop => break,
        }
    }
    info!("Database worker shutting down");
}
