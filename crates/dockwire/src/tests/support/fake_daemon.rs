//! Scripted HTTP daemon for exchange tests.
//!
//! Accepts a single connection on TCP or a unix socket, records the request,
//! then plays back a script of response pieces. A script may pause on a gate
//! so tests can prove documents are delivered before the body completes.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::net::UnixListener;

use anyhow::{Context, Result, anyhow, bail};

const GATE_TIMEOUT: Duration = Duration::from_secs(5);

/// One step of the response script.
pub(in crate::tests) enum Step {
    /// Bytes written and flushed immediately.
    Send(Vec<u8>),
    /// Waits until the test opens the gate.
    AwaitGate,
}

/// Request as received by the daemon.
#[derive(Debug, Clone, Default)]
pub(in crate::tests) struct RecordedRequest {
    pub head: String,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// First line, for example `GET /v1.39/_ping HTTP/1.1`.
    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    /// Value of the first header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }
}

/// Handle on a running fake daemon.
pub(in crate::tests) struct FakeDaemon {
    target: String,
    gate: Sender<()>,
    request: Arc<Mutex<Option<RecordedRequest>>>,
    handle: Option<thread::JoinHandle<Result<()>>>,
    _dir: Option<tempfile::TempDir>,
}

impl FakeDaemon {
    /// Listens on an ephemeral loopback port.
    pub fn spawn_tcp(script: Vec<Step>) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake daemon")?;
        let port = listener.local_addr().context("local addr")?.port();
        let (gate, opened) = mpsc::channel();
        let request = Arc::new(Mutex::new(None));
        let recorded = Arc::clone(&request);
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().context("accept tcp connection")?;
            serve(stream, &script, &opened, &recorded)
        });
        Ok(Self {
            target: format!("http://127.0.0.1:{port}"),
            gate,
            request,
            handle: Some(handle),
            _dir: None,
        })
    }

    /// Listens on a socket file inside a fresh temporary directory.
    #[cfg(unix)]
    pub fn spawn_unix(script: Vec<Step>) -> Result<Self> {
        let dir = tempfile::tempdir().context("socket dir")?;
        let path = dir.path().join("docker.sock");
        let listener = UnixListener::bind(&path).context("bind unix socket")?;
        let target = path
            .to_str()
            .map(str::to_owned)
            .ok_or_else(|| anyhow!("socket path is not UTF-8"))?;
        let (gate, opened) = mpsc::channel();
        let request = Arc::new(Mutex::new(None));
        let recorded = Arc::clone(&request);
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().context("accept unix connection")?;
            serve(stream, &script, &opened, &recorded)
        });
        Ok(Self {
            target,
            gate,
            request,
            handle: Some(handle),
            _dir: Some(dir),
        })
    }

    /// Target string for [`crate::DockerClient::connect`].
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Lets the script continue past an [`Step::AwaitGate`].
    pub fn open_gate(&self) {
        let _ = self.gate.send(());
    }

    /// Waits for the daemon thread and returns the recorded request.
    pub fn finish(mut self) -> Result<RecordedRequest> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake daemon thread panicked"))?
                .context("fake daemon failed")?;
        }
        self.request
            .lock()
            .map_err(|error| anyhow!("lock request: {error}"))?
            .take()
            .context("no request recorded")
    }
}

fn serve<S: Read + Write>(
    mut stream: S,
    script: &[Step],
    gate: &Receiver<()>,
    recorded: &Mutex<Option<RecordedRequest>>,
) -> Result<()> {
    let request = read_request(&mut stream)?;
    *recorded
        .lock()
        .map_err(|error| anyhow!("lock request: {error}"))? = Some(request);

    for step in script {
        match step {
            Step::Send(bytes) => {
                stream.write_all(bytes).context("write response")?;
                stream.flush().context("flush response")?;
            }
            Step::AwaitGate => match gate.recv_timeout(GATE_TIMEOUT) {
                Ok(()) => {}
                Err(RecvTimeoutError::Timeout) => bail!("gate was never opened"),
                // The test dropped the handle; nobody is reading any more.
                Err(RecvTimeoutError::Disconnected) => return Ok(()),
            },
        }
    }
    Ok(())
}

fn read_request<S: Read>(stream: &mut S) -> Result<RecordedRequest> {
    let mut reader = BufReader::new(stream);
    let mut head = String::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).context("read request head")? == 0 {
            bail!("client closed before sending a request");
        }
        let blank = line == "\r\n";
        head.push_str(&line);
        if blank {
            break;
        }
    }

    let mut request = RecordedRequest {
        head,
        body: Vec::new(),
    };
    let length = request
        .header("content-length")
        .map(str::parse::<usize>)
        .transpose()
        .context("parse content length")?
        .unwrap_or_default();
    request.body = vec![0; length];
    reader
        .read_exact(&mut request.body)
        .context("read request body")?;
    Ok(request)
}

/// Complete response with a `Content-Length` body.
pub(in crate::tests) fn fixed_response(status: &str, body: &str) -> Vec<Step> {
    vec![Step::Send(
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        )
        .into_bytes(),
    )]
}

/// Head of a chunked response.
pub(in crate::tests) fn chunked_head(status: &str) -> Step {
    Step::Send(
        format!("HTTP/1.1 {status}\r\nContent-Type: application/json\r\nTransfer-Encoding: chunked\r\n\r\n")
            .into_bytes(),
    )
}

/// One chunk of a chunked body.
pub(in crate::tests) fn chunk(data: &str) -> Step {
    Step::Send(format!("{:x}\r\n{data}\r\n", data.len()).into_bytes())
}

/// Terminating chunk.
pub(in crate::tests) fn last_chunk() -> Step {
    Step::Send(b"0\r\n\r\n".to_vec())
}

/// Loopback port whose listener accepts one connection and drops it unread.
pub(in crate::tests) fn hang_up_port() -> io::Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    let port = listener.local_addr()?.port();
    thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            drop(stream);
        }
    });
    Ok(port)
}

/// Loopback port with no listener behind it.
pub(in crate::tests) fn closed_port() -> io::Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}
