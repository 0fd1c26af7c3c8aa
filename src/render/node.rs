//! Precompiled render entry executed by a Node.js worker.
//!
//! # Responsibilities
//! - Resolve the precompiled server entry on disk and import it once, in a
//!   long-lived Node.js worker (via the Prod strategy)
//! - Send each `render({ req, res, head })` call to that worker
//! - Replay the captured response state into the [`ResponseWriter`]
//!
//! # Data Flow
//! ```text
//! NodeEntryLoader::load
//!     → spawn `node` with WORKER_SHIM
//!     → worker imports SSR_ENTRY → {"id":0,"ready":true} | {"id":0,"error":…}
//!     → driver task owns stdin/stdout
//!
//! NodeWorkerEntry::render
//!     → mpsc → driver assigns id → JSON line on stdin
//!     → JSON line on stdout with the same id → oneshot → RenderOutcome
//! ```
//!
//! # Design Decisions
//! - Import failures surface from `load`, so they are module-resolution
//!   failures rather than render failures
//! - Renders may overlap; replies are matched by id, not by order
//! - Application output on stdout and stderr is forwarded to the log so the
//!   protocol channel stays clean
//! - A render that throws still reports whatever it wrote before throwing

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};

use crate::render::wire::{RenderOutcome, RenderRequest};
use crate::render::{EntryLoader, ModuleError, RenderContext, RenderEntry};

/// Renders queued for one worker before callers wait on the channel.
const WORKER_QUEUE: usize = 256;

/// ES-module shim that imports the entry named by `SSR_ENTRY` once, then
/// answers one JSON line per render request.
const WORKER_SHIM: &str = r#"
import { pathToFileURL } from 'node:url';
import { createInterface } from 'node:readline';

const write = process.stdout.write.bind(process.stdout);
process.stdout.write = process.stderr.write.bind(process.stderr);
console.log = console.info = console.debug = (...args) => console.error(...args);
const reply = (message) => write(JSON.stringify(message) + '\n');
const toError = (error) => ({
  message: String(error?.message ?? error),
  stack: String(error?.stack ?? error),
});

let entry;
try {
  entry = await import(pathToFileURL(process.env.SSR_ENTRY).href);
  if (typeof entry.render !== 'function') {
    throw new Error(`${process.env.SSR_ENTRY} does not export a render function`);
  }
  reply({ id: 0, ready: true });
} catch (error) {
  entry = undefined;
  reply({ id: 0, error: toError(error) });
  process.exitCode = 1;
}

const handle = async ({ id, url, method, headers: requestHeaders, head }) => {
  const state = { status: 200, body: '', ended: false };
  const headers = new Map();
  let done;
  const finished = new Promise((resolve) => { done = resolve; });
  const res = {
    get statusCode() { return state.status; },
    set statusCode(code) { state.status = code; },
    status(code) { state.status = code; return res; },
    setHeader(name, value) { headers.set(String(name).toLowerCase(), String(value)); return res; },
    getHeader(name) { return headers.get(String(name).toLowerCase()); },
    writeHead(code, extra) {
      state.status = code;
      for (const [name, value] of Object.entries(extra ?? {})) res.setHeader(name, value);
      return res;
    },
    write(chunk) { state.body += String(chunk); return true; },
    send(chunk) { return res.end(chunk); },
    end(chunk) {
      if (chunk !== undefined) state.body += String(chunk);
      state.ended = true;
      done();
      return res;
    },
  };
  const req = { url, originalUrl: url, method, headers: Object.fromEntries(requestHeaders) };

  let error;
  try {
    await entry.render({ req, res, head });
    await finished;
  } catch (caught) {
    error = toError(caught);
  }
  reply({ id, ...state, headers: [...headers], ...(error ? { error } : {}) });
};

if (entry) {
  createInterface({ input: process.stdin }).on('line', (line) => {
    if (line.trim() !== '') handle(JSON.parse(line));
  });
}
"#;

#[derive(Serialize)]
struct WorkerRequest<'a> {
    id: u64,
    #[serde(flatten)]
    request: &'a RenderRequest,
}

#[derive(Deserialize)]
struct WorkerReply {
    id: u64,
    #[serde(default)]
    ready: bool,
    #[serde(flatten)]
    outcome: RenderOutcome,
}

type ReplySender = oneshot::Sender<Result<RenderOutcome, ModuleError>>;

/// One render handed to the driver task.
struct WorkerCall {
    request: RenderRequest,
    reply: ReplySender,
}

/// Loads precompiled entries into Node.js workers.
#[derive(Debug, Clone)]
pub struct NodeEntryLoader {
    node_path: String,
}

impl NodeEntryLoader {
    pub fn new(node_path: impl Into<String>) -> Self {
        Self {
            node_path: node_path.into(),
        }
    }
}

#[async_trait]
impl EntryLoader for NodeEntryLoader {
    async fn load(&self, path: &Path) -> Result<Arc<dyn RenderEntry>, ModuleError> {
        let module = tokio::fs::canonicalize(path).await.map_err(|e| {
            ModuleError::new(format!("Cannot find module '{}': {}", path.display(), e))
        })?;

        let metadata = tokio::fs::metadata(&module)
            .await
            .map_err(|e| ModuleError::new(format!("Cannot read module '{}': {}", module.display(), e)))?;
        if !metadata.is_file() {
            return Err(ModuleError::new(format!(
                "Render entry is not a file: {}",
                module.display()
            )));
        }

        let mut child = Command::new(&self.node_path)
            .arg("--input-type=module")
            .arg("-e")
            .arg(WORKER_SHIM)
            .env("SSR_ENTRY", &module)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ModuleError::new(format!("Failed to spawn Node.js: {}", e)))?;

        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(ModuleError::new("Node.js worker pipes unavailable"));
        };
        tokio::spawn(forward_output(stderr, module.display().to_string()));

        let mut replies = BufReader::new(stdout).lines();
        let handshake = match replies.next_line().await {
            Ok(Some(line)) => serde_json::from_str::<WorkerReply>(&line).map_err(|e| {
                ModuleError::new(format!("Invalid handshake from Node.js worker: {}", e))
            })?,
            Ok(None) => {
                return Err(ModuleError::new(format!(
                    "Node.js exited before loading '{}'",
                    module.display()
                )))
            }
            Err(e) => {
                return Err(ModuleError::new(format!(
                    "Failed to read from Node.js worker: {}",
                    e
                )))
            }
        };
        if let Some(error) = handshake.outcome.error {
            return Err(error);
        }
        if !handshake.ready {
            return Err(ModuleError::new(format!(
                "Node.js worker did not confirm loading '{}'",
                module.display()
            )));
        }

        let (calls, queue) = mpsc::channel(WORKER_QUEUE);
        tokio::spawn(drive_worker(child, stdin, replies, queue, module.clone()));

        tracing::info!(module = %module.display(), "Precompiled render entry loaded");
        Ok(Arc::new(NodeWorkerEntry { module, calls }))
    }
}

/// A precompiled entry imported once into a Node.js worker.
#[derive(Debug, Clone)]
pub struct NodeWorkerEntry {
    module: PathBuf,
    calls: mpsc::Sender<WorkerCall>,
}

impl NodeWorkerEntry {
    pub fn module(&self) -> &Path {
        &self.module
    }

    fn not_running(&self) -> ModuleError {
        ModuleError::new(format!(
            "Node.js worker for '{}' is not running",
            self.module.display()
        ))
    }
}

#[async_trait]
impl RenderEntry for NodeWorkerEntry {
    async fn render(&self, ctx: RenderContext<'_>) -> Result<(), ModuleError> {
        let (reply, outcome) = oneshot::channel();
        let request = RenderRequest::new("", ctx.request, ctx.head);

        self.calls
            .send(WorkerCall { request, reply })
            .await
            .map_err(|_| self.not_running())?;
        let outcome = outcome.await.map_err(|_| self.not_running())??;
        outcome.apply(ctx.response)
    }
}

/// Own the worker's pipes: write queued renders, route replies by id.
async fn drive_worker(
    mut child: Child,
    mut stdin: ChildStdin,
    mut replies: Lines<BufReader<ChildStdout>>,
    mut queue: mpsc::Receiver<WorkerCall>,
    module: PathBuf,
) {
    let mut pending: HashMap<u64, ReplySender> = HashMap::new();
    let mut next_id: u64 = 1;

    loop {
        tokio::select! {
            call = queue.recv() => {
                // Every entry handle is gone.
                let Some(call) = call else { break };

                let id = next_id;
                next_id += 1;

                let mut line = match serde_json::to_string(&WorkerRequest { id, request: &call.request }) {
                    Ok(line) => line,
                    Err(e) => {
                        let _ = call
                            .reply
                            .send(Err(ModuleError::new(format!("Failed to encode render request: {}", e))));
                        continue;
                    }
                };
                line.push('\n');

                if let Err(e) = stdin.write_all(line.as_bytes()).await {
                    let _ = call
                        .reply
                        .send(Err(ModuleError::new(format!("Failed to write to Node.js worker: {}", e))));
                    continue;
                }
                pending.insert(id, call.reply);
            }
            line = replies.next_line() => {
                match line {
                    Ok(Some(line)) => match serde_json::from_str::<WorkerReply>(&line) {
                        Ok(reply) => match pending.remove(&reply.id) {
                            Some(sender) => {
                                let _ = sender.send(Ok(reply.outcome));
                            }
                            None => tracing::warn!(id = reply.id, "Reply for unknown render request"),
                        },
                        Err(e) => tracing::warn!(error = %e, "Invalid render output from Node.js worker"),
                    },
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to read from Node.js worker");
                        break;
                    }
                }
            }
        }
    }

    for (_, sender) in pending.drain() {
        let _ = sender.send(Err(ModuleError::new(format!(
            "Node.js worker for '{}' exited before replying",
            module.display()
        ))));
    }

    let _ = child.start_kill();
    match child.wait().await {
        Ok(status) => tracing::info!(module = %module.display(), %status, "Node.js worker stopped"),
        Err(e) => tracing::warn!(module = %module.display(), error = %e, "Failed to reap Node.js worker"),
    }
}

/// Forward the worker's diagnostic output to the log.
async fn forward_output(stderr: ChildStderr, module: String) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::info!(module = %module, "{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{IncomingRequest, ResponseWriter};
    use axum::http::{Request, StatusCode};

    async fn load_source(dir: &Path, source: &str) -> Result<Arc<dyn RenderEntry>, ModuleError> {
        let path = dir.join("entry-server.mjs");
        std::fs::write(&path, source).unwrap();
        NodeEntryLoader::new("node").load(&path).await
    }

    async fn loaded(dir: &Path, source: &str) -> Arc<dyn RenderEntry> {
        match load_source(dir, source).await {
            Ok(entry) => entry,
            Err(e) => panic!("load failed: {}", e.stack()),
        }
    }

    async fn load_error(dir: &Path, source: &str) -> ModuleError {
        match load_source(dir, source).await {
            Ok(_) => panic!("expected load failure"),
            Err(e) => e,
        }
    }

    async fn render(
        entry: &Arc<dyn RenderEntry>,
        uri: &str,
        head: &str,
    ) -> (ResponseWriter, Result<(), ModuleError>) {
        let (parts, _) = Request::get(uri)
            .header("accept-language", "en")
            .body(())
            .unwrap()
            .into_parts();
        let request = IncomingRequest::from_parts(&parts);
        let mut response = ResponseWriter::new();
        let result = entry
            .render(RenderContext {
                request: &request,
                response: &mut response,
                head,
            })
            .await;
        (response, result)
    }

    #[tokio::test]
    async fn test_load_missing_entry() {
        let loader = NodeEntryLoader::new("node");
        let err = match loader.load(Path::new("does/not/exist/entry-server.js")).await {
            Ok(_) => panic!("expected load failure"),
            Err(e) => e,
        };
        assert!(err.message.contains("Cannot find module"));
    }

    #[tokio::test]
    async fn test_load_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let loader = NodeEntryLoader::new("node");
        assert!(loader.load(dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_load_syntax_error_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_error(dir.path(), "export function render( {{{ broken").await;
        assert!(err.stack().contains("SyntaxError"), "stack: {}", err.stack());
    }

    #[tokio::test]
    async fn test_load_throwing_module_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_error(
            dir.path(),
            "throw new Error('missing DATABASE_URL');\nexport function render() {}",
        )
        .await;
        assert_eq!(err.message, "missing DATABASE_URL");
    }

    #[tokio::test]
    async fn test_load_requires_render_export() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_error(dir.path(), "export const other = 1;").await;
        assert!(err.message.contains("does not export a render function"));
    }

    #[tokio::test]
    async fn test_render_replays_status_and_headers() {
        let dir = tempfile::tempdir().unwrap();
        let entry = loaded(
            dir.path(),
            r#"
export function render({ res }) {
  console.log('rendering');
  res.statusCode = 201;
  res.setHeader('Content-Type', 'text/html; charset=utf-8');
  res.setHeader('X-Rendered-By', 'node');
  res.end('<html><body>created</body></html>');
}
"#,
        )
        .await;

        let (response, result) = render(&entry, "/", "").await;
        assert!(result.is_ok());
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/html; charset=utf-8"
        );
        assert_eq!(response.headers().get("x-rendered-by").unwrap(), "node");
        assert_eq!(response.body(), b"<html><body>created</body></html>");
        assert!(response.is_ended());
    }

    #[tokio::test]
    async fn test_render_receives_head_and_original_url() {
        let dir = tempfile::tempdir().unwrap();
        let entry = loaded(
            dir.path(),
            r#"
export function render({ req, res, head }) {
  res.end(JSON.stringify({
    url: req.originalUrl,
    method: req.method,
    lang: req.headers['accept-language'],
    head,
  }));
}
"#,
        )
        .await;

        let (response, result) = render(&entry, "/about?tab=team", "<title>About</title>").await;
        assert!(result.is_ok());
        let seen: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(seen["url"], "/about?tab=team");
        assert_eq!(seen["method"], "GET");
        assert_eq!(seen["lang"], "en");
        assert_eq!(seen["head"], "<title>About</title>");
    }

    #[tokio::test]
    async fn test_render_error_keeps_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let entry = loaded(
            dir.path(),
            r#"
export function render({ res }) {
  res.write('<html><body><h1>Half');
  throw new Error('component exploded');
}
"#,
        )
        .await;

        let (response, result) = render(&entry, "/broken", "").await;
        let err = match result {
            Ok(()) => panic!("expected render failure"),
            Err(e) => e,
        };
        assert_eq!(err.message, "component exploded");
        assert!(err.stack().contains("at render"), "stack: {}", err.stack());
        assert!(response.is_started());
        assert!(!response.is_ended());
    }

    #[tokio::test]
    async fn test_entry_imported_once() {
        let dir = tempfile::tempdir().unwrap();
        let entry = loaded(
            dir.path(),
            r#"
import { appendFileSync } from 'node:fs';
appendFileSync(new URL('./imports.log', import.meta.url), 'x');
let renders = 0;
export function render({ res }) {
  renders += 1;
  res.end(String(renders));
}
"#,
        )
        .await;

        let (first, _) = render(&entry, "/a", "").await;
        let (second, _) = render(&entry, "/b", "").await;

        assert_eq!(first.body(), b"1");
        assert_eq!(second.body(), b"2");
        let imports = std::fs::read_to_string(dir.path().join("imports.log")).unwrap();
        assert_eq!(imports, "x");
    }

    #[tokio::test]
    async fn test_overlapping_renders_matched_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let entry = loaded(
            dir.path(),
            r#"
export function render({ req, res }) {
  const delay = req.url === '/slow' ? 100 : 0;
  setTimeout(() => res.end(req.url), delay);
}
"#,
        )
        .await;

        let ((slow, slow_result), (fast, fast_result)) =
            tokio::join!(render(&entry, "/slow", ""), render(&entry, "/fast", ""));
        assert!(slow_result.is_ok() && fast_result.is_ok());
        assert_eq!(slow.body(), b"/slow");
        assert_eq!(fast.body(), b"/fast");
    }

    #[tokio::test]
    async fn test_worker_exit_fails_renders() {
        let dir = tempfile::tempdir().unwrap();
        let entry = loaded(
            dir.path(),
            "export function render() { process.exit(3); }",
        )
        .await;

        let (_, first) = render(&entry, "/", "").await;
        assert!(first.unwrap_err().message.contains("Node.js worker"));

        let (_, second) = render(&entry, "/", "").await;
        assert!(second.is_err());
    }
}
