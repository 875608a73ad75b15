//! Offline cache worker.
//!
//! Models the install / activate / fetch lifecycle of the browser worker that
//! keeps the shell available offline, and renders the script actually served
//! to browsers from the same constants. Each lifecycle step is an `async fn`
//! that completes only once its cache work is done.

use crate::errors::OfflineError;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub const CACHE_VERSION: &str = "v7";
pub const CACHE_PREFIX: &str = "calculator-hub";
pub const SHELL_PAGE: &str = "./index.html";
pub const SHELL_ASSETS: &[&str] = &["./", SHELL_PAGE, "./manifest.json", "./style.css"];
/// File types the worker may answer from cache. Pages and `/api` reads are
/// rendered from live state and always go to the network.
pub const STATIC_EXTENSIONS: &[&str] = &["css", "js", "json", "png", "svg", "ico", "webmanifest", "woff", "woff2"];

pub fn static_cache_name() -> String {
    format!("{CACHE_PREFIX}-{CACHE_VERSION}")
}

pub fn runtime_cache_name() -> String {
    format!("{CACHE_PREFIX}-runtime-{CACHE_VERSION}")
}

/// Whether a non-navigation GET is served cache-first.
pub fn is_static_asset(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    if SHELL_ASSETS.contains(&path) {
        return true;
    }
    if path.contains("/api/") {
        return false;
    }
    path.rsplit_once('.')
        .is_some_and(|(_, ext)| !ext.contains('/') && STATIC_EXTENSIONS.contains(&ext))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    Cors,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub method: Method,
    pub mode: RequestMode,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            mode: RequestMode::SameOrigin,
        }
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        Self {
            mode: RequestMode::Navigate,
            ..Self::get(url)
        }
    }
}

/// `Basic` is a same-origin response; only those are kept in the runtime cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Basic,
    Cors,
    Opaque,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub kind: ResponseKind,
    pub body: Vec<u8>,
}

impl Response {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            kind: ResponseKind::Basic,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[allow(async_fn_in_trait)]
pub trait Network {
    async fn fetch(&self, request: &Request) -> Result<Response, OfflineError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cache {
    entries: BTreeMap<String, Response>,
}

impl Cache {
    pub fn put(&mut self, url: impl Into<String>, response: Response) {
        self.entries.insert(url.into(), response);
    }

    pub fn get(&self, url: &str) -> Option<&Response> {
        self.entries.get(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Named caches, matched in creation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStorage {
    caches: Vec<(String, Cache)>,
}

impl CacheStorage {
    pub fn open(&mut self, name: &str) -> &mut Cache {
        let position = match self.caches.iter().position(|(existing, _)| existing == name) {
            Some(position) => position,
            None => {
                self.caches.push((name.to_string(), Cache::default()));
                self.caches.len() - 1
            }
        };
        &mut self.caches[position].1
    }

    pub fn get(&self, name: &str) -> Option<&Cache> {
        self.caches
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, cache)| cache)
    }

    pub fn keys(&self) -> Vec<String> {
        self.caches.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn delete(&mut self, name: &str) -> bool {
        let before = self.caches.len();
        self.caches.retain(|(existing, _)| existing != name);
        self.caches.len() != before
    }

    pub fn lookup(&self, url: &str) -> Option<&Response> {
        self.caches.iter().find_map(|(_, cache)| cache.get(url))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installed,
    Activated,
}

#[derive(Debug, Clone)]
pub struct CacheWorker {
    pub caches: CacheStorage,
    state: WorkerState,
    skip_waiting: bool,
    controls_clients: bool,
}

impl CacheWorker {
    /// A fresh worker sharing the origin's existing caches.
    pub fn new(caches: CacheStorage) -> Self {
        Self {
            caches,
            state: WorkerState::Parsed,
            skip_waiting: false,
            controls_clients: false,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn skips_waiting(&self) -> bool {
        self.skip_waiting
    }

    pub fn controls_clients(&self) -> bool {
        self.controls_clients
    }

    /// Precaches every shell asset. Any failed or non-OK fetch fails the
    /// install and leaves the static cache untouched.
    pub async fn install<N: Network>(&mut self, network: &N) -> Result<(), OfflineError> {
        let mut fetched = Vec::with_capacity(SHELL_ASSETS.len());
        for url in SHELL_ASSETS {
            let response = network.fetch(&Request::get(*url)).await?;
            if !response.is_ok() {
                return Err(OfflineError::BadStatus {
                    url: url.to_string(),
                    status: response.status,
                });
            }
            fetched.push((url.to_string(), response));
        }

        let cache = self.caches.open(&static_cache_name());
        for (url, response) in fetched {
            cache.put(url, response);
        }
        self.state = WorkerState::Installed;
        self.skip_waiting = true;
        info!(version = CACHE_VERSION, assets = SHELL_ASSETS.len(), "shell precached");
        Ok(())
    }

    /// Drops every cache from other versions and takes control of open pages.
    /// Returns the purged cache names.
    pub async fn activate(&mut self) -> Vec<String> {
        let current = [static_cache_name(), runtime_cache_name()];
        let mut purged = Vec::new();
        for name in self.caches.keys() {
            if !current.contains(&name) {
                info!("purging outdated cache {name}");
                self.caches.delete(&name);
                purged.push(name);
            }
        }
        self.state = WorkerState::Activated;
        self.controls_clients = true;
        purged
    }

    /// Navigations go to the network and fall back to the cached shell.
    /// Static assets are cache first, then network with runtime caching.
    /// `None` means the request is not answered by the worker.
    pub async fn fetch<N: Network>(&mut self, network: &N, request: &Request) -> Option<Response> {
        if request.method != Method::Get {
            return None;
        }

        if request.mode == RequestMode::Navigate {
            return match network.fetch(request).await {
                Ok(response) => Some(response),
                Err(err) => {
                    warn!(url = %request.url, "navigation failed, serving shell: {err}");
                    self.caches.lookup(SHELL_PAGE).cloned()
                }
            };
        }

        if !is_static_asset(&request.url) {
            return None;
        }

        if let Some(cached) = self.caches.lookup(&request.url) {
            debug!(url = %request.url, "served from cache");
            return Some(cached.clone());
        }

        match network.fetch(request).await {
            Ok(response) => {
                if response.status == 200 && response.kind == ResponseKind::Basic {
                    self.caches
                        .open(&runtime_cache_name())
                        .put(request.url.clone(), response.clone());
                }
                Some(response)
            }
            Err(err) => {
                warn!(url = %request.url, "network fetch failed: {err}");
                None
            }
        }
    }
}

/// The worker script served at `/service-worker.js`.
pub fn render_worker_script() -> String {
    let assets = SHELL_ASSETS
        .iter()
        .map(|asset| format!("  '{asset}'"))
        .collect::<Vec<_>>()
        .join(",\n");
    WORKER_JS
        .replace("{{STATIC_CACHE}}", &static_cache_name())
        .replace("{{RUNTIME_CACHE}}", &runtime_cache_name())
        .replace("{{SHELL_PAGE}}", SHELL_PAGE)
        .replace("{{STATIC_EXTENSIONS}}", &STATIC_EXTENSIONS.join("|"))
        .replace("{{ASSETS}}", &assets)
}

const WORKER_JS: &str = r#"const CACHE_NAME = '{{STATIC_CACHE}}';
const RUNTIME_CACHE = '{{RUNTIME_CACHE}}';
const SHELL_ASSETS = [
{{ASSETS}}
];

self.addEventListener('install', (event) => {
  event.waitUntil(
    caches.open(CACHE_NAME)
      .then((cache) => cache.addAll(SHELL_ASSETS))
      .then(() => self.skipWaiting())
  );
});

self.addEventListener('activate', (event) => {
  const current = [CACHE_NAME, RUNTIME_CACHE];
  event.waitUntil(
    caches.keys()
      .then((names) => Promise.all(
        names.filter((name) => !current.includes(name)).map((name) => caches.delete(name))
      ))
      .then(() => self.clients.claim())
  );
});

const STATIC_FILE = /\.({{STATIC_EXTENSIONS}})$/;

function isStaticAsset(url) {
  return !url.pathname.startsWith('/api/') && STATIC_FILE.test(url.pathname);
}

self.addEventListener('fetch', (event) => {
  const request = event.request;
  if (request.method !== 'GET') return;

  if (request.mode === 'navigate') {
    event.respondWith(
      fetch(request).catch(() => caches.match('{{SHELL_PAGE}}'))
    );
    return;
  }

  if (!isStaticAsset(new URL(request.url))) return;

  event.respondWith(
    caches.match(request).then((cached) => {
      if (cached) return cached;
      return fetch(request).then((response) => {
        if (response && response.status === 200 && response.type === 'basic') {
          const copy = response.clone();
          caches.open(RUNTIME_CACHE).then((cache) => cache.put(request, copy));
        }
        return response;
      });
    })
  );
});
"#;
