//! In-memory static shell cache.
//!
//! Shells are built once per route and served until they expire or a data
//! dependency they declare is invalidated.
//!
//! # Examples
//!
//! ```ignore
//! use reinhardt_ppr_shell::{ShellCache, ShellConfig};
//!
//! let cache = ShellCache::new().with_ttl(Duration::from_secs(300));
//! let shell = cache.get_or_build("/", &tree, &ShellConfig::default()).await?;
//!
//! // An order was placed: drop every shell whose boundaries read orders.
//! cache.invalidate_dependency("orders").await;
//! ```

use crate::builder::{ShellConfig, render_to_static_shell};
use crate::shell::StaticShell;
use reinhardt_ppr_core::{Node, PprResult, PprSettings};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Shell cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStatistics {
	/// Number of cache hits
	pub hits: u64,
	/// Number of cache misses
	pub misses: u64,
	/// Total number of lookups
	pub total_requests: u64,
	/// Current number of cached shells
	pub entry_count: u64,
}

impl CacheStatistics {
	/// Calculate hit rate (0.0 to 1.0)
	pub fn hit_rate(&self) -> f64 {
		if self.total_requests == 0 {
			0.0
		} else {
			self.hits as f64 / self.total_requests as f64
		}
	}

	/// Calculate miss rate (0.0 to 1.0)
	pub fn miss_rate(&self) -> f64 {
		if self.total_requests == 0 {
			0.0
		} else {
			self.misses as f64 / self.total_requests as f64
		}
	}
}

#[derive(Debug)]
struct CachedShell {
	shell: Arc<StaticShell>,
	inserted_at: Instant,
}

impl CachedShell {
	fn is_expired(&self, ttl: Option<Duration>) -> bool {
		ttl.is_some_and(|ttl| self.inserted_at.elapsed() >= ttl)
	}
}

/// Route path to shell map with optional expiry.
#[derive(Debug, Clone, Default)]
pub struct ShellCache {
	entries: Arc<RwLock<HashMap<String, CachedShell>>>,
	ttl: Option<Duration>,
	hits: Arc<AtomicU64>,
	misses: Arc<AtomicU64>,
}

impl ShellCache {
	/// Creates an empty cache whose entries never expire.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the entry lifetime.
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = Some(ttl);
		self
	}

	/// Creates a cache configured from settings.
	pub fn from_settings(settings: &PprSettings) -> Self {
		Self {
			ttl: settings.shell_ttl(),
			..Self::default()
		}
	}

	/// Returns the shell for `path` unless it is missing or expired.
	///
	/// Lookups share a read lock. Only an expired entry takes the write lock,
	/// to remove it.
	pub async fn get(&self, path: &str) -> Option<Arc<StaticShell>> {
		let expired = {
			let entries = self.entries.read().await;
			match entries.get(path) {
				Some(entry) if !entry.is_expired(self.ttl) => {
					self.hits.fetch_add(1, Ordering::Relaxed);
					return Some(Arc::clone(&entry.shell));
				}
				Some(_) => true,
				None => false,
			}
		};

		if expired {
			let mut entries = self.entries.write().await;
			// A fresh shell may have been inserted while the lock was released.
			if entries.get(path).is_some_and(|entry| entry.is_expired(self.ttl)) {
				entries.remove(path);
				tracing::debug!(path, "shell expired");
			}
		}

		self.misses.fetch_add(1, Ordering::Relaxed);
		None
	}

	/// Stores `shell` under its path, replacing any previous shell.
	pub async fn insert(&self, shell: StaticShell) -> Arc<StaticShell> {
		let shell = Arc::new(shell);
		let mut entries = self.entries.write().await;
		entries.insert(
			shell.path.clone(),
			CachedShell {
				shell: Arc::clone(&shell),
				inserted_at: Instant::now(),
			},
		);
		shell
	}

	/// Returns the cached shell for `path`, building it from `root` on a miss.
	pub async fn get_or_build(
		&self,
		path: &str,
		root: &Node,
		config: &ShellConfig,
	) -> PprResult<Arc<StaticShell>> {
		if let Some(shell) = self.get(path).await {
			return Ok(shell);
		}
		let shell = render_to_static_shell(root, path, config).await?;
		Ok(self.insert(shell).await)
	}

	/// Drops the shell for `path`. Returns `true` if one was cached.
	pub async fn invalidate(&self, path: &str) -> bool {
		let removed = self.entries.write().await.remove(path).is_some();
		if removed {
			tracing::info!(path, "invalidated static shell");
		}
		removed
	}

	/// Drops every shell with a boundary that depends on `dependency`.
	///
	/// Returns the number of shells removed.
	pub async fn invalidate_dependency(&self, dependency: &str) -> usize {
		let mut entries = self.entries.write().await;
		let before = entries.len();
		entries.retain(|_, entry| !entry.shell.depends_on(dependency));
		let removed = before - entries.len();
		if removed > 0 {
			tracing::info!(dependency, removed, "invalidated static shells by data dependency");
		}
		removed
	}

	/// Removes all shells.
	pub async fn clear(&self) {
		self.entries.write().await.clear();
	}

	/// Returns the number of cached shells, including expired ones.
	pub async fn len(&self) -> usize {
		self.entries.read().await.len()
	}

	/// Returns `true` if nothing is cached.
	pub async fn is_empty(&self) -> bool {
		self.entries.read().await.is_empty()
	}

	/// Returns hit and miss counters.
	pub async fn statistics(&self) -> CacheStatistics {
		let hits = self.hits.load(Ordering::Relaxed);
		let misses = self.misses.load(Ordering::Relaxed);
		CacheStatistics {
			hits,
			misses,
			total_requests: hits + misses,
			entry_count: self.len().await as u64,
		}
	}
}
