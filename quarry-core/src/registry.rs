//! Registry of named connections

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::config::PoolSettings;
use crate::conn::Conn;
use crate::dialect::{dialect_for_url, Dialect};
use crate::executor::any::AnyExecutor;
use crate::{Error, Result};

/// Named connections, built by the application and handed to whatever
/// needs a database.
///
/// Registration is serialized by an internal lock and a name can only be
/// registered once.
#[derive(Debug)]
pub struct Registry<E> {
    conns: Mutex<HashMap<String, Arc<Conn<E>>>>,
}

impl<E> Default for Registry<E> {
    fn default() -> Self {
        Self {
            conns: Mutex::new(HashMap::new()),
        }
    }
}

impl<E> Registry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection under its own name
    pub fn register(&self, conn: Conn<E>) -> Result<Arc<Conn<E>>> {
        let mut conns = self.conns.lock();
        if conns.contains_key(conn.name()) {
            return Err(Error::duplicate_connection(conn.name()));
        }
        let name = conn.name().to_string();
        let conn = Arc::new(conn);
        conns.insert(name.clone(), Arc::clone(&conn));
        info!(name = %name, dialect = conn.dialect().name(), "registered connection");
        Ok(conn)
    }

    /// Look up a connection, failing when the name is unknown
    pub fn open(&self, name: &str) -> Result<Arc<Conn<E>>> {
        self.get(name).ok_or_else(|| Error::unknown_connection(name))
    }

    pub fn get(&self, name: &str) -> Option<Arc<Conn<E>>> {
        self.conns.lock().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.conns.lock().contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.conns.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.conns.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.conns.lock().is_empty()
    }
}

impl Registry<AnyExecutor> {
    /// Open a pool for `url` and register it as `name`.
    ///
    /// The dialect follows the URL scheme. A taken name is rejected
    /// before any connection is attempted.
    pub async fn connect(
        &self,
        name: &str,
        url: &str,
        settings: &PoolSettings,
    ) -> Result<Arc<Conn<AnyExecutor>>> {
        if self.contains(name) {
            return Err(Error::duplicate_connection(name));
        }
        let dialect = dialect_for_url(url)?;
        let executor = AnyExecutor::connect(url, settings).await?;
        self.register_pool(name, dialect, executor).await
    }

    /// Register an opened pool. When another caller took the name while the
    /// pool was connecting, the pool is closed before the error is returned.
    async fn register_pool(
        &self,
        name: &str,
        dialect: Arc<dyn Dialect>,
        executor: AnyExecutor,
    ) -> Result<Arc<Conn<AnyExecutor>>> {
        let pool = executor.clone();
        match self.register(Conn::new(name, dialect, executor)) {
            Err(err @ Error::DuplicateConnection { .. }) => {
                warn!(name = %name, "connection name taken while connecting, closing pool");
                pool.close().await;
                Err(err)
            }
            other => other,
        }
    }
}
