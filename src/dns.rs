//! Hostname resolution with a process-lifetime TTL cache.
//!
//! These tools get pointed at the same few hostnames over and over from
//! UI polling loops, so lookups are cached for five minutes. The cache is
//! explicit owned state (no globals); entries are replaced whole, never
//! mutated in place, so a concurrent reader can never see a torn entry.

use crate::errors::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use trust_dns_resolver::TokioAsyncResolver;

/// How long a cached resolution stays valid.
pub const DNS_TTL: Duration = Duration::from_secs(5 * 60);

/// Bare lookup capability. The production implementation asks the system
/// resolver; tests substitute canned or counting resolvers.
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn lookup(&self, host: &str) -> Result<Ipv4Addr>;
}

/// System resolver via trust-dns. IPv4 only: the servers this crate talks
/// to predate IPv6 support entirely.
pub struct TrustDnsResolve {
    inner: TokioAsyncResolver,
}

impl TrustDnsResolve {
    pub fn from_system_conf() -> Result<Self> {
        let inner = TokioAsyncResolver::tokio_from_system_conf().map_err(|_| Error::Resolution)?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl Resolve for TrustDnsResolve {
    async fn lookup(&self, host: &str) -> Result<Ipv4Addr> {
        let lookup = self
            .inner
            .lookup_ip(host)
            .await
            .map_err(|_| Error::Resolution)?;
        lookup
            .iter()
            .find_map(|addr| match addr {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
            .ok_or(Error::Resolution)
    }
}

#[derive(Clone, Copy)]
struct CacheEntry {
    ip: Ipv4Addr,
    recorded_at: Instant,
}

/// TTL-caching wrapper around a [`Resolve`] implementation. Shared across
/// calls; the mutex only guards map access, never a lookup in flight.
pub struct CachingResolver {
    inner: Arc<dyn Resolve>,
    cache: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl CachingResolver {
    pub fn new(inner: Arc<dyn Resolve>) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
            ttl: DNS_TTL,
        }
    }

    /// Resolves `host` to an IPv4 address. IP literals pass straight
    /// through without touching the resolver or the cache. Entries older
    /// than the TTL are treated as absent and re-resolved; failed lookups
    /// are never cached.
    pub async fn resolve(&self, host: &str) -> Result<Ipv4Addr> {
        if let Ok(ip) = host.parse::<Ipv4Addr>() {
            return Ok(ip);
        }

        let now = Instant::now();
        if let Some(entry) = self.cache.lock().expect("dns cache poisoned").get(host) {
            if now.duration_since(entry.recorded_at) < self.ttl {
                debug!("DNS cache hit for {}: {}", host, entry.ip);
                return Ok(entry.ip);
            }
        }

        let ip = self.inner.lookup(host).await?;
        debug!("Resolved {} to {}", host, ip);
        self.cache.lock().expect("dns cache poisoned").insert(
            host.to_string(),
            CacheEntry {
                ip,
                recorded_at: now,
            },
        );
        Ok(ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingResolve {
        hits: AtomicUsize,
        answer: Result<Ipv4Addr>,
    }

    impl CountingResolve {
        fn answering(ip: Ipv4Addr) -> Arc<Self> {
            Arc::new(Self {
                hits: AtomicUsize::new(0),
                answer: Ok(ip),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                hits: AtomicUsize::new(0),
                answer: Err(Error::Resolution),
            })
        }

        fn count(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Resolve for CountingResolve {
        async fn lookup(&self, _host: &str) -> Result<Ipv4Addr> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn second_resolution_within_ttl_is_cached() {
        let counter = CountingResolve::answering(Ipv4Addr::new(10, 0, 0, 1));
        let resolver = CachingResolver::new(counter.clone());

        let first = resolver.resolve("game.example.com").await.unwrap();
        let second = resolver.resolve("game.example.com").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(counter.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_re_resolved() {
        let counter = CountingResolve::answering(Ipv4Addr::new(10, 0, 0, 2));
        let resolver = CachingResolver::new(counter.clone());

        resolver.resolve("game.example.com").await.unwrap();
        tokio::time::advance(DNS_TTL + Duration::from_secs(1)).await;
        resolver.resolve("game.example.com").await.unwrap();
        assert_eq!(counter.count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn entry_just_inside_ttl_still_counts() {
        let counter = CountingResolve::answering(Ipv4Addr::new(10, 0, 0, 3));
        let resolver = CachingResolver::new(counter.clone());

        resolver.resolve("game.example.com").await.unwrap();
        tokio::time::advance(DNS_TTL - Duration::from_secs(1)).await;
        resolver.resolve("game.example.com").await.unwrap();
        assert_eq!(counter.count(), 1);
    }

    #[tokio::test]
    async fn ip_literal_bypasses_lookup() {
        let counter = CountingResolve::answering(Ipv4Addr::new(10, 0, 0, 4));
        let resolver = CachingResolver::new(counter.clone());

        let ip = resolver.resolve("192.168.1.50").await.unwrap();
        assert_eq!(ip, Ipv4Addr::new(192, 168, 1, 50));
        assert_eq!(counter.count(), 0);
    }

    #[tokio::test]
    async fn failed_lookup_is_not_cached() {
        let counter = CountingResolve::failing();
        let resolver = CachingResolver::new(counter.clone());

        assert_eq!(
            resolver.resolve("down.example.com").await,
            Err(Error::Resolution)
        );
        assert_eq!(
            resolver.resolve("down.example.com").await,
            Err(Error::Resolution)
        );
        assert_eq!(counter.count(), 2);
    }

    #[tokio::test]
    async fn hostnames_are_cached_independently() {
        let counter = CountingResolve::answering(Ipv4Addr::new(10, 0, 0, 5));
        let resolver = CachingResolver::new(counter.clone());

        resolver.resolve("a.example.com").await.unwrap();
        resolver.resolve("b.example.com").await.unwrap();
        resolver.resolve("a.example.com").await.unwrap();
        assert_eq!(counter.count(), 2);
    }
}
