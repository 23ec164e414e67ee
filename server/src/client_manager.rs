//! Transport-side connection tracking for the session server
//!
//! This module maps datagram source addresses to the opaque connection
//! identifiers the match controller works with, including:
//! - Identifier assignment for new connections
//! - Address lookup in both directions for routing packets
//! - Activity tracking and inactivity timeouts
//!
//! Only connections that hold a slot stay in the table. A rejected join is
//! answered and then forgotten, so the table never grows past two entries.
//! Silent connections stay mapped until the event loop expires them, so an
//! address can never be seated twice.

use crate::session::ConnectionId;
use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A connected client as seen by the transport
#[derive(Debug)]
pub struct Client {
    /// Identifier assigned by the server
    pub id: ConnectionId,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
}

impl Client {
    pub fn new(id: ConnectionId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
        }
    }

    /// Checks if the client has exceeded the connection timeout
    ///
    /// Returns true if nothing has been received from this client within
    /// the given duration, indicating a likely disconnect.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Address book of all tracked connections
pub struct ClientManager {
    /// Tracked clients indexed by their identifier
    clients: HashMap<ConnectionId, Client>,
    /// Next identifier for a new connection
    next_client_id: ConnectionId,
    /// Silence after which a client is considered gone
    timeout: Duration,
}

impl ClientManager {
    /// Creates an empty table. Identifiers start from 1.
    pub fn new(timeout: Duration) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            timeout,
        }
    }

    /// Returns the identifier for `addr`, registering it if unknown.
    ///
    /// The boolean is true when a new entry was created.
    pub fn get_or_insert(&mut self, addr: SocketAddr) -> (ConnectionId, bool) {
        if let Some(id) = self.touch(addr) {
            return (id, false);
        }

        let id = self.next_client_id;
        self.next_client_id += 1;
        info!("Connection {} opened from {}", id, addr);
        self.clients.insert(id, Client::new(id, addr));
        (id, true)
    }

    /// Removes a client. Returns true if it was tracked.
    pub fn remove_client(&mut self, client_id: ConnectionId) -> bool {
        if let Some(client) = self.clients.remove(&client_id) {
            info!("Connection {} from {} closed", client.id, client.addr);
            true
        } else {
            false
        }
    }

    pub fn addr_of(&self, client_id: ConnectionId) -> Option<SocketAddr> {
        self.clients.get(&client_id).map(|client| client.addr)
    }

    /// Records activity for the client at `addr`
    pub fn touch(&mut self, addr: SocketAddr) -> Option<ConnectionId> {
        let client = self.clients.values_mut().find(|client| client.addr == addr)?;
        client.last_seen = Instant::now();
        Some(client.id)
    }

    /// Returns the identifiers of clients that went silent
    ///
    /// Nothing is removed here. The event loop calls [`expire`] for each
    /// identifier, so the address stays mapped to its seat until the match
    /// has processed the leave.
    ///
    /// [`expire`]: ClientManager::expire
    pub fn check_timeouts(&self) -> Vec<ConnectionId> {
        self.clients
            .values()
            .filter(|client| client.is_timed_out(self.timeout))
            .map(|client| client.id)
            .collect()
    }

    /// Removes a client if it is still timed out. Returns false if it was
    /// already gone or has sent something since it was reported.
    pub fn expire(&mut self, client_id: ConnectionId) -> bool {
        let still_silent = self
            .clients
            .get(&client_id)
            .is_some_and(|client| client.is_timed_out(self.timeout));

        still_silent && self.remove_client(client_id)
    }

    /// Returns the number of tracked clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    #[test]
    fn test_get_or_insert_assigns_increasing_ids() {
        let mut manager = ClientManager::new(Duration::from_secs(5));

        assert_eq!(manager.get_or_insert(test_addr()), (1, true));
        assert_eq!(manager.get_or_insert(test_addr2()), (2, true));
        assert_eq!(manager.get_or_insert(test_addr()), (1, false));
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut manager = ClientManager::new(Duration::from_secs(5));
        let (id, _) = manager.get_or_insert(test_addr());
        assert!(manager.remove_client(id));

        let (id2, created) = manager.get_or_insert(test_addr());
        assert!(created);
        assert_ne!(id, id2);
    }

    #[test]
    fn test_remove_nonexistent_client() {
        let mut manager = ClientManager::new(Duration::from_secs(5));
        assert!(!manager.remove_client(999));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_lookup_both_directions() {
        let mut manager = ClientManager::new(Duration::from_secs(5));
        let (id, _) = manager.get_or_insert(test_addr());

        assert_eq!(manager.touch(test_addr()), Some(id));
        assert_eq!(manager.addr_of(id), Some(test_addr()));
        assert_eq!(manager.touch(test_addr2()), None);
        assert_eq!(manager.addr_of(42), None);
    }

    #[test]
    fn test_client_timeout() {
        let mut client = Client::new(1, test_addr());
        assert!(!client.is_timed_out(Duration::from_secs(1)));

        client.last_seen = Instant::now() - Duration::from_secs(2);
        assert!(client.is_timed_out(Duration::from_secs(1)));
    }

    fn age(manager: &mut ClientManager, id: ConnectionId, by: Duration) {
        if let Some(client) = manager.clients.get_mut(&id) {
            client.last_seen = Instant::now() - by;
        }
    }

    #[test]
    fn test_check_timeouts_reports_without_removing() {
        let mut manager = ClientManager::new(Duration::from_secs(1));
        let (stale, _) = manager.get_or_insert(test_addr());
        let (fresh, _) = manager.get_or_insert(test_addr2());
        age(&mut manager, stale, Duration::from_secs(3));

        assert_eq!(manager.check_timeouts(), vec![stale]);
        assert_eq!(manager.len(), 2);

        assert!(manager.expire(stale));
        assert!(!manager.expire(fresh));
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.touch(test_addr2()), Some(fresh));
        assert_eq!(manager.touch(test_addr()), None);
    }

    #[test]
    fn test_client_heard_from_after_report_is_not_expired() {
        let mut manager = ClientManager::new(Duration::from_secs(1));
        let (id, _) = manager.get_or_insert(test_addr());
        age(&mut manager, id, Duration::from_secs(3));
        assert_eq!(manager.check_timeouts(), vec![id]);

        // A rejoin from the same address arrives before the report is handled
        assert_eq!(manager.get_or_insert(test_addr()), (id, false));

        assert!(!manager.expire(id));
        assert_eq!(manager.addr_of(id), Some(test_addr()));
    }

    #[test]
    fn test_expire_unknown_client() {
        let mut manager = ClientManager::new(Duration::from_secs(1));
        assert!(!manager.expire(7));
    }
}
