//! Per-connection object store
//!
//! Every connection owns one map, split into the two allocator-owned id
//! ranges of the protocol: clients allocate 1..=0xFEFFFFFF, servers
//! allocate from 0xFF000000 up. Id 0 is the null reference and is never
//! stored. Ids are dense within their range, so each range is a slot
//! vector; freed slots are remembered on a free list and handed out again
//! only once the peer has acknowledged the destruction (which is the
//! caller's business, not the map's).

use crate::protocol::Interface;

/// First object id of the server-allocated range
pub const SERVER_ID_LIMIT: u32 = 0xFF00_0000;
/// Last object id of the client-allocated range
pub const CLIENT_ID_LIMIT: u32 = 0xFEFF_FFFF;

/// The record stored for one protocol object
#[derive(Debug, Clone)]
pub struct Object<Data> {
    /// Interface of this object
    pub interface: &'static Interface,
    /// Version this object was bound at
    pub version: u32,
    /// Data associated to this object (role state, handlers, ...)
    pub data: Data,
}

/// Error returned when an id range has no free slot left
#[derive(Clone, Debug)]
pub struct IdsExhausted;

impl std::error::Error for IdsExhausted {}

impl std::fmt::Display for IdsExhausted {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("the object id range is exhausted")
    }
}

// one contiguous id range with its slots and free list
#[derive(Debug)]
struct Range<Data> {
    /// id of slot 0
    first: u32,
    /// highest id this range may ever hand out
    last: u32,
    slots: Vec<Option<Object<Data>>>,
    /// slot indices vacated by `vacate`, reused most-recent-first
    vacant: Vec<usize>,
}

impl<Data> Range<Data> {
    fn new(first: u32, last: u32) -> Self {
        Self { first, last, slots: Vec::new(), vacant: Vec::new() }
    }

    fn slot_of(&self, id: u32) -> Option<usize> {
        (self.first..=self.last)
            .contains(&id)
            .then(|| (id - self.first) as usize)
    }

    fn get(&self, id: u32) -> Option<&Object<Data>> {
        self.slots.get(self.slot_of(id)?)?.as_ref()
    }

    fn get_mut(&mut self, id: u32) -> Option<&mut Object<Data>> {
        let slot = self.slot_of(id)?;
        self.slots.get_mut(slot)?.as_mut()
    }

    fn vacate(&mut self, id: u32) {
        let Some(slot) = self.slot_of(id) else { return };
        if let Some(place) = self.slots.get_mut(slot) {
            if place.take().is_some() {
                self.vacant.push(slot);
            }
        }
    }

    // install at a peer-chosen id: legal only into a vacated slot or as a
    // direct append, anything else means the peer skipped ids
    fn claim_at(&mut self, id: u32, object: Object<Data>) -> Result<(), ()> {
        let slot = self.slot_of(id).ok_or(())?;
        if slot == self.slots.len() {
            self.slots.push(Some(object));
            return Ok(());
        }
        match self.slots.get_mut(slot) {
            Some(place) if place.is_none() => {
                *place = Some(object);
                self.vacant.retain(|&v| v != slot);
                Ok(())
            }
            _ => Err(()),
        }
    }

    // allocate a fresh id of our own: recycle the free list before growing
    fn claim_next(&mut self, object: Object<Data>) -> Result<u32, IdsExhausted> {
        if let Some(slot) = self.vacant.pop() {
            debug_assert!(self.slots[slot].is_none());
            self.slots[slot] = Some(object);
            return Ok(self.first + slot as u32);
        }
        let id = self
            .first
            .checked_add(self.slots.len() as u32)
            .filter(|id| *id <= self.last)
            .ok_or(IdsExhausted)?;
        self.slots.push(Some(object));
        Ok(id)
    }

    fn entries(&self) -> impl Iterator<Item = (u32, &Object<Data>)> {
        let first = self.first;
        self.slots
            .iter()
            .enumerate()
            .filter_map(move |(slot, place)| Some((first + slot as u32, place.as_ref()?)))
    }
}

/// The object store of one connection
#[derive(Debug)]
pub struct ObjectMap<Data> {
    client: Range<Data>,
    server: Range<Data>,
}

impl<Data> Default for ObjectMap<Data> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Data> ObjectMap<Data> {
    /// Create a new empty object map
    pub fn new() -> Self {
        Self {
            client: Range::new(1, CLIENT_ID_LIMIT),
            server: Range::new(SERVER_ID_LIMIT, u32::MAX),
        }
    }

    fn range(&self, id: u32) -> &Range<Data> {
        if id >= SERVER_ID_LIMIT {
            &self.server
        } else {
            &self.client
        }
    }

    fn range_mut(&mut self, id: u32) -> &mut Range<Data> {
        if id >= SERVER_ID_LIMIT {
            &mut self.server
        } else {
            &mut self.client
        }
    }

    /// Find an object in the store
    pub fn find(&self, id: u32) -> Option<Object<Data>>
    where
        Data: Clone,
    {
        self.range(id).get(id).cloned()
    }

    /// Remove an object from the store
    ///
    /// Does nothing if the object didn't previously exist
    pub fn remove(&mut self, id: u32) {
        self.range_mut(id).vacate(id);
    }

    /// Insert an object at a peer-chosen id
    ///
    /// Fails if the id is null, already taken, or would leave a gap in its
    /// range; all three are protocol errors on the peer's side.
    pub fn insert_at(&mut self, id: u32, object: Object<Data>) -> Result<(), ()> {
        self.range_mut(id).claim_at(id, object)
    }

    /// Allocate a new id for an object in the client namespace
    pub fn client_insert_new(&mut self, object: Object<Data>) -> Result<u32, IdsExhausted> {
        self.client.claim_next(object)
    }

    /// Allocate a new id for an object in the server namespace
    pub fn server_insert_new(&mut self, object: Object<Data>) -> Result<u32, IdsExhausted> {
        self.server.claim_next(object)
    }

    /// Run a closure on the object with the given id, mutably
    pub fn with<T, F: FnOnce(&mut Object<Data>) -> T>(&mut self, id: u32, f: F) -> Result<T, ()> {
        match self.range_mut(id).get_mut(id) {
            Some(object) => Ok(f(object)),
            None => Err(()),
        }
    }

    /// Iterate over all live objects with their ids
    pub fn all_objects(&self) -> impl Iterator<Item = (u32, &Object<Data>)> {
        self.client.entries().chain(self.server.entries())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_interfaces::WL_DISPLAY_INTERFACE;

    fn obj() -> Object<u32> {
        Object { interface: &WL_DISPLAY_INTERFACE, version: 1, data: 0 }
    }

    #[test]
    fn id_ranges() {
        let mut map = ObjectMap::new();
        map.insert_at(1, obj()).unwrap();
        // the next client id after the display is 2
        assert_eq!(map.client_insert_new(obj()).unwrap(), 2);
        assert_eq!(map.client_insert_new(obj()).unwrap(), 3);
        // server-range ids start at the limit
        assert_eq!(map.server_insert_new(obj()).unwrap(), SERVER_ID_LIMIT);
        assert_eq!(map.server_insert_new(obj()).unwrap(), SERVER_ID_LIMIT + 1);
        // id 0 is never valid
        assert!(map.find(0).is_none());
        assert!(map.insert_at(0, obj()).is_err());
    }

    #[test]
    fn reuse_after_remove() {
        let mut map = ObjectMap::new();
        map.insert_at(1, obj()).unwrap();
        let id = map.client_insert_new(obj()).unwrap();
        map.remove(id);
        assert!(map.find(id).is_none());
        assert_eq!(map.client_insert_new(obj()).unwrap(), id);
    }

    #[test]
    fn insert_at_must_be_next_free() {
        let mut map = ObjectMap::new();
        map.insert_at(1, obj()).unwrap();
        // a gap is a protocol error
        assert!(map.insert_at(5, obj()).is_err());
        map.insert_at(2, obj()).unwrap();
        // duplicate is rejected too
        assert!(map.insert_at(2, obj()).is_err());
    }

    #[test]
    fn free_list_survives_peer_reuse() {
        let mut map = ObjectMap::new();
        map.insert_at(1, obj()).unwrap();
        let a = map.client_insert_new(obj()).unwrap();
        let b = map.client_insert_new(obj()).unwrap();
        map.remove(a);
        map.remove(b);
        // the peer reclaims one of the two vacated ids itself
        map.insert_at(b, obj()).unwrap();
        // our next allocation must not collide with it
        assert_eq!(map.client_insert_new(obj()).unwrap(), a);
        // removing a dead id twice must not corrupt the free list
        map.remove(a);
        map.remove(a);
        assert_eq!(map.client_insert_new(obj()).unwrap(), a);
        assert_eq!(map.client_insert_new(obj()).unwrap(), 4);
    }

    #[test]
    fn iteration_spans_both_ranges() {
        let mut map = ObjectMap::new();
        map.insert_at(1, obj()).unwrap();
        map.client_insert_new(obj()).unwrap();
        map.server_insert_new(obj()).unwrap();
        let ids: Vec<u32> = map.all_objects().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![1, 2, SERVER_ID_LIMIT]);
    }
}
