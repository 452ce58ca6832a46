//! The probing engine behind [`HashMap`](crate::HashMap) and
//! [`HashSet`](crate::HashSet).
//!
//! `HashTable<V>` is an open-addressing table using Robin Hood linear
//! probing. Each value sits as close as possible to its *ideal* slot, the top
//! bits of its mixed hash. When two values compete for a slot, the one that
//! is further from home keeps it. Lookups can therefore stop as soon as they
//! meet a value that is closer to its own home than the search key would be,
//! and removals close the gap by shifting the following run back by one slot
//! instead of leaving tombstones.

use alloc::alloc::handle_alloc_error;
use alloc::vec::Vec;
use core::alloc::Layout;
use core::fmt::Debug;
use core::iter::FusedIterator;
use core::mem;

use crate::error::Error;
use crate::hash::table_hash;

/// Slot count of the first allocation.
const MIN_BUCKETS: usize = 16;

/// Number of values a table with `mask + 1` slots holds before it doubles.
///
/// This is `7/8` of the slot count, rounded so that at least two slots always
/// stay empty.
#[inline(always)]
fn resize_trigger(mask: usize) -> usize {
    mask ^ (mask >> 3)
}

#[inline(always)]
fn ideal_index(hash: u64, shift: u32) -> usize {
    (hash >> shift) as usize
}

/// Circular distance from `hash`'s ideal slot to `index`.
#[inline(always)]
fn displacement(hash: u64, index: usize, shift: u32, mask: usize) -> usize {
    index.wrapping_sub(ideal_index(hash, shift)) & mask
}

/// Smallest slot count whose resize trigger admits `required` values.
fn buckets_for(required: usize) -> Result<usize, Error> {
    let mut buckets = MIN_BUCKETS;
    while resize_trigger(buckets - 1) < required {
        buckets = buckets.checked_mul(2).ok_or(Error::CapacityOverflow)?;
    }
    Ok(buckets)
}

fn allocate_slots<V>(buckets: usize) -> Result<Vec<Slot<V>>, Error> {
    Layout::array::<Slot<V>>(buckets).map_err(|_| Error::CapacityOverflow)?;

    let mut slots = Vec::new();
    slots
        .try_reserve_exact(buckets)
        .map_err(|_| Error::AllocationFailure { slots: buckets })?;
    slots.resize_with(buckets, || Slot::Empty);
    Ok(slots)
}

#[cold]
#[inline(never)]
fn allocation_failed<V>(err: Error) -> ! {
    if let Error::AllocationFailure { slots } = err {
        if let Ok(layout) = Layout::array::<Slot<V>>(slots) {
            handle_alloc_error(layout);
        }
    }
    panic!("{err}");
}

/// A single storage cell.
///
/// An occupied slot caches the (mixed, odd) hash of its value, so probing,
/// displacement checks and resizing never call back into user hashing.
#[derive(Clone)]
enum Slot<V> {
    Empty,
    Occupied { hash: u64, value: V },
}

impl<V> Slot<V> {
    /// Cached hash, or `0` when empty.
    #[inline(always)]
    fn hash(&self) -> u64 {
        match self {
            Slot::Empty => 0,
            Slot::Occupied { hash, .. } => *hash,
        }
    }

    #[inline(always)]
    fn is_empty(&self) -> bool {
        self.hash() == 0
    }

    #[inline(always)]
    fn take(&mut self) -> Option<(u64, V)> {
        match mem::replace(self, Slot::Empty) {
            Slot::Empty => None,
            Slot::Occupied { hash, value } => Some((hash, value)),
        }
    }

    #[inline(always)]
    fn value(&self) -> Option<&V> {
        match self {
            Slot::Empty => None,
            Slot::Occupied { value, .. } => Some(value),
        }
    }

    #[inline(always)]
    fn value_mut(&mut self) -> Option<&mut V> {
        match self {
            Slot::Empty => None,
            Slot::Occupied { value, .. } => Some(value),
        }
    }

    /// Occupies an empty slot and returns the stored value.
    #[inline(always)]
    fn fill(&mut self, hash: u64, value: V) -> &mut V {
        debug_assert!(self.is_empty());
        *self = Slot::Occupied { hash, value };
        match self {
            Slot::Occupied { value, .. } => value,
            Slot::Empty => unreachable!("slot was just filled"),
        }
    }
}

/// Result of walking a probe sequence.
enum Probe {
    /// The value lives at `index`.
    Found { index: usize, distance: usize },
    /// The value is absent; it belongs at `index`, which is either empty or
    /// held by a value that must shift forward.
    Vacant { index: usize, distance: usize },
}

/// Debug statistics for hash table analysis.
///
/// Available in tests and with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of values currently in the table
    pub populated: usize,
    /// Number of values the table holds before it doubles
    pub capacity: usize,
    /// Total number of slots allocated
    pub buckets: usize,
    /// Largest distance of any value from its ideal slot
    pub max_displacement: usize,
    /// Mean distance of the values from their ideal slots
    pub mean_displacement: f64,
    /// Load factor (populated / buckets)
    pub load_factor: f64,
    /// Total memory in bytes used by the slot array
    pub total_bytes: usize,
    /// Memory in bytes held by empty slots
    pub wasted_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} slots ({:.2}% load factor, grows at {})",
            self.populated,
            self.buckets,
            self.load_factor * 100.0,
            self.capacity
        );
        println!(
            "Displacement: max {}, mean {:.3}",
            self.max_displacement, self.mean_displacement
        );
        println!("Total Allocated: {} bytes", self.total_bytes);
        println!(
            "Memory: {} bytes wasted ({:.02}%)",
            self.wasted_bytes,
            if self.total_bytes == 0 {
                0.0
            } else {
                (self.wasted_bytes as f64 / self.total_bytes as f64) * 100.0
            }
        );
    }
}

/// A hash table using Robin Hood linear probing.
///
/// `HashTable<V>` stores values of type `V`. Like the raw tables of other
/// hashing crates it does not know how to hash or compare values itself: each
/// operation takes the value's hash and an equality predicate. Hashes are
/// mixed internally, so any well-distributed `u64` works, including the output
/// of weak hashers.
///
/// The slot array always has a power-of-two length. It is allocated at 16
/// slots by the first insertion and doubles whenever an insertion finds the
/// table 7/8 full. It never shrinks.
///
/// Any mutation may move values between slots, so references into the table
/// never outlive the next mutating call; the borrow checker enforces this.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use shift_hash::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # #[derive(Debug, PartialEq)]
/// # struct Material {
/// #     name: String,
/// #     roughness: f32,
/// # }
/// #
/// # fn hash_name(name: &str) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     name.hash(&mut hasher);
/// #     hasher.finish()
/// # }
///
/// let mut table = HashTable::new();
/// let hash = hash_name("brass");
///
/// match table.entry(hash, |m: &Material| m.name == "brass") {
///     shift_hash::hash_table::Entry::Vacant(entry) => {
///         entry.insert(Material {
///             name: "brass".to_string(),
///             roughness: 0.3,
///         });
///     }
///     shift_hash::hash_table::Entry::Occupied(_) => {
///         println!("Material already exists");
///     }
/// }
///
/// assert_eq!(table.find(hash, |m| m.name == "brass").map(|m| m.roughness), Some(0.3));
/// ```
#[derive(Clone)]
pub struct HashTable<V> {
    slots: Vec<Slot<V>>,
    capacity_mask: usize,
    /// `ideal_index = hash >> index_shift`; 64 while unallocated.
    index_shift: u32,
    populated: usize,
    max_pop: usize,
}

impl<V> Debug for HashTable<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::format;
        use alloc::string::String;
        use alloc::string::ToString;

        if self.slots.is_empty() {
            return f
                .debug_struct("HashTable")
                .field("slots", &"unallocated")
                .field("populated", &self.populated)
                .field("capacity", &self.max_pop)
                .finish();
        }

        // One row per 16 slots; each cell is the occupant's displacement.
        let rows = self
            .slots
            .chunks(16)
            .enumerate()
            .map(|(row, chunk)| {
                chunk
                    .iter()
                    .enumerate()
                    .map(|(col, slot)| match slot {
                        Slot::Empty => "..".to_string(),
                        Slot::Occupied { hash, .. } => {
                            format!("{:02}", self.displacement(*hash, row * 16 + col))
                        }
                    })
                    .collect::<Vec<String>>()
                    .join(", ")
            })
            .collect::<Vec<String>>();

        f.debug_struct("HashTable")
            .field("displacements", &rows)
            .field("populated", &self.populated)
            .field("capacity", &self.max_pop)
            .field("index_shift", &self.index_shift)
            .finish()
    }
}

impl<V> Default for HashTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> HashTable<V> {
    /// Creates an empty table. No memory is allocated until the first
    /// insertion.
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            capacity_mask: 0,
            index_shift: u64::BITS,
            populated: 0,
            max_pop: 0,
        }
    }

    /// Creates a table that can hold at least `capacity` values without
    /// resizing.
    ///
    /// Once the table holds exactly its [`capacity`](Self::capacity), the next
    /// insertion grows it, even when the key is already present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use shift_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert!(table.capacity() >= 100);
    /// assert_eq!(table.buckets(), 128);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        let mut table = Self::new();
        table.reserve(capacity);
        table
    }

    /// Returns `true` if the table contains no values.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the number of values in the table.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns the number of values the table can hold before its next
    /// resize.
    ///
    /// This is 7/8 of [`buckets`](Self::buckets) (14 for 16 slots, 28 for 32
    /// and so on), or zero before the first allocation.
    pub fn capacity(&self) -> usize {
        self.max_pop
    }

    /// Returns the number of slots in the backing array. Always zero or a
    /// power of two no smaller than 16.
    pub fn buckets(&self) -> usize {
        self.slots.len()
    }

    /// Removes all values, keeping the allocated slots.
    pub fn clear(&mut self) {
        if self.populated == 0 {
            return;
        }
        for slot in self.slots.iter_mut() {
            *slot = Slot::Empty;
        }
        self.populated = 0;
    }

    /// Reserves room for at least `additional` more values.
    ///
    /// # Panics
    ///
    /// Panics if the new slot count overflows `usize`. Allocation failure
    /// aborts through [`handle_alloc_error`].
    pub fn reserve(&mut self, additional: usize) {
        if let Err(err) = self.try_reserve(additional) {
            allocation_failed::<V>(err);
        }
    }

    /// Reserves room for at least `additional` more values, reporting
    /// allocation failure instead of aborting.
    ///
    /// On error the table is unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use shift_hash::Error;
    /// # use shift_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// table.try_reserve(10).unwrap();
    /// assert_eq!(table.buckets(), 16);
    ///
    /// assert_eq!(table.try_reserve(usize::MAX), Err(Error::CapacityOverflow));
    /// assert_eq!(table.buckets(), 16);
    /// ```
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), Error> {
        let required = self
            .populated
            .checked_add(additional)
            .ok_or(Error::CapacityOverflow)?;
        if required == 0 || required <= self.max_pop {
            return Ok(());
        }
        let buckets = buckets_for(required)?;
        self.resize(buckets)
    }

    #[inline]
    fn ideal_index(&self, hash: u64) -> usize {
        ideal_index(hash, self.index_shift)
    }

    #[inline]
    fn displacement(&self, hash: u64, index: usize) -> usize {
        displacement(hash, index, self.index_shift, self.capacity_mask)
    }

    #[inline(always)]
    fn next_index(&self, index: usize) -> usize {
        (index + 1) & self.capacity_mask
    }

    /// Walks the probe sequence of `hash` (already mixed).
    ///
    /// Requires an allocated table.
    fn probe(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Probe {
        debug_assert!(!self.slots.is_empty());
        debug_assert!(hash & 1 == 1);

        let mut index = self.ideal_index(hash);
        let mut distance = 0;
        loop {
            match &self.slots[index] {
                Slot::Empty => return Probe::Vacant { index, distance },
                Slot::Occupied {
                    hash: occupant,
                    value,
                } => {
                    if *occupant == hash && eq(value) {
                        return Probe::Found { index, distance };
                    }
                    // Had the search key been inserted, it would have taken
                    // this slot from the richer occupant.
                    if distance > self.displacement(*occupant, index) {
                        return Probe::Vacant { index, distance };
                    }
                }
            }
            distance += 1;
            index = self.next_index(index);
        }
    }

    fn find_index(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<usize> {
        if self.populated == 0 {
            return None;
        }
        match self.probe(table_hash(hash), eq) {
            Probe::Found { index, .. } => Some(index),
            Probe::Vacant { .. } => None,
        }
    }

    /// Finds a value by hash and equality predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use shift_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     n.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(hash_u64(42), |&n: &u64| n == 42).or_insert(42);
    ///
    /// assert_eq!(table.find(hash_u64(42), |&n| n == 42), Some(&42));
    /// assert_eq!(table.find(hash_u64(99), |&n| n == 99), None);
    /// ```
    #[inline]
    pub fn find(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        let index = self.find_index(hash, eq)?;
        self.slots[index].value()
    }

    /// Finds a value by hash and equality predicate, returning a mutable
    /// reference.
    #[inline]
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        let index = self.find_index(hash, eq)?;
        self.slots[index].value_mut()
    }

    /// Removes and returns the value matching `hash` and `eq`.
    ///
    /// The run of displaced values following the removed one shifts back by
    /// one slot, so no tombstone is left behind.
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<V> {
        let index = self.find_index(hash, eq)?;
        Some(self.remove_at(index))
    }

    /// Gets the entry for `hash` and `eq`, growing the table first if it is at
    /// its resize trigger.
    ///
    /// The table may grow even when the value turns out to be present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use shift_hash::hash_table::Entry;
    /// # use shift_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_str(s: &str) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     s.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// let hash = hash_str("hello");
    ///
    /// match table.entry(hash, |s: &String| s == "hello") {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert("hello".to_string());
    ///     }
    ///     Entry::Occupied(_) => unreachable!(),
    /// }
    ///
    /// assert!(matches!(
    ///     table.entry(hash, |s: &String| s == "hello"),
    ///     Entry::Occupied(_)
    /// ));
    /// ```
    #[inline]
    pub fn entry(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Entry<'_, V> {
        if let Err(err) = self.grow_if_full() {
            allocation_failed::<V>(err);
        }
        self.entry_impl(table_hash(hash), eq)
    }

    /// Like [`entry`](Self::entry), but reports allocation failure instead
    /// of aborting. On error the table is unchanged.
    pub fn try_entry(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Result<Entry<'_, V>, Error> {
        self.grow_if_full()?;
        Ok(self.entry_impl(table_hash(hash), eq))
    }

    fn entry_impl(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Entry<'_, V> {
        match self.probe(hash, eq) {
            Probe::Found { index, .. } => Entry::Occupied(OccupiedEntry { table: self, index }),
            Probe::Vacant { index, .. } => Entry::Vacant(VacantEntry {
                table: self,
                hash,
                index,
            }),
        }
    }

    #[inline]
    fn grow_if_full(&mut self) -> Result<(), Error> {
        if self.populated == self.max_pop {
            return self.grow();
        }
        Ok(())
    }

    #[cold]
    #[inline(never)]
    fn grow(&mut self) -> Result<(), Error> {
        let buckets = if self.slots.is_empty() {
            MIN_BUCKETS
        } else {
            self.slots
                .len()
                .checked_mul(2)
                .ok_or(Error::CapacityOverflow)?
        };
        self.resize(buckets)
    }

    /// Moves every value into a fresh array of `buckets` slots.
    ///
    /// Allocating the new array is the only fallible step and happens before
    /// anything is touched.
    fn resize(&mut self, buckets: usize) -> Result<(), Error> {
        debug_assert!(buckets.is_power_of_two());
        debug_assert!(buckets > self.slots.len());

        let new_slots = allocate_slots(buckets)?;
        let old_slots = mem::replace(&mut self.slots, new_slots);
        self.set_geometry(buckets);

        for slot in old_slots {
            if let Slot::Occupied { hash, value } = slot {
                self.reinsert(hash, value);
            }
        }
        Ok(())
    }

    /// Derives the mask, shift and trigger from a slot count. Zero resets the
    /// table to its unallocated state.
    fn set_geometry(&mut self, buckets: usize) {
        if buckets == 0 {
            self.capacity_mask = 0;
            self.index_shift = u64::BITS;
            self.max_pop = 0;
            return;
        }
        self.capacity_mask = buckets - 1;
        self.index_shift = u64::BITS - buckets.trailing_zeros();
        self.max_pop = resize_trigger(self.capacity_mask);
        debug_assert_eq!(u64::MAX >> self.index_shift, self.capacity_mask as u64);
    }

    /// Places a value during a resize.
    ///
    /// Values arrive in old-array order, which is nearly sorted by ideal
    /// index, so they usually settle on the first empty slot. A poorer value
    /// still takes the slot of a richer one and carries the evicted value
    /// forward.
    fn reinsert(&mut self, hash: u64, value: V) {
        let shift = self.index_shift;
        let mask = self.capacity_mask;

        let mut carried = (hash, value);
        let mut index = ideal_index(hash, shift);
        let mut distance = 0;
        loop {
            if self.slots[index].is_empty() {
                let (hash, value) = carried;
                self.slots[index].fill(hash, value);
                return;
            }
            if let Slot::Occupied { hash, value } = &mut self.slots[index] {
                let occupant = displacement(*hash, index, shift, mask);
                if occupant < distance {
                    mem::swap(hash, &mut carried.0);
                    mem::swap(value, &mut carried.1);
                    distance = occupant;
                }
            }
            distance += 1;
            index = (index + 1) & mask;
        }
    }

    /// Inserts at `index`, the slot returned by a vacant probe, shifting the
    /// run starting there forward by one slot if it is occupied.
    fn insert_at(&mut self, index: usize, hash: u64, value: V) -> &mut V {
        debug_assert!(self.populated < self.max_pop);

        if !self.slots[index].is_empty() {
            let empty = self.next_empty(index);
            self.shift_forward(index, empty);
        }
        self.populated += 1;
        self.slots[index].fill(hash, value)
    }

    fn next_empty(&self, from: usize) -> usize {
        let mut index = from;
        while !self.slots[index].is_empty() {
            index = self.next_index(index);
        }
        index
    }

    /// Moves the occupied run `[start, empty)` one slot towards `empty`,
    /// leaving `start` empty.
    fn shift_forward(&mut self, start: usize, empty: usize) {
        if start < empty {
            self.slots[start..=empty].rotate_right(1);
        } else {
            // The run wraps: move the head segment, carry the last slot
            // across the boundary, then move the tail segment.
            let last = self.capacity_mask;
            self.slots[..=empty].rotate_right(1);
            self.slots.swap(0, last);
            self.slots[start..].rotate_right(1);
        }
    }

    /// Removes the value at `index` and closes the gap with a backward shift.
    fn remove_at(&mut self, index: usize) -> V {
        let Some((_, value)) = self.slots[index].take() else {
            unreachable!("removing from an empty slot");
        };

        // The run ends at the first slot that is empty or already home.
        let mut end = self.next_index(index);
        while let Slot::Occupied { hash, .. } = &self.slots[end] {
            if self.displacement(*hash, end) == 0 {
                break;
            }
            end = self.next_index(end);
        }
        self.shift_backward(index, end);

        self.populated -= 1;
        value
    }

    /// Moves the run `(hole, end)` one slot towards the empty `hole`, leaving
    /// the slot before `end` empty.
    fn shift_backward(&mut self, hole: usize, end: usize) {
        if hole < end {
            self.slots[hole..end].rotate_left(1);
        } else {
            let last = self.capacity_mask;
            self.slots[hole..].rotate_left(1);
            if end > 0 {
                self.slots.swap(last, 0);
                self.slots[..end].rotate_left(1);
            }
        }
    }

    /// Keeps only the values for which `f` returns `true`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use shift_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// for i in 0..100u64 {
    ///     table.entry(i, |&v: &u64| v == i).or_insert(i);
    /// }
    /// table.retain(|v| *v % 3 == 0);
    /// assert_eq!(table.len(), 34);
    /// assert_eq!(table.find(9, |&v| v == 9), Some(&9));
    /// assert_eq!(table.find(10, |&v| v == 10), None);
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&mut V) -> bool) {
        if self.populated == 0 {
            return;
        }

        // Start after an empty slot: backward shifts never fill it and never
        // carry a value across it, so each value is offered to `f` once.
        let start = self.next_empty(0);
        let mut index = self.next_index(start);
        while index != start {
            let keep = match &mut self.slots[index] {
                Slot::Empty => true,
                Slot::Occupied { value, .. } => f(value),
            };
            if keep {
                index = self.next_index(index);
            } else {
                self.remove_at(index);
            }
        }
    }

    /// Returns an iterator over all values in the table.
    ///
    /// The order is arbitrary: it depends on the hashes and on the insertion
    /// history, and may differ between two tables holding the same values.
    /// Sort the values if a stable order is needed.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            slots: self.slots.iter(),
            remaining: self.populated,
        }
    }

    /// Returns an iterator over mutable references to all values.
    ///
    /// Mutating a value in a way that changes its hash or equality breaks the
    /// table's lookups for that value.
    pub fn iter_mut(&mut self) -> IterMut<'_, V> {
        IterMut {
            slots: self.slots.iter_mut(),
            remaining: self.populated,
        }
    }

    /// Returns an iterator that removes and yields all values from the table,
    /// keeping the allocated slots.
    ///
    /// The slots move into the iterator and the table reads as empty from
    /// the start. Dropping the iterator removes any values not yet yielded
    /// and hands the emptied slots back. If the iterator is leaked, the table
    /// stays empty and unallocated.
    pub fn drain(&mut self) -> Drain<'_, V> {
        let slots = mem::take(&mut self.slots);
        let remaining = mem::replace(&mut self.populated, 0);
        self.set_geometry(0);
        Drain {
            table: self,
            slots,
            index: 0,
            remaining,
        }
    }

    /// Checks the table's structural invariants.
    ///
    /// Verifies the geometry (power-of-two length, shift, trigger), that the
    /// occupied slot count matches [`len`](Self::len), that every cached hash
    /// is odd, and the Robin Hood ordering: a value's displacement exceeds
    /// its predecessor's by at most one, and a value following an empty slot
    /// sits in its ideal slot. Runs in `O(buckets)`.
    pub fn check_invariants(&self) -> Result<(), Error> {
        let violation = |slot, reason| Err(Error::InvariantViolation { slot, reason });

        if self.slots.is_empty() {
            if self.populated != 0 || self.max_pop != 0 {
                return violation(0, "unallocated table reports values");
            }
            return Ok(());
        }

        if !self.slots.len().is_power_of_two() || self.slots.len() < MIN_BUCKETS {
            return violation(0, "slot count is not a power of two of at least 16");
        }
        if self.capacity_mask != self.slots.len() - 1 {
            return violation(0, "capacity mask does not match slot count");
        }
        if u64::MAX >> self.index_shift != self.capacity_mask as u64 {
            return violation(0, "index shift does not match capacity mask");
        }
        if self.max_pop != resize_trigger(self.capacity_mask) {
            return violation(0, "resize trigger does not match capacity");
        }
        if self.populated > self.max_pop {
            return violation(0, "population exceeds resize trigger");
        }

        let mut occupied = 0;
        for (index, slot) in self.slots.iter().enumerate() {
            let Slot::Occupied { hash, .. } = slot else {
                continue;
            };
            occupied += 1;
            if hash & 1 == 0 {
                return violation(index, "cached hash is even");
            }

            let previous = index.wrapping_sub(1) & self.capacity_mask;
            let own = self.displacement(*hash, index);
            let allowed = match &self.slots[previous] {
                Slot::Empty => 0,
                Slot::Occupied { hash, .. } => self.displacement(*hash, previous) + 1,
            };
            if own > allowed {
                return violation(index, "value displaced further than its predecessor allows");
            }
        }

        if occupied != self.populated {
            return violation(0, "occupied slot count does not match length");
        }
        Ok(())
    }

    /// Number of slots a lookup for `hash` visits before it finds the value
    /// or proves it absent.
    ///
    /// Available in tests and with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_length(&self, hash: u64, eq: impl Fn(&V) -> bool) -> usize {
        if self.populated == 0 {
            return 0;
        }
        // Both outcomes inspect the slot they stop at.
        match self.probe(table_hash(hash), eq) {
            Probe::Found { distance, .. } | Probe::Vacant { distance, .. } => distance + 1,
        }
    }

    /// Computes a histogram of displacements: entry `d` counts the values
    /// stored `d` slots past their ideal slot.
    ///
    /// Available in tests and with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn displacement_histogram(&self) -> Vec<usize> {
        let mut hist = Vec::new();
        for (index, slot) in self.slots.iter().enumerate() {
            if let Slot::Occupied { hash, .. } = slot {
                let d = self.displacement(*hash, index);
                if hist.len() <= d {
                    hist.resize(d + 1, 0);
                }
                hist[d] += 1;
            }
        }
        hist
    }

    /// Returns detailed utilization statistics for debugging.
    ///
    /// Available in tests and with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let hist = self.displacement_histogram();
        let total_displacement: usize = hist.iter().enumerate().map(|(d, &n)| d * n).sum();
        let buckets = self.slots.len();
        let slot_size = mem::size_of::<Slot<V>>();

        DebugStats {
            populated: self.populated,
            capacity: self.max_pop,
            buckets,
            max_displacement: hist.len().saturating_sub(1),
            mean_displacement: if self.populated == 0 {
                0.0
            } else {
                total_displacement as f64 / self.populated as f64
            },
            load_factor: if buckets == 0 {
                0.0
            } else {
                self.populated as f64 / buckets as f64
            },
            total_bytes: buckets * slot_size,
            wasted_bytes: (buckets - self.populated) * slot_size,
        }
    }

    /// Pretty-prints the displacement histogram horizontally using stdout.
    ///
    /// Requires the `std` feature, and either tests or the `stats` feature.
    #[cfg(all(any(test, feature = "stats"), feature = "std"))]
    pub fn print_displacement_histogram(&self) {
        let hist = self.displacement_histogram();
        let max = hist.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("displacement histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!("displacement histogram ({} values):", self.populated);

        let make_bar = |count: usize| -> alloc::string::String {
            if count == 0 {
                return alloc::string::String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let mut bar = "█".repeat(units / 8);
            let partial = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉'][units % 8];
            if partial != ' ' {
                bar.push(partial);
            }
            bar
        };

        for (d, &count) in hist.iter().enumerate() {
            println!("{:>3} | {} ({})", d, make_bar(count), count);
        }
    }
}

impl<V> IntoIterator for HashTable<V> {
    type IntoIter = IntoIter<V>;
    type Item = V;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            remaining: self.populated,
            slots: self.slots.into_iter(),
        }
    }
}

impl<'a, V> IntoIterator for &'a HashTable<V> {
    type IntoIter = Iter<'a, V>;
    type Item = &'a V;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A view into a single entry in the hash table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub enum Entry<'a, V> {
    /// A vacant entry - the value is not present in the table
    Vacant(VacantEntry<'a, V>),
    /// An occupied entry - the value is present in the table
    Occupied(OccupiedEntry<'a, V>),
}

impl<'a, V> Entry<'a, V> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the value computed by `default` if the entry is vacant.
    /// The closure is not called for an occupied entry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use shift_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// let value = table
    ///     .entry(7, |s: &String| s == "seven")
    ///     .or_insert_with(|| "seven".to_string());
    /// assert_eq!(value, "seven");
    ///
    /// let existing = table
    ///     .entry(7, |s: &String| s == "seven")
    ///     .or_insert_with(|| panic!("Should not be called"));
    /// assert_eq!(existing, "seven");
    /// ```
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Calls `f` on the value of an occupied entry.
    pub fn and_modify(self, f: impl FnOnce(&mut V)) -> Self {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Inserts `V::default()` if the entry is vacant.
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant entry in the hash table.
///
/// It records the slot the value belongs in; nothing is moved until
/// [`insert`](VacantEntry::insert) is called.
pub struct VacantEntry<'a, V> {
    table: &'a mut HashTable<V>,
    hash: u64,
    index: usize,
}

impl<'a, V> VacantEntry<'a, V> {
    /// Inserts a value into the vacant entry and returns a mutable reference
    /// to it.
    ///
    /// If the target slot is held by a richer value, the run starting there
    /// shifts forward by one slot to make room.
    pub fn insert(self, value: V) -> &'a mut V {
        self.table.insert_at(self.index, self.hash, value)
    }
}

/// A view into an occupied entry in the hash table.
pub struct OccupiedEntry<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
}

impl<'a, V> OccupiedEntry<'a, V> {
    fn slot_value(slot: &Slot<V>) -> &V {
        match slot.value() {
            Some(value) => value,
            None => unreachable!("occupied entry points at an empty slot"),
        }
    }

    fn slot_value_mut(slot: &mut Slot<V>) -> &mut V {
        match slot.value_mut() {
            Some(value) => value,
            None => unreachable!("occupied entry points at an empty slot"),
        }
    }

    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        Self::slot_value(&self.table.slots[self.index])
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        Self::slot_value_mut(&mut self.table.slots[self.index])
    }

    /// Converts the entry into a mutable reference to its value, bound to the
    /// table's borrow.
    pub fn into_mut(self) -> &'a mut V {
        Self::slot_value_mut(&mut self.table.slots[self.index])
    }

    /// Removes the value from the table and returns it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use shift_hash::hash_table::Entry;
    /// # use shift_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(1, |&v: &u32| v == 10).or_insert(10);
    ///
    /// let removed = match table.entry(1, |&v: &u32| v == 10) {
    ///     Entry::Occupied(entry) => entry.remove(),
    ///     Entry::Vacant(_) => unreachable!(),
    /// };
    /// assert_eq!(removed, 10);
    /// assert!(table.is_empty());
    /// ```
    pub fn remove(self) -> V {
        self.table.remove_at(self.index)
    }
}

/// An iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`iter`] method on [`HashTable`]. It walks
/// the slot array from either end, skipping empty slots.
///
/// [`iter`]: HashTable::iter
pub struct Iter<'a, V> {
    slots: core::slice::Iter<'a, Slot<V>>,
    remaining: usize,
}

impl<V> Clone for Iter<'_, V> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            remaining: self.remaining,
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.slots.find_map(Slot::value)?;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> DoubleEndedIterator for Iter<'_, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.slots.rfind(|slot| !slot.is_empty())?.value()?;
        self.remaining -= 1;
        Some(value)
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}
impl<V> FusedIterator for Iter<'_, V> {}

/// A mutable iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`iter_mut`] method on [`HashTable`].
///
/// [`iter_mut`]: HashTable::iter_mut
pub struct IterMut<'a, V> {
    slots: core::slice::IterMut<'a, Slot<V>>,
    remaining: usize,
}

impl<'a, V> Iterator for IterMut<'a, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.slots.find_map(Slot::value_mut)?;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> DoubleEndedIterator for IterMut<'_, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.slots.rfind(|slot| !slot.is_empty())?.value_mut()?;
        self.remaining -= 1;
        Some(value)
    }
}

impl<V> ExactSizeIterator for IterMut<'_, V> {}
impl<V> FusedIterator for IterMut<'_, V> {}

/// An owning iterator over the values of a [`HashTable`].
pub struct IntoIter<V> {
    slots: alloc::vec::IntoIter<Slot<V>>,
    remaining: usize,
}

impl<V> Iterator for IntoIter<V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let (_, value) = self.slots.find_map(|mut slot| slot.take())?;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> DoubleEndedIterator for IntoIter<V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let (_, value) = self.slots.rfind(|slot| !slot.is_empty())?.take()?;
        self.remaining -= 1;
        Some(value)
    }
}

impl<V> ExactSizeIterator for IntoIter<V> {}
impl<V> FusedIterator for IntoIter<V> {}

/// A draining iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`drain`] method on [`HashTable`].
/// It yields owned `V` values and empties the table as it iterates.
///
/// [`drain`]: HashTable::drain
pub struct Drain<'a, V> {
    table: &'a mut HashTable<V>,
    slots: Vec<Slot<V>>,
    index: usize,
    remaining: usize,
}

impl<V> Drop for Drain<'_, V> {
    fn drop(&mut self) {
        for slot in &mut self.slots[self.index..] {
            *slot = Slot::Empty;
        }
        let buckets = self.slots.len();
        self.table.slots = mem::take(&mut self.slots);
        self.table.set_geometry(buckets);
    }
}

impl<V> Iterator for Drain<'_, V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 && self.index < self.slots.len() {
            let taken = self.slots[self.index].take();
            self.index += 1;
            if let Some((_, value)) = taken {
                self.remaining -= 1;
                return Some(value);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Drain<'_, V> {}
impl<V> FusedIterator for Drain<'_, V> {}
