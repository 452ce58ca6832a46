use core::hash::Hash;
use core::hash::Hasher;
use core::hint::black_box;

use criterion::AxisScale;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use hashbrown::hash_table::Entry as HashbrownEntry;
use hashbrown::hash_table::HashTable as HashbrownHashTable;
use rand::Rng;
use rand::SeedableRng;
use rand::TryRngCore;
use rand::rngs::OsRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Zipf;
use shift_hash::hash_table::Entry as ShiftEntry;
use shift_hash::hash_table::HashTable as ShiftHashTable;
use siphasher::sip::SipHasher;

trait KeyValuePair: Clone {
    fn new(key: u64) -> Self;

    fn hash_key(&self) -> u64;
    fn eq_key(&self, other: &Self) -> bool;
}

#[derive(Clone)]
struct SmallTestItem {
    key: u64,
}

impl KeyValuePair for SmallTestItem {
    fn new(key: u64) -> Self {
        black_box(Self { key })
    }

    fn hash_key(&self) -> u64 {
        let mut hasher = SipHasher::new();
        self.key.hash(&mut hasher);
        hasher.finish()
    }

    fn eq_key(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

#[derive(Clone)]
struct TestItem {
    key: String,
    _value: u64,
}

impl KeyValuePair for TestItem {
    fn new(key: u64) -> Self {
        black_box(Self {
            key: format!("key_{:016X}", key),
            _value: key,
        })
    }

    fn hash_key(&self) -> u64 {
        let mut hasher = SipHasher::new();
        self.key.hash(&mut hasher);
        hasher.finish()
    }

    fn eq_key(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

/// The operations every benchmark drives, implemented for both tables so
/// each workload is written once.
trait BenchTable<T: KeyValuePair> {
    const NAME: &'static str;

    fn with_capacity(capacity: usize) -> Self;
    fn capacity(&self) -> usize;
    /// Inserts `item`, or removes the stored equal item. Returns `true` on
    /// insertion.
    fn toggle(&mut self, hash: u64, item: T) -> bool;
    fn upsert(&mut self, hash: u64, item: T);
    fn find(&self, hash: u64, item: &T) -> Option<&T>;
    fn remove(&mut self, hash: u64, item: &T) -> Option<T>;
    fn count(&self) -> usize;
}

impl<T: KeyValuePair> BenchTable<T> for ShiftHashTable<T> {
    const NAME: &'static str = "shift_hash";

    fn with_capacity(capacity: usize) -> Self {
        ShiftHashTable::with_capacity(capacity)
    }

    fn capacity(&self) -> usize {
        ShiftHashTable::capacity(self)
    }

    fn toggle(&mut self, hash: u64, item: T) -> bool {
        match self.entry(hash, |v| v.eq_key(&item)) {
            ShiftEntry::Vacant(entry) => {
                black_box(entry.insert(item));
                true
            }
            ShiftEntry::Occupied(entry) => {
                black_box(entry.remove());
                false
            }
        }
    }

    fn upsert(&mut self, hash: u64, item: T) {
        match self.entry(hash, |v| v.eq_key(&item)) {
            ShiftEntry::Vacant(entry) => {
                black_box(entry.insert(item));
            }
            ShiftEntry::Occupied(mut entry) => {
                *entry.get_mut() = item;
            }
        }
    }

    fn find(&self, hash: u64, item: &T) -> Option<&T> {
        ShiftHashTable::find(self, hash, |v| v.eq_key(item))
    }

    fn remove(&mut self, hash: u64, item: &T) -> Option<T> {
        ShiftHashTable::remove(self, hash, |v| v.eq_key(item))
    }

    fn count(&self) -> usize {
        self.iter().count()
    }
}

impl<T: KeyValuePair> BenchTable<T> for HashbrownHashTable<T> {
    const NAME: &'static str = "hashbrown";

    fn with_capacity(capacity: usize) -> Self {
        HashbrownHashTable::with_capacity(capacity)
    }

    fn capacity(&self) -> usize {
        HashbrownHashTable::capacity(self)
    }

    fn toggle(&mut self, hash: u64, item: T) -> bool {
        match self.entry(hash, |v| v.eq_key(&item), |v| v.hash_key()) {
            HashbrownEntry::Vacant(entry) => {
                black_box(entry.insert(item));
                true
            }
            HashbrownEntry::Occupied(entry) => {
                black_box(entry.remove().0);
                false
            }
        }
    }

    fn upsert(&mut self, hash: u64, item: T) {
        match self.entry(hash, |v| v.eq_key(&item), |v| v.hash_key()) {
            HashbrownEntry::Vacant(entry) => {
                black_box(entry.insert(item));
            }
            HashbrownEntry::Occupied(mut entry) => {
                *entry.get_mut() = item;
            }
        }
    }

    fn find(&self, hash: u64, item: &T) -> Option<&T> {
        HashbrownHashTable::find(self, hash, |v| v.eq_key(item))
    }

    fn remove(&mut self, hash: u64, item: &T) -> Option<T> {
        self.find_entry(hash, |v| v.eq_key(item))
            .ok()
            .map(|entry| entry.remove().0)
    }

    fn count(&self) -> usize {
        self.iter().count()
    }
}

const SIZES: &[usize] = &[
    (1 << 10),
    (1 << 12),
    (1 << 14),
    (1 << 16),
    (1 << 18),
];

fn random_items<T: KeyValuePair>(count: usize) -> Vec<(u64, T)> {
    let mut rng = OsRng;
    (0..count)
        .map(|_| {
            let item = T::new(rng.try_next_u64().unwrap());
            (item.hash_key(), item)
        })
        .collect()
}

fn shuffled<T: Clone>(items: &[T]) -> Vec<T> {
    let mut items = items.to_vec();
    items.shuffle(&mut SmallRng::from_os_rng());
    items
}

fn filled<T: KeyValuePair, Table: BenchTable<T>>(items: &[(u64, T)], capacity: usize) -> Table {
    let mut table = Table::with_capacity(capacity);
    for (hash, item) in items.iter().take(capacity).cloned() {
        table.upsert(hash, item);
    }
    table
}

fn run_insert<T: KeyValuePair, Table: BenchTable<T>>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    size: usize,
    preallocate: bool,
) {
    let capacity = Table::with_capacity(size).capacity();
    let items = random_items::<T>(capacity);

    group.throughput(Throughput::Elements(capacity as u64));
    group.bench_function(format!("{}/{size}", Table::NAME), |b| {
        b.iter_batched(
            || shuffled(&items),
            |items| {
                let mut table = Table::with_capacity(if preallocate { capacity } else { 0 });
                for (hash, item) in items {
                    table.upsert(hash, item);
                }
                black_box(table)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_insert_random<T: KeyValuePair, const PREALLOCATE: bool>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "insert_random{}_{}",
        if PREALLOCATE { "_preallocated" } else { "" },
        core::any::type_name::<T>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        run_insert::<T, ShiftHashTable<T>>(&mut group, size, PREALLOCATE);
        run_insert::<T, HashbrownHashTable<T>>(&mut group, size, PREALLOCATE);
    }
    group.finish();
}

fn run_find_hit_miss<T: KeyValuePair, Table: BenchTable<T>>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    size: usize,
) {
    let capacity = Table::with_capacity(size).capacity();
    let present = (0..capacity as u64 * 2)
        .step_by(2)
        .map(|key| {
            let item = T::new(key);
            (item.hash_key(), item)
        })
        .collect::<Vec<_>>();
    let absent = (1..=capacity as u64 * 2)
        .step_by(2)
        .map(|key| {
            let item = T::new(key);
            (item.hash_key(), item)
        })
        .collect::<Vec<_>>();
    let probes = present
        .iter()
        .zip(absent.iter())
        .flat_map(|(hit, miss)| [hit.clone(), miss.clone()])
        .collect::<Vec<_>>();

    let table: Table = filled(&present, capacity);

    group.throughput(Throughput::Elements(probes.len() as u64));
    group.bench_function(format!("{}/{size}", Table::NAME), |b| {
        b.iter_batched(
            || shuffled(&probes),
            |probes| {
                for (hash, item) in &probes {
                    black_box(table.find(*hash, item));
                }
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_find_hit_miss<T: KeyValuePair>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "find_hit_miss_{}",
        core::any::type_name::<T>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        run_find_hit_miss::<T, ShiftHashTable<T>>(&mut group, size);
        run_find_hit_miss::<T, HashbrownHashTable<T>>(&mut group, size);
    }
    group.finish();
}

fn run_remove<T: KeyValuePair, Table: BenchTable<T>>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    size: usize,
) where
    Table: Clone,
{
    let capacity = Table::with_capacity(size).capacity();
    let items = random_items::<T>(capacity);
    let table: Table = filled(&items, capacity);

    group.throughput(Throughput::Elements(capacity as u64));
    group.bench_function(format!("{}/{size}", Table::NAME), |b| {
        b.iter_batched(
            || (table.clone(), shuffled(&items)),
            |(mut table, items)| {
                for (hash, item) in &items {
                    black_box(table.remove(*hash, item));
                }
                black_box(table)
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_remove<T: KeyValuePair>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("remove_{}", core::any::type_name::<T>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        run_remove::<T, ShiftHashTable<T>>(&mut group, size);
        run_remove::<T, HashbrownHashTable<T>>(&mut group, size);
    }
    group.finish();
}

fn run_churn<T: KeyValuePair, Table: BenchTable<T>>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    size: usize,
) {
    let capacity = Table::with_capacity(size).capacity();
    let toggles = random_items::<T>(capacity)
        .into_iter()
        .flat_map(|pair| [pair.clone(), pair])
        .collect::<Vec<_>>();

    group.throughput(Throughput::Elements(toggles.len() as u64));
    group.bench_function(format!("{}/{size}", Table::NAME), |b| {
        b.iter_batched(
            || shuffled(&toggles),
            |toggles| {
                let mut table = Table::with_capacity(0);
                for (hash, item) in toggles {
                    black_box(table.toggle(hash, item));
                }
                black_box(table)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_churn<T: KeyValuePair>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("churn_{}", core::any::type_name::<T>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        run_churn::<T, ShiftHashTable<T>>(&mut group, size);
        run_churn::<T, HashbrownHashTable<T>>(&mut group, size);
    }
    group.finish();
}

fn run_mixed_zipf<T: KeyValuePair, Table: BenchTable<T>>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    size: usize,
) {
    const KEY_SPACE_MULTIPLIER: f32 = 2.0;

    let capacity = Table::with_capacity(size).capacity();
    let insert_distr = Zipf::new(capacity as f32 - 1.0, 1.0).unwrap();
    let lookup_distr = Zipf::new(capacity as f32 * KEY_SPACE_MULTIPLIER - 1.0, 1.0).unwrap();

    // Half finds, a quarter inserts, a quarter removes.
    let mut rng = SmallRng::from_os_rng();
    let operations = (0..capacity * 3)
        .map(|_| {
            let op = rng.random_range(0..4u8);
            let key = if op == 0 {
                rng.sample(insert_distr) as u64
            } else {
                rng.sample(lookup_distr) as u64
            };
            let item = T::new(key);
            (op, item.hash_key(), item)
        })
        .collect::<Vec<_>>();

    group.throughput(Throughput::Elements(operations.len() as u64));
    group.bench_function(format!("{}/{size}", Table::NAME), |b| {
        b.iter_batched(
            || operations.clone(),
            |operations| {
                let mut table = Table::with_capacity(0);
                for (op, hash, item) in operations {
                    match op {
                        0 => table.upsert(hash, item),
                        1 => {
                            black_box(table.remove(hash, &item));
                        }
                        _ => {
                            black_box(table.find(hash, &item));
                        }
                    }
                }
                black_box(table.count())
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_mixed_zipf<T: KeyValuePair>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("mixed_zipf_{}", core::any::type_name::<T>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        run_mixed_zipf::<T, ShiftHashTable<T>>(&mut group, size);
        run_mixed_zipf::<T, HashbrownHashTable<T>>(&mut group, size);
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_insert_random::<SmallTestItem, false>,
    bench_insert_random::<TestItem, false>,
    bench_insert_random::<SmallTestItem, true>,
    bench_insert_random::<TestItem, true>,
    bench_find_hit_miss::<SmallTestItem>,
    bench_find_hit_miss::<TestItem>,
    bench_remove::<SmallTestItem>,
    bench_remove::<TestItem>,
    bench_churn::<SmallTestItem>,
    bench_churn::<TestItem>,
    bench_mixed_zipf::<SmallTestItem>,
    bench_mixed_zipf::<TestItem>,
);

criterion_main!(benches);
