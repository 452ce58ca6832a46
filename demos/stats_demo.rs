use std::hash::BuildHasher;
use std::hash::RandomState;

use clap::Parser;
use shift_hash::HashTable;
use shift_hash::hash_table::Entry;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Remove every n-th value after filling, to show the effect of
    /// backward-shift deletion on displacement.
    #[arg(short = 'r', long = "remove_every", default_value_t = 0)]
    remove_every: u64,
}

fn main() {
    let args = Args::parse();
    let state = RandomState::new();

    println!(
        "Creating HashTable with target capacity: {}",
        args.target_capacity
    );

    let mut table: HashTable<u64> = HashTable::with_capacity(args.target_capacity);

    println!(
        "Actual capacity: {} ({} slots)",
        table.capacity(),
        table.buckets()
    );
    println!("Filling table with u64 values...");

    let num_values = table.capacity() as u64;
    for value in 0..num_values {
        match table.try_entry(state.hash_one(value), |&v| v == value) {
            Ok(Entry::Vacant(entry)) => {
                entry.insert(value);
            }
            Ok(Entry::Occupied(_)) => {
                panic!("Value already exists in table: {}", value);
            }
            Err(err) => {
                eprintln!("Stopped filling at {} values: {}", table.len(), err);
                break;
            }
        }
    }

    println!("Inserted {} values into table", table.len());
    table.print_displacement_histogram();
    table.debug_stats().print();

    if args.remove_every > 0 {
        let removed = (0..num_values)
            .step_by(args.remove_every as usize)
            .filter_map(|value| table.remove(state.hash_one(value), |&v| v == value))
            .count();

        println!();
        println!("Removed {} values", removed);
        table.print_displacement_histogram();
        table.debug_stats().print();
    }

    match table.check_invariants() {
        Ok(()) => println!("Table invariants hold"),
        Err(err) => eprintln!("{}", err),
    }
}
