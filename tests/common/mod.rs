#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io::Error;
use std::path::Path;

pub const HEADER: [&str; 8] = [
    "op", "at", "project", "actor", "user", "seconds", "quantity", "memo",
];

/// A funded project with `users` members, each reporting and getting approved
/// `rounds` random chunks of time, then claiming everything.
pub fn generate_csv(path: &Path, users: usize, rounds: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    let mut rng = StdRng::seed_from_u64(7);

    wtr.write_record(HEADER)?;
    wtr.write_record(["create", "0", "proj", "owner", "", "", "1.0000 USD@token", ""])?;
    wtr.write_record(["deposit", "0", "", "owner", "", "", "1000000.0000 USD@token", "proj"])?;

    let names: Vec<String> = (0..users).map(user_name).collect();
    for user in &names {
        wtr.write_record(["add_user", "0", "proj", "owner", user, "", "", ""])?;
    }

    for round in 0..rounds {
        let at = (round as u64 + 1).to_string();
        for user in &names {
            let seconds = rng.gen_range(1..=7200).to_string();
            wtr.write_record(["add_time", &at, "proj", user, user, &seconds, "", ""])?;
            wtr.write_record(["approve", &at, "proj", "owner", user, "", "", ""])?;
        }
    }
    for user in &names {
        wtr.write_record(["claim", "", "proj", "", user, "", "", ""])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Names drawn from the ledger's alphabet: "u" followed by base-5 digits 1-5.
pub fn user_name(mut index: usize) -> String {
    let mut name = String::from("u");
    loop {
        name.push(char::from(b'1' + (index % 5) as u8));
        index /= 5;
        if index == 0 {
            break;
        }
    }
    name
}
