//! # CLI — interactive shell for the embedded LSM storage engine
//!
//! A REPL-style command-line interface: reads commands from stdin, runs
//! them against an open [`engine::Database`], and prints results to stdout.
//! Works equally well interactively or piped (scripted testing via stdin).
//!
//! ## Commands
//!
//! ```text
//! CREATECF name threshold_bytes max_level probability compressed
//! DROPCF name
//! PUT cf key value [ttl]      ttl is absolute epoch seconds, -1 = no expiry
//! GET cf key
//! DEL cf key
//! COMPACT cf max_threads
//! CURSOR cf                   binds a cursor to cf, replacing any open one
//! NEXT / PREV                 advances/retreats the open cursor
//! CURGET                      prints the open cursor's current entry
//! BEGIN cf                    starts a transaction, replacing any open one
//! TXNPUT key value [ttl]
//! TXNDEL key
//! COMMIT
//! ROLLBACK
//! CFS                         lists open column families
//! STATS
//! EXIT / QUIT
//! ```
//!
//! ## Configuration
//!
//! All settings are controlled via environment variables:
//!
//! ```text
//! DB_PATH           database directory       (default: "data")
//! DB_COMPRESSED_WAL compress WAL records      (default: "false")
//! ```

use std::io::{self, BufRead, Write};

use anyhow::{anyhow, Result};
use config::DbConfig;
use engine::{Cursor, Database, Transaction};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Holds at most one open cursor and one open transaction at a time — this
/// is a single-session shell, not a concurrent client.
#[derive(Default)]
struct Session {
    cursor: Option<Cursor>,
    txn: Option<Transaction>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let db_path = env_or("DB_PATH", "data");
    let compressed_wal: bool = env_or("DB_COMPRESSED_WAL", "false").parse().unwrap_or(false);

    let db = Database::open(DbConfig::new(&db_path, compressed_wal))?;

    println!(
        "storage engine started (seq={}, db_path={}, compressed_wal={})",
        db.seq(),
        db_path,
        compressed_wal
    );
    println!("type HELP for a command summary, EXIT to quit");
    print!("> ");
    io::stdout().flush().ok();

    let mut session = Session::default();
    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();

        if let Some(cmd) = parts.next() {
            match cmd.to_uppercase().as_str() {
                "CREATECF" => report(create_cf(&db, &mut parts)),
                "DROPCF" => report(drop_cf(&db, &mut parts)),
                "PUT" => report(put(&db, &mut parts)),
                "GET" => report_value(get(&db, &mut parts)),
                "DEL" => report(delete(&db, &mut parts)),
                "COMPACT" => report(compact(&db, &mut parts)),
                "CURSOR" => report(open_cursor(&db, &mut session, &mut parts)),
                "NEXT" => report(cursor_next(&mut session)),
                "PREV" => report(cursor_prev(&mut session)),
                "CURGET" => report_value(cursor_get(&mut session)),
                "BEGIN" => report(begin(&db, &mut session, &mut parts)),
                "TXNPUT" => report(txn_put(&mut session, &mut parts)),
                "TXNDEL" => report(txn_delete(&mut session, &mut parts)),
                "COMMIT" => report(commit(&db, &mut session)),
                "ROLLBACK" => report(rollback(&db, &mut session)),
                "CFS" => println!("{}", db.column_family_names().join(", ")),
                "STATS" => println!("{:?}", db),
                "HELP" => print_help(),
                "EXIT" | "QUIT" => {
                    println!("bye");
                    break;
                }
                other => println!("unknown command: {other}"),
            }
        }

        print!("> ");
        io::stdout().flush().ok();
    }

    db.close()?;
    Ok(())
}

fn report(result: Result<()>) {
    match result {
        Ok(()) => println!("OK"),
        Err(e) => println!("ERR {e}"),
    }
}

fn report_value(result: Result<Option<Vec<u8>>>) {
    match result {
        Ok(Some(v)) => println!("{}", String::from_utf8_lossy(&v)),
        Ok(None) => println!("(nil)"),
        Err(e) => println!("ERR {e}"),
    }
}

fn next_arg<'a>(parts: &mut impl Iterator<Item = &'a str>, usage: &str) -> Result<&'a str> {
    parts.next().ok_or_else(|| anyhow!("usage: {usage}"))
}

fn create_cf<'a>(db: &Database, parts: &mut impl Iterator<Item = &'a str>) -> Result<()> {
    let usage = "CREATECF name threshold_bytes max_level probability compressed";
    let name = next_arg(parts, usage)?;
    let flush_threshold: u32 = next_arg(parts, usage)?.parse()?;
    let max_level: i32 = next_arg(parts, usage)?.parse()?;
    let probability: f32 = next_arg(parts, usage)?.parse()?;
    let compressed: bool = next_arg(parts, usage)?.parse()?;
    db.create_column_family(name, flush_threshold, max_level, probability, compressed)?;
    Ok(())
}

fn drop_cf<'a>(db: &Database, parts: &mut impl Iterator<Item = &'a str>) -> Result<()> {
    let name = next_arg(parts, "DROPCF name")?;
    db.drop_column_family(name)?;
    Ok(())
}

fn put<'a>(db: &Database, parts: &mut impl Iterator<Item = &'a str>) -> Result<()> {
    let usage = "PUT cf key value [ttl]";
    let cf = next_arg(parts, usage)?;
    let key = next_arg(parts, usage)?;
    let value = next_arg(parts, usage)?;
    let ttl: i64 = parts.next().map(str::parse).transpose()?.unwrap_or(-1);
    db.put(cf, key.as_bytes().to_vec(), value.as_bytes().to_vec(), ttl)?;
    Ok(())
}

fn get<'a>(db: &Database, parts: &mut impl Iterator<Item = &'a str>) -> Result<Option<Vec<u8>>> {
    let cf = next_arg(parts, "GET cf key")?;
    let key = next_arg(parts, "GET cf key")?;
    match db.get(cf, key.as_bytes()) {
        Ok(v) => Ok(Some(v)),
        Err(engine::EngineError::KeyNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn delete<'a>(db: &Database, parts: &mut impl Iterator<Item = &'a str>) -> Result<()> {
    let usage = "DEL cf key";
    let cf = next_arg(parts, usage)?;
    let key = next_arg(parts, usage)?;
    db.delete(cf, key.as_bytes().to_vec())?;
    Ok(())
}

fn compact<'a>(db: &Database, parts: &mut impl Iterator<Item = &'a str>) -> Result<()> {
    let usage = "COMPACT cf max_threads";
    let cf = next_arg(parts, usage)?;
    let max_threads: usize = next_arg(parts, usage)?.parse()?;
    db.compact_sstables(cf, max_threads)?;
    Ok(())
}

fn open_cursor<'a>(
    db: &Database,
    session: &mut Session,
    parts: &mut impl Iterator<Item = &'a str>,
) -> Result<()> {
    let cf = next_arg(parts, "CURSOR cf")?;
    session.cursor = Some(db.cursor(cf)?);
    Ok(())
}

fn cursor_next(session: &mut Session) -> Result<()> {
    let cursor = session
        .cursor
        .as_mut()
        .ok_or_else(|| anyhow!("no cursor open, run CURSOR cf first"))?;
    cursor.next()?;
    Ok(())
}

fn cursor_prev(session: &mut Session) -> Result<()> {
    let cursor = session
        .cursor
        .as_mut()
        .ok_or_else(|| anyhow!("no cursor open, run CURSOR cf first"))?;
    cursor.prev()?;
    Ok(())
}

fn cursor_get(session: &mut Session) -> Result<Option<Vec<u8>>> {
    let cursor = session
        .cursor
        .as_ref()
        .ok_or_else(|| anyhow!("no cursor open, run CURSOR cf first"))?;
    match cursor.get() {
        Ok((k, v)) => Ok(Some(
            format!("{} -> {}", String::from_utf8_lossy(&k), String::from_utf8_lossy(&v))
                .into_bytes(),
        )),
        Err(engine::EngineError::KeyTombstoned) => Ok(Some(b"(tombstoned)".to_vec())),
        Err(engine::EngineError::KeyExpired) => Ok(Some(b"(expired)".to_vec())),
        Err(e) => Err(e.into()),
    }
}

fn begin<'a>(
    db: &Database,
    session: &mut Session,
    parts: &mut impl Iterator<Item = &'a str>,
) -> Result<()> {
    let cf = next_arg(parts, "BEGIN cf")?;
    session.txn = Some(db.begin(cf)?);
    Ok(())
}

fn txn_put<'a>(session: &mut Session, parts: &mut impl Iterator<Item = &'a str>) -> Result<()> {
    let usage = "TXNPUT key value [ttl]";
    let key = next_arg(parts, usage)?;
    let value = next_arg(parts, usage)?;
    let ttl: i64 = parts.next().map(str::parse).transpose()?.unwrap_or(-1);
    let txn = session
        .txn
        .as_mut()
        .ok_or_else(|| anyhow!("no transaction open, run BEGIN cf first"))?;
    txn.put(key.as_bytes().to_vec(), value.as_bytes().to_vec(), ttl);
    Ok(())
}

fn txn_delete<'a>(session: &mut Session, parts: &mut impl Iterator<Item = &'a str>) -> Result<()> {
    let key = next_arg(parts, "TXNDEL key")?;
    let txn = session
        .txn
        .as_mut()
        .ok_or_else(|| anyhow!("no transaction open, run BEGIN cf first"))?;
    txn.delete(key.as_bytes().to_vec());
    Ok(())
}

fn commit(db: &Database, session: &mut Session) -> Result<()> {
    let txn = session
        .txn
        .as_mut()
        .ok_or_else(|| anyhow!("no transaction open, run BEGIN cf first"))?;
    db.commit(txn)?;
    Ok(())
}

fn rollback(db: &Database, session: &mut Session) -> Result<()> {
    let txn = session
        .txn
        .as_mut()
        .ok_or_else(|| anyhow!("no transaction open, run BEGIN cf first"))?;
    db.rollback(txn)?;
    session.txn = None;
    Ok(())
}

fn print_help() {
    println!("CREATECF name threshold_bytes max_level probability compressed");
    println!("DROPCF name");
    println!("PUT cf key value [ttl] | GET cf key | DEL cf key");
    println!("COMPACT cf max_threads");
    println!("CURSOR cf | NEXT | PREV | CURGET");
    println!("BEGIN cf | TXNPUT key value [ttl] | TXNDEL key | COMMIT | ROLLBACK");
    println!("CFS | STATS | EXIT | QUIT");
}
