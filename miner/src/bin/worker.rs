//! The mining worker: a standalone process that reads one `WorkRequest` from
//! stdin, searches for a nonce beating `difficulty`, and writes one
//! `WorkSolution` to stdout before exiting. Runs until it finds a solution,
//! hits its own 300s deadline (silent exit), or is SIGTERM'd by its parent.

use std::io::{self, BufRead, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use miner::protocol::{WorkRequest, WorkSolution};

const DEADLINE_MS: u64 = 300_000;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn main() -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut line = String::new();
    if stdin.lock().read_line(&mut line)? == 0 {
        return Ok(());
    }
    let request: WorkRequest = serde_json::from_str(line.trim())?;

    let prev_block: types::ParentBlock = serde_json::from_str(&request.difficulty_data.prev_block_bytes)?;
    let new_headers: types::ChildHeaderMap =
        serde_json::from_str(&request.difficulty_data.new_headers_bytes)?;
    let new_block_count = new_headers.distinct_child_count() as i64;
    let min_diff = consensus::minimum_difficulty();

    let t0 = now_ms();
    let deadline = t0 + DEADLINE_MS;

    let mut current_timestamp_s = request.current_timestamp_s;
    let mut difficulty = request.difficulty.clone();
    let mut iterations: u64 = 0;
    let mut rng = rand::thread_rng();

    loop {
        let wall_ms = (now_ms() as i64 + request.offset_ms) as u64;
        if wall_ms > deadline {
            return Ok(());
        }

        let observed_second = wall_ms / 1000;
        if observed_second != current_timestamp_s {
            current_timestamp_s = observed_second;
            let diff = consensus::get_diff(
                (current_timestamp_s * 1000) as i64,
                (prev_block.timestamp_s * 1000) as i64,
                &prev_block.distance,
                &min_diff,
                new_block_count,
            );
            difficulty = consensus::get_exp_factor_diff(&diff, prev_block.height);
        }

        let nonce = format!("{}", rand::Rng::gen::<f64>(&mut rng));
        let candidate_hash = hashing::h(format!(
            "{}{}{}{}",
            request.miner_key,
            request.merkle_root,
            hashing::h(nonce.as_bytes()),
            current_timestamp_s
        ));
        let trial = consensus::distance(&request.work, &candidate_hash);

        if trial > difficulty.0 {
            let solution = WorkSolution {
                nonce,
                distance: types::BigIntHex(trial),
                timestamp_s: current_timestamp_s,
                difficulty,
                iterations,
                time_diff_ms: now_ms() - t0,
            };
            let mut out = serde_json::to_string(&solution)?;
            out.push('\n');
            io::stdout().write_all(out.as_bytes())?;
            io::stdout().flush()?;
            return Ok(());
        }

        iterations += 1;
    }
}
