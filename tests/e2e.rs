use std::process::Command;

fn run(fixture: &str) -> (String, String, bool) {
    let path = format!("tests/fixtures/{fixture}");
    let output = Command::new(env!("CARGO_BIN_EXE_ledger-eng"))
        .arg(&path)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run binary");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn valid_operations() {
    let (stdout, stderr, success) = run("valid.csv");

    assert!(success);
    assert!(stderr.is_empty());

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "account,user,kind,balance,used,version");
    // snapshots are ordered by account id
    assert_eq!(lines[1], "1,10,main,100000,30000,3");
    assert_eq!(lines[2], "2,20,savings,30000,0,1");
}

#[test]
fn parse_errors_warn_but_do_not_block() {
    let (stdout, stderr, success) = run("with_errors.csv");

    assert!(success);
    assert!(stderr.contains("unrecognized operation"));
    assert!(stderr.contains("missing amount"));

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "account,user,kind,balance,used,version");
    // the transfer to a nonexistent account was skipped, the second deposit landed
    assert_eq!(lines[1], "1,10,main,102000,0,1");
}

#[test]
fn transfer_covers_shortfall_from_funding_source() {
    let (stdout, _, success) = run("topup.csv");

    assert!(success);
    let lines: Vec<&str> = stdout.lines().collect();
    // balance 100, transfer 500: one 10,000 replenishment, then the debit
    assert_eq!(lines[1], "1,1,main,9600,10500,1");
    assert_eq!(lines[2], "2,2,main,500,0,1");
}
