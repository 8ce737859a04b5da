use std::io::Write;

use assert_cmd::Command;
use predicates as pred;
use tempfile::NamedTempFile;

#[test]
fn end_to_end_outputs_expected_balances() {
    // Prepare temporary CSV files that yield
    // account 1: score 50/0, amount 25/0
    // account 2: score 73/30 (transfer in, shift to frozen, daily check-in)
    let mut accounts = NamedTempFile::new().expect("create temp file");
    writeln!(
        accounts,
        "id, status, score, freeze_score, amount, freeze_amount\n\
    1, enabled, 150, 0, 0, 0\n\
    2, enabled, 0, 0, 0, 0"
    )
    .unwrap();

    let mut requests = NamedTempFile::new().expect("create temp file");
    writeln!(
        requests,
        "type, account, counterparty, category, pool, amount, operator, day, remark\n\
    transfer, 1, 2, score, available, 100, 5, , gift\n\
    shift, 2, , score, frozen, 30, , ,\n\
    deduct, 1, , score, available, 80, , ,\n\
    charge, 1, , amount, available, 25, , ,\n\
    signin, 2, , , , , , 2026-10-14,\n\
    refund, 1, , score, , 1, , ,"
    )
    .unwrap();

    let entries = NamedTempFile::new().expect("create temp file");

    let exe = env!("CARGO_BIN_EXE_ucenter_ledger");
    let mut cmd = Command::new(exe);
    cmd.arg(accounts.path())
        .arg(requests.path())
        .arg(entries.path())
        .env("UCENTER__SIGNIN__DAY_REWARD", "3")
        .env("UCENTER_LOG", "warn");

    cmd.assert()
        .success()
        .stdout(pred::str::contains(
            "account,score,freeze_score,amount,freeze_amount",
        ))
        .stdout(pred::str::contains("1,50,0,25,0"))
        .stdout(pred::str::contains("2,73,30,0,0"))
        .stderr(pred::str::contains("DLQ Report"))
        .stderr(pred::str::contains("Insufficient"))
        .stderr(pred::str::contains("Invalid request type: refund"));

    let log = std::fs::read_to_string(entries.path()).unwrap();
    assert_eq!(log.lines().count(), 6);
    assert!(log.contains(",transfer-out,"));
    assert!(log.contains(",transfer-in,"));
    assert!(log.contains(",signin,"));
}

#[test]
fn missing_arguments_exit_with_usage() {
    let exe = env!("CARGO_BIN_EXE_ucenter_ledger");
    Command::new(exe)
        .assert()
        .code(2)
        .stderr(pred::str::contains("usage"));
}

#[test]
fn config_flag_loads_rewards_from_file() {
    let mut accounts = NamedTempFile::new().expect("create temp file");
    writeln!(
        accounts,
        "id, status, score, freeze_score, amount, freeze_amount\n\
    2, enabled, 1, 0, 0, 0"
    )
    .unwrap();

    let mut requests = NamedTempFile::new().expect("create temp file");
    writeln!(
        requests,
        "type, account, counterparty, category, pool, amount, operator, day, remark\n\
    signin, 2, , , , , , 2026-10-14,"
    )
    .unwrap();

    let mut config = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("create temp file");
    writeln!(config, "signin:\n  day_reward: 7").unwrap();

    let exe = env!("CARGO_BIN_EXE_ucenter_ledger");
    Command::new(exe)
        .arg("--config")
        .arg(config.path())
        .arg(accounts.path())
        .arg(requests.path())
        .env_remove("UCENTER_CONFIG")
        .env_remove("UCENTER__SIGNIN__DAY_REWARD")
        .env("UCENTER_LOG", "warn")
        .assert()
        .success()
        .stdout(pred::str::contains("2,8,0,0,0"));
}

#[test]
fn config_flag_without_path_exits_with_usage() {
    let exe = env!("CARGO_BIN_EXE_ucenter_ledger");
    Command::new(exe)
        .arg("a.csv")
        .arg("b.csv")
        .arg("--config")
        .assert()
        .code(2)
        .stderr(pred::str::contains("usage"));
}
