//! Tests that run the traceroute binary.
//!
//! Only failure paths that stop before any raw socket is opened run by
//! default. The loopback trace needs raw socket privileges.

use std::process::Command;

fn traceroute() -> Command {
    Command::new(env!("CARGO_BIN_EXE_traceroute"))
}

#[test]
fn test_help() {
    let output = traceroute().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--max-hops"));
    assert!(stdout.contains("--queries"));
    assert!(stdout.contains("--wait"));
}

#[test]
fn test_zero_max_hops_exits_nonzero() {
    let output = traceroute().args(["-m", "0", "127.0.0.1"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("max hops"));
}

#[test]
fn test_unresolvable_host_exits_nonzero() {
    let output = traceroute().arg("no-such-host.invalid").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[test]
#[ignore = "needs raw socket privileges"]
fn test_loopback_json() {
    let output = traceroute()
        .args(["--json", "-w", "500", "127.0.0.1"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["target"]["addr"], "127.0.0.1");
    assert_eq!(json["reached_ttl"], 1);
    assert_eq!(json["hops"][0]["outcomes"][0]["kind"], "echo_reply");
}
