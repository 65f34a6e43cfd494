#![cfg(all(unix, feature = "cli"))]

use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/frcli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn framerelay() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_framerelay"));
    cmd.env_remove("FRAMERELAY_TOPIC")
        .env_remove("FRAMERELAY_LOG_LEVEL")
        .args(["--log-level", "error", "--format", "json"]);
    cmd
}

fn unix(path: &Path) -> String {
    format!("unix:{}", path.display())
}

fn wait_for_socket(path: &Path, timeout: Duration) {
    let start = Instant::now();
    while !path.exists() {
        if start.elapsed() >= timeout {
            panic!("socket {} never appeared", path.display());
        }
        thread::sleep(Duration::from_millis(25));
    }
}

fn wait_with_timeout(mut child: Child, timeout: Duration) -> Output {
    let start = Instant::now();
    loop {
        match child.try_wait().expect("child status should be readable") {
            Some(_) => return child.wait_with_output().expect("output should be readable"),
            None if start.elapsed() >= timeout => {
                let _ = child.kill();
                let output = child.wait_with_output().expect("output should be readable");
                panic!(
                    "command timed out; stderr: {}",
                    String::from_utf8_lossy(&output.stderr)
                );
            }
            None => thread::sleep(Duration::from_millis(25)),
        }
    }
}

fn json_line(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().last().expect("command should print a line");
    serde_json::from_str(line).expect("stdout should be json")
}

fn spawn_publish(bus: &Path, frame: &Path, extra: &[&str]) -> Child {
    framerelay()
        .arg("publish")
        .arg("--file")
        .arg(frame)
        .arg("--endpoint")
        .arg(unix(bus))
        .args(extra)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("publish should start")
}

fn spawn_relay(bus: &Path, push: &Path) -> Child {
    framerelay()
        .arg("relay")
        .arg("--sub-endpoint")
        .arg(unix(bus))
        .arg("--push-endpoint")
        .arg(unix(push))
        .args(["--max-frames", "1", "--poll", "100ms"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("relay should start")
}

#[test]
fn rgb_frame_flows_from_publisher_to_sink() {
    let dir = unique_temp_dir("pipeline");
    let bus = dir.join("bus.sock");
    let push = dir.join("push.sock");
    let frame = dir.join("frame.bin");
    std::fs::write(&frame, [1u8, 2, 3, 4, 5, 6]).expect("frame file should be writable");

    let sink = framerelay()
        .arg("sink")
        .arg("--endpoint")
        .arg(unix(&push))
        .args(["--count", "1", "--poll", "100ms"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("sink should start");

    let publish = spawn_publish(
        &bus,
        &frame,
        &["--width", "2", "--height", "1", "--bpp", "24", "--source", "cam1"],
    );

    wait_for_socket(&push, Duration::from_secs(5));
    wait_for_socket(&bus, Duration::from_secs(5));

    let relay = spawn_relay(&bus, &push);

    let relay_out = wait_with_timeout(relay, Duration::from_secs(10));
    assert!(
        relay_out.status.success(),
        "relay stderr: {}",
        String::from_utf8_lossy(&relay_out.stderr)
    );
    let stats = json_line(&relay_out);
    assert_eq!(stats["event"], "relay-stats");
    assert_eq!(stats["received"], 1);
    assert_eq!(stats["forwarded"], 1);

    let sink_out = wait_with_timeout(sink, Duration::from_secs(10));
    assert!(sink_out.status.success());
    let received = json_line(&sink_out);
    assert_eq!(received["event"], "frame-received");
    assert_eq!(received["source"], "image0");
    assert_eq!(received["width"], 2);
    assert_eq!(received["height"], 1);
    assert_eq!(received["bits_per_pixel"], 32);
    assert_eq!(received["meta"], "{detections: 3}");
    assert_eq!(received["payload_len"], 8);

    let publish_out = wait_with_timeout(publish, Duration::from_secs(10));
    assert!(publish_out.status.success());
    assert_eq!(json_line(&publish_out)["sent"], 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn unknown_layout_is_counted_and_not_forwarded() {
    let dir = unique_temp_dir("unknown-layout");
    let bus = dir.join("bus.sock");
    let push = dir.join("push.sock");
    let frame = dir.join("frame.bin");
    std::fs::write(&frame, [0u8; 12]).expect("frame file should be writable");

    // Stands in for the downstream puller; the relay only needs to connect.
    let _downstream = UnixListener::bind(&push).expect("downstream should bind");

    let publish = spawn_publish(
        &bus,
        &frame,
        &[
            "--width",
            "4",
            "--height",
            "2",
            "--bpp",
            "12",
            "--kind",
            "raw",
            "--pixel-format",
            "IMAGE_YUV420_8BPP",
        ],
    );
    wait_for_socket(&bus, Duration::from_secs(5));

    let relay_out = wait_with_timeout(spawn_relay(&bus, &push), Duration::from_secs(10));
    assert!(relay_out.status.success());
    let stats = json_line(&relay_out);
    assert_eq!(stats["received"], 1);
    assert_eq!(stats["forwarded"], 0);
    assert_eq!(stats["unrecognized"], 1);

    let _ = wait_with_timeout(publish, Duration::from_secs(10));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn publisher_refuses_yuv_frame_with_wrong_length() {
    let dir = unique_temp_dir("yuv-mismatch");
    let bus = dir.join("bus.sock");
    let frame = dir.join("frame.bin");
    std::fs::write(&frame, [0x80u8; 6]).expect("frame file should be writable");

    let publish = spawn_publish(
        &bus,
        &frame,
        &[
            "--width",
            "4",
            "--height",
            "1",
            "--bpp",
            "16",
            "--kind",
            "raw",
            "--pixel-format",
            "SENSOR_IMAGE_YUV422_8BPP_V2",
        ],
    );

    // 4x1 at 16 bpp needs 8 bytes.
    let publish_out = wait_with_timeout(publish, Duration::from_secs(10));
    assert_eq!(publish_out.status.code(), Some(60));
    assert!(!bus.exists());

    let _ = std::fs::remove_dir_all(&dir);
}
